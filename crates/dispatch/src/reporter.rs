//! Per-trigger summary of who was and wasn't notified.
//!
//! Takes a [`FanoutOutcome`] and produces counts, unreachable contacts
//! grouped by broad cause, and a human-readable rendering.

use beacon_core::{FanoutOutcome, IdentifierKind, Outcome, ReasonCategory, TriggerContext};
use std::collections::BTreeMap;
use std::time::Duration;

/// Summary produced from a FanoutOutcome.
#[derive(Debug)]
pub struct Report {
    pub user_id: String,
    pub sender: String,
    pub total_contacts: usize,
    pub delivered: Vec<DeliveredEntry>,
    pub unreachable: Vec<UnreachableEntry>,
    pub by_category: BTreeMap<ReasonCategory, usize>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone)]
pub struct DeliveredEntry {
    pub contact_id: String,
    pub name: String,
    pub account_id: String,
}

#[derive(Debug, Clone)]
pub struct UnreachableEntry {
    pub contact_id: String,
    pub name: String,
    pub identifier: String,
    pub kind: IdentifierKind,
    pub category: ReasonCategory,
    /// Display form of the precise reason.
    pub detail: String,
}

impl Report {
    pub fn build(ctx: &TriggerContext, outcome: &FanoutOutcome, elapsed: Duration) -> Self {
        let mut delivered = Vec::new();
        let mut unreachable = Vec::new();
        let mut by_category: BTreeMap<ReasonCategory, usize> = BTreeMap::new();

        for attempt in &outcome.attempts {
            let c = &attempt.contact;
            match &attempt.outcome {
                Outcome::Delivered { account_id } => delivered.push(DeliveredEntry {
                    contact_id: c.id.clone(),
                    name: c.name.clone(),
                    account_id: account_id.clone(),
                }),
                Outcome::Unreachable(reason) => {
                    *by_category.entry(reason.category()).or_default() += 1;
                    unreachable.push(UnreachableEntry {
                        contact_id: c.id.clone(),
                        name: c.name.clone(),
                        identifier: c.identifier_value.clone(),
                        kind: c.identifier_kind,
                        category: reason.category(),
                        detail: reason.to_string(),
                    });
                }
            }
        }

        Report {
            user_id: ctx.user_id.clone(),
            sender: ctx.display_name.clone(),
            total_contacts: outcome.len(),
            delivered,
            unreachable,
            by_category,
            elapsed,
        }
    }

    pub fn count(&self, category: ReasonCategory) -> usize {
        self.by_category.get(&category).copied().unwrap_or(0)
    }

    /// True when every contact was notified.
    pub fn all_delivered(&self) -> bool {
        self.unreachable.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push('\n');
        out.push_str("╔══════════════════════════════════════════════════════════════╗\n");
        out.push_str("║                       BEACON REPORT                          ║\n");
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");
        out.push_str(&format!("║  Sender:             {:>39} ║\n", self.sender));
        out.push_str(&format!("║  Contacts:           {:>39} ║\n", self.total_contacts));
        out.push_str(&format!("║  Delivered:          {:>39} ║\n", self.delivered.len()));
        out.push_str(&format!("║  Unreachable:        {:>39} ║\n", self.unreachable.len()));
        out.push_str(&format!(
            "║    no account:       {:>39} ║\n",
            self.count(ReasonCategory::Unresolved)
        ));
        out.push_str(&format!(
            "║    not eligible:     {:>39} ║\n",
            self.count(ReasonCategory::Ineligible)
        ));
        out.push_str(&format!(
            "║    delivery failed:  {:>39} ║\n",
            self.count(ReasonCategory::DeliveryFailed)
        ));
        out.push_str(&format!("║  Elapsed:            {:>36?} ║\n", self.elapsed));
        out.push_str("╠══════════════════════════════════════════════════════════════╣\n");

        if self.unreachable.is_empty() {
            out.push_str("║  Everyone was notified.                                      ║\n");
        } else {
            out.push_str("║  NOT NOTIFIED                                                ║\n");
            for (i, u) in self.unreachable.iter().enumerate() {
                out.push_str(&format!(
                    "║  {}. {} <{}> ({})\n",
                    i + 1,
                    u.name,
                    u.identifier,
                    u.kind
                ));
                out.push_str(&format!("║     {}\n", u.detail));
            }
        }

        out.push_str("╚══════════════════════════════════════════════════════════════╝\n");
        out
    }
}
