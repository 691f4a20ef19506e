//! Machine-readable output for trigger reports.
//!
//! Two row schemas:
//! - [`TriggerSummaryRow`] — one per trigger
//! - [`AttemptRow`] — one per contact (denormalized)
//!
//! Backend: [`json_stream`] writes newline-delimited JSON to any `Write`.

pub mod json_stream;

use crate::reporter::Report;
use beacon_core::{FanoutOutcome, Outcome, ReasonCategory};
use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

// ---------------------------------------------------------------------------
// Serializable row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TriggerSummaryRow {
    pub user_id: String,
    pub total_contacts: u32,
    pub delivered: u32,
    pub unresolved: u32,
    pub ineligible: u32,
    pub delivery_failed: u32,
    pub elapsed_ms: u64,
    pub created_at_ms: u64,
}

/// One row per contact; `reason`/`detail` are empty for deliveries.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRow {
    pub user_id: String,
    pub contact_id: String,
    pub contact_name: String,
    pub identifier: String,
    pub identifier_kind: &'static str,
    /// `delivered` or `unreachable`.
    pub status: &'static str,
    pub reason: &'static str,
    pub detail: String,
    pub account_id: Option<String>,
    pub created_at_ms: u64,
}

// ---------------------------------------------------------------------------
// Builder: Report → Rows
// ---------------------------------------------------------------------------

impl Report {
    /// Flatten the report and its outcome into sink-ready rows.
    pub fn to_rows(&self, outcome: &FanoutOutcome) -> (TriggerSummaryRow, Vec<AttemptRow>) {
        let now = now_ms();

        let summary = TriggerSummaryRow {
            user_id: self.user_id.clone(),
            total_contacts: self.total_contacts as u32,
            delivered: self.delivered.len() as u32,
            unresolved: self.count(ReasonCategory::Unresolved) as u32,
            ineligible: self.count(ReasonCategory::Ineligible) as u32,
            delivery_failed: self.count(ReasonCategory::DeliveryFailed) as u32,
            elapsed_ms: self.elapsed.as_millis() as u64,
            created_at_ms: now,
        };

        let attempts = outcome
            .attempts
            .iter()
            .map(|a| {
                let (status, reason, detail, account_id) = match &a.outcome {
                    Outcome::Delivered { account_id } => {
                        ("delivered", "", String::new(), Some(account_id.clone()))
                    }
                    Outcome::Unreachable(r) => {
                        ("unreachable", r.category().as_str(), r.to_string(), None)
                    }
                };
                AttemptRow {
                    user_id: self.user_id.clone(),
                    contact_id: a.contact.id.clone(),
                    contact_name: a.contact.name.clone(),
                    identifier: a.contact.identifier_value.clone(),
                    identifier_kind: a.contact.identifier_kind.as_str(),
                    status,
                    reason,
                    detail,
                    account_id,
                    created_at_ms: now,
                }
            })
            .collect();

        (summary, attempts)
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
