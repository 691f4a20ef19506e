//! Domain types for the Beacon fan-out notifier.

use crate::error::{BeaconError, BeaconResult};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// How a contact is addressed in the account directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Email,
    Phone,
}

impl IdentifierKind {
    /// Phone when the value has a digit and nothing but digits and dial
    /// punctuation. Everything else is treated as an email address.
    ///
    /// Stricter than "contains a digit": `bob42@x.com` stays an email.
    pub fn infer(normalized: &str) -> Self {
        let has_digit = normalized.chars().any(|c| c.is_ascii_digit());
        let phone_chars = normalized
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '(' | ')' | '.' | ' '));
        if has_digit && phone_chars {
            Self::Phone
        } else {
            Self::Email
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trim + lowercase. The canonical form for comparing identifiers.
#[inline]
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

/// A saved emergency contact owned by the triggering user.
///
/// `identifier_value` is stored normalized. The `value`/`method` aliases
/// accept records exported by the mobile client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    #[serde(alias = "value")]
    pub identifier_value: String,
    #[serde(alias = "method")]
    pub identifier_kind: IdentifierKind,
}

impl Contact {
    /// Builds a new contact from user input with a fresh id.
    pub fn new(name: &str, raw_value: &str) -> BeaconResult<Self> {
        let name = name.trim();
        let value = normalize_identifier(raw_value);

        if name.is_empty() {
            return Err(BeaconError::InvalidInput("contact name must not be empty".into()));
        }
        if value.is_empty() {
            return Err(BeaconError::InvalidInput(
                "contact email or phone must not be empty".into(),
            ));
        }

        Ok(Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            identifier_kind: IdentifierKind::infer(&value),
            identifier_value: value,
        })
    }

    /// The identifier in canonical form, regardless of how it was stored.
    pub fn normalized_value(&self) -> String {
        normalize_identifier(&self.identifier_value)
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// A registered account as held by the account directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    #[serde(alias = "uid")]
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_token: Option<String>,
    /// Absent means enabled: opt-out is explicit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications_enabled: Option<bool>,
}

impl AccountRecord {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_push_token(mut self, token: impl Into<String>) -> Self {
        self.push_token = Some(token.into());
        self
    }

    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications_enabled = Some(enabled);
        self
    }

    /// Only an explicit `false` counts as opted out.
    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled != Some(false)
    }

    /// Email in the form used for matching.
    pub fn email_key(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(normalize_identifier)
            .filter(|e| !e.is_empty())
    }

    /// Phone in the form used for matching (trimmed only).
    pub fn phone_key(&self) -> Option<&str> {
        self.phone.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// Who lit the beacon. Passed explicitly into every trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerContext {
    pub user_id: String,
    /// Embedded in the notification body, usually the user's email.
    pub display_name: String,
}

impl TriggerContext {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// One message handed to the push gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a resolved account cannot receive a push right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IneligibleReason {
    MissingToken,
    MalformedToken,
    OptedOut,
}

impl IneligibleReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing push token",
            Self::MalformedToken => "unrecognized push token",
            Self::OptedOut => "notifications disabled",
        }
    }
}

/// Result of the eligibility check. `Eligible` carries the token to push to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eligibility<'a> {
    Eligible(&'a str),
    Ineligible(IneligibleReason),
}

impl Eligibility<'_> {
    #[inline]
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible(_))
    }
}

/// Broad cause buckets used by the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCategory {
    Unresolved,
    Ineligible,
    DeliveryFailed,
}

impl ReasonCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::Ineligible => "ineligible",
            Self::DeliveryFailed => "delivery_failed",
        }
    }
}

/// Why a contact was not notified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum UnreachableReason {
    /// No account matches the contact's identifier.
    Unresolved,
    Ineligible(IneligibleReason),
    /// Gateway error, non-success response, or timeout.
    DeliveryFailed(String),
}

impl UnreachableReason {
    pub fn category(&self) -> ReasonCategory {
        match self {
            Self::Unresolved => ReasonCategory::Unresolved,
            Self::Ineligible(_) => ReasonCategory::Ineligible,
            Self::DeliveryFailed(_) => ReasonCategory::DeliveryFailed,
        }
    }
}

impl fmt::Display for UnreachableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unresolved => f.write_str("no registered account"),
            Self::Ineligible(r) => f.write_str(r.as_str()),
            Self::DeliveryFailed(msg) => write!(f, "delivery failed: {msg}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Delivered { account_id: String },
    Unreachable(UnreachableReason),
}

/// Outcome of notifying one contact during one trigger. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAttempt {
    pub contact: Contact,
    pub outcome: Outcome,
}

impl NotificationAttempt {
    pub fn delivered(contact: Contact, account_id: impl Into<String>) -> Self {
        Self {
            contact,
            outcome: Outcome::Delivered {
                account_id: account_id.into(),
            },
        }
    }

    pub fn unreachable(contact: Contact, reason: UnreachableReason) -> Self {
        Self {
            contact,
            outcome: Outcome::Unreachable(reason),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self.outcome, Outcome::Delivered { .. })
    }

    pub fn reason(&self) -> Option<&UnreachableReason> {
        match &self.outcome {
            Outcome::Unreachable(r) => Some(r),
            Outcome::Delivered { .. } => None,
        }
    }
}

/// All attempts of one trigger, in contact-list order.
///
/// `delivered()` and `unreachable()` partition `attempts`: every contact
/// lands in exactly one of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FanoutOutcome {
    pub attempts: Vec<NotificationAttempt>,
}

impl FanoutOutcome {
    pub fn new(attempts: Vec<NotificationAttempt>) -> Self {
        Self { attempts }
    }

    pub fn delivered(&self) -> impl Iterator<Item = &NotificationAttempt> {
        self.attempts.iter().filter(|a| a.is_delivered())
    }

    pub fn unreachable(&self) -> impl Iterator<Item = (&Contact, &UnreachableReason)> {
        self.attempts
            .iter()
            .filter_map(|a| a.reason().map(|r| (&a.contact, r)))
    }

    pub fn delivered_count(&self) -> usize {
        self.delivered().count()
    }

    pub fn unreachable_count(&self) -> usize {
        self.attempts.len() - self.delivered_count()
    }

    pub fn len(&self) -> usize {
        self.attempts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attempts.is_empty()
    }
}
