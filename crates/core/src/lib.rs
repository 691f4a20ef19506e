//! Domain models, shared types, and error definitions.
//!
//! Foundation crate -- no async or I/O dependencies.

pub mod config;
pub mod error;
pub mod types;

pub use config::DispatchConfig;
pub use error::{BeaconError, BeaconResult};
pub use types::{
    normalize_identifier, AccountRecord, Contact, Eligibility, FanoutOutcome, IdentifierKind,
    IneligibleReason, NotificationAttempt, Outcome, PushMessage, ReasonCategory, TriggerContext,
    UnreachableReason,
};
