//! Collaborator abstractions for Beacon and their implementations.
//!
//! The fan-out engine only sees the three traits below. Backends:
//! - [`memory`] — in-process, for tests and embedding
//! - [`file`] — JSON files on disk, used by the CLI
//! - [`expo`] — Expo push HTTP API
//! - [`dry_run`] — gateway that only logs

pub mod dry_run;
pub mod expo;
pub mod file;
pub mod memory;

use async_trait::async_trait;
use beacon_core::error::{BeaconError, BeaconResult};
use beacon_core::{AccountRecord, Contact, PushMessage};

pub use dry_run::LogGateway;
pub use expo::ExpoPushGateway;
pub use file::{JsonFileContactStore, JsonFileDirectory};
pub use memory::{InMemoryContactStore, InMemoryDirectory};

/// Read-only view of registered accounts.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Every account, in directory order.
    async fn lookup_all(&self) -> BeaconResult<Vec<AccountRecord>>;
    async fn lookup_by_id(&self, account_id: &str) -> BeaconResult<Option<AccountRecord>>;
}

/// Per-user saved contacts.
#[async_trait]
pub trait ContactStore: Send + Sync {
    /// Contacts of `user_id` in the order they were added.
    async fn list(&self, user_id: &str) -> BeaconResult<Vec<Contact>>;
}

/// Best-effort push delivery. `Ok` means the gateway accepted the message.
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, message: &PushMessage) -> BeaconResult<()>;
}

// ---------------------------------------------------------------------------
// Mutation helpers shared by the backends
// ---------------------------------------------------------------------------

/// Appends `contact` unless one with the same normalized value exists.
pub(crate) fn insert_unique(list: &mut Vec<Contact>, contact: Contact) -> BeaconResult<()> {
    let value = contact.normalized_value();
    if list.iter().any(|c| c.normalized_value() == value) {
        return Err(BeaconError::DuplicateContact(value));
    }
    list.push(contact);
    Ok(())
}

/// Removes the contact with `contact_id`, returning it.
pub(crate) fn remove_by_id(list: &mut Vec<Contact>, contact_id: &str) -> BeaconResult<Contact> {
    let pos = list
        .iter()
        .position(|c| c.id == contact_id)
        .ok_or_else(|| BeaconError::NotFound(format!("contact {contact_id}")))?;
    Ok(list.remove(pos))
}

/// Sets the token on `account_id`, creating a bare record if it is missing.
pub(crate) fn merge_push_token(accounts: &mut Vec<AccountRecord>, account_id: &str, token: &str) {
    match accounts.iter_mut().find(|a| a.account_id == account_id) {
        Some(acct) => acct.push_token = Some(token.to_string()),
        None => accounts.push(AccountRecord::new(account_id).with_push_token(token)),
    }
}

pub(crate) fn set_notifications(
    accounts: &mut [AccountRecord],
    account_id: &str,
    enabled: bool,
) -> BeaconResult<()> {
    let acct = accounts
        .iter_mut()
        .find(|a| a.account_id == account_id)
        .ok_or_else(|| BeaconError::NotFound(format!("account {account_id}")))?;
    acct.notifications_enabled = Some(enabled);
    Ok(())
}

/// Replaces the record with the same id in place, or appends it.
pub(crate) fn upsert(accounts: &mut Vec<AccountRecord>, record: AccountRecord) {
    match accounts.iter_mut().find(|a| a.account_id == record.account_id) {
        Some(slot) => *slot = record,
        None => accounts.push(record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_values_are_rejected_case_insensitively() {
        let mut list = vec![Contact::new("Alice", "alice@x.com").unwrap()];
        let dup = Contact {
            identifier_value: " ALICE@x.com".into(),
            ..Contact::new("Al", "other@x.com").unwrap()
        };
        assert!(matches!(
            insert_unique(&mut list, dup),
            Err(BeaconError::DuplicateContact(_))
        ));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn remove_unknown_contact_is_not_found() {
        let mut list = Vec::new();
        assert!(matches!(
            remove_by_id(&mut list, "nope"),
            Err(BeaconError::NotFound(_))
        ));
    }

    #[test]
    fn merge_push_token_creates_or_updates() {
        let mut accounts = vec![AccountRecord::new("u1").with_email("a@x.com")];
        merge_push_token(&mut accounts, "u1", "ExponentPushToken[a]");
        merge_push_token(&mut accounts, "u2", "ExponentPushToken[b]");

        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].email.as_deref(), Some("a@x.com"));
        assert_eq!(accounts[0].push_token.as_deref(), Some("ExponentPushToken[a]"));
        assert_eq!(accounts[1].account_id, "u2");
    }
}
