//! In-process directory and contact store backed by `tokio::sync::RwLock`.

use crate::{AccountDirectory, ContactStore};
use async_trait::async_trait;
use beacon_core::error::BeaconResult;
use beacon_core::{AccountRecord, Contact};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Account directory held in memory. Iteration order is insertion order.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    accounts: RwLock<Vec<AccountRecord>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_accounts(accounts: Vec<AccountRecord>) -> Self {
        Self {
            accounts: RwLock::new(accounts),
        }
    }

    pub async fn upsert(&self, record: AccountRecord) {
        crate::upsert(&mut *self.accounts.write().await, record);
    }

    /// Stores a device token for `account_id` with merge semantics.
    pub async fn register_push_token(&self, account_id: &str, token: &str) {
        crate::merge_push_token(&mut *self.accounts.write().await, account_id, token);
        tracing::debug!(account_id, "push token registered");
    }

    pub async fn set_notifications_enabled(
        &self,
        account_id: &str,
        enabled: bool,
    ) -> BeaconResult<()> {
        crate::set_notifications(&mut self.accounts.write().await, account_id, enabled)
    }

    pub async fn len(&self) -> usize {
        self.accounts.read().await.len()
    }
}

#[async_trait]
impl AccountDirectory for InMemoryDirectory {
    async fn lookup_all(&self) -> BeaconResult<Vec<AccountRecord>> {
        Ok(self.accounts.read().await.clone())
    }

    async fn lookup_by_id(&self, account_id: &str) -> BeaconResult<Option<AccountRecord>> {
        Ok(self
            .accounts
            .read()
            .await
            .iter()
            .find(|a| a.account_id == account_id)
            .cloned())
    }
}

/// Contact lists keyed by owning user id.
#[derive(Debug, Default)]
pub struct InMemoryContactStore {
    contacts: RwLock<HashMap<String, Vec<Contact>>>,
}

impl InMemoryContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, user_id: &str, contact: Contact) -> BeaconResult<()> {
        let mut guard = self.contacts.write().await;
        crate::insert_unique(guard.entry(user_id.to_string()).or_default(), contact)
    }

    pub async fn remove(&self, user_id: &str, contact_id: &str) -> BeaconResult<Contact> {
        let mut guard = self.contacts.write().await;
        crate::remove_by_id(guard.entry(user_id.to_string()).or_default(), contact_id)
    }
}

#[async_trait]
impl ContactStore for InMemoryContactStore {
    async fn list(&self, user_id: &str) -> BeaconResult<Vec<Contact>> {
        Ok(self
            .contacts
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }
}
