//! Contact → account resolution.
//!
//! A contact resolves to the first account, in directory order, whose
//! normalized email or trimmed phone equals the contact's normalized value.
//! Duplicate accounts sharing an identifier are not rejected here; the
//! earliest one wins and later ones are only logged.

use beacon_core::{AccountRecord, Contact};
use std::collections::HashMap;

/// Linear first-match scan over a directory snapshot.
pub fn resolve<'a>(contact: &Contact, accounts: &'a [AccountRecord]) -> Option<&'a AccountRecord> {
    let key = contact.normalized_value();
    accounts.iter().find(|acct| {
        acct.email_key().as_deref() == Some(key.as_str()) || acct.phone_key() == Some(key.as_str())
    })
}

/// Directory snapshot indexed by email and phone for O(1) resolution.
///
/// Built once per trigger. Each key maps to the position of the first
/// account carrying it, so lookups agree with [`resolve`].
#[derive(Debug, Clone, Default)]
pub struct DirectoryIndex {
    accounts: Vec<AccountRecord>,
    by_email: HashMap<String, usize>,
    by_phone: HashMap<String, usize>,
}

impl DirectoryIndex {
    pub fn build(accounts: Vec<AccountRecord>) -> Self {
        let mut by_email = HashMap::with_capacity(accounts.len());
        let mut by_phone = HashMap::new();

        for (pos, acct) in accounts.iter().enumerate() {
            if let Some(email) = acct.email_key() {
                index_first(&mut by_email, email, pos, &acct.account_id);
            }
            if let Some(phone) = acct.phone_key() {
                index_first(&mut by_phone, phone.to_string(), pos, &acct.account_id);
            }
        }

        tracing::debug!(
            accounts = accounts.len(),
            emails = by_email.len(),
            phones = by_phone.len(),
            "directory indexed"
        );

        Self {
            accounts,
            by_email,
            by_phone,
        }
    }

    pub fn resolve(&self, contact: &Contact) -> Option<&AccountRecord> {
        let key = contact.normalized_value();
        let email_pos = self.by_email.get(&key).copied();
        let phone_pos = self.by_phone.get(&key).copied();

        // Both can hit when one account's phone equals another's email.
        let pos = match (email_pos, phone_pos) {
            (Some(e), Some(p)) => e.min(p),
            (Some(e), None) => e,
            (None, Some(p)) => p,
            (None, None) => return None,
        };
        self.accounts.get(pos)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

fn index_first(map: &mut HashMap<String, usize>, key: String, pos: usize, account_id: &str) {
    use std::collections::hash_map::Entry;
    match map.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(pos);
        }
        Entry::Occupied(_) => {
            tracing::debug!(account_id, "duplicate identifier, keeping earlier account");
        }
    }
}
