//! JSON-file backends.
//!
//! `accounts.json` holds an array of [`AccountRecord`]; `contacts.json`
//! holds an object mapping user id to an array of [`Contact`]. Reads fail
//! when the file is missing so a trigger never mistakes an absent store for
//! an empty one. Writes replace the whole file via a temp-file rename.

use crate::{AccountDirectory, ContactStore};
use async_trait::async_trait;
use beacon_core::error::{BeaconError, BeaconResult};
use beacon_core::{AccountRecord, Contact};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

type ContactMap = BTreeMap<String, Vec<Contact>>;

/// Account directory stored as a JSON array.
#[derive(Debug)]
pub struct JsonFileDirectory {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn load(&self) -> BeaconResult<Vec<AccountRecord>> {
        read_json(&self.path)
            .await
            .map_err(|e| BeaconError::Directory(format!("{}: {e}", self.path.display())))
    }

    /// Read-modify-write. A missing file starts from an empty directory.
    async fn modify<T>(
        &self,
        f: impl FnOnce(&mut Vec<AccountRecord>) -> BeaconResult<T>,
    ) -> BeaconResult<T> {
        let _guard = self.write_lock.lock().await;
        let mut accounts: Vec<AccountRecord> = read_json_or_default(&self.path).await?;
        let out = f(&mut accounts)?;
        write_json(&self.path, &accounts).await?;
        Ok(out)
    }

    pub async fn upsert(&self, record: AccountRecord) -> BeaconResult<()> {
        self.modify(|accounts| {
            crate::upsert(accounts, record);
            Ok(())
        })
        .await
    }

    pub async fn register_push_token(&self, account_id: &str, token: &str) -> BeaconResult<()> {
        self.modify(|accounts| {
            crate::merge_push_token(accounts, account_id, token);
            Ok(())
        })
        .await?;
        tracing::info!(account_id, path = %self.path.display(), "push token saved");
        Ok(())
    }

    pub async fn set_notifications_enabled(
        &self,
        account_id: &str,
        enabled: bool,
    ) -> BeaconResult<()> {
        self.modify(|accounts| crate::set_notifications(accounts, account_id, enabled))
            .await
    }
}

#[async_trait]
impl AccountDirectory for JsonFileDirectory {
    async fn lookup_all(&self) -> BeaconResult<Vec<AccountRecord>> {
        let accounts = self.load().await?;
        tracing::debug!(accounts = accounts.len(), path = %self.path.display(), "loaded accounts");
        Ok(accounts)
    }

    async fn lookup_by_id(&self, account_id: &str) -> BeaconResult<Option<AccountRecord>> {
        Ok(self
            .load()
            .await?
            .into_iter()
            .find(|a| a.account_id == account_id))
    }
}

/// Contact store stored as a JSON object of per-user arrays.
#[derive(Debug)]
pub struct JsonFileContactStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileContactStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn modify<T>(
        &self,
        user_id: &str,
        f: impl FnOnce(&mut Vec<Contact>) -> BeaconResult<T>,
    ) -> BeaconResult<T> {
        let _guard = self.write_lock.lock().await;
        let mut map: ContactMap = read_json_or_default(&self.path).await?;
        let out = f(map.entry(user_id.to_string()).or_default())?;
        write_json(&self.path, &map).await?;
        Ok(out)
    }

    pub async fn add(&self, user_id: &str, contact: Contact) -> BeaconResult<()> {
        let name = contact.name.clone();
        self.modify(user_id, |list| crate::insert_unique(list, contact))
            .await?;
        tracing::info!(user_id, contact = %name, "contact added");
        Ok(())
    }

    pub async fn remove(&self, user_id: &str, contact_id: &str) -> BeaconResult<Contact> {
        let removed = self
            .modify(user_id, |list| crate::remove_by_id(list, contact_id))
            .await?;
        tracing::info!(user_id, contact = %removed.name, "contact removed");
        Ok(removed)
    }
}

#[async_trait]
impl ContactStore for JsonFileContactStore {
    async fn list(&self, user_id: &str) -> BeaconResult<Vec<Contact>> {
        let mut map: ContactMap = read_json(&self.path)
            .await
            .map_err(|e| BeaconError::ContactStore(format!("{}: {e}", self.path.display())))?;
        Ok(map.remove(user_id).unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// JSON I/O
// ---------------------------------------------------------------------------

async fn read_json<T: DeserializeOwned>(path: &Path) -> BeaconResult<T> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> BeaconResult<T> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e.into()),
    }
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> BeaconResult<()> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');

    let tmp = path.with_extension("json.tmp");
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_accounts_file_is_a_directory_error() {
        let dir = tempfile::tempdir().unwrap();
        let accounts = JsonFileDirectory::new(dir.path().join("accounts.json"));
        let err = accounts.lookup_all().await.unwrap_err();
        assert!(matches!(err, BeaconError::Directory(_)));
    }

    #[tokio::test]
    async fn register_token_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let accounts = JsonFileDirectory::new(dir.path().join("accounts.json"));
        accounts
            .upsert(AccountRecord::new("u1").with_email("a@x.com"))
            .await
            .unwrap();
        accounts
            .register_push_token("u1", "ExponentPushToken[1]")
            .await
            .unwrap();
        accounts.set_notifications_enabled("u1", false).await.unwrap();

        let acct = accounts.lookup_by_id("u1").await.unwrap().unwrap();
        assert_eq!(acct.push_token.as_deref(), Some("ExponentPushToken[1]"));
        assert_eq!(acct.notifications_enabled, Some(false));
    }

    #[tokio::test]
    async fn reads_client_style_account_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.json");
        std::fs::write(
            &path,
            r#"[{"uid":"u1","email":"a@x.com","pushToken":null,"notificationsEnabled":true}]"#,
        )
        .unwrap();

        let all = JsonFileDirectory::new(&path).lookup_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].account_id, "u1");
        assert_eq!(all[0].push_token, None);
    }

    #[tokio::test]
    async fn contacts_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileContactStore::new(dir.path().join("contacts.json"));

        assert!(matches!(
            store.list("me").await,
            Err(BeaconError::ContactStore(_))
        ));

        let a = Contact::new("Alice", "alice@x.com").unwrap();
        store.add("me", a.clone()).await.unwrap();
        store
            .add("me", Contact::new("Bob", "555-1234").unwrap())
            .await
            .unwrap();
        assert!(store
            .add("me", Contact::new("Alice 2", "ALICE@x.com").unwrap())
            .await
            .is_err());

        let listed = store.list("me").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], a);
        assert!(store.list("someone-else").await.unwrap().is_empty());

        store.remove("me", &a.id).await.unwrap();
        assert_eq!(store.list("me").await.unwrap().len(), 1);
    }
}
