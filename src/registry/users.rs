//! Shared user registry
//!
//! All mutations go through one `RwLock`, so concurrent registrations of the
//! same nickname or racing logins resolve to exactly one winner. Content
//! changes (register, password change, clear) are written to the account
//! store while the write lock is still held, keeping saves in mutation order.

use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::validate_nickname;
use crate::error::{RegistryError, StoreError};
use crate::registry::account::{Account, ConnectionId};
use crate::storage::{AccountStore, MemoryStore, Snapshot};

pub struct UserRegistry {
    accounts: RwLock<BTreeMap<String, Account>>,
    store: Arc<dyn AccountStore>,
    save_retries: u32,
}

impl UserRegistry {
    /// Empty registry writing to `store`; nothing is read from it
    pub fn new(store: Arc<dyn AccountStore>) -> Self {
        Self {
            accounts: RwLock::new(BTreeMap::new()),
            store,
            save_retries: 0,
        }
    }

    /// Registry seeded from the store's current snapshot, every account offline
    pub fn load(store: Arc<dyn AccountStore>) -> Result<Self, StoreError> {
        let snapshot = store.load()?;
        let accounts = snapshot
            .into_iter()
            .map(|(nickname, stored)| (nickname, Account::from(stored)))
            .collect();

        Ok(Self {
            accounts: RwLock::new(accounts),
            store,
            save_retries: 0,
        })
    }

    /// Registry with no backing file
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::default()))
    }

    /// Additional store writes attempted after a failed save
    pub fn with_save_retries(mut self, retries: u32) -> Self {
        self.save_retries = retries;
        self
    }

    pub async fn exists(&self, nickname: &str) -> bool {
        self.accounts.read().await.contains_key(nickname)
    }

    pub async fn register(&self, nickname: &str, credential: &str) -> Result<(), RegistryError> {
        validate_nickname(nickname)?;

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(nickname) {
            return Err(RegistryError::AlreadyExists(nickname.to_string()));
        }

        accounts.insert(nickname.to_string(), Account::new(nickname, credential));
        info!("Registered user '{}'", nickname);

        self.persist(&accounts);
        Ok(())
    }

    /// Binds `connection` to the account. Checked in order: exists, offline, credential.
    pub async fn login(
        &self,
        nickname: &str,
        credential: &str,
        connection: ConnectionId,
    ) -> Result<(), RegistryError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(nickname)
            .ok_or_else(|| RegistryError::NotFound(nickname.to_string()))?;

        if account.is_online() {
            return Err(RegistryError::AlreadyOnline(nickname.to_string()));
        }

        if account.credential() != credential {
            return Err(RegistryError::BadCredential);
        }

        account.set_connection(Some(connection));
        info!("User '{}' is online on {}", nickname, connection);
        Ok(())
    }

    /// Marks the account offline; unknown or offline nicknames are ignored
    pub async fn logout(&self, nickname: &str) {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts.get_mut(nickname) {
            if account.is_online() {
                account.set_connection(None);
                info!("User '{}' is offline", nickname);
            }
        }
    }

    /// Marks the account offline only if it is bound to `connection`.
    ///
    /// Returns whether anything changed.
    pub async fn release(&self, nickname: &str, connection: ConnectionId) -> bool {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(nickname) {
            Some(account) if account.connection() == Some(connection) => {
                account.set_connection(None);
                info!("User '{}' is offline ({} released)", nickname, connection);
                true
            }
            _ => {
                debug!("{} held no login for '{}'", connection, nickname);
                false
            }
        }
    }

    pub async fn change_password(
        &self,
        nickname: &str,
        credential: &str,
    ) -> Result<(), RegistryError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(nickname)
            .ok_or_else(|| RegistryError::NotFound(nickname.to_string()))?;

        account.set_credential(credential.to_string());
        info!("Password changed for '{}'", nickname);

        self.persist(&accounts);
        Ok(())
    }

    /// Online nicknames in sorted order
    pub async fn online_nicknames(&self) -> Vec<String> {
        self.accounts
            .read()
            .await
            .values()
            .filter(|account| account.is_online())
            .map(|account| account.nickname().to_string())
            .collect()
    }

    pub async fn lookup_transport(&self, nickname: &str) -> Option<ConnectionId> {
        self.accounts
            .read()
            .await
            .get(nickname)
            .and_then(Account::connection)
    }

    /// Like `lookup_transport`, but tells an unknown user from an offline one
    pub async fn resolve_recipient(&self, nickname: &str) -> Result<ConnectionId, RegistryError> {
        let accounts = self.accounts.read().await;
        let account = accounts
            .get(nickname)
            .ok_or_else(|| RegistryError::NotFound(nickname.to_string()))?;
        account
            .connection()
            .ok_or_else(|| RegistryError::Offline(nickname.to_string()))
    }

    pub async fn credential(&self, nickname: &str) -> Option<String> {
        self.accounts
            .read()
            .await
            .get(nickname)
            .map(|account| account.credential().to_string())
    }

    /// Drops every account. Test hook.
    pub async fn clear(&self) {
        let mut accounts = self.accounts.write().await;
        let dropped = accounts.len();
        accounts.clear();
        warn!("Registry cleared ({} account(s) dropped)", dropped);

        self.persist(&accounts);
    }

    /// Writes the snapshot; failures are retried, then logged. The in-memory
    /// state is authoritative either way.
    fn persist(&self, accounts: &BTreeMap<String, Account>) {
        let snapshot: Snapshot = accounts
            .iter()
            .map(|(nickname, account)| (nickname.clone(), account.to_stored()))
            .collect();

        let attempts = self.save_retries + 1;
        for attempt in 1..=attempts {
            match self.store.save(&snapshot) {
                Ok(()) => return,
                Err(e) if attempt < attempts => {
                    debug!("Account store save attempt {} failed: {}", attempt, e);
                }
                Err(e) => {
                    warn!(
                        "Account store save failed after {} attempt(s), keeping in-memory state: {}",
                        attempts, e
                    );
                }
            }
        }
    }
}
