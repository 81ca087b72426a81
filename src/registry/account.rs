//! Account records

use std::fmt;

use crate::storage::StoredAccount;

/// Opaque handle of a live connection, resolved through the peer table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A registered user. `connection` is set iff the user is online.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    nickname: String,
    credential: String,
    connection: Option<ConnectionId>,
}

impl Account {
    pub fn new(nickname: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            nickname: nickname.into(),
            credential: credential.into(),
            connection: None,
        }
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn connection(&self) -> Option<ConnectionId> {
        self.connection
    }

    pub fn is_online(&self) -> bool {
        self.connection.is_some()
    }

    pub(crate) fn set_credential(&mut self, credential: String) {
        self.credential = credential;
    }

    pub(crate) fn set_connection(&mut self, connection: Option<ConnectionId>) {
        self.connection = connection;
    }

    pub fn to_stored(&self) -> StoredAccount {
        StoredAccount {
            nickname: self.nickname.clone(),
            credential: self.credential.clone(),
        }
    }
}

/// Stored accounts always come back offline
impl From<StoredAccount> for Account {
    fn from(stored: StoredAccount) -> Self {
        Account::new(stored.nickname, stored.credential)
    }
}
