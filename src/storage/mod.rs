//! Account persistence
//!
//! The registry hands whole snapshots to an `AccountStore` after every
//! content change and reads one back at startup. Online state is never stored.

pub mod filesystem;
pub mod memory;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::StoreError;

pub use filesystem::JsonFileStore;
pub use memory::MemoryStore;

/// Persisted form of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredAccount {
    #[serde(rename = "Name")]
    pub nickname: String,
    #[serde(rename = "Password", alias = "Md5Password")]
    pub credential: String,
}

/// Nickname to account, in nickname order
pub type Snapshot = BTreeMap<String, StoredAccount>;

pub trait AccountStore: Send + Sync {
    fn load(&self) -> Result<Snapshot, StoreError>;

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}
