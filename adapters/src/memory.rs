//! In-memory `CredentialStore` implementation.
//!
//! Holds credentials in a map keyed by username. The map lock is taken per call
//! and never held across an await point owned by the caller.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::errors::AdapterError;
use crate::models::{CredentialRecord, NewCredential, UserId};
use crate::CredentialStore;

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    records: RwLock<HashMap<String, CredentialRecord>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with existing records, e.g. digests migrated from another store.
    pub fn with_records(records: impl IntoIterator<Item = CredentialRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.username.clone(), record))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<CredentialRecord>, AdapterError> {
        Ok(self.records.read().await.get(username).cloned())
    }

    async fn insert(&self, credential: NewCredential) -> Result<CredentialRecord, AdapterError> {
        let mut records = self.records.write().await;
        if records.contains_key(&credential.username) {
            return Err(AdapterError::Duplicate {
                username: credential.username,
            });
        }

        let record = CredentialRecord {
            id: UserId::generate(),
            username: credential.username,
            password_digest: credential.password_digest,
        };
        records.insert(record.username.clone(), record.clone());
        log::debug!("stored credential {} for {}", record.id, record.username);

        Ok(record)
    }
}
