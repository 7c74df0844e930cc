// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory collaborators for tests and examples.
use std::collections::HashMap;
use std::convert::Infallible;

use thiserror::Error;

use crate::file_codec::{EncryptedFile, FileMeta};
use crate::pac::Pac;
use crate::traits::{FileTransport, RecipientDirectory, RecipientRecord};
use crate::{FileId, UserId};

/// Recipient directory backed by a hash map.
#[derive(Clone, Debug, Default)]
pub struct MemoryDirectory {
    records: HashMap<UserId, RecipientRecord>,
}

impl MemoryDirectory {
    pub fn insert(&mut self, record: RecipientRecord) {
        self.records.insert(record.user_id.clone(), record);
    }
}

impl RecipientDirectory for MemoryDirectory {
    type Error = Infallible;

    fn recipient(&self, user_id: &UserId) -> Result<Option<RecipientRecord>, Self::Error> {
        Ok(self.records.get(user_id).cloned())
    }
}

/// File and token transport backed by in-process collections.
///
/// File ids are sequential for reproducible tests. The `failing` variant errors on every call to
/// exercise abort paths.
#[derive(Clone, Debug, Default)]
pub struct MemoryTransport {
    files: HashMap<FileId, EncryptedFile>,
    pacs: Vec<Pac>,
    next_file_id: u64,
    failing: bool,
}

impl MemoryTransport {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    fn check(&self) -> Result<(), MemoryTransportError> {
        if self.failing {
            Err(MemoryTransportError::Unavailable)
        } else {
            Ok(())
        }
    }
}

impl FileTransport for MemoryTransport {
    type Error = MemoryTransportError;

    fn put_file(
        &mut self,
        encrypted: &EncryptedFile,
        _meta: &FileMeta,
    ) -> Result<FileId, Self::Error> {
        self.check()?;
        let file_id = format!("file-{}", self.next_file_id);
        self.next_file_id += 1;
        self.files.insert(file_id.clone(), encrypted.clone());
        Ok(file_id)
    }

    fn get_file(&self, file_id: &FileId) -> Result<Option<EncryptedFile>, Self::Error> {
        self.check()?;
        Ok(self.files.get(file_id).cloned())
    }

    fn put_pac(&mut self, pac: &Pac) -> Result<(), Self::Error> {
        self.check()?;
        self.pacs.push(pac.clone());
        Ok(())
    }

    fn list_issued_pacs(&self, user_id: &UserId) -> Result<Vec<Pac>, Self::Error> {
        self.check()?;
        Ok(self
            .pacs
            .iter()
            .filter(|pac| pac.issuer_id() == user_id)
            .cloned()
            .collect())
    }

    fn list_received_pacs(&self, user_id: &UserId) -> Result<Vec<Pac>, Self::Error> {
        self.check()?;
        Ok(self
            .pacs
            .iter()
            .filter(|pac| pac.recipient_id() == user_id)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Error)]
pub enum MemoryTransportError {
    #[error("transport is unavailable")]
    Unavailable,
}
