//! RevisionStore - the append-only history collection behind versioned documents.

use tracing::debug;

use crate::document::Document;
use crate::error::DocumentError;
use crate::store::{DocumentStore, Namespace, Query, StorageError};

use super::record::{record_key, HistoryRecord};

/// Reads and appends history records in one history collection.
///
/// Clone-friendly when the store is; clones address the same collection.
#[derive(Clone, Debug)]
pub struct RevisionStore<S> {
    store: S,
    target: Namespace,
}

impl<S> RevisionStore<S> {
    pub fn new(store: S, target: Namespace) -> Self {
        RevisionStore { store, target }
    }

    /// The history collection this store writes to.
    pub fn target(&self) -> &Namespace {
        &self.target
    }
}

impl<S: DocumentStore + Clone> RevisionStore<S> {
    /// Highest recorded revision for `id`, if any.
    pub fn latest_revision(&self, id: &str) -> Result<Option<u64>, DocumentError> {
        let records = self.store.find(&self.target, &by_id(id))?;
        let mut latest = None;
        for record in records {
            let record = HistoryRecord::from_document(record)?;
            latest = latest.max(Some(record.revision));
        }
        Ok(latest)
    }

    /// The revision the next save of `id` must record.
    pub fn next_revision(&self, id: &str) -> Result<u64, DocumentError> {
        Ok(self.latest_revision(id)?.unwrap_or(0) + 1)
    }

    /// Record `snapshot` as `revision` of `id`.
    ///
    /// Never overwrites: a record already stored for `(id, revision)` fails
    /// with [`DocumentError::RevisionConflict`]. This detects two saves racing
    /// for one revision; it does not undo the loser's primary write.
    pub fn append(&self, id: &str, revision: u64, snapshot: Document) -> Result<(), DocumentError> {
        let record = HistoryRecord::new(id, revision, snapshot).to_document()?;
        match self.store.insert(&self.target, record) {
            Ok(_) => {
                debug!(target_ns = %self.target, id, revision, "revision recorded");
                Ok(())
            }
            Err(StorageError::DuplicateKey { .. }) => Err(DocumentError::RevisionConflict {
                id: id.to_string(),
                revision,
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// The snapshot stored for `revision` of `id`.
    pub fn get_revision(&self, id: &str, revision: u64) -> Result<Option<Document>, DocumentError> {
        let Some(stored) = self.store.find_one(&self.target, &record_key(id, revision))? else {
            return Ok(None);
        };
        let record = HistoryRecord::from_document(stored)?;
        Ok(Some(record.doc))
    }

    /// Snapshots of `id`, ascending by revision, fetched lazily.
    pub fn list_revisions(&self, id: &str) -> Revisions<S> {
        Revisions {
            store: self.clone(),
            id: id.to_string(),
            state: Cursor::Pending,
        }
    }

    /// Full history records of `id`, ascending by revision.
    pub fn records(&self, id: &str) -> Result<Vec<HistoryRecord>, DocumentError> {
        let mut records = self
            .store
            .find(&self.target, &by_id(id))?
            .into_iter()
            .map(HistoryRecord::from_document)
            .collect::<Result<Vec<_>, _>>()?;
        records.sort_by_key(|record| record.revision);
        Ok(records)
    }

    /// Number of records for `id`.
    pub fn count(&self, id: &str) -> Result<usize, DocumentError> {
        Ok(self.store.count(&self.target, &by_id(id))?)
    }

    /// Remove every record for `id`.
    pub fn delete_all(&self, id: &str) -> Result<usize, DocumentError> {
        let removed = self.store.delete_many(&self.target, &by_id(id))?;
        debug!(target_ns = %self.target, id, removed, "history deleted");
        Ok(removed)
    }

    /// Remove every record belonging to any of `ids`.
    pub fn delete_ids(&self, ids: &[String]) -> Result<usize, DocumentError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let query = Query::new().is_in("id", ids.iter().map(String::as_str));
        let removed = self.store.delete_many(&self.target, &query)?;
        debug!(target_ns = %self.target, ids = ids.len(), removed, "history deleted");
        Ok(removed)
    }

    /// Remove every record whose snapshot matches `filter`.
    pub fn delete_matching(&self, filter: &Query) -> Result<usize, DocumentError> {
        let removed = self.store.delete_many(&self.target, &filter.nested("doc"))?;
        debug!(target_ns = %self.target, removed, "matching history deleted");
        Ok(removed)
    }
}

fn by_id(id: &str) -> Query {
    Query::new().eq("id", id)
}

#[derive(Clone, Debug)]
enum Cursor {
    Pending,
    Reading { next: u64, last: u64 },
    Done,
}

/// Lazy, finite sequence of snapshots for one document, ascending by revision.
///
/// Nothing is read until the first call to `next`. A clone taken before
/// iterating, or [`restart`](Revisions::restart), reads the history afresh.
#[derive(Clone, Debug)]
pub struct Revisions<S> {
    store: RevisionStore<S>,
    id: String,
    state: Cursor,
}

impl<S> Revisions<S> {
    pub fn restart(&mut self) {
        self.state = Cursor::Pending;
    }
}

impl<S: DocumentStore + Clone> Iterator for Revisions<S> {
    type Item = Result<Document, DocumentError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                Cursor::Done => return None,
                Cursor::Pending => match self.store.latest_revision(&self.id) {
                    Ok(Some(last)) => self.state = Cursor::Reading { next: 1, last },
                    Ok(None) => self.state = Cursor::Done,
                    Err(err) => {
                        self.state = Cursor::Done;
                        return Some(Err(err));
                    }
                },
                Cursor::Reading { next, last } => {
                    self.state = if next < last {
                        Cursor::Reading {
                            next: next + 1,
                            last,
                        }
                    } else {
                        Cursor::Done
                    };
                    match self.store.get_revision(&self.id, next) {
                        Ok(Some(doc)) => return Some(Ok(doc)),
                        // removed by delete_matching
                        Ok(None) => continue,
                        Err(err) => {
                            self.state = Cursor::Done;
                            return Some(Err(err));
                        }
                    }
                }
            }
        }
    }
}
