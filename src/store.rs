use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::watch;

use crate::error::StoreError;
use crate::loader::{ParsedSheet, SheetRecord};
use crate::report::{ReportRow, RowId, RowStatus, Summary, UploadInfo};

/// In-memory row table backing one workflow page
///
/// Rows keep their ingestion order for the lifetime of a load. The only
/// mutations are a bulk [`replace_all`](StatusStore::replace_all), a whole
/// [`clear`](StatusStore::clear) and point updates keyed by row id (last
/// write wins). Every mutation bumps a revision
/// number that observers can follow through [`subscribe`](StatusStore::subscribe).
///
/// Each bulk replace or clear also starts a new *generation*. Writers that captured an
/// older generation (a processing run over a previous upload) use
/// [`update_in`](StatusStore::update_in), which refuses to touch the new rows.
pub struct StatusStore {
    inner: RwLock<StoreInner>,
    revision: watch::Sender<u64>,
}

#[derive(Default)]
struct StoreInner {
    rows: Vec<ReportRow>,
    index: HashMap<RowId, usize>,
    records: Vec<SheetRecord>,
    generation: u64,
    source: Option<UploadInfo>,
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        StatusStore {
            inner: RwLock::new(StoreInner::default()),
            revision,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Swap in a freshly ingested row sequence
    ///
    /// # Returns
    /// * `Ok(generation)` - The generation number of the new rows
    ///
    /// # Errors
    /// * `StoreError::DuplicateId` if two rows share an id; the store is left unchanged
    pub fn replace_all(
        &self,
        rows: Vec<ReportRow>,
        source: Option<UploadInfo>,
    ) -> Result<u64, StoreError> {
        self.replace_sheet(
            ParsedSheet {
                records: Vec::new(),
                rows,
            },
            source,
        )
    }

    /// Like [`replace_all`](StatusStore::replace_all), keeping the sheet's raw records
    pub fn replace_sheet(
        &self,
        sheet: ParsedSheet,
        source: Option<UploadInfo>,
    ) -> Result<u64, StoreError> {
        let ParsedSheet { records, rows } = sheet;
        let mut index = HashMap::with_capacity(rows.len());
        for (position, row) in rows.iter().enumerate() {
            if index.insert(row.id, position).is_some() {
                return Err(StoreError::DuplicateId(row.id));
            }
        }

        let generation = {
            let mut inner = self.write();
            inner.rows = rows;
            inner.index = index;
            inner.records = records;
            inner.generation += 1;
            inner.source = source;
            inner.generation
        };
        self.bump();
        Ok(generation)
    }

    /// Empty the store ahead of a new upload
    ///
    /// Starts a new generation, so a run still working on the old rows
    /// writes nothing.
    pub fn clear(&self) -> u64 {
        let generation = {
            let mut inner = self.write();
            let next = inner.generation + 1;
            *inner = StoreInner {
                generation: next,
                ..StoreInner::default()
            };
            next
        };
        self.bump();
        generation
    }

    /// Apply `f` to the row with `id`; returns `false` if no such row exists
    ///
    /// `f` must not change the row's id.
    pub fn update<F>(&self, id: RowId, f: F) -> bool
    where
        F: FnOnce(&mut ReportRow),
    {
        let updated = {
            let mut inner = self.write();
            let inner = &mut *inner;
            match inner.index.get(&id) {
                Some(&position) => {
                    f(&mut inner.rows[position]);
                    true
                }
                None => false,
            }
        };
        if updated {
            self.bump();
        }
        updated
    }

    /// Like [`update`](StatusStore::update), but only while the store still
    /// holds rows of `generation`
    pub fn update_in<F>(&self, generation: u64, id: RowId, f: F) -> bool
    where
        F: FnOnce(&mut ReportRow),
    {
        let updated = {
            let mut inner = self.write();
            let inner = &mut *inner;
            if inner.generation != generation {
                false
            } else if let Some(&position) = inner.index.get(&id) {
                f(&mut inner.rows[position]);
                true
            } else {
                false
            }
        };
        if updated {
            self.bump();
        }
        updated
    }

    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    pub fn get(&self, id: RowId) -> Option<ReportRow> {
        let inner = self.read();
        inner.index.get(&id).map(|&position| inner.rows[position].clone())
    }

    pub fn snapshot(&self) -> Vec<ReportRow> {
        self.read().rows.clone()
    }

    pub fn summary(&self) -> Summary {
        Summary::of(&self.read().rows)
    }

    /// Ids of rows currently `Pending`, in row order, with their generation
    pub fn pending_ids(&self) -> (u64, Vec<RowId>) {
        let inner = self.read();
        let ids = inner
            .rows
            .iter()
            .filter(|row| row.status == RowStatus::Pending)
            .map(|row| row.id)
            .collect();
        (inner.generation, ids)
    }

    /// Every parsed column of the current upload, in sheet order
    pub fn records(&self) -> Vec<SheetRecord> {
        self.read().records.clone()
    }

    pub fn source(&self) -> Option<UploadInfo> {
        self.read().source.clone()
    }

    pub fn len(&self) -> usize {
        self.read().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().rows.is_empty()
    }

    /// Follow mutations; the value is a revision counter, read the store for data
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }
}
