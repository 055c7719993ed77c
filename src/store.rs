//! Persistence collaborator contract
//!
//! The pipeline itself never persists anything. Callers own deduplication
//! and insert-if-absent keyed by draw number; this module gives them the
//! contract plus two simple implementations.

use crate::models::Draw;
use crate::reconciler::DrawNumberReconciler;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("draw {0} already exists")]
    AlreadyExists(u32),

    #[error("store I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("store file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Draw persistence keyed by draw number
pub trait DrawStore {
    fn get_draw_by_number(&self, draw_number: u32) -> Result<Option<Draw>, StoreError>;

    /// Insert a draw; fails with [`StoreError::AlreadyExists`] on a duplicate number
    fn insert_draw(&self, draw: Draw) -> Result<Draw, StoreError>;

    /// Highest stored draw number, used to seed numbering
    fn latest_draw_number(&self) -> Result<Option<u32>, StoreError>;

    /// Draw with the highest stored number
    fn latest_draw(&self) -> Result<Option<Draw>, StoreError> {
        match self.latest_draw_number()? {
            Some(n) => self.get_draw_by_number(n),
            None => Ok(None),
        }
    }
}

/// Reconciler seeded from the newest stored draw, or from `floor` when the
/// store is empty or behind it
pub fn seed_reconciler<S: DrawStore + ?Sized>(
    store: &S,
    floor: u32,
) -> Result<DrawNumberReconciler, StoreError> {
    Ok(match store.latest_draw()? {
        Some(draw) if draw.draw_number >= floor => {
            DrawNumberReconciler::with_latest_draw(draw.draw_number, draw.draw_date)
        }
        _ => DrawNumberReconciler::with_latest(floor),
    })
}

/// Outcome of [`ingest`]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped_mock: usize,
}

/// Insert-if-absent for a batch of draws.
///
/// With `real_only`, synthetic draws (including enhanced ones) are skipped
/// instead of stored.
pub fn ingest<S: DrawStore + ?Sized>(
    store: &S,
    draws: impl IntoIterator<Item = Draw>,
    real_only: bool,
) -> Result<IngestSummary, StoreError> {
    let mut summary = IngestSummary::default();

    for draw in draws {
        if real_only && draw.is_mock() {
            summary.skipped_mock += 1;
            continue;
        }
        match store.insert_draw(draw) {
            Ok(d) => {
                tracing::info!("Stored draw {} ({})", d.draw_number, d.source);
                summary.inserted += 1;
            }
            Err(StoreError::AlreadyExists(n)) => {
                tracing::debug!("Draw {} already stored", n);
                summary.duplicates += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(summary)
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStore {
    draws: Mutex<BTreeMap<u32, Draw>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.draws.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DrawStore for MemoryStore {
    fn get_draw_by_number(&self, draw_number: u32) -> Result<Option<Draw>, StoreError> {
        let draws = self.draws.lock().unwrap_or_else(|e| e.into_inner());
        Ok(draws.get(&draw_number).cloned())
    }

    fn insert_draw(&self, draw: Draw) -> Result<Draw, StoreError> {
        let mut draws = self.draws.lock().unwrap_or_else(|e| e.into_inner());
        if draws.contains_key(&draw.draw_number) {
            return Err(StoreError::AlreadyExists(draw.draw_number));
        }
        draws.insert(draw.draw_number, draw.clone());
        Ok(draw)
    }

    fn latest_draw_number(&self) -> Result<Option<u32>, StoreError> {
        let draws = self.draws.lock().unwrap_or_else(|e| e.into_inner());
        Ok(draws.keys().next_back().copied())
    }
}

/// Store backed by a pretty-printed JSON array on disk.
///
/// The whole file is rewritten on every insert.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// Open (or start) a store at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let inner = MemoryStore::new();

        if path.exists() {
            let content = fs::read_to_string(&path)?;
            if !content.trim().is_empty() {
                let draws: Vec<Draw> = serde_json::from_str(&content)?;
                let mut map = inner.draws.lock().unwrap_or_else(|e| e.into_inner());
                for draw in draws {
                    map.insert(draw.draw_number, draw);
                }
            }
        }

        Ok(Self { path, inner })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StoreError> {
        let draws: Vec<Draw> = {
            let map = self.inner.draws.lock().unwrap_or_else(|e| e.into_inner());
            map.values().rev().cloned().collect()
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&draws)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl DrawStore for JsonFileStore {
    fn get_draw_by_number(&self, draw_number: u32) -> Result<Option<Draw>, StoreError> {
        self.inner.get_draw_by_number(draw_number)
    }

    fn insert_draw(&self, draw: Draw) -> Result<Draw, StoreError> {
        let draw = self.inner.insert_draw(draw)?;
        self.flush()?;
        Ok(draw)
    }

    fn latest_draw_number(&self) -> Result<Option<u32>, StoreError> {
        self.inner.latest_draw_number()
    }
}
