//! Draw number high-water mark
//!
//! Sources that cannot report a draw number get one derived from the largest
//! number seen so far in this process. The numbers are advisory; persistence
//! still treats `draw_number` as the natural key.

use crate::models::draw_days_between;
use chrono::NaiveDate;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Mark {
    number: u32,
    /// Date of the draw holding `number`, when known
    date: Option<NaiveDate>,
    /// `number` was derived rather than reported by a source
    provisional: bool,
}

/// Process-scoped draw numbering state.
///
/// All read-modify-write operations happen under one lock so two concurrent
/// fetches cannot both derive a number from a stale snapshot. Only real
/// draws move the mark; synthetic draws borrow `mark + 1` without keeping it.
#[derive(Debug, Default)]
pub struct DrawNumberReconciler {
    mark: Mutex<Mark>,
}

impl DrawNumberReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a known high-water mark (e.g. the highest stored draw)
    pub fn with_latest(latest: u32) -> Self {
        Self {
            mark: Mutex::new(Mark {
                number: latest,
                ..Mark::default()
            }),
        }
    }

    /// Start from a known draw, so a later unnumbered fetch of the same
    /// drawing gets the same number
    pub fn with_latest_draw(latest: u32, draw_date: NaiveDate) -> Self {
        Self {
            mark: Mutex::new(Mark {
                number: latest,
                date: Some(draw_date),
                provisional: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Mark> {
        // Plain data, so a poisoned lock is still usable
        self.mark.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Current high-water mark (0 when nothing is known)
    pub fn latest(&self) -> u32 {
        self.lock().number
    }

    /// Date of the draw holding the mark, when known
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.lock().date
    }

    /// Record an explicit draw number reported by a source.
    ///
    /// A higher number raises the mark. A reported number always replaces a
    /// derived one, even when lower.
    pub fn observe(&self, draw_number: u32, draw_date: NaiveDate) {
        let mut mark = self.lock();
        if draw_number > mark.number || mark.provisional {
            tracing::debug!("Draw number high-water mark {} -> {}", mark.number, draw_number);
            *mark = Mark {
                number: draw_number,
                date: Some(draw_date),
                provisional: false,
            };
        } else if draw_number == mark.number && mark.date.is_none() {
            mark.date = Some(draw_date);
        }
    }

    /// Number for a real "latest draw" that arrived without one.
    ///
    /// The draw holding the mark keeps its number when fetched again. An
    /// older draw is numbered back from the mark by draw days. A newer draw
    /// gets `mark + 1`, which becomes the mark.
    pub fn assign_latest(&self, draw_date: NaiveDate) -> u32 {
        let mut mark = self.lock();

        if let Some(known) = mark.date {
            if draw_date == known {
                return mark.number;
            }
            if draw_date < known {
                let back = draw_days_between(draw_date, known).max(1);
                return mark.number.saturating_sub(back).max(1);
            }
        }

        let number = mark.number.saturating_add(1);
        *mark = Mark {
            number,
            date: Some(draw_date),
            provisional: true,
        };
        number
    }

    /// Number for a synthetic "latest draw": `mark + 1`, mark unchanged
    pub fn assign_mock(&self) -> u32 {
        self.lock().number.saturating_add(1)
    }

    /// Number for the entry at `position` (0-based, newest first) of a
    /// historical batch of `batch_len` draws.
    ///
    /// With `previous` (the number of the entry just before it in the batch)
    /// the entry gets `previous - 1`. The first entry of a batch gets
    /// `mark - position`; when the mark is too low to number the whole batch
    /// the base is raised to `batch_len` so numbers stay positive. The mark
    /// itself is not moved.
    pub fn assign_historical(
        &self,
        position: usize,
        batch_len: usize,
        previous: Option<u32>,
    ) -> u32 {
        if let Some(previous) = previous {
            return previous.saturating_sub(1).max(1);
        }
        let latest = self.lock().number;
        let batch_len = u32::try_from(batch_len).unwrap_or(u32::MAX);
        let position = u32::try_from(position).unwrap_or(u32::MAX);
        latest.max(batch_len).saturating_sub(position).max(1)
    }
}
