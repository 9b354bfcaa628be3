//! Fixed-width time windows anchored at the first crossing.
//!
//! Windows are half-open, `[start + k·w, start + (k+1)·w)`, and the window
//! count is chosen so the last crossing falls inside the last window. Arrival
//! counting and flow/speed aggregation share this binning so their window
//! indices line up.

use serde::{Deserialize, Serialize};

use crate::domain::CrossingEvent;
use crate::error::InsufficientDataError;

/// Upper bound on the window count of one section.
pub const MAX_WINDOWS: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindows {
    start: f64,
    width: f64,
    count: usize,
}

impl TimeWindows {
    /// Windows covering `[min_time, max_time]`.
    ///
    /// `width` must be positive and finite, and the span may need at most
    /// [`MAX_WINDOWS`] windows.
    pub fn covering(min_time: f64, max_time: f64, width: f64) -> Result<Self, InsufficientDataError> {
        if !(width.is_finite() && width > 0.0) {
            return Err(InsufficientDataError::InvalidWindowWidth { width });
        }
        let needed = ((max_time - min_time) / width).floor().max(0.0) + 1.0;
        if !needed.is_finite() || needed > MAX_WINDOWS as f64 {
            return Err(InsufficientDataError::TooManyWindows {
                windows: needed,
                max: MAX_WINDOWS,
            });
        }
        Ok(Self {
            start: min_time,
            width,
            count: needed as usize,
        })
    }

    /// Windows covering every crossing time; `NoEvents` without events.
    pub fn for_events(events: &[CrossingEvent], width: f64) -> Result<Self, InsufficientDataError> {
        let (min, max) = time_span(events).ok_or(InsufficientDataError::NoEvents)?;
        Self::covering(min, max, width)
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Index of the window containing `time`, clamped into range.
    pub fn index_of(&self, time: f64) -> usize {
        if time <= self.start {
            return 0;
        }
        raw_index(self.start, time, self.width).min(self.count - 1)
    }

    /// `(start, end)` of window `k`; `end` is exclusive.
    pub fn bounds(&self, k: usize) -> (f64, f64) {
        let lo = self.start + k as f64 * self.width;
        (lo, lo + self.width)
    }
}

fn raw_index(start: f64, time: f64, width: f64) -> usize {
    ((time - start) / width).floor().max(0.0) as usize
}

/// Earliest and latest crossing time.
pub fn time_span(events: &[CrossingEvent]) -> Option<(f64, f64)> {
    let mut iter = events.iter().map(|e| e.crossing_time);
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
}
