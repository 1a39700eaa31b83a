//! Bounded sliding window of recent samples.

use std::collections::VecDeque;
use std::num::NonZeroUsize;

use chrono::NaiveTime;
use rust_decimal::Decimal;

/// Decimal places percent change is rounded to before any comparison.
pub const CHANGE_PRECISION: u32 = 3;

/// One window entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowPoint {
    pub value: Decimal,
    pub timestamp: NaiveTime,
}

/// Fixed-capacity window, oldest first.
#[derive(Debug, Clone)]
pub struct EvalWindow {
    points: VecDeque<WindowPoint>,
    capacity: NonZeroUsize,
}

impl EvalWindow {
    #[must_use]
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            points: VecDeque::with_capacity(capacity.get()),
            capacity,
        }
    }

    /// Appends a point, evicting the oldest when the window is full.
    pub fn push(&mut self, value: Decimal, timestamp: NaiveTime) {
        if self.points.len() == self.capacity.get() {
            self.points.pop_front();
        }
        self.points.push_back(WindowPoint { value, timestamp });
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity.get()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.points.len() == self.capacity.get()
    }

    #[must_use]
    pub fn oldest(&self) -> Option<&WindowPoint> {
        self.points.front()
    }

    #[must_use]
    pub fn newest(&self) -> Option<&WindowPoint> {
        self.points.back()
    }

    pub fn values(&self) -> impl Iterator<Item = Decimal> + '_ {
        self.points.iter().map(|p| p.value)
    }

    /// Percent change from the oldest to the newest point.
    #[must_use]
    pub fn change(&self) -> Option<Decimal> {
        percent_change(self.oldest()?.value, self.newest()?.value)
    }
}

/// `(current - start) / start`, rounded to [`CHANGE_PRECISION`] places.
///
/// Returns `None` when `start` is zero.
#[must_use]
pub fn percent_change(start: Decimal, current: Decimal) -> Option<Decimal> {
    let delta = current.checked_sub(start)?;
    let change = delta.checked_div(start)?;
    Some(change.round_dp(CHANGE_PRECISION))
}
