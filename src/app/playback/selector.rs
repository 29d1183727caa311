use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum SelectError {
    #[error("provider {index} does not exist (only {count} available)")]
    OutOfRange { index: usize, count: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureOutcome {
    /// Moved on to the provider at this index.
    Advanced(usize),
    /// Already on the last provider; nothing left to fall back to.
    Exhausted,
}

/// Provider index plus dropdown state for one opened title.
///
/// `selected` is always `< count`; `count` is never zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlaybackSelection {
    selected: usize,
    count: usize,
    dropdown_open: bool,
}

impl PlaybackSelection {
    pub(crate) fn new(count: usize) -> Self {
        Self {
            selected: 0,
            count: count.max(1),
            dropdown_open: false,
        }
    }

    pub(crate) fn selected(&self) -> usize {
        self.selected
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn dropdown_open(&self) -> bool {
        self.dropdown_open
    }

    pub(crate) fn is_last(&self) -> bool {
        self.selected + 1 >= self.count
    }

    pub(crate) fn toggle_dropdown(&mut self) {
        self.dropdown_open = !self.dropdown_open;
    }

    pub(crate) fn close_dropdown(&mut self) {
        self.dropdown_open = false;
    }

    pub(crate) fn select(&mut self, index: usize) -> Result<(), SelectError> {
        if index >= self.count {
            return Err(SelectError::OutOfRange {
                index,
                count: self.count,
            });
        }
        self.selected = index;
        self.dropdown_open = false;
        Ok(())
    }

    pub(crate) fn report_failure(&mut self) -> FailureOutcome {
        if self.is_last() {
            FailureOutcome::Exhausted
        } else {
            self.selected += 1;
            FailureOutcome::Advanced(self.selected)
        }
    }

    /// Adapts to a rebuilt list for the same title; keeps the index when it
    /// still fits.
    pub(crate) fn resize(&mut self, count: usize) {
        self.count = count.max(1);
        self.selected = self.selected.min(self.count - 1);
    }
}
