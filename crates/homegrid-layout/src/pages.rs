//! Page sequence operations.
//!
//! Pages have no identity beyond their index; they are the grouping of
//! items by `placement.page`. Structural changes renumber every affected
//! item in the same call, so item page indices always match the sequence.

use std::fmt;

use crate::item::Item;
use crate::store::ItemStore;

/// Page index outside the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageError {
    OutOfRange { index: usize, page_count: usize },
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { index, page_count } => {
                write!(f, "page index {index} out of range (page count {page_count})")
            }
        }
    }
}

impl std::error::Error for PageError {}

impl ItemStore {
    /// Append an empty page and return its index.
    pub fn add_page(&mut self) -> usize {
        self.page_count += 1;
        tracing::debug!(target: "homegrid.pages", page_count = self.page_count, "page appended");
        self.page_count - 1
    }

    /// Insert an empty page at `index` (`0..=page_count`). Items on pages
    /// at or after `index` shift up by one.
    pub fn add_page_at(&mut self, index: usize) -> Result<(), PageError> {
        if index > self.page_count {
            return Err(PageError::OutOfRange {
                index,
                page_count: self.page_count,
            });
        }
        for id in self.ids().to_vec() {
            if let Some(item) = self.get_mut(id)
                && item.placement.page >= index
            {
                item.placement.page += 1;
            }
        }
        self.page_count += 1;
        tracing::debug!(
            target: "homegrid.pages",
            index,
            page_count = self.page_count,
            "page inserted"
        );
        Ok(())
    }

    /// Remove page `index` and everything on it; later pages shift down.
    ///
    /// Returns the deleted items, or `Ok(None)` without touching anything
    /// when only one page remains.
    pub fn remove_page(&mut self, index: usize) -> Result<Option<Vec<Item>>, PageError> {
        if index >= self.page_count {
            return Err(PageError::OutOfRange {
                index,
                page_count: self.page_count,
            });
        }
        if self.page_count == 1 {
            tracing::debug!(target: "homegrid.pages", index, "refusing to remove the last page");
            return Ok(None);
        }

        let doomed: Vec<_> = self
            .items()
            .filter(|item| item.page() == index)
            .map(Item::id)
            .collect();
        let removed: Vec<Item> = doomed.into_iter().filter_map(|id| self.remove(id)).collect();

        for id in self.ids().to_vec() {
            if let Some(item) = self.get_mut(id)
                && item.placement.page > index
            {
                item.placement.page -= 1;
            }
        }
        self.page_count -= 1;
        tracing::debug!(
            target: "homegrid.pages",
            index,
            deleted = removed.len(),
            page_count = self.page_count,
            "page removed"
        );
        Ok(Some(removed))
    }

    #[must_use]
    pub fn is_page_empty(&self, index: usize) -> bool {
        self.items().all(|item| item.page() != index)
    }

    /// Reconcile the page count with the pages items actually sit on.
    ///
    /// Grows the sequence when an item refers past the end. Never removes
    /// pages, empty or not; see [`trim_empty_trailing_pages`](Self::trim_empty_trailing_pages).
    /// Returns the number of pages added.
    pub fn cleanup_empty_pages(&mut self) -> usize {
        let needed = self.items().map(|item| item.page() + 1).max().unwrap_or(1);
        let added = needed.saturating_sub(self.page_count);
        if added > 0 {
            self.page_count = needed;
            tracing::debug!(target: "homegrid.pages", added, "page count grown to fit items");
        }
        added
    }

    /// Drop empty pages from the end of the sequence, keeping at least one.
    /// Returns how many were removed.
    pub fn trim_empty_trailing_pages(&mut self) -> usize {
        let mut trimmed = 0;
        while self.page_count > 1 && self.is_page_empty(self.page_count - 1) {
            self.page_count -= 1;
            trimmed += 1;
        }
        if trimmed > 0 {
            tracing::debug!(target: "homegrid.pages", trimmed, "trailing empty pages trimmed");
        }
        trimmed
    }
}
