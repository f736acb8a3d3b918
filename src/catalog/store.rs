use super::repository::{CatalogRepository, RepositoryError};
use crate::model::{CatalogTotals, CurrencyRecord};

/// Page sizes offered when none are configured.
pub const DEFAULT_PAGE_SIZES: [usize; 4] = [5, 10, 20, 50];
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Result of a reload.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The record set was replaced; carries the new record count.
    Loaded(usize),
    /// The repository failed; the previous record set is still in place.
    Retained(RepositoryError),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_))
    }
}

/// Holds the full record set, the search term and the pagination window.
pub struct CatalogStore {
    records: Vec<CurrencyRecord>,
    search_term: String,
    current_page: usize,
    page_size: usize,
    page_sizes: Vec<usize>,
}

impl CatalogStore {
    pub fn new(page_size: usize, page_sizes: Vec<usize>) -> Self {
        Self {
            records: Vec::new(),
            search_term: String::new(),
            current_page: 1,
            page_size: page_size.max(1),
            page_sizes,
        }
    }

    /// Replace the record set from the repository.
    ///
    /// Never fails outright: on a repository error the previous records stay.
    pub async fn load<R: CatalogRepository>(&mut self, repo: &R) -> LoadOutcome {
        match repo.fetch_all().await {
            Ok(records) => {
                tracing::debug!(count = records.len(), "catalog loaded");
                self.records = records;
                self.clamp_page();
                LoadOutcome::Loaded(self.records.len())
            }
            Err(e) => {
                tracing::warn!(error = %e, retained = self.records.len(), "catalog load failed");
                LoadOutcome::Retained(e)
            }
        }
    }

    pub fn records(&self) -> &[CurrencyRecord] {
        &self.records
    }

    /// Mutable view for reordering; the slice cannot grow or shrink.
    pub(super) fn records_mut(&mut self) -> &mut [CurrencyRecord] {
        &mut self.records
    }

    #[cfg(test)]
    pub fn set_records(&mut self, records: Vec<CurrencyRecord>) {
        self.records = records;
        self.clamp_page();
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn is_filtered(&self) -> bool {
        !self.search_term.is_empty()
    }

    /// Store a trimmed, lower-cased term. A change resets to page 1.
    pub fn set_search_term(&mut self, term: &str) {
        let normalized = term.trim().to_lowercase();
        if normalized != self.search_term {
            self.search_term = normalized;
            self.current_page = 1;
        }
    }

    /// Records matching the search term, in current in-memory order.
    pub fn filtered_view(&self) -> Vec<&CurrencyRecord> {
        self.records
            .iter()
            .filter(|r| r.matches(&self.search_term))
            .collect()
    }

    pub fn filtered_count(&self) -> usize {
        if self.search_term.is_empty() {
            return self.records.len();
        }
        self.records.iter().filter(|r| r.matches(&self.search_term)).count()
    }

    /// Slice `[(n-1)*p, n*p)` of the filtered view. Empty when out of range.
    pub fn page(&self, page_number: usize, page_size: usize) -> Vec<&CurrencyRecord> {
        if page_number == 0 || page_size == 0 {
            return Vec::new();
        }
        let Some(skip) = (page_number - 1).checked_mul(page_size) else {
            return Vec::new();
        };
        self.records
            .iter()
            .filter(|r| r.matches(&self.search_term))
            .skip(skip)
            .take(page_size)
            .collect()
    }

    pub fn total_pages(&self, page_size: usize) -> usize {
        if page_size == 0 {
            return 0;
        }
        self.filtered_count().div_ceil(page_size)
    }

    // ── Pagination window ──

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.total_pages(self.page_size)
    }

    /// The current page of the filtered view.
    pub fn visible(&self) -> Vec<&CurrencyRecord> {
        self.page(self.current_page, self.page_size)
    }

    /// Offset of the first visible record within the filtered view.
    pub fn page_offset(&self) -> usize {
        (self.current_page - 1) * self.page_size
    }

    pub fn set_page(&mut self, page: usize) {
        self.current_page = page.clamp(1, self.page_count().max(1));
    }

    pub fn next_page(&mut self) -> bool {
        let before = self.current_page;
        self.set_page(before + 1);
        self.current_page != before
    }

    pub fn prev_page(&mut self) -> bool {
        let before = self.current_page;
        self.set_page(before.saturating_sub(1));
        self.current_page != before
    }

    pub fn first_page(&mut self) {
        self.current_page = 1;
    }

    pub fn last_page(&mut self) {
        self.current_page = self.page_count().max(1);
    }

    /// Change the page size; always returns to page 1.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.current_page = 1;
    }

    /// Advance to the next configured page size, wrapping around.
    pub fn cycle_page_size(&mut self) -> usize {
        let next = match self.page_sizes.iter().position(|&s| s == self.page_size) {
            Some(i) => self.page_sizes[(i + 1) % self.page_sizes.len()],
            None => self.page_sizes.first().copied().unwrap_or(DEFAULT_PAGE_SIZE),
        };
        self.set_page_size(next);
        next
    }

    fn clamp_page(&mut self) {
        self.set_page(self.current_page);
    }

    pub fn totals(&self) -> CatalogTotals {
        CatalogTotals {
            currency_count: self.records.len(),
            banknote_count: self.records.iter().map(|r| r.banknote_count()).sum(),
            filtered_count: self.filtered_count(),
        }
    }

    pub fn position_of(&self, id: i64) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZES.to_vec())
    }
}
