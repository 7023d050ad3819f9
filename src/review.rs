//! Admin review table: search, status filter, column sort and pagination
//! over stored applications
use crate::error::LedgerError;
use crate::ledger::{ApplicationSummary, Status};
use std::cmp::Ordering;
use std::str::FromStr;

pub const DEFAULT_ROWS_PER_PAGE: usize = 10;
pub const ROWS_PER_PAGE_OPTIONS: [usize; 4] = [5, 10, 25, 50];
/// Page buttons shown at once.
pub const PAGE_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    ApplicationNumber,
    UnitName,
    Mobile,
    Status,
    SubmittedAt,
}

impl SortKey {
    fn compare(self, a: &ApplicationSummary, b: &ApplicationSummary) -> Ordering {
        match self {
            SortKey::ApplicationNumber => a.application_number.cmp(&b.application_number),
            SortKey::UnitName => a.unit_name.cmp(&b.unit_name),
            SortKey::Mobile => a.mobile.cmp(&b.mobile),
            // by name, as the table shows it
            SortKey::Status => a.status.as_str().cmp(b.status.as_str()),
            SortKey::SubmittedAt => a.submitted_at.cmp(&b.submitted_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(Status),
}

impl FromStr for StatusFilter {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        s.parse().map(StatusFilter::Only)
    }
}

impl StatusFilter {
    fn matches(self, status: Status) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => wanted == status,
        }
    }
}

/// Per status totals over the unfiltered rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub approved: usize,
    pub pending: usize,
    pub rejected: usize,
}

impl StatusCounts {
    pub fn of(rows: &[ApplicationSummary]) -> Self {
        rows.iter().fold(Self::default(), |mut counts, row| {
            match row.status {
                Status::Approved => counts.approved += 1,
                Status::Pending => counts.pending += 1,
                Status::Rejected => counts.rejected += 1,
            }
            counts
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePage {
    pub rows: Vec<ApplicationSummary>,
    /// Rows after search and status filter.
    pub filtered: usize,
    pub total_pages: usize,
    pub page: usize,
    /// 1-indexed position of the first and last shown row, when any.
    pub showing: Option<(usize, usize)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    search: String,
    status: StatusFilter,
    sort: Option<SortConfig>,
    page: usize,
    rows_per_page: usize,
}

impl Default for TableQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            status: StatusFilter::All,
            sort: None,
            page: 1,
            rows_per_page: DEFAULT_ROWS_PER_PAGE,
        }
    }
}

impl TableQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn status(&self) -> StatusFilter {
        self.status
    }

    pub fn sort(&self) -> Option<SortConfig> {
        self.sort
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn rows_per_page(&self) -> usize {
        self.rows_per_page
    }

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
        self.page = 1;
    }

    pub fn set_status(&mut self, status: StatusFilter) {
        self.status = status;
        self.page = 1;
    }

    /// Zero is treated as one.
    pub fn set_rows_per_page(&mut self, rows: usize) {
        self.rows_per_page = rows.max(1);
        self.page = 1;
    }

    /// Same key while ascending flips to descending; anything else sorts
    /// ascending by `key`.
    pub fn request_sort(&mut self, key: SortKey) {
        let direction = match self.sort {
            Some(SortConfig {
                key: current,
                direction: Direction::Asc,
            }) if current == key => Direction::Desc,
            _ => Direction::Asc,
        };
        self.sort = Some(SortConfig { key, direction });
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    pub fn next_page(&mut self, total_pages: usize) {
        self.page = self.page.saturating_add(1).min(total_pages.max(1));
    }

    pub fn prev_page(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    /// Clears search and status filter.
    pub fn reset_filters(&mut self) {
        self.search.clear();
        self.status = StatusFilter::All;
        self.page = 1;
    }

    fn matches(&self, row: &ApplicationSummary) -> bool {
        let term = self.search.to_lowercase();
        let found = [&row.application_number, &row.unit_name, &row.mobile]
            .iter()
            .any(|value| value.to_lowercase().contains(&term));
        found && self.status.matches(row.status)
    }

    pub fn apply(&self, rows: &[ApplicationSummary]) -> TablePage {
        let mut filtered: Vec<&ApplicationSummary> = rows.iter().filter(|r| self.matches(r)).collect();

        if let Some(SortConfig { key, direction }) = self.sort {
            filtered.sort_by(|a, b| {
                let ordering = key.compare(a, b);
                match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                }
            });
        }

        let total_pages = filtered.len().div_ceil(self.rows_per_page);
        // an overflowing start lies past the end
        let start = (self.page - 1)
            .checked_mul(self.rows_per_page)
            .unwrap_or(usize::MAX);
        let end = start.saturating_add(self.rows_per_page).min(filtered.len());
        let shown: Vec<ApplicationSummary> = if start >= filtered.len() {
            Vec::new()
        } else {
            filtered[start..end].iter().map(|r| (*r).clone()).collect()
        };
        let showing = (!shown.is_empty()).then(|| (start + 1, end));

        TablePage {
            rows: shown,
            filtered: filtered.len(),
            total_pages,
            page: self.page,
            showing,
        }
    }
}

/// Page numbers to render as buttons, centred on `current` where possible.
pub fn page_window(current: usize, total_pages: usize) -> Vec<usize> {
    let count = PAGE_WINDOW.min(total_pages);
    let first = if total_pages <= PAGE_WINDOW || current <= 3 {
        1
    } else if current >= total_pages - 2 {
        total_pages - 4
    } else {
        current - 2
    };
    (first..first + count).collect()
}
