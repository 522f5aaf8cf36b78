use crate::config::PaginationConfig;
use crate::state::PageOutcome;
use std::fmt;

/// Why the page walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A fetched page held fewer records than a full page, so it was taken as the last one.
    /// A short page that is not actually last ends the walk too; nothing on the
    /// listing tells the two apart.
    ShortPage {
        page: u32,
        records: usize,
        threshold: usize,
    },

    /// The page ceiling was reached
    MaxPagesReached { max_pages: u32 },

    /// The run was cancelled before this page was fetched
    Cancelled { before_page: u32 },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShortPage {
                page,
                records,
                threshold,
            } => write!(
                f,
                "page {} had {} records (< {}), treated as the last page",
                page, records, threshold
            ),
            Self::MaxPagesReached { max_pages } => {
                write!(f, "reached the page ceiling of {}", max_pages)
            }
            Self::Cancelled { before_page } => {
                write!(f, "cancelled before page {}", before_page)
            }
        }
    }
}

/// Pagination state machine: `Init -> Fetching(1) -> {Fetching(n + 1) | Stopped}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Init,
    Fetching { page: u32 },
    Stopped(StopReason),
}

impl ControllerState {
    /// Leaves `Init` for the first page
    pub fn start(self) -> Self {
        match self {
            Self::Init => Self::Fetching { page: 1 },
            other => other,
        }
    }

    /// Applies the outcome of the page currently being fetched
    ///
    /// Skipped and empty pages never stop the walk on their own; only a short
    /// extracted page or the page ceiling does.
    pub fn after_page(self, outcome: &PageOutcome, limits: &PaginationConfig) -> Self {
        let page = match self {
            Self::Fetching { page } => page,
            other => return other,
        };

        if let PageOutcome::Extracted { records } = *outcome {
            if records < limits.full_page_threshold {
                return Self::Stopped(StopReason::ShortPage {
                    page,
                    records,
                    threshold: limits.full_page_threshold,
                });
            }
        }

        if page >= limits.max_pages {
            Self::Stopped(StopReason::MaxPagesReached {
                max_pages: limits.max_pages,
            })
        } else {
            Self::Fetching { page: page + 1 }
        }
    }

    /// Stops the walk ahead of the next fetch
    pub fn cancel(self) -> Self {
        match self {
            Self::Init => Self::Stopped(StopReason::Cancelled { before_page: 1 }),
            Self::Fetching { page } => Self::Stopped(StopReason::Cancelled { before_page: page }),
            stopped => stopped,
        }
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped(_))
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        match self {
            Self::Stopped(reason) => Some(*reason),
            _ => None,
        }
    }
}
