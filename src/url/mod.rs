//! URL handling module for Roster-Crawler
//!
//! Listing pages live at `{base}/actor/list/{bucket}-{subcategory}-{page}.html`.
//! Only the page number changes during a run.

mod template;

pub use template::{ListingTemplate, PageRequest};
