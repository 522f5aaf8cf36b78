//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `PageOutcome`: how a single listing page ended (extracted or skipped)
//! - `ControllerState`: the pagination state machine and its stop reasons

mod controller_state;
mod page_state;

// Re-export main types
pub use controller_state::{ControllerState, StopReason};
pub use page_state::{PageOutcome, SkipCause};
