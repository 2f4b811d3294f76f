//! The receipt pipeline: orchestration, run states and outcomes.
//!
//! ```text
//! Received → TextAcquired → Structured → Categorized → CurrencyNormalized → TaxCalculated → Completed
//!                               │             │                 │
//!                               └── ManualReview / Failed ──────┘
//! ```
//!
//! Each [`Pipeline::process`] call is an independent run ending in exactly
//! one [`PipelineOutcome`]. Recoverable problems (low confidence, ambiguous
//! category, unresolved conversion) end in manual review with the partial
//! record attached; contract violations and unreadable receipts fail.

mod orchestrator;
mod outcome;
mod state;

pub use orchestrator::{DEFAULT_CONFIDENCE_THRESHOLD, Pipeline};
pub use outcome::PipelineOutcome;
pub use state::{PipelineState, ReviewReason};
