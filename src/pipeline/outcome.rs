use serde::{Deserialize, Serialize};

use super::state::{PipelineState, ReviewReason};
use crate::core::{PipelineError, StructuredRecord};
use crate::tax::TaxOutcome;

/// Final result of one pipeline run, handed to storage as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Completed {
        record: StructuredRecord,
        tax: TaxOutcome,
    },
    /// The partially built record always comes along for the reviewer.
    ManualReviewRequired {
        record: StructuredRecord,
        reason: ReviewReason,
        detail: String,
    },
    Failed(PipelineError),
}

impl PipelineOutcome {
    /// Terminal state this outcome corresponds to.
    pub fn state(&self) -> PipelineState {
        match self {
            Self::Completed { .. } => PipelineState::Completed,
            Self::ManualReviewRequired { .. } => PipelineState::ManualReview,
            Self::Failed(_) => PipelineState::Failed,
        }
    }

    pub fn record(&self) -> Option<&StructuredRecord> {
        match self {
            Self::Completed { record, .. } | Self::ManualReviewRequired { record, .. } => Some(record),
            Self::Failed(_) => None,
        }
    }

    pub fn tax(&self) -> Option<&TaxOutcome> {
        match self {
            Self::Completed { tax, .. } => Some(tax),
            _ => None,
        }
    }

    pub fn review_reason(&self) -> Option<ReviewReason> {
        match self {
            Self::ManualReviewRequired { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Reason string for every non-completed outcome.
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Completed { .. } => None,
            Self::ManualReviewRequired { reason, .. } => Some(reason.as_str()),
            Self::Failed(err) => Some(err.kind.as_str()),
        }
    }

    /// One-line description for logs and review queues.
    pub fn summary(&self) -> String {
        match self {
            Self::Completed { record, tax } => {
                let total = record
                    .totals
                    .as_ref()
                    .map(|t| t.total_incl_vat.to_string())
                    .unwrap_or_default();
                let category = record.category.map(|c| c.label()).unwrap_or("-");
                format!(
                    "completed: {} {total} {} [{category}] vat refund {} profit deduction {}",
                    record.vendor_name.as_deref().unwrap_or("unknown vendor"),
                    record.currency,
                    tax.vat_refund,
                    tax.profit_deduction
                )
            }
            Self::ManualReviewRequired { reason, detail, .. } => {
                format!("manual review ({reason}): {detail}")
            }
            Self::Failed(err) => format!("failed: {err}"),
        }
    }
}
