//! Expense categorization.
//!
//! A [`Categorizer`] picks one of the seven [`Category`] values for an
//! extracted record. [`KeywordCategorizer`] is the built-in rule set;
//! [`LabelCategorizer`] adapts any source that answers with a text label
//! (a classifier service, a user prompt) and checks it against the
//! allow-list.

mod keywords;

pub use crate::core::CategoryError;
pub use keywords::KeywordCategorizer;

use crate::core::{Category, StructuredRecord};

/// Result of categorizing one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Categorization {
    /// A single category won.
    Assigned(Category),
    /// No clear winner. `best` is the guess stored on the record for the
    /// reviewer; `candidates` lists the tied categories (empty when
    /// nothing matched).
    Ambiguous {
        best: Category,
        candidates: Vec<Category>,
    },
}

impl Categorization {
    /// The category to store on the record, whether or not it is certain.
    pub fn category(&self) -> Category {
        match self {
            Self::Assigned(c) => *c,
            Self::Ambiguous { best, .. } => *best,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous { .. })
    }
}

/// Assigns a category to an extracted record.
///
/// Implementations must only produce allow-listed categories. A source
/// that can produce anything else reports it as
/// [`CategoryError::NotAllowed`]; the pipeline treats that as fatal.
pub trait Categorizer: Send + Sync {
    /// # Errors
    ///
    /// [`CategoryError::NotAllowed`] when the underlying source answered
    /// with a label outside the allow-list.
    fn categorize(&self, record: &StructuredRecord) -> Result<Categorization, CategoryError>;
}

/// Categorizer backed by a function returning a free-text label.
///
/// The label is parsed with [`Category::from_str`](std::str::FromStr), so
/// English identifiers and Dutch labels are both accepted.
pub struct LabelCategorizer<F> {
    label_for: F,
}

impl<F> LabelCategorizer<F>
where
    F: Fn(&StructuredRecord) -> String + Send + Sync,
{
    pub fn new(label_for: F) -> Self {
        Self { label_for }
    }
}

impl<F> Categorizer for LabelCategorizer<F>
where
    F: Fn(&StructuredRecord) -> String + Send + Sync,
{
    fn categorize(&self, record: &StructuredRecord) -> Result<Categorization, CategoryError> {
        let label = (self.label_for)(record);
        label.parse::<Category>().map(Categorization::Assigned)
    }
}
