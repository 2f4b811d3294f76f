use chrono::NaiveDate;
use log::{debug, error, info, warn};

use super::outcome::PipelineOutcome;
use super::state::{PipelineState, ReviewReason};
use crate::category::{Categorization, Categorizer, KeywordCategorizer};
use crate::core::{
    BASE_CURRENCY, ErrorKind, ExtractionWarning, HOME_LANGUAGE, MimeHint, PipelineError, RawInput,
    Stage, StructuredRecord,
};
use crate::extract::{Extractor, TextExtractor};
use crate::fx::{CurrencyNormalizer, Normalization, RateProvider};
use crate::tax::{TaxCalculator, TaxOutcome, TaxRuleTable};

/// Records below this extraction confidence go to manual review.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.70;

/// Sequences extraction, categorization, currency normalization and tax
/// calculation for one receipt at a time.
///
/// A `Pipeline` holds no per-run state: [`Pipeline::process`] takes `&self`
/// and runs for different receipts may proceed concurrently. The only
/// shared state is the rate cache inside the normalizer.
pub struct Pipeline<P> {
    extractor: Box<dyn Extractor>,
    categorizer: Box<dyn Categorizer>,
    normalizer: CurrencyNormalizer<P>,
    calculator: TaxCalculator,
    confidence_threshold: f64,
}

impl<P: RateProvider> Pipeline<P> {
    /// Pipeline with the built-in extractor, keyword categorizer and
    /// default tax rules.
    pub fn new(normalizer: CurrencyNormalizer<P>) -> Self {
        Self {
            extractor: Box::new(TextExtractor::default()),
            categorizer: Box::new(KeywordCategorizer),
            normalizer,
            calculator: TaxCalculator::default(),
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }

    pub fn with_extractor(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    pub fn with_categorizer(mut self, categorizer: impl Categorizer + 'static) -> Self {
        self.categorizer = Box::new(categorizer);
        self
    }

    pub fn with_tax_rules(mut self, rules: TaxRuleTable) -> Self {
        self.calculator = TaxCalculator::new(rules);
        self
    }

    /// Review threshold, clamped to 0.0–1.0. NaN keeps the default.
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Self {
        if threshold.is_nan() {
            warn!("ignoring NaN confidence threshold, keeping {DEFAULT_CONFIDENCE_THRESHOLD}");
            self.confidence_threshold = DEFAULT_CONFIDENCE_THRESHOLD;
        } else {
            self.confidence_threshold = threshold.clamp(0.0, 1.0);
        }
        self
    }

    pub fn confidence_threshold(&self) -> f64 {
        self.confidence_threshold
    }

    pub fn normalizer(&self) -> &CurrencyNormalizer<P> {
        &self.normalizer
    }

    /// Validate an upload's acquired text and run it.
    ///
    /// `mime` accepts MIME types and file extensions; anything other than
    /// a PDF or an image fails at intake.
    pub async fn process_upload(
        &self,
        text: &str,
        source_confidence: f64,
        receipt_date: NaiveDate,
        mime: &str,
    ) -> PipelineOutcome {
        let input = mime
            .parse::<MimeHint>()
            .and_then(|mime| RawInput::new(text, source_confidence, receipt_date, mime));
        match input {
            Ok(input) => self.process(input).await,
            Err(err) => Run::start().fail(err),
        }
    }

    /// Run one receipt through every stage.
    pub async fn process(&self, input: RawInput) -> PipelineOutcome {
        let mut run = Run::start();
        run.advance(PipelineState::TextAcquired);

        let mut record = match self.extractor.extract(&input) {
            Ok(record) => record,
            Err(err) => return run.fail(err),
        };
        run.advance(PipelineState::Structured);

        if record.extraction_confidence < self.confidence_threshold {
            let detail = format!(
                "extraction confidence {:.2} is below {:.2}",
                record.extraction_confidence, self.confidence_threshold
            );
            return run.review(record, ReviewReason::LowConfidenceExtraction, detail);
        }

        match self.categorizer.categorize(&record) {
            Ok(Categorization::Assigned(category)) => record.category = Some(category),
            Ok(Categorization::Ambiguous { best, candidates }) => {
                record.category = Some(best);
                let detail = if candidates.is_empty() {
                    format!("no category rule matched, {best} assumed")
                } else {
                    let names: Vec<&str> = candidates.iter().map(|c| c.label()).collect();
                    format!("tie between {}", names.join(", "))
                };
                return run.review(record, ReviewReason::AmbiguousCategory, detail);
            }
            Err(err) => {
                return run.fail(PipelineError::new(
                    Stage::Categorization,
                    ErrorKind::InvalidCategory,
                    err.to_string(),
                ));
            }
        }
        run.advance(PipelineState::Categorized);

        if record.language == HOME_LANGUAGE && !record.is_base_currency() {
            warn!("Dutch receipt labelled {}, booking it in {BASE_CURRENCY}", record.currency);
            let currency = std::mem::replace(&mut record.currency, BASE_CURRENCY.to_string());
            record.warnings.push(ExtractionWarning::ForeignCurrencyIgnored { currency });
        }
        if record.language == HOME_LANGUAGE || record.is_base_currency() {
            debug!(
                "skipping currency normalization (language {}, currency {})",
                record.language, record.currency
            );
        } else {
            match self.normalizer.normalize(record).await {
                Normalization::Converted(converted) => record = converted,
                Normalization::Unresolved { record, error } => {
                    return run.review(
                        record,
                        ReviewReason::CurrencyConversionFailed,
                        error.to_string(),
                    );
                }
            }
        }
        run.advance(PipelineState::CurrencyNormalized);

        let (Some(totals), Some(category)) = (record.totals.as_ref(), record.category) else {
            return run.fail(PipelineError::new(
                Stage::TaxCalculation,
                ErrorKind::UnparseableReceipt,
                "record reached tax calculation without totals",
            ));
        };
        let tax = self.calculator.calculate(totals, category);
        run.advance(PipelineState::TaxCalculated);

        run.complete(record, tax)
    }
}

/// State tracking and logging for one run.
struct Run {
    state: PipelineState,
}

impl Run {
    fn start() -> Self {
        Self {
            state: PipelineState::Received,
        }
    }

    fn advance(&mut self, to: PipelineState) {
        debug_assert!(self.state.can_transition_to(to), "{} -> {to}", self.state);
        debug!("pipeline {} -> {to}", self.state);
        self.state = to;
    }

    fn review(mut self, record: StructuredRecord, reason: ReviewReason, detail: String) -> PipelineOutcome {
        warn!("receipt sent to manual review after {} ({reason}): {detail}", self.state);
        self.advance(PipelineState::ManualReview);
        PipelineOutcome::ManualReviewRequired {
            record,
            reason,
            detail,
        }
    }

    fn fail(mut self, err: PipelineError) -> PipelineOutcome {
        error!("receipt processing failed after {}: {err}", self.state);
        self.advance(PipelineState::Failed);
        PipelineOutcome::Failed(err)
    }

    fn complete(mut self, record: StructuredRecord, tax: TaxOutcome) -> PipelineOutcome {
        self.advance(PipelineState::Completed);
        let outcome = PipelineOutcome::Completed { record, tax };
        info!("{}", outcome.summary());
        outcome
    }
}
