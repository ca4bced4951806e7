use crate::config::Config;
use crate::error::{AppError, Result};
use crate::feedback::{AccuracySnapshot, AccuracyState, CorrectionOutcome, CorrectionReconciler};
use crate::metrics::{MetricsSink, PREDICTIONS_COUNTER, PREDICTION_CONFIDENCE_HISTOGRAM};
use crate::ml::classifier::Classifier;
use crate::ml::explainer::Explainer;
use crate::ml::features::TokenImportanceRanker;
use crate::ml::models::{Document, Explanation, ImportanceEntry, ProbabilityVector};
use crate::models::{IssueInput, PredictionRecord};
use crate::state::PredictionStore;
use crate::text::{
    LanguageDetector, Normalizer, TextNormalizer, WhatlangDetector, UNKNOWN_LANGUAGE,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

/// Output of [`TriageService::predict`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Identifier of the stored record, used for corrections
    pub id: Uuid,
    pub label: String,

    /// Maximum class probability
    pub confidence: f64,
    pub probabilities: ProbabilityVector,
    pub important_features: Vec<ImportanceEntry>,

    /// Present when `explainer.explain_on_predict` is set
    pub explanation: Option<Explanation>,
}

/// Output of [`TriageService::explain`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainResult {
    /// Normalized text the classifier saw
    pub input_text: String,
    pub explanation: Explanation,
}

/// Entry point for prediction, explanation and correction.
///
/// Owns no per-request state; everything mutable lives in the store and the
/// shared [`AccuracyState`].
pub struct TriageService {
    config: Config,
    classifier: Arc<dyn Classifier>,
    normalizer: Arc<dyn Normalizer>,
    detector: Arc<dyn LanguageDetector>,
    ranker: TokenImportanceRanker,
    explainer: Arc<Explainer>,
    store: Arc<dyn PredictionStore>,
    reconciler: CorrectionReconciler,
    metrics: Arc<dyn MetricsSink>,
}

impl TriageService {
    pub fn new(
        config: Config,
        classifier: Arc<dyn Classifier>,
        store: Arc<dyn PredictionStore>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        let normalizer: Arc<dyn Normalizer> = Arc::new(TextNormalizer::new());
        let ranker = TokenImportanceRanker::with_stop_words(normalizer.stop_words());
        let explainer = Arc::new(Explainer::new(&config.explainer, metrics.clone()));
        let reconciler = CorrectionReconciler::new(
            store.clone(),
            Arc::new(AccuracyState::new()),
            metrics.clone(),
        );

        Self {
            config,
            classifier,
            normalizer,
            detector: Arc::new(WhatlangDetector::new()),
            ranker,
            explainer,
            store,
            reconciler,
            metrics,
        }
    }

    /// Replace the text normalizer; the ranker adopts its stop words
    pub fn with_normalizer(mut self, normalizer: Arc<dyn Normalizer>) -> Self {
        self.ranker = TokenImportanceRanker::with_stop_words(normalizer.stop_words());
        self.normalizer = normalizer;
        self
    }

    pub fn with_language_detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Share an accuracy state with other components
    pub fn with_accuracy_state(mut self, accuracy: Arc<AccuracyState>) -> Self {
        self.reconciler =
            CorrectionReconciler::new(self.store.clone(), accuracy, self.metrics.clone());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validate, language-gate and normalize an issue.
    ///
    /// Rejections happen here, before the classifier is ever called.
    pub fn document(&self, input: &IssueInput) -> Result<Document> {
        input.validate()?;

        let text = input.text();
        if text.trim().is_empty() {
            return Err(AppError::Validation(
                "title and body are both empty".to_string(),
            ));
        }

        if self.config.language.enabled {
            let detected = self.detector.detect(&text);
            let unknown = detected == UNKNOWN_LANGUAGE;
            let accepted = self.config.language.accepted.iter().any(|l| *l == detected)
                || (unknown && self.config.language.allow_unknown);
            if !accepted {
                return Err(AppError::UnsupportedLanguage { detected });
            }
        }

        let tokens = self.normalizer.normalize(&text);
        if tokens.is_empty() {
            return Err(AppError::Validation(
                "text contains no usable tokens after normalization".to_string(),
            ));
        }

        Ok(Document::new(text, tokens))
    }

    /// Classify an issue, rank its tokens and store the prediction
    pub async fn predict(&self, input: &IssueInput) -> Result<PredictionResult> {
        let document = self.document(input)?;
        let batch = vec![document.normalized_text()];

        let probabilities = single(self.classifier.predict_proba(&batch)?, "probability vector")?;
        let label = single(self.classifier.predict(&batch)?, "label")?;
        let confidence = probabilities.confidence();

        let important_features = self.ranker.rank(&document.tokens, self.config.ranker.top_k);

        let explanation = if self.config.explainer.explain_on_predict {
            Some(
                self.run_explainer(document.clone(), self.config.explainer.num_features)
                    .await?,
            )
        } else {
            None
        };

        let record = PredictionRecord::new(input, label.clone(), confidence);
        self.store.save_prediction(&record).await?;

        self.metrics.increment(PREDICTIONS_COUNTER, &label);
        self.metrics.observe(PREDICTION_CONFIDENCE_HISTOGRAM, confidence);

        info!(
            prediction_id = %record.id,
            label = %label,
            confidence,
            tokens = document.tokens.len(),
            "Prediction stored"
        );

        Ok(PredictionResult {
            id: record.id,
            label,
            confidence,
            probabilities,
            important_features,
            explanation,
        })
    }

    /// Explain the classifier's decision for an issue.
    ///
    /// `num_features` defaults to `explainer.num_features`.
    pub async fn explain(
        &self,
        input: &IssueInput,
        num_features: Option<usize>,
    ) -> Result<ExplainResult> {
        let document = self.document(input)?;
        let num_features = num_features.unwrap_or(self.config.explainer.num_features);
        let input_text = document.normalized_text();

        let explanation = self.run_explainer(document, num_features).await?;

        debug!(
            label = %explanation.label,
            features = explanation.features.len(),
            "Explanation served"
        );

        Ok(ExplainResult {
            input_text,
            explanation,
        })
    }

    /// Explanations are CPU-bound, so they run on the blocking pool
    async fn run_explainer(&self, document: Document, num_features: usize) -> Result<Explanation> {
        let explainer = self.explainer.clone();
        let classifier = self.classifier.clone();

        tokio::task::spawn_blocking(move || {
            explainer.explain(&document, classifier.as_ref(), num_features)
        })
        .await
        .map_err(|e| AppError::Internal(format!("Explanation task join error: {}", e)))?
    }

    pub async fn correct(&self, id: Uuid, corrected_label: &str) -> Result<CorrectionOutcome> {
        self.reconciler.correct(id, corrected_label).await
    }

    pub async fn get_prediction(&self, id: &Uuid) -> Result<PredictionRecord> {
        self.store
            .get_prediction(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Prediction {} not found", id)))
    }

    pub async fn list_predictions(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<PredictionRecord>> {
        self.store.list_predictions(page, page_size).await
    }

    pub async fn count_predictions(&self) -> Result<u64> {
        self.store.count_predictions().await
    }

    pub fn accuracy(&self) -> AccuracySnapshot {
        self.reconciler.accuracy().snapshot()
    }
}

/// Unwrap a one-document batch, rejecting malformed oracle output
fn single<T>(mut batch: Vec<T>, what: &str) -> Result<T> {
    if batch.len() != 1 {
        return Err(AppError::Classifier(format!(
            "classifier returned {} {}s for 1 document",
            batch.len(),
            what
        )));
    }
    batch
        .pop()
        .ok_or_else(|| AppError::Classifier(format!("classifier returned no {}", what)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::InMemorySink;
    use crate::ml::classifier::LinearTextClassifier;
    use crate::state::InMemoryStore;

    fn service(config: Config) -> (TriageService, Arc<InMemorySink>) {
        let sink = Arc::new(InMemorySink::new());
        let classifier = Arc::new(LinearTextClassifier::embedded().unwrap());
        let service = TriageService::new(
            config,
            classifier,
            Arc::new(InMemoryStore::new()),
            sink.clone(),
        );
        (service, sink)
    }

    fn seeded_config() -> Config {
        let mut config = Config::default();
        config.explainer = config.explainer.with_seed(42);
        config
    }

    fn crash_report() -> IssueInput {
        IssueInput::new("App crashes on click", "Steps to reproduce: click submit")
    }

    #[tokio::test]
    async fn test_predict_stores_record() {
        let (service, sink) = service(seeded_config());

        let result = service.predict(&crash_report()).await.unwrap();
        assert_eq!(result.label, "bug");
        assert!(result.confidence > 0.0 && result.confidence <= 1.0);
        assert_eq!(result.confidence, result.probabilities.confidence());
        assert!(!result.important_features.is_empty());
        assert!(result.explanation.is_none());

        let stored = service.get_prediction(&result.id).await.unwrap();
        assert_eq!(stored.predicted_label, "bug");
        assert_eq!(
            stored.text,
            "App crashes on click Steps to reproduce: click submit"
        );
        assert_eq!(sink.counter(PREDICTIONS_COUNTER, "bug"), 1);
    }

    #[tokio::test]
    async fn test_explain_on_predict_attaches_explanation() {
        let mut config = seeded_config();
        config.explainer.explain_on_predict = true;
        let (service, _) = service(config);

        let result = service.predict(&crash_report()).await.unwrap();
        let explanation = result.explanation.unwrap();
        assert_eq!(explanation.label, result.probabilities.top().0);
        assert!(explanation.features.len() <= 10);
    }

    #[tokio::test]
    async fn test_non_english_is_rejected_before_classification() {
        let (service, sink) = service(seeded_config());
        let input = IssueInput::new(
            "Die Anwendung stürzt ab",
            "Jedes Mal, wenn ich auf der Einstellungsseite den Knopf zum Speichern drücke, \
             stürzt die Anwendung ab. Danach funktioniert gar nichts mehr.",
        );

        match service.predict(&input).await {
            Err(AppError::UnsupportedLanguage { detected }) => assert_eq!(detected, "de"),
            other => panic!("expected language rejection, got {:?}", other.map(|r| r.label)),
        }
        assert_eq!(sink.counter_total(PREDICTIONS_COUNTER), 0);
        assert_eq!(service.count_predictions().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_short_english_titles_pass_the_gate() {
        let (service, _) = service(seeded_config());
        for (title, body) in [
            ("Crash with de-DE locale", "Dates render wrong"),
            ("Die roll animation freezes", "Clicking roll again hangs"),
            ("Support para element", "Markdown renderer drops tags"),
        ] {
            let result = service.predict(&IssueInput::new(title, body)).await;
            assert!(result.is_ok(), "{:?} rejected: {:?}", title, result.err());
        }
    }

    #[tokio::test]
    async fn test_unknown_language_can_be_refused() {
        let mut config = seeded_config();
        config.language.allow_unknown = false;
        let (service, _) = service(config);

        let result = service.predict(&IssueInput::new("1234", "5678")).await;
        assert!(matches!(
            result,
            Err(AppError::UnsupportedLanguage { ref detected }) if detected == UNKNOWN_LANGUAGE
        ));
    }

    #[tokio::test]
    async fn test_empty_input_is_rejected() {
        let (service, _) = service(seeded_config());
        let result = service.predict(&IssueInput::new("  ", "")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_language_gate_can_be_disabled() {
        let mut config = seeded_config();
        config.language.enabled = false;
        let (service, _) = service(config);

        let input = IssueInput::new("Die Anwendung funktioniert nicht", "crash error");
        assert!(service.predict(&input).await.is_ok());
    }

    #[tokio::test]
    async fn test_correct_updates_accuracy() {
        let (service, _) = service(seeded_config());
        let result = service.predict(&crash_report()).await.unwrap();

        let outcome = service.correct(result.id, "enhancement").await.unwrap();
        assert!(!outcome.is_correct);

        let snapshot = service.accuracy();
        assert_eq!(snapshot.incorrect_total, 1);
        assert_eq!(snapshot.accuracy, Some(0.0));
    }
}
