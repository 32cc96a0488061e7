//! PyO3 bindings for the FOMC forecast pipeline.
//!
//! Exposes the leakage-safe dataset-assembly engine to Python:
//! - Event and document types
//! - Timeline and document-index construction with validation
//! - The end-to-end pipeline, with an optional Python-side classifier
//!
//! The Python side supplies document scores (NLP stage) and, optionally, a
//! classifier object with `fit(features, labels, weights)` and
//! `predict_probability(features)` methods; the default backend is the
//! class-prior baseline.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use fomc_alignment::{DocumentIndex as RustDocumentIndex, EventTimeline as RustEventTimeline};
use fomc_core::{
    Document as RustDocument, DocumentType as RustDocumentType, Error as RustError,
    Event as RustEvent, PipelineConfig, PolicyOutcome as RustPolicyOutcome,
    ScoreVector as RustScoreVector,
};
use fomc_dataset::{
    run_pipeline, ClassPriorClassifier, EventForecast as RustEventForecast, Partition,
    ProbabilisticClassifier,
};

fn to_py_err(e: RustError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

// ============================================================================
// Python-exposed Types
// ============================================================================

/// Outcome of one FOMC decision.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, PartialEq)]
pub enum PolicyOutcome {
    Cut,
    Hold,
    Hike,
}

impl From<PolicyOutcome> for RustPolicyOutcome {
    fn from(o: PolicyOutcome) -> Self {
        match o {
            PolicyOutcome::Cut => RustPolicyOutcome::Cut,
            PolicyOutcome::Hold => RustPolicyOutcome::Hold,
            PolicyOutcome::Hike => RustPolicyOutcome::Hike,
        }
    }
}

impl From<RustPolicyOutcome> for PolicyOutcome {
    fn from(o: RustPolicyOutcome) -> Self {
        match o {
            RustPolicyOutcome::Cut => PolicyOutcome::Cut,
            RustPolicyOutcome::Hold => PolicyOutcome::Hold,
            RustPolicyOutcome::Hike => PolicyOutcome::Hike,
        }
    }
}

/// Kind of text artifact a score vector was derived from.
#[pyclass(eq, eq_int)]
#[derive(Clone, Copy, PartialEq)]
pub enum DocumentType {
    Statement,
    Minutes,
    PressConference,
    Speech,
    ResearchNote,
    News,
}

impl From<DocumentType> for RustDocumentType {
    fn from(t: DocumentType) -> Self {
        match t {
            DocumentType::Statement => RustDocumentType::Statement,
            DocumentType::Minutes => RustDocumentType::Minutes,
            DocumentType::PressConference => RustDocumentType::PressConference,
            DocumentType::Speech => RustDocumentType::Speech,
            DocumentType::ResearchNote => RustDocumentType::ResearchNote,
            DocumentType::News => RustDocumentType::News,
        }
    }
}

impl From<RustDocumentType> for DocumentType {
    fn from(t: RustDocumentType) -> Self {
        match t {
            RustDocumentType::Statement => DocumentType::Statement,
            RustDocumentType::Minutes => DocumentType::Minutes,
            RustDocumentType::PressConference => DocumentType::PressConference,
            RustDocumentType::Speech => DocumentType::Speech,
            RustDocumentType::ResearchNote => DocumentType::ResearchNote,
            RustDocumentType::News => DocumentType::News,
        }
    }
}

/// One FOMC decision event.
#[pyclass]
#[derive(Clone)]
pub struct Event {
    #[pyo3(get, set)]
    pub id: u64,
    #[pyo3(get, set)]
    pub decision_ts_ms: i64,
    #[pyo3(get, set)]
    pub outcome: PolicyOutcome,
}

#[pymethods]
impl Event {
    #[new]
    fn new(id: u64, decision_ts_ms: i64, outcome: PolicyOutcome) -> Self {
        Event {
            id,
            decision_ts_ms,
            outcome,
        }
    }

    fn __repr__(&self) -> String {
        format!("Event(id={}, decision_ts_ms={})", self.id, self.decision_ts_ms)
    }
}

impl From<Event> for RustEvent {
    fn from(e: Event) -> Self {
        RustEvent {
            id: e.id,
            decision_ts: e.decision_ts_ms,
            outcome: e.outcome.into(),
        }
    }
}

/// One scored text artifact.
#[pyclass]
#[derive(Clone)]
pub struct Document {
    #[pyo3(get, set)]
    pub id: String,
    #[pyo3(get, set)]
    pub publish_ts_ms: i64,
    #[pyo3(get, set)]
    pub doc_type: DocumentType,
    #[pyo3(get, set)]
    pub sentiment: f64,
    #[pyo3(get, set)]
    pub policy_bias: f64,
    #[pyo3(get, set)]
    pub inflation_concern: f64,
    #[pyo3(get, set)]
    pub growth_concern: f64,
    #[pyo3(get, set)]
    pub embedding_summary: f64,
}

#[pymethods]
impl Document {
    #[new]
    #[allow(clippy::too_many_arguments)]
    fn new(
        id: String,
        publish_ts_ms: i64,
        doc_type: DocumentType,
        sentiment: f64,
        policy_bias: f64,
        inflation_concern: f64,
        growth_concern: f64,
        embedding_summary: f64,
    ) -> Self {
        Document {
            id,
            publish_ts_ms,
            doc_type,
            sentiment,
            policy_bias,
            inflation_concern,
            growth_concern,
            embedding_summary,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Document(id={:?}, publish_ts_ms={})",
            self.id, self.publish_ts_ms
        )
    }
}

impl From<Document> for RustDocument {
    fn from(d: Document) -> Self {
        RustDocument {
            id: d.id,
            publish_ts: d.publish_ts_ms,
            doc_type: d.doc_type.into(),
            scores: RustScoreVector {
                sentiment: d.sentiment,
                policy_bias: d.policy_bias,
                inflation_concern: d.inflation_concern,
                growth_concern: d.growth_concern,
                embedding_summary: d.embedding_summary,
            },
        }
    }
}

/// One per-event forecast with its data-quality flags.
#[pyclass]
#[derive(Clone)]
pub struct EventForecast {
    #[pyo3(get)]
    pub event_id: u64,
    #[pyo3(get)]
    pub decision_ts_ms: i64,
    #[pyo3(get)]
    pub probability: f64,
    #[pyo3(get)]
    pub predicted_cut: bool,
    #[pyo3(get)]
    pub insufficient_data: bool,
    #[pyo3(get)]
    pub imputed_dimensions: usize,
}

#[pymethods]
impl EventForecast {
    fn __repr__(&self) -> String {
        format!(
            "EventForecast(event_id={}, probability={:.4}, predicted_cut={})",
            self.event_id, self.probability, self.predicted_cut
        )
    }
}

impl From<RustEventForecast> for EventForecast {
    fn from(f: RustEventForecast) -> Self {
        EventForecast {
            event_id: f.event_id,
            decision_ts_ms: f.decision_ts,
            probability: f.probability,
            predicted_cut: f.predicted_cut,
            insufficient_data: f.insufficient_data,
            imputed_dimensions: f.imputed_dimensions,
        }
    }
}

// ============================================================================
// Engine Classes
// ============================================================================

/// Validated FOMC decision calendar.
#[pyclass(name = "EventTimeline")]
pub struct PyEventTimeline {
    inner: RustEventTimeline,
}

#[pymethods]
impl PyEventTimeline {
    #[new]
    #[pyo3(signature = (events, start_ms=None))]
    fn new(events: Vec<Event>, start_ms: Option<i64>) -> PyResult<Self> {
        let events: Vec<RustEvent> = events.into_iter().map(Into::into).collect();
        let inner = RustEventTimeline::new(events, start_ms).map_err(to_py_err)?;
        Ok(PyEventTimeline { inner })
    }

    /// Number of events.
    fn __len__(&self) -> usize {
        self.inner.len()
    }

    /// Decision window bounds for an event: (lower_ms or None, upper_ms).
    fn window_for(&self, event_id: u64) -> Option<(Option<i64>, i64)> {
        self.inner
            .window_for(event_id)
            .map(|w| (w.lower, w.upper))
    }
}

/// Validated, publish-time-sorted document store.
#[pyclass(name = "DocumentIndex")]
pub struct PyDocumentIndex {
    inner: RustDocumentIndex,
}

#[pymethods]
impl PyDocumentIndex {
    #[new]
    #[pyo3(signature = (as_of_ms=None))]
    fn new(as_of_ms: Option<i64>) -> Self {
        PyDocumentIndex {
            inner: RustDocumentIndex::new(as_of_ms),
        }
    }

    /// Register one document; raises ValueError on rejection.
    fn register(&mut self, document: Document) -> PyResult<()> {
        self.inner.register(document.into()).map_err(to_py_err)
    }

    /// Register a batch, skipping invalid documents. Returns the number
    /// accepted.
    fn register_all(&mut self, documents: Vec<Document>) -> usize {
        self.inner
            .register_all(documents.into_iter().map(Into::into))
    }

    /// Number of accepted documents.
    fn __len__(&self) -> usize {
        self.inner.len()
    }

    /// Accepted and rejected counts as a dict.
    fn stats<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
        let stats = self.inner.stats();
        let dict = pyo3::types::PyDict::new_bound(py);
        dict.set_item("accepted", stats.accepted)?;
        dict.set_item("rejected_missing_timestamp", stats.rejected_missing_timestamp)?;
        dict.set_item(
            "rejected_malformed_timestamp",
            stats.rejected_malformed_timestamp,
        )?;
        dict.set_item("rejected_future_dated", stats.rejected_future_dated)?;
        dict.set_item("rejected_duplicate_id", stats.rejected_duplicate_id)?;
        dict.set_item(
            "rejected_non_finite_score",
            stats.rejected_non_finite_score,
        )?;
        Ok(dict.into_any())
    }
}

// ============================================================================
// Classifier Bridge
// ============================================================================

/// Adapter that drives a Python classifier object through the capability
/// contract: `fit(features, labels, weights)` and
/// `predict_probability(features)`.
struct PyBackend {
    obj: PyObject,
}

impl ProbabilisticClassifier for PyBackend {
    fn fit(&mut self, train: &Partition) -> fomc_core::Result<()> {
        Python::with_gil(|py| {
            let features: Vec<Vec<f64>> =
                train.iter().map(|e| e.features.clone()).collect();
            let labels: Vec<bool> = train.iter().map(|e| e.label).collect();
            let weights: Vec<f64> = train.iter().map(|e| e.weight).collect();
            self.obj
                .call_method1(py, "fit", (features, labels, weights))
                .map(|_| ())
                .map_err(|e| RustError::model(e.to_string()))
        })
    }

    fn predict_probability(&self, features: &[f64]) -> fomc_core::Result<f64> {
        Python::with_gil(|py| {
            self.obj
                .call_method1(py, "predict_probability", (features.to_vec(),))
                .and_then(|v| v.extract::<f64>(py))
                .map_err(|e| RustError::model(e.to_string()))
        })
    }
}

// ============================================================================
// Pipeline Entry Point
// ============================================================================

/// Result of one pipeline run.
#[pyclass]
pub struct ForecastResult {
    /// Forecasts for the chronologically held-out test events.
    #[pyo3(get)]
    pub forecasts: Vec<EventForecast>,
    /// Run summary as a JSON string (skip counts, coverage gaps,
    /// imputation rate, partition balance).
    #[pyo3(get)]
    pub summary_json: String,
}

/// Run the full pipeline.
///
/// `config_json` is a serialized `PipelineConfig` (pass "{}"-free defaults
/// via `default_config_json`). `classifier` is an optional Python object
/// honoring the fit/predict_probability contract; the class-prior baseline
/// is used when omitted.
#[pyfunction]
#[pyo3(signature = (config_json, events, documents, classifier=None))]
fn run_forecast(
    config_json: &str,
    events: Vec<Event>,
    documents: Vec<Document>,
    classifier: Option<PyObject>,
) -> PyResult<ForecastResult> {
    let config: PipelineConfig = serde_json::from_str(config_json)
        .map_err(|e| PyValueError::new_err(format!("invalid config: {e}")))?;
    config.validate().map_err(to_py_err)?;

    let events: Vec<RustEvent> = events.into_iter().map(Into::into).collect();
    let timeline =
        RustEventTimeline::new(events, config.timeline.start).map_err(to_py_err)?;

    let mut index = RustDocumentIndex::new(config.timeline.as_of);
    index.register_all(documents.into_iter().map(Into::into));

    let backend: Box<dyn ProbabilisticClassifier> = match classifier {
        Some(obj) => Box::new(PyBackend { obj }),
        None => Box::new(ClassPriorClassifier::new()),
    };

    let report = run_pipeline(&config, &timeline, &index, backend).map_err(to_py_err)?;
    let summary_json = serde_json::to_string(&report.summary)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;

    Ok(ForecastResult {
        forecasts: report.forecasts.into_iter().map(Into::into).collect(),
        summary_json,
    })
}

/// Default pipeline configuration as a JSON string, for editing on the
/// Python side.
#[pyfunction]
fn default_config_json() -> PyResult<String> {
    serde_json::to_string_pretty(&PipelineConfig::default())
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

// ============================================================================
// Module Definition
// ============================================================================

/// FOMC Forecast Core - leakage-safe dataset assembly for Python.
#[pymodule]
fn fomc_forecast_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Types
    m.add_class::<PolicyOutcome>()?;
    m.add_class::<DocumentType>()?;
    m.add_class::<Event>()?;
    m.add_class::<Document>()?;
    m.add_class::<EventForecast>()?;
    m.add_class::<ForecastResult>()?;

    // Engine classes
    m.add_class::<PyEventTimeline>()?;
    m.add_class::<PyDocumentIndex>()?;

    // Pipeline
    m.add_function(wrap_pyfunction!(run_forecast, m)?)?;
    m.add_function(wrap_pyfunction!(default_config_json, m)?)?;

    Ok(())
}
