//! Document index.
//!
//! Normalized, validated store of scored documents, sorted by publication
//! time and queryable by window bounds. Registration rejects documents
//! whose publish timestamp is missing, malformed, or forward-dated; per-
//! document failures are isolated and never abort a batch.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use tracing::warn;

use fomc_core::{
    Document, DocumentType, Error, Result, ScoreVector, TimestampMs, WindowBounds,
};
use std::collections::HashSet;

/// One raw document record, as supplied by the external scoring stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Unique document id.
    pub id: String,
    /// Publication instant as an RFC 3339 timestamp. Absent or unparsable
    /// timestamps reject the record; they are never defaulted to ingestion
    /// time.
    pub publish_time: Option<String>,
    /// Artifact kind.
    pub doc_type: DocumentType,
    /// Scores from the external NLP stage.
    pub scores: ScoreVector,
}

impl DocumentRecord {
    fn into_document(self) -> std::result::Result<Document, RecordRejection> {
        let raw = match self.publish_time {
            Some(raw) => raw,
            None => return Err(RecordRejection::MissingTimestamp(self.id)),
        };
        let publish_ts = match DateTime::parse_from_rfc3339(&raw) {
            Ok(dt) => dt.timestamp_millis(),
            Err(_) => return Err(RecordRejection::MalformedTimestamp(self.id, raw)),
        };
        Ok(Document {
            id: self.id,
            publish_ts,
            doc_type: self.doc_type,
            scores: self.scores,
        })
    }
}

enum RecordRejection {
    MissingTimestamp(String),
    MalformedTimestamp(String, String),
}

/// Statistics about document registration quality.
///
/// These counts are part of the pipeline's output contract and feed the
/// run summary.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IndexStats {
    /// Documents accepted into the index.
    pub accepted: u64,
    /// Records rejected for a missing publish timestamp.
    pub rejected_missing_timestamp: u64,
    /// Records rejected for an unparsable publish timestamp.
    pub rejected_malformed_timestamp: u64,
    /// Documents rejected as forward-dated relative to the as-of instant.
    pub rejected_future_dated: u64,
    /// Documents rejected for a duplicate id.
    pub rejected_duplicate_id: u64,
    /// Documents rejected for non-finite score values.
    pub rejected_non_finite_score: u64,
}

impl IndexStats {
    /// Total rejected documents, all reasons.
    pub fn total_rejected(&self) -> u64 {
        self.rejected_missing_timestamp
            + self.rejected_malformed_timestamp
            + self.rejected_future_dated
            + self.rejected_duplicate_id
            + self.rejected_non_finite_score
    }
}

/// Validated document store, sorted by publication time.
pub struct DocumentIndex {
    /// Documents sorted by `publish_ts` ascending, insertion-order stable
    /// on ties.
    documents: Vec<Document>,
    /// Registered ids, for duplicate detection.
    ids: HashSet<String>,
    /// Processing instant; documents published after it are rejected.
    as_of: Option<TimestampMs>,
    stats: IndexStats,
}

impl DocumentIndex {
    /// Create an empty index.
    ///
    /// `as_of` is the processing instant: a document whose publish
    /// timestamp is after it is rejected as forward-dated (protection
    /// against leaked or mislabeled content). `None` disables the check.
    pub fn new(as_of: Option<TimestampMs>) -> Self {
        Self {
            documents: Vec::new(),
            ids: HashSet::new(),
            as_of,
            stats: IndexStats::default(),
        }
    }

    /// Register one document.
    ///
    /// Rejects with [`Error::InvalidDocument`] on a forward-dated publish
    /// timestamp, a duplicate id, or non-finite scores. The rejection is
    /// also counted in [`IndexStats`].
    pub fn register(&mut self, document: Document) -> Result<()> {
        if let Some(as_of) = self.as_of {
            if document.publish_ts > as_of {
                self.stats.rejected_future_dated += 1;
                return Err(Error::invalid_document(format!(
                    "document {} published at {} is after the as-of instant {}",
                    document.id, document.publish_ts, as_of
                )));
            }
        }
        if self.ids.contains(&document.id) {
            self.stats.rejected_duplicate_id += 1;
            return Err(Error::invalid_document(format!(
                "duplicate document id {}",
                document.id
            )));
        }
        if !document.scores.is_finite() {
            self.stats.rejected_non_finite_score += 1;
            return Err(Error::invalid_document(format!(
                "document {} has non-finite score values",
                document.id
            )));
        }

        // Insert keeping ascending publish order, stable on equal instants.
        let pos = self
            .documents
            .partition_point(|d| d.publish_ts <= document.publish_ts);
        self.ids.insert(document.id.clone());
        self.documents.insert(pos, document);
        self.stats.accepted += 1;
        Ok(())
    }

    /// Register a batch of documents, isolating per-document failures.
    ///
    /// Returns the number of documents accepted; each rejection is logged
    /// and counted, and the batch continues.
    pub fn register_all(&mut self, documents: impl IntoIterator<Item = Document>) -> usize {
        let mut accepted = 0;
        for document in documents {
            let id = document.id.clone();
            match self.register(document) {
                Ok(()) => accepted += 1,
                Err(e) => warn!(document_id = %id, error = %e, "document rejected"),
            }
        }
        accepted
    }

    /// Register a batch of raw records, isolating per-record failures.
    ///
    /// Timestamp validation happens here: records with missing or
    /// unparsable publish timestamps are counted and skipped before the
    /// document-level checks.
    pub fn register_records(
        &mut self,
        records: impl IntoIterator<Item = DocumentRecord>,
    ) -> usize {
        let mut accepted = 0;
        for record in records {
            match record.into_document() {
                Ok(document) => {
                    let id = document.id.clone();
                    match self.register(document) {
                        Ok(()) => accepted += 1,
                        Err(e) => warn!(document_id = %id, error = %e, "document rejected"),
                    }
                }
                Err(RecordRejection::MissingTimestamp(id)) => {
                    self.stats.rejected_missing_timestamp += 1;
                    warn!(document_id = %id, "document rejected: missing publish timestamp");
                }
                Err(RecordRejection::MalformedTimestamp(id, raw)) => {
                    self.stats.rejected_malformed_timestamp += 1;
                    warn!(
                        document_id = %id,
                        raw = %raw,
                        "document rejected: unparsable publish timestamp"
                    );
                }
            }
        }
        accepted
    }

    /// Documents inside a window, ascending by publish time.
    ///
    /// Pure range query over the sorted store: restartable, no consumption
    /// side effect.
    pub fn documents_in(
        &self,
        bounds: &WindowBounds,
    ) -> impl Iterator<Item = &Document> + '_ {
        let lo = match bounds.lower {
            Some(lower) => self.documents.partition_point(|d| d.publish_ts < lower),
            None => 0,
        };
        let hi = self
            .documents
            .partition_point(|d| d.publish_ts < bounds.upper);
        self.documents[lo..hi.max(lo)].iter()
    }

    /// All accepted documents, ascending by publish time.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Number of accepted documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True if no documents were accepted.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Registration statistics.
    pub fn stats(&self) -> &IndexStats {
        &self.stats
    }
}
