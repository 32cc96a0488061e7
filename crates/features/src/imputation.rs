//! Historical type means for imputation.
//!
//! When an event window has no contributing documents of a given type, the
//! aggregation engine substitutes that type's dataset-wide mean scores and
//! flags the dimensions as imputed.

use statrs::statistics::Statistics;

use fomc_core::{Document, DocumentType, ScoreVector, SCORE_DIMS};

/// Dataset-wide mean score vectors per document type.
pub struct TypeMeans {
    per_type: [ScoreVector; DocumentType::ALL.len()],
    observed: [bool; DocumentType::ALL.len()],
    global: ScoreVector,
}

impl TypeMeans {
    /// Compute means over every accepted document.
    ///
    /// Types absent from the whole dataset fall back to the global mean;
    /// with no documents at all, every mean is zero.
    pub fn from_documents(documents: &[Document]) -> Self {
        let global = mean_scores(documents.iter());

        let mut per_type = [ScoreVector::zeroed(); DocumentType::ALL.len()];
        let mut observed = [false; DocumentType::ALL.len()];
        for ty in DocumentType::ALL {
            let has_any = documents.iter().any(|d| d.doc_type == ty);
            observed[ty.index()] = has_any;
            per_type[ty.index()] = if has_any {
                mean_scores(documents.iter().filter(|d| d.doc_type == ty))
            } else {
                global
            };
        }

        Self {
            per_type,
            observed,
            global,
        }
    }

    /// Mean score vector used to impute a missing type block.
    pub fn mean_for(&self, doc_type: DocumentType) -> ScoreVector {
        self.per_type[doc_type.index()]
    }

    /// Whether the dataset contained any document of this type.
    pub fn type_observed(&self, doc_type: DocumentType) -> bool {
        self.observed[doc_type.index()]
    }

    /// Mean score vector over all documents.
    pub fn global(&self) -> ScoreVector {
        self.global
    }
}

fn mean_scores<'a>(documents: impl Iterator<Item = &'a Document> + Clone) -> ScoreVector {
    if documents.clone().next().is_none() {
        return ScoreVector::zeroed();
    }
    let mut dims = [0.0; SCORE_DIMS];
    for (i, dim) in dims.iter_mut().enumerate() {
        *dim = documents
            .clone()
            .map(|d| d.scores.to_array()[i])
            .mean();
    }
    ScoreVector::from_array(dims)
}
