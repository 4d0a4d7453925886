use crate::heuristic::{HeuristicAnnotator, HeuristicClassifier};
use crate::provider::{Annotator, Classifier};
use crate::quota::QuotaLimiter;
use madl_segmenter::{Annotation, Classification, SourceUnit, VerdictSource};
use std::sync::Arc;

/// Which path produced each piece of metadata for one unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichReport {
    pub classified_by: Option<VerdictSource>,
    /// `None` for units classified not reusable
    pub annotated_by: Option<VerdictSource>,
    /// External failures that were absorbed by the fallback
    pub errors: Vec<String>,
}

/// Routes each unit to the external services while the quota lasts and to the local
/// heuristic otherwise.
///
/// Every external call (classification or annotation) takes one unit of quota. A call
/// that fails or returns garbage falls back to the heuristic for that unit only.
#[derive(Clone)]
pub struct Enricher {
    classifier: Option<Arc<dyn Classifier>>,
    annotator: Option<Arc<dyn Annotator>>,
    quota: Arc<QuotaLimiter>,
}

impl Enricher {
    pub fn new(
        classifier: Option<Arc<dyn Classifier>>,
        annotator: Option<Arc<dyn Annotator>>,
        quota: Arc<QuotaLimiter>,
    ) -> Self {
        Self {
            classifier,
            annotator,
            quota,
        }
    }

    /// Heuristic only; no external calls are ever made
    pub fn heuristic_only() -> Self {
        Self::new(None, None, Arc::new(QuotaLimiter::new(0)))
    }

    pub fn quota(&self) -> &Arc<QuotaLimiter> {
        &self.quota
    }

    pub fn has_model(&self) -> bool {
        self.classifier.is_some() || self.annotator.is_some()
    }

    /// Classify `unit` and, when reusable, attach an annotation
    pub async fn enrich(&self, unit: &mut SourceUnit) -> EnrichReport {
        let mut report = EnrichReport::default();

        let classification = self.classify(unit, &mut report).await;
        report.classified_by = Some(classification.source);
        let reusable = classification.reusable;
        unit.classification = Some(classification);

        if reusable {
            let (annotation, source) = self.annotate(unit, &mut report).await;
            unit.annotation = Some(annotation);
            report.annotated_by = Some(source);
        } else {
            unit.annotation = None;
        }

        report
    }

    async fn classify(&self, unit: &SourceUnit, report: &mut EnrichReport) -> Classification {
        let Some(classifier) = self.classifier.as_ref() else {
            return HeuristicClassifier.verdict(unit, VerdictSource::Heuristic);
        };
        if !self.quota.try_acquire() {
            log::debug!("{}: quota exhausted, heuristic classification", unit.id);
            return HeuristicClassifier.verdict(unit, VerdictSource::QuotaFallback);
        }

        match classifier.classify(unit).await {
            Ok(mut verdict) => {
                verdict.source = VerdictSource::Model;
                verdict
            }
            Err(e) => {
                log::warn!("{}: {} classifier failed: {e}", unit.id, classifier.name());
                report.errors.push(format!("classify: {e}"));
                HeuristicClassifier.verdict(unit, VerdictSource::Heuristic)
            }
        }
    }

    async fn annotate(
        &self,
        unit: &SourceUnit,
        report: &mut EnrichReport,
    ) -> (Annotation, VerdictSource) {
        let Some(annotator) = self.annotator.as_ref() else {
            return (HeuristicAnnotator.annotation(unit), VerdictSource::Heuristic);
        };
        if !self.quota.try_acquire() {
            log::debug!("{}: quota exhausted, template annotation", unit.id);
            return (HeuristicAnnotator.annotation(unit), VerdictSource::QuotaFallback);
        }

        match annotator.annotate(unit).await {
            Ok(annotation) => (annotation, VerdictSource::Model),
            Err(e) => {
                log::warn!("{}: {} annotator failed: {e}", unit.id, annotator.name());
                report.errors.push(format!("annotate: {e}"));
                (HeuristicAnnotator.annotation(unit), VerdictSource::Heuristic)
            }
        }
    }
}
