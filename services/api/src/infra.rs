use metrics_exporter_prometheus::PrometheusHandle;
use recruit_ai::error::AppError;
use recruit_ai::workflows::assessments::{InMemoryAssessmentRepository, SeedSnapshot};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// In-process store, optionally pre-filled from a JSON snapshot.
pub(crate) fn load_repository(
    seed: Option<&Path>,
) -> Result<Arc<InMemoryAssessmentRepository>, AppError> {
    let repository = Arc::new(InMemoryAssessmentRepository::default());
    if let Some(path) = seed {
        let snapshot = SeedSnapshot::from_path(path)?;
        info!(path = %path.display(), records = snapshot.record_count(), "loading seed snapshot");
        snapshot.load_into(repository.as_ref())?;
    }
    Ok(repository)
}
