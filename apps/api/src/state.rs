use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::research::ResearchClient;
use crate::uploads::store::ResumeStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Resume storage backend. Default: S3ResumeStore.
    pub resumes: Arc<dyn ResumeStore>,
    pub research: ResearchClient,
    pub config: Config,
}
