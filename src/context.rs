//! Runtime context shared by every cache component

use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::database::Database;
use crate::observability::CacheMetrics;
use crate::services::{NameParser, ReleaseFilter, SharedCache, SharedCacheMirror, ShowRegistry};

/// Configuration, persistence and collaborators, passed explicitly to each
/// component constructor. Cheap to clone.
#[derive(Clone)]
pub struct CacheContext {
    pub config: Arc<Config>,
    pub database: Database,
    pub parser: Arc<dyn NameParser>,
    pub registry: Arc<dyn ShowRegistry>,
    pub release_filter: Arc<dyn ReleaseFilter>,
    pub metrics: CacheMetrics,
    /// Present only when a shared cache was attached and mirroring is enabled
    pub mirror: Option<SharedCacheMirror>,
}

impl CacheContext {
    pub fn new(
        config: Config,
        database: Database,
        parser: Arc<dyn NameParser>,
        registry: Arc<dyn ShowRegistry>,
        release_filter: Arc<dyn ReleaseFilter>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            database,
            parser,
            registry,
            release_filter,
            metrics: CacheMetrics::new(),
            mirror: None,
        }
    }

    /// Attach the shared external cache.
    ///
    /// Spawns the mirror task, so this must run inside a tokio runtime. Does
    /// nothing when `shared_cache.enabled` is off.
    pub fn with_shared_cache(mut self, shared_cache: Arc<dyn SharedCache>) -> Self {
        if !self.config.shared_cache.enabled {
            debug!("Shared cache disabled in configuration, not mirroring");
            return self;
        }
        self.mirror = Some(SharedCacheMirror::spawn(
            shared_cache,
            &self.config.shared_cache,
            self.metrics.clone(),
        ));
        self
    }

    /// Flush and stop background tasks owned by the context
    pub async fn shutdown(&self) {
        if let Some(mirror) = &self.mirror {
            mirror.shutdown().await;
        }
    }
}
