// src/catalog/mod.rs

//! One-way notification to the catalog crawler that re-scans the output prefix.
//!
//! A trigger call only asks for a refresh to start. Nothing here waits for the
//! crawl to finish or checks whether one was already running; callers log a
//! failed trigger and carry on.

mod http;

pub use http::HttpCatalogTrigger;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid catalog endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("catalog rejected refresh of {job:?} with status {status}")]
    Rejected { job: String, status: u16 },
}

#[async_trait]
pub trait CatalogTrigger: Send + Sync {
    /// Ask the named refresh job to start. Returns once the request has been
    /// accepted or refused, never after the refresh itself.
    async fn start_refresh(&self, job: &str) -> Result<(), CatalogError>;
}

/// Used when no catalog endpoint is configured: records the request in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogOnlyTrigger;

#[async_trait]
impl CatalogTrigger for LogOnlyTrigger {
    async fn start_refresh(&self, job: &str) -> Result<(), CatalogError> {
        info!(job, "no catalog endpoint configured; refresh not sent");
        Ok(())
    }
}
