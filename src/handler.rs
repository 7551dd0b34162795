// src/handler.rs
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::CatalogTrigger;
use crate::config::{Config, DEFAULT_CRAWLER_NAME, DEFAULT_OUTPUT_PREFIX};
use crate::error::{ConvertError, Result};
use crate::event::ObjectCreatedEvent;
use crate::process::{self, ColumnTypeSpec};
use crate::store::{ObjectRef, ObjectStore};

/// Fixed success body. Says nothing about the catalog trigger's outcome.
pub const SUCCESS_MESSAGE: &str = "Parquet file created.";

/// What the invoker gets back on success. Failures are returned as `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status_code: u16,
    /// JSON-encoded message string.
    pub body: String,
}

impl Response {
    pub fn success() -> Self {
        Self {
            status_code: 200,
            body: serde_json::Value::from(SUCCESS_MESSAGE).to_string(),
        }
    }
}

/// Converts the object named by an event and publishes the result.
pub struct Handler {
    store: Arc<dyn ObjectStore>,
    catalog: Arc<dyn CatalogTrigger>,
    column_types: ColumnTypeSpec,
    output_prefix: String,
    crawler_name: String,
}

impl Handler {
    /// A handler with the default column rules, prefix and crawler name.
    pub fn new(store: Arc<dyn ObjectStore>, catalog: Arc<dyn CatalogTrigger>) -> Self {
        Self {
            store,
            catalog,
            column_types: ColumnTypeSpec::default(),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            crawler_name: DEFAULT_CRAWLER_NAME.to_string(),
        }
    }

    pub fn from_config(
        store: Arc<dyn ObjectStore>,
        catalog: Arc<dyn CatalogTrigger>,
        config: &Config,
    ) -> anyhow::Result<Self> {
        Ok(Self::new(store, catalog)
            .with_column_types(config.column_types()?)
            .with_output_prefix(&config.output_prefix)
            .with_crawler_name(&config.crawler_name))
    }

    pub fn with_column_types(mut self, column_types: ColumnTypeSpec) -> Self {
        self.column_types = column_types;
        self
    }

    pub fn with_output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_prefix = prefix.into();
        self
    }

    pub fn with_crawler_name(mut self, name: impl Into<String>) -> Self {
        self.crawler_name = name.into();
        self
    }

    /// Handle an event, stamping the output with the local wall clock.
    pub async fn handle(&self, event: &ObjectCreatedEvent) -> Result<Response> {
        self.handle_at(event, Local::now().naive_local()).await
    }

    /// Handle an event with an explicit invocation time.
    pub async fn handle_at(
        &self,
        event: &ObjectCreatedEvent,
        now: NaiveDateTime,
    ) -> Result<Response> {
        let source = event.object_ref()?;
        self.process_object(&source, now).await?;
        Ok(Response::success())
    }

    /// Fetch → convert → write → trigger. Returns the written object.
    #[tracing::instrument(level = "info", skip_all, fields(object = %source))]
    pub async fn process_object(
        &self,
        source: &ObjectRef,
        now: NaiveDateTime,
    ) -> Result<ObjectRef> {
        let bytes = self
            .store
            .get(source)
            .await
            .map_err(|e| ConvertError::SourceUnavailable {
                container: source.container.clone(),
                key: source.key.clone(),
                source: e,
            })?;
        info!(bytes = bytes.len(), "fetched source object");

        let converted = process::convert(&bytes, &self.column_types)?;
        drop(bytes);

        let target = ObjectRef::new(
            &source.container,
            output_key(&self.output_prefix, &source.key, now),
        );
        let size = converted.parquet.len();
        self.store
            .put(&target, converted.parquet)
            .await
            .map_err(|e| ConvertError::DestinationWriteFailure {
                container: target.container.clone(),
                key: target.key.clone(),
                source: e,
            })?;
        info!(target = %target, bytes = size, "wrote parquet");

        // only the start request is awaited, never the crawl; a refused
        // trigger leaves the written file in place
        match self.catalog.start_refresh(&self.crawler_name).await {
            Ok(()) => info!(job = %self.crawler_name, "catalog refresh requested"),
            Err(e) => {
                warn!(job = %self.crawler_name, error = %e, "catalog refresh trigger failed")
            }
        }

        Ok(target)
    }
}

/// `{prefix}/{base}_{YYYYMMDD_HHMMSS}.parquet`, where `base` is the last path
/// segment of `input_key` with its first `.json` removed.
pub fn output_key(prefix: &str, input_key: &str, at: NaiveDateTime) -> String {
    let file_name = input_key.rsplit('/').next().unwrap_or(input_key);
    let base = file_name.replacen(".json", "", 1);
    let stamp = at.format("%Y%m%d_%H%M%S");
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        format!("{base}_{stamp}.parquet")
    } else {
        format!("{prefix}/{base}_{stamp}.parquet")
    }
}
