use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::{CatalogError, CatalogTrigger};

/// Starts a crawler with `POST {endpoint}/crawlers/{job}/start`.
#[derive(Debug, Clone)]
pub struct HttpCatalogTrigger {
    client: Client,
    endpoint: Url,
}

impl HttpCatalogTrigger {
    pub fn new(client: Client, endpoint: &str) -> Result<Self, CatalogError> {
        let mut endpoint = Url::parse(endpoint)?;
        // make `join` append rather than replace the last segment
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }
        Ok(Self { client, endpoint })
    }

    pub fn start_url(&self, job: &str) -> Result<Url, CatalogError> {
        Ok(self.endpoint.join(&format!("crawlers/{job}/start"))?)
    }
}

#[async_trait]
impl CatalogTrigger for HttpCatalogTrigger {
    async fn start_refresh(&self, job: &str) -> Result<(), CatalogError> {
        let url = self.start_url(job)?;
        debug!(%url, "starting crawler");
        let resp = self.client.post(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(CatalogError::Rejected {
                job: job.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}
