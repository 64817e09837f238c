//! HTTP client for the catalog's action API.

use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use reqwest::{multipart, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

use super::dataset::{ActionResponse, Dataset, Resource};
use super::error::{CatalogError, CatalogResult};
use crate::config::{CatalogTuning, Credentials};

/// Catalog client with API key, user agent and a simple call-rate limit
pub struct CatalogClient {
    client: Client,
    base_url: Url,
    api_key: String,
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl CatalogClient {
    /// Create a new catalog client
    pub fn new(credentials: &Credentials, tuning: &CatalogTuning) -> anyhow::Result<Self> {
        let base_url = credentials.site.base_url()?;
        let client = Client::builder()
            .user_agent(credentials.user_agent.clone())
            .timeout(Duration::from_secs(tuning.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: credentials.api_key.clone(),
            min_interval: Duration::from_millis(tuning.rate_limit_ms),
            last_call: Mutex::new(None),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Check that the API key is accepted by the catalog.
    ///
    /// Asks for the organizations the key may create datasets in. Anonymous
    /// callers get an empty list, so a key that can write nowhere fails too.
    pub async fn check_credentials(&self) -> CatalogResult<usize> {
        let action = "organization_list_for_user";
        let organizations: Vec<serde_json::Value> = self
            .get_action(action, &[("permission", "create_dataset")])
            .await?;
        if organizations.is_empty() {
            return Err(CatalogError::Unauthorized {
                action: action.to_string(),
                message: "API key cannot create datasets in any organization".to_string(),
            });
        }
        info!(
            "Catalog credentials accepted ({} organizations writable)",
            organizations.len()
        );
        Ok(organizations.len())
    }

    /// Read a dataset and its resources
    pub async fn read_dataset(&self, name: &str) -> CatalogResult<Dataset> {
        debug!("Reading dataset {}", name);
        self.get_action("package_show", &[("id", name)]).await
    }

    /// Read a dataset, mapping "not found" to `None`
    pub async fn find_dataset(&self, name: &str) -> CatalogResult<Option<Dataset>> {
        match self.read_dataset(name).await {
            Ok(dataset) => Ok(Some(dataset)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Download a resource into `folder`, returning the written file path
    pub async fn download_resource(
        &self,
        resource: &Resource,
        folder: &Path,
    ) -> CatalogResult<PathBuf> {
        self.download_url(&resource.url, &resource.file_name(), folder)
            .await
    }

    /// Download any URL into `folder/file_name`.
    ///
    /// The API key is only sent when the URL is on the catalog host.
    pub async fn download_url(
        &self,
        url: &str,
        file_name: &str,
        folder: &Path,
    ) -> CatalogResult<PathBuf> {
        let url = Url::parse(url)?;
        self.throttle().await;

        info!("Downloading {}", url);
        let mut request = self.client.get(url.clone());
        if self.is_catalog_host(&url) {
            request = request.header(AUTHORIZATION, &self.api_key);
        }
        let mut response = request.send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(CatalogError::NotFound(url.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(CatalogError::Unauthorized {
                    action: "download".to_string(),
                    message: url.to_string(),
                })
            }
            status if !status.is_success() => {
                return Err(CatalogError::Api {
                    action: "download".to_string(),
                    status: status.as_u16(),
                    message: url.to_string(),
                })
            }
            _ => {}
        }

        let path = folder.join(file_name);
        let mut file = std::fs::File::create(&path)?;
        let mut written = 0usize;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)?;
            written += chunk.len();
        }
        file.flush()?;

        debug!("Wrote {} bytes to {}", written, path.display());
        Ok(path)
    }

    /// Replace a resource's file with a local file (`resource_update` with an upload)
    pub async fn upload_resource(
        &self,
        resource: &Resource,
        file: &Path,
    ) -> CatalogResult<Resource> {
        let bytes = tokio::fs::read(file).await?;
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&resource.name)
            .to_string();

        info!(
            "Uploading {} ({} bytes) to resource {}",
            file_name,
            bytes.len(),
            resource.name
        );

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/geo+json")?;
        let form = multipart::Form::new()
            .text("id", resource.id.clone())
            .text("name", resource.name.clone())
            .text("format", "GeoJSON")
            .text(
                "last_modified",
                Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
            )
            .part("upload", part);

        let url = self.action_url("resource_update")?;
        self.throttle().await;
        let response = self
            .client
            .post(url)
            .header(AUTHORIZATION, &self.api_key)
            .multipart(form)
            .send()
            .await?;

        Self::parse_action("resource_update", response).await
    }

    async fn get_action<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &[(&str, &str)],
    ) -> CatalogResult<T> {
        let mut url = self.action_url(action)?;
        url.query_pairs_mut().extend_pairs(params.iter());

        self.throttle().await;
        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, &self.api_key)
            .send()
            .await?;

        Self::parse_action(action, response).await
    }

    async fn parse_action<T: DeserializeOwned>(
        action: &str,
        response: Response,
    ) -> CatalogResult<T> {
        let status = response.status();
        let text = response.text().await?;
        let envelope: Option<ActionResponse<T>> = serde_json::from_str(&text).ok();

        let message = envelope
            .as_ref()
            .and_then(|e| e.error.as_ref())
            .map(|e| e.describe())
            .unwrap_or_else(|| text.chars().take(200).collect());

        match status {
            StatusCode::NOT_FOUND => return Err(CatalogError::NotFound(message)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(CatalogError::Unauthorized {
                    action: action.to_string(),
                    message,
                })
            }
            _ => {}
        }

        match envelope {
            Some(ActionResponse {
                success: true,
                result: Some(result),
                ..
            }) if status.is_success() => Ok(result),
            _ => Err(CatalogError::Api {
                action: action.to_string(),
                status: status.as_u16(),
                message,
            }),
        }
    }

    fn action_url(&self, action: &str) -> CatalogResult<Url> {
        Ok(self.base_url.join(&format!("api/3/action/{}", action))?)
    }

    fn is_catalog_host(&self, url: &Url) -> bool {
        url.host_str() == self.base_url.host_str() && url.port() == self.base_url.port()
    }

    /// Wait until at least `min_interval` has passed since the previous call
    async fn throttle(&self) {
        let wait = {
            let mut last = self.last_call.lock().unwrap_or_else(|e| e.into_inner());
            let now = Instant::now();
            let wait = last
                .map(|t| self.min_interval.saturating_sub(now.saturating_duration_since(t)))
                .unwrap_or_default();
            *last = Some(now + wait);
            wait
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
    }
}
