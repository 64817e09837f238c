//! Data catalog (CKAN action API) client and documents.

mod client;
mod dataset;
mod error;

pub use client::CatalogClient;
pub use dataset::{Dataset, Resource};
pub use error::{CatalogError, CatalogResult};

/// Client pointed at a mock catalog, without rate limiting
#[cfg(test)]
pub(crate) fn test_client(server: &wiremock::MockServer) -> CatalogClient {
    use crate::config::{CatalogSite, CatalogTuning, Credentials};

    let credentials = Credentials {
        user_agent: "cod-boundaries-test".into(),
        api_key: "secret".into(),
        site: CatalogSite::parse(&server.uri()).unwrap(),
    };
    let tuning = CatalogTuning {
        rate_limit_ms: 0,
        timeout_secs: 10,
    };
    CatalogClient::new(&credentials, &tuning).unwrap()
}
