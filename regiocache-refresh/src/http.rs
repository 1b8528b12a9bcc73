use std::time::Duration;

use async_trait::async_trait;
use regiocache_core::wire::{decode_batch, SyncRequest, SyncResponse};
use regiocache_core::{
    DirectSource, PayloadKind, Region, RegionUpdate, RemoteError, RemoteSource, ServiceType,
    ServiceTypes, SyncState,
};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error};

/// Connection settings of the configuration service.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpSourceConfig {
    /// Base URL, e.g. `http://config.internal/v1`. A trailing slash is optional.
    pub base_url: String,

    /// Timeout of a single request, connect included.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for HttpSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// [`RemoteSource`] and [`DirectSource`] over the configuration service's
/// HTTP/JSON API.
///
/// | Operation            | Request                                   |
/// |----------------------|-------------------------------------------|
/// | `batch_fetch`        | `POST {base}/multiconfig`                 |
/// | `read_region`        | `GET {base}/regions/{code}`               |
/// | `read_service_types` | `GET {base}/regions/{code}/service-types` |
///
/// Region codes are percent-encoded as a single path segment.
///
/// Unreachable hosts, non-2xx statuses and malformed envelopes are reported
/// as [`RemoteError::Transport`]; payloads that do not parse as a region or
/// service-type table as [`RemoteError::Decode`].
#[derive(Clone, Debug)]
pub struct HttpRemoteSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpRemoteSource {
    /// Builds the HTTP client.
    ///
    /// # Errors
    ///
    /// [`RemoteError::Transport`] when `base_url` is not an absolute
    /// hierarchical URL or the client cannot be created.
    pub fn new(config: HttpSourceConfig) -> Result<Self, RemoteError> {
        let base_url = Url::parse(&config.base_url).map_err(|err| {
            RemoteError::transport(format!("invalid base URL {:?}: {err}", config.base_url))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(RemoteError::transport(format!(
                "base URL {:?} cannot carry a path",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(RemoteError::transport)?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends `segments` to the base URL, encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteError::transport("base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_payload<T: DeserializeOwned>(
        &self,
        url: Url,
        key: &str,
        kind: PayloadKind,
    ) -> Result<T, RemoteError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(RemoteError::transport)?;
        let body = response.bytes().await.map_err(RemoteError::transport)?;

        serde_json::from_slice(&body).map_err(|source| {
            error!(region = key, %kind, error = %source, "failed to decode payload");
            RemoteError::decode(key, kind, source)
        })
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn batch_fetch(&self, states: &[SyncState]) -> Result<Vec<RegionUpdate>, RemoteError> {
        let url = self.endpoint(&["multiconfig"])?;
        debug!(%url, regions = states.len(), "fetching region configs");

        let response: SyncResponse = self
            .client
            .post(url)
            .json(&SyncRequest::from(states))
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(RemoteError::transport)?
            .json()
            .await
            .map_err(RemoteError::transport)?;

        decode_batch(response.configs)
    }
}

#[async_trait]
impl DirectSource for HttpRemoteSource {
    async fn read_region(&self, key: &str) -> Result<Region, RemoteError> {
        let url = self.endpoint(&["regions", key])?;
        self.get_payload(url, key, PayloadKind::Region).await
    }

    async fn read_service_types(&self, key: &str) -> Result<ServiceTypes, RemoteError> {
        let url = self.endpoint(&["regions", key, "service-types"])?;
        let list: Vec<ServiceType> = self
            .get_payload(url, key, PayloadKind::ServiceTypes)
            .await?;

        Ok(list
            .into_iter()
            .map(|service_type| (service_type.id.clone(), service_type))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(base_url: &str) -> HttpRemoteSource {
        HttpRemoteSource::new(HttpSourceConfig {
            base_url: base_url.to_string(),
            ..HttpSourceConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_endpoints_join_base_path() {
        for base_url in ["http://config.internal/v1", "http://config.internal/v1/"] {
            let url = source(base_url).endpoint(&["multiconfig"]).unwrap();
            assert_eq!(url.as_str(), "http://config.internal/v1/multiconfig");
        }

        let url = source("http://localhost:8080")
            .endpoint(&["regions", "LON", "service-types"])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/regions/LON/service-types");
    }

    #[test]
    fn test_keys_are_single_encoded_segments() {
        let source = source("http://config.internal/v1");

        let url = source.endpoint(&["regions", "LON?x=1"]).unwrap();
        assert_eq!(url.path(), "/v1/regions/LON%3Fx=1");
        assert_eq!(url.query(), None);

        let url = source.endpoint(&["regions", "LON/service-types"]).unwrap();
        assert_eq!(url.path(), "/v1/regions/LON%2Fservice-types");
    }

    #[test]
    fn test_invalid_base_url() {
        for base_url in ["config.internal", "mailto:ops@config.internal"] {
            let err = HttpRemoteSource::new(HttpSourceConfig {
                base_url: base_url.to_string(),
                ..HttpSourceConfig::default()
            })
            .unwrap_err();
            assert!(matches!(err, RemoteError::Transport(_)), "{err}");
        }
    }

    #[test]
    fn test_config_from_yaml() {
        let config: HttpSourceConfig =
            serde_yaml::from_str("base_url: http://config.internal\ntimeout: 2s").unwrap();
        assert_eq!(config.base_url, "http://config.internal");
        assert_eq!(config.timeout, Duration::from_secs(2));

        let defaults: HttpSourceConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(defaults, HttpSourceConfig::default());
    }
}
