//! # Differential sync wire format
//!
//! A synchronization round sends, for every known region, the content hashes
//! the client currently holds. The source answers with one record per region
//! whose server-side content differs. Inside a record each half (region and
//! service types) is either a full JSON payload with its new hash, or empty
//! when that half is unchanged.
//!
//! Three states therefore exist for each half of a region, and they must not
//! be conflated:
//!
//! - the region is missing from the response: nothing changes,
//! - the payload is empty: [`Payload::Unchanged`], the cached value is kept,
//! - the payload is present: [`Payload::Changed`], the cached value is replaced.
//!
//! An empty payload never deletes anything.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{PayloadKind, RemoteError};
use crate::region::Region;
use crate::service_type::ServiceTypes;

/// Synchronization state of one known region, as offered to the source.
///
/// An empty hash means no content is known and forces a full payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub code: String,
    #[serde(default)]
    pub region_hash: String,
    #[serde(default)]
    pub service_types_hash: String,
}

impl SyncState {
    pub fn new(
        code: impl Into<String>,
        region_hash: impl Into<String>,
        service_types_hash: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            region_hash: region_hash.into(),
            service_types_hash: service_types_hash.into(),
        }
    }
}

/// Body of a differential sync request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub ids: Vec<SyncState>,
}

impl From<&[SyncState]> for SyncRequest {
    fn from(states: &[SyncState]) -> Self {
        Self {
            ids: states.to_vec(),
        }
    }
}

/// Body of a differential sync response.
///
/// `configs` is required: an envelope without it is malformed, while an empty
/// list means nothing changed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub configs: Vec<RawRegionConfig>,
}

/// One region record as it travels on the wire.
///
/// The `*_config` members hold JSON documents embedded as strings; an empty
/// string means that half is unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawRegionConfig {
    pub region: String,
    pub region_config: String,
    pub region_hash: String,
    pub service_types_config: String,
    pub service_types_hash: String,
}

impl RawRegionConfig {
    /// Parses both embedded payloads into a [`RegionUpdate`].
    ///
    /// # Examples
    ///
    /// ```
    /// use regiocache_core::wire::{Payload, RawRegionConfig};
    ///
    /// let raw = RawRegionConfig {
    ///     region: "LON".to_string(),
    ///     region_config: r#"{"code":"LON","name":"London"}"#.to_string(),
    ///     region_hash: "h1".to_string(),
    ///     ..RawRegionConfig::default()
    /// };
    ///
    /// let update = raw.decode().unwrap();
    /// assert_eq!(update.key, "LON");
    /// assert!(matches!(update.region, Payload::Changed { ref hash, .. } if hash == "h1"));
    /// assert!(matches!(update.service_types, Payload::Unchanged));
    /// ```
    pub fn decode(self) -> Result<RegionUpdate, RemoteError> {
        let region = Payload::decode(
            &self.region,
            PayloadKind::Region,
            &self.region_config,
            self.region_hash,
        )?;
        let service_types = Payload::decode(
            &self.region,
            PayloadKind::ServiceTypes,
            &self.service_types_config,
            self.service_types_hash,
        )?;

        Ok(RegionUpdate {
            key: self.region,
            region,
            service_types,
        })
    }
}

/// Decodes a whole response, failing on the first undecodable payload.
///
/// Nothing from a batch containing a bad payload may be merged, so callers get
/// either every update or an error.
pub fn decode_batch(
    configs: impl IntoIterator<Item = RawRegionConfig>,
) -> Result<Vec<RegionUpdate>, RemoteError> {
    configs.into_iter().map(RawRegionConfig::decode).collect()
}

/// One half of a region update.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload<T> {
    /// The source reported no change; keep whatever is cached.
    Unchanged,
    /// New content and the hash identifying it.
    Changed { value: T, hash: String },
}

impl<T> Payload<T> {
    pub fn changed(value: T, hash: impl Into<String>) -> Self {
        Payload::Changed {
            value,
            hash: hash.into(),
        }
    }

    pub fn is_changed(&self) -> bool {
        matches!(self, Payload::Changed { .. })
    }
}

impl<T: DeserializeOwned> Payload<T> {
    fn decode(
        key: &str,
        kind: PayloadKind,
        raw: &str,
        hash: String,
    ) -> Result<Self, RemoteError> {
        if raw.is_empty() {
            return Ok(Payload::Unchanged);
        }

        match serde_json::from_str(raw) {
            Ok(value) => Ok(Payload::Changed { value, hash }),
            Err(source) => {
                error!(region = key, %kind, error = %source, "failed to decode payload");
                Err(RemoteError::decode(key, kind, source))
            }
        }
    }
}

/// A decoded differential update for one region.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionUpdate {
    pub key: String,
    pub region: Payload<Region>,
    pub service_types: Payload<ServiceTypes>,
}

impl RegionUpdate {
    /// An update that changes nothing; combine with the `with_*` builders.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            region: Payload::Unchanged,
            service_types: Payload::Unchanged,
        }
    }

    pub fn with_region(mut self, region: Region, hash: impl Into<String>) -> Self {
        self.region = Payload::changed(region, hash);
        self
    }

    pub fn with_service_types(
        mut self,
        service_types: ServiceTypes,
        hash: impl Into<String>,
    ) -> Self {
        self.service_types = Payload::changed(service_types, hash);
        self
    }
}
