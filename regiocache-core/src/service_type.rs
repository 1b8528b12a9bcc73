use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Table of service types offered in one region, keyed by service-type id.
pub type ServiceTypes = HashMap<String, ServiceType>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceTypeStatus {
    Enabled,
    Beta,
    #[default]
    #[serde(other)]
    Disabled,
}

/// Configuration of a single service type within a region.
///
/// Durations travel as strings such as `"1m30s"`; use
/// [`free_waiting_time`](Self::free_waiting_time) and
/// [`auto_off_shift`](Self::auto_off_shift) to read them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceType {
    pub id: String,
    pub name: String,
    pub status: ServiceTypeStatus,
    /// Preference order when listing service types, lowest first.
    pub tier: u32,
    pub free_waiting_time: String,
    pub auto_off_shift: String,
    pub min_fare: f64,
    pub max_fare: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ServiceType {
    pub fn new(id: impl Into<String>, name: impl Into<String>, tier: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            tier,
            ..Self::default()
        }
    }

    /// Free waiting time before the meter starts; zero if unset or malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use regiocache_core::ServiceType;
    /// use std::time::Duration;
    ///
    /// let mut service_type = ServiceType::new("black", "Black cab", 1);
    /// service_type.free_waiting_time = "1m30s".to_string();
    /// assert_eq!(service_type.free_waiting_time(), Duration::from_secs(90));
    ///
    /// service_type.free_waiting_time = "soon".to_string();
    /// assert_eq!(service_type.free_waiting_time(), Duration::ZERO);
    /// ```
    pub fn free_waiting_time(&self) -> Duration {
        parse_duration_or_zero(&self.free_waiting_time)
    }

    /// Idle time after which a driver is taken off shift; zero if unset or malformed.
    pub fn auto_off_shift(&self) -> Duration {
        parse_duration_or_zero(&self.auto_off_shift)
    }
}

fn parse_duration_or_zero(raw: &str) -> Duration {
    humantime::parse_duration(raw).unwrap_or(Duration::ZERO)
}

/// Returns the service types of a table ordered by ascending tier.
///
/// Ties are broken by id so the order is stable across calls.
pub fn sorted_by_tier(service_types: &ServiceTypes) -> Vec<ServiceType> {
    let mut tiers: Vec<ServiceType> = service_types.values().cloned().collect();
    tiers.sort_by(|a, b| a.tier.cmp(&b.tier).then_with(|| a.id.cmp(&b.id)));
    tiers
}

/// Returns the ids of a table in ascending order.
pub fn service_type_ids(service_types: &ServiceTypes) -> Vec<&str> {
    let mut ids: Vec<&str> = service_types.keys().map(String::as_str).collect();
    ids.sort_unstable();
    ids
}
