use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::TimezoneError;

/// Lifecycle status of a region.
///
/// Unknown status strings deserialize as [`RegionStatus::Disabled`] so a new
/// status added upstream never makes a whole payload undecodable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegionStatus {
    Beta,
    Enabled,
    Hidden,
    #[default]
    #[serde(other)]
    Disabled,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Country {
    pub cctld: String,
    #[serde(rename = "iso_3166_1")]
    pub iso_3166_1: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoInfo {
    pub centroid: Location,
    pub minimum: Location,
    pub maximum: Location,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Phone {
    pub calling_code: String,
    pub trunk_prefix: String,
}

/// Configuration record for one regulatory area.
///
/// Only the identity and the commonly consumed fields are typed. Everything
/// else the configuration service sends is preserved in [`Region::extra`], so
/// re-serializing a cached region yields the same document it was decoded from.
///
/// # Examples
///
/// ```
/// use regiocache_core::{Region, RegionStatus};
///
/// let region: Region = serde_json::from_str(
///     r#"{"code":"LON","name":"London","status":"ENABLED","fastestFirst":true}"#,
/// ).unwrap();
///
/// assert_eq!(region.code, "LON");
/// assert_eq!(region.status, RegionStatus::Enabled);
/// assert_eq!(region.extra["fastestFirst"], serde_json::json!(true));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Region {
    pub code: String,
    pub name: String,
    pub status: RegionStatus,
    pub country: Country,
    pub currency: String,
    pub language: String,
    pub geo_info: GeoInfo,
    pub phone: Phone,
    pub timezone: String,
    pub default_locale: String,
    pub locale: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Region {
    /// Creates a region with the given code and name and defaults elsewhere.
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns `true` when the region is visible to end users.
    pub fn is_active(&self) -> bool {
        matches!(self.status, RegionStatus::Enabled | RegionStatus::Beta)
    }

    /// Resolves the IANA timezone the region operates in.
    ///
    /// # Errors
    ///
    /// [`TimezoneError::Missing`] when no timezone is configured and
    /// [`TimezoneError::Unknown`] when the name is not in the tz database.
    pub fn location(&self) -> Result<Tz, TimezoneError> {
        if self.timezone.is_empty() {
            return Err(TimezoneError::Missing {
                region: self.code.clone(),
            });
        }

        self.timezone
            .parse::<Tz>()
            .map_err(|_| TimezoneError::Unknown {
                region: self.code.clone(),
                timezone: self.timezone.clone(),
            })
    }

    /// Converts a UTC instant to the region's wall-clock time.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use regiocache_core::Region;
    ///
    /// let mut region = Region::new("NYC", "New York");
    /// region.timezone = "America/New_York".to_string();
    ///
    /// let noon = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
    /// let local = region.local_time(noon).unwrap();
    /// assert_eq!(local.format("%H:%M").to_string(), "07:00");
    /// ```
    pub fn local_time(&self, at: DateTime<Utc>) -> Result<DateTime<Tz>, TimezoneError> {
        Ok(at.with_timezone(&self.location()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use serde_json::json;

    #[test]
    fn test_decode_full_region() {
        let region: Region = serde_json::from_value(json!({
            "code": "LON",
            "name": "London",
            "status": "BETA",
            "country": { "cctld": "uk", "iso_3166_1": "GB" },
            "currency": "GBP",
            "geoInfo": { "centroid": { "lat": 51.5, "lng": -0.12 } },
            "phone": { "callingCode": "44", "trunkPrefix": "0" },
            "timezone": "Europe/London"
        }))
        .unwrap();

        assert_eq!(region.country.iso_3166_1, "GB");
        assert_eq!(region.geo_info.centroid.lat, 51.5);
        assert_eq!(region.geo_info.maximum, Location::default());
        assert_eq!(region.phone.calling_code, "44");
        assert!(region.is_active());
        assert!(region.extra.is_empty());
    }

    #[test]
    fn test_unknown_status_is_disabled() {
        let region: Region = serde_json::from_value(json!({ "status": "ARCHIVED" })).unwrap();
        assert_eq!(region.status, RegionStatus::Disabled);
        assert!(!region.is_active());
    }

    #[test]
    fn test_status_names() {
        for (raw, status) in [
            ("BETA", RegionStatus::Beta),
            ("ENABLED", RegionStatus::Enabled),
            ("HIDDEN", RegionStatus::Hidden),
            ("DISABLED", RegionStatus::Disabled),
        ] {
            assert_eq!(serde_json::from_value::<RegionStatus>(json!(raw)).unwrap(), status);
            assert_eq!(serde_json::to_value(status).unwrap(), json!(raw));
        }
        assert_eq!(RegionStatus::default(), RegionStatus::Disabled);
    }

    #[test]
    fn test_local_time_follows_dst() {
        let mut region = Region::new("LON", "London");
        region.timezone = "Europe/London".to_string();

        assert_eq!(region.location().unwrap(), chrono_tz::Europe::London);

        let winter = Utc.with_ymd_and_hms(2024, 1, 10, 9, 30, 0).unwrap();
        let summer = Utc.with_ymd_and_hms(2024, 7, 10, 9, 30, 0).unwrap();
        assert_eq!(region.local_time(winter).unwrap().hour(), 9);
        assert_eq!(region.local_time(summer).unwrap().hour(), 10);
        assert_eq!(region.local_time(summer).unwrap().with_timezone(&Utc), summer);
    }

    #[test]
    fn test_missing_timezone() {
        let region = Region::new("LON", "London");
        let err = region.location().unwrap_err();

        assert!(matches!(err, TimezoneError::Missing { ref region } if region == "LON"));
        assert_eq!(err.to_string(), "no timezone defined for region \"LON\"");
        assert!(region.local_time(Utc::now()).is_err());
    }

    #[test]
    fn test_unknown_timezone() {
        let mut region = Region::new("ATL", "Atlantis");
        region.timezone = "Atlantic/Atlantis".to_string();

        match region.location().unwrap_err() {
            TimezoneError::Unknown { region, timezone } => {
                assert_eq!(region, "ATL");
                assert_eq!(timezone, "Atlantic/Atlantis");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_opaque_fields_survive_reencoding() {
        let source = json!({
            "code": "NYC",
            "prebook": { "enabled": true, "pollInterval": 30 },
            "customJobRingtone": false
        });
        let region: Region = serde_json::from_value(source).unwrap();
        let encoded = serde_json::to_value(&region).unwrap();

        assert_eq!(encoded["prebook"]["pollInterval"], json!(30));
        assert_eq!(encoded["customJobRingtone"], json!(false));
        assert_eq!(encoded["code"], json!("NYC"));
    }
}
