//! Approximate device location
//!
//! Used to fill the location preference with "lat, lng".

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::GeoConfig;
use crate::domain::Coordinates;

/// Message shown when the location lookup fails
pub const GEO_FAILURE_MESSAGE: &str = "Could not get location. Please enter manually.";

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("Geolocation request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Geolocation service returned {0}")]
    Status(u16),

    #[error("Geolocation response had no coordinates")]
    MissingCoordinates,
}

/// Something that can tell where we are
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn locate(&self) -> Result<Coordinates, GeoError>;
}

/// Looks the location up from the public IP address
pub struct IpGeolocator {
    url: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct IpLookup {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl IpLookup {
    fn coordinates(&self) -> Result<Coordinates, GeoError> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Ok(Coordinates { lat, lng }),
            _ => Err(GeoError::MissingCoordinates),
        }
    }
}

impl IpGeolocator {
    pub fn from_config(config: &GeoConfig) -> Result<Self, GeoError> {
        debug!(url = %config.url, timeout_ms = config.timeout_ms, "IpGeolocator::from_config: called");
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            url: config.url.clone(),
            http,
        })
    }
}

#[async_trait]
impl Geolocator for IpGeolocator {
    async fn locate(&self) -> Result<Coordinates, GeoError> {
        debug!(url = %self.url, "IpGeolocator::locate: called");
        let response = self.http.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Status(status.as_u16()));
        }
        let coords = response.json::<IpLookup>().await?.coordinates()?;
        info!(lat = coords.lat, lng = coords.lng, "Location found");
        Ok(coords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_parse() {
        let lookup: IpLookup =
            serde_json::from_str(r#"{"ip": "1.2.3.4", "city": "Golden", "latitude": 39.75, "longitude": -105.22}"#)
                .unwrap();
        assert_eq!(lookup.coordinates().unwrap(), Coordinates { lat: 39.75, lng: -105.22 });
    }

    #[test]
    fn test_lookup_missing_coordinates() {
        let lookup: IpLookup = serde_json::from_str(r#"{"error": true, "reason": "RateLimited"}"#).unwrap();
        assert!(matches!(lookup.coordinates(), Err(GeoError::MissingCoordinates)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_an_error() {
        let geo = IpGeolocator::from_config(&GeoConfig {
            url: "http://127.0.0.1:9/json/".to_string(),
            timeout_ms: 500,
        })
        .unwrap();
        assert!(geo.locate().await.is_err());
    }
}
