use async_trait::async_trait;

use crate::error::{CoreError, Result};
use crate::geo::GeoPoint;

/// Capability for turning a shipping address into coordinates. Kept as a
/// trait so the commit engine never depends on a concrete network client.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeoPoint>;
}

/// A geocoder backed by an external HTTP service. The base URL and response
/// shape are deployment-specific; this adapter expects a JSON body of the
/// form `{"latitude": f64, "longitude": f64}`.
pub struct HttpGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGeocoder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct GeocodeResponse {
    latitude: f64,
    longitude: f64,
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoPoint> {
        let url = format!("{}/geocode", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("address", address)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(CoreError::Geocoding(format!(
                "geocoder returned status {}",
                resp.status()
            )));
        }

        let body: GeocodeResponse = resp.json().await?;
        Ok(GeoPoint::new(body.latitude, body.longitude))
    }
}

/// A geocoder that always resolves to the same point, for running the
/// service and its integration tests without external geocoding credentials.
pub struct FixedGeocoder {
    point: GeoPoint,
}

impl FixedGeocoder {
    pub fn new(point: GeoPoint) -> Self {
        Self { point }
    }
}

#[async_trait]
impl Geocoder for FixedGeocoder {
    async fn geocode(&self, _address: &str) -> Result<GeoPoint> {
        Ok(self.point)
    }
}
