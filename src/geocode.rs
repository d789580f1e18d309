//! Reverse-geocoding enrichment of sampled points.

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::http_client;
use crate::error::GeocodeError;
use crate::model::{Address, Coordinate, EnrichedPoint, SampledPoint};
use crate::traits::ReverseGeocoder;

/// Merges reverse-geocoded address attributes into sampled points.
pub struct GeocodeEnricher<'a, G> {
    geocoder: &'a G,
}

impl<'a, G: ReverseGeocoder> GeocodeEnricher<'a, G> {
    pub fn new(geocoder: &'a G) -> Self {
        Self { geocoder }
    }

    /// Resolves the point's address. `city` comes from the grid and replaces
    /// whatever city the geocoder reports.
    pub fn enrich(&self, point: &SampledPoint, city: &str) -> Result<EnrichedPoint, GeocodeError> {
        let response = self.geocoder.reverse(point.coordinate)?;
        let address = extract_address(&response, point.coordinate)?;
        debug!(at = %point.coordinate, road = ?address.road, "enriched point");
        Ok(EnrichedPoint::new(point.coordinate, city, address))
    }
}

/// Pulls the fixed set of address attributes out of a reverse-geocode
/// response. Missing attributes become `None`; a missing `address` object is
/// an error.
pub fn extract_address(response: &Value, at: Coordinate) -> Result<Address, GeocodeError> {
    let fields = response
        .get("address")
        .and_then(Value::as_object)
        .ok_or(GeocodeError::MissingAddress {
            latitude: at.latitude,
            longitude: at.longitude,
        })?;

    Ok(Address {
        house_number: text(fields, "house_number"),
        road: text(fields, "road"),
        neighbourhood: text(fields, "neighbourhood"),
        suburb: text(fields, "suburb"),
        city_district: text(fields, "city_district"),
        state: text(fields, "state"),
        postcode: text(fields, "postcode"),
        country: text(fields, "country"),
        country_code: text(fields, "country_code"),
    })
}

fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(value) => Some(value.clone()),
        Value::Number(value) => Some(value.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct NominatimConfig {
    pub base_url: String,
    /// Nominatim's usage policy requires an identifying User-Agent.
    pub user_agent: String,
    pub timeout_secs: Option<u64>,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: "urban-journeys".to_string(),
            timeout_secs: None,
        }
    }
}

/// Nominatim `/reverse` adapter.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    config: NominatimConfig,
    client: reqwest::blocking::Client,
}

impl NominatimClient {
    pub fn new(config: NominatimConfig) -> Result<Self, reqwest::Error> {
        let client = http_client(config.timeout_secs, Some(&config.user_agent))?;
        Ok(Self { config, client })
    }
}

impl ReverseGeocoder for NominatimClient {
    fn reverse(&self, at: Coordinate) -> Result<Value, GeocodeError> {
        let url = format!("{}/reverse", self.config.base_url.trim_end_matches('/'));
        let body = self
            .client
            .get(url)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("addressdetails", "1".to_string()),
                ("lat", format!("{:.7}", at.latitude)),
                ("lon", format!("{:.7}", at.longitude)),
            ])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.json::<Value>())?;
        Ok(body)
    }
}
