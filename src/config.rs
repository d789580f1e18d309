//! Process configuration, built once at startup and passed down by reference.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::bigquery::BigQueryConfig;
use crate::error::ConfigError;
use crate::gcs::GcsConfig;
use crate::geocode::NominatimConfig;
use crate::google::GoogleConfig;
use crate::osrm::OsrmConfig;
use crate::pipeline::FailurePolicy;

const DEFAULT_RADIUS_M: f64 = 500.0;

/// Where population grids come from.
#[derive(Debug, Clone)]
pub enum GridBackend {
    Directory(PathBuf),
    Bucket(GcsConfig),
}

#[derive(Debug, Clone)]
pub enum RoutingBackend {
    Google(GoogleConfig),
    Osrm(OsrmConfig),
    Haversine,
}

#[derive(Debug, Clone)]
pub enum WarehouseBackend {
    BigQuery(BigQueryConfig),
    JsonLines { dir: PathBuf },
}

/// Settings the orchestrator itself consumes.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Jitter radius around sampled cell centers, in meters.
    pub radius_m: f64,
    pub failure_policy: FailurePolicy,
    pub stops_table: String,
    pub journeys_table: String,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            radius_m: DEFAULT_RADIUS_M,
            failure_policy: FailurePolicy::default(),
            stops_table: "stops".to_string(),
            journeys_table: "journeys".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub grids: GridBackend,
    pub geocoder: NominatimConfig,
    pub routing: RoutingBackend,
    pub warehouse: WarehouseBackend,
    pub run: RunSettings,
    pub rng_seed: Option<u64>,
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Empty values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let timeout_secs = parse_optional::<u64>(&get, "HTTP_TIMEOUT_SECS")?;

        let grids = match (get("GRID_DIR"), get("GRID_BUCKET")) {
            (Some(dir), None) => GridBackend::Directory(PathBuf::from(dir)),
            (None, Some(bucket)) => GridBackend::Bucket(GcsConfig {
                bucket,
                access_token: get("GCS_ACCESS_TOKEN"),
                timeout_secs,
                ..GcsConfig::default()
            }),
            (Some(_), Some(_)) => {
                return Err(ConfigError::Conflict(
                    "set only one of GRID_DIR and GRID_BUCKET".to_string(),
                ));
            }
            (None, None) => return Err(ConfigError::Missing("GRID_DIR or GRID_BUCKET")),
        };

        let mut geocoder = NominatimConfig {
            timeout_secs,
            ..NominatimConfig::default()
        };
        if let Some(base_url) = get("NOMINATIM_URL") {
            geocoder.base_url = base_url;
        }
        if let Some(user_agent) = get("NOMINATIM_USER_AGENT") {
            geocoder.user_agent = user_agent;
        }

        let routing = match get("ROUTING_BACKEND").as_deref().unwrap_or("google") {
            "google" => RoutingBackend::Google(GoogleConfig {
                api_key: require("GOOGLE_MAPS_API_KEY")?,
                timeout_secs,
                ..GoogleConfig::default()
            }),
            "osrm" => {
                let defaults = OsrmConfig::default();
                let mut osrm = OsrmConfig {
                    timeout_secs: timeout_secs.or(defaults.timeout_secs),
                    ..defaults
                };
                if let Some(base_url) = get("OSRM_URL") {
                    osrm.base_url = base_url;
                }
                RoutingBackend::Osrm(osrm)
            }
            "haversine" => RoutingBackend::Haversine,
            other => {
                return Err(ConfigError::Invalid {
                    key: "ROUTING_BACKEND",
                    value: other.to_string(),
                    reason: "expected google, osrm or haversine".to_string(),
                });
            }
        };

        let warehouse = match get("WAREHOUSE_BACKEND").as_deref().unwrap_or("bigquery") {
            "bigquery" => WarehouseBackend::BigQuery(BigQueryConfig {
                project: require("BIGQUERY_PROJECT")?,
                dataset: require("BIGQUERY_DATASET")?,
                access_token: require("BIGQUERY_ACCESS_TOKEN")?,
                timeout_secs,
                ..BigQueryConfig::default()
            }),
            "jsonl" => WarehouseBackend::JsonLines {
                dir: PathBuf::from(get("OUTPUT_DIR").unwrap_or_else(|| "output".to_string())),
            },
            other => {
                return Err(ConfigError::Invalid {
                    key: "WAREHOUSE_BACKEND",
                    value: other.to_string(),
                    reason: "expected bigquery or jsonl".to_string(),
                });
            }
        };

        let mut run = RunSettings::default();
        if let Some(radius_m) = parse_optional::<f64>(&get, "NEIGHBORHOOD_RADIUS_METERS")? {
            if !radius_m.is_finite() || radius_m < 0.0 {
                return Err(ConfigError::Invalid {
                    key: "NEIGHBORHOOD_RADIUS_METERS",
                    value: radius_m.to_string(),
                    reason: "must be a non-negative number of meters".to_string(),
                });
            }
            run.radius_m = radius_m;
        }
        if let Some(policy) = parse_optional::<FailurePolicy>(&get, "FAILURE_POLICY")? {
            run.failure_policy = policy;
        }
        if let Some(table) = get("STOPS_TABLE") {
            run.stops_table = table;
        }
        if let Some(table) = get("JOURNEYS_TABLE") {
            run.journeys_table = table;
        }

        Ok(Self {
            grids,
            geocoder,
            routing,
            warehouse,
            run,
            rng_seed: parse_optional::<u64>(&get, "RNG_SEED")?,
        })
    }
}

fn parse_optional<T>(
    get: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|value| {
            value.trim().parse::<T>().map_err(|err| ConfigError::Invalid {
                key,
                value: value.clone(),
                reason: err.to_string(),
            })
        })
        .transpose()
}

/// Blocking HTTP client shared by every adapter. Without a timeout the
/// transport defaults apply.
pub(crate) fn http_client(
    timeout_secs: Option<u64>,
    user_agent: Option<&str>,
) -> Result<reqwest::blocking::Client, reqwest::Error> {
    let mut builder = reqwest::blocking::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if let Some(agent) = user_agent {
        builder = builder.user_agent(agent.to_string());
    }
    builder.build()
}
