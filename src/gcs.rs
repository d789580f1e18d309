//! Grid source backed by a Cloud Storage bucket of CSV grids.

use reqwest::Url;
use serde::Deserialize;

use crate::config::http_client;
use crate::error::GridLoadError;
use crate::grid::parse_grid;
use crate::model::PopulationGrid;
use crate::traits::GridSource;

#[derive(Debug, Clone)]
pub struct GcsConfig {
    pub base_url: String,
    pub bucket: String,
    /// Bearer token; public buckets need none.
    pub access_token: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl Default for GcsConfig {
    fn default() -> Self {
        Self {
            base_url: "https://storage.googleapis.com".to_string(),
            bucket: String::new(),
            access_token: None,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GcsGridSource {
    config: GcsConfig,
    client: reqwest::blocking::Client,
}

impl GcsGridSource {
    pub fn new(config: GcsConfig) -> Result<Self, reqwest::Error> {
        let client = http_client(config.timeout_secs, None)?;
        Ok(Self { config, client })
    }

    /// `{base}/storage/v1/b/{bucket}/o[/{object}]`, with every segment
    /// percent-encoded so object names may contain slashes.
    fn objects_url(&self, object: Option<&str>) -> Result<Url, GridLoadError> {
        let mut url = Url::parse(&self.config.base_url)
            .map_err(|err| GridLoadError::Location(format!("{}: {}", self.config.base_url, err)))?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                GridLoadError::Location(format!("{} cannot be a base URL", self.config.base_url))
            })?;
            segments
                .pop_if_empty()
                .extend(["storage", "v1", "b", self.config.bucket.as_str(), "o"]);
            if let Some(object) = object {
                segments.push(object);
            }
        }
        Ok(url)
    }

    fn get(&self, url: Url, name: &str) -> Result<reqwest::blocking::Response, GridLoadError> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .and_then(|resp| resp.error_for_status())
            .map_err(|source| GridLoadError::Http {
                name: name.to_string(),
                source,
            })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectList {
    #[serde(default)]
    items: Vec<ObjectEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectEntry {
    name: String,
}

impl ObjectList {
    fn csv_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.items
            .iter()
            .map(|item| item.name.as_str())
            .filter(|name| name.to_ascii_lowercase().ends_with(".csv"))
    }
}

impl GridSource for GcsGridSource {
    fn grid_names(&self) -> Result<Vec<String>, GridLoadError> {
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = self.objects_url(None)?;
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }
            let page: ObjectList = self
                .get(url, &self.config.bucket)?
                .json()
                .map_err(|source| GridLoadError::Http {
                    name: self.config.bucket.clone(),
                    source,
                })?;
            names.extend(page.csv_names().map(str::to_string));
            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(names)
    }

    fn load_grid(&self, name: &str) -> Result<PopulationGrid, GridLoadError> {
        let mut url = self.objects_url(Some(name))?;
        url.query_pairs_mut().append_pair("alt", "media");
        let body = self
            .get(url, name)?
            .bytes()
            .map_err(|source| GridLoadError::Http {
                name: name.to_string(),
                source,
            })?;
        parse_grid(name, body.as_ref())
    }
}
