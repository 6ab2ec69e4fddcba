use std::fs::File;
use std::path::Path;
use std::time::Duration;

use camino::Utf8PathBuf;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, info};

use crate::domain::{RawInteractionRow, UniprotMappingRow};
use crate::error::KiraError;
use crate::hgnc::HgncTable;
use crate::parser;
use crate::store::{Metadata, Store};

pub const HIPPIE_URL: &str = "http://cbdm-01.zdv.uni-mainz.de/~mschaefer/hippie/hippie_current.txt";
pub const UNIPROT_MAPPING_URL: &str = "https://ftp.uniprot.org/pub/databases/uniprot/current_release/knowledgebase/idmapping/by_organism/HUMAN_9606_idmapping_selected.tab.gz";
pub const HGNC_URL: &str = "https://storage.googleapis.com/public-download-files/hgnc/tsv/tsv/hgnc_complete_set.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Hippie,
    UniprotMapping,
    Hgnc,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Hippie => "hippie",
            SourceKind::UniprotMapping => "uniprot",
            SourceKind::Hgnc => "hgnc",
        }
    }

    pub fn default_url(&self) -> &'static str {
        match self {
            SourceKind::Hippie => HIPPIE_URL,
            SourceKind::UniprotMapping => UNIPROT_MAPPING_URL,
            SourceKind::Hgnc => HGNC_URL,
        }
    }

    pub fn default_file_name(&self) -> &'static str {
        match self {
            SourceKind::Hippie => "hippie_current.txt",
            SourceKind::UniprotMapping => "uniprot_mappings.tab.gz",
            SourceKind::Hgnc => "hgnc_complete_set.txt",
        }
    }
}

pub trait SourceClient: Send + Sync {
    fn download(&self, url: &str, destination: &Path) -> Result<(), KiraError>;
}

#[derive(Clone)]
pub struct HttpSourceClient {
    client: Client,
}

impl HttpSourceClient {
    pub fn new() -> Result<Self, KiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("kira-ppi/{}", env!("CARGO_PKG_VERSION")))
                .map_err(KiraError::filesystem)?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(600))
            .build()
            .map_err(|err| KiraError::Http(err.to_string()))?;
        Ok(Self { client })
    }

    fn send_with_retries(&self, url: &str) -> Result<reqwest::blocking::Response, KiraError> {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            match self.client.get(url).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        debug!(url, status, attempt, "retrying download");
                        std::thread::sleep(Duration::from_millis(
                            BASE_DELAY_MS * (attempt as u64 + 1),
                        ));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        debug!(url, attempt, error = %err, "retrying download");
                        std::thread::sleep(Duration::from_millis(
                            BASE_DELAY_MS * (attempt as u64 + 1),
                        ));
                        attempt += 1;
                        continue;
                    }
                    return Err(KiraError::Http(err.to_string()));
                }
            }
        }
    }
}

impl SourceClient for HttpSourceClient {
    fn download(&self, url: &str, destination: &Path) -> Result<(), KiraError> {
        let mut response = self.send_with_retries(url)?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "request failed".to_string());
            return Err(KiraError::HttpStatus {
                url: url.to_string(),
                status,
                message,
            });
        }
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent).map_err(KiraError::filesystem)?;
        }
        let mut file = File::create(destination).map_err(KiraError::filesystem)?;
        std::io::copy(&mut response, &mut file).map_err(KiraError::filesystem)?;
        Ok(())
    }
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

/// Resolves source tables to local files, downloading into the cache when
/// needed, and parses them.
pub struct SourceLoader<C: SourceClient> {
    store: Store,
    client: C,
}

impl<C: SourceClient> SourceLoader<C> {
    pub fn new(store: Store, client: C) -> Self {
        Self { store, client }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// A local path (or `file://` URL) is used in place. A remote override
    /// is always re-fetched; the default URL is fetched once and cached.
    pub fn resolve(&self, kind: SourceKind, url: Option<&str>) -> Result<Utf8PathBuf, KiraError> {
        if let Some(local) = url.and_then(local_path) {
            debug!(source = kind.as_str(), path = %local, "using local table");
            return Ok(local);
        }

        let url = url.unwrap_or(kind.default_url());
        let is_override = url != kind.default_url();
        let path = self.store.source_path(kind, url);
        if !is_override && path.as_std_path().exists() && self.cached_from(kind, url)? {
            debug!(source = kind.as_str(), path = %path, "using cached table");
            return Ok(path);
        }

        self.fetch(kind, url, &path)?;
        Ok(path)
    }

    /// True when the cached file's sidecar records `url` as its origin.
    fn cached_from(&self, kind: SourceKind, url: &str) -> Result<bool, KiraError> {
        let metadata = Store::read_metadata(&self.store.metadata_path(kind, url))?;
        Ok(metadata.is_some_and(|metadata| metadata.url == url))
    }

    fn fetch(&self, kind: SourceKind, url: &str, path: &Utf8PathBuf) -> Result<(), KiraError> {
        info!(source = kind.as_str(), url, "downloading");
        self.store.ensure_cache_root()?;
        let parent = path
            .parent()
            .ok_or_else(|| KiraError::Filesystem("invalid cache path".to_string()))?;
        std::fs::create_dir_all(parent.as_std_path()).map_err(KiraError::filesystem)?;
        let temp = tempfile::Builder::new()
            .prefix("kira-ppi-download")
            .tempfile_in(parent.as_std_path())
            .map_err(KiraError::filesystem)?;
        self.client.download(url, temp.path())?;
        temp.persist(path.as_std_path())
            .map_err(KiraError::filesystem)?;

        let metadata = Metadata {
            source: kind.as_str().to_string(),
            url: url.to_string(),
            downloaded_at: chrono::Utc::now().to_rfc3339(),
            tool: format!("kira-ppi/{}", env!("CARGO_PKG_VERSION")),
            resolved_path: path.to_string(),
        };
        Store::write_metadata(&self.store.metadata_path(kind, url), &metadata)
    }

    pub fn load_interactions(&self, url: Option<&str>) -> Result<Vec<RawInteractionRow>, KiraError> {
        let path = self.resolve(SourceKind::Hippie, url)?;
        let rows = parser::parse_interactions(parser::open_table(path.as_std_path())?)?;
        info!(rows = rows.len(), "loaded HIPPIE interactions");
        Ok(rows)
    }

    pub fn load_uniprot_mappings(
        &self,
        url: Option<&str>,
    ) -> Result<Vec<UniprotMappingRow>, KiraError> {
        let path = self.resolve(SourceKind::UniprotMapping, url)?;
        let rows = parser::parse_uniprot_table(parser::open_table(path.as_std_path())?)?;
        info!(rows = rows.len(), "loaded UniProt mappings");
        Ok(rows)
    }

    pub fn load_hgnc(&self, url: Option<&str>) -> Result<HgncTable, KiraError> {
        let path = self.resolve(SourceKind::Hgnc, url)?;
        let table = HgncTable::from_reader(parser::open_table(path.as_std_path())?)?;
        info!(genes = table.len(), "loaded HGNC genes");
        Ok(table)
    }
}

fn local_path(location: &str) -> Option<Utf8PathBuf> {
    if let Some(path) = location.strip_prefix("file://") {
        return Some(Utf8PathBuf::from(path));
    }
    if location.contains("://") {
        return None;
    }
    Some(Utf8PathBuf::from(location))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_locations() {
        assert_eq!(
            local_path("file:///data/hippie.txt"),
            Some(Utf8PathBuf::from("/data/hippie.txt"))
        );
        assert_eq!(
            local_path("tests/fixtures/hippie_test.txt"),
            Some(Utf8PathBuf::from("tests/fixtures/hippie_test.txt"))
        );
        assert_eq!(local_path(HIPPIE_URL), None);
    }
}
