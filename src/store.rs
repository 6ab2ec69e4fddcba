use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::error::KiraError;
use crate::source::SourceKind;

/// Layout of the shared download cache and the default database location.
#[derive(Debug, Clone)]
pub struct Store {
    cache_root: Utf8PathBuf,
}

impl Store {
    pub fn new() -> Result<Self, KiraError> {
        let cache_root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("kira-ppi")).ok()
            })
            .ok_or_else(|| {
                KiraError::Filesystem("unable to resolve cache directory".to_string())
            })?;
        Ok(Self { cache_root })
    }

    pub fn new_with_root(cache_root: Utf8PathBuf) -> Self {
        Self { cache_root }
    }

    pub fn cache_root(&self) -> &Utf8Path {
        &self.cache_root
    }

    pub fn source_dir(&self, kind: SourceKind) -> Utf8PathBuf {
        self.cache_root.join(kind.as_str())
    }

    /// Cached copy of `url`. The default URL of `kind` keeps the plain file
    /// name; any other URL is stored under `override/<host>/<path>` so it can
    /// never shadow the default download.
    pub fn source_path(&self, kind: SourceKind, url: &str) -> Utf8PathBuf {
        let dir = self.source_dir(kind);
        if url == kind.default_url() {
            return dir.join(file_name(kind, url));
        }
        let mut path = dir.join("override");
        for part in override_parts(url) {
            path.push(part);
        }
        path
    }

    /// Metadata sidecar of the download of `url`.
    pub fn metadata_path(&self, kind: SourceKind, url: &str) -> Utf8PathBuf {
        let dir = self.cache_root.join("metadata");
        if url == kind.default_url() {
            return dir.join(format!("{}.json", kind.as_str()));
        }
        let mut path = dir.join(kind.as_str()).join("override");
        for part in override_parts(url) {
            path.push(part);
        }
        path.set_extension("json");
        path
    }

    pub fn database_path(&self) -> Utf8PathBuf {
        self.cache_root.join("hippie.redb")
    }

    pub fn ensure_cache_root(&self) -> Result<(), KiraError> {
        fs::create_dir_all(self.cache_root.as_std_path()).map_err(KiraError::filesystem)
    }

    pub fn write_metadata(path: &Utf8Path, metadata: &Metadata) -> Result<(), KiraError> {
        let content = serde_json::to_vec_pretty(metadata)
            .map_err(|err| KiraError::Serialization(err.to_string()))?;
        Self::write_bytes_atomic(path, &content)
    }

    pub fn read_metadata(path: &Utf8Path) -> Result<Option<Metadata>, KiraError> {
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path.as_std_path()).map_err(KiraError::filesystem)?;
        let metadata = serde_json::from_str(&content)
            .map_err(|err| KiraError::Serialization(err.to_string()))?;
        Ok(Some(metadata))
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), KiraError> {
        let parent = path
            .parent()
            .ok_or_else(|| KiraError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path()).map_err(KiraError::filesystem)?;
        let mut temp = Builder::new()
            .prefix("kira-ppi-file")
            .tempfile_in(parent.as_std_path())
            .map_err(KiraError::filesystem)?;
        temp.write_all(content).map_err(KiraError::filesystem)?;
        temp.persist(path.as_std_path())
            .map_err(KiraError::filesystem)?;
        Ok(())
    }
}

fn file_name<'a>(kind: SourceKind, url: &'a str) -> &'a str {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty() && !segment.contains(':'))
        .unwrap_or(kind.default_file_name())
}

/// Host (with port) followed by the non-empty path segments of `url`.
fn override_parts(url: &str) -> Vec<String> {
    let Ok(parsed) = reqwest::Url::parse(url) else {
        return vec![sanitize(url)];
    };
    let host = match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{host}_{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => "local".to_string(),
    };
    let mut parts = vec![sanitize(&host)];
    if let Some(segments) = parsed.path_segments() {
        parts.extend(
            segments
                .filter(|segment| !segment.is_empty() && *segment != "..")
                .map(sanitize),
        );
    }
    parts
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

/// Sidecar written next to every cached download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub source: String,
    pub url: String,
    pub downloaded_at: String,
    pub tool: String,
    pub resolved_path: String,
}
