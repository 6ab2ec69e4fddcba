use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use camino::Utf8PathBuf;
use flate2::Compression;
use flate2::write::GzEncoder;

use kira_ppi::error::KiraError;
use kira_ppi::source::{HIPPIE_URL, SourceClient, SourceKind, SourceLoader};
use kira_ppi::store::Store;

const HIPPIE_LINE: &str = "GRB7_HUMAN\t2886\tERBB2_HUMAN\t2064\t0.9\t\n";

struct FakeClient {
    body: Vec<u8>,
    routes: HashMap<String, Vec<u8>>,
    urls: Mutex<Vec<String>>,
}

impl FakeClient {
    fn new(body: &[u8]) -> Self {
        Self {
            body: body.to_vec(),
            routes: HashMap::new(),
            urls: Mutex::new(Vec::new()),
        }
    }

    fn with_route(mut self, url: &str, body: &[u8]) -> Self {
        self.routes.insert(url.to_string(), body.to_vec());
        self
    }

    fn calls(&self) -> usize {
        self.urls.lock().unwrap().len()
    }
}

impl SourceClient for FakeClient {
    fn download(&self, url: &str, destination: &Path) -> Result<(), KiraError> {
        self.urls.lock().unwrap().push(url.to_string());
        let body = self.routes.get(url).unwrap_or(&self.body);
        std::fs::write(destination, body).map_err(|err| KiraError::Filesystem(err.to_string()))
    }
}

fn loader(temp: &tempfile::TempDir, body: &[u8]) -> SourceLoader<FakeClient> {
    loader_with(temp, FakeClient::new(body))
}

fn loader_with(temp: &tempfile::TempDir, client: FakeClient) -> SourceLoader<FakeClient> {
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    SourceLoader::new(Store::new_with_root(root), client)
}

#[test]
fn default_url_is_downloaded_once() {
    let temp = tempfile::tempdir().unwrap();
    let loader = loader(&temp, HIPPIE_LINE.as_bytes());

    let rows = loader.load_interactions(None).unwrap();
    assert_eq!(rows.len(), 1);
    let rows = loader.load_interactions(None).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(loader.client().calls(), 1);

    let metadata_path = loader.store().metadata_path(SourceKind::Hippie, HIPPIE_URL);
    let metadata = Store::read_metadata(&metadata_path).unwrap().unwrap();
    assert_eq!(metadata.url, HIPPIE_URL);
    assert!(metadata.resolved_path.ends_with("hippie/hippie_current.txt"));
}

#[test]
fn remote_override_is_always_fetched() {
    let temp = tempfile::tempdir().unwrap();
    let loader = loader(&temp, HIPPIE_LINE.as_bytes());
    let url = "https://mirror.example.org/hippie/hippie_v2_3.txt";

    loader.load_interactions(Some(url)).unwrap();
    loader.load_interactions(Some(url)).unwrap();
    assert_eq!(loader.client().calls(), 2);
    assert!(
        loader
            .store()
            .source_path(SourceKind::Hippie, url)
            .as_std_path()
            .exists()
    );
}

#[test]
fn override_does_not_shadow_default_cache() {
    let temp = tempfile::tempdir().unwrap();
    let url = "https://mirror.example.org/old/hippie_current.txt";
    let client = FakeClient::new(HIPPIE_LINE.as_bytes()).with_route(
        url,
        b"X_HUMAN\t1\tY_HUMAN\t2\t0.1\t\nX_HUMAN\t1\tZ_HUMAN\t3\t0.2\t\n",
    );
    let loader = loader_with(&temp, client);

    let rows = loader.load_interactions(Some(url)).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].source_entry_name, "X_HUMAN");

    let rows = loader.load_interactions(None).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].source_entry_name, "GRB7_HUMAN");
    assert_eq!(
        *loader.client().urls.lock().unwrap(),
        vec![url.to_string(), HIPPIE_URL.to_string()]
    );

    let metadata_path = loader.store().metadata_path(SourceKind::Hippie, HIPPIE_URL);
    let metadata = Store::read_metadata(&metadata_path).unwrap().unwrap();
    assert_eq!(metadata.url, HIPPIE_URL);
}

#[test]
fn default_cache_from_another_origin_is_refetched() {
    let temp = tempfile::tempdir().unwrap();
    let loader = loader(&temp, HIPPIE_LINE.as_bytes());
    let store = loader.store();
    let cached = store.source_path(SourceKind::Hippie, HIPPIE_URL);
    std::fs::create_dir_all(cached.parent().unwrap()).unwrap();
    std::fs::write(&cached, "X_HUMAN\t1\tY_HUMAN\t2\t0.1\t\n").unwrap();

    let rows = loader.load_interactions(None).unwrap();
    assert_eq!(rows[0].source_entry_name, "GRB7_HUMAN");
    assert_eq!(loader.client().calls(), 1);
}

#[test]
fn local_gzip_mapping_is_read_in_place() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("slim.tsv.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(b"UniProtKB-ID\tUniProtKB-AC\tNCBI-Taxon\nP04626\tERBB2_HUMAN\t9606\n")
        .unwrap();
    std::fs::write(&path, encoder.finish().unwrap()).unwrap();

    let loader = loader(&temp, b"");
    let rows = loader
        .load_uniprot_mappings(Some(path.to_str().unwrap()))
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].entry_name, "ERBB2_HUMAN");
    assert_eq!(rows[0].accession, "P04626");
    assert_eq!(loader.client().calls(), 0);
}
