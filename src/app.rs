use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::info;

use crate::db::PpiStore;
use crate::domain::{Namespace, RawInteractionRow, UniprotMappingRow};
use crate::enrich::enrich;
use crate::error::KiraError;
use crate::graph::{self, ExportResult};
use crate::hgnc::HgncRegistry;
use crate::mapping::{HgncIndex, UniprotIndex};
use crate::materialize::materialize;
use crate::registry::build_registry;
use crate::source::{SourceClient, SourceLoader};

#[derive(Debug, Clone, Default)]
pub struct PopulateOptions {
    pub url: Option<String>,
    pub uniprot_url: Option<String>,
    pub reset: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PopulateResult {
    pub proteins: usize,
    pub interactions: usize,
    pub uniprot_conflicts: usize,
    pub uniprot_misses: usize,
    pub hgnc_misses: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub proteins: usize,
    pub interactions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetResult {
    pub reset: bool,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// HIPPIE database manager: populates the store and exports it.
pub struct App<S: PpiStore> {
    store: S,
}

impl<S: PpiStore> App<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_populated(&self) -> Result<bool, KiraError> {
        Ok(self.count_proteins()? > 0)
    }

    pub fn count_proteins(&self) -> Result<usize, KiraError> {
        self.store.count_proteins()
    }

    pub fn count_interactions(&self) -> Result<usize, KiraError> {
        self.store.count_interactions()
    }

    pub fn summarize(&self) -> Result<Summary, KiraError> {
        Ok(Summary {
            proteins: self.count_proteins()?,
            interactions: self.count_interactions()?,
        })
    }

    pub fn reset(&mut self, sink: &dyn ProgressSink) -> Result<ResetResult, KiraError> {
        sink.event(ProgressEvent {
            message: "phase=Store; dropping proteins and interactions".to_string(),
            elapsed: None,
        });
        self.store.reset()?;
        Ok(ResetResult { reset: true })
    }

    /// Loads the source tables through `loader` and populates the store.
    ///
    /// The HGNC registry is checked before anything is downloaded. With
    /// `options.reset` the old rows are dropped in the same transaction that
    /// writes the new ones, so a failed pass keeps the previous contents.
    pub fn populate_from<C: SourceClient>(
        &mut self,
        loader: &SourceLoader<C>,
        hgnc: &dyn HgncRegistry,
        options: &PopulateOptions,
        sink: &dyn ProgressSink,
    ) -> Result<PopulateResult, KiraError> {
        let hgnc_index = HgncIndex::build(hgnc)?;
        self.ensure_writable(options.reset)?;

        sink.event(ProgressEvent {
            message: "phase=Resolve; loading UniProt mappings".to_string(),
            elapsed: None,
        });
        let uniprot_rows = loader.load_uniprot_mappings(options.uniprot_url.as_deref())?;
        sink.event(ProgressEvent {
            message: "phase=Resolve; loading HIPPIE interactions".to_string(),
            elapsed: None,
        });
        let raw_rows = loader.load_interactions(options.url.as_deref())?;

        self.populate_indexed(&raw_rows, &uniprot_rows, &hgnc_index, options.reset, sink)
    }

    /// Populates an empty store from already parsed tables.
    pub fn populate(
        &mut self,
        raw_rows: &[RawInteractionRow],
        uniprot_rows: &[UniprotMappingRow],
        hgnc: &dyn HgncRegistry,
        sink: &dyn ProgressSink,
    ) -> Result<PopulateResult, KiraError> {
        let hgnc_index = HgncIndex::build(hgnc)?;
        self.ensure_writable(false)?;
        self.populate_indexed(raw_rows, uniprot_rows, &hgnc_index, false, sink)
    }

    fn ensure_writable(&self, reset: bool) -> Result<(), KiraError> {
        if !reset && self.is_populated()? {
            return Err(KiraError::AlreadyPopulated);
        }
        Ok(())
    }

    /// Every in-memory stage runs before the store is touched; the reset and
    /// both inserts then commit together.
    fn populate_indexed(
        &mut self,
        raw_rows: &[RawInteractionRow],
        uniprot_rows: &[UniprotMappingRow],
        hgnc_index: &HgncIndex,
        reset: bool,
        sink: &dyn ProgressSink,
    ) -> Result<PopulateResult, KiraError> {
        let started = Instant::now();
        sink.event(ProgressEvent {
            message: format!("phase=Enrich; {} interaction rows", raw_rows.len()),
            elapsed: None,
        });
        let uniprot_index = UniprotIndex::build(uniprot_rows);
        let (enriched, stats) = enrich(raw_rows, &uniprot_index, hgnc_index);

        sink.event(ProgressEvent {
            message: "phase=Normalize; building protein registry".to_string(),
            elapsed: Some(started.elapsed()),
        });
        let registry = build_registry(&enriched)?;
        let interactions = materialize(&enriched, &registry)?;

        sink.event(ProgressEvent {
            message: format!(
                "phase=Store; committing {} proteins and {} interactions",
                registry.len(),
                interactions.len()
            ),
            elapsed: Some(started.elapsed()),
        });
        let commit_started = Instant::now();
        let counts = self
            .store
            .commit_population(registry.proteins(), &interactions, reset)?;
        info!(
            proteins = counts.proteins,
            interactions = counts.interactions,
            "committed protein and interaction models in {:.2} seconds",
            commit_started.elapsed().as_secs_f64()
        );

        sink.event(ProgressEvent {
            message: "phase=Done; population finished".to_string(),
            elapsed: Some(started.elapsed()),
        });
        Ok(PopulateResult {
            proteins: counts.proteins,
            interactions: counts.interactions,
            uniprot_conflicts: uniprot_index.conflicts,
            uniprot_misses: stats.uniprot_misses,
            hgnc_misses: stats.hgnc_misses,
        })
    }

    /// Exports the stored interactions as a BEL graph. `None` selects the
    /// `uniprot` namespace; an unknown token fails before anything is read.
    pub fn to_bel(&self, namespace: Option<&str>) -> Result<ExportResult, KiraError> {
        let namespace = Namespace::resolve(namespace)?;
        self.export(namespace)
    }

    pub fn export(&self, namespace: Namespace) -> Result<ExportResult, KiraError> {
        let proteins = self.store.proteins()?;
        let interactions = self.store.interactions()?;
        graph::export(&interactions, &proteins, namespace)
    }
}
