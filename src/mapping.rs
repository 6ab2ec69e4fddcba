use std::collections::HashMap;

use tracing::{debug, warn};

use crate::domain::UniprotMappingRow;
use crate::error::KiraError;
use crate::hgnc::HgncRegistry;

/// Entry-name keyed lookups built from the UniProt mapping table.
#[derive(Debug, Clone, Default)]
pub struct UniprotIndex {
    pub entry_name_to_accession: HashMap<String, String>,
    pub entry_name_to_taxon: HashMap<String, String>,
    /// Rows that remapped an already present entry name to another accession.
    /// Exact repeats are not counted.
    pub conflicts: usize,
}

impl UniprotIndex {
    /// Last write wins on duplicate entry names; overwrites with a different
    /// accession are counted.
    pub fn build(rows: &[UniprotMappingRow]) -> Self {
        let mut index = Self::default();
        for row in rows {
            let previous = index
                .entry_name_to_accession
                .insert(row.entry_name.clone(), row.accession.clone());
            index
                .entry_name_to_taxon
                .insert(row.entry_name.clone(), row.taxonomy_id.clone());
            if let Some(previous) = previous.filter(|previous| *previous != row.accession) {
                debug!(
                    entry_name = %row.entry_name,
                    previous = %previous,
                    current = %row.accession,
                    "uniprot entry name remapped"
                );
                index.conflicts += 1;
            }
        }
        if index.conflicts > 0 {
            warn!(
                conflicts = index.conflicts,
                "duplicate UniProt entry names in mapping table; last row wins"
            );
        }
        index
    }

    pub fn accession(&self, entry_name: &str) -> Option<&str> {
        self.entry_name_to_accession.get(entry_name).map(String::as_str)
    }

    pub fn taxon(&self, entry_name: &str) -> Option<&str> {
        self.entry_name_to_taxon.get(entry_name).map(String::as_str)
    }
}

/// Entrez keyed lookups taken from the HGNC registry.
#[derive(Debug, Clone, Default)]
pub struct HgncIndex {
    pub entrez_to_symbol: HashMap<String, String>,
    pub entrez_to_hgnc_id: HashMap<String, String>,
}

impl HgncIndex {
    pub fn build(registry: &dyn HgncRegistry) -> Result<Self, KiraError> {
        if !registry.is_populated() {
            return Err(KiraError::PreconditionNotMet {
                dependency: "HGNC".to_string(),
            });
        }
        Ok(Self {
            entrez_to_symbol: registry.build_entrez_id_to_hgnc_symbol_mapping(),
            entrez_to_hgnc_id: registry.build_entrez_id_to_hgnc_id_mapping(),
        })
    }

    pub fn symbol(&self, entrez_id: &str) -> Option<&str> {
        self.entrez_to_symbol.get(entrez_id).map(String::as_str)
    }

    pub fn hgnc_id(&self, entrez_id: &str) -> Option<&str> {
        self.entrez_to_hgnc_id.get(entrez_id).map(String::as_str)
    }
}
