use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::KiraError;

/// Identifier system used to label protein nodes in an exported graph.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    #[default]
    Uniprot,
    Ncbigene,
    Hgnc,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Uniprot => "uniprot",
            Namespace::Ncbigene => "ncbigene",
            Namespace::Hgnc => "hgnc",
        }
    }

    /// Parses an optional namespace token, falling back to `uniprot`.
    pub fn resolve(token: Option<&str>) -> Result<Self, KiraError> {
        match token {
            None => Ok(Namespace::default()),
            Some(value) => value.parse(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "uniprot" => Ok(Namespace::Uniprot),
            "ncbigene" => Ok(Namespace::Ncbigene),
            "hgnc" => Ok(Namespace::Hgnc),
            _ => Err(KiraError::InvalidNamespace(value.to_string())),
        }
    }
}

/// One line of the HIPPIE interaction file.
#[derive(Debug, Clone, PartialEq)]
pub struct RawInteractionRow {
    pub source_entry_name: String,
    pub source_entrez_id: String,
    pub target_entry_name: String,
    pub target_entrez_id: String,
    pub confidence: f64,
    pub metadata: String,
}

/// One row of the UniProt slim mapping table, with the upstream column swap
/// already undone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniprotMappingRow {
    pub entry_name: String,
    pub accession: String,
    pub taxonomy_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct IdentifierBundle {
    pub uniprot_accession: Option<String>,
    pub uniprot_entry_name: String,
    pub entrez_id: String,
    pub taxonomy_id: Option<String>,
    pub hgnc_id: Option<String>,
    pub hgnc_symbol: Option<String>,
}

impl IdentifierBundle {
    pub fn to_protein(&self) -> Protein {
        Protein {
            uniprot_id: self.uniprot_accession.clone(),
            uniprot_entry_name: Some(self.uniprot_entry_name.clone())
                .filter(|name| !name.is_empty()),
            entrez_id: self.entrez_id.clone(),
            taxonomy_id: self.taxonomy_id.clone(),
            symbol: self.hgnc_symbol.clone(),
            hgnc_id: self.hgnc_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedRow {
    pub source: IdentifierBundle,
    pub target: IdentifierBundle,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protein {
    pub uniprot_id: Option<String>,
    pub uniprot_entry_name: Option<String>,
    pub entrez_id: String,
    pub taxonomy_id: Option<String>,
    pub symbol: Option<String>,
    pub hgnc_id: Option<String>,
}

/// Row id of a protein, either in a registry or in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProteinRef(pub u64);

impl fmt::Display for ProteinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub source: ProteinRef,
    pub target: ProteinRef,
    pub confidence: f64,
}
