//! HGNC gene registry used to attach symbols and HGNC ids to Entrez genes.

use std::collections::HashMap;
use std::io::Read;

use serde::Deserialize;

use crate::error::KiraError;

/// Read-only view of a populated HGNC registry.
pub trait HgncRegistry {
    fn is_populated(&self) -> bool;
    fn build_entrez_id_to_hgnc_symbol_mapping(&self) -> HashMap<String, String>;
    fn build_entrez_id_to_hgnc_id_mapping(&self) -> HashMap<String, String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HgncGene {
    pub hgnc_id: String,
    pub symbol: String,
    #[serde(default)]
    pub entrez_id: Option<String>,
}

/// HGNC registry backed by the tab-separated "complete set" export.
#[derive(Debug, Clone, Default)]
pub struct HgncTable {
    genes: Vec<HgncGene>,
}

impl HgncTable {
    pub fn new(genes: Vec<HgncGene>) -> Self {
        Self { genes }
    }

    /// Loads the complete set. Columns other than `hgnc_id`, `symbol` and
    /// `entrez_id` are ignored; genes without an Entrez id are kept but never
    /// show up in the Entrez mappings.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, KiraError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let mut genes = Vec::new();
        for record in csv_reader.deserialize::<HgncGene>() {
            let gene = record.map_err(|err| KiraError::MalformedRow {
                source_name: "HGNC",
                line: err.position().map(|pos| pos.line()).unwrap_or(0),
                message: err.to_string(),
            })?;
            genes.push(gene);
        }
        Ok(Self { genes })
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    fn with_entrez(&self) -> impl Iterator<Item = (&str, &HgncGene)> {
        self.genes.iter().filter_map(|gene| {
            gene.entrez_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(|id| (id, gene))
        })
    }
}

impl HgncRegistry for HgncTable {
    fn is_populated(&self) -> bool {
        !self.genes.is_empty()
    }

    fn build_entrez_id_to_hgnc_symbol_mapping(&self) -> HashMap<String, String> {
        self.with_entrez()
            .map(|(entrez, gene)| (entrez.to_string(), gene.symbol.clone()))
            .collect()
    }

    fn build_entrez_id_to_hgnc_id_mapping(&self) -> HashMap<String, String> {
        self.with_entrez()
            .map(|(entrez, gene)| (entrez.to_string(), gene.hgnc_id.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "hgnc_id\tsymbol\tname\tentrez_id\n\
                          HGNC:11998\tTP53\ttumor protein p53\t7157\n\
                          HGNC:5\tA1BG\talpha-1-B glycoprotein\t1\n\
                          HGNC:99999\tNOENTREZ\twithdrawn\t\n";

    #[test]
    fn mappings_skip_genes_without_entrez() {
        let table = HgncTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert!(table.is_populated());
        assert_eq!(table.len(), 3);

        let symbols = table.build_entrez_id_to_hgnc_symbol_mapping();
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols.get("7157").map(String::as_str), Some("TP53"));

        let ids = table.build_entrez_id_to_hgnc_id_mapping();
        assert_eq!(ids.get("1").map(String::as_str), Some("HGNC:5"));
    }

    #[test]
    fn empty_table_is_not_populated() {
        assert!(!HgncTable::default().is_populated());
    }
}
