use tracing::info;

use crate::domain::{EnrichedRow, IdentifierBundle, RawInteractionRow};
use crate::error::KiraError;
use crate::hgnc::HgncRegistry;
use crate::mapping::{HgncIndex, UniprotIndex};

/// Lookup misses seen while enriching. Misses never drop a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichStats {
    pub rows: usize,
    pub uniprot_misses: usize,
    pub hgnc_misses: usize,
}

/// Enriches against a live HGNC registry. Fails before touching any row if
/// the registry is not populated.
pub fn enrich_with_registry(
    rows: &[RawInteractionRow],
    uniprot: &UniprotIndex,
    registry: &dyn HgncRegistry,
) -> Result<(Vec<EnrichedRow>, EnrichStats), KiraError> {
    let hgnc = HgncIndex::build(registry)?;
    Ok(enrich(rows, uniprot, &hgnc))
}

pub fn enrich(
    rows: &[RawInteractionRow],
    uniprot: &UniprotIndex,
    hgnc: &HgncIndex,
) -> (Vec<EnrichedRow>, EnrichStats) {
    let mut stats = EnrichStats {
        rows: rows.len(),
        ..EnrichStats::default()
    };
    let mut bundle = |entry_name: &str, entrez_id: &str| {
        let bundle = IdentifierBundle {
            uniprot_accession: uniprot.accession(entry_name).map(str::to_string),
            uniprot_entry_name: entry_name.to_string(),
            entrez_id: entrez_id.to_string(),
            taxonomy_id: uniprot.taxon(entry_name).map(str::to_string),
            hgnc_id: hgnc.hgnc_id(entrez_id).map(str::to_string),
            hgnc_symbol: hgnc.symbol(entrez_id).map(str::to_string),
        };
        if bundle.uniprot_accession.is_none() {
            stats.uniprot_misses += 1;
        }
        if bundle.hgnc_id.is_none() {
            stats.hgnc_misses += 1;
        }
        bundle
    };

    let enriched = rows
        .iter()
        .map(|row| EnrichedRow {
            source: bundle(&row.source_entry_name, &row.source_entrez_id),
            target: bundle(&row.target_entry_name, &row.target_entrez_id),
            confidence: row.confidence,
        })
        .collect();

    info!(
        rows = stats.rows,
        uniprot_misses = stats.uniprot_misses,
        hgnc_misses = stats.hgnc_misses,
        "enriched interaction rows"
    );
    (enriched, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UniprotMappingRow;

    #[test]
    fn misses_leave_fields_unset() {
        let uniprot = UniprotIndex::build(&[UniprotMappingRow {
            entry_name: "A_HUMAN".to_string(),
            accession: "P1".to_string(),
            taxonomy_id: "9606".to_string(),
        }]);
        let mut hgnc = HgncIndex::default();
        hgnc.entrez_to_symbol.insert("2".to_string(), "BBB".to_string());
        hgnc.entrez_to_hgnc_id.insert("2".to_string(), "HGNC:2".to_string());

        let raw = RawInteractionRow {
            source_entry_name: "A_HUMAN".to_string(),
            source_entrez_id: "1".to_string(),
            target_entry_name: "B_HUMAN".to_string(),
            target_entrez_id: "2".to_string(),
            confidence: -0.5,
            metadata: String::new(),
        };
        let (rows, stats) = enrich(&[raw], &uniprot, &hgnc);

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.source.uniprot_accession.as_deref(), Some("P1"));
        assert_eq!(row.source.hgnc_id, None);
        assert_eq!(row.target.uniprot_accession, None);
        assert_eq!(row.target.taxonomy_id, None);
        assert_eq!(row.target.hgnc_symbol.as_deref(), Some("BBB"));
        assert_eq!(row.confidence, -0.5);
        assert_eq!(
            stats,
            EnrichStats {
                rows: 1,
                uniprot_misses: 1,
                hgnc_misses: 1,
            }
        );
    }
}
