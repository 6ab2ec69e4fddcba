use std::collections::HashMap;

use tracing::info;

use crate::domain::{EnrichedRow, IdentifierBundle, Protein, ProteinRef};
use crate::error::KiraError;

/// Deduplicated proteins of one population pass, keyed by Entrez id.
///
/// The Entrez id is the only identifier every endpoint is guaranteed to
/// carry, and it is the column the store declares unique. A UniProt accession
/// only confirms identity: two occurrences of one Entrez id with different
/// accessions are rejected.
#[derive(Debug, Clone, Default)]
pub struct ProteinRegistry {
    proteins: Vec<Protein>,
    by_entrez: HashMap<String, usize>,
}

impl ProteinRegistry {
    pub fn len(&self) -> usize {
        self.proteins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proteins.is_empty()
    }

    /// Proteins in first-occurrence order.
    pub fn proteins(&self) -> &[Protein] {
        &self.proteins
    }

    pub fn get(&self, protein: ProteinRef) -> Option<&Protein> {
        self.proteins.get(protein.0 as usize)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.proteins.iter().map(|protein| protein.entrez_id.as_str())
    }

    pub fn resolve(&self, bundle: &IdentifierBundle) -> Option<ProteinRef> {
        self.by_entrez
            .get(&bundle.entrez_id)
            .map(|&idx| ProteinRef(idx as u64))
    }

    /// An occurrence without an accession only holds a place for its Entrez
    /// id; the first occurrence that carries an accession defines the protein.
    fn register(&mut self, row: usize, bundle: &IdentifierBundle) -> Result<(), KiraError> {
        let Some(&idx) = self.by_entrez.get(&bundle.entrez_id) else {
            self.by_entrez
                .insert(bundle.entrez_id.clone(), self.proteins.len());
            self.proteins.push(bundle.to_protein());
            return Ok(());
        };
        let Some(incoming) = bundle.uniprot_accession.as_ref() else {
            return Ok(());
        };
        match self.proteins[idx].uniprot_id.clone() {
            None => self.proteins[idx] = bundle.to_protein(),
            Some(registered) if &registered != incoming => {
                return Err(KiraError::DedupConflict {
                    row,
                    entrez_id: bundle.entrez_id.clone(),
                    registered,
                    incoming: incoming.clone(),
                });
            }
            Some(_) => {}
        }
        Ok(())
    }
}

/// Builds the registry from both endpoint roles, in file order, source before
/// target. Proteins keep the position of their Entrez id's first occurrence;
/// their attributes come from the first occurrence with an accession.
pub fn build_registry(rows: &[EnrichedRow]) -> Result<ProteinRegistry, KiraError> {
    let mut registry = ProteinRegistry::default();
    for (row, enriched) in rows.iter().enumerate() {
        registry.register(row, &enriched.source)?;
        registry.register(row, &enriched.target)?;
    }
    info!(
        proteins = registry.len(),
        endpoints = rows.len() * 2,
        "built protein registry"
    );
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn bundle(entrez: &str, accession: Option<&str>) -> IdentifierBundle {
        IdentifierBundle {
            uniprot_accession: accession.map(str::to_string),
            uniprot_entry_name: format!("E{entrez}_HUMAN"),
            entrez_id: entrez.to_string(),
            ..IdentifierBundle::default()
        }
    }

    fn row(source: IdentifierBundle, target: IdentifierBundle) -> EnrichedRow {
        EnrichedRow {
            source,
            target,
            confidence: 0.5,
        }
    }

    #[test]
    fn first_accession_defines_protein() {
        let rows = vec![
            row(bundle("1", None), bundle("2", Some("P2"))),
            row(bundle("1", Some("P1")), bundle("1", Some("P1"))),
        ];
        let registry = build_registry(&rows).unwrap();
        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(registry.proteins()[0].uniprot_id.as_deref(), Some("P1"));
        assert_eq!(
            registry.resolve(&bundle("2", None)),
            Some(ProteinRef(1))
        );
    }

    #[test]
    fn row_order_does_not_change_proteins() {
        let rows = vec![
            row(bundle("1", None), bundle("2", Some("P2"))),
            row(bundle("3", Some("P3")), bundle("1", Some("P1"))),
            row(bundle("2", None), bundle("3", None)),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();

        let sorted = |rows: &[EnrichedRow]| {
            let mut proteins = build_registry(rows).unwrap().proteins().to_vec();
            proteins.sort_by(|a, b| a.entrez_id.cmp(&b.entrez_id));
            proteins
        };
        let forward = sorted(&rows);
        assert_eq!(forward, sorted(&reversed));
        assert!(forward.iter().all(|protein| protein.uniprot_id.is_some()));
    }

    #[test]
    fn conflicting_accession_is_rejected() {
        let rows = vec![
            row(bundle("1", Some("P1")), bundle("2", Some("P2"))),
            row(bundle("3", Some("P3")), bundle("1", Some("Q1"))),
        ];
        let err = build_registry(&rows).unwrap_err();
        assert_matches!(
            err,
            KiraError::DedupConflict { row: 1, ref entrez_id, ref registered, ref incoming }
                if entrez_id == "1" && registered == "P1" && incoming == "Q1"
        );
    }
}
