//! On-disk store for proteins and interactions.
//!
//! The schema is owned here as redb table definitions. Callers only see the
//! [`PpiStore`] capabilities: bulk insert in one transaction, counts, and
//! full reads for export. Rows are never updated or deleted except by
//! [`PpiStore::reset`].

use std::collections::BTreeMap;
use std::path::Path;

use redb::{
    Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition,
    WriteTransaction,
};

use crate::domain::{Interaction, Protein, ProteinRef};
use crate::error::KiraError;

/// Protein id -> postcard encoded [`Protein`].
const PROTEINS: TableDefinition<u64, &[u8]> = TableDefinition::new("hippie_protein");

/// Interaction id -> postcard encoded [`Interaction`].
const INTERACTIONS: TableDefinition<u64, &[u8]> = TableDefinition::new("hippie_interaction");

/// Unique index on `Protein::entrez_id`.
const ENTREZ_INDEX: TableDefinition<&str, u64> = TableDefinition::new("hippie_protein_entrez");

/// Id sequences.
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("hippie_metadata");

const NEXT_PROTEIN_ID: &str = "next_protein_id";
const NEXT_INTERACTION_ID: &str = "next_interaction_id";

pub trait PpiStore {
    /// Inserts all proteins in one transaction and returns their ids, in
    /// input order. Nothing is written if any protein is rejected.
    fn insert_proteins(&mut self, proteins: &[Protein]) -> Result<Vec<ProteinRef>, KiraError>;

    /// Inserts all interactions in one transaction. Every endpoint must
    /// reference a stored protein.
    fn insert_interactions(&mut self, interactions: &[Interaction]) -> Result<usize, KiraError>;

    /// Writes one population pass in a single transaction. With `reset` the
    /// existing rows are dropped first; without it a populated store is
    /// refused. Interaction endpoints are positions in `proteins`. Nothing,
    /// including the reset, is committed if any step fails.
    fn commit_population(
        &mut self,
        proteins: &[Protein],
        interactions: &[Interaction],
        reset: bool,
    ) -> Result<CommitCounts, KiraError>;

    fn count_proteins(&self) -> Result<usize, KiraError>;
    fn count_interactions(&self) -> Result<usize, KiraError>;
    fn proteins(&self) -> Result<BTreeMap<ProteinRef, Protein>, KiraError>;
    fn interactions(&self) -> Result<Vec<Interaction>, KiraError>;

    /// Drops every row.
    fn reset(&mut self) -> Result<(), KiraError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitCounts {
    pub proteins: usize,
    pub interactions: usize,
}

pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Opens or creates the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KiraError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(KiraError::filesystem)?;
        }
        let db = Database::create(path.as_ref()).map_err(KiraError::storage)?;
        let store = Self { db };
        store.create_tables()?;
        Ok(store)
    }

    fn create_tables(&self) -> Result<(), KiraError> {
        let write_txn = self.db.begin_write().map_err(KiraError::storage)?;
        open_all(&write_txn)?;
        write_txn.commit().map_err(KiraError::storage)
    }

    /// Runs `body` inside one write transaction. The transaction commits only
    /// if `body` succeeds and is aborted otherwise.
    fn in_transaction<T>(
        &self,
        body: impl FnOnce(&WriteTransaction) -> Result<T, KiraError>,
    ) -> Result<T, KiraError> {
        let write_txn = self.db.begin_write().map_err(KiraError::storage)?;
        match body(&write_txn) {
            Ok(value) => {
                write_txn.commit().map_err(KiraError::storage)?;
                Ok(value)
            }
            Err(err) => {
                write_txn.abort().map_err(KiraError::storage)?;
                Err(err)
            }
        }
    }

    fn count(
        &self,
        table: TableDefinition<'static, u64, &'static [u8]>,
    ) -> Result<usize, KiraError> {
        let read_txn = self.db.begin_read().map_err(KiraError::storage)?;
        let table = read_txn.open_table(table).map_err(KiraError::storage)?;
        let count = table.len().map_err(KiraError::storage)?;
        Ok(count as usize)
    }
}

impl PpiStore for RedbStore {
    fn insert_proteins(&mut self, proteins: &[Protein]) -> Result<Vec<ProteinRef>, KiraError> {
        self.in_transaction(|txn| insert_proteins_in(txn, proteins))
    }

    fn insert_interactions(&mut self, interactions: &[Interaction]) -> Result<usize, KiraError> {
        self.in_transaction(|txn| insert_interactions_in(txn, interactions))
    }

    fn commit_population(
        &mut self,
        proteins: &[Protein],
        interactions: &[Interaction],
        reset: bool,
    ) -> Result<CommitCounts, KiraError> {
        self.in_transaction(|txn| {
            if reset {
                clear_tables(txn)?;
            } else {
                let table = txn.open_table(PROTEINS).map_err(KiraError::storage)?;
                if table.len().map_err(KiraError::storage)? > 0 {
                    return Err(KiraError::AlreadyPopulated);
                }
            }

            let ids = insert_proteins_in(txn, proteins)?;
            let stored_id = |row: usize, role: &'static str, id: ProteinRef| {
                ids.get(id.0 as usize)
                    .copied()
                    .ok_or_else(|| KiraError::UnresolvedEndpoint {
                        row,
                        role,
                        identifier: id.to_string(),
                        accession: None,
                    })
            };
            let stored = interactions
                .iter()
                .enumerate()
                .map(|(row, interaction)| {
                    Ok(Interaction {
                        source: stored_id(row, "source", interaction.source)?,
                        target: stored_id(row, "target", interaction.target)?,
                        confidence: interaction.confidence,
                    })
                })
                .collect::<Result<Vec<_>, KiraError>>()?;
            let interactions = insert_interactions_in(txn, &stored)?;

            Ok(CommitCounts {
                proteins: ids.len(),
                interactions,
            })
        })
    }

    fn count_proteins(&self) -> Result<usize, KiraError> {
        self.count(PROTEINS)
    }

    fn count_interactions(&self) -> Result<usize, KiraError> {
        self.count(INTERACTIONS)
    }

    fn proteins(&self) -> Result<BTreeMap<ProteinRef, Protein>, KiraError> {
        let read_txn = self.db.begin_read().map_err(KiraError::storage)?;
        let table = read_txn.open_table(PROTEINS).map_err(KiraError::storage)?;
        let mut proteins = BTreeMap::new();
        for entry in table.iter().map_err(KiraError::storage)? {
            let (key, value) = entry.map_err(KiraError::storage)?;
            let protein: Protein = postcard::from_bytes(value.value())
                .map_err(|err| KiraError::Serialization(err.to_string()))?;
            proteins.insert(ProteinRef(key.value()), protein);
        }
        Ok(proteins)
    }

    fn interactions(&self) -> Result<Vec<Interaction>, KiraError> {
        let read_txn = self.db.begin_read().map_err(KiraError::storage)?;
        let table = read_txn
            .open_table(INTERACTIONS)
            .map_err(KiraError::storage)?;
        let mut interactions = Vec::new();
        for entry in table.iter().map_err(KiraError::storage)? {
            let (_, value) = entry.map_err(KiraError::storage)?;
            let interaction: Interaction = postcard::from_bytes(value.value())
                .map_err(|err| KiraError::Serialization(err.to_string()))?;
            interactions.push(interaction);
        }
        Ok(interactions)
    }

    fn reset(&mut self) -> Result<(), KiraError> {
        self.in_transaction(clear_tables)
    }
}

/// Drops and recreates every table inside `txn`.
fn clear_tables(txn: &WriteTransaction) -> Result<(), KiraError> {
    txn.delete_table(INTERACTIONS).map_err(KiraError::storage)?;
    txn.delete_table(PROTEINS).map_err(KiraError::storage)?;
    txn.delete_table(ENTREZ_INDEX).map_err(KiraError::storage)?;
    txn.delete_table(METADATA).map_err(KiraError::storage)?;
    open_all(txn)
}

fn open_all(txn: &WriteTransaction) -> Result<(), KiraError> {
    txn.open_table(PROTEINS).map_err(KiraError::storage)?;
    txn.open_table(INTERACTIONS).map_err(KiraError::storage)?;
    txn.open_table(ENTREZ_INDEX).map_err(KiraError::storage)?;
    txn.open_table(METADATA).map_err(KiraError::storage)?;
    Ok(())
}

fn insert_proteins_in(
    txn: &WriteTransaction,
    proteins: &[Protein],
) -> Result<Vec<ProteinRef>, KiraError> {
    let mut protein_table = txn.open_table(PROTEINS).map_err(KiraError::storage)?;
    let mut entrez_table = txn.open_table(ENTREZ_INDEX).map_err(KiraError::storage)?;
    let mut meta_table = txn.open_table(METADATA).map_err(KiraError::storage)?;

    let mut next_id = meta_table
        .get(NEXT_PROTEIN_ID)
        .map_err(KiraError::storage)?
        .map(|v| v.value())
        .unwrap_or(0);
    let mut ids = Vec::with_capacity(proteins.len());
    for protein in proteins {
        let existing = entrez_table
            .get(protein.entrez_id.as_str())
            .map_err(KiraError::storage)?
            .is_some();
        if existing {
            return Err(KiraError::DuplicateEntrez(protein.entrez_id.clone()));
        }
        let bytes = postcard::to_allocvec(protein)
            .map_err(|err| KiraError::Serialization(err.to_string()))?;
        protein_table
            .insert(next_id, bytes.as_slice())
            .map_err(KiraError::storage)?;
        entrez_table
            .insert(protein.entrez_id.as_str(), next_id)
            .map_err(KiraError::storage)?;
        ids.push(ProteinRef(next_id));
        next_id += 1;
    }
    meta_table
        .insert(NEXT_PROTEIN_ID, next_id)
        .map_err(KiraError::storage)?;
    Ok(ids)
}

fn insert_interactions_in(
    txn: &WriteTransaction,
    interactions: &[Interaction],
) -> Result<usize, KiraError> {
    let protein_table = txn.open_table(PROTEINS).map_err(KiraError::storage)?;
    let mut interaction_table = txn.open_table(INTERACTIONS).map_err(KiraError::storage)?;
    let mut meta_table = txn.open_table(METADATA).map_err(KiraError::storage)?;

    let mut next_id = meta_table
        .get(NEXT_INTERACTION_ID)
        .map_err(KiraError::storage)?
        .map(|v| v.value())
        .unwrap_or(0);
    for (row, interaction) in interactions.iter().enumerate() {
        for (role, endpoint) in [("source", interaction.source), ("target", interaction.target)] {
            let stored = protein_table
                .get(endpoint.0)
                .map_err(KiraError::storage)?
                .is_some();
            if !stored {
                return Err(KiraError::UnresolvedEndpoint {
                    row,
                    role,
                    identifier: endpoint.to_string(),
                    accession: None,
                });
            }
        }
        let bytes = postcard::to_allocvec(interaction)
            .map_err(|err| KiraError::Serialization(err.to_string()))?;
        interaction_table
            .insert(next_id, bytes.as_slice())
            .map_err(KiraError::storage)?;
        next_id += 1;
    }
    meta_table
        .insert(NEXT_INTERACTION_ID, next_id)
        .map_err(KiraError::storage)?;
    Ok(interactions.len())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn protein(entrez: &str) -> Protein {
        Protein {
            uniprot_id: Some(format!("P{entrez}")),
            uniprot_entry_name: None,
            entrez_id: entrez.to_string(),
            taxonomy_id: None,
            symbol: None,
            hgnc_id: None,
        }
    }

    #[test]
    fn rejected_batch_leaves_no_rows() {
        let temp = tempfile::tempdir().unwrap();
        let mut store = RedbStore::open(temp.path().join("ppi.redb")).unwrap();

        let err = store
            .insert_proteins(&[protein("1"), protein("2"), protein("1")])
            .unwrap_err();
        assert_matches!(err, KiraError::DuplicateEntrez(ref id) if id == "1");
        assert_eq!(store.count_proteins().unwrap(), 0);

        let ids = store.insert_proteins(&[protein("1"), protein("2")]).unwrap();
        assert_eq!(ids, vec![ProteinRef(0), ProteinRef(1)]);
    }

    #[test]
    fn interactions_need_stored_endpoints() {
        let temp = tempfile::tempdir().unwrap();
        let mut store = RedbStore::open(temp.path().join("ppi.redb")).unwrap();
        let ids = store.insert_proteins(&[protein("1")]).unwrap();

        let dangling = Interaction {
            source: ids[0],
            target: ProteinRef(42),
            confidence: 0.3,
        };
        let err = store.insert_interactions(&[dangling]).unwrap_err();
        assert_matches!(err, KiraError::UnresolvedEndpoint { role: "target", .. });
        assert_eq!(store.count_interactions().unwrap(), 0);
    }

    #[test]
    fn reset_drops_rows_and_sequences() {
        let temp = tempfile::tempdir().unwrap();
        let mut store = RedbStore::open(temp.path().join("ppi.redb")).unwrap();
        let ids = store.insert_proteins(&[protein("1")]).unwrap();
        store
            .insert_interactions(&[Interaction {
                source: ids[0],
                target: ids[0],
                confidence: 1.0,
            }])
            .unwrap();

        store.reset().unwrap();
        assert_eq!(store.count_proteins().unwrap(), 0);
        assert_eq!(store.count_interactions().unwrap(), 0);
        assert_eq!(store.insert_proteins(&[protein("1")]).unwrap(), vec![ProteinRef(0)]);
    }

    #[test]
    fn failed_population_keeps_previous_rows() {
        let temp = tempfile::tempdir().unwrap();
        let mut store = RedbStore::open(temp.path().join("ppi.redb")).unwrap();
        let link = |source, target| Interaction {
            source: ProteinRef(source),
            target: ProteinRef(target),
            confidence: 0.5,
        };
        let counts = store
            .commit_population(&[protein("1"), protein("2")], &[link(0, 1)], false)
            .unwrap();
        assert_eq!(counts, CommitCounts { proteins: 2, interactions: 1 });

        let err = store
            .commit_population(&[protein("3")], &[link(0, 1)], false)
            .unwrap_err();
        assert_matches!(err, KiraError::AlreadyPopulated);

        let err = store
            .commit_population(&[protein("3")], &[link(0, 7)], true)
            .unwrap_err();
        assert_matches!(err, KiraError::UnresolvedEndpoint { row: 0, role: "target", .. });
        assert_eq!(store.count_proteins().unwrap(), 2);
        assert_eq!(store.count_interactions().unwrap(), 1);

        let counts = store
            .commit_population(&[protein("3")], &[link(0, 0)], true)
            .unwrap();
        assert_eq!(counts, CommitCounts { proteins: 1, interactions: 1 });
        let proteins = store.proteins().unwrap();
        assert_eq!(proteins[&ProteinRef(0)].entrez_id, "3");
    }
}
