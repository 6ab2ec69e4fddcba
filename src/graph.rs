//! BEL graph export of stored interactions.
//!
//! Each interaction becomes one `complex(...)` abundance of its two proteins,
//! labelled in the requested namespace. Interactions whose endpoints have no
//! identifier in that namespace are skipped and counted, never reported as
//! errors. Parallel complexes are kept.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use serde::Serialize;
use tracing::info;

use crate::domain::{Interaction, Namespace, Protein, ProteinRef};
use crate::error::KiraError;
use crate::registry::ProteinRegistry;

pub const GRAPH_NAME: &str = "HIPPIE";
pub const GRAPH_VERSION: &str = "2.1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProteinNode {
    pub namespace: Namespace,
    pub identifier: String,
    pub name: Option<String>,
}

impl ProteinNode {
    pub fn to_bel(&self) -> String {
        let mut out = format!("p({}:{}", self.namespace, quote(&self.identifier));
        if let Some(name) = &self.name {
            let _ = write!(out, " ! {}", quote(name));
        }
        out.push(')');
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComplexAbundance {
    pub members: [ProteinNode; 2],
}

impl ComplexAbundance {
    pub fn to_bel(&self) -> String {
        format!(
            "complex({}, {})",
            self.members[0].to_bel(),
            self.members[1].to_bel()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BelGraph {
    pub name: String,
    pub version: String,
    pub namespace: Namespace,
    pub complexes: Vec<ComplexAbundance>,
}

impl BelGraph {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            name: GRAPH_NAME.to_string(),
            version: GRAPH_VERSION.to_string(),
            namespace,
            complexes: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.complexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.complexes.is_empty()
    }

    pub fn add_complex(&mut self, source: ProteinNode, target: ProteinNode) {
        self.complexes.push(ComplexAbundance {
            members: [source, target],
        });
    }

    /// Renders the graph as a BEL script, one complex per line.
    pub fn to_bel_script(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "SET DOCUMENT Name = {}", quote_always(&self.name));
        let _ = writeln!(out, "SET DOCUMENT Version = {}", quote_always(&self.version));
        out.push('\n');
        for complex in &self.complexes {
            out.push_str(&complex.to_bel());
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportResult {
    pub graph: BelGraph,
    pub exported: usize,
    pub skipped: usize,
}

/// Protein lookup by row id.
pub trait ProteinLookup {
    fn protein(&self, id: ProteinRef) -> Option<&Protein>;
}

impl ProteinLookup for ProteinRegistry {
    fn protein(&self, id: ProteinRef) -> Option<&Protein> {
        self.get(id)
    }
}

impl ProteinLookup for HashMap<ProteinRef, Protein> {
    fn protein(&self, id: ProteinRef) -> Option<&Protein> {
        self.get(&id)
    }
}

impl ProteinLookup for BTreeMap<ProteinRef, Protein> {
    fn protein(&self, id: ProteinRef) -> Option<&Protein> {
        self.get(&id)
    }
}

pub fn protein_node(protein: &Protein, namespace: Namespace) -> Option<ProteinNode> {
    match namespace {
        Namespace::Uniprot => uniprot_node(protein),
        Namespace::Ncbigene => Some(ncbigene_node(protein)),
        Namespace::Hgnc => hgnc_node(protein),
    }
}

fn uniprot_node(protein: &Protein) -> Option<ProteinNode> {
    let accession = protein.uniprot_id.as_ref()?;
    Some(ProteinNode {
        namespace: Namespace::Uniprot,
        identifier: accession.clone(),
        name: protein.uniprot_entry_name.clone(),
    })
}

fn ncbigene_node(protein: &Protein) -> ProteinNode {
    ProteinNode {
        namespace: Namespace::Ncbigene,
        identifier: protein.entrez_id.clone(),
        name: protein.symbol.clone(),
    }
}

fn hgnc_node(protein: &Protein) -> Option<ProteinNode> {
    let hgnc_id = protein.hgnc_id.as_ref()?;
    Some(ProteinNode {
        namespace: Namespace::Hgnc,
        identifier: hgnc_id.clone(),
        name: protein.symbol.clone(),
    })
}

/// Exports every interaction whose endpoints both resolve in `namespace`.
///
/// A reference to a protein missing from `proteins` is an integrity error.
pub fn export(
    interactions: &[Interaction],
    proteins: &dyn ProteinLookup,
    namespace: Namespace,
) -> Result<ExportResult, KiraError> {
    let mut graph = BelGraph::new(namespace);
    let mut skipped = 0usize;

    for (row, interaction) in interactions.iter().enumerate() {
        let source = lookup(proteins, row, "source", interaction.source)?;
        let target = lookup(proteins, row, "target", interaction.target)?;
        match (
            protein_node(source, namespace),
            protein_node(target, namespace),
        ) {
            (Some(source), Some(target)) => graph.add_complex(source, target),
            _ => skipped += 1,
        }
    }

    let exported = graph.len();
    info!(%namespace, exported, skipped, "exported interactions to BEL");
    Ok(ExportResult {
        graph,
        exported,
        skipped,
    })
}

fn lookup<'a>(
    proteins: &'a dyn ProteinLookup,
    row: usize,
    role: &'static str,
    id: ProteinRef,
) -> Result<&'a Protein, KiraError> {
    proteins
        .protein(id)
        .ok_or_else(|| KiraError::UnresolvedEndpoint {
            row,
            role,
            identifier: id.to_string(),
            accession: None,
        })
}

fn quote(value: &str) -> String {
    let bare = !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if bare {
        value.to_string()
    } else {
        quote_always(value)
    }
}

fn quote_always(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn protein(entrez: &str, accession: Option<&str>, hgnc: Option<&str>) -> Protein {
        Protein {
            uniprot_id: accession.map(str::to_string),
            uniprot_entry_name: Some(format!("E{entrez}_HUMAN")),
            entrez_id: entrez.to_string(),
            taxonomy_id: Some("9606".to_string()),
            symbol: hgnc.map(|_| format!("SYM{entrez}")),
            hgnc_id: hgnc.map(str::to_string),
        }
    }

    #[test]
    fn bel_rendering_quotes_colons() {
        let node = hgnc_node(&protein("7157", None, Some("HGNC:11998"))).unwrap();
        assert_eq!(node.to_bel(), "p(hgnc:\"HGNC:11998\" ! SYM7157)");

        let node = ncbigene_node(&protein("7157", None, None));
        assert_eq!(node.to_bel(), "p(ncbigene:7157)");
    }

    #[test]
    fn missing_protein_reference_is_fatal() {
        let proteins: HashMap<ProteinRef, Protein> = HashMap::new();
        let interactions = [Interaction {
            source: ProteinRef(0),
            target: ProteinRef(1),
            confidence: 0.5,
        }];
        assert!(export(&interactions, &proteins, Namespace::Ncbigene).is_err());
    }

    #[test]
    fn script_has_document_header() {
        let mut graph = BelGraph::new(Namespace::Uniprot);
        graph.add_complex(
            uniprot_node(&protein("1", Some("P1"), None)).unwrap(),
            uniprot_node(&protein("2", Some("P2"), None)).unwrap(),
        );
        let script = graph.to_bel_script();
        assert!(script.starts_with("SET DOCUMENT Name = \"HIPPIE\"\n"));
        assert!(script.contains("complex(p(uniprot:P1 ! E1_HUMAN), p(uniprot:P2 ! E2_HUMAN))"));
    }
}
