use tracing::info;

use crate::domain::{EnrichedRow, IdentifierBundle, Interaction, ProteinRef};
use crate::error::KiraError;
use crate::registry::ProteinRegistry;

/// One interaction per row, endpoints pointing into `registry`.
///
/// Confidence is copied as given, including values outside `[0, 1]`.
pub fn materialize(
    rows: &[EnrichedRow],
    registry: &ProteinRegistry,
) -> Result<Vec<Interaction>, KiraError> {
    let interactions = rows
        .iter()
        .enumerate()
        .map(|(row, enriched)| {
            Ok(Interaction {
                source: resolve(registry, row, "source", &enriched.source)?,
                target: resolve(registry, row, "target", &enriched.target)?,
                confidence: enriched.confidence,
            })
        })
        .collect::<Result<Vec<_>, KiraError>>()?;
    info!(interactions = interactions.len(), "materialized interactions");
    Ok(interactions)
}

fn resolve(
    registry: &ProteinRegistry,
    row: usize,
    role: &'static str,
    bundle: &IdentifierBundle,
) -> Result<ProteinRef, KiraError> {
    registry
        .resolve(bundle)
        .ok_or_else(|| KiraError::UnresolvedEndpoint {
            row,
            role,
            identifier: bundle.entrez_id.clone(),
            accession: bundle.uniprot_accession.clone(),
        })
}
