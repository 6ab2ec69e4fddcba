use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use serde::Deserialize;

use crate::domain::{RawInteractionRow, UniprotMappingRow};
use crate::error::KiraError;

const HIPPIE: &str = "HIPPIE";
const UNIPROT: &str = "UniProt mapping";

/// Opens a local table, transparently decompressing `.gz` files.
pub fn open_table(path: &Path) -> Result<Box<dyn Read>, KiraError> {
    let file = File::open(path)
        .map_err(|err| KiraError::Filesystem(format!("open {}: {err}", path.display())))?;
    let reader = BufReader::new(file);
    let is_gzip = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);
    if is_gzip {
        Ok(Box::new(MultiGzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Parses the headerless six-column HIPPIE file.
///
/// Entrez ids are kept as strings. The metadata column may be missing on
/// truncated lines; every other column is required.
pub fn parse_interactions<R: Read>(reader: R) -> Result<Vec<RawInteractionRow>, KiraError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|err| malformed(HIPPIE, err.position(), err.to_string()))?;
        let line = record.position().map(|pos| pos.line()).unwrap_or(0);
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        if record.len() < 5 {
            return Err(KiraError::MalformedRow {
                source_name: HIPPIE,
                line,
                message: format!("expected 6 columns, found {}", record.len()),
            });
        }

        let field = |idx: usize| record.get(idx).unwrap_or("").trim().to_string();
        let source_entrez_id = field(1);
        let target_entrez_id = field(3);
        if source_entrez_id.is_empty() || target_entrez_id.is_empty() {
            return Err(KiraError::MalformedRow {
                source_name: HIPPIE,
                line,
                message: "missing entrez id".to_string(),
            });
        }
        let confidence_raw = field(4);
        let confidence = confidence_raw
            .parse::<f64>()
            .map_err(|err| KiraError::MalformedRow {
                source_name: HIPPIE,
                line,
                message: format!("invalid confidence {confidence_raw:?}: {err}"),
            })?;

        rows.push(RawInteractionRow {
            source_entry_name: field(0),
            source_entrez_id,
            target_entry_name: field(2),
            target_entrez_id,
            confidence,
            metadata: field(5),
        });
    }
    Ok(rows)
}

/// Parses either the slim mapping table (recognised by its header) or the
/// headerless `idmapping_selected.tab` export published by UniProt.
pub fn parse_uniprot_table<R: Read>(mut reader: R) -> Result<Vec<UniprotMappingRow>, KiraError> {
    // Short reads are common behind a gzip decoder, so read the whole prefix.
    let mut prefix = Vec::with_capacity(SLIM_HEADER.len());
    (&mut reader)
        .take(SLIM_HEADER.len() as u64)
        .read_to_end(&mut prefix)
        .map_err(KiraError::filesystem)?;
    let is_slim = prefix == SLIM_HEADER.as_bytes();
    let reader = Cursor::new(prefix).chain(reader);
    if is_slim {
        parse_uniprot_mappings(reader)
    } else {
        parse_uniprot_selected(reader)
    }
}

const SLIM_HEADER: &str = "UniProtKB-ID";

/// Column positions in `idmapping_selected.tab`.
const SELECTED_AC: usize = 0;
const SELECTED_ID: usize = 1;
const SELECTED_TAXON: usize = 12;

/// Parses UniProt's `idmapping_selected.tab`. That file labels accession and
/// entry name correctly, so no swap applies.
pub fn parse_uniprot_selected<R: Read>(reader: R) -> Result<Vec<UniprotMappingRow>, KiraError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record.map_err(|err| malformed(UNIPROT, err.position(), err.to_string()))?;
        let (Some(accession), Some(entry_name), Some(taxon)) = (
            record.get(SELECTED_AC),
            record.get(SELECTED_ID),
            record.get(SELECTED_TAXON),
        ) else {
            return Err(malformed(
                UNIPROT,
                record.position(),
                format!("expected at least {} columns", SELECTED_TAXON + 1),
            ));
        };
        rows.push(UniprotMappingRow {
            entry_name: entry_name.trim().to_string(),
            accession: accession.trim().to_string(),
            taxonomy_id: taxon.trim().to_string(),
        });
    }
    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct SlimMappingRecord {
    #[serde(rename = "UniProtKB-ID")]
    uniprotkb_id: String,
    #[serde(rename = "UniProtKB-AC")]
    uniprotkb_ac: String,
    #[serde(rename = "NCBI-Taxon")]
    ncbi_taxon: String,
}

/// Parses the UniProt slim mapping table.
///
/// Upstream labels the columns the wrong way round: `UniProtKB-ID` holds the
/// accession and `UniProtKB-AC` holds the entry name. The swap is undone here
/// and nowhere else.
pub fn parse_uniprot_mappings<R: Read>(reader: R) -> Result<Vec<UniprotMappingRow>, KiraError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.deserialize::<SlimMappingRecord>() {
        let record = record.map_err(|err| malformed(UNIPROT, err.position(), err.to_string()))?;
        rows.push(UniprotMappingRow {
            entry_name: record.uniprotkb_ac.trim().to_string(),
            accession: record.uniprotkb_id.trim().to_string(),
            taxonomy_id: record.ncbi_taxon.trim().to_string(),
        });
    }
    Ok(rows)
}

fn malformed(source_name: &'static str, position: Option<&csv::Position>, message: String) -> KiraError {
    KiraError::MalformedRow {
        source_name,
        line: position.map(|pos| pos.line()).unwrap_or(0),
        message,
    }
}
