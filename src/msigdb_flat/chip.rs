use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use flexstr::ToSharedStr;
use serde::Deserialize;

use crate::error::{FlatResult, FlatTableError};
use crate::types::{EnsemblGeneId, SymbolName};

// a chip file is a tab separated table mapping probe IDs to gene symbols.
// in the Ensembl gene ID chips the probe column holds Ensembl gene IDs, so
// each row is a candidate symbol to Ensembl mapping
pub const CHIP_COLUMNS: [&str; 3] = ["Probe Set ID", "Gene Symbol", "Gene Title"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipEntry {
    pub probe_id: EnsemblGeneId,
    pub gene_symbol: SymbolName,
}

// column names come from the GSEA chip file format, the title column is
// checked but not kept
#[derive(Debug, Deserialize)]
struct ChipRecord {
    #[serde(rename = "Probe Set ID")]
    probe_id: String,
    #[serde(rename = "Gene Symbol")]
    gene_symbol: String,
}

pub fn parse_chip(file_name: &Path) -> FlatResult<Vec<ChipEntry>> {
    let file = File::open(file_name)?;
    let reader = BufReader::new(file);

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .quoting(false)
        .from_reader(reader);

    let header_fields: Vec<_> = csv_reader.headers()?.iter()
        .map(|field| field.to_owned())
        .collect();

    if header_fields != CHIP_COLUMNS {
        return Err(FlatTableError::SourceDataShape(
            format!("unexpected columns in chip file {}: expected {:?}, found {:?}",
                    file_name.display(), CHIP_COLUMNS, header_fields)));
    }

    let mut entries = vec![];

    for result in csv_reader.deserialize() {
        let record: ChipRecord = result?;
        entries.push(ChipEntry {
            probe_id: record.probe_id.to_shared_str(),
            gene_symbol: record.gene_symbol.to_shared_str(),
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    fn write_chip_file(header: &str, row_count: usize) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", header).unwrap();
        for i in 0..row_count {
            writeln!(file, "ENSG{}\tSYMBOL{}\ttitle of gene {}", i, i, i).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_chip() {
        let file = write_chip_file("Probe Set ID\tGene Symbol\tGene Title", 3);
        let entries = parse_chip(file.path()).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].probe_id, "ENSG0");
        assert_eq!(entries[0].gene_symbol, "SYMBOL0");
    }

    #[test]
    fn test_chip_wrong_columns() {
        let file = write_chip_file("Probe Set ID\tSymbol\tGene Title", 3);
        let result = parse_chip(file.path());
        assert!(matches!(result, Err(FlatTableError::SourceDataShape(_))));
    }
}
