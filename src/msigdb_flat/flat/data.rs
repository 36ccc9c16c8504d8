use std::cmp::Ordering;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flexstr::SharedStr as FlexStr;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::error::FlatResult;
use crate::types::*;

// one row of the flattened gene set detail table, one per gene set.
// field names are the column names, so the serialized header follows the
// struct definition.  missing values are empty strings, never "NA"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatGeneSetDetail {
    pub gs_id: GeneSetId,
    pub gs_name: GeneSetStandardName,
    pub gs_collection: CollectionName,
    pub gs_subcollection: CollectionName,
    pub gs_collection_name: CollectionFullName,
    pub gs_description: FlexStr,
    pub gs_source_species: SpeciesCode,
    pub gs_pmid: PmId,
    pub gs_geoid: GeoId,
    pub gs_url: FlexStr,
    pub db_version: VersionName,
    pub db_target_species: SpeciesCode,
}

impl FlatGeneSetDetail {
    pub const COLUMNS: [&'static str; 12] =
        ["gs_id", "gs_name", "gs_collection", "gs_subcollection",
         "gs_collection_name", "gs_description", "gs_source_species",
         "gs_pmid", "gs_geoid", "gs_url", "db_version", "db_target_species"];
}

// rows sort by (name, ID) first, the remaining fields only pin a total
// order for deduplication
impl Ord for FlatGeneSetDetail {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.gs_name, &self.gs_id, &self.gs_collection, &self.gs_subcollection,
         &self.gs_collection_name, &self.gs_description, &self.gs_source_species,
         &self.gs_pmid, &self.gs_geoid, &self.gs_url, &self.db_version,
         &self.db_target_species)
            .cmp(&(&other.gs_name, &other.gs_id, &other.gs_collection,
                   &other.gs_subcollection, &other.gs_collection_name,
                   &other.gs_description, &other.gs_source_species,
                   &other.gs_pmid, &other.gs_geoid, &other.gs_url,
                   &other.db_version, &other.db_target_species))
    }
}

impl PartialOrd for FlatGeneSetDetail {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// one row of the flattened gene set membership table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatGeneSetMember {
    pub gs_id: GeneSetId,
    pub source_gene: SourceGene,
    pub source_species: SpeciesCode,
    pub gene_symbol: SymbolName,
    pub ncbi_gene_id: NcbiGeneId,
    pub ensembl_gene_id: EnsemblGeneId,
}

impl FlatGeneSetMember {
    pub const COLUMNS: [&'static str; 6] =
        ["gs_id", "source_gene", "source_species", "gene_symbol",
         "ncbi_gene_id", "ensembl_gene_id"];
}

impl Ord for FlatGeneSetMember {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.gene_symbol, &self.ensembl_gene_id, &self.source_gene,
         &self.gs_id, &self.ncbi_gene_id, &self.source_species)
            .cmp(&(&other.gene_symbol, &other.ensembl_gene_id,
                   &other.source_gene, &other.gs_id, &other.ncbi_gene_id,
                   &other.source_species))
    }
}

impl PartialOrd for FlatGeneSetMember {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// one row of the raw membership join, before any identifier mapping
#[derive(Debug, Clone)]
pub struct MemberRow {
    pub gs_id: GeneSetId,
    pub collection_name: CollectionName,
    pub source_gene: SourceGene,
    pub source_species: SpeciesCode,
    pub symbol: Option<SymbolName>,
    pub ncbi_gene_id: Option<i64>,
}

// a membership row with its canonical symbol and NCBI gene ID attached,
// before Ensembl gene IDs are attached
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MappedMember {
    pub gs_id: GeneSetId,
    pub source_gene: SourceGene,
    pub source_species: SpeciesCode,
    pub gene_symbol: SymbolName,
    pub ncbi_gene_id: NcbiGeneId,
}

// one row of the joined gene set table returned by the store, the detail
// columns repeated for every member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneSetRow {
    pub gs_id: GeneSetId,
    pub gs_name: GeneSetStandardName,
    pub gs_collection: CollectionName,
    pub gs_subcollection: CollectionName,
    pub gs_collection_name: CollectionFullName,
    pub gs_description: FlexStr,
    pub gs_source_species: SpeciesCode,
    pub gs_pmid: PmId,
    pub gs_geoid: GeoId,
    pub gs_url: FlexStr,
    pub db_version: VersionName,
    pub db_target_species: SpeciesCode,
    pub source_gene: SourceGene,
    pub source_species: SpeciesCode,
    pub gene_symbol: SymbolName,
    pub ncbi_gene_id: NcbiGeneId,
    pub ensembl_gene_id: EnsemblGeneId,
}

pub fn write_tsv_gz<T: Serialize>(path: &Path, rows: &[T]) -> FlatResult<()> {
    let file = File::create(path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(encoder);

    for row in rows {
        writer.serialize(row)?;
    }

    let encoder = writer.into_inner().map_err(|err| err.into_error())?;
    encoder.finish()?;

    Ok(())
}

pub fn read_tsv_gz<T: DeserializeOwned>(path: &Path) -> FlatResult<Vec<T>> {
    let file = File::open(path)?;
    let decoder = GzDecoder::new(BufReader::new(file));
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b'\t')
        .from_reader(decoder);

    let mut rows = vec![];

    for result in csv_reader.deserialize() {
        rows.push(result?);
    }

    Ok(rows)
}
