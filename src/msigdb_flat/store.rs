use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::*;
use crate::db::raw::DbInfo;
use crate::error::{FlatResult, FlatTableError};
use crate::flat::FlatTables;
use crate::flat::data::{FlatGeneSetDetail, FlatGeneSetMember, GeneSetRow,
                        read_tsv_gz, write_tsv_gz};
use crate::types::*;

pub fn details_file_name(species: Species) -> String {
    format!("{}_{}", species.code().to_lowercase(), DETAILS_FILE_SUFFIX)
}

pub fn members_file_name(species: Species) -> String {
    format!("{}_{}", species.code().to_lowercase(), MEMBERS_FILE_SUFFIX)
}

pub fn build_info_file_name(species: Species) -> String {
    format!("{}_{}", species.code().to_lowercase(), BUILD_INFO_FILE_SUFFIX)
}

// summary of one build, written next to the table artefacts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildInfo {
    pub db_version: VersionName,
    pub db_build_date: Option<NaiveDate>,
    pub target_species: Species,
    pub detail_count: usize,
    pub member_count: usize,
    pub generated_at: DateTime<Utc>,
}

// write the detail and membership tables and the JSON build summary of
// one species into output_dir, return the summary
pub fn write_flat_tables(output_dir: &Path, tables: &FlatTables,
                         db_info: &DbInfo) -> FlatResult<BuildInfo>
{
    fs::create_dir_all(output_dir)?;

    let species = tables.species;

    let details_path = output_dir.join(details_file_name(species));
    write_tsv_gz(&details_path, &tables.details)?;
    info!("wrote {} detail rows to {}", tables.details.len(),
          details_path.display());

    let members_path = output_dir.join(members_file_name(species));
    write_tsv_gz(&members_path, &tables.members)?;
    info!("wrote {} membership rows to {}", tables.members.len(),
          members_path.display());

    let build_info = BuildInfo {
        db_version: db_info.version_name.clone(),
        db_build_date: db_info.build_date,
        target_species: species,
        detail_count: tables.details.len(),
        member_count: tables.members.len(),
        generated_at: Utc::now(),
    };

    let build_info_path = output_dir.join(build_info_file_name(species));
    let writer = BufWriter::new(File::create(&build_info_path)?);
    serde_json::to_writer_pretty(writer, &build_info)?;

    Ok(build_info)
}

pub fn read_build_info(output_dir: &Path, species: Species)
                       -> FlatResult<BuildInfo>
{
    let path = output_dir.join(build_info_file_name(species));
    let reader = BufReader::new(File::open(&path)?);
    let build_info = serde_json::from_reader(reader)?;
    Ok(build_info)
}

struct SpeciesTables {
    details: Vec<FlatGeneSetDetail>,
    members: Vec<FlatGeneSetMember>,
}

impl SpeciesTables {
    fn load(output_dir: &Path, species: Species) -> FlatResult<SpeciesTables> {
        let details =
            read_tsv_gz(&output_dir.join(details_file_name(species)))?;
        let members =
            read_tsv_gz(&output_dir.join(members_file_name(species)))?;
        Ok(SpeciesTables { details, members })
    }
}

// the flattened tables of the species found in one output directory
pub struct FlatTableStore {
    tables: BTreeMap<Species, SpeciesTables>,
}

impl FlatTableStore {
    // read back every species whose detail table exists in output_dir
    pub fn load(output_dir: &Path) -> FlatResult<FlatTableStore> {
        let mut tables = BTreeMap::new();

        for species in [Species::HS, Species::MM] {
            if !output_dir.join(details_file_name(species)).exists() {
                continue;
            }
            tables.insert(species, SpeciesTables::load(output_dir, species)?);
        }

        if tables.is_empty() {
            return Err(FlatTableError::InvalidArgument(
                format!("no flattened tables found in {}",
                        output_dir.display())));
        }

        Ok(FlatTableStore { tables })
    }

    // a store over freshly built tables, without a disk round trip
    pub fn from_tables(all_tables: Vec<FlatTables>) -> FlatTableStore {
        let mut tables = BTreeMap::new();

        for flat_tables in all_tables {
            let FlatTables { species, details, members } = flat_tables;
            tables.insert(species, SpeciesTables { details, members });
        }

        FlatTableStore { tables }
    }

    pub fn species(&self) -> Vec<Species> {
        self.tables.keys().copied().collect()
    }

    // the wide join of the membership table with the detail table, one
    // row per membership row, sorted by gene set ID then gene symbol
    pub fn gene_sets(&self, species_code: &str) -> FlatResult<Vec<GeneSetRow>> {
        let species = Species::from_code(species_code)?;

        let Some(tables) = self.tables.get(&species)
        else {
            return Err(FlatTableError::InvalidArgument(
                format!("no flattened tables loaded for species {}", species)));
        };

        let details_map: HashMap<&GeneSetId, &FlatGeneSetDetail> =
            tables.details.iter()
            .map(|detail| (&detail.gs_id, detail))
            .collect();

        let mut rows = Vec::with_capacity(tables.members.len());

        for member in &tables.members {
            let Some(detail) = details_map.get(&member.gs_id)
            else {
                return Err(FlatTableError::Consistency(
                    format!("membership row for gene set \"{}\" without a \
                             detail row", member.gs_id)));
            };

            rows.push(GeneSetRow {
                gs_id: detail.gs_id.clone(),
                gs_name: detail.gs_name.clone(),
                gs_collection: detail.gs_collection.clone(),
                gs_subcollection: detail.gs_subcollection.clone(),
                gs_collection_name: detail.gs_collection_name.clone(),
                gs_description: detail.gs_description.clone(),
                gs_source_species: detail.gs_source_species.clone(),
                gs_pmid: detail.gs_pmid.clone(),
                gs_geoid: detail.gs_geoid.clone(),
                gs_url: detail.gs_url.clone(),
                db_version: detail.db_version.clone(),
                db_target_species: detail.db_target_species.clone(),
                source_gene: member.source_gene.clone(),
                source_species: member.source_species.clone(),
                gene_symbol: member.gene_symbol.clone(),
                ncbi_gene_id: member.ncbi_gene_id.clone(),
                ensembl_gene_id: member.ensembl_gene_id.clone(),
            });
        }

        rows.sort_by(|a, b| {
            (&a.gs_id, &a.gene_symbol, &a.ensembl_gene_id, &a.source_gene)
                .cmp(&(&b.gs_id, &b.gene_symbol, &b.ensembl_gene_id,
                       &b.source_gene))
        });

        Ok(rows)
    }
}
