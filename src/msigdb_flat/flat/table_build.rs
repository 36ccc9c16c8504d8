use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::rc::Rc;

use flexstr::SharedStr as FlexStr;
use tracing::info;

use crate::chip::ChipEntry;
use crate::constants::*;
use crate::db::raw::{Collection, GeneSetDetails, Raw};
use crate::error::{FlatResult, FlatTableError};
use crate::flat::checks;
use crate::flat::data::*;
use crate::flat::ensembl_map::{self, EnsemblGeneMap};
use crate::types::*;

// the flattened tables of one snapshot
#[derive(Debug)]
pub struct FlatTables {
    pub species: Species,
    pub details: Vec<FlatGeneSetDetail>,
    pub members: Vec<FlatGeneSetMember>,
}

// builds the flat detail and membership tables from one snapshot's raw
// rows and its chip file
pub struct FlatTableBuild<'a> {
    raw: &'a Raw,
    chip: &'a [ChipEntry],
}

// "C2:CP:REACTOME" splits at the first colon into ("C2", "CP:REACTOME"),
// a name with no colon has an empty subcollection
pub fn split_collection_name(collection_name: &CollectionName)
                             -> (CollectionName, CollectionName)
{
    match collection_name.split_once(':') {
        Some((collection, subcollection)) =>
            (collection.into(), subcollection.into()),
        None => (collection_name.clone(), CollectionName::default()),
    }
}

impl<'a> FlatTableBuild<'a> {
    pub fn new(raw: &'a Raw, chip: &'a [ChipEntry]) -> FlatTableBuild<'a> {
        FlatTableBuild { raw, chip }
    }

    pub fn build(&self) -> FlatResult<FlatTables> {
        let details = self.make_gene_set_details()?;
        let (members, _) = self.make_gene_set_members()?;

        Ok(FlatTables {
            species: self.raw.db_info.target_species,
            details,
            members,
        })
    }

    // one wide row per gene set: identifiers, split collection, linked
    // publication and URLs, plus the snapshot version columns
    pub fn make_gene_set_details(&self) -> FlatResult<Vec<FlatGeneSetDetail>> {
        let collection_map: HashMap<&CollectionName, &Rc<Collection>> =
            self.raw.collections.iter()
            .map(|collection| (&collection.collection_name, collection))
            .collect();

        let db_info = &self.raw.db_info;
        let mut rows: BTreeSet<FlatGeneSetDetail> = BTreeSet::new();

        for details in &self.raw.gene_set_details {
            let gene_set = &details.gene_set;
            let (collection, subcollection) =
                split_collection_name(&gene_set.collection_name);
            let collection_full_name = collection_map.get(&gene_set.collection_name)
                .map(|collection| collection.full_name.clone())
                .unwrap_or_default();
            let pmid = details.publication.as_ref()
                .and_then(|publication| publication.pmid.clone())
                .unwrap_or_default();

            rows.insert(FlatGeneSetDetail {
                gs_id: details.systematic_name.clone(),
                gs_name: gene_set.standard_name.clone(),
                gs_collection: collection,
                gs_subcollection: subcollection,
                gs_collection_name: collection_full_name,
                gs_description: details.description_brief.clone(),
                gs_source_species: details.source_species_code.clone(),
                gs_pmid: pmid,
                gs_geoid: details.geo_id.clone().unwrap_or_default(),
                gs_url: details.external_details_url.clone().unwrap_or_default(),
                db_version: db_info.version_name.clone(),
                db_target_species: db_info.target_species.code().into(),
            });
        }

        let rows: Vec<FlatGeneSetDetail> = rows.into_iter().collect();

        self.check_details(&rows)?;

        info!("built {} gene set detail rows", rows.len());

        Ok(rows)
    }

    fn check_details(&self, rows: &[FlatGeneSetDetail]) -> FlatResult<()> {
        checks::check_equal_counts("gene set detail rows",
                                   "flattened rows", rows.len(),
                                   "gene_set rows", self.raw.gene_sets.len())?;

        let detail_ids: BTreeSet<FlexStr> = self.raw.gene_set_details.iter()
            .map(|details| details.systematic_name.clone())
            .collect();
        let row_ids: BTreeSet<FlexStr> =
            rows.iter().map(|row| row.gs_id.clone()).collect();
        checks::check_same_set("gene set IDs in the flattened detail table",
                               &detail_ids, &row_ids)?;

        for row in rows {
            if row.gs_id.is_empty() || row.gs_name.is_empty() ||
                row.gs_collection.is_empty()
            {
                return Err(FlatTableError::Validation(
                    format!("gene set detail row with a missing identifier, \
                             name or collection: {:?}", row)));
            }
        }

        Ok(())
    }

    // the raw membership join: every (gene set, source member) link with
    // its gene set ID, collection, namespace species and linked symbol
    // row.  gene sets with no detail row drop out of the inner join
    pub fn collect_member_rows(&self) -> Vec<MemberRow> {
        let mut details_map: HashMap<&GeneSetStandardName, &Rc<GeneSetDetails>> =
            HashMap::new();
        for details in &self.raw.gene_set_details {
            details_map.insert(&details.gene_set.standard_name, details);
        }

        let mut rows = vec![];

        for link in &self.raw.gene_set_source_members {
            let Some(details) = details_map.get(&link.gene_set.standard_name)
            else {
                continue;
            };
            let source_member = &link.source_member;
            let (symbol, ncbi_gene_id) = match &source_member.gene_symbol {
                Some(gene_symbol) =>
                    (Some(gene_symbol.symbol.clone()), gene_symbol.ncbi_gene_id),
                None => (None, None),
            };

            rows.push(MemberRow {
                gs_id: details.systematic_name.clone(),
                collection_name: link.gene_set.collection_name.clone(),
                source_gene: source_member.source_id.clone(),
                source_species: source_member.namespace.species_code.clone(),
                symbol,
                ncbi_gene_id,
            });
        }

        rows
    }

    // attach canonical symbols and NCBI gene IDs, check the mapping
    // coverage and deduplicate to one row per distinct
    // (gene set, source gene, NCBI ID, symbol) combination.  source genes
    // without a canonical symbol or NCBI ID keep their rows, the missing
    // identifiers become empty strings
    pub fn make_mapped_members(&self, member_rows: &[MemberRow])
                               -> FlatResult<Vec<MappedMember>>
    {
        let is_mapped = |row: &&MemberRow| {
            row.symbol.is_some() && row.ncbi_gene_id.is_some()
        };

        let all_genes: HashSet<&SourceGene> =
            member_rows.iter().map(|row| &row.source_gene).collect();
        let mapped_genes: HashSet<&SourceGene> = member_rows.iter()
            .filter(is_mapped)
            .map(|row| &row.source_gene)
            .collect();
        checks::check_min_fraction("source genes with a canonical symbol and \
                                    NCBI gene ID",
                                   mapped_genes.len(), all_genes.len(),
                                   MIN_NCBI_SOURCE_GENE_FRACTION)?;

        let all_pairs: HashSet<(&GeneSetId, &SourceGene)> = member_rows.iter()
            .map(|row| (&row.gs_id, &row.source_gene))
            .collect();
        let mapped_pairs: HashSet<(&GeneSetId, &SourceGene)> = member_rows.iter()
            .filter(is_mapped)
            .map(|row| (&row.gs_id, &row.source_gene))
            .collect();
        checks::check_min_fraction("membership pairs with a canonical symbol and \
                                    NCBI gene ID",
                                   mapped_pairs.len(), all_pairs.len(),
                                   MIN_NCBI_MEMBER_ROW_FRACTION)?;

        // the same combination can arrive through several namespaces, the
        // first species code in order wins
        let mut dedup: BTreeMap<(GeneSetId, SourceGene, NcbiGeneId, SymbolName),
                                BTreeSet<SpeciesCode>> = BTreeMap::new();

        for row in member_rows {
            let symbol = row.symbol.clone().unwrap_or_default();
            let ncbi_gene_id = row.ncbi_gene_id
                .map(|id| FlexStr::from(id.to_string()))
                .unwrap_or_default();

            let key = (row.gs_id.clone(), row.source_gene.clone(),
                       ncbi_gene_id, symbol);
            dedup.entry(key).or_default().insert(row.source_species.clone());
        }

        let mapped = dedup.into_iter()
            .map(|((gs_id, source_gene, ncbi_gene_id, gene_symbol), species_codes)| {
                let source_species =
                    species_codes.first().cloned().unwrap_or_default();
                MappedMember {
                    gs_id,
                    source_gene,
                    source_species,
                    gene_symbol,
                    ncbi_gene_id,
                }
            })
            .collect();

        Ok(mapped)
    }

    // attach Ensembl gene IDs.  rows whose source gene (or symbol) already
    // is an Ensembl ID keep it directly, the rest join the resolved map by
    // symbol and fan out to one row per mapped ID.  unmapped symbols keep
    // their row with an empty Ensembl column
    pub fn attach_ensembl_ids(&self, mapped: &[MappedMember],
                              ensembl_map: &EnsemblGeneMap)
                              -> FlatResult<Vec<FlatGeneSetMember>>
    {
        let species = self.raw.db_info.target_species;

        let (direct_rows, symbol_rows): (Vec<&MappedMember>, Vec<&MappedMember>) =
            mapped.iter().partition(|row| {
                species.is_ensembl_gene_id(&row.source_gene) ||
                    species.is_ensembl_gene_id(&row.gene_symbol)
            });

        let direct_genes: BTreeSet<FlexStr> =
            direct_rows.iter().map(|row| row.source_gene.clone()).collect();
        let symbol_genes: BTreeSet<FlexStr> =
            symbol_rows.iter().map(|row| row.source_gene.clone()).collect();
        checks::check_disjoint("source genes split for Ensembl attachment",
                               &direct_genes, &symbol_genes)?;

        let mut rows: BTreeSet<FlatGeneSetMember> = BTreeSet::new();

        for row in direct_rows {
            let ensembl_gene_id =
                if species.is_ensembl_gene_id(&row.source_gene) {
                    row.source_gene.clone()
                } else {
                    row.gene_symbol.clone()
                };
            rows.insert(make_member(row, ensembl_gene_id));
        }

        for row in symbol_rows {
            let ids = ensembl_map.ids_for_symbol(&row.gene_symbol);
            if ids.is_empty() {
                rows.insert(make_member(row, FlexStr::default()));
            } else {
                for id in ids {
                    rows.insert(make_member(row, id.clone()));
                }
            }
        }

        Ok(rows.into_iter().collect())
    }

    // the full membership chain: join, map, resolve, attach, check
    pub fn make_gene_set_members(&self)
            -> FlatResult<(Vec<FlatGeneSetMember>, EnsemblGeneMap)>
    {
        let species = self.raw.db_info.target_species;
        let member_rows = self.collect_member_rows();

        info!("collected {} raw membership rows", member_rows.len());

        let mapped = self.make_mapped_members(&member_rows)?;

        let canonical_symbols: HashSet<SymbolName> = self.raw.gene_symbols.iter()
            .map(|gene_symbol| gene_symbol.symbol.clone())
            .collect();

        let ensembl_map = ensembl_map::make_ensembl_gene_map(
            self.chip, &member_rows, &canonical_symbols, species)?;

        let rows = self.attach_ensembl_ids(&mapped, &ensembl_map)?;

        self.check_members(&member_rows, &mapped, &rows)?;

        info!("built {} gene set membership rows", rows.len());

        Ok((rows, ensembl_map))
    }

    fn check_members(&self, member_rows: &[MemberRow], mapped: &[MappedMember],
                     rows: &[FlatGeneSetMember]) -> FlatResult<()> {
        let mapped_ncbi: HashSet<&NcbiGeneId> =
            mapped.iter().map(|row| &row.ncbi_gene_id).collect();
        checks::check_count_range("distinct NCBI gene IDs before Ensembl \
                                   attachment",
                                  mapped_ncbi.len(), &NCBI_GENE_COUNT_RANGE)?;

        let final_ncbi: HashSet<&NcbiGeneId> =
            rows.iter().map(|row| &row.ncbi_gene_id).collect();
        checks::check_count_range("distinct NCBI gene IDs in the membership \
                                   table",
                                  final_ncbi.len(), &NCBI_GENE_COUNT_RANGE)?;

        let final_sets: HashSet<&GeneSetId> =
            rows.iter().map(|row| &row.gs_id).collect();
        checks::check_count_range("distinct gene sets in the membership table",
                                  final_sets.len(), &GENE_SET_COUNT_RANGE)?;

        let final_symbols: HashSet<&SymbolName> =
            rows.iter().map(|row| &row.gene_symbol).collect();
        checks::check_equal_counts("identifiers in the membership table",
                                   "distinct NCBI gene IDs", final_ncbi.len(),
                                   "distinct gene symbols", final_symbols.len())?;

        let mapped_genes: BTreeSet<FlexStr> =
            mapped.iter().map(|row| row.source_gene.clone()).collect();
        let final_genes: BTreeSet<FlexStr> =
            rows.iter().map(|row| row.source_gene.clone()).collect();
        checks::check_subset("source genes kept through Ensembl attachment",
                             &mapped_genes, &final_genes)?;

        let raw_pairs: HashSet<(&GeneSetId, &SourceGene)> = member_rows.iter()
            .map(|row| (&row.gs_id, &row.source_gene))
            .collect();
        checks::check_min_fraction("final membership rows against raw \
                                    membership pairs",
                                   rows.len(), raw_pairs.len(),
                                   MIN_FINAL_MEMBER_ROW_FRACTION)?;

        checks::check_ratio_range("final membership rows against NCBI mapped \
                                   rows",
                                  rows.len(), mapped.len(),
                                  &FINAL_MEMBER_ROW_RATIO_RANGE)?;

        Ok(())
    }
}

fn make_member(row: &MappedMember, ensembl_gene_id: EnsemblGeneId)
               -> FlatGeneSetMember
{
    FlatGeneSetMember {
        gs_id: row.gs_id.clone(),
        source_gene: row.source_gene.clone(),
        source_species: row.source_species.clone(),
        gene_symbol: row.gene_symbol.clone(),
        ncbi_gene_id: row.ncbi_gene_id.clone(),
        ensembl_gene_id,
    }
}
