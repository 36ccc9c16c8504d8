use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, info};

use crate::chip::ChipEntry;
use crate::constants::*;
use crate::error::{FlatResult, FlatTableError};
use crate::flat::checks;
use crate::flat::data::MemberRow;
use crate::types::*;

// candidate Ensembl IDs per symbol, from the restricted chip file
pub type CandidateMap = BTreeMap<SymbolName, BTreeSet<EnsemblGeneId>>;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EnsemblMapping {
    pub ensembl_gene_id: EnsemblGeneId,
    pub gene_symbol: SymbolName,
}

// how many symbols each resolution tier settled
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TierCounts {
    pub unique_in_chip: usize,
    pub single_reliable_entry: usize,
    pub single_reliable_id: usize,
    pub corroborated: usize,
    pub positional: usize,
    pub any_reliable: usize,
    pub chip_only: usize,
}

// the restricted chip file: rows with an Ensembl probe ID and a canonical
// symbol, as a candidate set per symbol
pub fn chip_candidates(chip: &[ChipEntry],
                       canonical_symbols: &HashSet<SymbolName>,
                       species: Species) -> CandidateMap
{
    let mut candidates: CandidateMap = BTreeMap::new();

    for entry in chip {
        if !species.is_ensembl_gene_id(&entry.probe_id) {
            continue;
        }
        if !canonical_symbols.contains(&entry.gene_symbol) {
            continue;
        }
        candidates.entry(entry.gene_symbol.clone()).or_default()
            .insert(entry.probe_id.clone());
    }

    candidates
}

// the (Ensembl ID, symbol) pairs seen in the reliable collections of a
// species, each with the set of collections it appears in
pub struct ReliableUniverse {
    pairs: BTreeMap<SymbolName, BTreeMap<EnsemblGeneId, BTreeSet<CollectionName>>>,
    collections_present: BTreeSet<CollectionName>,
    positional_collection: CollectionName,
}

impl ReliableUniverse {
    pub fn from_member_rows(member_rows: &[MemberRow], species: Species)
                            -> ReliableUniverse
    {
        let reliable: BTreeSet<CollectionName> =
            species.reliable_collections().iter().map(|&name| name.into()).collect();

        let mut pairs: BTreeMap<SymbolName,
                                BTreeMap<EnsemblGeneId, BTreeSet<CollectionName>>> =
            BTreeMap::new();
        let mut collections_present = BTreeSet::new();

        for row in member_rows {
            if !reliable.contains(&row.collection_name) {
                continue;
            }
            if !species.is_ensembl_gene_id(&row.source_gene) {
                continue;
            }
            let Some(symbol) = &row.symbol else {
                continue;
            };
            if symbol.is_empty() {
                continue;
            }

            pairs.entry(symbol.clone()).or_default()
                .entry(row.source_gene.clone()).or_default()
                .insert(row.collection_name.clone());
            collections_present.insert(row.collection_name.clone());
        }

        ReliableUniverse {
            pairs,
            collections_present,
            positional_collection: species.positional_collection().into(),
        }
    }

    pub fn collection_count(&self) -> usize {
        self.collections_present.len()
    }

    pub fn symbols(&self) -> BTreeSet<SymbolName> {
        self.pairs.keys().cloned().collect()
    }

    pub fn ids_of(&self, symbol: &SymbolName)
                  -> Option<&BTreeMap<EnsemblGeneId, BTreeSet<CollectionName>>>
    {
        self.pairs.get(symbol)
    }

    // pairs for a symbol counted with per collection multiplicity
    pub fn entry_count(&self, symbol: &SymbolName) -> usize {
        self.pairs.get(symbol)
            .map(|ids| ids.values().map(|collections| collections.len()).sum())
            .unwrap_or(0)
    }

    pub fn positional_collection(&self) -> &CollectionName {
        &self.positional_collection
    }

    // the symbols that appear in the positional collection
    pub fn positional_symbols(&self) -> BTreeSet<SymbolName> {
        self.pairs.iter()
            .filter(|(_, ids)| {
                ids.values().any(|collections| {
                    collections.contains(&self.positional_collection)
                })
            })
            .map(|(symbol, _)| symbol.clone())
            .collect()
    }
}

// settle every symbol of the candidate map and the reliable universe on a
// set of (Ensembl ID, symbol) pairs.  each tier only sees the symbols
// every earlier tier failed to settle, and all decisions are made over
// ordered sets, so resolving the same snapshot twice gives the same map
pub fn resolve_candidates(candidates: &CandidateMap, universe: &ReliableUniverse)
                          -> (Vec<EnsemblMapping>, TierCounts)
{
    let mut counts = TierCounts::default();
    let mut accepted: BTreeSet<EnsemblMapping> = BTreeSet::new();

    let mut remaining: BTreeSet<SymbolName> = candidates.keys().cloned().collect();
    remaining.extend(universe.symbols());

    // symbols the chip itself maps to exactly one ID
    for (symbol, ids) in candidates {
        if ids.len() == 1 {
            if let Some(id) = ids.first() {
                accepted.insert(EnsemblMapping {
                    ensembl_gene_id: id.clone(),
                    gene_symbol: symbol.clone(),
                });
            }
            remaining.remove(symbol);
            counts.unique_in_chip += 1;
        }
    }

    // symbols with exactly one reliable collection entry overall
    let mut resolved: Vec<SymbolName> = vec![];
    for symbol in &remaining {
        if universe.entry_count(symbol) == 1 {
            if let Some(ids) = universe.ids_of(symbol) {
                if let Some((id, _)) = ids.first_key_value() {
                    accepted.insert(EnsemblMapping {
                        ensembl_gene_id: id.clone(),
                        gene_symbol: symbol.clone(),
                    });
                }
                resolved.push(symbol.clone());
            }
        }
    }
    counts.single_reliable_entry = resolved.len();
    for symbol in resolved.drain(..) {
        remaining.remove(&symbol);
    }

    // symbols with several entries that all agree on one ID
    for symbol in &remaining {
        if let Some(ids) = universe.ids_of(symbol) {
            if ids.len() == 1 {
                if let Some((id, _)) = ids.first_key_value() {
                    accepted.insert(EnsemblMapping {
                        ensembl_gene_id: id.clone(),
                        gene_symbol: symbol.clone(),
                    });
                }
                resolved.push(symbol.clone());
            }
        }
    }
    counts.single_reliable_id = resolved.len();
    for symbol in resolved.drain(..) {
        remaining.remove(&symbol);
    }

    // IDs corroborated by more than one reliable collection win over the
    // rest of the candidates
    for symbol in &remaining {
        let Some(ids) = universe.ids_of(symbol) else {
            continue;
        };
        let corroborated: Vec<&EnsemblGeneId> = ids.iter()
            .filter(|(_, collections)| collections.len() > 1)
            .map(|(id, _)| id)
            .collect();
        if !corroborated.is_empty() {
            for id in corroborated {
                accepted.insert(EnsemblMapping {
                    ensembl_gene_id: id.clone(),
                    gene_symbol: symbol.clone(),
                });
            }
            resolved.push(symbol.clone());
        }
    }
    counts.corroborated = resolved.len();
    for symbol in resolved.drain(..) {
        remaining.remove(&symbol);
    }

    // then IDs backed by the positional collection
    for symbol in &remaining {
        let Some(ids) = universe.ids_of(symbol) else {
            continue;
        };
        let positional: Vec<&EnsemblGeneId> = ids.iter()
            .filter(|(_, collections)| {
                collections.contains(universe.positional_collection())
            })
            .map(|(id, _)| id)
            .collect();
        if !positional.is_empty() {
            for id in positional {
                accepted.insert(EnsemblMapping {
                    ensembl_gene_id: id.clone(),
                    gene_symbol: symbol.clone(),
                });
            }
            resolved.push(symbol.clone());
        }
    }
    counts.positional = resolved.len();
    for symbol in resolved.drain(..) {
        remaining.remove(&symbol);
    }

    // any reliable collection evidence at all
    for symbol in &remaining {
        let Some(ids) = universe.ids_of(symbol) else {
            continue;
        };
        for id in ids.keys() {
            accepted.insert(EnsemblMapping {
                ensembl_gene_id: id.clone(),
                gene_symbol: symbol.clone(),
            });
        }
        resolved.push(symbol.clone());
    }
    counts.any_reliable = resolved.len();
    for symbol in resolved.drain(..) {
        remaining.remove(&symbol);
    }

    // what's left never appears in a reliable collection, keep the full
    // chip candidate set
    for symbol in &remaining {
        if let Some(ids) = candidates.get(symbol) {
            for id in ids {
                accepted.insert(EnsemblMapping {
                    ensembl_gene_id: id.clone(),
                    gene_symbol: symbol.clone(),
                });
            }
            counts.chip_only += 1;
        }
    }

    (accepted.into_iter().collect(), counts)
}

// the final symbol to Ensembl gene ID map
pub struct EnsemblGeneMap {
    mappings: Vec<EnsemblMapping>,
    by_symbol: HashMap<SymbolName, Vec<EnsemblGeneId>>,
}

impl EnsemblGeneMap {
    pub fn new(mappings: Vec<EnsemblMapping>) -> EnsemblGeneMap {
        let mut by_symbol: HashMap<SymbolName, Vec<EnsemblGeneId>> = HashMap::new();

        for mapping in &mappings {
            by_symbol.entry(mapping.gene_symbol.clone()).or_default()
                .push(mapping.ensembl_gene_id.clone());
        }

        EnsemblGeneMap { mappings, by_symbol }
    }

    pub fn mappings(&self) -> &[EnsemblMapping] {
        &self.mappings
    }

    pub fn ids_for_symbol(&self, symbol: &str) -> &[EnsemblGeneId] {
        self.by_symbol.get(symbol).map(|ids| ids.as_slice()).unwrap_or(&[])
    }

    pub fn symbols(&self) -> BTreeSet<SymbolName> {
        self.by_symbol.keys().cloned().collect()
    }

    pub fn distinct_id_count(&self) -> usize {
        self.mappings.iter()
            .map(|mapping| &mapping.ensembl_gene_id)
            .collect::<HashSet<_>>().len()
    }
}

// build the symbol to Ensembl map for one snapshot, with all the input
// plausibility and output identity checks
pub fn make_ensembl_gene_map(chip: &[ChipEntry], member_rows: &[MemberRow],
                             canonical_symbols: &HashSet<SymbolName>,
                             species: Species) -> FlatResult<EnsemblGeneMap>
{
    let candidates = chip_candidates(chip, canonical_symbols, species);

    // a chip for the wrong species parses but leaves nothing after the
    // restriction, so the row minimum is checked here
    let restricted_rows: usize = candidates.values().map(|ids| ids.len()).sum();
    if restricted_rows < MIN_CHIP_DATA_ROWS {
        return Err(FlatTableError::SourceDataShape(
            format!("chip file has only {} rows left after restricting to \
                     Ensembl probes with canonical symbols, expected at least {}",
                    restricted_rows, MIN_CHIP_DATA_ROWS)));
    }

    let universe = ReliableUniverse::from_member_rows(member_rows, species);

    let candidate_counts: Vec<usize> =
        candidates.values().map(|ids| ids.len()).collect();
    let max_candidates = candidate_counts.iter().copied().max().unwrap_or(0);
    checks::check_max_count("chip candidate IDs for one symbol",
                            max_candidates, MAX_CHIP_CANDIDATES_PER_SYMBOL)?;
    checks::check_max_median("chip candidate IDs per symbol",
                             &candidate_counts, MAX_MEDIAN_CHIP_CANDIDATES)?;

    checks::check_min_count("reliable collections in the snapshot",
                            universe.collection_count(),
                            MIN_RELIABLE_COLLECTION_COUNT)?;

    let distinct_chip_ids: HashSet<&EnsemblGeneId> =
        candidates.values().flatten().collect();
    checks::check_min_count("distinct Ensembl IDs in the chip file",
                            distinct_chip_ids.len(), MIN_DISTINCT_CHIP_IDS)?;

    let chip_symbols: BTreeSet<SymbolName> = candidates.keys().cloned().collect();
    let covered = chip_symbols.intersection(&universe.positional_symbols()).count();
    checks::check_min_fraction(
        &format!("chip symbols covered by the {} collection",
                 universe.positional_collection()),
        covered, chip_symbols.len(), MIN_POSITIONAL_SYMBOL_FRACTION)?;

    let (mappings, tier_counts) = resolve_candidates(&candidates, &universe);

    debug!("symbol resolution tiers: {:?}", tier_counts);
    info!("resolved {} (Ensembl ID, symbol) pairs for {} chip and {} reliable collection symbols",
          mappings.len(), chip_symbols.len(), universe.symbols().len());

    let ensembl_map = EnsemblGeneMap::new(mappings);

    // the resolution must settle exactly the symbols it was given
    let mut expected_symbols = chip_symbols;
    expected_symbols.extend(universe.symbols());
    checks::check_same_set("symbols after Ensembl resolution",
                           &expected_symbols, &ensembl_map.symbols())?;

    checks::check_min_fraction("distinct chip Ensembl IDs kept by the resolution",
                               ensembl_map.distinct_id_count(),
                               distinct_chip_ids.len(),
                               MIN_MAPPED_CHIP_ID_FRACTION)?;

    Ok(ensembl_map)
}
