use std::collections::HashMap;
use std::rc::Rc;

use chrono::NaiveDate;
use flexstr::{SharedStr as FlexStr, ToSharedStr};
use rusqlite::Connection;

use crate::error::{FlatResult, FlatTableError};
use crate::types::*;

pub struct Raw {
    pub db_info: DbInfo,
    pub collections: Vec<Rc<Collection>>,
    pub publications: Vec<Rc<Publication>>,
    pub namespaces: Vec<Rc<Namespace>>,
    pub gene_symbols: Vec<Rc<GeneSymbol>>,
    pub gene_sets: Vec<Rc<GeneSet>>,
    pub gene_set_details: Vec<Rc<GeneSetDetails>>,
    pub source_members: Vec<Rc<SourceMember>>,
    pub gene_set_source_members: Vec<Rc<GeneSetSourceMember>>,
}

// the single row of the "MSigDB" table, identifying the snapshot
#[derive(Debug, Clone)]
pub struct DbInfo {
    pub version_name: VersionName,
    pub build_date: Option<NaiveDate>,
    pub target_species: Species,
}

#[derive(Debug)]
pub struct Collection {
    pub collection_name: CollectionName,
    pub full_name: CollectionFullName,
}

#[derive(Debug)]
pub struct Publication {
    pub pmid: Option<PmId>,
}

#[derive(Debug)]
pub struct Namespace {
    pub label: FlexStr,
    pub species_code: SpeciesCode,
}

#[derive(Debug)]
pub struct GeneSymbol {
    pub symbol: SymbolName,
    pub ncbi_gene_id: Option<i64>,
}

#[derive(Debug)]
pub struct GeneSet {
    pub standard_name: GeneSetStandardName,
    pub collection_name: CollectionName,
}

#[derive(Debug)]
pub struct GeneSetDetails {
    pub gene_set: Rc<GeneSet>,
    pub systematic_name: GeneSetId,
    pub description_brief: FlexStr,
    pub source_species_code: SpeciesCode,
    pub publication: Option<Rc<Publication>>,
    pub geo_id: Option<GeoId>,
    pub external_details_url: Option<FlexStr>,
}

#[derive(Debug)]
pub struct SourceMember {
    pub source_id: SourceGene,
    pub namespace: Rc<Namespace>,
    pub gene_symbol: Option<Rc<GeneSymbol>>,
}

#[derive(Debug)]
pub struct GeneSetSourceMember {
    pub gene_set: Rc<GeneSet>,
    pub source_member: Rc<SourceMember>,
}

fn get_linked<T>(map: &HashMap<i64, Rc<T>>, id: i64, table_name: &str)
                 -> FlatResult<Rc<T>>
{
    map.get(&id).cloned()
        .ok_or_else(|| FlatTableError::SourceDataShape(
            format!("dangling reference to {} id {}", table_name, id)))
}

fn read_db_info(conn: &Connection) -> FlatResult<DbInfo> {
    let mut db_info = None;

    let mut stmt =
        conn.prepare("SELECT version_name, build_date, target_species_code FROM MSigDB")?;
    let mut rows = stmt.query([])?;

    while let Some(row) = rows.next()? {
        if db_info.is_some() {
            return Err(FlatTableError::SourceDataShape(
                "the MSigDB table has more than one row".into()));
        }

        let version_name: String = row.get(0)?;
        let build_date_str: Option<String> = row.get(1)?;
        let species_code: String = row.get(2)?;

        let build_date = match &build_date_str {
            Some(date_str) => {
                let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
                    .map_err(|err| FlatTableError::SourceDataShape(
                        format!("bad build_date \"{}\" in the MSigDB table: {}",
                                date_str, err)))?;
                Some(date)
            },
            None => None,
        };

        let target_species = Species::from_code(&species_code)
            .map_err(|_| FlatTableError::SourceDataShape(
                format!("unknown target_species_code \"{}\" in the MSigDB table",
                        species_code)))?;

        db_info = Some(DbInfo {
            version_name: version_name.to_shared_str(),
            build_date,
            target_species,
        });
    }

    db_info.ok_or_else(|| FlatTableError::SourceDataShape(
        "the MSigDB table is empty".into()))
}

impl Raw {
    pub fn new(conn: &Connection) -> FlatResult<Raw> {
        let mut ret = Raw {
            db_info: read_db_info(conn)?,
            collections: vec![],
            publications: vec![],
            namespaces: vec![],
            gene_symbols: vec![],
            gene_sets: vec![],
            gene_set_details: vec![],
            source_members: vec![],
            gene_set_source_members: vec![],
        };

        let mut publication_map: HashMap<i64, Rc<Publication>> = HashMap::new();
        let mut namespace_map: HashMap<i64, Rc<Namespace>> = HashMap::new();
        let mut gene_symbol_map: HashMap<i64, Rc<GeneSymbol>> = HashMap::new();
        let mut gene_set_map: HashMap<i64, Rc<GeneSet>> = HashMap::new();
        let mut source_member_map: HashMap<i64, Rc<SourceMember>> = HashMap::new();

        let mut stmt =
            conn.prepare("SELECT collection_name, full_name FROM collection")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let collection_name: String = row.get(0)?;
            let full_name: String = row.get(1)?;
            let collection = Collection {
                collection_name: collection_name.to_shared_str(),
                full_name: full_name.to_shared_str(),
            };
            ret.collections.push(Rc::new(collection));
        }

        let mut stmt = conn.prepare("SELECT id, PMID FROM publication")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let publication_id: i64 = row.get(0)?;
            let pmid: Option<i64> = row.get(1)?;
            let publication = Publication {
                pmid: pmid.map(|pmid| pmid.to_string().to_shared_str()),
            };
            let rc_publication = Rc::new(publication);
            ret.publications.push(rc_publication.clone());
            publication_map.insert(publication_id, rc_publication);
        }

        let mut stmt = conn.prepare("SELECT id, label, species_code FROM namespace")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let namespace_id: i64 = row.get(0)?;
            let label: String = row.get(1)?;
            let species_code: String = row.get(2)?;
            let namespace = Namespace {
                label: label.to_shared_str(),
                species_code: species_code.to_shared_str(),
            };
            let rc_namespace = Rc::new(namespace);
            ret.namespaces.push(rc_namespace.clone());
            namespace_map.insert(namespace_id, rc_namespace);
        }

        let mut stmt = conn.prepare("SELECT id, symbol, NCBI_id FROM gene_symbol")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let gene_symbol_id: i64 = row.get(0)?;
            let symbol: String = row.get(1)?;
            let ncbi_gene_id: Option<i64> = row.get(2)?;
            let gene_symbol = GeneSymbol {
                symbol: symbol.to_shared_str(),
                ncbi_gene_id,
            };
            let rc_gene_symbol = Rc::new(gene_symbol);
            ret.gene_symbols.push(rc_gene_symbol.clone());
            gene_symbol_map.insert(gene_symbol_id, rc_gene_symbol);
        }

        let mut stmt =
            conn.prepare("SELECT id, standard_name, collection_name FROM gene_set")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let gene_set_id: i64 = row.get(0)?;
            let standard_name: String = row.get(1)?;
            let collection_name: String = row.get(2)?;
            let gene_set = GeneSet {
                standard_name: standard_name.to_shared_str(),
                collection_name: collection_name.to_shared_str(),
            };
            let rc_gene_set = Rc::new(gene_set);
            ret.gene_sets.push(rc_gene_set.clone());
            gene_set_map.insert(gene_set_id, rc_gene_set);
        }

        let mut stmt =
            conn.prepare("SELECT gene_set_id, systematic_name, description_brief, \
                          source_species_code, publication_id, GEO_id, \
                          external_details_URL FROM gene_set_details")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let gene_set_id: i64 = row.get(0)?;
            let systematic_name: String = row.get(1)?;
            let description_brief: Option<String> = row.get(2)?;
            let source_species_code: String = row.get(3)?;
            let publication_id: Option<i64> = row.get(4)?;
            let geo_id: Option<String> = row.get(5)?;
            let external_details_url: Option<String> = row.get(6)?;

            let publication = match publication_id {
                Some(publication_id) =>
                    Some(get_linked(&publication_map, publication_id, "publication")?),
                None => None,
            };

            let details = GeneSetDetails {
                gene_set: get_linked(&gene_set_map, gene_set_id, "gene_set")?,
                systematic_name: systematic_name.to_shared_str(),
                description_brief: description_brief.unwrap_or_default().to_shared_str(),
                source_species_code: source_species_code.to_shared_str(),
                publication,
                geo_id: geo_id.map(|s| s.to_shared_str()),
                external_details_url: external_details_url.map(|s| s.to_shared_str()),
            };
            ret.gene_set_details.push(Rc::new(details));
        }

        let mut stmt =
            conn.prepare("SELECT id, source_id, namespace_id, gene_symbol_id \
                          FROM source_member")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let source_member_id: i64 = row.get(0)?;
            let source_id: String = row.get(1)?;
            let namespace_id: i64 = row.get(2)?;
            let gene_symbol_id: Option<i64> = row.get(3)?;

            let gene_symbol = match gene_symbol_id {
                Some(gene_symbol_id) =>
                    Some(get_linked(&gene_symbol_map, gene_symbol_id, "gene_symbol")?),
                None => None,
            };

            let source_member = SourceMember {
                source_id: source_id.to_shared_str(),
                namespace: get_linked(&namespace_map, namespace_id, "namespace")?,
                gene_symbol,
            };
            let rc_source_member = Rc::new(source_member);
            ret.source_members.push(rc_source_member.clone());
            source_member_map.insert(source_member_id, rc_source_member);
        }

        let mut stmt =
            conn.prepare("SELECT gene_set_id, source_member_id \
                          FROM gene_set_source_member")?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let gene_set_id: i64 = row.get(0)?;
            let source_member_id: i64 = row.get(1)?;

            let link = GeneSetSourceMember {
                gene_set: get_linked(&gene_set_map, gene_set_id, "gene_set")?,
                source_member: get_linked(&source_member_map, source_member_id,
                                          "source_member")?,
            };
            ret.gene_set_source_members.push(Rc::new(link));
        }

        Ok(ret)
    }
}
