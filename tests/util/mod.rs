use std::io::{BufWriter, Write};

use rusqlite::{Connection, params};
use tempfile::NamedTempFile;

use msigdb_flat::types::Species;

// the subset of the msigdb.db schema that the snapshot reader queries
#[allow(dead_code)]
fn create_snapshot_tables(conn: &Connection, version_name: &str,
                          target_species_code: &str) {
    conn.execute_batch("
CREATE TABLE MSigDB (version_name TEXT NOT NULL,
                     build_date TEXT,
                     target_species_code TEXT NOT NULL);
CREATE TABLE collection (collection_name TEXT NOT NULL,
                         full_name TEXT NOT NULL);
CREATE TABLE publication (id INTEGER PRIMARY KEY,
                          PMID INTEGER);
CREATE TABLE namespace (id INTEGER PRIMARY KEY,
                        label TEXT NOT NULL,
                        species_code TEXT NOT NULL);
CREATE TABLE gene_symbol (id INTEGER PRIMARY KEY,
                          symbol TEXT NOT NULL,
                          NCBI_id INTEGER);
CREATE TABLE gene_set (id INTEGER PRIMARY KEY,
                       standard_name TEXT NOT NULL,
                       collection_name TEXT NOT NULL);
CREATE TABLE gene_set_details (gene_set_id INTEGER NOT NULL,
                               systematic_name TEXT NOT NULL,
                               description_brief TEXT,
                               source_species_code TEXT NOT NULL,
                               publication_id INTEGER,
                               GEO_id TEXT,
                               external_details_URL TEXT);
CREATE TABLE source_member (id INTEGER PRIMARY KEY,
                            source_id TEXT NOT NULL,
                            namespace_id INTEGER NOT NULL,
                            gene_symbol_id INTEGER);
CREATE TABLE gene_set_source_member (gene_set_id INTEGER NOT NULL,
                                     source_member_id INTEGER NOT NULL);
").unwrap();

    conn.execute("INSERT INTO MSigDB (version_name, build_date, target_species_code) \
                  VALUES (?1, ?2, ?3)",
                 params![version_name, "2025-03-20", target_species_code]).unwrap();
}

// an in-memory snapshot with a single row in the MSigDB table, everything
// else empty
#[allow(dead_code)]
pub fn empty_snapshot(version_name: &str, target_species_code: &str) -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    create_snapshot_tables(&conn, version_name, target_species_code);
    conn
}

#[allow(dead_code)]
pub fn add_collection(conn: &Connection, collection_name: &str, full_name: &str) {
    conn.execute("INSERT INTO collection (collection_name, full_name) \
                  VALUES (?1, ?2)",
                 params![collection_name, full_name]).unwrap();
}

#[allow(dead_code)]
pub fn add_namespace(conn: &Connection, id: i64, label: &str, species_code: &str) {
    conn.execute("INSERT INTO namespace (id, label, species_code) \
                  VALUES (?1, ?2, ?3)",
                 params![id, label, species_code]).unwrap();
}

#[allow(dead_code)]
pub fn add_publication(conn: &Connection, id: i64, pmid: Option<i64>) {
    conn.execute("INSERT INTO publication (id, PMID) VALUES (?1, ?2)",
                 params![id, pmid]).unwrap();
}

#[allow(dead_code)]
pub fn add_gene_symbol(conn: &Connection, id: i64, symbol: &str,
                       ncbi_id: Option<i64>) {
    conn.execute("INSERT INTO gene_symbol (id, symbol, NCBI_id) \
                  VALUES (?1, ?2, ?3)",
                 params![id, symbol, ncbi_id]).unwrap();
}

#[allow(dead_code)]
pub fn add_gene_set(conn: &Connection, id: i64, standard_name: &str,
                    collection_name: &str) {
    conn.execute("INSERT INTO gene_set (id, standard_name, collection_name) \
                  VALUES (?1, ?2, ?3)",
                 params![id, standard_name, collection_name]).unwrap();
}

#[allow(dead_code)]
pub fn add_gene_set_details(conn: &Connection, gene_set_id: i64,
                            systematic_name: &str, description: &str,
                            source_species_code: &str,
                            publication_id: Option<i64>, geo_id: Option<&str>,
                            url: Option<&str>) {
    conn.execute("INSERT INTO gene_set_details (gene_set_id, systematic_name, \
                  description_brief, source_species_code, publication_id, \
                  GEO_id, external_details_URL) \
                  VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                 params![gene_set_id, systematic_name, description,
                         source_species_code, publication_id, geo_id,
                         url]).unwrap();
}

#[allow(dead_code)]
pub fn add_source_member(conn: &Connection, id: i64, source_id: &str,
                         namespace_id: i64, gene_symbol_id: Option<i64>) {
    conn.execute("INSERT INTO source_member (id, source_id, namespace_id, \
                  gene_symbol_id) VALUES (?1, ?2, ?3, ?4)",
                 params![id, source_id, namespace_id, gene_symbol_id]).unwrap();
}

#[allow(dead_code)]
pub fn add_link(conn: &Connection, gene_set_id: i64, source_member_id: i64) {
    conn.execute("INSERT INTO gene_set_source_member (gene_set_id, \
                  source_member_id) VALUES (?1, ?2)",
                 params![gene_set_id, source_member_id]).unwrap();
}

// a small human snapshot
//
// gene sets:
//   1  "CHR1P36" (C1, M1001) with members 1, 2, 3 and 7
//   2  "REACTOME_TEST_PATHWAY" (C2:CP:REACTOME, M1002) with members 1 and 4
//   3  "CHR2Q11" (C1, M1003) with members 3 and 4
//
// source members:
//   1  "101"        NCBI namespace       -> ALPHA (NCBI ID 101)
//   2  "ENSG000101" Ensembl namespace    -> ALPHA
//   3  "102"        NCBI namespace       -> BETA  (NCBI ID 102)
//   4  "103"        NCBI namespace       -> GAMMA (NCBI ID 103)
//   7  "101"        mouse NCBI namespace -> ALPHA, duplicating member 1
//
// members 5 (DELTA, no NCBI ID) and 6 (no symbol link) exist but are not
// linked to any gene set
#[allow(dead_code)]
pub fn small_snapshot() -> Connection {
    let conn = empty_snapshot("2025.1.Hs", "HS");
    fill_small_snapshot(&conn);
    conn
}

// the same small snapshot written to a database file, for tests that open
// a snapshot by path
#[allow(dead_code)]
pub fn small_snapshot_file() -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    let conn = Connection::open(file.path()).unwrap();
    create_snapshot_tables(&conn, "2025.1.Hs", "HS");
    fill_small_snapshot(&conn);
    conn.close().unwrap();
    file
}

#[allow(dead_code)]
fn fill_small_snapshot(conn: &Connection) {
    add_collection(conn, "C1", "positional gene sets");
    add_collection(conn, "C2:CP:REACTOME", "Reactome pathways");
    add_namespace(conn, 1, "NCBI Gene", "HS");
    add_namespace(conn, 2, "Ensembl Gene", "HS");
    add_namespace(conn, 3, "NCBI Gene", "MM");
    add_publication(conn, 1, Some(12345678));

    add_gene_symbol(conn, 1, "ALPHA", Some(101));
    add_gene_symbol(conn, 2, "BETA", Some(102));
    add_gene_symbol(conn, 3, "GAMMA", Some(103));
    add_gene_symbol(conn, 4, "DELTA", None);

    add_gene_set(conn, 1, "CHR1P36", "C1");
    add_gene_set_details(conn, 1, "M1001", "genes in cytogenetic band chr1p36",
                         "HS", Some(1), Some("GSE100"),
                         Some("https://example.org/M1001"));
    add_gene_set(conn, 2, "REACTOME_TEST_PATHWAY", "C2:CP:REACTOME");
    add_gene_set_details(conn, 2, "M1002", "a test pathway", "HS",
                         None, None, None);
    add_gene_set(conn, 3, "CHR2Q11", "C1");
    add_gene_set_details(conn, 3, "M1003", "genes in cytogenetic band chr2q11",
                         "HS", None, None, None);

    add_source_member(conn, 1, "101", 1, Some(1));
    add_source_member(conn, 2, "ENSG000101", 2, Some(1));
    add_source_member(conn, 3, "102", 1, Some(2));
    add_source_member(conn, 4, "103", 1, Some(3));
    add_source_member(conn, 5, "104", 1, Some(4));
    add_source_member(conn, 6, "105", 1, None);
    add_source_member(conn, 7, "101", 3, Some(1));

    add_link(conn, 1, 1);
    add_link(conn, 1, 2);
    add_link(conn, 1, 3);
    add_link(conn, 1, 7);
    add_link(conn, 2, 1);
    add_link(conn, 2, 4);
    add_link(conn, 3, 3);
    add_link(conn, 3, 4);
}

// shape of a generated snapshot large enough to pass every plausibility
// check of the full build
#[allow(dead_code)]
pub struct ScaledFixture {
    pub species: Species,
    pub gene_count: usize,
    pub positional_set_count: usize,
    pub mir_set_count: usize,
    pub tft_set_count: usize,
    // genes with a second chip candidate, settled by corroboration
    pub ambiguous_gene_count: usize,
}

impl Default for ScaledFixture {
    fn default() -> ScaledFixture {
        ScaledFixture {
            species: Species::HS,
            gene_count: 40_500,
            positional_set_count: 10_000,
            mir_set_count: 25,
            tft_set_count: 25,
            ambiguous_gene_count: 10,
        }
    }
}

#[allow(dead_code)]
impl ScaledFixture {
    pub fn version_name(&self) -> &'static str {
        match self.species {
            Species::HS => "2025.1.Hs",
            Species::MM => "2025.1.Mm",
        }
    }

    // positional, miRDB and GTRD collection names of the target species
    pub fn collections(&self) -> [&'static str; 3] {
        match self.species {
            Species::HS => ["C1", "C3:MIR:MIRDB", "C3:TFT:GTRD"],
            Species::MM => ["M1", "M3:MIRDB", "M3:GTRD"],
        }
    }

    fn ensembl_prefix(&self) -> &'static str {
        match self.species {
            Species::HS => "ENSG",
            Species::MM => "ENSMUSG",
        }
    }

    pub fn ensembl_id(&self, i: usize) -> String {
        format!("{}{}", self.ensembl_prefix(), 100_000 + i)
    }

    // an ID that appears in the chip file but not in the snapshot
    pub fn decoy_ensembl_id(&self, i: usize) -> String {
        format!("{}{}", self.ensembl_prefix(), 200_000 + i)
    }

    // a second snapshot ID for an ambiguous gene
    pub fn alt_ensembl_id(&self, i: usize) -> String {
        format!("{}{}", self.ensembl_prefix(), 300_000 + i)
    }
}

#[allow(dead_code)]
pub fn scaled_symbol(i: usize) -> String {
    format!("GENE{}", i)
}

#[allow(dead_code)]
pub fn scaled_ncbi_id(i: usize) -> i64 {
    1_000 + i as i64
}

// a generated snapshot for the fixture species.  every gene has an NCBI
// and an Ensembl source row and belongs to one positional set through
// both.  the miRDB sets cover the first genes and the GTRD sets the genes
// from 100 up, two per set, so all three reliable collections are
// populated.  the first `ambiguous_gene_count` genes additionally get a
// second universe ID that only the first GTRD set backs, leaving
// corroboration to settle them
#[allow(dead_code)]
pub fn scaled_snapshot(fixture: &ScaledFixture) -> Connection {
    let conn = empty_snapshot(fixture.version_name(), fixture.species.code());

    let [positional_collection, mir_collection, tft_collection] =
        fixture.collections();
    add_collection(&conn, positional_collection, "positional gene sets");
    add_collection(&conn, mir_collection, "microRNA targets from miRDB");
    add_collection(&conn, tft_collection, "transcription factor targets from GTRD");
    add_namespace(&conn, 1, "NCBI Gene", fixture.species.code());
    add_namespace(&conn, 2, "Ensembl Gene", fixture.species.code());
    add_publication(&conn, 1, Some(34062119));

    conn.execute_batch("BEGIN").unwrap();

    {
        let mut symbol_stmt = conn.prepare(
            "INSERT INTO gene_symbol (id, symbol, NCBI_id) \
             VALUES (?1, ?2, ?3)").unwrap();
        for i in 0..fixture.gene_count {
            symbol_stmt.execute(params![(i + 1) as i64, scaled_symbol(i),
                                        scaled_ncbi_id(i)]).unwrap();
        }

        let mut member_stmt = conn.prepare(
            "INSERT INTO source_member (id, source_id, namespace_id, \
             gene_symbol_id) VALUES (?1, ?2, ?3, ?4)").unwrap();
        for i in 0..fixture.gene_count {
            member_stmt.execute(params![(2 * i + 1) as i64,
                                        scaled_ncbi_id(i).to_string(),
                                        1_i64, (i + 1) as i64]).unwrap();
            member_stmt.execute(params![(2 * i + 2) as i64,
                                        fixture.ensembl_id(i),
                                        2_i64, (i + 1) as i64]).unwrap();
        }
        let alt_member_base = (2 * fixture.gene_count) as i64;
        for i in 0..fixture.ambiguous_gene_count {
            member_stmt.execute(params![alt_member_base + i as i64 + 1,
                                        fixture.alt_ensembl_id(i),
                                        2_i64, (i + 1) as i64]).unwrap();
        }

        let mut set_stmt = conn.prepare(
            "INSERT INTO gene_set (id, standard_name, collection_name) \
             VALUES (?1, ?2, ?3)").unwrap();
        let mut details_stmt = conn.prepare(
            "INSERT INTO gene_set_details (gene_set_id, systematic_name, \
             description_brief, source_species_code, publication_id, GEO_id, \
             external_details_URL) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)").unwrap();

        let total_set_count = fixture.positional_set_count
            + fixture.mir_set_count + fixture.tft_set_count;
        for s in 0..total_set_count {
            let set_id = (s + 1) as i64;
            let (name, collection) =
                if s < fixture.positional_set_count {
                    (format!("CHR_REGION_{}", s), positional_collection)
                } else if s < fixture.positional_set_count + fixture.mir_set_count {
                    (format!("MIR_TARGETS_{}", s), mir_collection)
                } else {
                    (format!("TFT_TARGETS_{}", s), tft_collection)
                };
            set_stmt.execute(params![set_id, name, collection]).unwrap();
            details_stmt.execute(params![set_id, format!("M{}", 10_000 + s),
                                         format!("{} description", name),
                                         fixture.species.code(), 1_i64,
                                         Option::<String>::None,
                                         format!("https://example.org/{}", name)])
                .unwrap();
        }

        let mut link_stmt = conn.prepare(
            "INSERT INTO gene_set_source_member (gene_set_id, source_member_id) \
             VALUES (?1, ?2)").unwrap();
        for i in 0..fixture.gene_count {
            let set_id = ((i % fixture.positional_set_count) + 1) as i64;
            link_stmt.execute(params![set_id, (2 * i + 1) as i64]).unwrap();
            link_stmt.execute(params![set_id, (2 * i + 2) as i64]).unwrap();
        }
        for m in 0..fixture.mir_set_count {
            let set_id = (fixture.positional_set_count + m + 1) as i64;
            for gene in [2 * m, 2 * m + 1] {
                link_stmt.execute(params![set_id, (2 * gene + 2) as i64]).unwrap();
            }
        }
        for t in 0..fixture.tft_set_count {
            let set_id = (fixture.positional_set_count + fixture.mir_set_count
                          + t + 1) as i64;
            for gene in [2 * t + 100, 2 * t + 101] {
                link_stmt.execute(params![set_id, (2 * gene + 2) as i64]).unwrap();
            }
        }
        let first_tft_set = (fixture.positional_set_count
                             + fixture.mir_set_count + 1) as i64;
        for i in 0..fixture.ambiguous_gene_count {
            link_stmt.execute(params![first_tft_set,
                                      alt_member_base + i as i64 + 1]).unwrap();
        }
    }

    conn.execute_batch("COMMIT").unwrap();

    conn
}

// the chip file matching scaled_snapshot(): one Ensembl probe per gene
// plus a decoy probe for each ambiguous gene
#[allow(dead_code)]
pub fn scaled_chip(fixture: &ScaledFixture) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();

    {
        let mut writer = BufWriter::new(&mut file);
        writeln!(writer, "Probe Set ID\tGene Symbol\tGene Title").unwrap();
        for i in 0..fixture.gene_count {
            writeln!(writer, "{}\t{}\t{} protein", fixture.ensembl_id(i),
                     scaled_symbol(i), scaled_symbol(i)).unwrap();
        }
        for i in 0..fixture.ambiguous_gene_count {
            writeln!(writer, "{}\t{}\tduplicated probe",
                     fixture.decoy_ensembl_id(i), scaled_symbol(i)).unwrap();
        }
        writer.flush().unwrap();
    }

    file
}
