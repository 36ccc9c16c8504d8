use std::ops::RangeInclusive;

pub const SNAPSHOT_URL_BASE: &str =
    "https://data.broadinstitute.org/gsea-msigdb/msigdb/release";
pub const CHIP_URL_BASE: &str =
    "https://data.broadinstitute.org/gsea-msigdb/msigdb/annotations_versioned";

// collections curated against the external gene ID namespace, so their
// member identifiers can corroborate chip file mappings
pub const HS_RELIABLE_COLLECTIONS: [&str; 5] =
    ["C1", "C3:MIR:MIRDB", "C3:MIR:MIR_LEGACY", "C3:TFT:GTRD", "C3:TFT:TFT_LEGACY"];
pub const MM_RELIABLE_COLLECTIONS: [&str; 3] =
    ["M1", "M3:MIRDB", "M3:GTRD"];

pub const HS_POSITIONAL_COLLECTION: &str = "C1";
pub const MM_POSITIONAL_COLLECTION: &str = "M1";

pub const MIN_CHIP_DATA_ROWS: usize = 10_000;
pub const MAX_CHIP_CANDIDATES_PER_SYMBOL: usize = 100;
pub const MAX_MEDIAN_CHIP_CANDIDATES: f64 = 1.0;
pub const MIN_RELIABLE_COLLECTION_COUNT: usize = 3;
pub const MIN_DISTINCT_CHIP_IDS: usize = 40_000;
pub const MIN_POSITIONAL_SYMBOL_FRACTION: f64 = 0.995;
pub const MIN_MAPPED_CHIP_ID_FRACTION: f64 = 0.8;

pub const MIN_NCBI_SOURCE_GENE_FRACTION: f64 = 0.8;
pub const MIN_NCBI_MEMBER_ROW_FRACTION: f64 = 0.95;
pub const NCBI_GENE_COUNT_RANGE: RangeInclusive<usize> = 30_000..=50_000;
pub const GENE_SET_COUNT_RANGE: RangeInclusive<usize> = 10_000..=50_000;
pub const MIN_FINAL_MEMBER_ROW_FRACTION: f64 = 0.95;
pub const FINAL_MEMBER_ROW_RATIO_RANGE: RangeInclusive<f64> = 0.99..=1.01;

pub const DETAILS_FILE_SUFFIX: &str = "gene_set_details.tsv.gz";
pub const MEMBERS_FILE_SUFFIX: &str = "gene_set_members.tsv.gz";
pub const BUILD_INFO_FILE_SUFFIX: &str = "build_info.json";
