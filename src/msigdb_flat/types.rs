use std::fmt::{self, Display};

use flexstr::SharedStr as FlexStr;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::*;
use crate::error::FlatTableError;

pub type GeneSetId = FlexStr;
pub type GeneSetStandardName = FlexStr;
pub type CollectionName = FlexStr;
pub type CollectionFullName = FlexStr;
pub type SourceGene = FlexStr;
pub type SymbolName = FlexStr;
pub type NcbiGeneId = FlexStr;
pub type EnsemblGeneId = FlexStr;
pub type SpeciesCode = FlexStr;
pub type VersionName = FlexStr;
pub type PmId = FlexStr;
pub type GeoId = FlexStr;

lazy_static! {
    static ref HS_ENSEMBL_GENE_RE: Regex = Regex::new(r"^ENSG\d+$").unwrap();
    static ref MM_ENSEMBL_GENE_RE: Regex = Regex::new(r"^ENSMUSG\d+$").unwrap();
}

// the two species MSigDB publishes snapshot databases for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
         Serialize, Deserialize)]
pub enum Species {
    HS,
    MM,
}

impl Species {
    pub fn from_code(code: &str) -> Result<Species, FlatTableError> {
        match code.to_ascii_uppercase().as_str() {
            "HS" => Ok(Species::HS),
            "MM" => Ok(Species::MM),
            _ => Err(FlatTableError::InvalidArgument(
                 format!("unknown species code \"{}\", expected HS or MM", code))),
        }
    }

    // the species encoded in a snapshot version name like "2025.1.Hs"
    pub fn from_version_name(version_name: &str) -> Result<Species, FlatTableError> {
        let suffix = version_name.rsplit('.').next().unwrap_or(version_name);
        Species::from_code(suffix)
            .map_err(|_| FlatTableError::InvalidArgument(
                 format!("can't determine species from version name \"{}\"",
                         version_name)))
    }

    pub fn code(&self) -> &'static str {
        match self {
            Species::HS => "HS",
            Species::MM => "MM",
        }
    }

    pub fn reliable_collections(&self) -> &'static [&'static str] {
        match self {
            Species::HS => &HS_RELIABLE_COLLECTIONS,
            Species::MM => &MM_RELIABLE_COLLECTIONS,
        }
    }

    pub fn positional_collection(&self) -> &'static str {
        match self {
            Species::HS => HS_POSITIONAL_COLLECTION,
            Species::MM => MM_POSITIONAL_COLLECTION,
        }
    }

    pub fn ensembl_gene_re(&self) -> &'static Regex {
        match self {
            Species::HS => &HS_ENSEMBL_GENE_RE,
            Species::MM => &MM_ENSEMBL_GENE_RE,
        }
    }

    pub fn is_ensembl_gene_id(&self, id: &str) -> bool {
        self.ensembl_gene_re().is_match(id)
    }

    pub fn chip_file_stem(&self) -> &'static str {
        match self {
            Species::HS => "Human_Ensembl_Gene_ID_MSigDB",
            Species::MM => "Mouse_Ensembl_Gene_ID_MSigDB",
        }
    }
}

impl Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
