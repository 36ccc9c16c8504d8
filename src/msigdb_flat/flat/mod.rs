pub mod checks;
pub mod data;
pub mod ensembl_map;
pub mod table_build;

pub use ensembl_map::EnsemblGeneMap;
pub use table_build::{FlatTableBuild, FlatTables};
