pub mod db;
pub mod chip;
pub mod flat;
pub mod store;
pub mod config;
pub mod types;
pub mod constants;
pub mod error;
pub mod utils;
