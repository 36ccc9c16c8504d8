use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::types::Species;

// the inputs for one species.  the snapshot and the chip file can each be
// a local path or an explicit URL, when both are absent the standard
// download URL for the version is used
#[derive(Deserialize, Clone, Debug)]
pub struct SpeciesBuildConfig {
    pub version_name: String,
    #[serde(default)]
    pub snapshot_url: Option<String>,
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
    #[serde(default)]
    pub chip_url: Option<String>,
    #[serde(default)]
    pub chip_path: Option<PathBuf>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct BuildConfig {
    pub output_dir: PathBuf,
    pub species: BTreeMap<String, SpeciesBuildConfig>,
}

impl BuildConfig {
    pub fn read(config_file_name: &str) -> Result<BuildConfig> {
        let file = File::open(config_file_name)
            .with_context(|| format!("failed to read {}", config_file_name))?;
        let reader = BufReader::new(file);

        let config: BuildConfig = serde_json::from_reader(reader)
            .with_context(|| format!("failed to parse {}", config_file_name))?;

        for (species_code, species_config) in &config.species {
            let species = Species::from_code(species_code)
                .with_context(|| format!("bad species key \"{}\" in {}",
                                         species_code, config_file_name))?;
            let version_species =
                Species::from_version_name(&species_config.version_name)
                .with_context(|| format!("bad version name \"{}\" in {}",
                                         species_config.version_name,
                                         config_file_name))?;

            if species != version_species {
                bail!("version name \"{}\" doesn't match the species key \"{}\" \
                       in {}",
                      species_config.version_name, species_code,
                      config_file_name);
            }
        }

        Ok(config)
    }
}
