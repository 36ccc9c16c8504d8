use std::env;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::Result;
use getopts::Options;
use tempfile::TempDir;
use tracing::info;
use tracing_subscriber::EnvFilter;

use msigdb_flat::chip::{self, ChipEntry};
use msigdb_flat::config::{BuildConfig, SpeciesBuildConfig};
use msigdb_flat::db::snapshot::{self, SnapshotScope};
use msigdb_flat::flat::FlatTableBuild;
use msigdb_flat::store;
use msigdb_flat::types::Species;

const PKG_NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

fn read_chip(config: &SpeciesBuildConfig) -> Result<Vec<ChipEntry>> {
    if let Some(chip_path) = &config.chip_path {
        return Ok(chip::parse_chip(chip_path)?);
    }

    let url = match &config.chip_url {
        Some(chip_url) => chip_url.clone(),
        None => snapshot::chip_url(&config.version_name)?,
    };

    let client = snapshot::http_client()?;
    // the TempDir removes the downloaded chip file when it goes out of scope
    let (_temp_dir, chip_path): (TempDir, PathBuf) =
        snapshot::fetch_to_temp(&client, &url)?;

    Ok(chip::parse_chip(&chip_path)?)
}

fn build_species(output_dir: &Path, config: &SpeciesBuildConfig) -> Result<()> {
    info!("building flattened tables for version {}", config.version_name);

    let scope =
        if let Some(snapshot_path) = &config.snapshot_path {
            SnapshotScope::open_local(snapshot_path)?
        } else if let Some(snapshot_url) = &config.snapshot_url {
            SnapshotScope::fetch_url(snapshot_url)?
        } else {
            SnapshotScope::fetch(&config.version_name)?
        };

    info!("reading snapshot {}", scope.path().display());

    // load_raw() consumes the scope: the snapshot connection and any
    // downloaded temp files are gone before the build starts
    let raw = scope.load_raw()?;
    let chip = read_chip(config)?;

    let tables = FlatTableBuild::new(&raw, &chip).build()?;
    let build_info = store::write_flat_tables(output_dir, &tables,
                                              &raw.db_info)?;

    info!("finished {}: {} gene sets, {} membership rows",
          build_info.db_version, build_info.detail_count,
          build_info.member_count);

    Ok(())
}

fn main() -> Result<()> {
    println!("{} v{}", PKG_NAME, VERSION);

    let args: Vec<String> = env::args().collect();
    let mut opts = Options::new();

    opts.optflag("h", "help", "print this help message");
    opts.optopt("c", "config-file",
                "JSON build configuration file",
                "CONFIG");
    opts.optopt("s", "species",
                "only build this species (HS or MM)",
                "CODE");
    opts.optopt("o", "output-dir",
                "write the flattened tables here instead of the configured directory",
                "DIR");
    opts.optopt("", "sqlite-path",
                "read a local snapshot database instead of downloading (needs -s)",
                "DB_FILE");
    opts.optopt("", "chip-file",
                "read a local chip annotation file instead of downloading (needs -s)",
                "CHIP_FILE");
    opts.optopt("", "version",
                "override the configured snapshot version name (needs -s)",
                "VERSION_NAME");

    let program = args[0].clone();

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => {
            print_usage(&program, &opts);
            println!("\nerror: {}", e);
            process::exit(0);
        }
    };

    if matches.opt_present("help") {
        print_usage(&program, &opts);
        process::exit(0);
    }

    if !matches.opt_present("config-file") {
        println!("no -c|--config-file option");
        print_usage(&program, &opts);
        process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("msigdb_flat=info,msigdb_flat_build=info"))
                .unwrap(),
        )
        .init();

    let config_file_name = matches.opt_str("c").unwrap();
    let only_species = matches.opt_str("s");

    let mut config = BuildConfig::read(&config_file_name)?;

    if let Some(output_dir) = matches.opt_str("output-dir") {
        config.output_dir = PathBuf::from(output_dir);
    }

    let sqlite_path = matches.opt_str("sqlite-path");
    let chip_file = matches.opt_str("chip-file");
    let version_name = matches.opt_str("version");

    if sqlite_path.is_some() || chip_file.is_some() || version_name.is_some() {
        let mut selected: Vec<_> = config.species.iter_mut()
            .filter(|(species_code, _)| {
                match &only_species {
                    Some(only_species) =>
                        species_code.eq_ignore_ascii_case(only_species),
                    None => true,
                }
            })
            .collect();

        if selected.len() != 1 {
            println!("--sqlite-path, --chip-file and --version apply to one species, use the -s option to pick it");
            process::exit(1);
        }

        let (species_code, species_config) = selected.remove(0);

        if let Some(version_name) = version_name {
            let species = Species::from_version_name(&version_name)?;
            if species.code() != species_code.as_str() {
                println!("version name {} doesn't match species {}",
                         version_name, species_code);
                process::exit(1);
            }
            species_config.version_name = version_name;
        }

        if let Some(sqlite_path) = sqlite_path {
            species_config.snapshot_path = Some(PathBuf::from(sqlite_path));
        }

        if let Some(chip_file) = chip_file {
            species_config.chip_path = Some(PathBuf::from(chip_file));
        }
    }

    let mut built_count = 0;

    for (species_code, species_config) in &config.species {
        if let Some(only_species) = &only_species {
            if !species_code.eq_ignore_ascii_case(only_species) {
                continue;
            }
        }

        build_species(&config.output_dir, species_config)?;
        built_count += 1;
    }

    if built_count == 0 {
        println!("nothing to build, no species in {} matches the -s option",
                 config_file_name);
        process::exit(1);
    }

    Ok(())
}
