use clap::{Parser, Subcommand};
use geo_join::features::{distinct_ids, parse_collection};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "geo-join", about = "Inspect GeoJSON sources for the songlines viewer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that every feature carries the join-key property
    Validate {
        /// GeoJSON files to check
        files: Vec<PathBuf>,

        /// Property holding the join key
        #[arg(long, default_value = "ID")]
        id_property: String,
    },
    /// Print the deduplicated set of join keys across all files
    Ids {
        /// GeoJSON files to scan
        files: Vec<PathBuf>,

        /// Property holding the join key
        #[arg(long, default_value = "ID")]
        id_property: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { files, id_property } => validate(&files, &id_property),
        Commands::Ids { files, id_property } => ids(&files, &id_property),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn load(path: &PathBuf, id_property: &str) -> Result<Vec<geo_join::MapFeature>, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("{}: {e}", path.display()))?;
    parse_collection(&raw, id_property).map_err(|e| format!("{}: {e}", path.display()))
}

fn validate(files: &[PathBuf], id_property: &str) -> Result<(), String> {
    if files.is_empty() {
        return Err("no files given".to_string());
    }
    let mut missing_total = 0usize;
    for path in files {
        let features = load(path, id_property)?;
        let missing = features.iter().filter(|f| f.id.is_none()).count();
        let empty = features.iter().filter(|f| f.paths.is_empty()).count();
        println!(
            "{}: {} features, {} without {:?}, {} without line geometry",
            path.display(),
            features.len(),
            missing,
            id_property,
            empty
        );
        missing_total += missing;
    }
    if missing_total > 0 {
        Err(format!(
            "{missing_total} feature(s) have no usable {id_property:?} property"
        ))
    } else {
        Ok(())
    }
}

fn ids(files: &[PathBuf], id_property: &str) -> Result<(), String> {
    if files.is_empty() {
        return Err("no files given".to_string());
    }
    let mut all = Vec::new();
    for path in files {
        all.extend(load(path, id_property)?);
    }
    for id in distinct_ids(&all) {
        println!("{id}");
    }
    Ok(())
}
