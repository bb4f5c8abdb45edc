use std::{collections::BTreeMap, fs::File, io::Read};
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use usp_weakness::bench::diff_results;

/// Per-size difference (right - left) between two `usp bench --json` files.
#[derive(Parser)]
#[command(name = "diff-bench")]
struct Cli {
    left: String,
    right: String,
}

// Treats empty files as empty maps, but treats non-existent files as Errors.
fn read_json_file_or_empty_map(path: &str) -> Result<BTreeMap<String, f64>> {
    let mut file = File::open(path).wrap_err_with(|| format!("Opening {}", path))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    let map = if contents.trim().is_empty() {
        BTreeMap::new()
    } else {
        serde_json::from_str(&contents).wrap_err_with(|| format!("JSON error in {}", path))?
    };
    Ok(map)
}

pub fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let left_results = read_json_file_or_empty_map(&cli.left)?;
    let right_results = read_json_file_or_empty_map(&cli.right)?;
    let diff = diff_results(&left_results, &right_results);
    println!("{}", serde_json::to_string_pretty(&diff)?);
    Ok(())
}
