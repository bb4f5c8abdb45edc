use std::{io::Read, path::PathBuf};
use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;
use usp_weakness::bench::Bench;
use usp_weakness::cnf::encode;
use usp_weakness::core::Usp;
use usp_weakness::debug::{DbgObserver, Sample};
use usp_weakness::generator::UspGenerator;
use usp_weakness::method::{run, Method};

#[derive(Parser)]
#[command(name = "usp")]
#[command(about = "Decide whether a uniquely solvable puzzle is weak or strong")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Where the puzzle comes from: a file (or - for stdin), or else a random
/// n x k puzzle.
#[derive(clap::Args)]
struct PuzzleSource {
    /// Puzzle file, one row per line; - reads stdin
    file: Option<PathBuf>,
    /// Rows of the random puzzle
    #[arg(long, default_value = "5")]
    n: usize,
    /// Columns of the random puzzle
    #[arg(long, default_value = "5")]
    k: usize,
    /// Seed for the random puzzle
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify one puzzle.
    Solve {
        #[command(flatten)]
        source: PuzzleSource,
        #[arg(long, value_enum, default_value = "backtrack")]
        method: Method,
        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
        /// Log every Nth search node
        #[arg(long)]
        sample_every: Option<usize>,
        /// Write search statistics (JSON) here when done
        #[arg(long)]
        stats: Option<String>,
    },

    /// Check the backtracking and DPLL solvers against brute force on random puzzles.
    Verify {
        #[arg(short, long, default_value = "100")]
        trials: usize,
        #[arg(long, default_value = "5")]
        n: usize,
        #[arg(long, default_value = "5")]
        k: usize,
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Time the solver on random puzzles of growing size.
    Bench {
        #[arg(long, default_value = "8")]
        max_n: usize,
        /// Column counts (comma-separated)
        #[arg(long, value_delimiter = ',', default_value = "10,15")]
        widths: Vec<usize>,
        #[arg(short, long, default_value = "20")]
        trials: usize,
        #[arg(long, value_enum, default_value = "backtrack")]
        method: Method,
        #[arg(long, default_value = "runtime.csv")]
        csv: String,
        #[arg(long)]
        json: Option<String>,
    },

    /// Print the DIMACS encoding of a puzzle.
    Cnf {
        #[command(flatten)]
        source: PuzzleSource,
    },
}

fn load_puzzle(source: &PuzzleSource) -> Result<Usp> {
    match &source.file {
        Some(path) if path.as_os_str() == "-" => {
            let mut contents = String::new();
            std::io::stdin().read_to_string(&mut contents)?;
            Ok(Usp::parse(&contents)?)
        },
        Some(path) => Ok(Usp::parse(&std::fs::read_to_string(path)?)?),
        None => {
            let mut generator = match source.seed {
                Some(seed) => UspGenerator::seeded(seed),
                None => UspGenerator::new(),
            };
            Ok(generator.random_puzzle(source.n, source.k))
        },
    }
}

fn solve(source: PuzzleSource, method: Method, json: bool, sample_every: Option<usize>, stats: Option<String>) -> Result<()> {
    let puzzle = load_puzzle(&source)?;
    info!(n = puzzle.rows(), k = puzzle.cols(), "Loaded puzzle:\n{}", puzzle);
    let outcome = if sample_every.is_some() || stats.is_some() {
        let mut observer = DbgObserver::new();
        observer.sample_log(sample_every.map(Sample::every_n).unwrap_or_else(Sample::at_end));
        if let Some(filename) = &stats {
            observer.sample_stats(filename.clone(), Sample::at_end());
        }
        if method == Method::Brute {
            info!("Brute force visits no search nodes; nothing will be sampled");
        }
        run(&puzzle, method, Some(&mut observer))?
    } else {
        run(&puzzle, method, None)?
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome);
    }
    Ok(())
}

fn verify_many(trials: usize, n: usize, k: usize, seed: Option<u64>) -> Result<()> {
    let mut generator = match seed {
        Some(seed) => UspGenerator::seeded(seed),
        None => UspGenerator::new(),
    };
    let mut weak = 0;
    for trial in 0..trials {
        let puzzle = generator.random_puzzle(n, k);
        if run(&puzzle, Method::Both, None)?.is_weak() {
            weak += 1;
        }
        if (trial + 1) % 10 == 0 {
            info!(trial = trial + 1, weak, "Progress");
        }
    }
    println!("{} puzzles checked ({} weak, {} strong); no disagreements", trials, weak, trials - weak);
    Ok(())
}

fn bench(max_n: usize, widths: Vec<usize>, trials: usize, method: Method, csv: String, json: Option<String>) -> Result<()> {
    let mut bench = Bench::new();
    for n in 1..=max_n {
        for k in widths.iter().copied() {
            bench.try_run_size(n, k, trials, |puzzle| run(puzzle, method, None))?;
        }
    }
    bench.write_csv(&csv)?;
    info!("Wrote {}", csv);
    if let Some(filename) = json {
        bench.save_json(&filename)?;
        info!("Wrote {}", filename);
    }
    print!("{}", bench.to_csv());
    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match cli.command {
        Commands::Solve { source, method, json, sample_every, stats } => {
            solve(source, method, json, sample_every, stats)
        },
        Commands::Verify { trials, n, k, seed } => verify_many(trials, n, k, seed),
        Commands::Bench { max_n, widths, trials, method, csv, json } => {
            bench(max_n, widths, trials, method, csv, json)
        },
        Commands::Cnf { source } => {
            let puzzle = load_puzzle(&source)?;
            print!("{}", encode(&puzzle).to_dimacs());
            Ok(())
        },
    }
}
