//! Cluster the rows of a `.npy` matrix with Lloyd's k-means.
//!
//! Usage: `lloyd-kmeans -i <input.npy> [-k <num_clusters>] [-s <seed>]`
//!
//! Prints the initial centroids chosen for the seed and the final loss. Final centroids
//! and labels can optionally be written back out as `.npy` files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lloyd_kmeans::io::{load_npy, save_centroids, save_labels};
use lloyd_kmeans::{initialize, KMeansConfig, Lloyd};
use ndarray::ArrayView2;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Lloyd's k-means over a NumPy matrix
#[derive(Parser, Debug)]
#[command(name = "lloyd-kmeans")]
#[command(version)]
#[command(about = "Cluster the rows of a .npy matrix with Lloyd's k-means")]
struct Args {
    /// Input .npy file holding an (n, d) float32 or float64 matrix
    #[arg(short, long)]
    input: PathBuf,

    /// Number of clusters
    #[arg(short, default_value_t = 5)]
    k: usize,

    /// Seed for the initial centroid permutation
    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Maximum number of Lloyd iterations
    #[arg(long, default_value_t = 1000)]
    max_iters: usize,

    /// Stop once every centroid moves less than this distance (negative disables)
    #[arg(long, default_value_t = 1e-8, allow_negative_numbers = true)]
    tol: f64,

    /// Write the final centroids to this .npy file
    #[arg(long)]
    centroids_out: Option<PathBuf>,

    /// Write the final labels to this .npy file
    #[arg(long)]
    labels_out: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match args.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    let data = load_npy(&args.input)
        .with_context(|| format!("Could not load {}", args.input.display()))?;
    println!("Loaded {} rows with {} columns.", data.nrows(), data.ncols());

    let config = KMeansConfig::new(args.k)
        .with_seed(args.seed)
        .with_max_iters(args.max_iters)
        .with_tol(args.tol)
        .with_verbose(args.verbose > 0);
    config.validate(data.nrows(), data.ncols())?;

    let centroids = initialize(config.seed, config.k, &data.view())?;
    println!("Initial centroids selected with seed {}:", config.seed);
    println!("Selected {} initial centroids:", centroids.nrows());
    print_rows(&centroids.view());

    let result = Lloyd::new(data.view(), centroids, config.max_iters, config.tol)?
        .with_verbose(config.verbose)
        .finish();

    println!("Final loss: {}", result.objective);
    println!(
        "Stopped after {} iterations ({}).",
        result.n_iterations, result.state
    );

    if let Some(path) = &args.centroids_out {
        save_centroids(path, &result.centroids.view())?;
        info!(path = %path.display(), "Saved centroids");
    }

    if let Some(path) = &args.labels_out {
        save_labels(path, &result.labels.view())?;
        info!(path = %path.display(), "Saved labels");
    }

    Ok(())
}

fn print_rows(rows: &ArrayView2<f32>) {
    for row in rows.outer_iter() {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        println!("{}", line.join(" "));
    }
}
