//! Basic example demonstrating lloyd-kmeans usage
//!
//! Run with: cargo run --example basic --release

use lloyd_kmeans::{KMeans, KMeansConfig};
use ndarray::Array2;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;

fn main() {
    println!("=== lloyd-kmeans example ===\n");

    // Generate synthetic data: 3 clusters in 2D for easy visualization
    let n_samples = 300;
    let n_features = 2;
    let n_clusters = 3;

    println!("Generating {} samples with {} features...", n_samples, n_features);

    let centers = [[-5.0f32, -5.0], [0.0, 5.0], [5.0, -5.0]];
    let noise = Array2::random((n_samples, n_features), Uniform::new(-1.0f32, 1.0));

    let mut data = Array2::<f32>::zeros((n_samples, n_features));
    for i in 0..n_samples {
        let center = centers[i % n_clusters];
        data[[i, 0]] = center[0] + noise[[i, 0]];
        data[[i, 1]] = center[1] + noise[[i, 1]];
    }

    println!("True cluster centers:");
    for (i, center) in centers.iter().enumerate() {
        println!("  Cluster {}: ({:.2}, {:.2})", i, center[0], center[1]);
    }
    println!();

    let config = KMeansConfig::new(n_clusters)
        .with_max_iters(100)
        .with_tol(1e-6)
        .with_seed(42);

    println!("Running k-means with k={}...\n", n_clusters);

    let mut kmeans = KMeans::with_config(config);
    let labels = kmeans.fit_predict(&data.view()).expect("Training failed");

    println!(
        "Stopped after {} iterations ({}), inertia = {:.4}",
        kmeans.n_iterations().unwrap_or(0),
        kmeans.state().map(|s| s.to_string()).unwrap_or_default(),
        kmeans.inertia().unwrap_or(0.0)
    );

    println!("\nLearned centroids:");
    let centroids = kmeans.centroids().expect("Model is fitted");
    for (i, centroid) in centroids.outer_iter().enumerate() {
        println!("  Centroid {}: ({:.4}, {:.4})", i, centroid[0], centroid[1]);
    }
    println!();

    let mut cluster_counts = vec![0usize; n_clusters];
    for &label in labels.iter() {
        cluster_counts[label] += 1;
    }

    println!("Cluster distribution:");
    for (i, count) in cluster_counts.iter().enumerate() {
        println!(
            "  Cluster {}: {} samples ({:.1}%)",
            i,
            count,
            (*count as f64 / n_samples as f64) * 100.0
        );
    }

    println!("\nFirst 10 sample assignments:");
    for i in 0..10 {
        println!(
            "  Sample {} at ({:.2}, {:.2}) -> Cluster {}",
            i,
            data[[i, 0]],
            data[[i, 1]],
            labels[i]
        );
    }

    println!("\n=== Done! ===");
}
