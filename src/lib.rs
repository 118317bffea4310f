//! # lloyd-kmeans
//!
//! Lloyd's k-means clustering in Rust, built on ndarray.
//!
//! ## Features
//!
//! - **Reproducible**: initial centroids come from a seeded ChaCha8 permutation of the
//!   data, and every reduction is merged in a fixed order, so a seed always gives the same
//!   centroids regardless of the thread count
//! - **Parallel computation**: Uses rayon for the assignment and update steps
//! - **Stable empty clusters**: a centroid that receives no points stays where it was
//! - **Step-by-step access**: [`Lloyd`] yields a snapshot per iteration; [`run`] drives it
//!   to completion
//!
//! ## Example
//!
//! ```rust
//! use lloyd_kmeans::{initialize, run, LloydState};
//! use ndarray::array;
//!
//! let data = array![[0.0f32, 0.0], [0.0, 1.0], [10.0, 0.0], [10.0, 1.0]];
//!
//! let centroids = initialize(0, 2, &data.view()).unwrap();
//! let result = run(&data.view(), centroids, 100, 1e-6).unwrap();
//!
//! assert_eq!(result.state, LloydState::Converged);
//! assert_eq!(result.labels.len(), 4);
//! ```
//!
//! ## Model Interface
//!
//! ```rust
//! use lloyd_kmeans::{KMeans, KMeansConfig};
//! use ndarray::Array2;
//! use ndarray_rand::RandomExt;
//! use ndarray_rand::rand_distr::Uniform;
//!
//! let data = Array2::random((5000, 64), Uniform::new(-1.0f32, 1.0));
//!
//! let config = KMeansConfig::new(50)
//!     .with_max_iters(100)
//!     .with_tol(1e-6)
//!     .with_seed(42);
//!
//! let mut kmeans = KMeans::with_config(config);
//! let labels = kmeans.fit_predict(&data.view()).unwrap();
//! assert_eq!(labels.len(), 5000);
//! ```

mod algorithm;
mod config;
mod distance;
mod error;
pub mod io;
mod kmeans;

pub use algorithm::{
    assign, initialize, kmeans_lloyd, objective, run, shuffle, update, Lloyd, LloydResult,
    LloydState, LloydStep, UPDATE_CHUNK_SIZE,
};
pub use config::KMeansConfig;
pub use distance::{euclidean_distance, squared_distance};
pub use error::KMeansError;
pub use kmeans::KMeans;
