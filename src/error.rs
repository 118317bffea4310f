use thiserror::Error;

/// Error types for the lloyd-kmeans library
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KMeansError {
    /// The requested clustering cannot be set up (k == 0, k > n, empty data)
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Row width (or label count) disagrees with the established dimensionality
    #[error("Dimension mismatch: expected {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// A caller-supplied label does not index any centroid
    #[error("Label {label} at index {index} is out of range for {k} centroids")]
    InvalidLabel { index: usize, label: usize, k: usize },

    /// Model has not been fitted yet
    #[error("Model has not been fitted. Call train() or fit() first.")]
    NotFitted,
}
