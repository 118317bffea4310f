use crate::error::KMeansError;

/// Configuration for Lloyd's k-means
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    /// Number of clusters
    pub k: usize,

    /// Maximum number of Lloyd iterations. Reaching it is not an error.
    pub max_iters: usize,

    /// Convergence tolerance. The loop stops once every centroid moved by strictly less
    /// than this Euclidean distance in one iteration. A negative value disables early stopping.
    pub tol: f64,

    /// Seed for the initial centroid permutation
    pub seed: u64,

    /// Report per-iteration progress at `info` level instead of `debug`
    pub verbose: bool,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 5,
            max_iters: 1000,
            tol: 1e-8,
            seed: 0,
            verbose: false,
        }
    }
}

impl KMeansConfig {
    /// Create a new configuration with the specified number of clusters
    pub fn new(k: usize) -> Self {
        Self {
            k,
            ..Default::default()
        }
    }

    /// Set the maximum number of iterations
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Set the convergence tolerance
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set the random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set verbose mode
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check this configuration against a dataset shape before any work is done.
    pub fn validate(&self, n_samples: usize, n_features: usize) -> Result<(), KMeansError> {
        validate_configuration(self.k, n_samples, n_features)
    }
}

pub(crate) fn validate_configuration(
    k: usize,
    n_samples: usize,
    n_features: usize,
) -> Result<(), KMeansError> {
    if n_samples == 0 {
        return Err(KMeansError::InvalidConfiguration(
            "dataset is empty".to_string(),
        ));
    }

    if n_features == 0 {
        return Err(KMeansError::InvalidConfiguration(
            "dataset has no features".to_string(),
        ));
    }

    if k == 0 {
        return Err(KMeansError::InvalidConfiguration(
            "k must be greater than 0".to_string(),
        ));
    }

    if k > n_samples {
        return Err(KMeansError::InvalidConfiguration(format!(
            "k ({}) cannot exceed the number of samples ({})",
            k, n_samples
        )));
    }

    Ok(())
}
