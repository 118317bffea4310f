use crate::algorithm::{assign, kmeans_lloyd, LloydResult, LloydState};
use crate::config::KMeansConfig;
use crate::error::KMeansError;
use ndarray::{Array1, Array2, ArrayView2};

/// Lloyd's k-means model with a scikit-learn style interface.
///
/// Training seeds the centroids from [`KMeansConfig::seed`], iterates until every centroid
/// moves less than [`KMeansConfig::tol`] or [`KMeansConfig::max_iters`] is reached, and
/// keeps the final centroids, labels and inertia.
///
/// # Example
///
/// ```
/// use lloyd_kmeans::KMeans;
/// use ndarray::Array2;
/// use ndarray_rand::RandomExt;
/// use ndarray_rand::rand_distr::Uniform;
///
/// let data = Array2::random((1000, 16), Uniform::new(-1.0f32, 1.0));
///
/// let mut kmeans = KMeans::new(16, 10);
/// kmeans.train(&data.view()).unwrap();
///
/// let labels = kmeans.predict(&data.view()).unwrap();
/// assert_eq!(labels.len(), 1000);
/// ```
pub struct KMeans {
    /// Model configuration
    config: KMeansConfig,

    /// Number of features (dimensions)
    d: usize,

    /// Outcome of the last training run (None if not yet fitted)
    fitted: Option<LloydResult>,
}

impl KMeans {
    /// Create a new model with default configuration.
    ///
    /// # Arguments
    ///
    /// * `d` - Number of features (dimensions) in the data
    /// * `k` - Number of clusters
    ///
    /// # Panics
    ///
    /// Panics if `k` is 0.
    pub fn new(d: usize, k: usize) -> Self {
        assert!(k > 0, "k must be greater than 0");

        Self {
            config: KMeansConfig::new(k),
            d,
            fitted: None,
        }
    }

    /// Create a new model with custom configuration.
    ///
    /// # Panics
    ///
    /// Panics if `config.k` is 0.
    pub fn with_config(config: KMeansConfig) -> Self {
        assert!(config.k > 0, "k must be greater than 0");

        Self {
            d: 0, // Will be set on first train call
            config,
            fitted: None,
        }
    }

    /// Train the model on the given data.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The dataset is empty or has fewer samples than k
    /// - Data dimensions don't match (for subsequent calls)
    pub fn train(&mut self, data: &ArrayView2<f32>) -> Result<(), KMeansError> {
        let n_features = data.ncols();

        // d == 0 means no dimensionality is fixed yet
        if self.d != 0 && n_features != self.d {
            return Err(KMeansError::DimensionMismatch {
                expected: self.d,
                found: n_features,
            });
        }

        let result = kmeans_lloyd(data, &self.config)?;

        // Only a successful run fixes the dimensionality
        self.d = n_features;
        self.fitted = Some(result);
        Ok(())
    }

    /// Fit the model to the data. Equivalent to `train()`.
    ///
    /// Returns `&mut Self` for method chaining.
    pub fn fit(&mut self, data: &ArrayView2<f32>) -> Result<&mut Self, KMeansError> {
        self.train(data)?;
        Ok(self)
    }

    /// Predict cluster assignments for new data.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The model has not been fitted yet
    /// - Data dimensions don't match the training data
    pub fn predict(&self, data: &ArrayView2<f32>) -> Result<Array1<usize>, KMeansError> {
        let centroids = self.centroids().ok_or(KMeansError::NotFitted)?;

        if data.ncols() != self.d {
            return Err(KMeansError::DimensionMismatch {
                expected: self.d,
                found: data.ncols(),
            });
        }

        assign(data, &centroids.view())
    }

    /// Fit the model and return the training labels.
    pub fn fit_predict(&mut self, data: &ArrayView2<f32>) -> Result<Array1<usize>, KMeansError> {
        self.train(data)?;
        self.labels().cloned().ok_or(KMeansError::NotFitted)
    }

    /// Centroids of the fitted model, `None` before training.
    pub fn centroids(&self) -> Option<&Array2<f32>> {
        self.fitted.as_ref().map(|result| &result.centroids)
    }

    /// Labels of the training data from the final assignment.
    pub fn labels(&self) -> Option<&Array1<usize>> {
        self.fitted.as_ref().map(|result| &result.labels)
    }

    /// Sum of squared distances of the training data to their centroids.
    pub fn inertia(&self) -> Option<f64> {
        self.fitted.as_ref().map(|result| result.objective)
    }

    /// Number of Lloyd iterations the last training run performed.
    pub fn n_iterations(&self) -> Option<usize> {
        self.fitted.as_ref().map(|result| result.n_iterations)
    }

    /// Whether the last training run converged or hit `max_iters`.
    pub fn state(&self) -> Option<LloydState> {
        self.fitted.as_ref().map(|result| result.state)
    }

    /// Get the number of clusters.
    pub fn k(&self) -> usize {
        self.config.k
    }

    /// Get the number of features (dimensions).
    pub fn d(&self) -> usize {
        self.d
    }

    /// Get the configuration.
    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }
}
