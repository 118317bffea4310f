use crate::config::{validate_configuration, KMeansConfig};
use crate::distance::{centroid_shifts, check_dimensions, squared_distance};
use crate::error::KMeansError;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::fmt;
use std::time::Instant;
use tracing::{debug, info};

/// Number of rows each worker reduces before partial results are merged.
///
/// Partials are always merged in chunk order, so sums do not depend on the thread count.
pub const UPDATE_CHUNK_SIZE: usize = 4096;

/// Where the convergence loop stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LloydState {
    /// More iterations may follow
    Iterating,
    /// Every centroid moved by less than `tol` in the last iteration
    Converged,
    /// `max_iters` iterations ran without converging
    Exhausted,
}

impl fmt::Display for LloydState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LloydState::Iterating => "iterating",
            LloydState::Converged => "converged",
            LloydState::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

/// Snapshot of one Lloyd iteration
#[derive(Debug, Clone)]
pub struct LloydStep {
    /// 1-based iteration number
    pub iteration: usize,
    /// Labels computed against the centroids current at the start of this iteration
    pub labels: Array1<usize>,
    /// Centroids produced by this iteration's update
    pub centroids: Array2<f32>,
    /// Largest per-centroid displacement in this iteration
    pub max_shift: f64,
    /// Objective of `labels` against `centroids`
    pub objective: f64,
    /// State after this iteration
    pub state: LloydState,
}

/// Result of the k-means algorithm
#[derive(Debug, Clone)]
pub struct LloydResult {
    pub centroids: Array2<f32>,
    pub labels: Array1<usize>,
    pub objective: f64,
    pub n_iterations: usize,
    pub state: LloydState,
}

/// Permutation of `0..n` drawn from a ChaCha8 generator seeded with `seed`.
///
/// This is the only source of randomness in the crate. The same `(n, seed)` always
/// yields the same permutation.
pub fn shuffle(n: usize, seed: u64) -> Vec<usize> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);
    indices
}

/// Pick `k` distinct rows of `data` as starting centroids.
///
/// Rows are copied in the order of the first `k` entries of [`shuffle`].
pub fn initialize(
    seed: u64,
    k: usize,
    data: &ArrayView2<f32>,
) -> Result<Array2<f32>, KMeansError> {
    validate_configuration(k, data.nrows(), data.ncols())?;

    let permutation = shuffle(data.nrows(), seed);

    let mut centroids = Array2::zeros((k, data.ncols()));
    for (centroid_idx, &data_idx) in permutation[..k].iter().enumerate() {
        centroids.row_mut(centroid_idx).assign(&data.row(data_idx));
    }

    Ok(centroids)
}

/// Label every row of `data` with the index of its nearest centroid.
///
/// Ties go to the lowest centroid index.
pub fn assign(
    data: &ArrayView2<f32>,
    centroids: &ArrayView2<f32>,
) -> Result<Array1<usize>, KMeansError> {
    check_dimensions(data.ncols(), centroids.ncols())?;
    if centroids.nrows() == 0 {
        return Err(KMeansError::InvalidConfiguration(
            "centroid set is empty".to_string(),
        ));
    }

    Ok(assign_unchecked(data, centroids))
}

/// Recompute each centroid as the mean of the rows labelled with it.
///
/// A centroid with no rows keeps its `previous` value unchanged.
pub fn update(
    data: &ArrayView2<f32>,
    labels: &ArrayView1<usize>,
    previous: &ArrayView2<f32>,
) -> Result<Array2<f32>, KMeansError> {
    check_dimensions(data.ncols(), previous.ncols())?;
    check_labels(data, labels, previous.nrows())?;

    Ok(update_unchecked(data, labels, previous))
}

/// Sum of squared distances from each row to the centroid its label designates
pub fn objective(
    data: &ArrayView2<f32>,
    labels: &ArrayView1<usize>,
    centroids: &ArrayView2<f32>,
) -> Result<f64, KMeansError> {
    check_dimensions(data.ncols(), centroids.ncols())?;
    check_labels(data, labels, centroids.nrows())?;

    Ok(objective_unchecked(data, labels, centroids))
}

/// Run Lloyd's algorithm from `initial_centroids` until convergence or `max_iters`.
pub fn run(
    data: &ArrayView2<f32>,
    initial_centroids: Array2<f32>,
    max_iters: usize,
    tol: f64,
) -> Result<LloydResult, KMeansError> {
    Ok(Lloyd::new(data.view(), initial_centroids, max_iters, tol)?.finish())
}

/// Initialize from `config.seed` and run to completion
pub fn kmeans_lloyd(
    data: &ArrayView2<f32>,
    config: &KMeansConfig,
) -> Result<LloydResult, KMeansError> {
    config.validate(data.nrows(), data.ncols())?;

    if config.verbose {
        info!(
            n_samples = data.nrows(),
            n_features = data.ncols(),
            k = config.k,
            seed = config.seed,
            "Training k-means"
        );
    }

    let centroids = initialize(config.seed, config.k, data)?;
    let lloyd = Lloyd::new(data.view(), centroids, config.max_iters, config.tol)?
        .with_verbose(config.verbose);

    Ok(lloyd.finish())
}

/// Lloyd's algorithm as an iterator of per-iteration snapshots.
///
/// Each call to `next` performs one assignment and one update. The iterator is exhausted
/// once the state leaves [`LloydState::Iterating`].
///
/// ```
/// use lloyd_kmeans::{Lloyd, LloydState};
/// use ndarray::array;
///
/// let data = array![[0.0f32, 0.0], [0.0, 1.0], [10.0, 0.0], [10.0, 1.0]];
/// let initial = array![[0.0f32, 0.0], [10.0, 0.0]];
///
/// let mut lloyd = Lloyd::new(data.view(), initial, 100, 1e-6).unwrap();
/// let steps: Vec<_> = lloyd.by_ref().collect();
/// assert_eq!(steps.last().unwrap().state, LloydState::Converged);
///
/// let result = lloyd.finish();
/// assert_eq!(result.labels.to_vec(), vec![0, 0, 1, 1]);
/// ```
pub struct Lloyd<'a> {
    data: ArrayView2<'a, f32>,
    centroids: Array2<f32>,
    max_iters: usize,
    tol: f64,
    iteration: usize,
    state: LloydState,
    verbose: bool,
}

impl<'a> Lloyd<'a> {
    /// Validate the inputs and enter the `Iterating` state.
    ///
    /// With `max_iters == 0` the loop starts out `Exhausted`.
    pub fn new(
        data: ArrayView2<'a, f32>,
        initial_centroids: Array2<f32>,
        max_iters: usize,
        tol: f64,
    ) -> Result<Self, KMeansError> {
        validate_configuration(initial_centroids.nrows(), data.nrows(), data.ncols())?;
        check_dimensions(data.ncols(), initial_centroids.ncols())?;

        let state = if max_iters == 0 {
            LloydState::Exhausted
        } else {
            LloydState::Iterating
        };

        Ok(Self {
            data,
            centroids: initial_centroids,
            max_iters,
            tol,
            iteration: 0,
            state,
            verbose: false,
        })
    }

    /// Emit per-iteration progress at `info` level
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn state(&self) -> LloydState {
        self.state
    }

    /// Number of iterations completed so far
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn centroids(&self) -> ArrayView2<'_, f32> {
        self.centroids.view()
    }

    /// Drive the loop to a terminal state, then run the final assignment and objective.
    pub fn finish(mut self) -> LloydResult {
        for _ in self.by_ref() {}

        let labels = assign_unchecked(&self.data, &self.centroids.view());
        let objective = objective_unchecked(&self.data, &labels.view(), &self.centroids.view());

        LloydResult {
            centroids: self.centroids,
            labels,
            objective,
            n_iterations: self.iteration,
            state: self.state,
        }
    }
}

impl Iterator for Lloyd<'_> {
    type Item = LloydStep;

    fn next(&mut self) -> Option<LloydStep> {
        if self.state != LloydState::Iterating {
            return None;
        }

        let iter_start = Instant::now();
        self.iteration += 1;

        let labels = assign_unchecked(&self.data, &self.centroids.view());
        let candidate = update_unchecked(&self.data, &labels.view(), &self.centroids.view());

        // The candidate is adopted whether or not the loop converged
        let previous = std::mem::replace(&mut self.centroids, candidate);

        let shifts = centroid_shifts(&previous.view(), &self.centroids.view());
        let converged = shifts.iter().all(|&shift| shift < self.tol);
        let max_shift = shifts.iter().copied().fold(0.0, f64::max);

        let objective = objective_unchecked(&self.data, &labels.view(), &self.centroids.view());

        self.state = if converged {
            LloydState::Converged
        } else if self.iteration >= self.max_iters {
            LloydState::Exhausted
        } else {
            LloydState::Iterating
        };

        let elapsed = iter_start.elapsed().as_secs_f64();
        if self.verbose {
            info!(
                iteration = self.iteration,
                max_iters = self.max_iters,
                max_shift,
                objective,
                elapsed,
                "Lloyd iteration"
            );
        } else {
            debug!(
                iteration = self.iteration,
                max_iters = self.max_iters,
                max_shift,
                objective,
                elapsed,
                "Lloyd iteration"
            );
        }

        match self.state {
            LloydState::Converged => info!(
                iterations = self.iteration,
                max_shift,
                tol = self.tol,
                "Converged"
            ),
            LloydState::Exhausted => info!(
                iterations = self.iteration,
                max_shift,
                tol = self.tol,
                "Reached max_iters without converging"
            ),
            LloydState::Iterating => {}
        }

        Some(LloydStep {
            iteration: self.iteration,
            labels,
            centroids: self.centroids.clone(),
            max_shift,
            objective,
            state: self.state,
        })
    }
}

fn check_labels(
    data: &ArrayView2<f32>,
    labels: &ArrayView1<usize>,
    k: usize,
) -> Result<(), KMeansError> {
    check_dimensions(data.nrows(), labels.len())?;

    match labels.iter().position(|&label| label >= k) {
        Some(index) => Err(KMeansError::InvalidLabel {
            index,
            label: labels[index],
            k,
        }),
        None => Ok(()),
    }
}

fn chunk_count(n_samples: usize) -> usize {
    n_samples.div_ceil(UPDATE_CHUNK_SIZE)
}

fn chunk_bounds(chunk_idx: usize, n_samples: usize) -> (usize, usize) {
    let start = chunk_idx * UPDATE_CHUNK_SIZE;
    (start, (start + UPDATE_CHUNK_SIZE).min(n_samples))
}

fn nearest_centroid(point: &ArrayView1<f32>, centroids: &ArrayView2<f32>) -> usize {
    let mut best_idx = 0;
    let mut best_dist = f32::INFINITY;

    for (idx, centroid) in centroids.outer_iter().enumerate() {
        let dist = squared_distance(point, &centroid);
        // Strict comparison keeps the first minimum
        if dist < best_dist {
            best_dist = dist;
            best_idx = idx;
        }
    }

    best_idx
}

fn assign_unchecked(data: &ArrayView2<f32>, centroids: &ArrayView2<f32>) -> Array1<usize> {
    let labels: Vec<usize> = (0..data.nrows())
        .into_par_iter()
        .map(|i| nearest_centroid(&data.row(i), centroids))
        .collect();

    Array1::from_vec(labels)
}

fn update_unchecked(
    data: &ArrayView2<f32>,
    labels: &ArrayView1<usize>,
    previous: &ArrayView2<f32>,
) -> Array2<f32> {
    let n_samples = data.nrows();
    let n_features = data.ncols();
    let k = previous.nrows();

    let partials: Vec<(Array2<f64>, Vec<usize>)> = (0..chunk_count(n_samples))
        .into_par_iter()
        .map(|chunk_idx| {
            let (start, end) = chunk_bounds(chunk_idx, n_samples);
            let mut sums = Array2::<f64>::zeros((k, n_features));
            let mut counts = vec![0usize; k];

            for i in start..end {
                let cluster_idx = labels[i];
                counts[cluster_idx] += 1;
                sums.row_mut(cluster_idx)
                    .zip_mut_with(&data.row(i), |sum, &x| *sum += x as f64);
            }

            (sums, counts)
        })
        .collect();

    let mut cluster_sums = Array2::<f64>::zeros((k, n_features));
    let mut cluster_counts = vec![0usize; k];
    for (sums, counts) in partials {
        cluster_sums += &sums;
        for (total, count) in cluster_counts.iter_mut().zip(counts) {
            *total += count;
        }
    }

    let mut centroids = previous.to_owned();
    for (cluster_idx, mut centroid) in centroids.outer_iter_mut().enumerate() {
        let count = cluster_counts[cluster_idx];
        if count == 0 {
            continue;
        }
        let count = count as f64;
        centroid.zip_mut_with(&cluster_sums.row(cluster_idx), |c, &sum| {
            *c = (sum / count) as f32
        });
    }

    centroids
}

fn objective_unchecked(
    data: &ArrayView2<f32>,
    labels: &ArrayView1<usize>,
    centroids: &ArrayView2<f32>,
) -> f64 {
    let n_samples = data.nrows();

    let partials: Vec<f64> = (0..chunk_count(n_samples))
        .into_par_iter()
        .map(|chunk_idx| {
            let (start, end) = chunk_bounds(chunk_idx, n_samples);
            (start..end)
                .map(|i| squared_distance(&data.row(i), &centroids.row(labels[i])) as f64)
                .sum::<f64>()
        })
        .collect();

    partials.iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use std::collections::HashSet;

    fn seeded_data(n: usize, d: usize, seed: u64) -> Array2<f32> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Array2::random_using((n, d), Uniform::new(-1.0f32, 1.0), &mut rng)
    }

    fn square_data() -> Array2<f32> {
        array![[0.0f32, 0.0], [0.0, 1.0], [10.0, 0.0], [10.0, 1.0]]
    }

    #[test]
    fn test_shuffle_is_a_deterministic_permutation() {
        let first = shuffle(50, 7);
        let second = shuffle(50, 7);
        assert_eq!(first, second);

        let mut sorted = first.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());

        assert_ne!(shuffle(50, 7), shuffle(50, 8));
    }

    #[test]
    fn test_initialize_centroids() {
        let data = seeded_data(100, 8, 1);

        let centroids = initialize(42, 5, &data.view()).unwrap();

        assert_eq!(centroids.nrows(), 5);
        assert_eq!(centroids.ncols(), 8);

        let permutation = shuffle(100, 42);
        for (centroid_idx, &data_idx) in permutation[..5].iter().enumerate() {
            assert_eq!(centroids.row(centroid_idx), data.row(data_idx));
        }
    }

    #[test]
    fn test_initialize_k_equals_n_uses_every_row() {
        let data = seeded_data(12, 3, 2);
        let centroids = initialize(3, 12, &data.view()).unwrap();

        let mut used = HashSet::new();
        for centroid in centroids.outer_iter() {
            let idx = data
                .outer_iter()
                .position(|row| row == centroid)
                .expect("centroid must be a data row");
            used.insert(idx);
        }
        assert_eq!(used.len(), 12);
    }

    #[test]
    fn test_initialize_rejects_k_greater_than_n() {
        let data = seeded_data(4, 2, 3);
        assert!(matches!(
            initialize(0, 5, &data.view()),
            Err(KMeansError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            initialize(0, 0, &data.view()),
            Err(KMeansError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_assign_picks_nearest_and_breaks_ties_low() {
        let data = array![[0.0f32, 0.0], [10.0, 10.0], [5.0, 5.0]];
        let centroids = array![[0.0f32, 0.0], [10.0, 10.0]];

        let labels = assign(&data.view(), &centroids.view()).unwrap();

        // (5,5) is equidistant, the first centroid wins
        assert_eq!(labels.to_vec(), vec![0, 1, 0]);
    }

    #[test]
    fn test_assign_dimension_mismatch() {
        let data = array![[0.0f32, 0.0]];
        let centroids = array![[0.0f32, 0.0, 0.0]];

        assert_eq!(
            assign(&data.view(), &centroids.view()),
            Err(KMeansError::DimensionMismatch {
                expected: 2,
                found: 3
            })
        );
    }

    #[test]
    fn test_update_means_and_empty_cluster() {
        let data = square_data();
        let labels = array![0usize, 0, 1, 1];
        let previous = array![[0.0f32, 0.0], [10.0, 0.0], [-3.25, 7.5]];

        let centroids = update(&data.view(), &labels.view(), &previous.view()).unwrap();

        assert_eq!(centroids.row(0), array![0.0f32, 0.5]);
        assert_eq!(centroids.row(1), array![10.0f32, 0.5]);
        // Nobody picked centroid 2
        assert_eq!(centroids.row(2), previous.row(2));
        assert!(centroids.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_update_rejects_out_of_range_label() {
        let data = square_data();
        let labels = array![0usize, 2, 1, 1];
        let previous = array![[0.0f32, 0.0], [10.0, 0.0]];

        assert_eq!(
            update(&data.view(), &labels.view(), &previous.view()),
            Err(KMeansError::InvalidLabel {
                index: 1,
                label: 2,
                k: 2
            })
        );
    }

    #[test]
    fn test_update_rejects_wrong_label_count() {
        let data = square_data();
        let labels = array![0usize, 1];
        let previous = array![[0.0f32, 0.0], [10.0, 0.0]];

        assert!(matches!(
            update(&data.view(), &labels.view(), &previous.view()),
            Err(KMeansError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_update_spans_multiple_chunks() {
        let n = UPDATE_CHUNK_SIZE * 2 + 17;
        let data = Array2::from_shape_fn((n, 2), |(i, j)| (i % 7) as f32 + j as f32);
        let labels = Array1::zeros(n);
        let previous = array![[0.0f32, 0.0]];

        let centroids = update(&data.view(), &labels.view(), &previous.view()).unwrap();
        let expected = data.mapv(|x| x as f64).mean_axis(ndarray::Axis(0)).unwrap();

        assert_abs_diff_eq!(centroids[[0, 0]] as f64, expected[0], epsilon = 1e-5);
        assert_abs_diff_eq!(centroids[[0, 1]] as f64, expected[1], epsilon = 1e-5);
    }

    #[test]
    fn test_objective() {
        let data = square_data();
        let labels = array![0usize, 0, 1, 1];
        let centroids = array![[0.0f32, 0.5], [10.0, 0.5]];

        let value = objective(&data.view(), &labels.view(), &centroids.view()).unwrap();
        assert_abs_diff_eq!(value, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_run_square_scenario() {
        let data = square_data();
        let initial = array![[0.0f32, 0.0], [10.0, 0.0]];

        let result = run(&data.view(), initial, 100, 1e-6).unwrap();

        assert_eq!(result.state, LloydState::Converged);
        assert_eq!(result.n_iterations, 2);
        assert_eq!(result.labels.to_vec(), vec![0, 0, 1, 1]);
        assert_eq!(result.centroids, array![[0.0f32, 0.5], [10.0, 0.5]]);
        assert_abs_diff_eq!(result.objective, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_run_zero_iterations_keeps_initial_centroids() {
        let data = square_data();
        let initial = array![[0.0f32, 0.0], [10.0, 0.0]];

        let result = run(&data.view(), initial.clone(), 0, 1e-6).unwrap();

        assert_eq!(result.state, LloydState::Exhausted);
        assert_eq!(result.n_iterations, 0);
        assert_eq!(result.centroids, initial);
        assert_eq!(result.labels.to_vec(), vec![0, 0, 1, 1]);
        assert_abs_diff_eq!(result.objective, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_lloyd_steps_report_state() {
        let data = seeded_data(200, 4, 5);
        let initial = initialize(9, 6, &data.view()).unwrap();

        let steps: Vec<LloydStep> = Lloyd::new(data.view(), initial, 3, -1.0)
            .unwrap()
            .collect();

        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].iteration, 1);
        assert_eq!(steps[1].state, LloydState::Iterating);
        assert_eq!(steps[2].state, LloydState::Exhausted);
        for step in &steps {
            assert_eq!(step.labels.len(), 200);
            assert_eq!(step.centroids.nrows(), 6);
        }
    }

    #[test]
    fn test_lloyd_step_centroids_are_adopted() {
        let data = seeded_data(300, 3, 10);
        let initial = initialize(4, 5, &data.view()).unwrap();

        let mut lloyd = Lloyd::new(data.view(), initial.clone(), 4, -1.0).unwrap();
        let mut previous = initial;
        while let Some(step) = lloyd.next() {
            assert_eq!(step.centroids, lloyd.centroids());

            let expected = update(&data.view(), &step.labels.view(), &previous.view()).unwrap();
            assert_eq!(step.centroids, expected);

            let shift = centroid_shifts(&previous.view(), &step.centroids.view())
                .iter()
                .copied()
                .fold(0.0, f64::max);
            assert_eq!(step.max_shift, shift);

            previous = step.centroids;
        }

        let result = lloyd.finish();
        assert_eq!(result.centroids, previous);
        assert_eq!(result.n_iterations, 4);
    }

    #[test]
    fn test_lloyd_rejects_bad_initial_centroids() {
        let data = square_data();

        assert!(matches!(
            Lloyd::new(data.view(), Array2::zeros((0, 2)), 10, 1e-6),
            Err(KMeansError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Lloyd::new(data.view(), Array2::zeros((5, 2)), 10, 1e-6),
            Err(KMeansError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Lloyd::new(data.view(), Array2::zeros((2, 3)), 10, 1e-6),
            Err(KMeansError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_kmeans_lloyd_basic() {
        let data = seeded_data(500, 16, 6);
        let config = KMeansConfig::new(5).with_max_iters(10).with_seed(42);

        let result = kmeans_lloyd(&data.view(), &config).unwrap();

        assert_eq!(result.centroids.nrows(), 5);
        assert_eq!(result.centroids.ncols(), 16);
        assert_eq!(result.labels.len(), 500);
        assert!(result.n_iterations <= 10);
        assert!(result.labels.iter().all(|&label| label < 5));
    }
}
