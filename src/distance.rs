use crate::error::KMeansError;
use ndarray::{Array1, ArrayView1, ArrayView2};
use rayon::prelude::*;

/// Squared Euclidean distance between two points of equal dimensionality.
///
/// No square root is taken; the assignment and objective paths only compare or sum
/// squared distances.
///
/// # Panics
///
/// Panics if `a` and `b` have different lengths. Public operations check shapes with
/// [`check_dimensions`] before reaching this point.
#[inline]
pub fn squared_distance(a: &ArrayView1<f32>, b: &ArrayView1<f32>) -> f32 {
    assert_eq!(
        a.len(),
        b.len(),
        "points must have the same dimensionality"
    );

    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Euclidean distance (square root of [`squared_distance`]), widened to f64
#[inline]
pub fn euclidean_distance(a: &ArrayView1<f32>, b: &ArrayView1<f32>) -> f64 {
    (squared_distance(a, b) as f64).sqrt()
}

/// Fail with `DimensionMismatch` unless `found == expected`
#[inline]
pub fn check_dimensions(expected: usize, found: usize) -> Result<(), KMeansError> {
    if expected != found {
        return Err(KMeansError::DimensionMismatch { expected, found });
    }
    Ok(())
}

/// Per-centroid Euclidean displacement between two centroid sets of the same shape
pub fn centroid_shifts(
    old_centroids: &ArrayView2<f32>,
    new_centroids: &ArrayView2<f32>,
) -> Array1<f64> {
    let k = old_centroids.nrows();

    let shifts: Vec<f64> = (0..k)
        .into_par_iter()
        .map(|i| euclidean_distance(&old_centroids.row(i), &new_centroids.row(i)))
        .collect();

    Array1::from_vec(shifts)
}
