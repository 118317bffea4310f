//! Reading datasets from and writing results to NumPy `.npy` files.
//!
//! Matrices stored as `<f4` are loaded as-is; `<f8` matrices are narrowed to `f32`.

use ndarray::{Array2, ArrayView1, ArrayView2};
use ndarray_npy::{read_npy, write_npy, ReadNpyError, WriteNpyError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised while moving arrays in and out of `.npy` files
#[derive(Error, Debug)]
pub enum NpyError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: ReadNpyError,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: WriteNpyError,
    },

    /// The file holds a matrix with no rows or no columns
    #[error("Matrix in {} is empty", .0.display())]
    Empty(PathBuf),
}

/// Load a 2-D floating point matrix from a `.npy` file.
pub fn load_npy<P: AsRef<Path>>(path: P) -> Result<Array2<f32>, NpyError> {
    let path = path.as_ref();
    let read_error = |source: ReadNpyError| NpyError::Read {
        path: path.to_path_buf(),
        source,
    };

    let data = match read_npy::<_, Array2<f32>>(path) {
        Ok(data) => data,
        Err(ReadNpyError::WrongDescriptor(_)) => {
            let wide: Array2<f64> = read_npy(path).map_err(read_error)?;
            debug!(path = %path.display(), "narrowing f64 matrix to f32");
            wide.mapv(|x| x as f32)
        }
        Err(source) => return Err(read_error(source)),
    };

    if data.nrows() == 0 || data.ncols() == 0 {
        return Err(NpyError::Empty(path.to_path_buf()));
    }

    debug!(
        path = %path.display(),
        rows = data.nrows(),
        cols = data.ncols(),
        "Loaded matrix"
    );
    Ok(data)
}

/// Write a centroid matrix as `<f4`.
pub fn save_centroids<P: AsRef<Path>>(
    path: P,
    centroids: &ArrayView2<f32>,
) -> Result<(), NpyError> {
    let path = path.as_ref();
    write_npy(path, centroids).map_err(|source| NpyError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Write labels as `<i8` (int64), the dtype NumPy uses for index arrays.
pub fn save_labels<P: AsRef<Path>>(
    path: P,
    labels: &ArrayView1<usize>,
) -> Result<(), NpyError> {
    let path = path.as_ref();
    let labels = labels.mapv(|label| label as i64);
    write_npy(path, &labels).map_err(|source| NpyError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    #[test]
    fn test_load_f32_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.npy");
        let data = array![[1.0f32, 2.0], [3.0, 4.0], [5.0, 6.0]];
        write_npy(&path, &data).unwrap();

        let loaded = load_npy(&path).unwrap();
        assert_eq!(loaded, data);
    }

    #[test]
    fn test_load_f64_matrix_is_narrowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.npy");
        let data = array![[0.5f64, -1.25], [10.0, 0.0]];
        write_npy(&path, &data).unwrap();

        let loaded = load_npy(&path).unwrap();
        assert_eq!(loaded, array![[0.5f32, -1.25], [10.0, 0.0]]);
    }

    #[test]
    fn test_load_empty_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.npy");
        write_npy(&path, &Array2::<f32>::zeros((0, 3))).unwrap();

        assert!(matches!(load_npy(&path), Err(NpyError::Empty(_))));
    }

    #[test]
    fn test_load_rejects_vector() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vector.npy");
        write_npy(&path, &array![1.0f32, 2.0, 3.0]).unwrap();

        assert!(matches!(load_npy(&path), Err(NpyError::Read { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_npy(dir.path().join("missing.npy")),
            Err(NpyError::Read { .. })
        ));
    }

    #[test]
    fn test_save_centroids_and_labels() {
        let dir = tempfile::tempdir().unwrap();
        let centroids_path = dir.path().join("centroids.npy");
        let labels_path = dir.path().join("labels.npy");

        let centroids = array![[0.0f32, 0.5], [10.0, 0.5]];
        let labels = array![0usize, 0, 1, 1];

        save_centroids(&centroids_path, &centroids.view()).unwrap();
        save_labels(&labels_path, &labels.view()).unwrap();

        let centroids_back: Array2<f32> = read_npy(&centroids_path).unwrap();
        let labels_back: Array1<i64> = read_npy(&labels_path).unwrap();
        assert_eq!(centroids_back, centroids);
        assert_eq!(labels_back, array![0i64, 0, 1, 1]);
    }
}
