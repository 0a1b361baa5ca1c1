//! Disk-backed, column-major expression store for out-of-core smoothing.
//!
//! The store is a raw little-endian f64 file laid out sample-major: sample j
//! occupies one contiguous block of `n_genes` values. A chunk of consecutive
//! samples is therefore one contiguous read/write, which is what the chunked
//! diffusion strategy streams through the precomputed kernel.
//!
//! Names are kept in memory; only the numeric payload lives on disk. No
//! external container format is used — persistence mechanics beyond this
//! minimal store are out of scope.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::{debug, info, trace};
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{NetsmoothError, Result};
use crate::matrix::ExpressionMatrix;

/// Out-of-core configuration: how wide each streamed column chunk is and
/// where the smoothed result is materialized.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Number of samples per streamed chunk. Must be positive and no larger
    /// than the total sample count; the final chunk may be shorter.
    pub chunk_size: usize,
    /// Output location for the smoothed store. During alpha selection only
    /// the winning candidate's artifact is retained here.
    pub output: PathBuf,
}

impl ChunkConfig {
    pub fn new(chunk_size: usize, output: impl AsRef<Path>) -> Self {
        Self { chunk_size, output: output.as_ref().to_path_buf() }
    }
}

/// A disk-backed gene × sample matrix, written and read in column chunks.
#[derive(Debug, Clone)]
pub struct ChunkedExpression {
    path: PathBuf,
    genes: Vec<String>,
    samples: Vec<String>,
}

impl ChunkedExpression {
    /// Create (or truncate) the backing file for a store with the given
    /// naming. Columns are appended afterwards with [`append_columns`].
    ///
    /// [`append_columns`]: ChunkedExpression::append_columns
    pub fn create(
        path: impl AsRef<Path>,
        genes: Vec<String>,
        samples: Vec<String>,
    ) -> Result<Self> {
        if genes.is_empty() || samples.is_empty() {
            return Err(NetsmoothError::InvalidParameter(
                "chunked store must have at least one gene and one sample".into(),
            ));
        }
        let path = path.as_ref().to_path_buf();
        File::create(&path)?;
        info!(
            "created chunked store at {}: {} genes x {} samples",
            path.display(),
            genes.len(),
            samples.len()
        );
        Ok(Self { path, genes, samples })
    }

    /// Materialize an in-memory matrix into a new store at `path`.
    pub fn from_matrix(path: impl AsRef<Path>, matrix: &ExpressionMatrix) -> Result<Self> {
        let store = Self::create(
            path,
            matrix.genes().to_vec(),
            matrix.samples().to_vec(),
        )?;
        store.append_columns(matrix.values())?;
        Ok(store)
    }

    /// Append a block of columns (genes × k) to the end of the store.
    pub fn append_columns(&self, cols: &DenseMatrix<f64>) -> Result<()> {
        let (rows, k) = cols.shape();
        if rows != self.genes.len() {
            return Err(NetsmoothError::InvalidParameter(format!(
                "chunk has {} rows, store expects {}",
                rows,
                self.genes.len()
            )));
        }
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = BufWriter::new(file);
        for j in 0..k {
            for i in 0..rows {
                writer.write_all(&cols.get((i, j)).to_le_bytes())?;
            }
        }
        writer.flush()?;
        trace!("appended {} columns to {}", k, self.path.display());
        Ok(())
    }

    /// Read `count` consecutive columns starting at column `start` into a
    /// dense genes × count matrix. The final chunk of a stream may be shorter
    /// than the configured chunk size; callers clamp `count` accordingly.
    pub fn read_columns(&self, start: usize, count: usize) -> Result<DenseMatrix<f64>> {
        let n_genes = self.genes.len();
        let n_samples = self.samples.len();
        if start + count > n_samples {
            return Err(NetsmoothError::InvalidParameter(format!(
                "column range {}..{} out of bounds for {} samples",
                start,
                start + count,
                n_samples
            )));
        }
        let mut reader = BufReader::new(File::open(&self.path)?);
        reader.seek(SeekFrom::Start((start * n_genes * 8) as u64))?;

        let mut buf = [0u8; 8];
        // File is column-major; the matrix is filled row-major, so stage
        // through a flat row-major buffer.
        let mut flat = vec![0.0; n_genes * count];
        for j in 0..count {
            for i in 0..n_genes {
                reader.read_exact(&mut buf)?;
                flat[i * count + j] = f64::from_le_bytes(buf);
            }
        }
        trace!(
            "read columns {}..{} from {}",
            start,
            start + count,
            self.path.display()
        );
        Ok(DenseMatrix::from_iterator(flat.into_iter(), n_genes, count, 0))
    }

    /// Load the whole store into memory.
    pub fn to_matrix(&self) -> Result<ExpressionMatrix> {
        let values = self.read_columns(0, self.samples.len())?;
        ExpressionMatrix::new(values, self.genes.clone(), self.samples.clone())
    }

    /// Delete the backing file, consuming the handle. Used to clean up
    /// losing candidates after alpha selection resolves a winner.
    pub fn remove(self) -> Result<()> {
        debug!("removing chunked store {}", self.path.display());
        std::fs::remove_file(&self.path)?;
        Ok(())
    }

    /// Move the backing file to a new location, e.g. promoting the winning
    /// alpha candidate's artifact to the caller's requested output path.
    pub fn rename(mut self, new_path: impl AsRef<Path>) -> Result<Self> {
        let new_path = new_path.as_ref().to_path_buf();
        debug!(
            "renaming chunked store {} -> {}",
            self.path.display(),
            new_path.display()
        );
        std::fs::rename(&self.path, &new_path)?;
        self.path = new_path;
        Ok(self)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn genes(&self) -> &[String] {
        &self.genes
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn n_genes(&self) -> usize {
        self.genes.len()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }
}
