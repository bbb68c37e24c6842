//! Exhaustive inner-product index over unit vectors.

use crate::error::{PulsError, Result};

/// Scale `vector` to unit L2 norm. Zero vectors are returned unchanged.
pub fn l2_normalize(vector: &[f32]) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|x| x / norm).collect()
}

/// Flat index: rows stored contiguously, every query scans all of them.
///
/// Because rows and queries are normalized, the inner product is the cosine similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl FlatIndex {
    /// Create an empty index for vectors of `dimension` components.
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: Vec::new(),
        }
    }

    /// Build an index from raw vectors, normalizing each one.
    pub fn build(dimension: usize, vectors: &[Vec<f32>]) -> Result<Self> {
        let mut index = Self::new(dimension);
        index.data.reserve(dimension * vectors.len());
        for vector in vectors {
            index.add(vector)?;
        }
        Ok(index)
    }

    /// Rebuild from already-normalized row-major data.
    pub(crate) fn from_raw(dimension: usize, data: Vec<f32>) -> Result<Self> {
        if dimension == 0 || data.len() % dimension != 0 {
            return Err(PulsError::IndexMismatch(format!(
                "{} values do not form rows of dimension {}",
                data.len(),
                dimension
            )));
        }
        Ok(Self { dimension, data })
    }

    /// Append one vector.
    pub fn add(&mut self, vector: &[f32]) -> Result<()> {
        self.check_dimension(vector)?;
        self.data.extend(l2_normalize(vector));
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors.
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Normalized row at `position`.
    pub fn row(&self, position: usize) -> Option<&[f32]> {
        let start = position * self.dimension;
        self.data.get(start..start + self.dimension)
    }

    pub(crate) fn raw(&self) -> &[f32] {
        &self.data
    }

    /// The `k` best `(position, score)` pairs, best first. Equal scores keep insertion
    /// order and `k` larger than the index returns every row.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        self.check_dimension(query)?;
        let query = l2_normalize(query);

        let mut scored: Vec<(usize, f32)> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, row)| {
                let score = row.iter().zip(&query).map(|(a, b)| a * b).sum();
                (position, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);
        Ok(scored)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(PulsError::VectorStore(format!(
                "Expected a vector of dimension {}, got {}",
                self.dimension,
                vector.len()
            )));
        }
        Ok(())
    }
}
