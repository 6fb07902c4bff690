//! Pairwise cosine similarity over one document's sentence embeddings.

/// Symmetric N×N cosine similarity matrix, stored row-major.
#[derive(Debug, Clone)]
pub struct SimilarityMatrix {
    n: usize,
    values: Vec<f32>,
}

impl SimilarityMatrix {
    /// Compute every pair once and mirror it. The diagonal is 1.0; a pair
    /// involving a zero-norm vector is 0.0 rather than NaN.
    pub fn from_embeddings(embeddings: &[Vec<f32>]) -> Self {
        let n = embeddings.len();
        let norms: Vec<f32> = embeddings
            .iter()
            .map(|e| e.iter().map(|x| x * x).sum::<f32>().sqrt())
            .collect();

        let mut values = vec![0.0f32; n * n];
        for i in 0..n {
            values[i * n + i] = 1.0;
            for j in (i + 1)..n {
                let sim = cosine(&embeddings[i], &embeddings[j], norms[i], norms[j]);
                values[i * n + j] = sim;
                values[j * n + i] = sim;
            }
        }

        Self { n, values }
    }

    /// Build directly from row values; used to drive clustering with known scores.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Self {
        let n = rows.len();
        debug_assert!(rows.iter().all(|r| r.len() == n), "similarity rows must be square");
        Self {
            n,
            values: rows.into_iter().flatten().collect(),
        }
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f32 {
        self.values[i * self.n + j]
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Mean similarity over every cross pair of the two index sets.
    pub fn mean_between(&self, a: &[usize], b: &[usize]) -> f32 {
        let count = a.len() * b.len();
        if count == 0 {
            return 0.0;
        }
        let total: f32 = a
            .iter()
            .flat_map(|&i| b.iter().map(move |&j| (i, j)))
            .map(|(i, j)| self.get(i, j))
            .sum();
        total / count as f32
    }
}

#[inline]
fn cosine(a: &[f32], b: &[f32], norm_a: f32, norm_b: f32) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}
