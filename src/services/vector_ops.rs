//! Vector operations used by the cluster engine.

/// Utility struct for vector operations.
pub struct VectorOps;

impl VectorOps {
    /// Compute cosine similarity between two vectors.
    ///
    /// Mismatched lengths, empty input and zero vectors all give 0.
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot_product: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a = Self::l2_norm(a);
        let norm_b = Self::l2_norm(b);

        if norm_a == 0.0 || norm_b == 0.0 {
            0.0
        } else {
            dot_product / (norm_a * norm_b)
        }
    }

    /// Cosine distance, `1 - cosine_similarity`, in `[0, 2]`.
    pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
        (1.0 - Self::cosine_similarity(a, b)).max(0.0)
    }

    /// Euclidean length of a vector.
    pub fn l2_norm(vector: &[f32]) -> f32 {
        vector.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// True when every component is a finite number.
    pub fn is_finite(vector: &[f32]) -> bool {
        vector.iter().all(|x| x.is_finite())
    }
}
