//! Density-based clustering (DBSCAN) over cosine distance.
//!
//! A point's ε-neighbourhood includes the point itself. Points whose
//! neighbourhood holds at least `min_points` members are core points; clusters
//! grow outward from core points in index order, so labels are reproducible
//! for a given matrix and parameters. Anything never reached is an outlier.

use std::collections::VecDeque;

use rayon::prelude::*;
use thiserror::Error;

use super::vector_ops::VectorOps;
use crate::models::ClusterLabel;

/// Default neighbourhood radius (cosine distance).
pub const DEFAULT_EPS: f32 = 0.4;

/// Default minimum neighbourhood size for a core point.
pub const DEFAULT_MIN_POINTS: usize = 2;

#[derive(Debug, Error, PartialEq)]
pub enum ClusterError {
    #[error("vector {index} has dimension {found}, expected {expected}")]
    DimensionMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },

    #[error("cluster eps must be a finite number in (0, 2], got {0}")]
    InvalidEps(f32),

    #[error("cluster min_points must be at least 1")]
    InvalidMinPoints,
}

/// DBSCAN parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DbscanParams {
    /// Maximum cosine distance between neighbours.
    pub eps: f32,
    /// Neighbourhood size (self included) that makes a point a core point.
    pub min_points: usize,
}

impl Default for DbscanParams {
    fn default() -> Self {
        Self {
            eps: DEFAULT_EPS,
            min_points: DEFAULT_MIN_POINTS,
        }
    }
}

impl DbscanParams {
    pub fn validate(&self) -> Result<(), ClusterError> {
        if !self.eps.is_finite() || self.eps <= 0.0 || self.eps > 2.0 {
            return Err(ClusterError::InvalidEps(self.eps));
        }
        if self.min_points == 0 {
            return Err(ClusterError::InvalidMinPoints);
        }
        Ok(())
    }
}

/// Assigns a cluster label to every row of a vector matrix.
pub trait Clusterer: Send + Sync {
    /// `labels[i]` is the label of `vectors[i]`.
    fn cluster(&self, vectors: &[Vec<f32>]) -> Result<Vec<ClusterLabel>, ClusterError>;
}

/// DBSCAN with cosine distance.
#[derive(Debug, Clone, Default)]
pub struct Dbscan {
    params: DbscanParams,
}

impl Dbscan {
    pub fn new(params: DbscanParams) -> Result<Self, ClusterError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> DbscanParams {
        self.params
    }

    fn neighbourhoods(&self, vectors: &[Vec<f32>]) -> Vec<Vec<usize>> {
        let eps = self.params.eps;
        (0..vectors.len())
            .into_par_iter()
            .map(|i| {
                (0..vectors.len())
                    .filter(|&j| {
                        i == j || VectorOps::cosine_distance(&vectors[i], &vectors[j]) <= eps
                    })
                    .collect()
            })
            .collect()
    }
}

impl Clusterer for Dbscan {
    fn cluster(&self, vectors: &[Vec<f32>]) -> Result<Vec<ClusterLabel>, ClusterError> {
        let Some(first) = vectors.first() else {
            return Ok(Vec::new());
        };
        let expected = first.len();
        if let Some((index, v)) = vectors.iter().enumerate().find(|(_, v)| v.len() != expected) {
            return Err(ClusterError::DimensionMismatch {
                index,
                expected,
                found: v.len(),
            });
        }
        if vectors.len() == 1 {
            return Ok(vec![ClusterLabel::Outlier]);
        }

        let neighbourhoods = self.neighbourhoods(vectors);
        let is_core: Vec<bool> = neighbourhoods
            .iter()
            .map(|n| n.len() >= self.params.min_points)
            .collect();

        let mut labels: Vec<Option<usize>> = vec![None; vectors.len()];
        let mut next_cluster = 0;

        for seed in 0..vectors.len() {
            if labels[seed].is_some() || !is_core[seed] {
                continue;
            }
            let cluster = next_cluster;
            next_cluster += 1;

            let mut frontier = VecDeque::from([seed]);
            while let Some(point) = frontier.pop_front() {
                if labels[point].is_some() {
                    continue;
                }
                labels[point] = Some(cluster);
                // Border points join the cluster but do not extend it.
                if is_core[point] {
                    frontier.extend(
                        neighbourhoods[point]
                            .iter()
                            .copied()
                            .filter(|&n| labels[n].is_none()),
                    );
                }
            }
        }

        Ok(labels
            .into_iter()
            .map(|label| label.map_or(ClusterLabel::Outlier, ClusterLabel::Cluster))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dbscan(eps: f32, min_points: usize) -> Dbscan {
        Dbscan::new(DbscanParams { eps, min_points }).unwrap()
    }

    #[test]
    fn test_empty_and_single_input() {
        let engine = Dbscan::default();
        assert!(engine.cluster(&[]).unwrap().is_empty());
        assert_eq!(
            engine.cluster(&[vec![1.0, 0.0]]).unwrap(),
            vec![ClusterLabel::Outlier]
        );
        // A lone point never forms a cluster, even when min_points allows it.
        assert_eq!(
            dbscan(0.4, 1).cluster(&[vec![1.0, 0.0]]).unwrap(),
            vec![ClusterLabel::Outlier]
        );
    }

    #[test]
    fn test_two_close_one_far() {
        let vectors = vec![vec![1.0, 0.0], vec![0.95, 0.1], vec![-1.0, 0.2]];
        let labels = dbscan(0.4, 2).cluster(&vectors).unwrap();
        assert_eq!(
            labels,
            vec![
                ClusterLabel::Cluster(0),
                ClusterLabel::Cluster(0),
                ClusterLabel::Outlier
            ]
        );
    }

    #[test]
    fn test_separate_clusters_numbered_by_first_index() {
        let vectors = vec![
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![0.05, 1.0],
            vec![1.0, 0.05],
        ];
        let labels = dbscan(0.1, 2).cluster(&vectors).unwrap();
        assert_eq!(
            labels,
            vec![
                ClusterLabel::Cluster(0),
                ClusterLabel::Cluster(1),
                ClusterLabel::Cluster(0),
                ClusterLabel::Cluster(1)
            ]
        );
    }

    #[test]
    fn test_border_point_reached_through_chain() {
        // a-b and b-c are within eps, a-c is not; with min_points 3 only b is core.
        let a = vec![1.0, 0.0];
        let b = vec![(0.3f32).cos(), (0.3f32).sin()];
        let c = vec![(0.6f32).cos(), (0.6f32).sin()];
        let labels = dbscan(0.05, 3).cluster(&[a, b, c]).unwrap();
        assert_eq!(labels, vec![ClusterLabel::Cluster(0); 3]);
    }

    #[test]
    fn test_no_core_points_means_all_outliers() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, 0.0]];
        let labels = dbscan(0.4, 2).cluster(&vectors).unwrap();
        assert!(labels.iter().all(|l| l.is_outlier()));
    }

    #[test]
    fn test_deterministic_across_runs() {
        let vectors: Vec<Vec<f32>> = (0..40)
            .map(|i| {
                let angle = (i % 4) as f32 * 1.5 + (i as f32) * 0.001;
                vec![angle.cos(), angle.sin(), 0.1]
            })
            .collect();
        let engine = dbscan(0.2, 2);
        let first = engine.cluster(&vectors).unwrap();
        for _ in 0..5 {
            assert_eq!(engine.cluster(&vectors).unwrap(), first);
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let err = Dbscan::default()
            .cluster(&[vec![1.0, 0.0], vec![1.0]])
            .unwrap_err();
        assert_eq!(
            err,
            ClusterError::DimensionMismatch {
                index: 1,
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn test_param_validation() {
        assert!(Dbscan::new(DbscanParams { eps: 0.0, min_points: 2 }).is_err());
        assert!(Dbscan::new(DbscanParams { eps: f32::NAN, min_points: 2 }).is_err());
        assert!(Dbscan::new(DbscanParams { eps: 0.4, min_points: 0 }).is_err());
        assert!(Dbscan::new(DbscanParams::default()).is_ok());
    }
}
