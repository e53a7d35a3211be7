//! Mean shift: mode seeking with a flat kernel.
//!
//! Every point seeds a window of radius `bandwidth`. Each window moves to the
//! mean of the points it covers until the move is at most `1e-3 * bandwidth`
//! (or `max_iter` steps). Converged windows are ranked by how many points
//! they cover; a mode is dropped when a higher-ranked mode lies within one
//! bandwidth of it. Every point is then assigned to its nearest surviving
//! mode, so there is no noise label.
//!
//! The number of clusters is emergent.
//!
//! # References
//!
//! Comaniciu & Meer (2002). "Mean Shift: A Robust Approach Toward Feature
//! Space Analysis." IEEE TPAMI.

use std::cmp::Ordering;

use ndarray::{Array1, Array2};
use tracing::debug;

use super::kmeans::{assign_nearest, squared_distance};
use super::traits::Clustering;
use crate::error::{Error, Result};

/// Mean shift clustering with a flat kernel.
#[derive(Debug, Clone)]
pub struct MeanShift {
    bandwidth: f64,
    max_iter: usize,
}

/// A converged window: its center and the number of points it covered.
#[derive(Debug, Clone)]
struct Mode {
    center: Array1<f64>,
    intensity: usize,
}

impl MeanShift {
    /// Create a mean shift clusterer with the given kernel radius.
    pub fn new(bandwidth: f64) -> Self {
        Self {
            bandwidth,
            max_iter: 300,
        }
    }

    /// Set the per-seed iteration cap.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    /// Fit and return the surviving modes as a c × d matrix, highest intensity first.
    pub fn fit_modes(&self, data: &Array2<f64>) -> Result<Array2<f64>> {
        let (n, d) = data.dim();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        if self.bandwidth.is_nan() || self.bandwidth <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "bandwidth",
                message: "must be positive",
            });
        }

        let mut modes: Vec<Mode> = data
            .outer_iter()
            .filter_map(|seed| self.climb(data, seed.to_owned()))
            .collect();
        if modes.is_empty() {
            return Err(Error::ConvergenceFailure { iterations: self.max_iter });
        }

        // Highest intensity first; ties by coordinates, descending.
        modes.sort_by(|a, b| {
            b.intensity.cmp(&a.intensity).then_with(|| {
                b.center
                    .iter()
                    .zip(a.center.iter())
                    .map(|(x, y)| x.partial_cmp(y).unwrap_or(Ordering::Equal))
                    .find(|o| o.is_ne())
                    .unwrap_or(Ordering::Equal)
            })
        });

        let radius_sq = self.bandwidth * self.bandwidth;
        let mut kept: Vec<Array1<f64>> = Vec::new();
        for mode in modes {
            let suppressed = kept
                .iter()
                .any(|c| squared_distance(&c.view(), &mode.center.view()) <= radius_sq);
            if !suppressed {
                kept.push(mode.center);
            }
        }

        debug!(seeds = n, modes = kept.len(), "mean shift converged");

        let mut centers = Array2::zeros((kept.len(), d));
        for (i, c) in kept.iter().enumerate() {
            centers.row_mut(i).assign(c);
        }
        Ok(centers)
    }

    /// Shift one window until it settles. `None` if the window covers nothing.
    fn climb(&self, data: &Array2<f64>, mut center: Array1<f64>) -> Option<Mode> {
        let radius_sq = self.bandwidth * self.bandwidth;
        let stop_thresh = 1e-3 * self.bandwidth;
        let mut intensity = 0;

        for _ in 0..self.max_iter {
            let mut sum = Array1::<f64>::zeros(center.len());
            let mut count = 0usize;
            for point in data.outer_iter() {
                if squared_distance(&point, &center.view()) <= radius_sq {
                    sum += &point;
                    count += 1;
                }
            }
            if count == 0 {
                break;
            }
            let mean = sum / count as f64;
            let shift = squared_distance(&mean.view(), &center.view()).sqrt();
            center = mean;
            intensity = count;
            if shift <= stop_thresh {
                break;
            }
        }

        (intensity > 0).then_some(Mode { center, intensity })
    }
}

impl Clustering for MeanShift {
    fn fit_predict(&self, data: &Array2<f64>) -> Result<Vec<usize>> {
        let centers = self.fit_modes(data)?;
        let mut labels = vec![0usize; data.nrows()];
        assign_nearest(data, &centers, &mut labels);
        Ok(labels)
    }

    fn n_clusters(&self) -> Option<usize> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_two_modes() {
        let data = array![
            [0.0, 0.0],
            [0.5, 0.0],
            [0.0, 0.5],
            [10.0, 10.0],
            [10.5, 10.0],
        ];

        let labels = MeanShift::new(2.0).fit_predict(&data).unwrap();

        // the denser mode ranks first
        assert_eq!(labels, vec![0, 0, 0, 1, 1]);
    }

    #[test]
    fn test_modes_within_bandwidth_merge() {
        let data = array![[0.0], [0.1], [0.2], [0.3]];
        let centers = MeanShift::new(1.0).fit_modes(&data).unwrap();
        assert_eq!(centers.nrows(), 1);
        assert!((centers[[0, 0]] - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_isolated_points_are_their_own_modes() {
        let data = array![[0.0, 0.0], [10.0, 0.0], [0.0, 10.0]];
        let labels = MeanShift::new(1.0).fit_predict(&data).unwrap();
        let unique: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_no_target_count() {
        assert_eq!(MeanShift::new(2.0).n_clusters(), None);
    }

    #[test]
    fn test_invalid_bandwidth() {
        let data = array![[0.0, 0.0]];
        assert!(MeanShift::new(0.0).fit_predict(&data).is_err());
        assert!(MeanShift::new(f64::NAN).fit_predict(&data).is_err());
    }
}
