//! Clustering algorithms for grouping foods by macronutrient profile.
//!
//! Every algorithm takes an n × d feature matrix (one row per food) and
//! returns one label per row.
//!
//! ## Partitional
//!
//! ### K-means
//!
//! The classic algorithm: assign each point to the nearest centroid, then
//! update centroids to the mean of their points. Repeat.
//!
//! **Objective**: Minimize within-cluster sum of squares:
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} ||x - μ_k||²
//! ```
//!
//! [`MiniBatchKmeans`] optimizes the same objective from small random
//! batches, trading a little inertia for speed.
//!
//! ### Hierarchical (Agglomerative) Clustering
//!
//! Bottom-up: start with each point as its own cluster, repeatedly merge
//! the two closest clusters until one remains. The merge history forms a
//! **dendrogram**, which is cut to get k clusters.
//!
//! ### Spectral
//!
//! Embeds points with the eigenvectors of a kNN graph Laplacian, then
//! discretizes the embedding. Finds non-convex groups k-means misses.
//!
//! ## Emergent cluster count
//!
//! [`MeanShift`] climbs to density modes within a fixed bandwidth and
//! [`Dbscan`] grows clusters from dense cores. Neither takes k. DBSCAN can
//! also leave points unassigned, so it returns `Option<usize>` labels and
//! does not implement [`Clustering`].
//!
//! ## Usage
//!
//! ```rust
//! use foodcluster::cluster::{Clustering, Kmeans};
//! use ndarray::array;
//!
//! let data = array![[0.0, 0.0], [0.1, 0.1], [10.0, 10.0], [10.1, 10.1]];
//!
//! let labels = Kmeans::new(2).with_seed(0).fit_predict(&data).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//! ```

mod dbscan;
mod dendrogram;
mod hierarchical;
mod kmeans;
mod mean_shift;
mod minibatch;
mod spectral;
mod traits;

pub use dbscan::Dbscan;
pub use dendrogram::{Dendrogram, Merge};
pub use hierarchical::{HierarchicalClustering, Linkage, Metric};
pub use kmeans::{Kmeans, KmeansFit};
pub use mean_shift::MeanShift;
pub use minibatch::MiniBatchKmeans;
pub use spectral::SpectralClustering;
pub use traits::Clustering;
