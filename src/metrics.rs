//! Clustering evaluation metrics.
//!
//! Measures for assessing clustering quality by comparing predicted clusters
//! to ground truth labels. All of them depend only on the partitions, never
//! on the label values: relabeling either side leaves every score unchanged.
//!
//! # Metrics Overview
//!
//! | Metric | Range | Best | Properties |
//! |--------|-------|------|------------|
//! | [`ari`] | [-1, 1] | 1 | Adjusted Rand Index, chance-corrected |
//! | [`fowlkes_mallows`] | [0, 1] | 1 | Pairwise precision/recall |
//! | [`ami`] | [-1, 1] | 1 | Adjusted for chance |
//! | [`homogeneity`] | [0, 1] | 1 | Each cluster has one class |
//! | [`completeness`] | [0, 1] | 1 | Each class in one cluster |
//! | [`v_measure`] | [0, 1] | 1 | Harmonic mean of above two |
//!
//! Logarithms are natural; the normalized scores do not depend on the base.
//!
//! # Example
//!
//! ```rust
//! use foodcluster::metrics::{ami, ari, fowlkes_mallows, v_measure};
//!
//! let pred = [0, 0, 1, 1];
//! let truth = [0, 0, 1, 1];
//!
//! assert!((ari(&pred, &truth) - 1.0).abs() < 1e-10);
//! assert!((fowlkes_mallows(&pred, &truth) - 1.0).abs() < 1e-10);
//! assert!((ami(&pred, &truth) - 1.0).abs() < 1e-10);
//! assert!((v_measure(&pred, &truth) - 1.0).abs() < 1e-10);
//! ```
//!
//! # References
//!
//! - Hubert & Arabie (1985). "Comparing partitions" (ARI)
//! - Fowlkes & Mallows (1983). "A method for comparing two hierarchical clusterings"
//! - Rosenberg & Hirschberg (2007). "V-Measure"
//! - Vinh et al. (2010). "Information theoretic measures for clusterings comparison"

use std::collections::HashMap;
use std::hash::Hash;

/// Map arbitrary labels to `0..k`, numbered by first appearance.
///
/// ```rust
/// use foodcluster::metrics::encode_labels;
///
/// assert_eq!(encode_labels(&["b", "a", "b", "c"]), vec![0, 1, 0, 2]);
/// ```
pub fn encode_labels<T: Eq + Hash + Clone>(labels: &[T]) -> Vec<usize> {
    let mut codes: HashMap<T, usize> = HashMap::new();
    labels
        .iter()
        .map(|label| {
            let next = codes.len();
            *codes.entry(label.clone()).or_insert(next)
        })
        .collect()
}

/// Adjusted Rand Index between two clusterings.
///
/// ARI is the corrected-for-chance version of the Rand Index.
/// A value of 0 indicates random clustering, 1 indicates perfect agreement.
///
/// # Returns
///
/// ARI score in [-1, 1]. Higher is better. 0 = random, 1 = perfect.
/// Mismatched or empty inputs score 0.
///
/// # Example
///
/// ```rust
/// use foodcluster::metrics::ari;
///
/// let pred = [0, 0, 1, 1];
/// let truth = [0, 0, 1, 2];
/// assert!((ari(&pred, &truth) - 4.0 / 7.0).abs() < 1e-10);
/// ```
pub fn ari(pred: &[usize], truth: &[usize]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }

    let table = Contingency::new(pred, truth);

    // Sum of C(n_ij, 2), C(a_i, 2), C(b_j, 2)
    let sum_comb_ij: f64 = table.cells().map(comb2).sum();
    let sum_comb_a: f64 = table.row_sums.iter().map(|&a| comb2(a)).sum();
    let sum_comb_b: f64 = table.col_sums.iter().map(|&b| comb2(b)).sum();
    let comb_n = comb2(table.n);
    if comb_n == 0.0 {
        return 1.0;
    }

    // ARI = (index - expected) / (max - expected)
    let expected = sum_comb_a * sum_comb_b / comb_n;
    let max_index = (sum_comb_a + sum_comb_b) / 2.0;

    let denom = max_index - expected;
    if denom.abs() < 1e-10 {
        return 1.0; // identical partitions: all singletons or one cluster on both sides
    }

    (sum_comb_ij - expected) / denom
}

/// Fowlkes-Mallows Index.
///
/// Geometric mean of precision and recall of pairwise cluster membership:
///
/// ```text
/// FM = TP / sqrt((TP + FP) (TP + FN))
/// ```
///
/// Computed from the contingency table rather than by enumerating pairs.
pub fn fowlkes_mallows(pred: &[usize], truth: &[usize]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }

    let table = Contingency::new(pred, truth);
    let n = table.n as f64;
    let tk: f64 = table.cells().map(|c| (c * c) as f64).sum::<f64>() - n;
    let pk: f64 = table.row_sums.iter().map(|&a| (a * a) as f64).sum::<f64>() - n;
    let qk: f64 = table.col_sums.iter().map(|&b| (b * b) as f64).sum::<f64>() - n;

    if tk == 0.0 {
        return 0.0;
    }
    (tk / pk).sqrt() * (tk / qk).sqrt()
}

/// Shannon entropy of a labeling, in nats.
pub fn entropy(labels: &[usize]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let n = labels.len() as f64;
    let mut counts = vec![0usize; labels.len()];
    for code in encode_labels(labels) {
        counts[code] += 1;
    }
    counts
        .into_iter()
        .filter(|&c| c > 0)
        .map(|c| {
            let p = c as f64 / n;
            -p * p.ln()
        })
        .sum()
}

/// Mutual information between two clusterings, in nats.
pub fn mutual_info(pred: &[usize], truth: &[usize]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }
    Contingency::new(pred, truth).mutual_info()
}

/// Adjusted Mutual Information (arithmetic-mean normalization).
///
/// ```text
/// AMI = (MI - E[MI]) / (mean(H(U), H(V)) - E[MI])
/// ```
///
/// E[MI] is the expected mutual information under the hypergeometric model
/// of random labelings with the same cluster sizes. Two single-cluster
/// labelings score 1.
pub fn ami(pred: &[usize], truth: &[usize]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }

    let table = Contingency::new(pred, truth);
    if table.row_sums.len() == 1 && table.col_sums.len() == 1 {
        return 1.0;
    }

    let mi = table.mutual_info();
    let emi = table.expected_mutual_info();
    let normalizer = (entropy(pred) + entropy(truth)) / 2.0;

    let mut denom = normalizer - emi;
    denom = if denom < 0.0 {
        denom.min(-f64::EPSILON)
    } else {
        denom.max(f64::EPSILON)
    };
    (mi - emi) / denom
}

/// Homogeneity: each cluster contains only members of a single class.
///
/// h = I(C; K) / H(C)
///
/// where C is classes (truth) and K is clusters (pred).
pub fn homogeneity(pred: &[usize], truth: &[usize]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }
    let h_c = entropy(truth);
    if h_c == 0.0 {
        return 1.0; // All same class
    }
    mutual_info(pred, truth) / h_c
}

/// Completeness: all members of a given class are assigned to the same cluster.
///
/// c = I(C; K) / H(K)
pub fn completeness(pred: &[usize], truth: &[usize]) -> f64 {
    if pred.len() != truth.len() || pred.is_empty() {
        return 0.0;
    }
    let h_k = entropy(pred);
    if h_k == 0.0 {
        return 1.0; // All same cluster
    }
    mutual_info(pred, truth) / h_k
}

/// V-Measure: harmonic mean of homogeneity and completeness.
///
/// V = 2 * (homogeneity * completeness) / (homogeneity + completeness)
pub fn v_measure(pred: &[usize], truth: &[usize]) -> f64 {
    let h = homogeneity(pred, truth);
    let c = completeness(pred, truth);

    if h + c == 0.0 {
        return 0.0;
    }

    2.0 * h * c / (h + c)
}

// Helper functions

/// Dense contingency table: rows are predicted clusters, columns true classes.
struct Contingency {
    counts: Vec<Vec<usize>>,
    row_sums: Vec<usize>,
    col_sums: Vec<usize>,
    n: usize,
}

impl Contingency {
    fn new(pred: &[usize], truth: &[usize]) -> Self {
        let rows = encode_labels(pred);
        let cols = encode_labels(truth);
        let n_rows = rows.iter().max().map_or(0, |m| m + 1);
        let n_cols = cols.iter().max().map_or(0, |m| m + 1);

        let mut counts = vec![vec![0usize; n_cols]; n_rows];
        let mut row_sums = vec![0usize; n_rows];
        let mut col_sums = vec![0usize; n_cols];
        for (&r, &c) in rows.iter().zip(&cols) {
            counts[r][c] += 1;
            row_sums[r] += 1;
            col_sums[c] += 1;
        }

        Self {
            counts,
            row_sums,
            col_sums,
            n: pred.len(),
        }
    }

    fn cells(&self) -> impl Iterator<Item = usize> + '_ {
        self.counts.iter().flatten().copied()
    }

    fn mutual_info(&self) -> f64 {
        let n = self.n as f64;
        let mut mi = 0.0;
        for (i, row) in self.counts.iter().enumerate() {
            for (j, &count) in row.iter().enumerate() {
                if count == 0 {
                    continue;
                }
                let n_ij = count as f64;
                let outer = self.row_sums[i] as f64 * self.col_sums[j] as f64;
                mi += n_ij / n * (n * n_ij / outer).ln();
            }
        }
        mi.max(0.0)
    }

    /// E[MI] under the hypergeometric model (Vinh et al., 2010, eq. 24a).
    fn expected_mutual_info(&self) -> f64 {
        let n = self.n;
        let n_f = n as f64;
        let ln_fact = log_factorials(n);

        let mut emi = 0.0;
        for &a in &self.row_sums {
            for &b in &self.col_sums {
                let start = (a + b).saturating_sub(n).max(1);
                let end = a.min(b);
                for n_ij in start..=end {
                    let n_ij_f = n_ij as f64;
                    let term1 = n_ij_f / n_f;
                    let term2 = (n_f * n_ij_f).ln() - (a as f64).ln() - (b as f64).ln();
                    let log_p = ln_fact[a] + ln_fact[b] + ln_fact[n - a] + ln_fact[n - b]
                        - ln_fact[n]
                        - ln_fact[n_ij]
                        - ln_fact[a - n_ij]
                        - ln_fact[b - n_ij]
                        - ln_fact[n + n_ij - a - b];
                    emi += term1 * term2 * log_p.exp();
                }
            }
        }
        emi
    }
}

/// ln(k!) for k in 0..=n.
fn log_factorials(n: usize) -> Vec<f64> {
    let mut table = Vec::with_capacity(n + 1);
    table.push(0.0);
    for k in 1..=n {
        let prev = table[k - 1];
        table.push(prev + (k as f64).ln());
    }
    table
}

fn comb2(n: usize) -> f64 {
    if n < 2 {
        0.0
    } else {
        (n * (n - 1) / 2) as f64
    }
}
