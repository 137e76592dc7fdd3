use crate::error::{PipelineError, Result};
use crate::features::FeatureCollection;
use log::{debug, info};

/// Break points and display labels for N half-open population intervals
#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationScheme {
    /// N+1 ascending values, `breaks[0]` is the minimum and `breaks[N]` the maximum
    pub breaks: Vec<f64>,
    /// One label per interval, lowest first
    pub labels: Vec<String>,
}

impl ClassificationScheme {
    /// Partition `values` into `n` classes with minimal within-class variance
    pub fn kmeans(values: &[f64], n: usize) -> Result<Self> {
        let groups = distinct_weighted(values)?;
        if n == 0 {
            return Err(PipelineError::Classify("class count must be positive".into()));
        }
        if groups.len() < n {
            return Err(PipelineError::Classify(format!(
                "{} classes requested but only {} distinct values",
                n,
                groups.len()
            )));
        }

        let clusters = optimal_clusters(&groups, n);
        let min = groups[0].0;
        let max = groups[groups.len() - 1].0;

        let mut breaks = Vec::with_capacity(n + 1);
        breaks.push(min);
        for pair in clusters.windows(2) {
            let upper_of_lower = groups[pair[0].1].0;
            let lower_of_upper = groups[pair[1].0].0;
            breaks.push((upper_of_lower + lower_of_upper) / 2.0);
        }
        breaks.push(max);
        debug!("k-means breaks: {:?}", breaks);

        let labels = interval_labels(&breaks);
        Ok(Self { breaks, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Interval index for `value`. Intervals are right-open, so a value on a
    /// break falls into the upper interval; the last interval includes the maximum.
    pub fn interval_of(&self, value: f64) -> usize {
        let last = self.len().saturating_sub(1);
        // breaks[1..N] are the interior boundaries
        let interior = &self.breaks[1..self.breaks.len() - 1];
        interior.partition_point(|&b| b <= value).min(last)
    }

    /// Labels highest interval first, for the legend
    pub fn legend_labels(&self) -> Vec<String> {
        self.labels.iter().rev().cloned().collect()
    }
}

/// Sorted distinct values with their multiplicity
fn distinct_weighted(values: &[f64]) -> Result<Vec<(f64, f64)>> {
    if values.is_empty() {
        return Err(PipelineError::Classify("no values to classify".into()));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(PipelineError::Classify(format!("non-finite value {bad}")));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut groups: Vec<(f64, f64)> = Vec::new();
    for v in sorted {
        match groups.last_mut() {
            Some((last, weight)) if *last == v => *weight += 1.0,
            _ => groups.push((v, 1.0)),
        }
    }
    Ok(groups)
}

/// Weighted prefix sums for O(1) segment cost
struct Prefix {
    w: Vec<f64>,
    wx: Vec<f64>,
    wxx: Vec<f64>,
}

impl Prefix {
    fn new(groups: &[(f64, f64)]) -> Self {
        let mut w = vec![0.0; groups.len() + 1];
        let mut wx = vec![0.0; groups.len() + 1];
        let mut wxx = vec![0.0; groups.len() + 1];
        for (i, &(x, weight)) in groups.iter().enumerate() {
            w[i + 1] = w[i] + weight;
            wx[i + 1] = wx[i] + weight * x;
            wxx[i + 1] = wxx[i] + weight * x * x;
        }
        Self { w, wx, wxx }
    }

    /// Within-segment sum of squared deviations for groups `i..=j`
    #[inline(always)]
    fn cost(&self, i: usize, j: usize) -> f64 {
        let w = self.w[j + 1] - self.w[i];
        let s = self.wx[j + 1] - self.wx[i];
        let ss = self.wxx[j + 1] - self.wxx[i];
        (ss - s * s / w).max(0.0)
    }
}

/// Exact 1-D k-means by dynamic programming. Returns inclusive
/// `(first, last)` group ranges, one per cluster, in ascending order.
/// Ties resolve to the earliest split, so results are reproducible.
fn optimal_clusters(groups: &[(f64, f64)], k: usize) -> Vec<(usize, usize)> {
    let m = groups.len();
    let prefix = Prefix::new(groups);

    // cost[c][j]: best SSE of groups 0..=j in c+1 clusters; start[c][j]: first group of last cluster
    let mut cost = vec![vec![f64::INFINITY; m]; k];
    let mut start = vec![vec![0usize; m]; k];

    for j in 0..m {
        cost[0][j] = prefix.cost(0, j);
    }
    for c in 1..k {
        for j in c..m {
            for i in c..=j {
                let candidate = cost[c - 1][i - 1] + prefix.cost(i, j);
                if candidate < cost[c][j] {
                    cost[c][j] = candidate;
                    start[c][j] = i;
                }
            }
        }
    }

    let mut clusters = Vec::with_capacity(k);
    let mut end = m - 1;
    for c in (0..k).rev() {
        let first = if c == 0 { 0 } else { start[c][end] };
        clusters.push((first, end));
        if c > 0 {
            end = first - 1;
        }
    }
    clusters.reverse();
    clusters
}

/// Most decimals a label is printed with
const MAX_LABEL_DECIMALS: usize = 6;

#[derive(Clone, Copy)]
enum Bound {
    Lower,
    Upper,
}

/// Print a break with at least two decimals and as many more as it needs.
/// Breaks that need more than the maximum are rounded outwards, so a label
/// never excludes a value of its own interval.
fn format_break(value: f64, bound: Bound) -> String {
    for decimals in 2..=MAX_LABEL_DECIMALS {
        let scale = 10f64.powi(decimals as i32);
        let rounded = (value * scale).round() / scale;
        if (rounded - value).abs() <= 1e-9 * value.abs().max(1.0) {
            return format!("{rounded:.decimals$}");
        }
    }
    let decimals = MAX_LABEL_DECIMALS;
    let scale = 10f64.powi(decimals as i32);
    let outward = match bound {
        Bound::Lower => (value * scale).floor() / scale,
        Bound::Upper => (value * scale).ceil() / scale,
    };
    format!("{outward:.decimals$}")
}

/// Range labels with open-ended first and last entries
fn interval_labels(breaks: &[f64]) -> Vec<String> {
    let n = breaks.len() - 1;
    let lower = |i: usize| format_break(breaks[i], Bound::Lower);
    let upper = |i: usize| format_break(breaks[i], Bound::Upper);
    if n == 1 {
        return vec![format!("{} - {}", lower(0), upper(1))];
    }
    (0..n)
        .map(|i| {
            if i == 0 {
                format!("below {}", upper(1))
            } else if i == n - 1 {
                format!("above {}", lower(n - 1))
            } else {
                format!("{} - {}", lower(i), upper(i + 1))
            }
        })
        .collect()
}

/// Two-line tooltip: country name, then population in millions
pub fn hover_text(name: &str, population: f64) -> String {
    format!("{name}\n{population:.2} million")
}

/// Compute the scheme over the population column and assign every record
/// its interval and hover text.
pub fn classify(collection: &mut FeatureCollection, n: usize) -> Result<ClassificationScheme> {
    let scheme = ClassificationScheme::kmeans(&collection.populations(), n)?;
    for record in &mut collection.records {
        record.interval = Some(scheme.interval_of(record.population));
        record.hover_text = Some(hover_text(&record.name, record.population));
    }
    info!(
        "Classified {} records into {} intervals",
        collection.len(),
        scheme.len()
    );
    Ok(scheme)
}
