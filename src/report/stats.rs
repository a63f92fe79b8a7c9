//! The handful of descriptive statistics the report needs.

use crate::{participants::Gender, questionnaire::Scores, responses::Phase};

use super::ReportRow;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// The `q`-quantile of already sorted `values`, interpolating linearly
/// between the two closest ranks.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Five-number summary used to draw a box plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxStats {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl BoxStats {
    pub fn of(values: &[f64]) -> Option<BoxStats> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        Some(BoxStats {
            min: sorted[0],
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            max: sorted[sorted.len() - 1],
        })
    }
}

/// Pearson's correlation coefficient. `None` when either series has no
/// variance (or there are fewer than two points), as the coefficient is
/// undefined then.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mx = mean(xs)?;
    let my = mean(ys)?;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= f64::EPSILON || syy <= f64::EPSILON {
        return None;
    }
    Some((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

/// Pairwise correlations between equally long series. The diagonal is 1
/// unless the series is constant.
pub fn correlation_matrix<const N: usize>(
    series: &[Vec<f64>; N],
) -> [[Option<f64>; N]; N] {
    let mut matrix = [[None; N]; N];
    for i in 0..N {
        for j in 0..N {
            matrix[i][j] = pearson(&series[i], &series[j]);
        }
    }
    matrix
}

/// Mean scores of one gender×phase group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupMeans {
    pub gender: Gender,
    pub phase: Phase,
    pub count: usize,
    pub scores: Scores,
}

/// Means per gender×phase, in a fixed order. Groups without any rows are
/// left out.
pub fn grouped_means(rows: &[ReportRow]) -> Vec<GroupMeans> {
    let mut groups = Vec::new();
    for gender in Gender::ALL {
        for phase in Phase::ALL {
            let group: Vec<&ReportRow> = rows
                .iter()
                .filter(|r| r.gender == gender && r.phase == phase)
                .collect();
            if group.is_empty() {
                continue;
            }
            let avg = |f: fn(&ReportRow) -> f64| {
                group.iter().map(|r| f(r)).sum::<f64>() / group.len() as f64
            };
            groups.push(GroupMeans {
                gender,
                phase,
                count: group.len(),
                scores: Scores {
                    wellbeing: avg(|r| r.scores.wellbeing),
                    activity: avg(|r| r.scores.activity),
                    mood: avg(|r| r.scores.mood),
                    overall: avg(|r| r.scores.overall),
                },
            });
        }
    }
    groups
}

pub const BUCKET_LABELS: [&str; 3] = [">5", "4-5", "<4"];

/// Counts well-being scores above 5, between 4 and 5 inclusive, and below 4.
pub fn wellbeing_buckets(values: impl IntoIterator<Item = f64>) -> [usize; 3] {
    let mut buckets = [0; 3];
    for v in values {
        if v > 5.0 {
            buckets[0] += 1;
        } else if v >= 4.0 {
            buckets[1] += 1;
        } else {
            buckets[2] += 1;
        }
    }
    buckets
}
