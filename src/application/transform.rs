// Derived views - declarative row selection over immutable datasets
use crate::domain::dataset::{Dataset, Value};
use crate::domain::error::ReportError;
use crate::domain::report::DerivedView;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Apply each view in order, each one to the output of the previous
pub fn apply_views(dataset: &Dataset, views: &[DerivedView]) -> Result<Dataset, ReportError> {
    let mut current = dataset.clone();
    for view in views {
        current = apply_view(&current, view)?;
    }
    Ok(current)
}

pub fn apply_view(dataset: &Dataset, view: &DerivedView) -> Result<Dataset, ReportError> {
    match view {
        DerivedView::TopN { by, n } => top_n(dataset, by, *n),
        DerivedView::Sort { by, descending } => sort_by(dataset, by, *descending),
        DerivedView::BelowMean { by } => filter_by_mean(dataset, by, Ordering::Less),
        DerivedView::AboveMean { by } => filter_by_mean(dataset, by, Ordering::Greater),
        DerivedView::ArgmaxByGroup { group, by } => argmax_by_group(dataset, group, by),
    }
}

/// Sort descending by `by` and keep the first `n` rows
pub fn top_n(dataset: &Dataset, by: &str, n: usize) -> Result<Dataset, ReportError> {
    let sorted = sort_by(dataset, by, true)?;
    let rows = sorted.rows().iter().take(n).cloned().collect();
    Ok(sorted.with_rows(rows))
}

/// Stable sort on a numeric column; rows without a value go last either way
pub fn sort_by(dataset: &Dataset, by: &str, descending: bool) -> Result<Dataset, ReportError> {
    let idx = dataset.require_numeric(by)?;
    let mut rows = dataset.rows().to_vec();
    rows.sort_by(|a, b| compare_metric(a[idx].as_f64(), b[idx].as_f64(), descending));
    Ok(dataset.with_rows(rows))
}

/// Keep rows whose metric compares to the mean of the incoming rows as `keep`
fn filter_by_mean(dataset: &Dataset, by: &str, keep: Ordering) -> Result<Dataset, ReportError> {
    let idx = dataset.require_numeric(by)?;
    let Some(mean) = mean(dataset.rows().iter().filter_map(|r| r[idx].as_f64())) else {
        return Ok(dataset.with_rows(Vec::new()));
    };

    let rows = dataset
        .rows()
        .iter()
        .filter(|r| {
            r[idx]
                .as_f64()
                .and_then(|v| v.partial_cmp(&mean))
                .is_some_and(|ord| ord == keep)
        })
        .cloned()
        .collect();

    Ok(dataset.with_rows(rows))
}

/// For each group pick the row with the largest metric.
///
/// Groups come out in order of first appearance. Ties keep the earlier row,
/// and a row without a metric only wins when its group has no numeric row.
pub fn argmax_by_group(dataset: &Dataset, group: &str, by: &str) -> Result<Dataset, ReportError> {
    let group_idx = dataset.require_column(group)?;
    let metric_idx = dataset.require_numeric(by)?;

    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, &Vec<Value>> = HashMap::new();

    for row in dataset.rows() {
        let key = row[group_idx].label();
        let incumbent = best.get(&key).map(|current| current[metric_idx].as_f64());
        match incumbent {
            None => {
                order.push(key.clone());
                best.insert(key, row);
            }
            Some(incumbent) => {
                if compare_metric(row[metric_idx].as_f64(), incumbent, true) == Ordering::Less {
                    best.insert(key, row);
                }
            }
        }
    }

    let rows = order
        .iter()
        .filter_map(|key| best.get(key).map(|row| (*row).clone()))
        .collect();

    Ok(dataset.with_rows(rows))
}

pub fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

fn compare_metric(a: Option<f64>, b: Option<f64>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            if descending { ord.reverse() } else { ord }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
