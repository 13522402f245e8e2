//! Data analysis tool
//!
//! Descriptive statistics over datasets embedded in a query, either as
//! bracketed lists (`[1, 2, 3]`, one dataset per bracket, `...` fills
//! integer ranges) or as loose numbers in the text.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use super::traits::{query_arg, query_schema, Tool, ToolResult};
use crate::error::Result;

/// Upper bound on values produced by ellipsis expansion
const MAX_DATASET_LEN: usize = 100_000;

static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").expect("valid regex"));

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d*\.?\d+").expect("valid regex"));

/// Summary statistics for one dataset
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl Stats {
    /// Compute statistics; `None` for fewer than two values
    pub fn compute(data: &[f64]) -> Option<Self> {
        if data.len() < 2 {
            return None;
        }

        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let variance = data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);

        let mut sorted = data.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Some(Stats {
            mean,
            median,
            std_dev: variance.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }

    fn lines(&self, indent: &str) -> Vec<String> {
        vec![
            format!("{}Mean: {:.2}", indent, self.mean),
            format!("{}Median: {:.2}", indent, self.median),
            format!("{}Standard Deviation: {:.2}", indent, self.std_dev),
            format!("{}Min: {:.2}", indent, self.min),
            format!("{}Max: {:.2}", indent, self.max),
        ]
    }
}

fn is_ellipsis(token: &str) -> bool {
    token == "..." || token == "…"
}

fn parse_value(token: &str) -> std::result::Result<f64, String> {
    token
        .parse::<f64>()
        .map_err(|_| format!("Invalid number '{}'", token))
}

/// Parse a comma-separated list, filling `a, ..., b` with the integers
/// strictly between `a` and `b`
pub fn expand_dataset(list: &str) -> std::result::Result<Vec<f64>, String> {
    let tokens: Vec<&str> = list
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    let mut values = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        if !is_ellipsis(token) {
            values.push(parse_value(token)?);
            continue;
        }

        let (prev, next) = match (i.checked_sub(1).map(|j| tokens[j]), tokens.get(i + 1)) {
            (Some(p), Some(n)) if !is_ellipsis(p) && !is_ellipsis(n) => (p, *n),
            _ => {
                return Err(
                    "Invalid ellipsis format: '...' needs a number on each side".to_string(),
                )
            }
        };

        let start = parse_value(prev)?.trunc() as i64;
        let end = parse_value(next)?.trunc() as i64;
        if start.abs_diff(end) as usize > MAX_DATASET_LEN {
            return Err(format!(
                "Dataset too large (max: {} values)",
                MAX_DATASET_LEN
            ));
        }

        if end > start {
            values.extend((start + 1..end).map(|v| v as f64));
        } else {
            values.extend((end + 1..start).rev().map(|v| v as f64));
        }
    }

    Ok(values)
}

/// Extract datasets from free text
pub fn extract_datasets(query: &str) -> std::result::Result<Vec<Vec<f64>>, String> {
    let bracketed: Vec<&str> = BRACKETED
        .captures_iter(query)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();

    if !bracketed.is_empty() {
        return bracketed.into_iter().map(expand_dataset).collect();
    }

    let loose: Vec<f64> = NUMBER
        .find_iter(query)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();

    if loose.is_empty() {
        Err("No dataset found in query".to_string())
    } else {
        Ok(vec![loose])
    }
}

/// Analyze the datasets in a query into the report text
pub fn analyze(query: &str) -> std::result::Result<String, String> {
    let datasets = extract_datasets(query)?;

    let stats = datasets
        .iter()
        .map(|d| {
            Stats::compute(d).ok_or_else(|| {
                "Dataset must contain at least 2 values for statistical analysis".to_string()
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if let [single] = stats.as_slice() {
        let data = &datasets[0];
        let trend = if data[data.len() - 1] > data[0] {
            "increasing"
        } else {
            "decreasing"
        };

        let mut lines = vec!["Dataset Analysis:".to_string()];
        lines.extend(single.lines(""));
        lines.push(format!("Trend: {}", trend));
        return Ok(lines.join("\n"));
    }

    let mut lines = vec!["Dataset Comparisons:".to_string()];
    for (i, s) in stats.iter().enumerate() {
        lines.push(format!("Dataset {}:", i + 1));
        lines.extend(s.lines("  "));
    }
    Ok(lines.join("\n"))
}

/// Built-in tool: dataset statistics
#[derive(Debug, Default, Clone, Copy)]
pub struct DataAnalysisTool;

impl DataAnalysisTool {
    pub fn new() -> Self {
        DataAnalysisTool
    }
}

#[async_trait]
impl Tool for DataAnalysisTool {
    fn name(&self) -> &str {
        "data_analysis"
    }

    fn description(&self) -> &str {
        "The tool for ANY dataset analysis. Always use it for numbers in square brackets \
         [1, 2, 3], requests for mean, median or standard deviation, several numbers in \
         sequence, datasets with ellipsis [1, ..., 100], and dataset comparisons \
         [1,2,3], [4,5,6]. Examples: 'Calculate mean of [1, 2, 3]', \
         'Get mean of numbers: 1, 2, 3', 'Compare: [1,2,3], [4,5,6]'."
    }

    fn parameters_schema(&self) -> Value {
        query_schema(
            "Query including a dataset, e.g. 'Calculate mean, median, std of dataset: [1, 2, 3]' \
             or 'Compare datasets: [10, 20, 30], [5, 15, 25]'",
        )
    }

    async fn execute(&self, args: Value) -> Result<ToolResult> {
        let query = query_arg(&args)?;
        Ok(match analyze(query) {
            Ok(report) => ToolResult::success(report),
            Err(msg) => ToolResult::failure(msg),
        })
    }
}
