// Point series reshaper - flat point samples to grouped, sorted, colored line series
use crate::domain::series::{PointSample, SeriesGroup, XY};
use serde_json::Value;
use std::collections::BTreeMap;

/// Line colors, assigned by group position. Groups past the end reuse colors.
pub const PALETTE: [&str; 19] = [
    "DarkOrange",
    "ForestGreen",
    "DeepPink",
    "DarkViolet",
    "Teal",
    "Maroon",
    "RoyalBlue",
    "Silver",
    "MediumPurple",
    "Red",
    "Lime",
    "Tan",
    "LightGoldenrodYellow",
    "Turquoise",
    "Pink",
    "DeepSkyBlue",
    "OrangeRed",
    "LightGrey",
    "Olive",
];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReshapeError {
    #[error("sample key {:?} of series {:?} is not numeric", .sample.sample_key, .sample.parent_key)]
    NonNumericKey { sample: PointSample },
    #[error("value in bucket {:?} of series {:?} is not numeric", .sample.sample_key, .sample.parent_key)]
    NonNumericValue { sample: PointSample },
    #[error("sample in bucket {:?} of series {:?} has no [x, y] row", .sample.sample_key, .sample.parent_key)]
    MalformedSample { sample: PointSample },
}

/// Reshape raw samples into line-chart series.
///
/// Outer groups (by `parent_key`) are ordered by plain string comparison, so
/// `"10"` sorts before `"2"`. Buckets inside a group (by `sample_key`) are
/// ordered numerically. Each bucket contributes one point: `x` is the bucket
/// key, `y` is the second cell of the first row of the first sample that
/// landed in the bucket.
pub fn reshape(samples: &[PointSample]) -> Result<Vec<SeriesGroup>, ReshapeError> {
    let mut groups: BTreeMap<&str, BTreeMap<&str, Vec<&PointSample>>> = BTreeMap::new();
    for sample in samples {
        groups
            .entry(sample.parent_key.as_str())
            .or_default()
            .entry(sample.sample_key.as_str())
            .or_default()
            .push(sample);
    }

    groups
        .into_iter()
        .enumerate()
        .map(|(index, (key, buckets))| -> Result<SeriesGroup, ReshapeError> {
            let mut points = Vec::with_capacity(buckets.len());
            for bucket in buckets.values() {
                // Buckets are never empty: one is created per pushed sample.
                let first = bucket[0];
                points.push(XY {
                    x: bucket_x(first)?,
                    y: bucket_y(first)?,
                });
            }
            points.sort_by(|a, b| a.x.total_cmp(&b.x));

            Ok(SeriesGroup {
                key: key.to_string(),
                color: PALETTE[index % PALETTE.len()].to_string(),
                values: points,
            })
        })
        .collect()
}

fn bucket_x(sample: &PointSample) -> Result<f64, ReshapeError> {
    parse_number(&sample.sample_key).ok_or_else(|| ReshapeError::NonNumericKey {
        sample: sample.clone(),
    })
}

fn bucket_y(sample: &PointSample) -> Result<f64, ReshapeError> {
    let cell = sample
        .values
        .first()
        .and_then(|row| row.get(1))
        .ok_or_else(|| ReshapeError::MalformedSample {
            sample: sample.clone(),
        })?;

    coerce(cell).ok_or_else(|| ReshapeError::NonNumericValue {
        sample: sample.clone(),
    })
}

/// Numbers pass through, numeric strings are parsed; nothing else coerces.
fn coerce(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
