//! Error-based evaluation of a trained regression model.
//!
//! Predictions are compared with the actual values in their original units
//! as a percent error per example. Examples whose error lies outside the
//! 1.5 × IQR fences are treated as outliers, and the test loss is measured
//! again without them.

use std::fmt;

use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::{check_len, Error, Result};
use crate::stats::{self, Describe};
use crate::traits::{InverseScale, Regressor};

/// Multiplier of the interquartile range used for the outlier fences.
pub const IQR_FENCE: f64 = 1.5;

/// One test example: what the model said, what was true, and how far off it
/// was.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Row of this example in the test set the table was computed from.
    pub index: usize,
    pub prediction: f64,
    pub actual: f64,
    /// `|actual - prediction| / |actual| * 100`; never negative.
    pub percent_error: f64,
}

/// Symmetric percentage deviation of `prediction` from `actual`.
///
/// The caller must ensure `actual != 0`. Extreme ratios can still overflow
/// to infinity; `compute_results` rejects those.
pub fn percent_error(prediction: f64, actual: f64) -> f64 {
    ((actual - prediction) / actual).abs() * 100.0
}

/// An ordered collection of `PredictionRecord`s.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultsTable {
    records: Vec<PredictionRecord>,
}

impl ResultsTable {
    pub fn records(&self) -> &[PredictionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PredictionRecord> {
        self.records.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = f64> + '_ {
        self.records.iter().map(|r| r.percent_error)
    }

    /// Test-set rows of the records, in table order.
    pub fn indices(&self) -> Vec<usize> {
        self.records.iter().map(|r| r.index).collect()
    }

    /// A copy ordered by `actual`, largest first, for presentation. Ties keep
    /// their relative order.
    pub fn sorted_by_actual_desc(&self) -> ResultsTable {
        let mut records = self.records.clone();
        records.sort_by(|a, b| b.actual.total_cmp(&a.actual));
        ResultsTable { records }
    }

    /// Descriptive statistics of the percent errors.
    pub fn describe_errors(&self) -> Result<Describe> {
        Describe::of(self.errors())
    }
}

impl FromIterator<PredictionRecord> for ResultsTable {
    fn from_iter<I: IntoIterator<Item = PredictionRecord>>(iter: I) -> Self {
        ResultsTable {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a ResultsTable {
    type Item = &'a PredictionRecord;
    type IntoIter = std::slice::Iter<'a, PredictionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl fmt::Display for ResultsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>6} {:>14} {:>14} {:>10}",
            "", "Prediction", "Real", "% error"
        )?;
        for r in &self.records {
            writeln!(
                f,
                "{:>6} {:>14.4} {:>14.4} {:>10.4}",
                r.index, r.prediction, r.actual, r.percent_error
            )?;
        }
        write!(f, "[{} rows]", self.records.len())
    }
}

/// Build a results table from matching predictions and actual values.
///
/// Fails with `ShapeMismatch` if the lengths differ, `ZeroActual` if an
/// actual value is zero and `NonFinite` if any value, or the resulting
/// percent error, is NaN or infinite.
pub fn compute_results(predictions: &[f64], actuals: &[f64]) -> Result<ResultsTable> {
    check_len("predictions vs. actuals", actuals.len(), predictions.len())?;
    predictions
        .iter()
        .zip(actuals)
        .enumerate()
        .map(|(index, (&prediction, &actual))| {
            if !prediction.is_finite() || !actual.is_finite() {
                return Err(Error::NonFinite { index });
            }
            if actual == 0.0 {
                return Err(Error::ZeroActual { index });
            }
            let percent_error = percent_error(prediction, actual);
            if !percent_error.is_finite() {
                return Err(Error::NonFinite { index });
            }
            Ok(PredictionRecord {
                index,
                prediction,
                actual,
                percent_error,
            })
        })
        .collect()
}

/// Tukey fences on the percent errors of a table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    pub fn contains(&self, percent_error: f64) -> bool {
        self.lower <= percent_error && percent_error <= self.upper
    }
}

/// Quartiles of the table's percent errors and the fences 1.5 IQR beyond
/// them. Fails with `EmptyInput` on an empty table.
pub fn compute_outlier_bounds(table: &ResultsTable) -> Result<OutlierBounds> {
    let errors = stats::sorted(table.errors());
    let q1 = stats::percentile(&errors, 0.25)?;
    let q3 = stats::percentile(&errors, 0.75)?;
    let iqr = q3 - q1;
    Ok(OutlierBounds {
        q1,
        q3,
        iqr,
        lower: q1 - IQR_FENCE * iqr,
        upper: q3 + IQR_FENCE * iqr,
    })
}

/// The records whose percent error lies within `bounds` (inclusive), in their
/// original order and with their original indices.
pub fn filter_outliers(table: &ResultsTable, bounds: &OutlierBounds) -> ResultsTable {
    table
        .iter()
        .filter(|r| bounds.contains(r.percent_error))
        .copied()
        .collect()
}

/// One row of a model comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub model_name: String,
    pub training_loss: f32,
    pub testing_loss: f32,
    pub testing_loss_without_outliers: f32,
}

/// Summaries of several evaluation runs, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryTable {
    rows: Vec<EvaluationSummary>,
}

impl SummaryTable {
    pub fn new() -> Self {
        SummaryTable { rows: vec![] }
    }

    /// Append `summary` to `prior`, or start a new table holding only it.
    pub fn appended(prior: Option<SummaryTable>, summary: EvaluationSummary) -> SummaryTable {
        let mut table = prior.unwrap_or_default();
        table.push(summary);
        table
    }

    pub fn push(&mut self, summary: EvaluationSummary) {
        self.rows.push(summary);
    }

    pub fn rows(&self) -> &[EvaluationSummary] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for SummaryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<24} {:>14} {:>14} {:>22}",
            "Model Name", "Training loss", "Testing loss", "Testing loss w/o outl."
        )?;
        for s in &self.rows {
            write!(
                f,
                "\n{:<24} {:>14.6} {:>14.6} {:>22.6}",
                s.model_name, s.training_loss, s.testing_loss, s.testing_loss_without_outliers
            )?;
        }
        Ok(())
    }
}

/// Everything one evaluation run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub summary: EvaluationSummary,
    /// One record per test example, in test-set order.
    pub results: ResultsTable,
    /// `results` without the outliers.
    pub filtered: ResultsTable,
    pub bounds: OutlierBounds,
}

/// First column of a model-output array, widened to `f64`.
fn first_column(values: &Array2<f32>, what: &'static str) -> Result<Vec<f64>> {
    if values.ncols() == 0 {
        return Err(Error::ShapeMismatch {
            what,
            expected: 1,
            found: 0,
        });
    }
    Ok(values.column(0).iter().map(|&v| f64::from(v)).collect())
}

/// Evaluate `model` on `train` and `test`.
///
/// Predictions and test targets are mapped back to real units with
/// `inverse_scale` before computing percent errors; losses are computed by
/// the model on the scaled data. The outlier-free test loss re-selects the
/// surviving rows of `test` by their recorded index.
pub fn evaluate<M, S>(
    model: &M,
    train: &Dataset,
    test: &Dataset,
    inverse_scale: &S,
    model_name: &str,
) -> Result<Evaluation>
where
    M: Regressor + ?Sized,
    S: InverseScale + ?Sized,
{
    let predictions = inverse_scale.inverse_transform(model.predict(test.inputs())?.view())?;
    let actuals = inverse_scale.inverse_transform(test.targets())?;
    check_len("prediction rows", test.len(), predictions.nrows())?;

    let results = compute_results(
        &first_column(&predictions, "prediction columns")?,
        &first_column(&actuals, "target columns")?,
    )?;
    let bounds = compute_outlier_bounds(&results)?;
    let filtered = filter_outliers(&results, &bounds);

    let training_loss = model.evaluate(train.inputs(), train.targets())?;
    let testing_loss = model.evaluate(test.inputs(), test.targets())?;
    let kept = test.select(&filtered.indices());
    let testing_loss_without_outliers = model.evaluate(kept.inputs(), kept.targets())?;

    Ok(Evaluation {
        summary: EvaluationSummary {
            model_name: model_name.to_string(),
            training_loss,
            testing_loss,
            testing_loss_without_outliers,
        },
        results,
        filtered,
        bounds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_error_is_symmetric_in_sign() {
        for (prediction, actual, expected) in [
            (10.0, 50.0, 80.0),
            (90.0, 50.0, 80.0),
            (-5.0, -10.0, 50.0),
            (3.0, 3.0, 0.0),
        ] {
            let e = percent_error(prediction, actual);
            assert!(
                (e - expected).abs() < 1e-9,
                "percent_error({prediction}, {actual}) = {e}, expected {expected}"
            );
        }
    }

    #[test]
    fn large_ratios_stay_finite() {
        // the squared ratio would be 1e320
        let e = percent_error(1.0, 1e-160);
        assert!(e.is_finite(), "{e}");
        assert!((e / 1e162 - 1.0).abs() < 1e-9, "{e}");
        assert!(compute_results(&[1.0], &[1e-160]).is_ok());
    }

    #[test]
    fn bounds_are_inclusive() {
        let b = OutlierBounds {
            q1: 1.0,
            q3: 2.0,
            iqr: 1.0,
            lower: -0.5,
            upper: 3.5,
        };
        assert!(b.contains(-0.5));
        assert!(b.contains(3.5));
        assert!(!b.contains(3.5000001));
    }

    #[test]
    fn sort_for_presentation_keeps_indices() {
        let table = compute_results(&[1.0, 2.0, 3.0], &[5.0, 50.0, 20.0]).unwrap();
        let sorted = table.sorted_by_actual_desc();
        assert_eq!(sorted.indices(), vec![1, 2, 0]);
        assert_eq!(table.indices(), vec![0, 1, 2]);
    }
}
