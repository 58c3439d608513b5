//! Turning training histories, models and evaluations into charts and text.

use std::fmt;

use crate::error::{check_len, Error, Result};
use crate::evaluate::{Evaluation, ResultsTable};
use crate::model::History;
use crate::plot::{ChartKind, ChartSpec, Render, Series};
use crate::traits::Regressor;

/// Training (and validation) loss per epoch.
pub fn loss_chart(history: &History) -> ChartSpec {
    let per_epoch =
        |values: &[f32]| values.iter().enumerate().map(|(i, &v)| (i as f64, f64::from(v))).collect();

    let last = history.last_loss().unwrap_or(f32::NAN);
    let title = match history.last_val_loss() {
        Some(val) => format!("Loss: {last} / Val_loss: {val}"),
        None => format!("Loss: {last}"),
    };
    let max = history
        .loss
        .iter()
        .chain(history.val_loss.iter().flatten())
        .fold(0.0f32, |m, &v| m.max(v));
    // an empty or all-zero history still needs a non-empty axis
    let max = if max > 0.0 { max } else { 1.0 };

    let mut chart = ChartSpec::new(ChartKind::Line, title)
        .labels("Epoch", "Loss")
        .y_range(0.0, f64::from(max))
        .series(Series::new("loss", per_epoch(&history.loss)));
    if let Some(val) = &history.val_loss {
        chart = chart.series(Series::new("val_loss", per_epoch(val)));
    }
    chart
}

/// Percent error against the actual value, largest actual first.
pub fn error_chart(table: &ResultsTable) -> Result<ChartSpec> {
    let d = table.describe_errors()?;
    let points = table
        .sorted_by_actual_desc()
        .iter()
        .map(|r| (r.actual, r.percent_error))
        .collect();
    Ok(ChartSpec::new(
        ChartKind::LineWithMarkers,
        format!("Error: mean={:.4}, std={:.4}", d.mean, d.std),
    )
    .labels("Actual", "% error")
    .series(Series::new("% error", points)))
}

pub fn error_box_chart(table: &ResultsTable) -> Result<ChartSpec> {
    let d = table.describe_errors()?;
    let points = table.errors().map(|e| (e, 0.0)).collect();
    Ok(
        ChartSpec::new(ChartKind::BoxPlot, format!("Error: median={:.4}", d.median))
            .labels("% error", "")
            .series(Series::new("% error", points)),
    )
}

/// Feature weights of a one-layer model, largest first.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightsTable {
    pub rows: Vec<(String, f32)>,
}

impl fmt::Display for WeightsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.rows.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
        write!(f, "{:width$} {:>14}", "", "feature_weight")?;
        for (name, w) in &self.rows {
            write!(f, "\n{name:width$} {w:>14.6}")?;
        }
        Ok(())
    }
}

/// Pair each input feature with its weight in the model's first dense layer
/// (first unit), sorted by weight, descending.
pub fn linear_weights_table<M, S>(model: &M, feature_names: &[S]) -> Result<WeightsTable>
where
    M: Regressor + ?Sized,
    S: AsRef<str>,
{
    let kernel = model.weights().ok_or(Error::MissingWeights)?;
    check_len("feature names", kernel.nrows(), feature_names.len())?;
    if kernel.ncols() == 0 {
        return Err(Error::MissingWeights);
    }
    let mut rows: Vec<(String, f32)> = feature_names
        .iter()
        .zip(kernel.column(0))
        .map(|(name, &w)| (name.as_ref().to_string(), w))
        .collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1));
    Ok(WeightsTable { rows })
}

/// Show the model summary and its loss curve. With `feature_names`, also the
/// weight table.
pub fn render_model<M, S, R>(
    model: &M,
    history: &History,
    feature_names: Option<&[S]>,
    renderer: &mut R,
) -> Result<()>
where
    M: Regressor + ?Sized,
    S: AsRef<str>,
    R: Render + ?Sized,
{
    renderer.note(&model.summary())?;
    renderer.render(&loss_chart(history))?;
    if let Some(names) = feature_names {
        renderer.note(&linear_weights_table(model, names)?.to_string())?;
    }
    Ok(())
}

fn render_table<R: Render + ?Sized>(table: &ResultsTable, renderer: &mut R) -> Result<()> {
    renderer.note(&table.sorted_by_actual_desc().to_string())?;
    renderer.render(&error_chart(table)?)?;
    renderer.render(&error_box_chart(table)?)?;
    renderer.note(&table.describe_errors()?.to_string())
}

/// Tables, charts and statistics of the full and the outlier-free results,
/// then the three losses.
pub fn render_evaluation<R: Render + ?Sized>(evaluation: &Evaluation, renderer: &mut R) -> Result<()> {
    render_table(&evaluation.results, renderer)?;
    renderer.note("Remove outliers from results and recalculate loss")?;
    render_table(&evaluation.filtered, renderer)?;

    let s = &evaluation.summary;
    renderer.note(&format!("MSE of training: {}", s.training_loss))?;
    renderer.note(&format!("MSE of testing: {}", s.testing_loss))?;
    renderer.note(&format!(
        "MSE of testing without outliers: {}",
        s.testing_loss_without_outliers
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loss_chart_titles_and_range() {
        let h = History {
            loss: vec![4.0, 2.0, 1.0],
            val_loss: None,
        };
        let c = loss_chart(&h);
        assert_eq!(c.title, "Loss: 1");
        assert_eq!(c.y_range, Some((0.0, 4.0)));
        assert_eq!(c.series.len(), 1);
        assert_eq!(c.series[0].points[2], (2.0, 1.0));

        let h = History {
            loss: vec![4.0, 2.0],
            val_loss: Some(vec![5.0, 3.0]),
        };
        let c = loss_chart(&h);
        assert_eq!(c.title, "Loss: 2 / Val_loss: 3");
        assert_eq!(c.y_range, Some((0.0, 5.0)));
        assert_eq!(c.series[1].name, "val_loss");
    }

    #[test]
    fn loss_chart_range_is_never_flat() {
        let empty = loss_chart(&History::default());
        assert_eq!(empty.y_range, Some((0.0, 1.0)));

        let zeros = History {
            loss: vec![0.0, 0.0],
            val_loss: Some(vec![0.0, 0.0]),
        };
        assert_eq!(loss_chart(&zeros).y_range, Some((0.0, 1.0)));
    }

    #[test]
    fn weights_table_format() {
        let t = WeightsTable {
            rows: vec![("rooms".into(), 0.5), ("age".into(), -0.25)],
        };
        let text = t.to_string();
        assert!(text.starts_with("      feature_weight"), "{text}");
        assert!(text.contains("rooms       0.500000"), "{text}");
    }
}
