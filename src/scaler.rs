//! Column-wise scalers. Fit on the training data, `transform` everything the
//! model sees, and `inverse_transform` its outputs back to real units.

use ndarray::prelude::*;
use ndarray::Zip;

use crate::error::{check_len, Error, Result};
use crate::traits::InverseScale;

/// Columns with a smaller range or deviation than this are treated as
/// constant.
const MIN_SPREAD: f32 = 1e-8;

/// Rescales each column linearly so that the fitted minimum maps to `low` and
/// the fitted maximum to `high` (default `[0, 1]`).
#[derive(Debug, Clone)]
pub struct MinMaxScaler {
    low: f32,
    high: f32,
    /// Per-column `(min, max)` seen by `fit`.
    fitted: Option<(Array1<f32>, Array1<f32>)>,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self::with_range(0.0, 1.0)
    }

    pub fn with_range(low: f32, high: f32) -> Self {
        MinMaxScaler {
            low,
            high,
            fitted: None,
        }
    }

    pub fn fit(&mut self, data: ArrayView2<'_, f32>) -> Result<()> {
        if data.nrows() == 0 {
            return Err(Error::EmptyInput);
        }
        let min = data.fold_axis(Axis(0), f32::INFINITY, |&a, &b| a.min(b));
        let max = data.fold_axis(Axis(0), f32::NEG_INFINITY, |&a, &b| a.max(b));
        self.fitted = Some((min, max));
        Ok(())
    }

    pub fn fit_transform(&mut self, data: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        self.fit(data)?;
        self.transform(data)
    }

    fn params(&self, data: ArrayView2<'_, f32>) -> Result<(&Array1<f32>, &Array1<f32>)> {
        let (min, max) = self
            .fitted
            .as_ref()
            .ok_or_else(|| Error::InvalidConfig("MinMaxScaler used before fit".into()))?;
        check_len("scaled columns", min.len(), data.ncols())?;
        Ok((min, max))
    }

    pub fn transform(&self, data: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        let (min, max) = self.params(data)?;
        let (low, high) = (self.low, self.high);
        let mut out = data.to_owned();
        for mut row in out.rows_mut() {
            Zip::from(&mut row).and(min).and(max).for_each(|v, &lo, &hi| {
                let range = hi - lo;
                *v = if range > MIN_SPREAD {
                    (*v - lo) / range * (high - low) + low
                } else {
                    low
                };
            });
        }
        Ok(out)
    }
}

impl Default for MinMaxScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl InverseScale for MinMaxScaler {
    fn inverse_transform(&self, values: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        let (min, max) = self.params(values)?;
        let (low, high) = (self.low, self.high);
        let mut out = values.to_owned();
        for mut row in out.rows_mut() {
            Zip::from(&mut row).and(min).and(max).for_each(|v, &lo, &hi| {
                let range = hi - lo;
                *v = if range > MIN_SPREAD {
                    (*v - low) / (high - low) * range + lo
                } else {
                    lo
                };
            });
        }
        Ok(out)
    }
}

/// Centers each column on zero and divides by its (population) standard
/// deviation.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    /// Per-column `(mean, std)` seen by `fit`.
    fitted: Option<(Array1<f32>, Array1<f32>)>,
}

impl StandardScaler {
    pub fn new() -> Self {
        StandardScaler { fitted: None }
    }

    pub fn fit(&mut self, data: ArrayView2<'_, f32>) -> Result<()> {
        let mean = data.mean_axis(Axis(0)).ok_or(Error::EmptyInput)?;
        let std = data
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > MIN_SPREAD { s } else { 1.0 });
        self.fitted = Some((mean, std));
        Ok(())
    }

    pub fn fit_transform(&mut self, data: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        self.fit(data)?;
        self.transform(data)
    }

    fn params(&self, data: ArrayView2<'_, f32>) -> Result<(&Array1<f32>, &Array1<f32>)> {
        let (mean, std) = self
            .fitted
            .as_ref()
            .ok_or_else(|| Error::InvalidConfig("StandardScaler used before fit".into()))?;
        check_len("scaled columns", mean.len(), data.ncols())?;
        Ok((mean, std))
    }

    pub fn transform(&self, data: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        let (mean, std) = self.params(data)?;
        Ok((&data - mean) / std)
    }
}

impl InverseScale for StandardScaler {
    fn inverse_transform(&self, values: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        let (mean, std) = self.params(values)?;
        Ok(&values * std + mean)
    }
}
