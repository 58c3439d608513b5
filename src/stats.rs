//! Descriptive statistics over a column of values.
//!
//! Percentiles use linear interpolation between the closest ranks of the
//! ascending-sorted values: for quantile `q` of `n` values, the position is
//! `q * (n - 1)` and the result interpolates between the values just below
//! and just above it. This is the common "linear" convention (the default in
//! numpy and pandas), so results can be checked against those tools.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Sort `values` ascending. NaNs are not expected; they sort last.
pub fn sorted(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.into_iter().collect();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Percentile `q` (a fraction in `[0, 1]`) of already-sorted values.
pub fn percentile(sorted: &[f64], q: f64) -> Result<f64> {
    if sorted.is_empty() {
        return Err(Error::EmptyInput);
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Ok(sorted[lo]);
    }
    Ok(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Summary statistics in the layout of a pandas `describe()`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (divides by `n - 1`); 0 for a single value.
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl Describe {
    pub fn of(values: impl IntoIterator<Item = f64>) -> Result<Describe> {
        let s = sorted(values);
        let n = s.len();
        if n == 0 {
            return Err(Error::EmptyInput);
        }
        let mean = s.iter().sum::<f64>() / n as f64;
        let std = if n > 1 {
            (s.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
        } else {
            0.0
        };
        Ok(Describe {
            count: n,
            mean,
            std,
            min: s[0],
            q25: percentile(&s, 0.25)?,
            median: percentile(&s, 0.5)?,
            q75: percentile(&s, 0.75)?,
            max: s[n - 1],
        })
    }
}

impl fmt::Display for Describe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "count {:>14}", self.count)?;
        writeln!(f, "mean  {:>14.6}", self.mean)?;
        writeln!(f, "std   {:>14.6}", self.std)?;
        writeln!(f, "min   {:>14.6}", self.min)?;
        writeln!(f, "25%   {:>14.6}", self.q25)?;
        writeln!(f, "50%   {:>14.6}", self.median)?;
        writeln!(f, "75%   {:>14.6}", self.q75)?;
        write!(f, "max   {:>14.6}", self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_interpolation_between_ranks() {
        let s = [1.0, 2.0, 3.0, 4.0];
        // positions 0.75, 1.5, 2.25
        assert_eq!(percentile(&s, 0.25).unwrap(), 1.75);
        assert_eq!(percentile(&s, 0.5).unwrap(), 2.5);
        assert_eq!(percentile(&s, 0.75).unwrap(), 3.25);
        assert_eq!(percentile(&s, 0.0).unwrap(), 1.0);
        assert_eq!(percentile(&s, 1.0).unwrap(), 4.0);
    }

    #[test]
    fn tiny_inputs_are_well_defined() {
        assert_eq!(percentile(&[7.0], 0.25).unwrap(), 7.0);
        assert_eq!(percentile(&[0.0, 10.0], 0.25).unwrap(), 2.5);
        assert_eq!(percentile(&[0.0, 10.0], 0.75).unwrap(), 7.5);
        assert!(matches!(percentile(&[], 0.5), Err(Error::EmptyInput)));
    }

    #[test]
    fn exact_ranks_are_returned_as_is() {
        let s = [0.0, 1.0, f64::INFINITY, f64::INFINITY, f64::INFINITY];
        assert_eq!(percentile(&s, 0.75).unwrap(), f64::INFINITY);
        assert_eq!(percentile(&s, 1.0).unwrap(), f64::INFINITY);
        assert_eq!(percentile(&s, 0.25).unwrap(), 1.0);
    }

    #[test]
    fn describe_matches_pandas() {
        // pandas.Series([4, 1, 3, 2, 10]).describe()
        let d = Describe::of([4.0, 1.0, 3.0, 2.0, 10.0]).unwrap();
        assert_eq!(d.count, 5);
        assert_eq!(d.mean, 4.0);
        assert!((d.std - 3.535534).abs() < 1e-6);
        assert_eq!((d.min, d.q25, d.median, d.q75, d.max), (1.0, 2.0, 3.0, 4.0, 10.0));

        let one = Describe::of([5.0]).unwrap();
        assert_eq!(one.std, 0.0);
        assert!(matches!(Describe::of(Vec::new()), Err(Error::EmptyInput)));
    }
}
