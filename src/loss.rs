//! Loss functions for regression.
//!
//! All losses here average over every element of the output, so a batch of
//! `N` examples with `k` outputs each is `N * k` terms.

use ndarray::prelude::*;
use ndarray::Zip;
use serde::{Deserialize, Serialize};

use crate::traits::Loss;

/// Mean of squared differences. The usual choice for regression.
#[derive(Debug, Clone, Copy)]
pub struct MeanSquaredError;

impl<D: Dimension> Loss<D> for MeanSquaredError {
    fn name(&self) -> &'static str {
        "mse"
    }

    fn loss(&self, y: ArrayView<'_, f32, D>, yh: ArrayView<'_, f32, D>) -> f32 {
        assert_eq!(y.shape(), yh.shape());
        Zip::from(&y)
            .and(&yh)
            .map_collect(|&y, &yh| (yh - y).powi(2))
            .mean()
            .unwrap_or(0.0)
    }

    fn deriv(&self, y: ArrayView<'_, f32, D>, yh: ArrayView<'_, f32, D>) -> Array<f32, D> {
        assert_eq!(y.shape(), yh.shape());
        let n = y.len().max(1) as f32;
        Zip::from(&y)
            .and(&yh)
            .map_collect(|&y, &yh| 2.0 * (yh - y) / n)
    }
}

/// Mean of absolute differences. Less sensitive to a few wild targets than
/// `MeanSquaredError`.
#[derive(Debug, Clone, Copy)]
pub struct MeanAbsoluteError;

impl<D: Dimension> Loss<D> for MeanAbsoluteError {
    fn name(&self) -> &'static str {
        "mae"
    }

    fn loss(&self, y: ArrayView<'_, f32, D>, yh: ArrayView<'_, f32, D>) -> f32 {
        assert_eq!(y.shape(), yh.shape());
        Zip::from(&y)
            .and(&yh)
            .map_collect(|&y, &yh| (yh - y).abs())
            .mean()
            .unwrap_or(0.0)
    }

    fn deriv(&self, y: ArrayView<'_, f32, D>, yh: ArrayView<'_, f32, D>) -> Array<f32, D> {
        assert_eq!(y.shape(), yh.shape());
        let n = y.len().max(1) as f32;
        Zip::from(&y).and(&yh).map_collect(|&y, &yh| {
            let d = yh - y;
            if d > 0.0 {
                1.0 / n
            } else if d < 0.0 {
                -1.0 / n
            } else {
                0.0
            }
        })
    }
}

/// Loss chosen at run time, e.g. from a `ModelConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    #[default]
    MeanSquaredError,
    MeanAbsoluteError,
}

impl<D: Dimension> Loss<D> for LossKind {
    fn name(&self) -> &'static str {
        match self {
            LossKind::MeanSquaredError => Loss::<D>::name(&MeanSquaredError),
            LossKind::MeanAbsoluteError => Loss::<D>::name(&MeanAbsoluteError),
        }
    }

    fn loss(&self, y: ArrayView<'_, f32, D>, yh: ArrayView<'_, f32, D>) -> f32 {
        match self {
            LossKind::MeanSquaredError => MeanSquaredError.loss(y, yh),
            LossKind::MeanAbsoluteError => MeanAbsoluteError.loss(y, yh),
        }
    }

    fn deriv(&self, y: ArrayView<'_, f32, D>, yh: ArrayView<'_, f32, D>) -> Array<f32, D> {
        match self {
            LossKind::MeanSquaredError => MeanSquaredError.deriv(y, yh),
            LossKind::MeanAbsoluteError => MeanAbsoluteError.deriv(y, yh),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mse_and_mae_of_known_values() {
        let y = array![[1.0f32], [2.0], [3.0], [4.0]];
        let yh = array![[1.0f32], [3.0], [1.0], [4.0]];
        assert_eq!(MeanSquaredError.loss(y.view(), yh.view()), 5.0 / 4.0);
        assert_eq!(MeanAbsoluteError.loss(y.view(), yh.view()), 3.0 / 4.0);
        assert_eq!(
            Loss::<Ix2>::name(&LossKind::MeanAbsoluteError),
            "mae"
        );
    }

    #[test]
    fn mse_derivative_matches_finite_difference() {
        let y = array![[0.5f32, -1.0], [2.0, 0.25]];
        let mut yh = array![[0.1f32, -0.5], [1.0, 1.0]];
        let d = MeanSquaredError.deriv(y.view(), yh.view());
        let h = 1e-3;
        for i in 0..2 {
            for j in 0..2 {
                let saved = yh[[i, j]];
                yh[[i, j]] = saved + h;
                let plus = MeanSquaredError.loss(y.view(), yh.view());
                yh[[i, j]] = saved - h;
                let minus = MeanSquaredError.loss(y.view(), yh.view());
                yh[[i, j]] = saved;
                let measured = (plus - minus) / (2.0 * h);
                assert!(
                    (measured - d[[i, j]]).abs() < 1e-2,
                    "element ({i}, {j}): claimed {}, measured {measured}",
                    d[[i, j]]
                );
            }
        }
    }
}
