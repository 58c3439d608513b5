use ndarray::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{check_len, Error, Result};

/// Input rows paired with their target rows.
///
/// Row `i` of `inputs` and row `i` of `targets` always describe the same
/// example; every operation here keeps them aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    inputs: Array2<f32>,
    targets: Array2<f32>,
}

impl Dataset {
    pub fn new(inputs: Array2<f32>, targets: Array2<f32>) -> Result<Self> {
        check_len("dataset rows", inputs.nrows(), targets.nrows())?;
        Ok(Dataset { inputs, targets })
    }

    pub fn inputs(&self) -> ArrayView2<'_, f32> {
        self.inputs.view()
    }

    pub fn targets(&self) -> ArrayView2<'_, f32> {
        self.targets.view()
    }

    pub fn len(&self) -> usize {
        self.inputs.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn num_features(&self) -> usize {
        self.inputs.ncols()
    }

    /// The examples at `indices`, in that order.
    ///
    /// *Panics* if an index is out of bounds.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            inputs: self.inputs.select(Axis(0), indices),
            targets: self.targets.select(Axis(0), indices),
        }
    }

    /// Shuffle the rows with `seed` and split off the last `test_fraction` of
    /// them as a test set. Returns `(train, test)`.
    pub fn split(&self, test_fraction: f64, seed: u64) -> Result<(Dataset, Dataset)> {
        if !(0.0..1.0).contains(&test_fraction) {
            return Err(Error::InvalidConfig(format!(
                "test fraction must be in [0, 1), got {test_fraction}"
            )));
        }
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));
        let num_test = (self.len() as f64 * test_fraction).round() as usize;
        let (train, test) = order.split_at(self.len() - num_test);
        Ok((self.select(train), self.select(test)))
    }

    /// Apply `f` to the inputs and `g` to the targets, e.g. fitted scalers.
    pub fn map<F, G>(&self, f: F, g: G) -> Result<Dataset>
    where
        F: FnOnce(ArrayView2<'_, f32>) -> Result<Array2<f32>>,
        G: FnOnce(ArrayView2<'_, f32>) -> Result<Array2<f32>>,
    {
        Dataset::new(f(self.inputs.view())?, g(self.targets.view())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> Dataset {
        let x = Array::from_shape_fn((n, 2), |(i, j)| (i * 10 + j) as f32);
        let y = Array::from_shape_fn((n, 1), |(i, _)| i as f32);
        Dataset::new(x, y).unwrap()
    }

    #[test]
    fn split_keeps_rows_aligned() {
        let data = numbered(10);
        let (train, test) = data.split(0.3, 7).unwrap();
        assert_eq!(train.len(), 7);
        assert_eq!(test.len(), 3);
        for part in [&train, &test] {
            for (x, y) in part.inputs().rows().into_iter().zip(part.targets().rows()) {
                assert_eq!(x[0], y[0] * 10.0);
            }
        }
        let mut seen: Vec<f32> = train.targets().iter().chain(test.targets().iter()).copied().collect();
        seen.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(seen, (0..10).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn row_counts_must_agree() {
        assert!(matches!(
            Dataset::new(Array2::zeros((3, 2)), Array2::zeros((2, 1))),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
