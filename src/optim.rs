//! Optimizers: turn a gradient into an update of the flat parameter vector.

use std::fmt::Debug;

use ndarray::prelude::*;
use ndarray::Zip;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub trait Optimizer: Debug + Send {
    /// Update `params` in place, given the gradient of the loss `grads`.
    fn step(&mut self, params: ArrayViewMut1<'_, f32>, grads: ArrayView1<'_, f32>);
}

/// Plain gradient descent.
#[derive(Debug, Clone)]
pub struct Sgd {
    learning_rate: f32,
}

impl Sgd {
    pub fn new(learning_rate: f32) -> Self {
        Sgd { learning_rate }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, mut params: ArrayViewMut1<'_, f32>, grads: ArrayView1<'_, f32>) {
        params.scaled_add(-self.learning_rate, &grads);
    }
}

/// Adam (Kingma & Ba, 2014): per-parameter step sizes from running averages
/// of the gradient and its square.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    /// Number of steps taken so far.
    t: i32,
    m: Array1<f32>,
    v: Array1<f32>,
}

impl Adam {
    pub fn new(learning_rate: f32) -> Self {
        Self::with_betas(learning_rate, 0.9, 0.999)
    }

    pub fn with_betas(learning_rate: f32, beta1: f32, beta2: f32) -> Self {
        Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon: 1e-7,
            t: 0,
            m: Array1::zeros(0),
            v: Array1::zeros(0),
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, mut params: ArrayViewMut1<'_, f32>, grads: ArrayView1<'_, f32>) {
        if self.m.len() != grads.len() {
            self.m = Array1::zeros(grads.len());
            self.v = Array1::zeros(grads.len());
            self.t = 0;
        }
        self.t += 1;
        let (b1, b2) = (self.beta1, self.beta2);
        let lr = self.learning_rate * (1.0 - b2.powi(self.t)).sqrt() / (1.0 - b1.powi(self.t));
        let eps = self.epsilon;

        Zip::from(&mut params)
            .and(&mut self.m)
            .and(&mut self.v)
            .and(&grads)
            .for_each(|p, m, v, &g| {
                *m = b1 * *m + (1.0 - b1) * g;
                *v = b2 * *v + (1.0 - b2) * g * g;
                *p -= lr * *m / (v.sqrt() + eps);
            });
    }
}

/// Optimizer chosen at run time, e.g. from a `ModelConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OptimizerKind {
    Sgd { learning_rate: f32 },
    Adam { learning_rate: f32 },
}

impl Default for OptimizerKind {
    fn default() -> Self {
        OptimizerKind::Adam {
            learning_rate: 0.001,
        }
    }
}

impl OptimizerKind {
    pub fn learning_rate(&self) -> f32 {
        match *self {
            OptimizerKind::Sgd { learning_rate } | OptimizerKind::Adam { learning_rate } => {
                learning_rate
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let rate = self.learning_rate();
        if rate.is_finite() && rate > 0.0 {
            Ok(())
        } else {
            Err(Error::InvalidConfig(format!(
                "learning rate must be positive, got {rate}"
            )))
        }
    }

    pub fn build(&self) -> Box<dyn Optimizer> {
        match *self {
            OptimizerKind::Sgd { learning_rate } => Box::new(Sgd::new(learning_rate)),
            OptimizerKind::Adam { learning_rate } => Box::new(Adam::new(learning_rate)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sgd_steps_against_the_gradient() {
        let mut p = array![1.0f32, -1.0];
        Sgd::new(0.5).step(p.view_mut(), array![2.0f32, -4.0].view());
        assert_eq!(p, array![0.0f32, 1.0]);
    }

    #[test]
    fn adam_first_step_is_learning_rate_sized() {
        // With bias correction, the first update is lr * g / |g| per element.
        let mut p = array![0.0f32, 0.0];
        let mut adam = Adam::new(0.1);
        adam.step(p.view_mut(), array![3.0f32, -0.02].view());
        assert!((p[0] + 0.1).abs() < 1e-4, "p[0] = {}", p[0]);
        assert!((p[1] - 0.1).abs() < 1e-3, "p[1] = {}", p[1]);
    }

    #[test]
    fn adam_minimizes_a_quadratic() {
        let mut p = array![5.0f32];
        let mut adam = Adam::new(0.1);
        for _ in 0..500 {
            let g = p.mapv(|x| 2.0 * (x - 1.5));
            adam.step(p.view_mut(), g.view());
        }
        assert!((p[0] - 1.5).abs() < 0.05, "p = {}", p[0]);
    }

    #[test]
    fn rejects_non_positive_rates() {
        assert!(OptimizerKind::Sgd { learning_rate: 0.0 }.validate().is_err());
        assert!(OptimizerKind::default().validate().is_ok());
    }
}
