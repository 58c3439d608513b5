use ndarray::prelude::*;
use ndarray::{RemoveAxis, Zip};
use serde::{Deserialize, Serialize};

use crate::model::LayerSummary;
use crate::{ActivationFn, Layer};

/// Layer that applies the same real-valued function to each element.
#[derive(Debug)]
pub struct ActivationLayer<F> {
    f: F,
}

impl<F> ActivationLayer<F>
where
    F: ActivationFn,
{
    pub fn new(f: F) -> Self {
        ActivationLayer { f }
    }
}

impl<D, F> Layer<D> for ActivationLayer<F>
where
    D: Dimension + RemoveAxis,
    F: ActivationFn,
{
    type Output = D;

    fn output_shape(&self, input_shape: D) -> D {
        input_shape
    }

    fn apply(
        &self,
        _params: ArrayView1<'_, f32>,
        x: ArrayView<'_, f32, D>,
        _tmp: ArrayViewMut2<'_, f32>,
        mut y: ArrayViewMut<'_, f32, D>,
    ) {
        let f = self.f;
        Zip::from(&mut y).and(&x).for_each(|y, &x| *y = f.f(x));
    }

    fn derivatives(
        &self,
        _params: ArrayView1<'_, f32>,
        x: ArrayView<'_, f32, D>,
        _tmp: ArrayView2<'_, f32>,
        dz: ArrayView<'_, f32, D>,
        _dp: ArrayViewMut1<'_, f32>,
    ) -> Array<f32, D> {
        Zip::from(&x)
            .and(&dz)
            .map_collect(|&x, &dz| self.f.df(x) * dz)
    }

    fn describe(&self, input_shape: D, rows: &mut Vec<LayerSummary>) {
        rows.push(LayerSummary::new(
            format!("Activation({:?})", self.f),
            input_shape.slice(),
            0,
        ));
    }
}

/// The logistic function, a handy symmetric, s-shaped function.
#[derive(Debug, Clone, Copy)]
pub struct Sigmoid;

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

impl ActivationFn for Sigmoid {
    fn f(self, x: f32) -> f32 {
        sigmoid(x)
    }

    fn df(self, x: f32) -> f32 {
        let y = sigmoid(x);
        y * (1.0 - y)
    }
}

/// Rectified linear unit activation function.
#[derive(Debug, Clone, Copy)]
pub struct Relu;

impl ActivationFn for Relu {
    fn f(self, x: f32) -> f32 {
        x.max(0.0)
    }

    fn df(self, x: f32) -> f32 {
        if x >= 0.0 {
            1.0
        } else {
            0.0
        }
    }
}

/// Hyperbolic tangent. Like `Sigmoid`, but centered on zero.
#[derive(Debug, Clone, Copy)]
pub struct Tanh;

impl ActivationFn for Tanh {
    fn f(self, x: f32) -> f32 {
        x.tanh()
    }

    fn df(self, x: f32) -> f32 {
        let y = x.tanh();
        1.0 - y * y
    }
}

/// Activation chosen at run time, e.g. from a `ModelConfig`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Sigmoid,
    Tanh,
    /// Identity; the layer passes its input through unchanged.
    Linear,
}

impl ActivationFn for Activation {
    fn f(self, x: f32) -> f32 {
        match self {
            Activation::Relu => Relu.f(x),
            Activation::Sigmoid => Sigmoid.f(x),
            Activation::Tanh => Tanh.f(x),
            Activation::Linear => x,
        }
    }

    fn df(self, x: f32) -> f32 {
        match self {
            Activation::Relu => Relu.df(x),
            Activation::Sigmoid => Sigmoid.df(x),
            Activation::Tanh => Tanh.df(x),
            Activation::Linear => 1.0,
        }
    }
}

impl std::str::FromStr for Activation {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "relu" => Ok(Activation::Relu),
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "linear" => Ok(Activation::Linear),
            _ => Err(crate::Error::InvalidConfig(format!(
                "unknown activation {s:?}"
            ))),
        }
    }
}
