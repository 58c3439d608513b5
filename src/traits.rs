use std::fmt::Debug;

use ndarray::prelude::*;
use ndarray::RemoveAxis;

use crate::error::Result;
use crate::layers::{
    Activation, ActivationLayer, BiasLayer, LinearLayer, ParallelLayer, Relu, Sequence, Sigmoid,
    Tanh,
};
use crate::model::LayerSummary;

pub trait Layer<D>: Debug
where
    D: Dimension,
{
    /// Type of the output shape, typically one of `Ix1`, `Ix2`, etc.
    ///
    /// Axis 0 of this is always the mini-batch axis.
    type Output: Dimension + RemoveAxis;

    /// For input of the given shape, compute the output shape.
    ///
    /// Axis 0 of both `input_shape` and `output_shape` is the mini-batch axis.
    fn output_shape(&self, input_shape: D) -> Self::Output;

    /// Number of parameters required for this layer.
    ///
    /// The caller provides parameters to the other methods as a single flat
    /// array, which the methods will slice up and reshape into whatever they
    /// need.
    fn num_params(&self) -> usize {
        0
    }

    /// Amount of temporary space this layer needs for hidden activations.
    ///
    /// The result is always `(N, k)`: one row of `k` saved values per example,
    /// so the buffer can be chunked along the mini-batch axis.
    fn hidden_activations_shape(&self, input_shape: D) -> Ix2 {
        Ix2(input_shape[0], 0)
    }

    /// Compute the output of this layer, given the `params` and the input `x`.
    /// Store the output in `y` and store the output of all hidden layers in `tmp`.
    ///
    /// Axis 0 of `x` is always the mini-batch axis; that is, each `x[i]` is a
    /// single training example or prediction task.
    fn apply(
        &self,
        params: ArrayView1<'_, f32>,
        x: ArrayView<'_, f32, D>,
        tmp: ArrayViewMut2<'_, f32>,
        y: ArrayViewMut<'_, f32, Self::Output>,
    );

    /// Given x and ∂L/∂z at x, compute partial derivatives ∂L/∂x and ∂L/∂p.
    ///
    /// Store ∂L/∂p in the out-param `dp`, a 1D vector of derivatives. Return
    /// ∂L/∂x.
    ///
    /// `tmp` must hold what `apply` stored there for the same `params` and `x`.
    fn derivatives(
        &self,
        params: ArrayView1<'_, f32>,
        x: ArrayView<'_, f32, D>,
        tmp: ArrayView2<'_, f32>,
        dz: ArrayView<'_, f32, Self::Output>,
        dp: ArrayViewMut1<'_, f32>,
    ) -> Array<f32, D>;

    /// The weight matrix of the first dense layer in this network, if any,
    /// as a `(num_inputs, num_outputs)` view into `params`.
    fn kernel<'p>(&self, _params: ArrayView1<'p, f32>) -> Option<ArrayView2<'p, f32>> {
        None
    }

    /// Append one summary row per primitive layer to `rows`.
    fn describe(&self, input_shape: D, rows: &mut Vec<LayerSummary>) {
        let output_shape = self.output_shape(input_shape);
        rows.push(LayerSummary::new(
            short_type_name::<Self>(),
            output_shape.slice(),
            self.num_params(),
        ));
    }

    fn then<L2>(self, other: L2) -> Sequence<Self, L2>
    where
        Self: Sized,
        L2: Layer<Self::Output>,
    {
        Sequence::new(self, other)
    }

    fn relu(self) -> Sequence<Self, ActivationLayer<Relu>>
    where
        Self: Sized,
    {
        self.then(ActivationLayer::new(Relu))
    }

    fn sigmoid(self) -> Sequence<Self, ActivationLayer<Sigmoid>>
    where
        Self: Sized,
    {
        self.then(ActivationLayer::new(Sigmoid))
    }

    fn tanh(self) -> Sequence<Self, ActivationLayer<Tanh>>
    where
        Self: Sized,
    {
        self.then(ActivationLayer::new(Tanh))
    }

    fn activation(self, f: Activation) -> Sequence<Self, ActivationLayer<Activation>>
    where
        Self: Sized,
    {
        self.then(ActivationLayer::new(f))
    }

    fn linear_no_bias(self, num_inputs: usize, num_outputs: usize) -> Sequence<Self, LinearLayer>
    where
        Self: Sized + Layer<D, Output = Ix2>,
    {
        Sequence::new(self, LinearLayer::new(num_inputs, num_outputs))
    }

    fn linear(
        self,
        num_inputs: usize,
        num_outputs: usize,
    ) -> Sequence<Self, Sequence<LinearLayer, BiasLayer<Ix2>>>
    where
        Self: Sized + Layer<D, Output = Ix2>,
    {
        let bias = BiasLayer::new(Ix2(1, num_outputs));

        self.then(Sequence::new(
            LinearLayer::new(num_inputs, num_outputs),
            bias,
        ))
    }

    /// Split each mini-batch into chunks of `batch_size` examples and run them
    /// on the rayon thread pool.
    fn parallel(self, batch_size: usize) -> ParallelLayer<Self>
    where
        Self: Sized,
    {
        ParallelLayer::new(self, batch_size)
    }
}

pub trait Loss<D: Dimension>: Debug {
    /// Name shown in model summaries and reports, e.g. `"mse"`.
    fn name(&self) -> &'static str;
    fn loss(&self, y: ArrayView<'_, f32, D>, yh: ArrayView<'_, f32, D>) -> f32;
    /// Partial derivative of the loss with respect to each element of `yh`.
    fn deriv(&self, y: ArrayView<'_, f32, D>, yh: ArrayView<'_, f32, D>) -> Array<f32, D>;
}

pub trait ActivationFn: Copy + Clone + Debug {
    fn f(self, x: f32) -> f32;
    fn df(self, x: f32) -> f32;
}

/// A trained regression model, as seen by the evaluator.
///
/// Inputs are `(num_examples, num_features)`; predictions and targets are
/// `(num_examples, num_outputs)`.
pub trait Regressor {
    fn predict(&self, inputs: ArrayView2<'_, f32>) -> Result<Array2<f32>>;

    /// Loss of the model's predictions for `inputs` against `targets`.
    fn evaluate(&self, inputs: ArrayView2<'_, f32>, targets: ArrayView2<'_, f32>) -> Result<f32>;

    /// Human-readable description of the network.
    fn summary(&self) -> String;

    /// Weights of the first dense layer, `(num_features, num_units)`.
    fn weights(&self) -> Option<Array2<f32>> {
        None
    }
}

/// Maps model-scale values back to the original units of the data.
pub trait InverseScale {
    fn inverse_transform(&self, values: ArrayView2<'_, f32>) -> Result<Array2<f32>>;
}

impl<F> InverseScale for F
where
    F: Fn(ArrayView2<'_, f32>) -> Array2<f32>,
{
    fn inverse_transform(&self, values: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        Ok(self(values))
    }
}

/// `regeval::layers::linear::LinearLayer` -> `LinearLayer`
pub(crate) fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}
