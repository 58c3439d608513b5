use std::marker::PhantomData;

use ndarray::prelude::*;
use ndarray::RemoveAxis;

use crate::model::LayerSummary;
use crate::Layer;

/// Layer that does nothing but specify the shape of the data coming in.
///
/// Handy as the head of a chain: `InputLayer::new().linear(n, 16).relu()`.
#[derive(Debug)]
pub struct InputLayer<D> {
    phantom: PhantomData<D>,
}

impl<D: Dimension> InputLayer<D> {
    pub fn new() -> Self {
        InputLayer {
            phantom: PhantomData,
        }
    }
}

impl<D: Dimension> Default for InputLayer<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Dimension + RemoveAxis> Layer<D> for InputLayer<D> {
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
        y.assign(&x);
    }

    fn derivatives(
        &self,
        _params: ArrayView1<'_, f32>,
        _x: ArrayView<'_, f32, D>,
        _tmp: ArrayView2<'_, f32>,
        dz: ArrayView<'_, f32, D>,
        _dp: ArrayViewMut1<'_, f32>,
    ) -> Array<f32, D> {
        dz.into_owned()
    }

    fn describe(&self, _input_shape: D, _rows: &mut Vec<LayerSummary>) {}
}
