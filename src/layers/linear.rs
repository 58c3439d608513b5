use ndarray::prelude::*;
use ndarray::RemoveAxis;

use crate::model::LayerSummary;
use crate::Layer;

/// A dense layer with a matrix of weights. Note: no biases! Use a BiasLayer
/// immediately after.
#[derive(Debug)]
pub struct LinearLayer {
    /// Number of inputs. Input shape is `(N, ni)`.
    ni: usize,
    /// Number of cells, i.e. outputs. Output shape is `(N, no)`.
    no: usize,
}

impl LinearLayer {
    pub fn new(num_inputs: usize, num_outputs: usize) -> Self {
        LinearLayer {
            ni: num_inputs,
            no: num_outputs,
        }
    }

    fn weights<'p>(&self, params: ArrayView1<'p, f32>) -> ArrayView2<'p, f32> {
        params
            .into_shape((self.ni, self.no))
            .expect("size of params should be self.num_params()")
    }
}

impl Layer<Ix2> for LinearLayer {
    type Output = Ix2;

    fn output_shape(&self, input_shape: Ix2) -> Ix2 {
        Ix2(input_shape[0], self.no)
    }

    fn num_params(&self) -> usize {
        self.ni * self.no
    }

    fn apply(
        &self,
        params: ArrayView1<'_, f32>,
        x: ArrayView2<'_, f32>,
        _tmp: ArrayViewMut2<'_, f32>,
        mut y: ArrayViewMut2<'_, f32>,
    ) {
        assert_eq!(
            x.shape()[1],
            self.ni,
            "input has {} features, layer expects {}",
            x.shape()[1],
            self.ni
        );
        y.assign(&x.dot(&self.weights(params)));
    }

    fn derivatives(
        &self,
        params: ArrayView1<'_, f32>,
        x: ArrayView2<'_, f32>,
        _tmp: ArrayView2<'_, f32>,
        dz: ArrayView2<'_, f32>,
        mut dp: ArrayViewMut1<'_, f32>,
    ) -> Array2<f32> {
        let ni = self.ni;
        let no = self.no;
        let n = x.shape()[0];
        assert_eq!(x.shape()[1], ni);
        assert_eq!(dz.shape(), [n, no]);

        let dw = x.t().dot(&dz);
        dp.assign(
            &dw.into_shape(ni * no)
                .expect("x.t() * dz should be (ni, no)"),
        );

        let dx = dz.dot(&self.weights(params).t());
        assert_eq!(dx.shape(), x.shape());
        dx
    }

    fn kernel<'p>(&self, params: ArrayView1<'p, f32>) -> Option<ArrayView2<'p, f32>> {
        Some(self.weights(params))
    }

    fn describe(&self, input_shape: Ix2, rows: &mut Vec<LayerSummary>) {
        let shape = self.output_shape(input_shape);
        rows.push(LayerSummary::new("Dense", shape.slice(), self.num_params()));
    }
}

/// Layer that adds a parameter to each input. The output shape is the same as
/// the input shape. The first dimension is assumed to be the example axis, so
/// if the input shape is `(N, k)` then there are _k_ parameters.
#[derive(Debug)]
pub struct BiasLayer<D> {
    shape: D,
}

impl<D: Dimension> BiasLayer<D> {
    pub fn new(mut shape: D) -> Self {
        shape.as_array_view_mut()[0] = 1;
        BiasLayer { shape }
    }
}

impl<D> Layer<D> for BiasLayer<D>
where
    D: Dimension + RemoveAxis,
{
    type Output = D;

    fn output_shape(&self, input_shape: D) -> D {
        input_shape
    }

    fn num_params(&self) -> usize {
        self.shape
            .size_checked()
            .expect("overflow in size calculation")
    }

    fn apply(
        &self,
        params: ArrayView1<'_, f32>,
        x: ArrayView<'_, f32, D>,
        _tmp: ArrayViewMut2<'_, f32>,
        mut y: ArrayViewMut<'_, f32, D>,
    ) {
        let b = params
            .into_shape(self.shape.clone())
            .expect("params size should match self.num_params()");
        y.assign(&(&x + &b));
    }

    fn derivatives(
        &self,
        _params: ArrayView1<'_, f32>,
        _x: ArrayView<'_, f32, D>,
        _tmp: ArrayView2<'_, f32>,
        dz: ArrayView<'_, f32, D>,
        mut dp: ArrayViewMut1<'_, f32>,
    ) -> Array<f32, D> {
        let dp_shape = dp.raw_dim();
        dp.assign(&dz.sum_axis(Axis(0)).into_shape(dp_shape).expect(
            "number of parameters should be the same as the number of outputs per example",
        ));
        dz.into_owned()
    }

    fn describe(&self, input_shape: D, rows: &mut Vec<LayerSummary>) {
        rows.push(LayerSummary::new(
            "Bias",
            input_shape.slice(),
            self.num_params(),
        ));
    }
}
