use ndarray::prelude::*;

use crate::array_util::{reshape_splitting, reshape_splitting_mut};
use crate::model::LayerSummary;
use crate::Layer;

/// Two layers run one after the other. Built by `Layer::then` and friends.
#[derive(Debug)]
pub struct Sequence<L1, L2> {
    first: L1,
    second: L2,
    first_num_params: usize,
    num_params: usize,
}

impl<L1, L2> Sequence<L1, L2> {
    pub fn new<D>(first: L1, second: L2) -> Self
    where
        D: Dimension,
        L1: Layer<D>,
        L2: Layer<L1::Output>,
    {
        let first_num_params = first.num_params();
        let num_params = first_num_params + second.num_params();
        Self {
            first,
            second,
            first_num_params,
            num_params,
        }
    }
}

/// Number of values per example in a batch of the given shape.
pub(crate) fn per_example<D: Dimension>(shape: &D) -> usize {
    shape.slice()[1..].iter().product()
}

impl<L1, L2, D> Layer<D> for Sequence<L1, L2>
where
    D: Dimension,
    L1: Layer<D>,
    L2: Layer<L1::Output>,
{
    type Output = L2::Output;

    fn output_shape(&self, input_shape: D) -> Self::Output {
        let hidden_shape = self.first.output_shape(input_shape);
        self.second.output_shape(hidden_shape)
    }

    fn num_params(&self) -> usize {
        self.num_params
    }

    /// Layout of each row: first layer's scratch, first layer's output,
    /// second layer's scratch.
    fn hidden_activations_shape(&self, input_shape: D) -> Ix2 {
        let n = input_shape[0];
        let hidden_shape = self.first.output_shape(input_shape.clone());
        let h1 = self.first.hidden_activations_shape(input_shape)[1];
        let m = per_example(&hidden_shape);
        let h2 = self.second.hidden_activations_shape(hidden_shape)[1];
        Ix2(n, h1 + m + h2)
    }

    fn apply(
        &self,
        params: ArrayView1<'_, f32>,
        x: ArrayView<'_, f32, D>,
        tmp: ArrayViewMut2<'_, f32>,
        y: ArrayViewMut<'_, f32, Self::Output>,
    ) {
        let input_shape = x.raw_dim();
        let hidden_shape = self.first.output_shape(input_shape.clone());
        let h1 = self.first.hidden_activations_shape(input_shape)[1];
        let m = per_example(&hidden_shape);

        let (tmp1, tmp) = tmp.split_at(Axis(1), h1);
        let (mid, tmp2) = tmp.split_at(Axis(1), m);
        let mut mid = reshape_splitting_mut(mid, hidden_shape);

        let (p1, p2) = params.split_at(Axis(0), self.first_num_params);
        self.first.apply(p1, x.view(), tmp1, mid.view_mut());
        self.second.apply(p2, mid.view(), tmp2, y);
    }

    fn derivatives(
        &self,
        params: ArrayView1<'_, f32>,
        x: ArrayView<'_, f32, D>,
        tmp: ArrayView2<'_, f32>,
        dz: ArrayView<'_, f32, Self::Output>,
        dp: ArrayViewMut1<'_, f32>,
    ) -> Array<f32, D> {
        let (p1, p2) = params.split_at(Axis(0), self.first_num_params);
        let (dp1, dp2) = dp.split_at(Axis(0), self.first_num_params);

        // The first layer's output was saved by `apply`; reuse it instead of
        // recomputing it.
        let input_shape = x.raw_dim();
        let hidden_shape = self.first.output_shape(input_shape.clone());
        let m1 = self.first.hidden_activations_shape(input_shape)[1];
        let m2 = m1 + per_example(&hidden_shape);
        let mid = reshape_splitting(tmp.slice(s![.., m1..m2]), hidden_shape);

        let dm = self
            .second
            .derivatives(p2, mid, tmp.slice(s![.., m2..]), dz, dp2);
        self.first
            .derivatives(p1, x, tmp.slice(s![.., ..m1]), dm.view(), dp1)
    }

    fn kernel<'p>(&self, params: ArrayView1<'p, f32>) -> Option<ArrayView2<'p, f32>> {
        let (p1, p2) = params.split_at(Axis(0), self.first_num_params);
        self.first.kernel(p1).or_else(|| self.second.kernel(p2))
    }

    fn describe(&self, input_shape: D, rows: &mut Vec<LayerSummary>) {
        let hidden_shape = self.first.output_shape(input_shape.clone());
        self.first.describe(input_shape, rows);
        self.second.describe(hidden_shape, rows);
    }
}
