use ndarray::prelude::*;
use ndarray::RemoveAxis;
use rayon::prelude::*;

use crate::model::LayerSummary;
use crate::Layer;

/// Runs an inner layer (typically the whole network) over chunks of the
/// mini-batch in parallel.
///
/// Examples are independent of each other, so splitting along axis 0 gives
/// the same outputs as running the whole batch at once. Parameter gradients
/// are computed per chunk and summed.
#[derive(Debug)]
pub struct ParallelLayer<L> {
    inner: L,
    /// Number of examples in each rayon task.
    chunk_size: usize,
}

impl<L> ParallelLayer<L> {
    pub fn new(inner: L, chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk size must be positive");
        ParallelLayer { inner, chunk_size }
    }
}

impl<D, L> Layer<D> for ParallelLayer<L>
where
    D: Dimension + RemoveAxis,
    L: Layer<D> + Sync,
{
    type Output = L::Output;

    fn output_shape(&self, input_shape: D) -> Self::Output {
        self.inner.output_shape(input_shape)
    }

    fn num_params(&self) -> usize {
        self.inner.num_params()
    }

    fn hidden_activations_shape(&self, input_shape: D) -> Ix2 {
        self.inner.hidden_activations_shape(input_shape)
    }

    fn apply(
        &self,
        params: ArrayView1<'_, f32>,
        x: ArrayView<'_, f32, D>,
        mut tmp: ArrayViewMut2<'_, f32>,
        mut y: ArrayViewMut<'_, f32, Self::Output>,
    ) {
        let xs = x.axis_chunks_iter(Axis(0), self.chunk_size).into_par_iter();
        let tmps = tmp
            .axis_chunks_iter_mut(Axis(0), self.chunk_size)
            .into_par_iter();
        let ys = y
            .axis_chunks_iter_mut(Axis(0), self.chunk_size)
            .into_par_iter();

        xs.zip(tmps).zip(ys).for_each(|((x, tmp), y)| {
            self.inner.apply(params, x, tmp, y);
        });
    }

    fn derivatives(
        &self,
        params: ArrayView1<'_, f32>,
        x: ArrayView<'_, f32, D>,
        tmp: ArrayView2<'_, f32>,
        dz: ArrayView<'_, f32, Self::Output>,
        mut dp: ArrayViewMut1<'_, f32>,
    ) -> Array<f32, D> {
        let num_examples = x.len_of(Axis(0));
        let num_chunks = (num_examples + self.chunk_size - 1) / self.chunk_size;

        let mut dp_chunks = Array2::zeros((num_chunks, dp.len()));
        let mut dx = Array::zeros(x.raw_dim());

        let xs = x.axis_chunks_iter(Axis(0), self.chunk_size).into_par_iter();
        let tmps = tmp.axis_chunks_iter(Axis(0), self.chunk_size).into_par_iter();
        let dzs = dz.axis_chunks_iter(Axis(0), self.chunk_size).into_par_iter();
        let dps = dp_chunks.axis_iter_mut(Axis(0)).into_par_iter();
        let dxs = dx
            .axis_chunks_iter_mut(Axis(0), self.chunk_size)
            .into_par_iter();

        xs.zip(tmps)
            .zip(dzs)
            .zip(dps)
            .zip(dxs)
            .for_each(|((((x, tmp), dz), dp), mut dx)| {
                dx.assign(&self.inner.derivatives(params, x, tmp, dz, dp));
            });

        dp.assign(&dp_chunks.sum_axis(Axis(0)));
        dx
    }

    fn kernel<'p>(&self, params: ArrayView1<'p, f32>) -> Option<ArrayView2<'p, f32>> {
        self.inner.kernel(params)
    }

    fn describe(&self, input_shape: D, rows: &mut Vec<LayerSummary>) {
        self.inner.describe(input_shape, rows);
    }
}
