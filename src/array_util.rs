//! Reshaping views of the hidden-activation buffer.
//!
//! Layers store per-example scratch data as columns of an `(N, k)` buffer.
//! A composite layer hands a block of those columns to an inner layer, which
//! wants to see it in its own output shape, e.g. `(N, a, b)`. The block is
//! generally not contiguous, so `into_shape` can't do it; instead we compute
//! new strides that split each existing axis in place.

use ndarray::prelude::*;

/// Strides for viewing data laid out as `view_shape`/`view_strides` under
/// `new_shape`, where `new_shape` only splits existing axes (C order).
///
/// *Panics* if the shapes are incompatible.
fn split_strides<D1, D2>(view_shape: &D1, view_strides: &[isize], new_shape: &D2) -> D2
where
    D1: Dimension,
    D2: Dimension,
{
    assert_eq!(
        view_shape.size(),
        new_shape.size(),
        "existing view with shape {view_shape:?} is incompatible with new shape {new_shape:?}",
    );

    let mut new_strides = D2::zeros(new_shape.ndim());
    if new_shape.size() == 0 {
        // Nothing will ever be read through these strides.
        return new_strides;
    }

    let mut new_dims = new_shape.slice().iter().copied().enumerate();
    for (&len, &stride) in view_shape.slice().iter().zip(view_strides) {
        let mut remaining = len;
        while remaining != 1 {
            let (i, d) = new_dims
                .next()
                .expect("already checked that the sizes match");
            if d == 1 {
                // A unit axis; its stride is never used.
                continue;
            }
            assert_eq!(
                remaining % d,
                0,
                "existing view with shape {view_shape:?} is incompatible with new shape {new_shape:?}",
            );
            remaining /= d;
            new_strides[i] = (stride * remaining as isize) as usize;
        }
    }
    for (_, d) in new_dims {
        assert_eq!(d, 1, "leftover axis in new shape {new_shape:?}");
    }
    new_strides
}

/// Reshape the given view by splitting its axes.
///
/// The new shape must be the same size and must have the effect of splitting
/// existing axes without reordering them:
///
/// -   `(10, 12)` to `(10, 3, 4)` - ok
/// -   `(10, 12)` to `(10, 12)` - ok, even for a column block of a wider array
/// -   `(10, 12)` to `120` - bad
/// -   `(6, 5)` to `(3, 5, 2)` - bad
///
/// *Panics* if the new shape is bad.
pub fn reshape_splitting<'a, T, D1, D2>(view: ArrayView<'a, T, D1>, shape: D2) -> ArrayView<'a, T, D2>
where
    D1: Dimension,
    D2: Dimension,
{
    let strides = split_strides(&view.raw_dim(), view.strides(), &shape);
    // SAFETY: every index valid in `shape` maps to an element of `view`, since
    // the new axes only subdivide the old ones.
    unsafe { ArrayView::from_shape_ptr(shape.strides(strides), view.as_ptr()) }
}

/// Mutable version of [`reshape_splitting`].
pub fn reshape_splitting_mut<'a, T, D1, D2>(
    mut view: ArrayViewMut<'a, T, D1>,
    shape: D2,
) -> ArrayViewMut<'a, T, D2>
where
    D1: Dimension,
    D2: Dimension,
{
    let strides = split_strides(&view.raw_dim(), view.strides(), &shape);
    let ptr = view.as_mut_ptr();
    // SAFETY: as above; `view` is consumed, so the new view is the only one.
    unsafe { ArrayViewMut::from_shape_ptr(shape.strides(strides), ptr) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_block_keeps_row_stride() {
        let a = Array::from_shape_fn((4, 10), |(i, j)| (i * 10 + j) as i32);
        let block = a.slice(s![.., 3..7]);
        let v = reshape_splitting(block, Ix2(4, 4));
        assert_eq!(v[[0, 0]], 3);
        assert_eq!(v[[1, 0]], 13);
        assert_eq!(v[[3, 3]], 36);
    }

    #[test]
    fn split_feature_axis() {
        let a = Array::from_shape_fn((2, 12), |(i, j)| (i * 100 + j) as i32);
        let v = reshape_splitting(a.view(), Ix3(2, 3, 4));
        assert_eq!(v[[0, 0, 1]], 1);
        assert_eq!(v[[0, 1, 0]], 4);
        assert_eq!(v[[1, 2, 3]], 111);
    }

    #[test]
    fn single_row_and_empty_batches() {
        let a = Array::from_shape_fn((1, 6), |(_, j)| j as i32);
        let v = reshape_splitting(a.view(), Ix2(1, 6));
        assert_eq!(v.row(0).to_vec(), vec![0, 1, 2, 3, 4, 5]);

        let mut e: Array2<f32> = Array::zeros((0, 5));
        let v = reshape_splitting_mut(e.view_mut(), Ix2(0, 5));
        assert_eq!(v.shape(), &[0, 5]);
    }

    #[test]
    fn writes_land_in_the_block() {
        let mut a: Array2<f32> = Array::zeros((3, 6));
        {
            let block = a.slice_mut(s![.., 2..4]);
            let mut v = reshape_splitting_mut(block, Ix2(3, 2));
            v.fill(1.0);
        }
        assert_eq!(a.sum(), 6.0);
        assert_eq!(a.column(2).to_vec(), vec![1.0, 1.0, 1.0]);
        assert_eq!(a.column(4).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    #[should_panic]
    fn merging_axes_is_rejected() {
        let a: Array2<f32> = Array::zeros((10, 10));
        reshape_splitting(a.view(), Ix1(100));
    }

    #[test]
    #[should_panic]
    fn reordering_is_rejected() {
        let a: Array2<f32> = Array::zeros((6, 5));
        reshape_splitting(a.view(), Ix3(3, 5, 2));
    }
}
