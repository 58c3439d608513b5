use std::fmt;
use std::ops::Range;

use ndarray::prelude::*;

use crate::model::LayerSummary;
use crate::Layer;

/// A boxed layer on `(N, k)` batches, as stored in a `Stack`.
pub type DynLayer = Box<dyn Layer<Ix2, Output = Ix2> + Send + Sync>;

/// A chain of layers whose length is only known at run time.
///
/// `Sequence` builds the chain into the type, which is nicer when the
/// architecture is written out in code. `Stack` is what the model builders
/// use when the layers come from a `ModelConfig`.
pub struct Stack {
    layers: Vec<DynLayer>,
}

/// Where one layer's parameters and saved activations live.
struct Slot {
    params: Range<usize>,
    hidden: Range<usize>,
    /// Columns of `tmp` holding this layer's output; `None` for the last layer,
    /// which writes straight to `y`.
    output: Option<Range<usize>>,
}

impl Stack {
    pub fn new() -> Self {
        Stack { layers: vec![] }
    }

    pub fn push<L>(&mut self, layer: L)
    where
        L: Layer<Ix2, Output = Ix2> + Send + Sync + 'static,
    {
        self.layers.push(Box::new(layer));
    }

    pub fn with<L>(mut self, layer: L) -> Self
    where
        L: Layer<Ix2, Output = Ix2> + Send + Sync + 'static,
    {
        self.push(layer);
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    fn layout(&self, input_shape: Ix2) -> (Vec<Slot>, usize) {
        let mut slots = Vec::with_capacity(self.layers.len());
        let mut param_offset = 0;
        let mut col = 0;
        let mut shape = input_shape;
        for (i, layer) in self.layers.iter().enumerate() {
            let np = layer.num_params();
            let h = layer.hidden_activations_shape(shape)[1];
            let out_shape = layer.output_shape(shape);
            let hidden = col..col + h;
            col += h;
            let output = if i + 1 < self.layers.len() {
                let o = col..col + out_shape[1];
                col += out_shape[1];
                Some(o)
            } else {
                None
            };
            slots.push(Slot {
                params: param_offset..param_offset + np,
                hidden,
                output,
            });
            param_offset += np;
            shape = out_shape;
        }
        (slots, col)
    }
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.layers.iter()).finish()
    }
}

impl Layer<Ix2> for Stack {
    type Output = Ix2;

    fn output_shape(&self, input_shape: Ix2) -> Ix2 {
        self.layers
            .iter()
            .fold(input_shape, |shape, layer| layer.output_shape(shape))
    }

    fn num_params(&self) -> usize {
        self.layers.iter().map(|layer| layer.num_params()).sum()
    }

    fn hidden_activations_shape(&self, input_shape: Ix2) -> Ix2 {
        let (_, width) = self.layout(input_shape);
        Ix2(input_shape[0], width)
    }

    fn apply(
        &self,
        params: ArrayView1<'_, f32>,
        x: ArrayView2<'_, f32>,
        tmp: ArrayViewMut2<'_, f32>,
        mut y: ArrayViewMut2<'_, f32>,
    ) {
        if self.layers.is_empty() {
            y.assign(&x);
            return;
        }

        let (slots, _) = self.layout(x.raw_dim());
        let mut rest = tmp;
        let mut prev: Option<ArrayViewMut2<'_, f32>> = None;
        for (layer, slot) in self.layers.iter().zip(&slots) {
            let input = match &prev {
                Some(out) => out.view(),
                None => x.view(),
            };
            let p = params.slice(s![slot.params.clone()]);
            let (hidden, r) = rest.split_at(Axis(1), slot.hidden.len());
            rest = r;
            match &slot.output {
                Some(cols) => {
                    let (mut out, r) = rest.split_at(Axis(1), cols.len());
                    rest = r;
                    layer.apply(p, input, hidden, out.view_mut());
                    prev = Some(out);
                }
                None => layer.apply(p, input, hidden, y.view_mut()),
            }
        }
    }

    fn derivatives(
        &self,
        params: ArrayView1<'_, f32>,
        x: ArrayView2<'_, f32>,
        tmp: ArrayView2<'_, f32>,
        dz: ArrayView2<'_, f32>,
        mut dp: ArrayViewMut1<'_, f32>,
    ) -> Array2<f32> {
        let (slots, _) = self.layout(x.raw_dim());
        let mut dz = dz.to_owned();
        for i in (0..self.layers.len()).rev() {
            let slot = &slots[i];
            let input = match i {
                0 => x.view(),
                _ => {
                    let cols = slots[i - 1]
                        .output
                        .clone()
                        .expect("every layer but the last saves its output");
                    tmp.slice(s![.., cols])
                }
            };
            dz = self.layers[i].derivatives(
                params.slice(s![slot.params.clone()]),
                input,
                tmp.slice(s![.., slot.hidden.clone()]),
                dz.view(),
                dp.slice_mut(s![slot.params.clone()]),
            );
        }
        dz
    }

    fn kernel<'p>(&self, params: ArrayView1<'p, f32>) -> Option<ArrayView2<'p, f32>> {
        let mut offset = 0;
        for layer in &self.layers {
            let np = layer.num_params();
            if let Some(k) = layer.kernel(params.slice_move(s![offset..offset + np])) {
                return Some(k);
            }
            offset += np;
        }
        None
    }

    fn describe(&self, input_shape: Ix2, rows: &mut Vec<LayerSummary>) {
        let mut shape = input_shape;
        for layer in &self.layers {
            layer.describe(shape, rows);
            shape = layer.output_shape(shape);
        }
    }
}
