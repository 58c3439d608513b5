use std::fmt::Write as _;

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::prelude::*;
use ndarray_rand::rand_distr::{Normal, Uniform};
use ndarray_rand::RandomExt;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::{check_len, Error, Result};
use crate::optim::{Optimizer, OptimizerKind};
use crate::traits::{Layer, Loss, Regressor};

/// How the initial parameters of a model are drawn.
///
/// Every random initializer carries its seed, so building the same model
/// twice gives the same starting point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Initializer {
    RandomNormal { mean: f32, stddev: f32, seed: u64 },
    RandomUniform { low: f32, high: f32, seed: u64 },
    Zeros,
}

impl Default for Initializer {
    fn default() -> Self {
        Initializer::RandomNormal {
            mean: 0.0,
            stddev: 0.1,
            seed: 0,
        }
    }
}

impl Initializer {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Initializer::RandomNormal { stddev, .. } if !(stddev.is_finite() && stddev >= 0.0) => {
                Err(Error::InvalidConfig(format!(
                    "stddev must be non-negative, got {stddev}"
                )))
            }
            Initializer::RandomUniform { low, high, .. } if !(low < high) => Err(
                Error::InvalidConfig(format!("empty uniform range {low}..{high}")),
            ),
            _ => Ok(()),
        }
    }

    pub fn init(&self, n: usize) -> Result<Array1<f32>> {
        self.validate()?;
        Ok(match *self {
            Initializer::RandomNormal { mean, stddev, seed } => {
                let dist = Normal::new(mean, stddev)
                    .map_err(|err| Error::InvalidConfig(err.to_string()))?;
                Array::random_using(n, dist, &mut StdRng::seed_from_u64(seed))
            }
            Initializer::RandomUniform { low, high, seed } => Array::random_using(
                n,
                Uniform::new(low, high),
                &mut StdRng::seed_from_u64(seed),
            ),
            Initializer::Zeros => Array1::zeros(n),
        })
    }
}

/// Training settings for `Model::fit`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    pub epochs: usize,
    pub batch_size: usize,
    /// Seed for shuffling the training rows before each epoch. `None` keeps
    /// the rows in order.
    pub shuffle_seed: Option<u64>,
    /// Draw a progress bar on the terminal.
    pub verbose: bool,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            epochs: 100,
            batch_size: 32,
            shuffle_seed: Some(0),
            verbose: true,
        }
    }
}

/// Per-epoch losses recorded by `Model::fit`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    /// Mean training loss over each epoch's batches.
    pub loss: Vec<f32>,
    /// Loss on the validation set at the end of each epoch, if one was given.
    pub val_loss: Option<Vec<f32>>,
}

impl History {
    pub fn epochs(&self) -> usize {
        self.loss.len()
    }

    pub fn last_loss(&self) -> Option<f32> {
        self.loss.last().copied()
    }

    pub fn last_val_loss(&self) -> Option<f32> {
        self.val_loss.as_ref().and_then(|v| v.last().copied())
    }
}

/// One row of a model summary.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSummary {
    pub name: String,
    /// Output shape for a single example (the batch axis is left out).
    pub output_shape: Vec<usize>,
    pub num_params: usize,
}

impl LayerSummary {
    pub fn new(name: impl Into<String>, batch_shape: &[usize], num_params: usize) -> Self {
        LayerSummary {
            name: name.into(),
            output_shape: batch_shape.iter().skip(1).copied().collect(),
            num_params,
        }
    }
}

/// A network with its parameters, loss function and optimizer.
pub struct Model<N, L> {
    net: N,
    /// Number of input features, i.e. the width of `x` passed to `apply`.
    num_inputs: usize,
    params: Array1<f32>,
    loss: L,
    optimizer: Box<dyn Optimizer>,
}

impl<N, L> Model<N, L>
where
    N: Layer<Ix2, Output = Ix2>,
    L: Loss<Ix2>,
{
    /// Wrap `net` with freshly initialized parameters. Trains with Adam at the
    /// default rate until `with_optimizer` says otherwise.
    pub fn new(net: N, num_inputs: usize, loss: L, init: Initializer) -> Result<Self> {
        let params = init.init(net.num_params())?;
        Ok(Model {
            net,
            num_inputs,
            params,
            loss,
            optimizer: OptimizerKind::default().build(),
        })
    }

    pub fn with_optimizer(mut self, optimizer: Box<dyn Optimizer>) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn net(&self) -> &N {
        &self.net
    }

    pub fn params(&self) -> ArrayView1<'_, f32> {
        self.params.view()
    }

    pub fn num_inputs(&self) -> usize {
        self.num_inputs
    }

    /// Run the model on an array of examples.
    pub fn apply(&self, x: ArrayView2<'_, f32>) -> Array2<f32> {
        let input_shape = x.raw_dim();
        let mut tmp = Array2::<f32>::zeros(self.net.hidden_activations_shape(input_shape));
        let mut out = Array2::<f32>::zeros(self.net.output_shape(input_shape));
        self.net
            .apply(self.params.view(), x, tmp.view_mut(), out.view_mut());
        out
    }

    /// Train the model on a batch of examples. Returns the loss on the batch
    /// before the update.
    pub fn train(&mut self, x_train: ArrayView2<'_, f32>, y_train: ArrayView2<'_, f32>) -> f32 {
        let input_shape = x_train.raw_dim();
        let mut tmp = Array2::<f32>::zeros(self.net.hidden_activations_shape(input_shape));
        let mut yh = Array2::<f32>::zeros(self.net.output_shape(input_shape));
        self.net.apply(
            self.params.view(),
            x_train.view(),
            tmp.view_mut(),
            yh.view_mut(),
        );
        let loss = self.loss.loss(y_train, yh.view());

        let dyh = self.loss.deriv(y_train, yh.view());
        let mut dp = Array1::<f32>::zeros(self.net.num_params());
        let _ = self.net.derivatives(
            self.params.view(),
            x_train,
            tmp.view(),
            dyh.view(),
            dp.view_mut(),
        );
        self.optimizer.step(self.params.view_mut(), dp.view());
        loss
    }

    fn check_inputs(&self, x: ArrayView2<'_, f32>) -> Result<()> {
        check_len("input features", self.num_inputs, x.ncols())
    }

    fn check_targets(&self, x: ArrayView2<'_, f32>, y: ArrayView2<'_, f32>) -> Result<()> {
        self.check_inputs(x)?;
        check_len("target rows", x.nrows(), y.nrows())?;
        let outputs = self.net.output_shape(Ix2(1, self.num_inputs))[1];
        check_len("target columns", outputs, y.ncols())
    }

    /// Train on `(x, y)` for `options.epochs` epochs of mini-batches.
    ///
    /// When `validation` is given, its loss is measured after every epoch.
    pub fn fit(
        &mut self,
        x: ArrayView2<'_, f32>,
        y: ArrayView2<'_, f32>,
        validation: Option<(ArrayView2<'_, f32>, ArrayView2<'_, f32>)>,
        options: &FitOptions,
    ) -> Result<History> {
        self.check_targets(x, y)?;
        if let Some((vx, vy)) = validation {
            self.check_targets(vx, vy)?;
        }
        if options.batch_size == 0 {
            return Err(Error::InvalidConfig("batch size must be positive".into()));
        }
        if x.nrows() == 0 {
            return Err(Error::EmptyInput);
        }

        let progress = if options.verbose {
            let bar = ProgressBar::new(options.epochs as u64);
            if let Ok(style) =
                ProgressStyle::with_template("epoch {pos}/{len} {wide_bar} {msg}")
            {
                bar.set_style(style);
            }
            bar
        } else {
            ProgressBar::hidden()
        };

        let mut rng = options.shuffle_seed.map(StdRng::seed_from_u64);
        let mut order: Vec<usize> = (0..x.nrows()).collect();
        let mut history = History {
            loss: Vec::with_capacity(options.epochs),
            val_loss: validation.map(|_| Vec::with_capacity(options.epochs)),
        };

        for _ in 0..options.epochs {
            if let Some(rng) = rng.as_mut() {
                order.shuffle(rng);
            }

            let mut loss_total = 0.0;
            for batch in order.chunks(options.batch_size) {
                let xb = x.select(Axis(0), batch);
                let yb = y.select(Axis(0), batch);
                loss_total += self.train(xb.view(), yb.view()) * batch.len() as f32;
            }
            let loss = loss_total / x.nrows() as f32;
            history.loss.push(loss);

            let mut msg = format!("loss={loss:.6}");
            if let (Some((vx, vy)), Some(val_loss)) = (validation, history.val_loss.as_mut()) {
                let v = self.loss.loss(vy, self.apply(vx).view());
                val_loss.push(v);
                let _ = write!(msg, " val_loss={v:.6}");
            }
            progress.set_message(msg);
            progress.inc(1);
        }
        progress.finish();

        Ok(history)
    }

    /// Keras-style table of layers, output shapes and parameter counts.
    pub fn summary(&self) -> String {
        let mut rows = vec![];
        self.net.describe(Ix2(1, self.num_inputs), &mut rows);

        let mut out = String::new();
        let _ = writeln!(out, "{:<28} {:<16} {:>10}", "Layer", "Output Shape", "Param #");
        let _ = writeln!(out, "{}", "=".repeat(56));
        for row in &rows {
            let shape = row
                .output_shape
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            let _ = writeln!(
                out,
                "{:<28} {:<16} {:>10}",
                row.name,
                format!("(None, {shape})"),
                row.num_params
            );
        }
        let _ = writeln!(out, "{}", "=".repeat(56));
        let _ = writeln!(out, "Total params: {}", self.net.num_params());
        let _ = write!(out, "Loss: {}", self.loss.name());
        out
    }
}

impl<N, L> Regressor for Model<N, L>
where
    N: Layer<Ix2, Output = Ix2>,
    L: Loss<Ix2>,
{
    fn predict(&self, inputs: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        self.check_inputs(inputs)?;
        Ok(self.apply(inputs))
    }

    fn evaluate(&self, inputs: ArrayView2<'_, f32>, targets: ArrayView2<'_, f32>) -> Result<f32> {
        self.check_targets(inputs, targets)?;
        Ok(self.loss.loss(targets, self.apply(inputs).view()))
    }

    fn summary(&self) -> String {
        Model::summary(self)
    }

    fn weights(&self) -> Option<Array2<f32>> {
        self.net.kernel(self.params.view()).map(|k| k.to_owned())
    }
}
