//! Train a linear and a deep model on synthetic house prices, evaluate both
//! and write their charts as SVG files.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ndarray::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use regeval::dataset::Dataset;
use regeval::layers::Activation;
use regeval::optim::OptimizerKind;
use regeval::plot::{Render, SvgRenderer};
use regeval::report::{render_evaluation, render_model};
use regeval::scaler::MinMaxScaler;
use regeval::*;

const FEATURES: [&str; 4] = ["rooms", "area", "age", "distance"];

#[derive(Parser)]
#[command(about = "Compare regression models on synthetic house prices", long_about = None)]
struct Options {
    /// Number of houses to generate
    #[arg(long, default_value_t = 2000)]
    samples: usize,

    /// Fraction of the houses held out for testing
    #[arg(long, default_value_t = 0.2)]
    test_fraction: f64,

    #[arg(long, default_value_t = 100)]
    epochs: usize,

    #[arg(long = "batch-size", default_value_t = 32)]
    batch_size: usize,

    #[arg(long = "learning-rate", default_value_t = 0.01)]
    learning_rate: f32,

    /// Units per hidden layer of the deep model, e.g. `32,16`
    #[arg(long, value_delimiter = ',', default_value = "32,16")]
    hidden: Vec<usize>,

    /// Activation per hidden layer (relu, sigmoid, tanh, linear)
    #[arg(long, value_delimiter = ',', default_value = "relu,relu")]
    activations: Vec<Activation>,

    /// Write charts to DIR
    #[arg(long = "out", value_name = "DIR", default_value = "charts")]
    out_dir: PathBuf,

    #[arg(long, default_value_t = 0)]
    seed: u64,
}

/// Prices follow a noisy linear rule, except for a few mispriced houses.
fn houses(n: usize, seed: u64) -> Result<Dataset> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut x = Array2::zeros((n, FEATURES.len()));
    let mut y = Array2::zeros((n, 1));
    for i in 0..n {
        let rooms = rng.gen_range(1..=6) as f32;
        let area = rng.gen_range(30.0..200.0f32);
        let age = rng.gen_range(0.0..80.0f32);
        let distance = rng.gen_range(0.5..25.0f32);
        let mut price = 50.0 + 20.0 * rooms + 0.8 * area - 0.5 * age - 3.0 * distance
            + rng.gen_range(-10.0..10.0f32);
        if rng.gen_bool(0.02) {
            price *= rng.gen_range(2.0..4.0f32);
        }
        x.row_mut(i).assign(&array![rooms, area, age, distance]);
        y[[i, 0]] = price.max(10.0);
    }
    Dataset::new(x, y).context("generated dataset is inconsistent")
}

fn run(
    name: &str,
    mut model: NeuralRegressor,
    data: (&Dataset, &Dataset),
    target_scaler: &MinMaxScaler,
    options: &FitOptions,
    renderer: &mut SvgRenderer,
) -> Result<EvaluationSummary> {
    let (train, test) = data;
    let history = model
        .fit(
            train.inputs(),
            train.targets(),
            Some((test.inputs(), test.targets())),
            options,
        )
        .with_context(|| format!("training {name} failed"))?;

    let feature_names = model.weights().filter(|w| w.ncols() == 1).map(|_| &FEATURES[..]);
    render_model(&model, &history, feature_names, renderer)?;

    let evaluation = evaluate(&model, train, test, target_scaler, name)?;
    render_evaluation(&evaluation, renderer)?;
    Ok(evaluation.summary)
}

fn main() -> Result<()> {
    let options = Options::parse();

    let data = houses(options.samples, options.seed)?;
    let (train, test) = data.split(options.test_fraction, options.seed)?;

    let mut x_scaler = MinMaxScaler::new();
    let mut y_scaler = MinMaxScaler::new();
    x_scaler.fit(train.inputs())?;
    y_scaler.fit(train.targets())?;
    let scale = |d: &Dataset| d.map(|x| x_scaler.transform(x), |y| y_scaler.transform(y));
    let (train, test) = (scale(&train)?, scale(&test)?);

    let config = ModelConfig {
        hidden_layers: options.hidden.clone(),
        activations: options.activations.clone(),
        optimizer: OptimizerKind::Adam {
            learning_rate: options.learning_rate,
        },
        ..ModelConfig::default()
    };
    config.validate().context("bad model options")?;
    let fit = FitOptions {
        epochs: options.epochs,
        batch_size: options.batch_size,
        shuffle_seed: Some(options.seed),
        verbose: true,
    };

    let mut renderer = SvgRenderer::new(&options.out_dir)
        .with_context(|| format!("can't create {}", options.out_dir.display()))?;

    let linear = run(
        "linear",
        linear_model(FEATURES.len(), &config)?,
        (&train, &test),
        &y_scaler,
        &fit,
        &mut renderer,
    )?;
    let mut summaries = SummaryTable::appended(None, linear);

    let deep = run(
        "deep",
        deep_model(FEATURES.len(), &config)?,
        (&train, &test),
        &y_scaler,
        &fit,
        &mut renderer,
    )?;
    summaries.push(deep);

    renderer.note(&summaries.to_string())?;
    println!(
        "wrote {} charts to {}",
        renderer.files().len(),
        options.out_dir.display()
    );
    Ok(())
}
