//! End-to-end training of the ready-made networks.

use ndarray::prelude::*;

use regeval::dataset::Dataset;
use regeval::layers::Activation;
use regeval::loss::LossKind;
use regeval::optim::OptimizerKind;
use regeval::scaler::MinMaxScaler;
use regeval::*;

/// `y = 2x + 1` on an even grid over `[0, 1]`.
fn line(n: usize) -> (Array2<f32>, Array2<f32>) {
    let x = Array::from_shape_fn((n, 1), |(i, _)| i as f32 / (n - 1) as f32);
    let y = x.mapv(|v| 2.0 * v + 1.0);
    (x, y)
}

fn quiet(epochs: usize) -> FitOptions {
    FitOptions {
        epochs,
        batch_size: 16,
        verbose: false,
        ..FitOptions::default()
    }
}

#[test]
fn linear_model_learns_a_line() {
    let config = ModelConfig {
        optimizer: OptimizerKind::Sgd { learning_rate: 0.1 },
        ..ModelConfig::default()
    };
    let mut model = linear_model(1, &config).unwrap();
    let (x, y) = line(200);
    let history = model.fit(x.view(), y.view(), None, &quiet(300)).unwrap();

    assert_eq!(history.epochs(), 300);
    assert!(history.val_loss.is_none());
    let last = history.last_loss().unwrap();
    assert!(last < 1e-3, "final loss {last}");
    assert!(last < history.loss[0]);

    let w = model.weights().unwrap();
    assert!((w[[0, 0]] - 2.0).abs() < 0.05, "weight {w}");
    let yh = model.predict(array![[0.5f32]].view()).unwrap();
    assert!((yh[[0, 0]] - 2.0).abs() < 0.05, "prediction {yh}");
}

#[test]
fn deep_model_records_validation_loss() {
    let config = ModelConfig {
        hidden_layers: vec![8, 4],
        activations: vec![Activation::Tanh, Activation::Relu],
        optimizer: OptimizerKind::Adam {
            learning_rate: 0.01,
        },
        chunk_size: Some(8),
        ..ModelConfig::default()
    };
    let mut model = deep_model(1, &config).unwrap();
    let (x, y) = line(64);
    let (vx, vy) = line(9);
    let history = model
        .fit(x.view(), y.view(), Some((vx.view(), vy.view())), &quiet(50))
        .unwrap();

    assert_eq!(history.epochs(), 50);
    let val = history.val_loss.as_ref().unwrap();
    assert_eq!(val.len(), 50);
    assert!(val[49] < val[0], "validation loss went from {} to {}", val[0], val[49]);
    assert!(model.summary().contains("Total params: 57"));
}

#[test]
fn mae_training_reduces_loss() {
    let config = ModelConfig {
        loss: LossKind::MeanAbsoluteError,
        optimizer: OptimizerKind::Adam {
            learning_rate: 0.05,
        },
        ..ModelConfig::default()
    };
    let mut model = linear_model(1, &config).unwrap();
    let (x, y) = line(50);
    let history = model.fit(x.view(), y.view(), None, &quiet(100)).unwrap();
    assert!(history.last_loss().unwrap() < history.loss[0]);
    assert!(model.summary().ends_with("Loss: mae"));
}

#[test]
fn fit_rejects_bad_input() {
    let mut model = linear_model(2, &ModelConfig::default()).unwrap();
    let (x, y) = line(10);
    assert!(matches!(
        model.fit(x.view(), y.view(), None, &quiet(1)),
        Err(Error::ShapeMismatch { .. })
    ));

    let x = Array2::zeros((10, 2));
    let options = FitOptions {
        batch_size: 0,
        ..quiet(1)
    };
    assert!(matches!(
        model.fit(x.view(), y.view(), None, &options),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn train_scale_evaluate() {
    // prices around 100..300, so no actual is near zero
    let x = Array::from_shape_fn((120, 2), |(i, j)| ((i * 7 + j * 13) % 40) as f32);
    let y = Array::from_shape_fn((120, 1), |(i, _)| {
        100.0 + 3.0 * x[[i, 0]] + 2.0 * x[[i, 1]]
    });
    let data = Dataset::new(x, y).unwrap();
    let (train, test) = data.split(0.25, 3).unwrap();

    let mut x_scaler = MinMaxScaler::new();
    let mut y_scaler = MinMaxScaler::new();
    x_scaler.fit(train.inputs()).unwrap();
    y_scaler.fit(train.targets()).unwrap();
    let scale = |d: &Dataset| {
        d.map(|x| x_scaler.transform(x), |y| y_scaler.transform(y))
            .unwrap()
    };
    let (train_s, test_s) = (scale(&train), scale(&test));

    let config = ModelConfig {
        optimizer: OptimizerKind::Adam {
            learning_rate: 0.01,
        },
        ..ModelConfig::default()
    };
    let mut model = linear_model(2, &config).unwrap();
    model
        .fit(train_s.inputs(), train_s.targets(), None, &quiet(300))
        .unwrap();

    let eval = evaluate(&model, &train_s, &test_s, &y_scaler, "linear").unwrap();
    assert_eq!(eval.results.len(), test.len());
    assert!(!eval.filtered.is_empty());
    assert!(eval.filtered.len() <= eval.results.len());
    let d = eval.results.describe_errors().unwrap();
    assert!(d.mean < 10.0, "mean percent error {}", d.mean);
}
