//! Ready-made regression networks: a linear model and a multi-layer
//! perceptron, both ending in a single linear output unit.

use ndarray::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::layers::{Activation, ActivationLayer, BiasLayer, LinearLayer, ParallelLayer, Stack};
use crate::loss::LossKind;
use crate::model::{Initializer, Model};
use crate::optim::OptimizerKind;

/// The network type produced by `linear_model` and `deep_model`.
pub type NeuralRegressor = Model<ParallelLayer<Stack>, LossKind>;

/// Number of examples per rayon task when the config doesn't say.
const DEFAULT_CHUNK_SIZE: usize = 256;

/// Everything needed to build and compile a regression network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Width of each hidden layer, e.g. `[32, 16, 8]`. Ignored by
    /// `linear_model`.
    pub hidden_layers: Vec<usize>,
    /// Activation of each hidden layer; same length as `hidden_layers`.
    pub activations: Vec<Activation>,
    pub initializer: Initializer,
    pub optimizer: OptimizerKind,
    pub loss: LossKind,
    /// Examples per rayon task in forward and backward passes.
    pub chunk_size: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            hidden_layers: vec![32],
            activations: vec![Activation::Relu],
            initializer: Initializer::default(),
            optimizer: OptimizerKind::default(),
            loss: LossKind::MeanSquaredError,
            chunk_size: None,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hidden_layers.len() != self.activations.len() {
            return Err(Error::InvalidConfig(format!(
                "{} hidden layers but {} activations",
                self.hidden_layers.len(),
                self.activations.len()
            )));
        }
        if self.hidden_layers.iter().any(|&units| units == 0) {
            return Err(Error::InvalidConfig("hidden layer with 0 units".into()));
        }
        if self.chunk_size == Some(0) {
            return Err(Error::InvalidConfig("chunk size must be positive".into()));
        }
        self.initializer.validate()?;
        self.optimizer.validate()
    }

    fn compile(&self, net: Stack, num_inputs: usize) -> Result<NeuralRegressor> {
        let chunk_size = self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        let model = Model::new(
            ParallelLayer::new(net, chunk_size),
            num_inputs,
            self.loss,
            self.initializer,
        )?;
        Ok(model.with_optimizer(self.optimizer.build()))
    }
}

fn dense(stack: &mut Stack, num_inputs: usize, num_outputs: usize) {
    stack.push(LinearLayer::new(num_inputs, num_outputs));
    stack.push(BiasLayer::new(Ix2(1, num_outputs)));
}

/// A single dense unit over all input features: `y = x·w + b`.
///
/// Only the initializer, optimizer, loss and chunk size of `config` are used.
pub fn linear_model(num_inputs: usize, config: &ModelConfig) -> Result<NeuralRegressor> {
    if num_inputs == 0 {
        return Err(Error::InvalidConfig("model needs at least one input".into()));
    }
    config.initializer.validate()?;
    config.optimizer.validate()?;
    if config.chunk_size == Some(0) {
        return Err(Error::InvalidConfig("chunk size must be positive".into()));
    }

    let mut net = Stack::new();
    dense(&mut net, num_inputs, 1);
    config.compile(net, num_inputs)
}

/// A feed-forward network: one dense layer per entry of
/// `config.hidden_layers`, each followed by its activation, then a single
/// linear output unit.
pub fn deep_model(num_inputs: usize, config: &ModelConfig) -> Result<NeuralRegressor> {
    if num_inputs == 0 {
        return Err(Error::InvalidConfig("model needs at least one input".into()));
    }
    config.validate()?;
    if config.hidden_layers.is_empty() {
        return Err(Error::InvalidConfig(
            "deep model needs at least one hidden layer".into(),
        ));
    }

    let mut net = Stack::new();
    let mut width = num_inputs;
    for (&units, &activation) in config.hidden_layers.iter().zip(&config.activations) {
        dense(&mut net, width, units);
        net.push(ActivationLayer::new(activation));
        width = units;
    }
    dense(&mut net, width, 1);
    config.compile(net, num_inputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{Layer, Regressor};

    #[test]
    fn deep_model_layout() {
        let config = ModelConfig {
            hidden_layers: vec![8, 4],
            activations: vec![Activation::Relu, Activation::Tanh],
            ..ModelConfig::default()
        };
        let model = deep_model(3, &config).unwrap();
        // (3*8 + 8) + (8*4 + 4) + (4*1 + 1)
        assert_eq!(model.net().num_params(), 32 + 36 + 5);
        let yh = model.predict(Array2::zeros((5, 3)).view()).unwrap();
        assert_eq!(yh.shape(), &[5, 1]);

        let summary = model.summary();
        assert!(summary.contains("Dense"), "{summary}");
        assert!(summary.contains("Activation(Tanh)"), "{summary}");
        assert!(summary.contains("Total params: 73"), "{summary}");
    }

    #[test]
    fn linear_model_exposes_its_kernel() {
        let model = linear_model(4, &ModelConfig::default()).unwrap();
        let w = model.weights().unwrap();
        assert_eq!(w.shape(), &[4, 1]);
        assert_eq!(w.column(0), model.params().slice(s![..4]));
    }

    #[test]
    fn mismatched_activations_are_rejected() {
        let config = ModelConfig {
            hidden_layers: vec![8, 4],
            activations: vec![Activation::Relu],
            ..ModelConfig::default()
        };
        assert!(matches!(
            deep_model(3, &config),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn same_seed_same_model() {
        let config = ModelConfig::default();
        let a = deep_model(2, &config).unwrap();
        let b = deep_model(2, &config).unwrap();
        assert_eq!(a.params(), b.params());
    }

    #[test]
    fn wrong_feature_count_is_an_error() {
        let model = linear_model(4, &ModelConfig::default()).unwrap();
        assert!(matches!(
            model.predict(Array2::zeros((2, 3)).view()),
            Err(Error::ShapeMismatch { .. })
        ));
    }
}
