//! Build, train and evaluate feed-forward regression networks on tabular
//! data, then look at where their predictions go wrong.

mod array_util;

mod error;
pub use error::{Error, Result};

mod traits;
pub use traits::{ActivationFn, InverseScale, Layer, Loss, Regressor};

mod model;
pub use model::{FitOptions, History, Initializer, LayerSummary, Model};

pub mod layers;
pub mod loss;
pub mod optim;

mod builders;
pub use builders::{deep_model, linear_model, ModelConfig, NeuralRegressor};

pub mod dataset;
pub mod scaler;
pub mod stats;

pub mod evaluate;
pub use evaluate::{
    compute_outlier_bounds, compute_results, evaluate, filter_outliers, Evaluation,
    EvaluationSummary, OutlierBounds, PredictionRecord, ResultsTable, SummaryTable,
};

pub mod plot;
pub mod report;
