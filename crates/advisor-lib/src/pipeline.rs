//! Fitted preprocessing + model pipelines

use crate::boosting::{GradientBoostedClassifier, GradientBoostedRegressor};
use crate::features::FeatureRow;
use crate::health::Component;
use crate::preprocessing::Preprocessor;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two prediction tasks the advisor trains for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Classification,
    Regression,
}

impl Task {
    pub const ALL: [Task; 2] = [Task::Classification, Task::Regression];

    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Classification => "classification",
            Task::Regression => "regression",
        }
    }

    /// Default artifact file name inside the models directory
    pub fn artifact_file_name(&self) -> &'static str {
        match self {
            Task::Classification => "classifier_pipeline.json",
            Task::Regression => "regression_pipeline.json",
        }
    }

    pub fn experiment_name(&self) -> &'static str {
        match self {
            Task::Classification => "india_property_investment_classification",
            Task::Regression => "india_property_investment_regression",
        }
    }

    pub fn model_type(&self) -> &'static str {
        match self {
            Task::Classification => "GradientBoostedClassifier",
            Task::Regression => "GradientBoostedRegressor",
        }
    }

    /// CLI invocation that produces this task's artifact
    pub fn train_command(&self) -> &'static str {
        match self {
            Task::Classification => "advisor train classifier",
            Task::Regression => "advisor train regressor",
        }
    }

    /// Health component backed by this task's artifact
    pub fn component(&self) -> Component {
        Component::from(*self)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Classification => write!(f, "Classifier"),
            Task::Regression => write!(f, "Regression"),
        }
    }
}

/// A model type that can sit at the end of a pipeline
pub trait Estimator: Serialize + DeserializeOwned + Send + Sync {
    const TASK: Task;
}

impl Estimator for GradientBoostedClassifier {
    const TASK: Task = Task::Classification;
}

impl Estimator for GradientBoostedRegressor {
    const TASK: Task = Task::Regression;
}

/// Preprocessor and estimator fitted together on the same training split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "M: Estimator")]
pub struct Pipeline<M> {
    pub preprocessor: Preprocessor,
    pub model: M,
}

pub type ClassifierPipeline = Pipeline<GradientBoostedClassifier>;
pub type RegressorPipeline = Pipeline<GradientBoostedRegressor>;

impl<M: Estimator> Pipeline<M> {
    pub fn new(preprocessor: Preprocessor, model: M) -> Self {
        Self {
            preprocessor,
            model,
        }
    }

    pub fn task(&self) -> Task {
        M::TASK
    }
}

impl Pipeline<GradientBoostedClassifier> {
    /// Probability that the property is a good investment
    pub fn predict_proba(&self, row: &FeatureRow) -> f64 {
        self.model
            .predict_proba(&self.preprocessor.transform_row(row))
    }

    pub fn predict(&self, row: &FeatureRow) -> u8 {
        self.model.predict(&self.preprocessor.transform_row(row))
    }
}

impl Pipeline<GradientBoostedRegressor> {
    /// Estimated price in lakhs
    pub fn predict(&self, row: &FeatureRow) -> f64 {
        self.model.predict(&self.preprocessor.transform_row(row))
    }
}
