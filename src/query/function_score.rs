//! Score-modifying wrapper queries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::{Query, default_boost};

/// A query that wraps a filter and gives every match the same score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstantScoreQuery {
    /// The wrapped filter.
    pub query: Box<Query>,
    /// Score assigned to each match.
    #[serde(default = "default_boost")]
    pub boost: f32,
}

impl ConstantScoreQuery {
    /// Create a new constant score query.
    pub fn new(query: Query) -> Self {
        ConstantScoreQuery {
            query: Box::new(query),
            boost: 1.0,
        }
    }

    /// Set the constant score.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}

/// Function applied to a field value before it is combined with the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValueFactorModifier {
    #[default]
    None,
    Log,
    Log1p,
    Log2p,
    Ln,
    Ln1p,
    Ln2p,
    Square,
    Sqrt,
    Reciprocal,
}

impl FieldValueFactorModifier {
    /// Native name of the modifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldValueFactorModifier::None => "none",
            FieldValueFactorModifier::Log => "log",
            FieldValueFactorModifier::Log1p => "log1p",
            FieldValueFactorModifier::Log2p => "log2p",
            FieldValueFactorModifier::Ln => "ln",
            FieldValueFactorModifier::Ln1p => "ln1p",
            FieldValueFactorModifier::Ln2p => "ln2p",
            FieldValueFactorModifier::Square => "square",
            FieldValueFactorModifier::Sqrt => "sqrt",
            FieldValueFactorModifier::Reciprocal => "reciprocal",
        }
    }
}

fn default_factor() -> f32 {
    1.0
}

fn default_missing() -> f64 {
    1.0
}

/// Scores documents by a numeric field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValueFactor {
    /// The numeric field.
    pub field: String,
    /// Multiplier applied to the field value.
    #[serde(default = "default_factor")]
    pub factor: f32,
    /// Function applied to the field value.
    #[serde(default)]
    pub modifier: FieldValueFactorModifier,
    /// Value used for documents without the field.
    #[serde(default = "default_missing")]
    pub missing: f64,
}

impl FieldValueFactor {
    /// Create a field value factor with factor 1 and missing 1.
    pub fn new<F: Into<String>>(field: F) -> Self {
        FieldValueFactor {
            field: field.into(),
            factor: 1.0,
            modifier: FieldValueFactorModifier::None,
            missing: 1.0,
        }
    }

    /// Set the factor.
    pub fn with_factor(mut self, factor: f32) -> Self {
        self.factor = factor;
        self
    }

    /// Set the modifier.
    pub fn with_modifier(mut self, modifier: FieldValueFactorModifier) -> Self {
        self.modifier = modifier;
        self
    }

    /// Set the value used for documents without the field.
    pub fn with_missing(mut self, missing: f64) -> Self {
        self.missing = missing;
        self
    }
}

/// A scoring function of a function score query.
///
/// Only [`ScoreFunction::FieldValueFactor`] can be compiled; the other kinds
/// are modelled so that requests using them fail loudly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "snake_case")]
pub enum ScoreFunction {
    /// Score from a numeric field.
    FieldValueFactor(FieldValueFactor),
    /// Score from a script.
    ScriptScore {
        /// Script source.
        source: String,
    },
    /// Constant weight.
    Weight {
        /// The weight.
        weight: f32,
    },
    /// Random score.
    RandomScore {
        /// Seed of the generator.
        #[serde(default)]
        seed: Option<u64>,
    },
    /// Decay function around an origin.
    Decay {
        /// Decay curve (`linear`, `exp` or `gauss`).
        curve: String,
        /// The field.
        field: String,
        /// Origin of the decay.
        origin: Value,
        /// Distance at which the score is halved.
        scale: String,
    },
}

impl ScoreFunction {
    /// Native name of the function.
    pub fn name(&self) -> &str {
        match self {
            ScoreFunction::FieldValueFactor(_) => "field_value_factor",
            ScoreFunction::ScriptScore { .. } => "script_score",
            ScoreFunction::Weight { .. } => "weight",
            ScoreFunction::RandomScore { .. } => "random_score",
            ScoreFunction::Decay { curve, .. } => curve,
        }
    }
}

/// How the function score combines with the query score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostMode {
    #[default]
    Multiply,
    Replace,
    Sum,
    Avg,
    Max,
    Min,
}

impl BoostMode {
    /// Native name of the boost mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            BoostMode::Multiply => "multiply",
            BoostMode::Replace => "replace",
            BoostMode::Sum => "sum",
            BoostMode::Avg => "avg",
            BoostMode::Max => "max",
            BoostMode::Min => "min",
        }
    }
}

/// How the results of several functions combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionScoreMode {
    Multiply,
    Sum,
    Avg,
    First,
    Max,
    Min,
}

impl FunctionScoreMode {
    /// Native name of the score mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionScoreMode::Multiply => "multiply",
            FunctionScoreMode::Sum => "sum",
            FunctionScoreMode::Avg => "avg",
            FunctionScoreMode::First => "first",
            FunctionScoreMode::Max => "max",
            FunctionScoreMode::Min => "min",
        }
    }
}

/// A query whose score is modified by a function.
///
/// Both `query` and `function` are required at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionScoreQuery {
    /// The scored query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Box<Query>>,
    /// The scoring function.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<ScoreFunction>,
    /// Additional functions; not supported by the compiler.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub functions: Vec<ScoreFunction>,
    /// How the function score combines with the query score.
    #[serde(default)]
    pub boost_mode: BoostMode,
    /// How several function results combine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_mode: Option<FunctionScoreMode>,
    /// The boost factor for this query.
    #[serde(default = "default_boost")]
    pub boost: f32,
}

impl FunctionScoreQuery {
    /// Create a function score query from a query and a function.
    pub fn new(query: Query, function: ScoreFunction) -> Self {
        FunctionScoreQuery {
            query: Some(Box::new(query)),
            function: Some(function),
            functions: Vec::new(),
            boost_mode: BoostMode::Multiply,
            score_mode: None,
            boost: 1.0,
        }
    }

    /// Create a function score query scoring by a field value.
    pub fn field_value_factor(query: Query, factor: FieldValueFactor) -> Self {
        Self::new(query, ScoreFunction::FieldValueFactor(factor))
    }

    /// Set the boost mode.
    pub fn with_boost_mode(mut self, boost_mode: BoostMode) -> Self {
        self.boost_mode = boost_mode;
        self
    }

    /// Set the score mode.
    pub fn with_score_mode(mut self, score_mode: FunctionScoreMode) -> Self {
        self.score_mode = Some(score_mode);
        self
    }

    /// Set the boost factor.
    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }
}
