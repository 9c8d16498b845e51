//! Scoring policies

use crate::errors::GraphError;
use pubmetric_common::config::ScoringConfig;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

/// Transform applied to a raw edge weight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    #[default]
    Identity,
    /// `ln(w + 1)`
    Log,
    Sqrt,
}

impl Transform {
    pub fn apply(self, weight: f64) -> f64 {
        match self {
            Transform::Identity => weight,
            Transform::Log => (weight + 1.0).ln(),
            Transform::Sqrt => weight.sqrt(),
        }
    }
}

impl FromStr for Transform {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "identity" | "none" => Ok(Transform::Identity),
            "log" => Ok(Transform::Log),
            "sqrt" => Ok(Transform::Sqrt),
            other => Err(GraphError::InvalidOptions(format!("unknown transform {:?}", other))),
        }
    }
}

/// Endpoint attribute an edge value is divided by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentKind {
    Age,
    Degree,
    Citations,
}

/// How the two endpoint values are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reduce {
    #[default]
    Mean,
    Min,
}

impl Reduce {
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Reduce::Mean => (a + b) / 2.0,
            Reduce::Min => a.min(b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    pub kind: AdjustmentKind,
    #[serde(default)]
    pub reduce: Reduce,
}

/// Parses `age`, `degree:min`, `citations:mean`
impl FromStr for Adjustment {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, reduce) = s.split_once(':').unwrap_or((s, "mean"));
        let kind = match kind.to_ascii_lowercase().as_str() {
            "age" => AdjustmentKind::Age,
            "degree" => AdjustmentKind::Degree,
            "citations" => AdjustmentKind::Citations,
            other => return Err(GraphError::InvalidOptions(format!("unknown adjustment {:?}", other))),
        };
        let reduce = match reduce.to_ascii_lowercase().as_str() {
            "mean" => Reduce::Mean,
            "min" => Reduce::Min,
            other => return Err(GraphError::InvalidOptions(format!("unknown reduction {:?}", other))),
        };
        Ok(Self { kind, reduce })
    }
}

/// How per-edge values become one score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Aggregation {
    /// Sum, divided by the number of values when `normalize` is set
    Sum { normalize: bool },
    /// Product of the nonzero values divided by the number of values
    Product,
}

impl Default for Aggregation {
    fn default() -> Self {
        Aggregation::Sum { normalize: true }
    }
}

/// Parses `sum`, `mean` (normalized sum) and `product`
impl FromStr for Aggregation {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(Aggregation::Sum { normalize: false }),
            "mean" | "average" => Ok(Aggregation::Sum { normalize: true }),
            "product" => Ok(Aggregation::Product),
            other => Err(GraphError::InvalidOptions(format!("unknown aggregation {:?}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ScoreOptions {
    pub transform: Transform,

    /// Applied in order, each dividing the edge value
    pub adjustments: Vec<Adjustment>,

    pub aggregation: Aggregation,

    /// Per-hop decay for the complete average
    #[validate(range(min = 0.0, max = 1.0))]
    pub decay: Option<f64>,

    #[validate(range(min = 0.0))]
    pub connectivity_factor: f64,

    #[validate(range(min = 0.0))]
    pub missing_age: f64,

    #[validate(range(min = 0.0))]
    pub missing_citations: f64,
}

impl ScoreOptions {
    pub fn check(&self) -> Result<(), GraphError> {
        self.validate().map_err(|e| GraphError::InvalidOptions(e.to_string()))?;
        let numbers = [self.connectivity_factor, self.missing_age, self.missing_citations];
        if numbers.iter().chain(self.decay.iter()).any(|v| !v.is_finite()) {
            return Err(GraphError::InvalidOptions("options must be finite numbers".to_string()));
        }
        Ok(())
    }
}

impl Default for ScoreOptions {
    fn default() -> Self {
        Self::from(&ScoringConfig::default())
    }
}

impl From<&ScoringConfig> for ScoreOptions {
    fn from(config: &ScoringConfig) -> Self {
        Self {
            transform: Transform::default(),
            adjustments: Vec::new(),
            aggregation: Aggregation::default(),
            decay: config.decay,
            connectivity_factor: config.connectivity_factor,
            missing_age: config.missing_age,
            missing_citations: config.missing_citations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transforms() {
        assert_eq!(Transform::Identity.apply(3.0), 3.0);
        assert!((Transform::Log.apply(1.0) - 2f64.ln()).abs() < 1e-12);
        assert_eq!(Transform::Sqrt.apply(9.0), 3.0);
    }

    #[test]
    fn test_parse_adjustment() {
        assert_eq!(
            "degree:min".parse::<Adjustment>().unwrap(),
            Adjustment {
                kind: AdjustmentKind::Degree,
                reduce: Reduce::Min
            }
        );
        assert_eq!("age".parse::<Adjustment>().unwrap().reduce, Reduce::Mean);
        assert!("height".parse::<Adjustment>().is_err());
        assert!("age:max".parse::<Adjustment>().is_err());
    }

    #[test]
    fn test_parse_aggregation() {
        assert_eq!("sum".parse::<Aggregation>().unwrap(), Aggregation::Sum { normalize: false });
        assert_eq!("product".parse::<Aggregation>().unwrap(), Aggregation::Product);
        assert!("median".parse::<Aggregation>().is_err());
    }

    #[test]
    fn test_defaults_follow_config() {
        let options = ScoreOptions::default();
        assert_eq!(options.missing_age, 10.0);
        assert_eq!(options.missing_citations, 100.0);
        assert_eq!(options.aggregation, Aggregation::Sum { normalize: true });
        assert!(options.check().is_ok());
    }

    #[test]
    fn test_out_of_range_options_are_rejected() {
        let options = ScoreOptions {
            decay: Some(1.5),
            ..ScoreOptions::default()
        };
        assert!(matches!(options.check(), Err(GraphError::InvalidOptions(_))));

        let options = ScoreOptions {
            connectivity_factor: f64::NAN,
            ..ScoreOptions::default()
        };
        assert!(options.check().is_err());
    }

    #[test]
    fn test_partial_options_use_defaults() {
        let options: ScoreOptions = serde_json::from_str(r#"{"decay": 0.25}"#).unwrap();
        assert_eq!(options.decay, Some(0.25));
        assert_eq!(options.missing_citations, 100.0);
    }

    #[test]
    fn test_options_from_json() {
        let options: ScoreOptions = serde_json::from_str(
            r#"{"transform": "log", "adjustments": [{"kind": "age"}],
                "aggregation": {"kind": "product"}, "decay": 0.5,
                "connectivity_factor": 2.0, "missing_age": 10.0, "missing_citations": 100.0}"#,
        )
        .unwrap();
        assert_eq!(options.transform, Transform::Log);
        assert_eq!(options.adjustments[0].kind, AdjustmentKind::Age);
        assert_eq!(options.aggregation, Aggregation::Product);
    }
}
