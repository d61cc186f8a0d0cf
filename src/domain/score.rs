//! Opportunity Score
//!
//! Weighted composite of four 0-100 signals about a deal opportunity, with a
//! qualitative bucket per signal.

use serde::{Deserialize, Serialize};

use crate::constants::{
    SCORE_EXCELLENT_MIN, SCORE_GOOD_MIN, SCORE_MEDIUM_MIN, WEIGHT_CAPACITY, WEIGHT_SECTOR,
    WEIGHT_STRATEGIC_FIT, WEIGHT_SUM_TOLERANCE, WEIGHT_URGENCY,
};
use crate::error::{Error, Result};

/// Raw scoring inputs as stored on an opportunity; absent values count as 0
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreFactors {
    pub sector_attractiveness: Option<f64>,
    pub investment_capacity: Option<f64>,
    pub urgency: Option<f64>,
    pub strategic_fit: Option<f64>,
}

impl ScoreFactors {
    /// Create factors with every signal present
    pub fn new(sector: f64, capacity: f64, urgency: f64, fit: f64) -> Self {
        Self {
            sector_attractiveness: Some(sector),
            investment_capacity: Some(capacity),
            urgency: Some(urgency),
            strategic_fit: Some(fit),
        }
    }

    /// Clamp every signal to `[0, 100]` and round it
    pub fn clamped(&self) -> ClampedFactors {
        ClampedFactors {
            sector_attractiveness: clamp_factor(self.sector_attractiveness),
            investment_capacity: clamp_factor(self.investment_capacity),
            urgency: clamp_factor(self.urgency),
            strategic_fit: clamp_factor(self.strategic_fit),
        }
    }
}

/// Scoring inputs after clamping, echoed back in the result
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClampedFactors {
    pub sector_attractiveness: u8,
    pub investment_capacity: u8,
    pub urgency: u8,
    pub strategic_fit: u8,
}

/// Clamp one signal to `[0, 100]` and round to the nearest integer
///
/// Missing and NaN values become 0.
fn clamp_factor(value: Option<f64>) -> u8 {
    match value {
        Some(v) if !v.is_nan() => v.clamp(0.0, 100.0).round() as u8,
        _ => 0,
    }
}

/// Qualitative bucket for a 0-100 value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreBucket {
    Excelente,
    Bueno,
    Medio,
    Bajo,
}

impl ScoreBucket {
    /// Bucket for a value; bounds 76/51/26 belong to the higher bucket
    pub fn from_value(value: u8) -> Self {
        if value >= SCORE_EXCELLENT_MIN {
            ScoreBucket::Excelente
        } else if value >= SCORE_GOOD_MIN {
            ScoreBucket::Bueno
        } else if value >= SCORE_MEDIUM_MIN {
            ScoreBucket::Medio
        } else {
            ScoreBucket::Bajo
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScoreBucket::Excelente => "Excelente",
            ScoreBucket::Bueno => "Bueno",
            ScoreBucket::Medio => "Medio",
            ScoreBucket::Bajo => "Bajo",
        }
    }
}

/// Weight per signal; must be non-negative and sum to 1.0
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub sector: f64,
    pub capacity: f64,
    pub urgency: f64,
    pub strategic_fit: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            sector: WEIGHT_SECTOR,
            capacity: WEIGHT_CAPACITY,
            urgency: WEIGHT_URGENCY,
            strategic_fit: WEIGHT_STRATEGIC_FIT,
        }
    }
}

impl ScoreWeights {
    /// Reject negative weights and sums other than 1.0
    pub fn validate(&self) -> Result<()> {
        let weights = [self.sector, self.capacity, self.urgency, self.strategic_fit];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::Invalid {
                message: format!("score weights must be finite and non-negative: {weights:?}"),
            });
        }

        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(Error::Invalid {
                message: format!("score weights must sum to 1.0, got {sum}"),
            });
        }

        Ok(())
    }
}

/// Composite score with the clamped inputs and one label per signal
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: u8,
    pub factors: ClampedFactors,
    pub labels: Vec<String>,
}

/// Pure calculator over a fixed set of weights
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScoreCalculator {
    weights: ScoreWeights,
}

impl ScoreCalculator {
    /// Create a calculator, validating the weights
    pub fn new(weights: ScoreWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Score an opportunity
    ///
    /// `None` means there is no opportunity at all: the result is zero with
    /// no labels, which is different from an opportunity scored at zero
    /// (four "Bajo" labels).
    pub fn score(&self, factors: Option<&ScoreFactors>) -> ScoreResult {
        let Some(factors) = factors else {
            return ScoreResult::default();
        };

        let clamped = factors.clamped();
        let w = &self.weights;
        let weighted = f64::from(clamped.sector_attractiveness) * w.sector
            + f64::from(clamped.investment_capacity) * w.capacity
            + f64::from(clamped.urgency) * w.urgency
            + f64::from(clamped.strategic_fit) * w.strategic_fit;

        let labels = [
            ("Sector", clamped.sector_attractiveness),
            ("Capacidad", clamped.investment_capacity),
            ("Urgencia", clamped.urgency),
            ("Fit", clamped.strategic_fit),
        ]
        .into_iter()
        .map(|(name, value)| format!("{name}: {}", ScoreBucket::from_value(value).label()))
        .collect();

        ScoreResult {
            score: weighted.round().clamp(0.0, 100.0) as u8,
            factors: clamped,
            labels,
        }
    }
}

/// Score with the default weights
pub fn score_opportunity(factors: Option<&ScoreFactors>) -> ScoreResult {
    ScoreCalculator::default().score(factors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reference_opportunity() {
        let result = score_opportunity(Some(&ScoreFactors::new(80.0, 60.0, 40.0, 90.0)));
        assert_eq!(result.score, 70);
        assert_eq!(
            result.labels,
            vec![
                "Sector: Excelente",
                "Capacidad: Bueno",
                "Urgencia: Medio",
                "Fit: Excelente"
            ]
        );
    }

    #[test]
    fn test_absent_entity_has_no_labels() {
        let result = score_opportunity(None);
        assert_eq!(result.score, 0);
        assert_eq!(result.factors, ClampedFactors::default());
        assert!(result.labels.is_empty());

        let zero = score_opportunity(Some(&ScoreFactors::default()));
        assert_eq!(zero.score, 0);
        assert_eq!(zero.labels.len(), 4);
        assert!(zero.labels.iter().all(|l| l.ends_with("Bajo")));
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(ScoreBucket::from_value(76), ScoreBucket::Excelente);
        assert_eq!(ScoreBucket::from_value(75), ScoreBucket::Bueno);
        assert_eq!(ScoreBucket::from_value(51), ScoreBucket::Bueno);
        assert_eq!(ScoreBucket::from_value(50), ScoreBucket::Medio);
        assert_eq!(ScoreBucket::from_value(26), ScoreBucket::Medio);
        assert_eq!(ScoreBucket::from_value(25), ScoreBucket::Bajo);
        assert_eq!(ScoreBucket::from_value(0), ScoreBucket::Bajo);
    }

    #[test]
    fn test_inputs_are_rounded_before_weighting() {
        // 75.5 rounds to 76, which is "Excelente"
        let result = score_opportunity(Some(&ScoreFactors::new(75.5, 0.0, 0.0, 0.0)));
        assert_eq!(result.factors.sector_attractiveness, 76);
        assert_eq!(result.labels[0], "Sector: Excelente");
        assert_eq!(result.score, 19);
    }

    #[test]
    fn test_nan_counts_as_absent() {
        let factors = ScoreFactors {
            urgency: Some(f64::NAN),
            ..ScoreFactors::new(100.0, 100.0, 100.0, 100.0)
        };
        let result = score_opportunity(Some(&factors));
        assert_eq!(result.factors.urgency, 0);
        assert_eq!(result.score, 80);
    }

    #[test]
    fn test_weight_validation() {
        assert!(ScoreWeights::default().validate().is_ok());

        let skewed = ScoreWeights {
            sector: 0.5,
            ..ScoreWeights::default()
        };
        assert!(matches!(skewed.validate(), Err(Error::Invalid { .. })));

        let negative = ScoreWeights {
            sector: -0.25,
            capacity: 0.75,
            ..ScoreWeights::default()
        };
        assert!(ScoreCalculator::new(negative).is_err());

        let custom = ScoreWeights {
            sector: 0.4,
            capacity: 0.1,
            urgency: 0.2,
            strategic_fit: 0.3,
        };
        let calc = ScoreCalculator::new(custom).expect("valid weights");
        assert_eq!(calc.score(Some(&ScoreFactors::new(100.0, 0.0, 0.0, 0.0))).score, 40);
    }

    proptest! {
        #[test]
        fn prop_score_in_range_and_deterministic(
            a in 0.0f64..=100.0,
            b in 0.0f64..=100.0,
            c in 0.0f64..=100.0,
            d in 0.0f64..=100.0,
        ) {
            let factors = ScoreFactors::new(a, b, c, d);
            let first = score_opportunity(Some(&factors));
            let second = score_opportunity(Some(&factors));
            prop_assert!(first.score <= 100);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_out_of_range_inputs_clamp(
            over in 100.0f64..1.0e6,
            under in -1.0e6f64..=0.0,
            fit in 0.0f64..=100.0,
        ) {
            let high = score_opportunity(Some(&ScoreFactors::new(over, 150.0, over, fit)));
            let capped = score_opportunity(Some(&ScoreFactors::new(100.0, 100.0, 100.0, fit)));
            prop_assert_eq!(high, capped);

            let low = score_opportunity(Some(&ScoreFactors::new(under, -10.0, under, fit)));
            let floored = score_opportunity(Some(&ScoreFactors::new(0.0, 0.0, 0.0, fit)));
            prop_assert_eq!(low, floored);
        }
    }
}
