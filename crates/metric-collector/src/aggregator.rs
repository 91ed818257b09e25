//! Reduction policies applied to the samples extracted from one fetch

use crate::error::{CollectorError, Result};
use crate::quantity::Quantity;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_AGGREGATOR: Aggregator = Aggregator::Sum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregator {
    Sum,
    #[serde(alias = "average")]
    Avg,
    Max,
    Min,
    Count,
}

impl Aggregator {
    pub fn name(&self) -> &'static str {
        match self {
            Aggregator::Sum => "sum",
            Aggregator::Avg => "avg",
            Aggregator::Max => "max",
            Aggregator::Min => "min",
            Aggregator::Count => "count",
        }
    }

    /// Reduce `samples` to one value.
    ///
    /// `sum` and `count` are defined for empty input (both yield zero);
    /// `avg`, `max` and `min` fail with `EmptyInput`. `avg` divides the exact
    /// milli-unit sum by the sample count and rounds toward negative infinity.
    pub fn aggregate(&self, samples: &[Quantity]) -> Result<Quantity> {
        match self {
            Aggregator::Sum => self.sum(samples),
            Aggregator::Count => i64::try_from(samples.len())
                .map(Quantity::from_int)
                .map_err(|_| self.overflow()),
            Aggregator::Avg => {
                if samples.is_empty() {
                    return Err(self.empty());
                }
                self.sum(samples)?
                    .checked_div_floor(samples.len())
                    .ok_or_else(|| self.overflow())
            }
            Aggregator::Max => samples.iter().max().copied().ok_or_else(|| self.empty()),
            Aggregator::Min => samples.iter().min().copied().ok_or_else(|| self.empty()),
        }
    }

    fn sum(&self, samples: &[Quantity]) -> Result<Quantity> {
        samples.iter().try_fold(Quantity::ZERO, |acc, sample| {
            acc.checked_add(*sample).ok_or_else(|| self.overflow())
        })
    }

    fn empty(&self) -> CollectorError {
        CollectorError::EmptyInput {
            aggregator: self.name().to_string(),
        }
    }

    fn overflow(&self) -> CollectorError {
        CollectorError::Overflow {
            aggregator: self.name().to_string(),
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        DEFAULT_AGGREGATOR
    }
}

impl FromStr for Aggregator {
    type Err = CollectorError;

    fn from_str(name: &str) -> Result<Self> {
        match name.trim() {
            "sum" => Ok(Aggregator::Sum),
            "avg" | "average" => Ok(Aggregator::Avg),
            "max" => Ok(Aggregator::Max),
            "min" => Ok(Aggregator::Min),
            "count" => Ok(Aggregator::Count),
            other => Err(CollectorError::UnsupportedAggregator {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse `policy` and reduce `samples` in one step
pub fn aggregate(policy: &str, samples: &[Quantity]) -> Result<Quantity> {
    policy.parse::<Aggregator>()?.aggregate(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<Quantity> {
        values.iter().copied().map(Quantity::from_int).collect()
    }

    #[test]
    fn test_sum() {
        assert_eq!(aggregate("sum", &ints(&[3, 5, 6])).unwrap(), Quantity::from_int(14));
        assert_eq!(aggregate("sum", &ints(&[3])).unwrap(), Quantity::from_int(3));
        assert_eq!(aggregate("sum", &[]).unwrap(), Quantity::ZERO);
        assert_eq!(aggregate("sum", &ints(&[-4, 4])).unwrap(), Quantity::ZERO);
    }

    #[test]
    fn test_count_includes_empty_input() {
        assert_eq!(aggregate("count", &ints(&[3, 5, 6])).unwrap(), Quantity::from_int(3));
        assert_eq!(aggregate("count", &[]).unwrap(), Quantity::ZERO);
    }

    #[test]
    fn test_average_rounds_toward_negative_infinity() {
        let avg = aggregate("avg", &ints(&[3, 5, 6])).unwrap();
        assert_eq!(avg.milli_value(), 4_666);
        assert_eq!(avg.to_string(), "4666m");

        assert_eq!(aggregate("average", &ints(&[2, 4])).unwrap(), Quantity::from_int(3));
        assert_eq!(aggregate("avg", &ints(&[-1, -2])).unwrap().milli_value(), -1_500);
        assert_eq!(aggregate("avg", &ints(&[-1, -1, -2])).unwrap().milli_value(), -1_334);
    }

    #[test]
    fn test_average_is_not_sum() {
        let samples = ints(&[3, 5, 6]);
        assert_ne!(
            aggregate("average", &samples).unwrap(),
            aggregate("sum", &samples).unwrap()
        );
    }

    #[test]
    fn test_max_and_min() {
        let samples = ints(&[3, -5, 6, 6]);
        assert_eq!(aggregate("max", &samples).unwrap(), Quantity::from_int(6));
        assert_eq!(aggregate("min", &samples).unwrap(), Quantity::from_int(-5));
        assert_eq!(
            aggregate("max", &[Quantity::from_milli(1_001), Quantity::from_int(1)]).unwrap(),
            Quantity::from_milli(1_001)
        );
    }

    #[test]
    fn test_empty_input_fails_for_avg_max_min() {
        for policy in ["avg", "average", "max", "min"] {
            let err = aggregate(policy, &[]).unwrap_err();
            assert!(
                matches!(err, CollectorError::EmptyInput { .. }),
                "{} should fail on empty input, got {:?}",
                policy,
                err
            );
        }
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let err = "median".parse::<Aggregator>().unwrap_err();
        assert_eq!(
            err,
            CollectorError::UnsupportedAggregator {
                name: "median".to_string()
            }
        );
        assert!("".parse::<Aggregator>().is_err());
        assert!("SUM".parse::<Aggregator>().is_err());
    }

    #[test]
    fn test_sum_overflow_is_an_error() {
        let huge = Quantity::from_milli(i128::MAX - 10);
        let err = Aggregator::Sum
            .aggregate(&[huge, Quantity::from_int(1)])
            .unwrap_err();
        assert!(matches!(err, CollectorError::Overflow { .. }));
    }

    #[test]
    fn test_large_counter_sums_stay_exact() {
        let samples = vec![Quantity::from_int(i64::MAX); 4];
        let total = Aggregator::Sum.aggregate(&samples).unwrap();
        assert_eq!(total.value(), i128::from(i64::MAX) * 4);
    }

    #[test]
    fn test_default_is_sum() {
        assert_eq!(Aggregator::default(), Aggregator::Sum);
        assert_eq!(Aggregator::Avg.to_string(), "avg");
    }
}
