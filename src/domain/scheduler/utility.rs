use crate::error::ConversionError;
use std::str::FromStr;

/// Concave per-class utility of the smoothed throughput `x` of a queue.
///
/// Every shape is parameterised by a priority coefficient `μ` and a target rate `τ`. Shapes with a
/// kink at `x = τ` report the left derivative there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UtilityFunction {
    /// `U(x) = -μ·|x - τ|`: pushes the throughput towards the target from both sides.
    #[default]
    TargetTracking,

    /// `U(x) = μ·min(x, τ)`: rewards throughput up to the target, indifferent above.
    Saturating,

    /// `U(x) = μ·ln(1 + x) - μ·x / (1 + τ)`: smooth, maximal at the target.
    ProportionalFair,
}

impl UtilityFunction {
    pub fn value(&self, rate: f64, priority: f64, target: f64) -> f64 {
        match self {
            UtilityFunction::TargetTracking => -priority * (rate - target).abs(),
            UtilityFunction::Saturating => priority * rate.min(target),
            UtilityFunction::ProportionalFair => priority * (1.0 + rate.max(0.0)).ln() - priority * rate / (1.0 + target),
        }
    }

    /// (Sub-)gradient of the utility at `rate`.
    ///
    /// At the kink of `TargetTracking` and `Saturating` the sub-differential is an interval; the
    /// left derivative is returned, which keeps serving a class that just reached its target.
    pub fn gradient(&self, rate: f64, priority: f64, target: f64) -> f64 {
        match self {
            UtilityFunction::TargetTracking => {
                if rate <= target {
                    priority
                } else {
                    -priority
                }
            }
            UtilityFunction::Saturating => {
                if rate <= target {
                    priority
                } else {
                    0.0
                }
            }
            UtilityFunction::ProportionalFair => priority / (1.0 + rate.max(0.0)) - priority / (1.0 + target),
        }
    }
}

impl FromStr for UtilityFunction {
    type Err = ConversionError;

    fn from_str(utility_dto: &str) -> Result<UtilityFunction, Self::Err> {
        match utility_dto {
            "TargetTracking" | "target-tracking" => Ok(UtilityFunction::TargetTracking),
            "Saturating" | "saturating" => Ok(UtilityFunction::Saturating),
            "ProportionalFair" | "proportional-fair" => Ok(UtilityFunction::ProportionalFair),
            _ => Err(ConversionError::UnknownUtility(utility_dto.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIORITY: f64 = 2.0;
    const TARGET: f64 = 1.0;

    #[test]
    fn test_kink_uses_left_derivative() {
        for utility in [UtilityFunction::TargetTracking, UtilityFunction::Saturating] {
            let h = 1e-6;
            let left = (utility.value(TARGET, PRIORITY, TARGET) - utility.value(TARGET - h, PRIORITY, TARGET)) / h;

            assert!((utility.gradient(TARGET, PRIORITY, TARGET) - left).abs() < 1e-3, "{:?} does not use the left derivative", utility);
        }
    }

    #[test]
    fn test_target_tracking_sign_flips_at_target() {
        let utility = UtilityFunction::TargetTracking;
        assert_eq!(utility.gradient(0.2, PRIORITY, TARGET), PRIORITY);
        assert_eq!(utility.gradient(1.5, PRIORITY, TARGET), -PRIORITY);
    }

    #[test]
    fn test_saturating_gradient_is_never_negative() {
        let utility = UtilityFunction::Saturating;
        assert_eq!(utility.gradient(0.0, PRIORITY, TARGET), PRIORITY);
        assert_eq!(utility.gradient(3.0, PRIORITY, TARGET), 0.0);
    }

    #[test]
    fn test_proportional_fair_is_zero_at_target_and_decreasing() {
        let utility = UtilityFunction::ProportionalFair;
        assert!(utility.gradient(TARGET, PRIORITY, TARGET).abs() < 1e-12);

        let samples: Vec<f64> = [0.0, 0.5, 1.0, 2.0, 4.0].iter().map(|x| utility.gradient(*x, PRIORITY, TARGET)).collect();
        assert!(samples.windows(2).all(|w| w[0] > w[1]), "Gradient must decrease (concave utility): {:?}", samples);
    }

    #[test]
    fn test_parse_utility_names() {
        assert_eq!("target-tracking".parse::<UtilityFunction>(), Ok(UtilityFunction::TargetTracking));
        assert_eq!("Saturating".parse::<UtilityFunction>(), Ok(UtilityFunction::Saturating));
        assert_eq!("proportional-fair".parse::<UtilityFunction>(), Ok(UtilityFunction::ProportionalFair));
        assert_eq!("log".parse::<UtilityFunction>(), Err(ConversionError::UnknownUtility("log".to_string())));
    }
}
