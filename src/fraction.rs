//! Interpolation fraction (eta) generation.
//!
//! Two strategies are supported:
//!
//! - **isometric**: `middle` evenly spaced points strictly inside (0, 1),
//!   optionally extended past either end by `left` points below 0 and
//!   `right` points above 1
//! - **arbitrary**: the caller's values, unchanged and in order
//!
//! Extension points reuse the interior spacing unless explicit step
//! magnitudes are supplied. Explicit steps are listed left-then-right for
//! the sides that are present; the right side always takes the last value.
//!
//! ```
//! use posmix::fraction::{isometric, IsometricSpec};
//!
//! let spec = IsometricSpec {
//!     middle: Some(3),
//!     left: Some(1),
//!     right: Some(2),
//!     steps: Vec::new(),
//! };
//! let eta = isometric(&spec).unwrap();
//! assert_eq!(eta, vec![-0.25, 0.25, 0.5, 0.75, 1.25, 1.5]);
//! ```

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while building a fraction list.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FractionError {
    /// Isometric request without `middle`
    #[error("isometric mixing requires the number of middle points")]
    MissingMiddle,

    /// More than one step per side
    #[error("isometric mixing takes at most two extension steps, got {0}")]
    TooManySteps(usize),

    /// Step list does not match the extended sides
    #[error("{found} extension steps given for {expected} extended sides")]
    StepCountMismatch {
        /// Number of sides with a non-zero point count
        expected: usize,
        /// Number of steps supplied
        found: usize,
    },

    /// Unrecognised method name
    #[error("unknown mixing method '{0}', expected 'isometric' or 'arbitrary'")]
    UnknownMethod(String),

    /// Non-finite, zero or unparsable parameter
    #[error("invalid fraction parameter: {0}")]
    InvalidValue(String),
}

/// Result type for fraction generation
pub type Result<T> = std::result::Result<T, FractionError>;

/// Fraction generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MixMethod {
    /// Evenly spaced fractions with optional extrapolation
    #[default]
    Isometric,
    /// Caller-supplied fractions, used as given
    Arbitrary,
}

impl FromStr for MixMethod {
    type Err = FractionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "isometric" => Ok(MixMethod::Isometric),
            "arbitrary" => Ok(MixMethod::Arbitrary),
            other => Err(FractionError::UnknownMethod(other.to_string())),
        }
    }
}

impl fmt::Display for MixMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MixMethod::Isometric => write!(f, "isometric"),
            MixMethod::Arbitrary => write!(f, "arbitrary"),
        }
    }
}

/// Parameters of the isometric strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IsometricSpec {
    /// Number of interior points; required.
    pub middle: Option<usize>,
    /// Number of points below 0.
    pub left: Option<usize>,
    /// Number of points above 1.
    pub right: Option<usize>,
    /// Explicit extension step magnitudes, one per present side, left first.
    pub steps: Vec<f64>,
}

/// A fraction request: the strategy together with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum FractionRequest {
    /// Evenly spaced fractions
    Isometric(IsometricSpec),
    /// Explicit fractions
    Arbitrary {
        /// Fractions in output order
        values: Vec<f64>,
    },
}

impl FractionRequest {
    /// The strategy this request selects.
    pub fn method(&self) -> MixMethod {
        match self {
            FractionRequest::Isometric(_) => MixMethod::Isometric,
            FractionRequest::Arbitrary { .. } => MixMethod::Arbitrary,
        }
    }
}

/// Produces the fraction list for a request.
pub fn set_eta(request: &FractionRequest) -> Result<Vec<f64>> {
    let eta = match request {
        FractionRequest::Isometric(spec) => isometric(spec)?,
        FractionRequest::Arbitrary { values } => arbitrary(values)?,
    };
    debug!("Generated {} fractions ({})", eta.len(), request.method());
    Ok(eta)
}

/// Evenly spaced fractions with optional extrapolation on either side,
/// sorted ascending.
///
/// The interior spacing is `1 / (1 + middle)`. Without explicit steps the
/// extensions use the same spacing; with explicit steps the right side takes
/// the last value and the left side the one before it (or the only one when
/// just one side is present). Step signs are ignored.
///
/// # Errors
///
/// - [`FractionError::MissingMiddle`] if `middle` is absent
/// - [`FractionError::TooManySteps`] for more than two steps
/// - [`FractionError::StepCountMismatch`] if the number of steps differs
///   from the number of present `left`/`right` sides
/// - [`FractionError::InvalidValue`] for zero or non-finite steps, or when
///   the request yields no fractions at all
pub fn isometric(spec: &IsometricSpec) -> Result<Vec<f64>> {
    let middle = spec.middle.ok_or(FractionError::MissingMiddle)?;
    let step = 1.0 / (1 + middle) as f64;
    let mut eta: Vec<f64> = (1..=middle).map(|k| k as f64 * step).collect();

    let (left_step, right_step) = if spec.steps.is_empty() {
        (step, step)
    } else {
        extension_steps(spec)?
    };

    if let Some(right) = spec.right {
        eta.extend((1..=right).map(|k| 1.0 + k as f64 * right_step));
    }
    if let Some(left) = spec.left {
        eta.extend((1..=left).map(|k| -(k as f64) * left_step));
    }

    if eta.is_empty() {
        return Err(FractionError::InvalidValue(
            "the requested point counts produce no fractions".to_string(),
        ));
    }
    eta.sort_by(|a, b| a.total_cmp(b));
    Ok(eta)
}

/// Resolves explicit step magnitudes into `(left, right)`.
fn extension_steps(spec: &IsometricSpec) -> Result<(f64, f64)> {
    let steps = &spec.steps;
    if steps.len() > 2 {
        return Err(FractionError::TooManySteps(steps.len()));
    }
    let sides = usize::from(spec.left.is_some()) + usize::from(spec.right.is_some());
    if steps.len() != sides {
        return Err(FractionError::StepCountMismatch {
            expected: sides,
            found: steps.len(),
        });
    }
    if let Some(bad) = steps.iter().find(|s| !s.is_finite() || **s == 0.0) {
        return Err(FractionError::InvalidValue(format!(
            "extension step {} must be finite and non-zero",
            bad
        )));
    }

    // Right consumes the last step, left the first; with a single side both are the same value.
    let right = steps[steps.len() - 1].abs();
    let left = steps[0].abs();
    Ok((left, right))
}

/// Returns the given fractions unchanged.
pub fn arbitrary(values: &[f64]) -> Result<Vec<f64>> {
    if values.is_empty() {
        return Err(FractionError::InvalidValue(
            "at least one fraction is required".to_string(),
        ));
    }
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(FractionError::InvalidValue(format!(
            "fraction {} is not finite",
            bad
        )));
    }
    Ok(values.to_vec())
}

/// Parses a comma- or whitespace-separated list of numbers.
pub fn parse_list(text: &str) -> Result<Vec<f64>> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| FractionError::InvalidValue(format!("'{}' is not a number", token)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(middle: Option<usize>, left: Option<usize>, right: Option<usize>, steps: &[f64]) -> IsometricSpec {
        IsometricSpec {
            middle,
            left,
            right,
            steps: steps.to_vec(),
        }
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len(), "{:?} vs {:?}", actual, expected);
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-12, "{:?} vs {:?}", actual, expected);
        }
    }

    #[test]
    fn test_isometric_interior_only() {
        let eta = isometric(&spec(Some(4), None, None, &[])).unwrap();
        assert_close(&eta, &[0.2, 0.4, 0.6, 0.8]);
        assert!(eta.iter().all(|e| *e > 0.0 && *e < 1.0));
    }

    #[test]
    fn test_isometric_with_explicit_steps() {
        let eta = isometric(&spec(Some(9), Some(4), Some(4), &[-0.1, 0.1])).unwrap();
        assert_eq!(eta.len(), 17);
        assert!(eta.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(eta.iter().filter(|e| **e < 0.0).count(), 4);
        assert_eq!(eta.iter().filter(|e| **e > 1.0).count(), 4);
        assert_close(&eta[..4], &[-0.4, -0.3, -0.2, -0.1]);
        assert_close(&eta[13..], &[1.1, 1.2, 1.3, 1.4]);
    }

    #[test]
    fn test_right_takes_last_step() {
        let eta = isometric(&spec(Some(1), Some(1), Some(1), &[0.3, 0.05])).unwrap();
        assert_close(&eta, &[-0.3, 0.5, 1.05]);
    }

    #[test]
    fn test_single_side_step() {
        let eta = isometric(&spec(Some(1), None, Some(2), &[0.2])).unwrap();
        assert_close(&eta, &[0.5, 1.2, 1.4]);
        let eta = isometric(&spec(Some(1), Some(2), None, &[0.2])).unwrap();
        assert_close(&eta, &[-0.4, -0.2, 0.5]);
    }

    #[test]
    fn test_extensions_reuse_interior_step() {
        let eta = isometric(&spec(Some(3), Some(1), Some(2), &[])).unwrap();
        assert_close(&eta, &[-0.25, 0.25, 0.5, 0.75, 1.25, 1.5]);
    }

    #[test]
    fn test_middle_zero_is_allowed() {
        let eta = isometric(&spec(Some(0), Some(1), Some(1), &[0.1, 0.1])).unwrap();
        assert_close(&eta, &[-0.1, 1.1]);
        assert!(isometric(&spec(Some(0), None, None, &[])).is_err());
    }

    #[test]
    fn test_isometric_validation() {
        assert_eq!(
            isometric(&spec(None, Some(1), None, &[])),
            Err(FractionError::MissingMiddle)
        );
        assert_eq!(
            isometric(&spec(Some(2), Some(1), None, &[0.1, 0.1])),
            Err(FractionError::StepCountMismatch {
                expected: 1,
                found: 2
            })
        );
        assert_eq!(
            isometric(&spec(Some(2), Some(1), Some(1), &[0.1, 0.1, 0.1])),
            Err(FractionError::TooManySteps(3))
        );
        assert!(matches!(
            isometric(&spec(Some(2), Some(1), None, &[0.0])),
            Err(FractionError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_arbitrary_keeps_order() {
        let values = [0.7, -0.2, 0.1];
        let request = FractionRequest::Arbitrary {
            values: values.to_vec(),
        };
        assert_eq!(set_eta(&request).unwrap(), values.to_vec());
        assert!(arbitrary(&[]).is_err());
        assert!(arbitrary(&[0.5, f64::NAN]).is_err());
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("Isometric".parse::<MixMethod>().unwrap(), MixMethod::Isometric);
        assert_eq!(" arbitrary ".parse::<MixMethod>().unwrap(), MixMethod::Arbitrary);
        assert_eq!(
            "linear".parse::<MixMethod>(),
            Err(FractionError::UnknownMethod("linear".to_string()))
        );
        assert_eq!(MixMethod::Arbitrary.to_string(), "arbitrary");
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("0.1,0.5 0.9").unwrap(), vec![0.1, 0.5, 0.9]);
        assert_eq!(parse_list("-0.1,").unwrap(), vec![-0.1]);
        assert!(parse_list("0.1,x").is_err());
    }
}
