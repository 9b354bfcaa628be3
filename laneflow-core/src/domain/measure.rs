//! Values that can be mathematically undefined.
//!
//! A statistic over an empty window, a harmonic mean over a stalled vehicle, or
//! a coefficient of variation with zero mean has no meaningful number. Those
//! cases are carried as `Measure::Undefined` with a reason instead of being
//! folded into 0 or NaN.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a statistic could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedReason {
    /// No vehicles contributed to the statistic.
    NoVehicles,
    /// A zero speed entered a harmonic mean.
    DivideByZeroSpeed,
    /// The mean in a ratio statistic (e.g. CV) is zero.
    ZeroMean,
}

impl fmt::Display for UndefinedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoVehicles => write!(f, "no vehicles"),
            Self::DivideByZeroSpeed => write!(f, "divide by zero speed"),
            Self::ZeroMean => write!(f, "zero mean"),
        }
    }
}

/// A computed statistic, or the reason it does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum Measure {
    Value(f64),
    Undefined(UndefinedReason),
}

impl Measure {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(*v),
            Self::Undefined(_) => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    pub fn undefined_reason(&self) -> Option<UndefinedReason> {
        match self {
            Self::Value(_) => None,
            Self::Undefined(reason) => Some(*reason),
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v:.2}"),
            Self::Undefined(reason) => write!(f, "undefined ({reason})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_accessors() {
        let m = Measure::Value(24.5);
        assert_eq!(m.value(), Some(24.5));
        assert!(m.is_defined());
        assert_eq!(m.undefined_reason(), None);

        let u = Measure::Undefined(UndefinedReason::NoVehicles);
        assert_eq!(u.value(), None);
        assert!(!u.is_defined());
        assert_eq!(u.undefined_reason(), Some(UndefinedReason::NoVehicles));
    }

    #[test]
    fn serializes_with_explicit_state() {
        let json = serde_json::to_string(&Measure::Undefined(UndefinedReason::ZeroMean)).unwrap();
        assert_eq!(json, r#"{"state":"undefined","value":"zero_mean"}"#);
        let json = serde_json::to_string(&Measure::Value(1.5)).unwrap();
        assert_eq!(json, r#"{"state":"value","value":1.5}"#);
    }

    #[test]
    fn display_marks_undefined() {
        let u = Measure::Undefined(UndefinedReason::DivideByZeroSpeed);
        assert_eq!(u.to_string(), "undefined (divide by zero speed)");
        assert_eq!(Measure::Value(24.594).to_string(), "24.59");
    }
}
