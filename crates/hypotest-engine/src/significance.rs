use std::{fmt, str::FromStr};

/// Error returned for a significance level outside `(0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, derive_more::Display, derive_more::Error)]
#[display("significance level must lie strictly between 0 and 1, got {alpha}")]
pub struct SignificanceError {
    pub alpha: f64,
}

/// Significance level `alpha` of an upper-tailed test.
///
/// Defaults to 0.05, i.e. a confidence of 0.95.
///
/// # Examples
///
/// ```
/// use hypotest_engine::significance::Significance;
///
/// let alpha: Significance = "0.01".parse().unwrap();
/// assert_eq!(alpha.alpha(), 0.01);
/// assert!((alpha.confidence() - 0.99).abs() < 1e-12);
/// assert!(Significance::new(1.5).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Significance(f64);

impl Significance {
    pub fn new(alpha: f64) -> Result<Self, SignificanceError> {
        if alpha > 0.0 && alpha < 1.0 {
            Ok(Self(alpha))
        } else {
            Err(SignificanceError { alpha })
        }
    }

    #[must_use]
    pub fn alpha(self) -> f64 {
        self.0
    }

    /// Returns `1 - alpha`, the probability passed to the quantile function.
    #[must_use]
    pub fn confidence(self) -> f64 {
        1.0 - self.0
    }
}

impl Default for Significance {
    fn default() -> Self {
        Self(0.05)
    }
}

impl TryFrom<f64> for Significance {
    type Error = SignificanceError;

    fn try_from(alpha: f64) -> Result<Self, Self::Error> {
        Self::new(alpha)
    }
}

impl From<Significance> for f64 {
    fn from(significance: Significance) -> Self {
        significance.0
    }
}

impl FromStr for Significance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let alpha = s
            .trim()
            .parse::<f64>()
            .map_err(|e| format!("invalid significance level {s:?}: {e}"))?;
        Self::new(alpha).map_err(|e| e.to_string())
    }
}

impl fmt::Display for Significance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!(Significance::new(0.0).is_err());
        assert!(Significance::new(1.0).is_err());
        assert!(Significance::new(f64::NAN).is_err());
        assert!(Significance::new(0.1).is_ok());
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Significance = serde_json::from_str("0.1").unwrap();
        assert_eq!(ok.alpha(), 0.1);
        assert!(serde_json::from_str::<Significance>("2.0").is_err());
    }
}
