//! Distribution capabilities consumed by the engine.
//!
//! The engine never fits distributions; it only asks a caller-supplied
//! distribution for cumulative probabilities ([`Cdf`]) and, when looking up a
//! critical value, for quantiles ([`Quantile`]). Both traits are implemented
//! for the `statrs` distributions re-exported here, and test code can plug in
//! any synthetic distribution.
//!
//! [`DistributionSpec`] describes a candidate distribution by its parameters,
//! as found in command-line options or batch configuration files.
//! [`ReferenceDistribution`] names the distribution a test statistic is
//! compared against.

use statrs::distribution::{Continuous, ContinuousCDF};
pub use statrs::distribution::{ChiSquared, FisherSnedecor, Normal, StudentsT};

use crate::{error::EngineError, significance::Significance};

/// Cumulative distribution function.
///
/// Implementations must be monotone non-decreasing with `cdf(-inf) = 0` and
/// `cdf(+inf) = 1`.
pub trait Cdf {
    fn cdf(&self, x: f64) -> f64;
}

/// Inverse of the cumulative distribution function.
pub trait Quantile: Cdf {
    /// Returns the value below which probability mass `p` lies, for `p` in `(0, 1)`.
    fn quantile(&self, p: f64) -> f64;
}

macro_rules! impl_statrs_distribution {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Cdf for $ty {
                fn cdf(&self, x: f64) -> f64 {
                    ContinuousCDF::cdf(self, x)
                }
            }

            impl Quantile for $ty {
                fn quantile(&self, p: f64) -> f64 {
                    refine_quantile(self, p, ContinuousCDF::inverse_cdf(self, p))
                }
            }
        )*
    };
}

impl_statrs_distribution!(Normal, StudentsT, ChiSquared, FisherSnedecor);

const QUANTILE_NEWTON_STEPS: usize = 8;

/// Polishes a quantile estimate with Newton steps on `cdf(x) - p`.
///
/// Generic inverse CDFs fall back to a coarse bisection; a few Newton steps
/// bring the critical value to full precision. A step is only taken while it
/// reduces the residual.
fn refine_quantile<D>(distribution: &D, p: f64, mut x: f64) -> f64
where
    D: ContinuousCDF<f64, f64> + Continuous<f64, f64>,
{
    let mut residual = distribution.cdf(x) - p;
    for _ in 0..QUANTILE_NEWTON_STEPS {
        let density = distribution.pdf(x);
        if !x.is_finite() || !density.is_finite() || density <= 0.0 {
            break;
        }
        let next = x - residual / density;
        let next_residual = distribution.cdf(next) - p;
        if !next.is_finite() || next_residual.abs() >= residual.abs() {
            break;
        }
        x = next;
        residual = next_residual;
    }
    x
}

/// Parameters of a candidate distribution for the goodness-of-fit test.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DistributionSpec {
    Normal {
        mean: f64,
        std_dev: f64,
    },
    StudentsT {
        #[serde(default)]
        location: f64,
        #[serde(default = "default_scale")]
        scale: f64,
        freedom: f64,
    },
    ChiSquared {
        freedom: f64,
    },
    F {
        freedom1: f64,
        freedom2: f64,
    },
}

fn default_scale() -> f64 {
    1.0
}

impl DistributionSpec {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DistributionSpec::Normal { .. } => "normal",
            DistributionSpec::StudentsT { .. } => "students-t",
            DistributionSpec::ChiSquared { .. } => "chi-squared",
            DistributionSpec::F { .. } => "f",
        }
    }

    /// Builds the distribution, validating its parameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use hypotest_engine::distribution::{Cdf, DistributionSpec};
    ///
    /// let spec = DistributionSpec::Normal { mean: 0.0, std_dev: 1.0 };
    /// let normal = spec.build().unwrap();
    /// assert!((normal.cdf(0.0) - 0.5).abs() < 1e-12);
    ///
    /// let invalid = DistributionSpec::Normal { mean: 0.0, std_dev: -1.0 };
    /// assert!(invalid.build().is_err());
    /// ```
    pub fn build(&self) -> Result<Box<dyn Cdf + Send + Sync>, EngineError> {
        let name = self.name();
        let invalid = |reason: String| EngineError::Distribution { name, reason };
        let distribution: Box<dyn Cdf + Send + Sync> = match *self {
            DistributionSpec::Normal { mean, std_dev } => {
                Box::new(Normal::new(mean, std_dev).map_err(|e| invalid(e.to_string()))?)
            }
            DistributionSpec::StudentsT {
                location,
                scale,
                freedom,
            } => Box::new(
                StudentsT::new(location, scale, freedom).map_err(|e| invalid(e.to_string()))?,
            ),
            DistributionSpec::ChiSquared { freedom } => {
                Box::new(ChiSquared::new(freedom).map_err(|e| invalid(e.to_string()))?)
            }
            DistributionSpec::F { freedom1, freedom2 } => Box::new(
                FisherSnedecor::new(freedom1, freedom2).map_err(|e| invalid(e.to_string()))?,
            ),
        };
        Ok(distribution)
    }
}

/// The distribution a test statistic is compared against.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ReferenceDistribution {
    /// Chi-squared with `freedom` degrees of freedom.
    ChiSquared { freedom: f64 },
    /// Fisher-Snedecor F with `(numerator, denominator)` degrees of freedom.
    F { numerator: f64, denominator: f64 },
}

impl ReferenceDistribution {
    /// Returns the upper-tail critical value `quantile(1 - alpha)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hypotest_engine::{distribution::ReferenceDistribution, significance::Significance};
    ///
    /// let reference = ReferenceDistribution::ChiSquared { freedom: 1.0 };
    /// let critical = reference.critical_value(Significance::default()).unwrap();
    /// assert!((critical - 3.841_458_820_694_124).abs() < 1e-6);
    /// ```
    pub fn critical_value(&self, significance: Significance) -> Result<f64, EngineError> {
        let p = significance.confidence();
        match *self {
            ReferenceDistribution::ChiSquared { freedom } => {
                let distribution =
                    ChiSquared::new(freedom).map_err(|e| EngineError::Distribution {
                        name: "chi-squared",
                        reason: e.to_string(),
                    })?;
                Ok(distribution.quantile(p))
            }
            ReferenceDistribution::F {
                numerator,
                denominator,
            } => {
                let distribution = FisherSnedecor::new(numerator, denominator).map_err(|e| {
                    EngineError::Distribution {
                        name: "f",
                        reason: e.to_string(),
                    }
                })?;
                Ok(distribution.quantile(p))
            }
        }
    }

    /// Returns the degrees of freedom as `(first, second)`.
    #[must_use]
    pub fn degrees_of_freedom(&self) -> (f64, Option<f64>) {
        match *self {
            ReferenceDistribution::ChiSquared { freedom } => (freedom, None),
            ReferenceDistribution::F {
                numerator,
                denominator,
            } => (numerator, Some(denominator)),
        }
    }
}
