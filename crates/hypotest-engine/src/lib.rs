//! Chi-square and F hypothesis tests over tabular data.
//!
//! - goodness-of-fit of a frequency table to a distribution,
//! - independence of the two attributes of a contingency table,
//! - comparison of group means (one-way ANOVA).
//!
//! Rows flow through [`table`] (parsing, with bucket labels handled by
//! [`bucket`]), [`expected`] (bounded-parallel expected values),
//! [`statistic`] and finally [`runner`], which looks up the critical value
//! and decides.
//!
//! # Examples
//!
//! ```
//! use hypotest_engine::{
//!     distribution::Normal, expected::ExpectedValueEngine, runner::HypothesisTestRunner,
//!     significance::Significance,
//! };
//!
//! let runner = HypothesisTestRunner::new(ExpectedValueEngine::new()?, Significance::default());
//! let normal = Normal::new(34.93, 21.82)?;
//! let records = [["<10", "5"], ["10-30", "20"], ["30-50", "15"], [">50", "10"]];
//! let report = runner.goodness_of_fit(&records, &normal)?;
//! assert!(!report.decision.reject);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use self::{
    error::{EngineError, Location, ParseError},
    runner::{HypothesisTestRunner, RunError, Stage, TestReport},
};

pub mod bucket;
pub mod distribution;
pub mod error;
pub mod expected;
pub mod runner;
pub mod significance;
pub mod statistic;
pub mod table;
