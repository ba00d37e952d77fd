//! Descriptive statistics shared by the hypothesis tests.
//!
//! The mean-comparison test needs, for every group, the group size, the
//! arithmetic mean and the Bessel-corrected sample variance. This crate keeps
//! those summaries in one place so the test engine and the report writer agree
//! on how they are computed.
//!
//! # Modules
//!
//! - [`descriptive`]: Summaries of a single sample (count, mean, variance, ...)
//!
//! # Examples
//!
//! ```
//! use hypotest_stats::descriptive::DescriptiveStats;
//!
//! let values = [1.0, 2.0, 3.0, 4.0, 5.0];
//! let stats = DescriptiveStats::new(values).unwrap();
//! assert_eq!(stats.mean, 3.0);
//! assert_eq!(stats.sample_variance, Some(2.5));
//! ```

pub mod descriptive;
