//! Bucket labels of a frequency table.
//!
//! A goodness-of-fit input classifies observations by a textual label such as
//! `42`, `100-200`, `<10` or `>50`. This module turns those labels into
//! [`Bucket`] values and computes the probability mass a distribution assigns
//! to each of them.
//!
//! # Grammar
//!
//! | Label      | Bucket                         |
//! |------------|--------------------------------|
//! | `v`        | [`Bucket::ExactValue`]         |
//! | `lo-hi`    | [`Bucket::ClosedRange`]        |
//! | `<t`       | [`Bucket::UnboundedBelow`]     |
//! | `>t`       | [`Bucket::UnboundedAbove`]     |
//!
//! Whitespace around tokens is ignored.
//!
//! ## Negative numbers
//!
//! `-` doubles as the range separator and the sign of a number. A `-` is a
//! range separator only when the previous non-blank character is a digit or
//! `.`; anywhere else it is a sign. Hence `-5` is an exact value, `-10--5` is
//! the range from -10 to -5, `<-3` is unbounded below -3 and `1e-3` is the
//! exact value 0.001.
//!
//! # Examples
//!
//! ```
//! use hypotest_engine::bucket::Bucket;
//!
//! assert_eq!("100-200".parse(), Ok(Bucket::ClosedRange { lo: 100.0, hi: 200.0 }));
//! assert_eq!("<50".parse(), Ok(Bucket::UnboundedBelow(50.0)));
//! assert_eq!("-10--5".parse(), Ok(Bucket::ClosedRange { lo: -10.0, hi: -5.0 }));
//! assert!("abc".parse::<Bucket>().is_err());
//! ```

use std::{fmt, str::FromStr};

use crate::{distribution::Cdf, error::ParseError};

/// A classification interval or exact value of a frequency table row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bucket {
    /// A single value `v`.
    ExactValue(f64),
    /// The closed interval `[lo, hi]`, with `lo <= hi`.
    ClosedRange { lo: f64, hi: f64 },
    /// Everything below the threshold (`< t`).
    UnboundedBelow(f64),
    /// Everything above the threshold (`> t`).
    UnboundedAbove(f64),
}

impl Bucket {
    /// Parses a bucket label.
    ///
    /// Same as [`str::parse`].
    pub fn parse(label: &str) -> Result<Self, ParseError> {
        label.parse()
    }

    /// Returns the probability `distribution` assigns to this bucket.
    ///
    /// An exact value is measured by `cdf(v)`, which treats the value as the
    /// upper edge of the cumulative class it closes.
    #[must_use]
    pub fn probability<D>(&self, distribution: &D) -> f64
    where
        D: Cdf + ?Sized,
    {
        match *self {
            Bucket::ExactValue(v) | Bucket::UnboundedBelow(v) => distribution.cdf(v),
            Bucket::ClosedRange { lo, hi } => distribution.cdf(hi) - distribution.cdf(lo),
            Bucket::UnboundedAbove(t) => 1.0 - distribution.cdf(t),
        }
    }
}

impl FromStr for Bucket {
    type Err = ParseError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let label = label.trim();
        if label.is_empty() {
            return Err(ParseError::Empty);
        }

        let separators = range_separators(label);
        let has_below = label.contains('<');
        let has_above = label.contains('>');

        match separators.as_slice() {
            [] if !has_below && !has_above => parse_number(label).map(Bucket::ExactValue),
            [] if has_below => parse_open(label, '<').map(Bucket::UnboundedBelow),
            [] => parse_open(label, '>').map(Bucket::UnboundedAbove),
            &[at] => {
                let lo = parse_number(&label[..at])?;
                let hi = parse_number(&label[at + 1..])?;
                if lo > hi {
                    return Err(ParseError::InvertedRange);
                }
                Ok(Bucket::ClosedRange { lo, hi })
            }
            _ => Err(ParseError::MultipleDelimiters),
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::ExactValue(v) => write!(f, "{v}"),
            Bucket::ClosedRange { lo, hi } => write!(f, "{lo}-{hi}"),
            Bucket::UnboundedBelow(t) => write!(f, "<{t}"),
            Bucket::UnboundedAbove(t) => write!(f, ">{t}"),
        }
    }
}

/// Byte offsets of every `-` acting as a range separator.
fn range_separators(label: &str) -> Vec<usize> {
    let mut prev = None;
    label
        .char_indices()
        .filter_map(|(i, c)| {
            let is_separator =
                c == '-' && prev.is_some_and(|p: char| p.is_ascii_digit() || p == '.');
            if !c.is_whitespace() {
                prev = Some(c);
            }
            is_separator.then_some(i)
        })
        .collect()
}

/// Parses `<t` or `>t`; nothing may precede the marker.
fn parse_open(label: &str, marker: char) -> Result<f64, ParseError> {
    let (head, threshold) = label
        .split_once(marker)
        .ok_or(ParseError::UnrecognizedSyntax)?;
    if !head.trim().is_empty() || threshold.contains(['<', '>']) {
        return Err(ParseError::UnrecognizedSyntax);
    }
    parse_number(threshold)
}

/// Parses a finite floating-point number, ignoring surrounding whitespace.
pub(crate) fn parse_number(token: &str) -> Result<f64, ParseError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ParseError::NotNumeric);
    }
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ParseError::NotNumeric),
    }
}
