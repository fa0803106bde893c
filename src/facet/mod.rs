//! Facets, facet values and numeric constraints
//!
//! A **facet** is one independent dimension a user filters on. Five of them
//! hold sets of discrete values:
//!
//! | Facet | Value type | Encoding | Record field |
//! |-------|-----------|----------|--------------|
//! | `genre` | text | as-is | `genres` (list) |
//! | `production` | text | as-is | `production_companies` (list) |
//! | `title` | text | as-is | `title` |
//! | `year` | integer | `"2000"` | `year` |
//! | `note` | rating | `"7.5"` (one decimal) | `vote_average` |
//!
//! The picker UI exchanges every value as a string. Internally year and note
//! values are kept as integers (`i32` years, [`Rating`] tenths) so numeric
//! comparisons never go through float parsing twice.
//!
//! Three **numeric facets** (popularity, budget, revenue) instead hold at most
//! one [`NumericFilter`] each.

pub mod state;

pub use state::{FacetState, Selections, YearRange};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::btree_set;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Facet identifiers
// ============================================================================

/// A discrete-valued facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facet {
    Genre,
    #[serde(alias = "prod", alias = "company", alias = "productions")]
    Production,
    Title,
    Year,
    Note,
}

impl Facet {
    pub const ALL: [Facet; 5] = [
        Facet::Genre,
        Facet::Production,
        Facet::Title,
        Facet::Year,
        Facet::Note,
    ];

    pub fn index(self) -> usize {
        match self {
            Facet::Genre => 0,
            Facet::Production => 1,
            Facet::Title => 2,
            Facet::Year => 3,
            Facet::Note => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Facet::Genre => "genre",
            Facet::Production => "production",
            Facet::Title => "title",
            Facet::Year => "year",
            Facet::Note => "note",
        }
    }

    /// Genre and production records carry a list of values; the others one.
    pub fn is_multi_valued(self) -> bool {
        matches!(self, Facet::Genre | Facet::Production)
    }

    pub fn kind(self) -> ValueKind {
        match self {
            Facet::Genre | Facet::Production | Facet::Title => ValueKind::Text,
            Facet::Year => ValueKind::Year,
            Facet::Note => ValueKind::Note,
        }
    }

    /// Decode a string coming from the presentation layer into a typed value.
    pub fn parse_value(self, raw: &str) -> Result<FacetValue> {
        let invalid = || Error::InvalidValue {
            facet: self,
            value: raw.to_string(),
        };
        match self.kind() {
            ValueKind::Text => Ok(FacetValue::Text(raw.to_string())),
            ValueKind::Year => raw
                .trim()
                .parse::<i32>()
                .map(FacetValue::Year)
                .map_err(|_| invalid()),
            ValueKind::Note => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Rating::from_f64)
                .map(FacetValue::Note)
                .ok_or_else(invalid),
        }
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Facet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "genre" | "genres" => Ok(Facet::Genre),
            "production" | "productions" | "prod" | "company" => Ok(Facet::Production),
            "title" => Ok(Facet::Title),
            "year" => Ok(Facet::Year),
            "note" | "rating" | "vote_average" => Ok(Facet::Note),
            _ => Err(Error::Unknown {
                kind: "facet",
                name: s.to_string(),
            }),
        }
    }
}

/// A continuous metric that takes a single range constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumericFacet {
    Popularity,
    Budget,
    Revenue,
}

impl NumericFacet {
    pub const ALL: [NumericFacet; 3] = [
        NumericFacet::Popularity,
        NumericFacet::Budget,
        NumericFacet::Revenue,
    ];

    pub fn index(self) -> usize {
        match self {
            NumericFacet::Popularity => 0,
            NumericFacet::Budget => 1,
            NumericFacet::Revenue => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NumericFacet::Popularity => "popularity",
            NumericFacet::Budget => "budget",
            NumericFacet::Revenue => "revenue",
        }
    }
}

impl fmt::Display for NumericFacet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NumericFacet {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "popularity" => Ok(NumericFacet::Popularity),
            "budget" => Ok(NumericFacet::Budget),
            "revenue" => Ok(NumericFacet::Revenue),
            _ => Err(Error::Unknown {
                kind: "numeric facet",
                name: s.to_string(),
            }),
        }
    }
}

// ============================================================================
// Values
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Year,
    Note,
}

/// A vote average rounded to one decimal place, stored as tenths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rating(i32);

impl Rating {
    pub fn from_tenths(tenths: i32) -> Self {
        Rating(tenths)
    }

    /// Nearest tenth to the exact binary value, ties away from zero.
    ///
    /// 7.25 is exact and becomes 7.3; the literal 7.05 is stored just below
    /// 7.05 and becomes 7.0. Scaling by ten first would round it up.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() || value.abs() >= (i32::MAX / 10 - 1) as f64 {
            return None;
        }
        // Enough digits for the exact expansion of any value in range
        let digits = format!("{:.60}", value.abs());
        let (whole, frac) = digits.split_once('.')?;
        let whole: i32 = whole.parse().ok()?;
        let mut frac = frac.bytes().map(|b| i32::from(b.wrapping_sub(b'0')));
        let tenth = frac.next().unwrap_or(0);
        let hundredth = frac.next().unwrap_or(0);
        let tenths = whole * 10 + tenth + i32::from(hundredth >= 5);
        Some(Rating(if value < 0.0 { -tenths } else { tenths }))
    }

    pub fn tenths(self) -> i32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 10.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{}", sign, abs / 10, abs % 10)
    }
}

/// An owned facet value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FacetValue {
    Text(String),
    Year(i32),
    Note(Rating),
}

impl FacetValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            FacetValue::Text(_) => ValueKind::Text,
            FacetValue::Year(_) => ValueKind::Year,
            FacetValue::Note(_) => ValueKind::Note,
        }
    }

    pub fn as_value_ref(&self) -> ValueRef<'_> {
        match self {
            FacetValue::Text(s) => ValueRef::Text(s),
            FacetValue::Year(y) => ValueRef::Year(*y),
            FacetValue::Note(r) => ValueRef::Note(*r),
        }
    }

    /// Numeric reading of year and note values; text has none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FacetValue::Text(_) => None,
            FacetValue::Year(y) => Some(*y as f64),
            FacetValue::Note(r) => Some(r.as_f64()),
        }
    }
}

impl fmt::Display for FacetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacetValue::Text(s) => f.write_str(s),
            FacetValue::Year(y) => write!(f, "{}", y),
            FacetValue::Note(r) => write!(f, "{}", r),
        }
    }
}

impl Serialize for FacetValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A borrowed facet value, as read off a record during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ValueRef<'a> {
    Text(&'a str),
    Year(i32),
    Note(Rating),
}

impl ValueRef<'_> {
    pub fn to_value(self) -> FacetValue {
        match self {
            ValueRef::Text(s) => FacetValue::Text(s.to_string()),
            ValueRef::Year(y) => FacetValue::Year(y),
            ValueRef::Note(r) => FacetValue::Note(r),
        }
    }
}

// ============================================================================
// Value sets
// ============================================================================

/// A set of values of one kind. Lookups with a [`ValueRef`] never allocate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueSet {
    Text(BTreeSet<String>),
    Year(BTreeSet<i32>),
    Note(BTreeSet<Rating>),
}

impl ValueSet {
    pub fn new(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Text => ValueSet::Text(BTreeSet::new()),
            ValueKind::Year => ValueSet::Year(BTreeSet::new()),
            ValueKind::Note => ValueSet::Note(BTreeSet::new()),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            ValueSet::Text(_) => ValueKind::Text,
            ValueSet::Year(_) => ValueKind::Year,
            ValueSet::Note(_) => ValueKind::Note,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ValueSet::Text(s) => s.len(),
            ValueSet::Year(s) => s.len(),
            ValueSet::Note(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, value: ValueRef<'_>) -> bool {
        match (self, value) {
            (ValueSet::Text(s), ValueRef::Text(v)) => s.contains(v),
            (ValueSet::Year(s), ValueRef::Year(v)) => s.contains(&v),
            (ValueSet::Note(s), ValueRef::Note(v)) => s.contains(&v),
            _ => false,
        }
    }

    /// Returns true when the value was not yet present. Mismatched kinds are ignored.
    pub(crate) fn insert(&mut self, value: &FacetValue) -> bool {
        match (self, value) {
            (ValueSet::Text(s), FacetValue::Text(v)) => {
                if s.contains(v) {
                    false
                } else {
                    s.insert(v.clone())
                }
            }
            (ValueSet::Year(s), FacetValue::Year(v)) => s.insert(*v),
            (ValueSet::Note(s), FacetValue::Note(v)) => s.insert(*v),
            _ => false,
        }
    }

    pub(crate) fn remove(&mut self, value: ValueRef<'_>) -> bool {
        match (self, value) {
            (ValueSet::Text(s), ValueRef::Text(v)) => s.remove(v),
            (ValueSet::Year(s), ValueRef::Year(v)) => s.remove(&v),
            (ValueSet::Note(s), ValueRef::Note(v)) => s.remove(&v),
            _ => false,
        }
    }

    pub(crate) fn clear(&mut self) {
        match self {
            ValueSet::Text(s) => s.clear(),
            ValueSet::Year(s) => s.clear(),
            ValueSet::Note(s) => s.clear(),
        }
    }

    pub fn iter(&self) -> ValueIter<'_> {
        match self {
            ValueSet::Text(s) => ValueIter::Text(s.iter()),
            ValueSet::Year(s) => ValueIter::Year(s.iter()),
            ValueSet::Note(s) => ValueIter::Note(s.iter()),
        }
    }

    pub fn to_values(&self) -> Vec<FacetValue> {
        self.iter().map(ValueRef::to_value).collect()
    }
}

impl Serialize for ValueSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.to_values())
    }
}

pub enum ValueIter<'a> {
    Text(btree_set::Iter<'a, String>),
    Year(btree_set::Iter<'a, i32>),
    Note(btree_set::Iter<'a, Rating>),
}

impl<'a> Iterator for ValueIter<'a> {
    type Item = ValueRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            ValueIter::Text(it) => it.next().map(|s| ValueRef::Text(s)),
            ValueIter::Year(it) => it.next().map(|y| ValueRef::Year(*y)),
            ValueIter::Note(it) => it.next().map(|r| ValueRef::Note(*r)),
        }
    }
}

/// Selected and excluded values of one facet, plus its strict flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FacetSet {
    selected: ValueSet,
    excluded: ValueSet,
    /// AND semantics for `selected` (only honoured on multi-valued facets)
    strict: bool,
}

impl FacetSet {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            selected: ValueSet::new(kind),
            excluded: ValueSet::new(kind),
            strict: false,
        }
    }

    pub fn selected(&self) -> &ValueSet {
        &self.selected
    }

    pub fn excluded(&self) -> &ValueSet {
        &self.excluded
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn is_active(&self) -> bool {
        !self.selected.is_empty() || !self.excluded.is_empty()
    }

    pub fn is_selected(&self, value: ValueRef<'_>) -> bool {
        self.selected.contains(value)
    }

    pub fn is_excluded(&self, value: ValueRef<'_>) -> bool {
        self.excluded.contains(value)
    }
}

// ============================================================================
// Numeric constraints
// ============================================================================

/// The single active constraint of a numeric facet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum NumericFilter {
    Gte { v1: f64 },
    Lte { v1: f64 },
    Between { v1: f64, v2: f64 },
}

impl NumericFilter {
    pub fn between(a: f64, b: f64) -> Self {
        NumericFilter::Between { v1: a, v2: b }.normalized()
    }

    /// `between` bounds are reordered so that `v1 <= v2`.
    pub fn normalized(self) -> Self {
        match self {
            NumericFilter::Between { v1, v2 } if v1 > v2 => NumericFilter::Between { v1: v2, v2: v1 },
            other => other,
        }
    }

    pub fn matches(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match *self {
            NumericFilter::Gte { v1 } => value >= v1,
            NumericFilter::Lte { v1 } => value <= v1,
            NumericFilter::Between { v1, v2 } => v1.min(v2) <= value && value <= v1.max(v2),
        }
    }

    pub(crate) fn hash_bits<H: std::hash::Hasher>(&self, state: &mut H) {
        use std::hash::Hash;
        match *self {
            NumericFilter::Gte { v1 } => (0u8, v1.to_bits()).hash(state),
            NumericFilter::Lte { v1 } => (1u8, v1.to_bits()).hash(state),
            NumericFilter::Between { v1, v2 } => (2u8, v1.to_bits(), v2.to_bits()).hash(state),
        }
    }
}

impl fmt::Display for NumericFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericFilter::Gte { v1 } => write!(f, ">= {}", v1),
            NumericFilter::Lte { v1 } => write!(f, "<= {}", v1),
            NumericFilter::Between { v1, v2 } => write!(f, "{} .. {}", v1, v2),
        }
    }
}

/// Parses `gte:20`, `lte:20`, `between:1e6:5e6`, `>=20`, `<=20` and `1e6..5e6`.
impl FromStr for NumericFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let expr = s.trim();
        let invalid = || Error::InvalidNumericFilter(s.to_string());
        let number = |t: &str| -> Result<f64> {
            t.trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(invalid)
        };

        if let Some(rest) = expr.strip_prefix(">=") {
            return Ok(NumericFilter::Gte { v1: number(rest)? });
        }
        if let Some(rest) = expr.strip_prefix("<=") {
            return Ok(NumericFilter::Lte { v1: number(rest)? });
        }
        if let Some((a, b)) = expr.split_once("..") {
            return Ok(NumericFilter::between(number(a)?, number(b)?));
        }

        let mut parts = expr.split(':');
        let op = parts.next().unwrap_or_default().to_ascii_lowercase();
        let args: Vec<&str> = parts.collect();
        match (op.as_str(), args.as_slice()) {
            ("gte", [v]) => Ok(NumericFilter::Gte { v1: number(v)? }),
            ("lte", [v]) => Ok(NumericFilter::Lte { v1: number(v)? }),
            ("between", [a, b]) => Ok(NumericFilter::between(number(a)?, number(b)?)),
            _ => Err(invalid()),
        }
    }
}

/// Predicate used to bulk-select year or note values by number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum ValuePredicate {
    Gte { v1: f64 },
    Lte { v1: f64 },
    Between { v1: f64, v2: f64 },
    Exact { v1: f64 },
}

impl ValuePredicate {
    const EXACT_TOLERANCE: f64 = 0.01;

    pub fn matches(&self, value: f64) -> bool {
        match *self {
            ValuePredicate::Gte { v1 } => value >= v1,
            ValuePredicate::Lte { v1 } => value <= v1,
            ValuePredicate::Between { v1, v2 } => v1.min(v2) <= value && value <= v1.max(v2),
            ValuePredicate::Exact { v1 } => (value - v1).abs() < Self::EXACT_TOLERANCE,
        }
    }
}

impl From<NumericFilter> for ValuePredicate {
    fn from(filter: NumericFilter) -> Self {
        match filter {
            NumericFilter::Gte { v1 } => ValuePredicate::Gte { v1 },
            NumericFilter::Lte { v1 } => ValuePredicate::Lte { v1 },
            NumericFilter::Between { v1, v2 } => ValuePredicate::Between { v1, v2 },
        }
    }
}
