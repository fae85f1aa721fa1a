//! Condition parsing and evaluation against an inferred field type.
//!
//! Evaluation happens in two explicit stages:
//!
//! 1. [`TypedCondition::parse`] reads the condition with the grammar of the
//!    field type (boolean literal, numeric comparison, date or date range).
//! 2. [`TypedCondition::matches`] interprets the value with the same type.
//!
//! If either stage cannot make sense of its input, the condition is applied
//! as a case-insensitive substring search instead. Evaluation never fails.
//!
//! # Grammar
//!
//! | Field type | Condition | Example |
//! |------------|-----------|---------|
//! | boolean | `true` / `false` | `TRUE` |
//! | number | `[>, <, >=, <=, =] <number>` | `>= 50`, `-3` |
//! | date | `<date>` or `<start> <end>` | `2021-01-01 2021-12-31` |
//! | string | any text | `gmail.com` |
//!
//! Any field type also accepts `null` / `undefined`, which matches absent
//! and null values.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use super::analyzer::FieldType;
use super::scalar::{as_finite_number, parse_timestamp};
use crate::types::value_text;

static NUMERIC_CONDITION: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(>=|<=|>|<|=)?\s*(-?\d+(?:\.\d+)?)$").ok());

/// Relational operator of a numeric condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    Equal,
}

impl Comparison {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            ">" => Some(Self::Greater),
            "<" => Some(Self::Less),
            ">=" => Some(Self::GreaterOrEqual),
            "<=" => Some(Self::LessOrEqual),
            "=" | "" => Some(Self::Equal),
            _ => None,
        }
    }

    /// Apply `lhs <op> rhs`.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Greater => lhs > rhs,
            Self::Less => lhs < rhs,
            Self::GreaterOrEqual => lhs >= rhs,
            Self::LessOrEqual => lhs <= rhs,
            Self::Equal => lhs == rhs,
        }
    }
}

/// A condition successfully read with the grammar of a field type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedCondition {
    /// Case-insensitive equality with `true` or `false`.
    Boolean(bool),
    /// `value <comparison> operand`.
    Number { comparison: Comparison, operand: f64 },
    /// Value falls on this calendar day.
    DateOn(NaiveDate),
    /// Value falls within `[start, end]`, both ends included.
    DateRange { start: NaiveDateTime, end: NaiveDateTime },
}

impl TypedCondition {
    /// Read `condition` with the grammar of `field_type`.
    ///
    /// Returns `None` when the condition does not fit the grammar, and always
    /// for `string` and `null` fields.
    #[must_use]
    pub fn parse(field_type: FieldType, condition: &str) -> Option<Self> {
        let condition = condition.trim();
        match field_type {
            FieldType::Boolean => parse_boolean(condition).map(Self::Boolean),
            FieldType::Number => parse_numeric(condition),
            FieldType::Date => parse_date(condition),
            FieldType::String | FieldType::Null => None,
        }
    }

    /// Test a non-null value.
    ///
    /// Returns `None` when the value cannot be read as the condition's type.
    #[must_use]
    pub fn matches(&self, value: &Value) -> Option<bool> {
        match self {
            Self::Boolean(expected) => {
                let text = value_text(value);
                Some(text.eq_ignore_ascii_case(if *expected { "true" } else { "false" }))
            }
            Self::Number { comparison, operand } => {
                as_finite_number(value).map(|n| comparison.apply(n, *operand))
            }
            Self::DateOn(day) => timestamp_of(value).map(|ts| ts.date() == *day),
            Self::DateRange { start, end } => {
                timestamp_of(value).map(|ts| *start <= ts && ts <= *end)
            }
        }
    }
}

fn parse_boolean(condition: &str) -> Option<bool> {
    if condition.eq_ignore_ascii_case("true") {
        Some(true)
    } else if condition.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_numeric(condition: &str) -> Option<TypedCondition> {
    let captures = NUMERIC_CONDITION.as_ref()?.captures(condition)?;
    let symbol = captures.get(1).map_or("", |m| m.as_str());
    let operand = captures.get(2)?.as_str().parse::<f64>().ok()?;
    Some(TypedCondition::Number {
        comparison: Comparison::from_symbol(symbol)?,
        operand,
    })
}

fn parse_date(condition: &str) -> Option<TypedCondition> {
    if condition.matches(' ').count() == 1 {
        let (start, end) = condition.split_once(' ')?;
        return Some(TypedCondition::DateRange {
            start: parse_timestamp(start)?,
            end: parse_timestamp(end)?,
        });
    }
    parse_timestamp(condition).map(|ts| TypedCondition::DateOn(ts.date()))
}

fn timestamp_of(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::String(s) => parse_timestamp(s),
        _ => None,
    }
}

/// Whether a condition asks for absent or null values.
#[must_use]
pub fn is_null_condition(condition: &str) -> bool {
    let condition = condition.trim();
    condition.eq_ignore_ascii_case("null") || condition.eq_ignore_ascii_case("undefined")
}

/// Case-insensitive containment of `condition` in the value's string form.
#[must_use]
pub fn substring_match(value: &Value, condition: &str) -> bool {
    value_text(value)
        .to_lowercase()
        .contains(&condition.to_lowercase())
}

/// A condition prepared once for repeated evaluation.
#[derive(Debug, Clone)]
pub struct CompiledCondition {
    raw: String,
    wants_null: bool,
    typed: Option<TypedCondition>,
}

impl CompiledCondition {
    #[must_use]
    pub fn new(field_type: FieldType, condition: &str) -> Self {
        Self {
            raw: condition.to_string(),
            wants_null: is_null_condition(condition),
            typed: TypedCondition::parse(field_type, condition),
        }
    }

    /// The typed reading, if the condition fit the field type's grammar.
    #[must_use]
    pub const fn typed(&self) -> Option<&TypedCondition> {
        self.typed.as_ref()
    }

    /// Test one value; `None` means the field is absent.
    #[must_use]
    pub fn matches(&self, value: Option<&Value>) -> bool {
        let value = match value {
            None | Some(Value::Null) => return self.wants_null,
            Some(value) => value,
        };

        self.typed
            .as_ref()
            .and_then(|typed| typed.matches(value))
            .unwrap_or_else(|| substring_match(value, &self.raw))
    }
}

/// Test a single value against a condition for the given field type.
#[must_use]
pub fn test(field_type: FieldType, value: Option<&Value>, condition: &str) -> bool {
    CompiledCondition::new(field_type, condition).matches(value)
}

/// A condition that does not fit the grammar of its field type.
///
/// This is advisory: evaluation still proceeds with substring matching.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("condition {condition:?} does not fit a {field_type} field (expected {expected}); using text search")]
pub struct ConditionMismatch {
    pub field_type: FieldType,
    pub condition: String,
    pub expected: &'static str,
}

/// Check whether `condition` fits the grammar of `field_type`.
///
/// # Errors
///
/// Returns [`ConditionMismatch`] describing the expected grammar when the
/// condition will be evaluated by the text-search fallback instead.
pub fn validate(field_type: FieldType, condition: &str) -> Result<(), ConditionMismatch> {
    if is_null_condition(condition) {
        return Ok(());
    }

    let expected = match field_type {
        FieldType::String => return Ok(()),
        FieldType::Null => "null or undefined",
        FieldType::Boolean => "true or false",
        FieldType::Number => "a number, optionally prefixed by >, <, >=, <= or =",
        FieldType::Date => "a date or a \"<start> <end>\" date range",
    };

    if TypedCondition::parse(field_type, condition).is_some() {
        Ok(())
    } else {
        Err(ConditionMismatch {
            field_type,
            condition: condition.to_string(),
            expected,
        })
    }
}
