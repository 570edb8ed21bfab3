//! Scalar (number and date) filter conditions.
//!
//! A [`FilterModel`] is either one [`FilterCondition`] or several combined
//! with AND / OR. Evaluation is pure: the same value and model always give
//! the same answer.
//!
//! # Blank values
//!
//! `Null`, `NaN` and the empty string are blank. `blank` passes them and
//! `notBlank` rejects them. Every other kind rejects blank values unless the
//! matching `includeBlanksIn*` flag of [`ScalarFilterParams`] is set.
//!
//! # JSON
//!
//! ```json
//! { "filterType": "number", "type": "inRange", "filter": 10, "filterTo": 20 }
//! { "filterType": "date", "operator": "OR", "conditions": [
//!     { "type": "lessThan", "dateFrom": "2020-01-01" },
//!     { "type": "blank" } ] }
//! ```
//!
//! The legacy two-condition form (`condition1` / `condition2`) is accepted
//! on input.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::value::RowValue;
use crate::error::{GridError, Result};

/// Which comparator a filter uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterType {
    /// Integers and floats, compared as `f64`.
    #[default]
    Number,
    /// Dates and date-times, including ISO-8601 strings.
    Date,
}

/// Comparison performed by one condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionKind {
    Equals,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    InRange,
    Blank,
    NotBlank,
}

impl ConditionKind {
    /// Number of operands the kind needs.
    pub fn operand_count(self) -> usize {
        match self {
            ConditionKind::Blank | ConditionKind::NotBlank => 0,
            ConditionKind::InRange => 2,
            _ => 1,
        }
    }
}

/// How the conditions of a combined model are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinOperator {
    #[default]
    And,
    Or,
}

/// Orders a cell value relative to a filter operand.
///
/// Called as `comparator(filter, cell)`; `Less` means the cell sorts before
/// the operand. `None` means the two cannot be compared, which no condition
/// matches.
pub type Comparator = Arc<dyn Fn(&RowValue, &RowValue) -> Option<Ordering> + Send + Sync>;

/// Options shared by the conditions of a column filter.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScalarFilterParams {
    /// `inRange` includes both bounds.
    pub in_range_inclusive: bool,
    /// Blank cells pass `equals`.
    pub include_blanks_in_equals: bool,
    /// Blank cells pass `notEqual`.
    pub include_blanks_in_not_equal: bool,
    /// Blank cells pass `lessThan` and `lessThanOrEqual`.
    pub include_blanks_in_less_than: bool,
    /// Blank cells pass `greaterThan` and `greaterThanOrEqual`.
    pub include_blanks_in_greater_than: bool,
    /// Blank cells pass `inRange`.
    pub include_blanks_in_range: bool,
    /// Replaces the comparator implied by the filter type.
    #[serde(skip)]
    pub comparator: Option<Comparator>,
}

impl ScalarFilterParams {
    /// Sets a custom comparator.
    pub fn with_comparator<F>(mut self, comparator: F) -> Self
    where
        F: Fn(&RowValue, &RowValue) -> Option<Ordering> + Send + Sync + 'static,
    {
        self.comparator = Some(Arc::new(comparator));
        self
    }

    fn blank_passes(&self, kind: ConditionKind) -> bool {
        match kind {
            ConditionKind::Blank => true,
            ConditionKind::NotBlank => false,
            ConditionKind::Equals => self.include_blanks_in_equals,
            ConditionKind::NotEqual => self.include_blanks_in_not_equal,
            ConditionKind::LessThan | ConditionKind::LessThanOrEqual => self.include_blanks_in_less_than,
            ConditionKind::GreaterThan | ConditionKind::GreaterThanOrEqual => {
                self.include_blanks_in_greater_than
            }
            ConditionKind::InRange => self.include_blanks_in_range,
        }
    }

    fn compare(&self, filter_type: FilterType, filter: &RowValue, cell: &RowValue) -> Option<Ordering> {
        match &self.comparator {
            Some(comparator) => comparator(filter, cell),
            None => default_compare(filter_type, filter, cell),
        }
    }
}

impl PartialEq for ScalarFilterParams {
    fn eq(&self, other: &Self) -> bool {
        self.in_range_inclusive == other.in_range_inclusive
            && self.include_blanks_in_equals == other.include_blanks_in_equals
            && self.include_blanks_in_not_equal == other.include_blanks_in_not_equal
            && self.include_blanks_in_less_than == other.include_blanks_in_less_than
            && self.include_blanks_in_greater_than == other.include_blanks_in_greater_than
            && self.include_blanks_in_range == other.include_blanks_in_range
            && match (&self.comparator, &other.comparator) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl fmt::Debug for ScalarFilterParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarFilterParams")
            .field("in_range_inclusive", &self.in_range_inclusive)
            .field("include_blanks_in_equals", &self.include_blanks_in_equals)
            .field("include_blanks_in_not_equal", &self.include_blanks_in_not_equal)
            .field("include_blanks_in_less_than", &self.include_blanks_in_less_than)
            .field("include_blanks_in_greater_than", &self.include_blanks_in_greater_than)
            .field("include_blanks_in_range", &self.include_blanks_in_range)
            .field("comparator", &self.comparator.is_some())
            .finish()
    }
}

fn default_compare(filter_type: FilterType, filter: &RowValue, cell: &RowValue) -> Option<Ordering> {
    match filter_type {
        FilterType::Number => cell.as_f64()?.partial_cmp(&filter.as_f64()?),
        FilterType::Date => {
            let operand = filter.as_date_time()?;
            let value = cell.as_date_time()?;
            if is_date_only(filter) {
                Some(value.date().cmp(&operand.date()))
            } else {
                Some(value.cmp(&operand))
            }
        }
    }
}

/// A date operand without a time part matches the whole day.
fn is_date_only(value: &RowValue) -> bool {
    match value {
        RowValue::Date(_) => true,
        RowValue::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").is_ok(),
        _ => false,
    }
}

/// One comparison against a cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCondition {
    /// Comparator to use.
    #[serde(default)]
    pub filter_type: FilterType,
    /// Comparison kind.
    #[serde(rename = "type")]
    pub kind: ConditionKind,
    /// First operand.
    #[serde(default, alias = "dateFrom", skip_serializing_if = "Option::is_none")]
    pub filter: Option<RowValue>,
    /// Upper bound for `inRange`.
    #[serde(default, alias = "dateTo", skip_serializing_if = "Option::is_none")]
    pub filter_to: Option<RowValue>,
}

impl FilterCondition {
    /// Creates a condition with no operands.
    pub fn new(filter_type: FilterType, kind: ConditionKind) -> Self {
        Self {
            filter_type,
            kind,
            filter: None,
            filter_to: None,
        }
    }

    /// A number condition with one operand.
    pub fn number(kind: ConditionKind, filter: impl Into<RowValue>) -> Self {
        Self::new(FilterType::Number, kind).with_filter(filter)
    }

    /// A date condition with one operand.
    pub fn date(kind: ConditionKind, filter: impl Into<RowValue>) -> Self {
        Self::new(FilterType::Date, kind).with_filter(filter)
    }

    /// An `inRange` condition.
    pub fn in_range(filter_type: FilterType, from: impl Into<RowValue>, to: impl Into<RowValue>) -> Self {
        Self::new(filter_type, ConditionKind::InRange)
            .with_filter(from)
            .with_filter_to(to)
    }

    /// Sets the first operand.
    pub fn with_filter(mut self, filter: impl Into<RowValue>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Sets the upper bound.
    pub fn with_filter_to(mut self, filter_to: impl Into<RowValue>) -> Self {
        self.filter_to = Some(filter_to.into());
        self
    }

    /// `true` when every operand the kind needs is present.
    ///
    /// Incomplete conditions are inactive: they pass every value.
    pub fn is_complete(&self) -> bool {
        let present = |operand: &Option<RowValue>| operand.as_ref().is_some_and(|v| !v.is_null());
        match self.kind.operand_count() {
            0 => true,
            1 => present(&self.filter),
            _ => present(&self.filter) && present(&self.filter_to),
        }
    }

    /// Evaluates the condition against a cell value.
    pub fn passes(&self, value: &RowValue, params: &ScalarFilterParams) -> bool {
        if !self.is_complete() {
            return true;
        }
        if value.is_blank() {
            return params.blank_passes(self.kind);
        }

        let compare = |operand: &Option<RowValue>| {
            operand
                .as_ref()
                .and_then(|operand| params.compare(self.filter_type, operand, value))
        };

        match self.kind {
            ConditionKind::Blank => false,
            ConditionKind::NotBlank => true,
            ConditionKind::Equals => compare(&self.filter) == Some(Ordering::Equal),
            ConditionKind::NotEqual => compare(&self.filter).is_some_and(Ordering::is_ne),
            ConditionKind::LessThan => compare(&self.filter) == Some(Ordering::Less),
            ConditionKind::LessThanOrEqual => compare(&self.filter).is_some_and(Ordering::is_le),
            ConditionKind::GreaterThan => compare(&self.filter) == Some(Ordering::Greater),
            ConditionKind::GreaterThanOrEqual => compare(&self.filter).is_some_and(Ordering::is_ge),
            ConditionKind::InRange => {
                let (Some(from), Some(to)) = (compare(&self.filter), compare(&self.filter_to)) else {
                    return false;
                };
                if params.in_range_inclusive {
                    from.is_ge() && to.is_le()
                } else {
                    from.is_gt() && to.is_lt()
                }
            }
        }
    }
}

/// Conditions joined with AND / OR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawCombinedModel")]
pub struct CombinedFilterModel {
    /// Comparator used by every condition.
    pub filter_type: FilterType,
    /// Join operator.
    pub operator: JoinOperator,
    /// The joined conditions.
    pub conditions: Vec<FilterCondition>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCombinedModel {
    #[serde(default)]
    filter_type: FilterType,
    operator: JoinOperator,
    #[serde(default)]
    conditions: Vec<FilterCondition>,
    condition1: Option<FilterCondition>,
    condition2: Option<FilterCondition>,
}

impl From<RawCombinedModel> for CombinedFilterModel {
    fn from(raw: RawCombinedModel) -> Self {
        let filter_type = raw.filter_type;
        let conditions = raw
            .conditions
            .into_iter()
            .chain(raw.condition1)
            .chain(raw.condition2)
            .map(|mut condition| {
                condition.filter_type = filter_type;
                condition
            })
            .collect();
        Self {
            filter_type,
            operator: raw.operator,
            conditions,
        }
    }
}

impl CombinedFilterModel {
    /// Joins conditions; each takes the model's filter type.
    pub fn new(filter_type: FilterType, operator: JoinOperator, conditions: Vec<FilterCondition>) -> Self {
        RawCombinedModel {
            filter_type,
            operator,
            conditions,
            condition1: None,
            condition2: None,
        }
        .into()
    }

    /// Evaluates the active conditions; passes when none is active.
    pub fn passes(&self, value: &RowValue, params: &ScalarFilterParams) -> bool {
        let mut active = self.conditions.iter().filter(|c| c.is_complete()).peekable();
        if active.peek().is_none() {
            return true;
        }
        match self.operator {
            JoinOperator::And => active.all(|c| c.passes(value, params)),
            JoinOperator::Or => active.any(|c| c.passes(value, params)),
        }
    }
}

/// A column filter: one condition or a combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterModel {
    /// Several conditions joined by an operator.
    Combined(CombinedFilterModel),
    /// A single condition.
    Condition(FilterCondition),
}

impl FilterModel {
    /// Parses a model from a JSON value.
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        Self::deserialize(value).map_err(GridError::InvalidFilterModel)
    }

    /// Parses a model from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(GridError::InvalidFilterModel)
    }

    /// Serializes the model to a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// The comparator family of the model.
    pub fn filter_type(&self) -> FilterType {
        match self {
            FilterModel::Combined(model) => model.filter_type,
            FilterModel::Condition(condition) => condition.filter_type,
        }
    }

    /// `true` if at least one condition has all its operands.
    pub fn is_active(&self) -> bool {
        match self {
            FilterModel::Combined(model) => model.conditions.iter().any(FilterCondition::is_complete),
            FilterModel::Condition(condition) => condition.is_complete(),
        }
    }

    /// Evaluates the model against a cell value.
    pub fn passes(&self, value: &RowValue, params: &ScalarFilterParams) -> bool {
        match self {
            FilterModel::Combined(model) => model.passes(value, params),
            FilterModel::Condition(condition) => condition.passes(value, params),
        }
    }
}

impl From<FilterCondition> for FilterModel {
    fn from(condition: FilterCondition) -> Self {
        FilterModel::Condition(condition)
    }
}

impl From<CombinedFilterModel> for FilterModel {
    fn from(model: CombinedFilterModel) -> Self {
        FilterModel::Combined(model)
    }
}

/// Evaluates `model` against `value` with default params.
pub fn does_filter_pass(value: &RowValue, model: &FilterModel) -> bool {
    model.passes(value, &ScalarFilterParams::default())
}
