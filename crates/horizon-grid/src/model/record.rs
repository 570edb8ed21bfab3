//! Row records and the accessors the engine reads them through.
//!
//! The engine is generic over the row type `R`. It never inspects rows
//! directly; it asks a [`RowAccessors`] for a row's id, its declared parent
//! id, and its cell values. Accessors can be built from closures, from a
//! type implementing [`RowData`], or, for the keyed [`Record`] type, from
//! field names.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::value::RowValue;

/// A keyed row: field name to cell value.
///
/// Serialized transparently as a JSON object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: BTreeMap<String, RowValue>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<RowValue>) -> Self {
        self.set(field, value);
        self
    }

    /// Sets a field, returning the previous value.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<RowValue>) -> Option<RowValue> {
        self.fields.insert(field.into(), value.into())
    }

    /// Returns a field's value if present.
    pub fn get(&self, field: &str) -> Option<&RowValue> {
        self.fields.get(field)
    }

    /// Returns a field's value, or `Null` when absent.
    pub fn value(&self, field: &str) -> RowValue {
        self.fields.get(field).cloned().unwrap_or_default()
    }

    /// Removes a field.
    pub fn remove(&mut self, field: &str) -> Option<RowValue> {
        self.fields.remove(field)
    }

    /// Returns `true` if the field is present (even if null).
    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Iterates fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<RowValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Trait for row types that know their own identity and hierarchy.
///
/// Implement this for application row structs and build accessors with
/// [`RowAccessors::from_row_data`].
pub trait RowData {
    /// Stable, unique id of the row.
    fn row_id(&self) -> String;

    /// Declared parent id, or `None` for a root row.
    fn parent_id(&self) -> Option<String> {
        None
    }

    /// Value of a column, used by filters.
    fn value(&self, _column: &str) -> RowValue {
        RowValue::Null
    }
}

/// Function returning a row's id.
pub type RowIdFn<R> = Arc<dyn Fn(&R) -> String + Send + Sync>;

/// Function returning a row's declared parent id.
pub type ParentIdFn<R> = Arc<dyn Fn(&R) -> Option<String> + Send + Sync>;

/// Function telling whether a row carries a parent declaration at all.
pub type ParentPresenceFn<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;

/// Function returning a row's value for a column.
pub type ValueGetterFn<R> = Arc<dyn Fn(&R, &str) -> RowValue + Send + Sync>;

/// The functions the engine uses to read rows.
///
/// Without a parent accessor every row is a root row. Without a value
/// getter every cell reads as `Null`.
pub struct RowAccessors<R> {
    row_id: RowIdFn<R>,
    parent_id: Option<ParentIdFn<R>>,
    parent_presence: Option<ParentPresenceFn<R>>,
    value: Option<ValueGetterFn<R>>,
}

impl<R> Clone for RowAccessors<R> {
    fn clone(&self) -> Self {
        Self {
            row_id: self.row_id.clone(),
            parent_id: self.parent_id.clone(),
            parent_presence: self.parent_presence.clone(),
            value: self.value.clone(),
        }
    }
}

impl<R> fmt::Debug for RowAccessors<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowAccessors")
            .field("parent_id", &self.parent_id.is_some())
            .field("parent_presence", &self.parent_presence.is_some())
            .field("value", &self.value.is_some())
            .finish()
    }
}

impl<R> RowAccessors<R> {
    /// Creates accessors from a row id function.
    pub fn new<F>(row_id: F) -> Self
    where
        F: Fn(&R) -> String + Send + Sync + 'static,
    {
        Self {
            row_id: Arc::new(row_id),
            parent_id: None,
            parent_presence: None,
            value: None,
        }
    }

    /// Sets the parent id function.
    pub fn with_parent_id<F>(mut self, parent_id: F) -> Self
    where
        F: Fn(&R) -> Option<String> + Send + Sync + 'static,
    {
        self.parent_id = Some(Arc::new(parent_id));
        self
    }

    /// Sets the function telling whether a row declares a parent.
    ///
    /// An update whose row does not declare a parent keeps the node's
    /// current parent. Without this function every row declares one.
    pub fn with_parent_presence<F>(mut self, presence: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        self.parent_presence = Some(Arc::new(presence));
        self
    }

    /// Drops the parent id function so every row becomes a root row.
    pub fn without_parent_id(mut self) -> Self {
        self.parent_id = None;
        self.parent_presence = None;
        self
    }

    /// Sets the column value function.
    pub fn with_value_getter<F>(mut self, value: F) -> Self
    where
        F: Fn(&R, &str) -> RowValue + Send + Sync + 'static,
    {
        self.value = Some(Arc::new(value));
        self
    }

    /// Returns the id of a row.
    pub fn row_id(&self, row: &R) -> String {
        (self.row_id)(row)
    }

    /// Returns the declared parent id of a row.
    pub fn parent_id(&self, row: &R) -> Option<String> {
        self.parent_id.as_ref().and_then(|f| f(row))
    }

    /// Returns `false` if the row leaves its parent unspecified.
    pub fn declares_parent(&self, row: &R) -> bool {
        self.parent_presence.as_ref().map_or(true, |f| f(row))
    }

    /// Returns `true` if a parent id function is configured.
    pub fn has_parent_accessor(&self) -> bool {
        self.parent_id.is_some()
    }

    /// Returns the value of a column for a row.
    pub fn value(&self, row: &R, column: &str) -> RowValue {
        self.value
            .as_ref()
            .map_or(RowValue::Null, |f| f(row, column))
    }
}

impl<R: RowData + 'static> RowAccessors<R> {
    /// Accessors delegating to the [`RowData`] implementation.
    pub fn from_row_data() -> Self {
        Self::new(|row: &R| row.row_id())
            .with_parent_id(|row: &R| row.parent_id())
            .with_value_getter(|row: &R, column: &str| row.value(column))
    }
}

impl RowAccessors<Record> {
    /// Accessors reading the id and parent id from named record fields.
    ///
    /// A blank or absent id field yields an empty id; a blank or absent
    /// parent field means the row is a root row. A record without the parent
    /// field does not declare a parent, so updating a row with it keeps
    /// the row where it is. Column values are read
    /// from the field with the column's name.
    pub fn for_records(id_field: &str, parent_field: Option<&str>) -> Self {
        let id_field = id_field.to_string();
        let accessors = Self::new(move |row: &Record| {
            row.get(&id_field)
                .and_then(RowValue::as_key)
                .unwrap_or_default()
        })
        .with_value_getter(|row: &Record, column: &str| row.value(column));

        match parent_field {
            Some(parent_field) => {
                let parent_field = parent_field.to_string();
                let presence_field = parent_field.clone();
                accessors
                    .with_parent_id(move |row: &Record| {
                        row.get(&parent_field).and_then(RowValue::as_key)
                    })
                    .with_parent_presence(move |row: &Record| row.contains(&presence_field))
            }
            None => accessors,
        }
    }
}
