//! Grid options.
//!
//! [`GridOptions`] collects everything a [`GridEngine`](crate::engine::GridEngine)
//! needs to know up front: the selection mode, whether rows form a tree, which
//! record fields carry ids, how missing parents are handled, and the default
//! parameters for column filters.
//!
//! Options use camelCase keys and can be read from JSON or TOML:
//!
//! ```toml
//! rowSelection = "single"
//! treeData = true
//! rowIdField = "path"
//! parentIdField = "dir"
//! missingParent = "filler"
//!
//! [filter]
//! inRangeInclusive = true
//! ```
//!
//! # Example
//!
//! ```ignore
//! use horizon_grid::prelude::*;
//!
//! let options = GridOptions::builder()
//!     .row_selection(RowSelectionMode::Single)
//!     .missing_parent(MissingParentPolicy::Filler)
//!     .build();
//! options.save("grid.toml")?;
//! assert_eq!(GridOptions::load("grid.toml")?, options);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};
use crate::model::{FilterStageOptions, MissingParentPolicy, RowSelectionMode, ScalarFilterParams};

/// Configuration of a grid engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridOptions {
    /// Single or multiple row selection.
    pub row_selection: RowSelectionMode,
    /// Rows are linked into a tree by their parent id.
    pub tree_data: bool,
    /// Record field holding the row id.
    pub row_id_field: String,
    /// Record field holding the parent id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id_field: Option<String>,
    /// Where rows whose parent is absent are placed.
    pub missing_parent: MissingParentPolicy,
    /// Descendants of a passing row must pass the filter themselves.
    pub exclude_children_when_tree_data_filtering: bool,
    /// Groups show a total row after their children.
    pub group_total_row: bool,
    /// Warnings are recorded and signalled but not logged.
    pub suppress_warnings: bool,
    /// Parameters shared by all column filters.
    pub filter: ScalarFilterParams,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            row_selection: RowSelectionMode::Multiple,
            tree_data: true,
            row_id_field: "id".to_string(),
            parent_id_field: Some("parentId".to_string()),
            missing_parent: MissingParentPolicy::Root,
            exclude_children_when_tree_data_filtering: false,
            group_total_row: false,
            suppress_warnings: false,
            filter: ScalarFilterParams::default(),
        }
    }
}

impl GridOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts building options from the defaults.
    pub fn builder() -> GridOptionsBuilder {
        GridOptionsBuilder::default()
    }

    /// Parent id field actually used: `None` unless tree data is on.
    pub fn effective_parent_id_field(&self) -> Option<&str> {
        if self.tree_data {
            self.parent_id_field.as_deref()
        } else {
            None
        }
    }

    /// Options for the filter stage.
    pub fn filter_stage(&self) -> FilterStageOptions {
        FilterStageOptions {
            tree_data: self.tree_data,
            exclude_children_when_tree_data_filtering: self.exclude_children_when_tree_data_filtering,
        }
    }

    // =========================================================================
    // Serialization
    // =========================================================================

    /// Parses options from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(GridError::ConfigJson)
    }

    /// Parses options from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(GridError::ConfigToml)
    }

    /// Serializes options as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(GridError::ConfigJson)
    }

    /// Serializes options as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(GridError::ConfigTomlWrite)
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// Loads options from a `.json` or `.toml` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        match Format::of(path.as_ref())? {
            Format::Json => Self::load_json(path),
            Format::Toml => Self::load_toml(path),
        }
    }

    /// Loads options from a JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let text = read_text(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Loads options from a TOML file.
    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self> {
        let text = read_text(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Saves options to a `.json` or `.toml` file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = match Format::of(path)? {
            Format::Json => self.to_json()?,
            Format::Toml => self.to_toml()?,
        };
        fs::write(path, text).map_err(|e| GridError::config_io(path, e))
    }
}

enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            _ => Err(GridError::ConfigFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| GridError::config_io(path, e))
}

/// Builder for [`GridOptions`].
#[derive(Debug, Clone, Default)]
pub struct GridOptionsBuilder {
    options: GridOptions,
}

impl GridOptionsBuilder {
    /// Sets the selection mode.
    pub fn row_selection(mut self, mode: RowSelectionMode) -> Self {
        self.options.row_selection = mode;
        self
    }

    /// Turns tree data on or off.
    pub fn tree_data(mut self, tree_data: bool) -> Self {
        self.options.tree_data = tree_data;
        self
    }

    /// Sets the record field holding the row id.
    pub fn row_id_field(mut self, field: impl Into<String>) -> Self {
        self.options.row_id_field = field.into();
        self
    }

    /// Sets the record field holding the parent id, or `None` for flat rows.
    pub fn parent_id_field(mut self, field: Option<impl Into<String>>) -> Self {
        self.options.parent_id_field = field.map(Into::into);
        self
    }

    /// Sets the missing parent policy.
    pub fn missing_parent(mut self, policy: MissingParentPolicy) -> Self {
        self.options.missing_parent = policy;
        self
    }

    pub fn exclude_children_when_tree_data_filtering(mut self, exclude: bool) -> Self {
        self.options.exclude_children_when_tree_data_filtering = exclude;
        self
    }

    pub fn group_total_row(mut self, enabled: bool) -> Self {
        self.options.group_total_row = enabled;
        self
    }

    pub fn suppress_warnings(mut self, suppress: bool) -> Self {
        self.options.suppress_warnings = suppress;
        self
    }

    /// Sets the parameters shared by all column filters.
    pub fn filter(mut self, params: ScalarFilterParams) -> Self {
        self.options.filter = params;
        self
    }

    /// Finishes building.
    pub fn build(self) -> GridOptions {
        self.options
    }
}
