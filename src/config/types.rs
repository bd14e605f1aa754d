//! Raw schema descriptor types matching the JSON config (entities + link tables).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One data column of an entity table. The `id` column is implicit and never listed here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    /// VARCHAR bound. Unbounded TEXT when absent.
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default = "default_true")]
    pub nullable: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    pub id: String,
    pub table: String,
    pub path_segment: String,
    pub columns: Vec<ColumnConfig>,
    #[serde(default)]
    pub validation: HashMap<String, ValidationRule>,
}

/// Many-to-many link table between exactly two entities. Column names are derived as `<table>_id`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LinkConfig {
    pub id: String,
    pub table: String,
    /// Entity ids; order fixes the column order of the link table.
    pub entities: [String; 2],
    #[serde(default)]
    pub on_delete: Option<String>,
    #[serde(default)]
    pub on_update: Option<String>,
}

/// All descriptor types in one struct for in-memory loading.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FullConfig {
    pub entities: Vec<EntityConfig>,
    #[serde(default)]
    pub links: Vec<LinkConfig>,
}
