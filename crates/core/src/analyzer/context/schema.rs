//! Schema catalog: tables and their column sets.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use serde::Deserialize;
use sqlparser::ast::{ObjectName, Statement};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use crate::analyzer::error::{AnalyzerError, AnalyzerResult};

/// Maps case-normalized table names (optionally `schema.table`) to their columns.
///
/// A catalog is an immutable snapshot while a query is being verified; it is
/// replaced as a whole when the provider refreshes it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SchemaCatalog {
    tables: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    tables: Vec<SnapshotTable>,
}

#[derive(Debug, Deserialize)]
struct SnapshotTable {
    name: String,
    #[serde(default)]
    columns: Vec<SnapshotColumn>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnapshotColumn {
    Name(String),
    Detailed { name: String },
}

impl SnapshotColumn {
    fn into_name(self) -> String {
        match self {
            Self::Name(name) | Self::Detailed { name } => name,
        }
    }
}

/// Lowercases the dotted form of an object name, dropping quotes.
pub(crate) fn normalize_name(name: &ObjectName) -> String {
    name.0
        .iter()
        .map(|ident| ident.value.to_lowercase())
        .collect::<Vec<_>>()
        .join(".")
}

/// Last segment of a dotted name.
pub(crate) fn bare_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or extends) a table definition.
    pub fn insert_table<I, S>(&mut self, name: &str, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = self.tables.entry(name.trim().to_lowercase()).or_default();
        entry.extend(columns.into_iter().map(|c| c.as_ref().trim().to_lowercase()));
    }

    /// Builder form of [`SchemaCatalog::insert_table`].
    pub fn with_table<I, S>(mut self, name: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.insert_table(name, columns);
        self
    }

    /// Merges another catalog into this one. Columns of shared tables are unioned.
    pub fn merge(&mut self, other: SchemaCatalog) {
        for (table, columns) in other.tables {
            self.tables.entry(table).or_default().extend(columns);
        }
    }

    /// Builds a catalog from `CREATE TABLE` statements. Other statements are ignored.
    pub fn from_ddl(sql: &str) -> AnalyzerResult<Self> {
        let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)?;
        let mut catalog = Self::new();
        for statement in statements {
            if let Statement::CreateTable(create) = statement {
                let table = normalize_name(&create.name);
                if create.columns.is_empty() {
                    tracing::debug!(table = %table, "table defined without columns");
                }
                catalog.insert_table(&table, create.columns.iter().map(|c| c.name.value.as_str()));
            }
        }
        Ok(catalog)
    }

    /// Builds a catalog from a JSON snapshot of the form
    /// `{"tables": [{"name": "users", "columns": ["id", {"name": "email"}]}]}`.
    pub fn from_snapshot(json: &str) -> AnalyzerResult<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        let mut catalog = Self::new();
        for table in snapshot.tables {
            if table.name.trim().is_empty() {
                return Err(AnalyzerError::invalid_schema("table name is empty", None));
            }
            let columns: Vec<String> = table.columns.into_iter().map(SnapshotColumn::into_name).collect();
            if let Some(empty) = columns.iter().find(|c| c.trim().is_empty()) {
                return Err(AnalyzerError::invalid_schema(
                    format!("empty column name '{}'", empty),
                    Some(&table.name),
                ));
            }
            catalog.insert_table(&table.name, columns);
        }
        Ok(catalog)
    }

    /// Resolves a table reference by exact match, then bare-name match, then
    /// by suffix against qualified entries. Returns the catalog key.
    pub fn resolve_table(&self, name: &str) -> Option<&str> {
        let key = name.to_lowercase();
        if let Some((found, _)) = self.tables.get_key_value(&key) {
            return Some(found);
        }
        let bare = bare_name(&key);
        if bare != key {
            if let Some((found, _)) = self.tables.get_key_value(bare) {
                return Some(found);
            }
        }
        let suffix = format!(".{}", bare);
        self.tables
            .keys()
            .find(|table| table.ends_with(&suffix))
            .map(String::as_str)
    }

    pub fn contains_table(&self, name: &str) -> bool {
        self.resolve_table(name).is_some()
    }

    /// Columns of a table, resolved like [`SchemaCatalog::resolve_table`].
    pub fn columns(&self, table: &str) -> Option<&BTreeSet<String>> {
        self.resolve_table(table).and_then(|key| self.tables.get(key))
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.columns(table)
            .is_some_and(|columns| columns.contains(&column.to_lowercase()))
    }

    /// All table names in sorted order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Compact rendering used in regeneration prompts.
    pub fn describe(&self) -> String {
        let mut out = String::from("# Cached Schema Snapshot\n");
        for (table, columns) in &self.tables {
            let columns: Vec<&str> = columns.iter().map(String::as_str).collect();
            let _ = writeln!(out, "- {}: {}", table, columns.join(", "));
        }
        out
    }
}
