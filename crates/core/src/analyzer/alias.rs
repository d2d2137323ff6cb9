//! Alias resolution over a [`ParsedQuery`].

use std::collections::{BTreeMap, BTreeSet};

use super::context::schema::bare_name;
use super::query::ParsedQuery;

/// What a column qualifier refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualifierTarget {
    /// An alias of the given table
    Alias(String),
    /// A referenced table that carries no alias
    Base(String),
    /// A referenced table that is aliased, so its name must not be used
    AliasedBase { table: String, alias: String },
    /// A CTE, derived table or table function
    Scope,
    Unknown,
}

/// Read model of the aliases and tables a query references.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    base_to_alias: BTreeMap<String, String>,
    alias_to_table: BTreeMap<String, String>,
    referenced: Vec<String>,
    bases: Vec<String>,
    scopes: BTreeSet<String>,
}

impl AliasMap {
    pub fn resolve(query: &ParsedQuery) -> Self {
        let mut map = Self::default();
        for table in query.tables() {
            let bare = table.bare().to_string();
            if let Some(alias) = &table.alias {
                map.base_to_alias.entry(bare.clone()).or_insert_with(|| alias.clone());
                map.alias_to_table
                    .entry(alias.clone())
                    .or_insert_with(|| table.name.clone());
            }
            if !map.bases.contains(&bare) {
                map.bases.push(bare);
            }
            if !map.referenced.contains(&table.name) {
                map.referenced.push(table.name.clone());
            }
        }
        map.scopes = query.scopes().map(str::to_string).collect();
        map
    }

    /// Bare base table name to its first alias.
    pub fn base_to_alias(&self) -> &BTreeMap<String, String> {
        &self.base_to_alias
    }

    pub fn alias_set(&self) -> impl Iterator<Item = &str> {
        self.alias_to_table.keys().map(String::as_str)
    }

    /// Bare names of referenced tables in first-reference order.
    pub fn referenced_bases(&self) -> &[String] {
        &self.bases
    }

    /// Full (possibly schema-qualified) names of referenced tables.
    pub fn referenced_tables(&self) -> &[String] {
        &self.referenced
    }

    pub fn is_alias(&self, name: &str) -> bool {
        self.alias_to_table.contains_key(&name.to_lowercase())
    }

    pub fn alias_for(&self, base: &str) -> Option<&str> {
        self.base_to_alias.get(&base.to_lowercase()).map(String::as_str)
    }

    pub fn table_for_alias(&self, alias: &str) -> Option<&str> {
        self.alias_to_table.get(&alias.to_lowercase()).map(String::as_str)
    }

    pub fn is_base(&self, name: &str) -> bool {
        self.referenced_table(name).is_some()
    }

    pub fn is_scope(&self, name: &str) -> bool {
        self.scopes.contains(&name.to_lowercase())
    }

    fn referenced_table(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        let bare = bare_name(&name);
        self.referenced
            .iter()
            .find(|table| **table == name || bare_name(table) == bare)
            .map(String::as_str)
    }

    /// Classifies a column qualifier. Aliases win over scopes, scopes over tables.
    pub fn classify(&self, qualifier: &str) -> QualifierTarget {
        let qualifier = qualifier.to_lowercase();
        if let Some(table) = self.alias_to_table.get(&qualifier) {
            return QualifierTarget::Alias(table.clone());
        }
        if self.scopes.contains(&qualifier) {
            return QualifierTarget::Scope;
        }
        match self.referenced_table(&qualifier) {
            Some(table) => match self.base_to_alias.get(bare_name(table)) {
                Some(alias) => QualifierTarget::AliasedBase {
                    table: table.to_string(),
                    alias: alias.clone(),
                },
                None => QualifierTarget::Base(table.to_string()),
            },
            None => QualifierTarget::Unknown,
        }
    }

    /// The qualifier used for the first referenced table: its alias, else its bare name.
    pub fn first_qualifier(&self) -> Option<&str> {
        let first = self.bases.first()?;
        Some(self.alias_for(first).unwrap_or(first))
    }
}
