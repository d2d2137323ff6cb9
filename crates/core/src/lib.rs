//! SQLGuard is a static verifier and deterministic repair engine for SQL
//! queries produced by language models.
//!
//! # Overview
//!
//! This crate checks candidate queries against a schema catalog before they
//! are executed, repairs the defects that can be fixed mechanically, and
//! reports whatever remains as typed, severity-tagged issues.
//!
//! # Key Features
//!
//! - Schema validation of tables, columns and alias discipline
//! - Bounded fixed-point repair (alias fixes, GROUP BY completion, LIMIT)
//! - Question-aware coverage audits
//! - Deterministic candidate selection
//!
//! # Quick Start
//!
//! ```rust
//! use sqlguard_core::prelude::*;
//!
//! let catalog = SchemaCatalog::from_ddl(r#"
//!     CREATE TABLE orders (id INT, amount NUMERIC, city TEXT);
//!     CREATE TABLE users (id INT, name TEXT);
//! "#).expect("Schema definition failed");
//!
//! // Repair a query that ignores its own alias
//! let outcome = repair("SELECT orders.amount FROM orders o", 50);
//! assert_eq!(outcome.sql, "SELECT o.amount FROM orders o LIMIT 50");
//!
//! // Validate the result
//! assert!(validate_schema(&outcome.sql, &catalog).is_empty());
//! ```

pub mod analyzer;
pub mod prelude;
