//! Parsed query facts.
//!
//! [`ParsedQuery`] wraps a single `sqlparser` statement and precomputes the
//! facts every other component reads: table and column references, the outer
//! projection, aggregate call sites, GROUP BY, ORDER BY, LIMIT and JOINs.
//! Scoping is flat. References from subqueries are collected alongside the
//! outer query's.

use std::ops::ControlFlow;

use sqlparser::ast::{
    Expr, GroupByExpr, JoinConstraint, JoinOperator, Query, Select, SelectItem, SetExpr,
    Statement, TableFactor, Value, Visit, Visitor,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;

use super::context::schema::{bare_name, normalize_name};
use super::error::{AnalyzerError, AnalyzerResult};

/// Functions that collapse rows into one value.
pub const AGGREGATE_FUNCTIONS: [&str; 7] =
    ["sum", "count", "avg", "min", "max", "array_agg", "string_agg"];

/// A table named in FROM or JOIN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Lowercase dotted name, e.g. `public.orders`
    pub name: String,
    /// Lowercase alias, if one was given
    pub alias: Option<String>,
}

impl TableRef {
    /// Name without its schema prefix.
    pub fn bare(&self) -> &str {
        bare_name(&self.name)
    }
}

/// A column reference, e.g. `o.amount` or `amount`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    /// Lowercase dotted qualifier
    pub qualifier: Option<String>,
    pub name: String,
}

impl ColumnRef {
    pub fn display(&self) -> String {
        match &self.qualifier {
            Some(qualifier) => format!("{}.{}", qualifier, self.name),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinPredicate {
    On,
    Using,
    Natural,
    /// An inner or outer join with no predicate at all
    Missing,
    /// Cross joins, applies and other joins that take no predicate
    NotRequired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRef {
    pub table: String,
    pub predicate: JoinPredicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    Wildcard,
    QualifiedWildcard,
    Aggregate,
    Literal,
    Expr,
}

/// One item of the outer SELECT list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    /// The expression rendered back to SQL
    pub expr: String,
    pub alias: Option<String>,
    pub kind: ProjectionKind,
}

impl Projection {
    /// Whether this item must appear in GROUP BY when aggregates are present.
    pub fn is_grouping_candidate(&self) -> bool {
        self.kind == ProjectionKind::Expr
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    tables: Vec<TableRef>,
    outer_tables: usize,
    columns: Vec<ColumnRef>,
    joins: Vec<JoinRef>,
    ctes: Vec<String>,
    opaque_scopes: Vec<String>,
    select_aliases: Vec<String>,
    wildcard_qualifiers: Vec<String>,
    string_literals: Vec<String>,
    functions: Vec<String>,
    projection: Vec<Projection>,
    aggregates: Vec<String>,
    group_by: Option<Vec<String>>,
    order_by: bool,
    limit: Option<u32>,
    has_limit: bool,
    simple_select: bool,
}

impl ParsedQuery {
    /// Parses exactly one query statement (PostgreSQL dialect).
    pub fn parse(sql: &str) -> AnalyzerResult<Self> {
        let mut statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)?;
        match statements.len() {
            0 => return Err(AnalyzerError::EmptyStatement),
            1 => {}
            n => return Err(AnalyzerError::MultipleStatements(n)),
        }
        let statement = statements.remove(0);
        let Statement::Query(query) = &statement else {
            return Err(AnalyzerError::NotAQuery(statement_keyword(&statement)));
        };
        let select = leftmost_select(&query.body).ok_or(AnalyzerError::NoSelect)?;

        let mut collector = Collector::default();
        let _ = statement.visit(&mut collector);

        let mut tables = Vec::new();
        for table in from_tables(select) {
            push_unique(&mut tables, table);
        }
        let outer_tables = tables.len();
        for table in collector.tables {
            push_unique(&mut tables, table);
        }

        let projection: Vec<Projection> = select.projection.iter().map(classify_item).collect();
        let aggregates = select
            .projection
            .iter()
            .filter_map(item_expr)
            .flat_map(aggregate_calls)
            .collect();
        let group_by = match &select.group_by {
            GroupByExpr::All(_) => Some(vec!["ALL".to_string()]),
            GroupByExpr::Expressions(exprs, _) if exprs.is_empty() => None,
            GroupByExpr::Expressions(exprs, _) => {
                Some(exprs.iter().map(ToString::to_string).collect())
            }
        };
        let limit = match (&query.limit, &query.fetch) {
            (Some(expr), _) => row_count(expr),
            (None, Some(fetch)) if !fetch.percent => {
                fetch.quantity.as_ref().map_or(Some(1), row_count)
            }
            _ => None,
        };

        Ok(Self {
            tables,
            outer_tables,
            columns: collector.columns,
            joins: collector.joins,
            ctes: collector.ctes,
            opaque_scopes: collector.opaque_scopes,
            select_aliases: collector.select_aliases,
            wildcard_qualifiers: collector.wildcard_qualifiers,
            string_literals: collector.string_literals,
            functions: collector.functions,
            projection,
            aggregates,
            group_by,
            order_by: query.order_by.is_some(),
            limit,
            has_limit: query.limit.is_some() || query.fetch.is_some(),
            simple_select: matches!(&*query.body, SetExpr::Select(_)),
        })
    }

    /// Table references, outer FROM clause first, then subqueries.
    pub fn tables(&self) -> &[TableRef] {
        &self.tables
    }

    /// Table references of the outer FROM clause only.
    pub fn outer_tables(&self) -> &[TableRef] {
        &self.tables[..self.outer_tables]
    }

    /// True when every table reference sits in the outer FROM clause.
    pub fn is_flat(&self) -> bool {
        self.outer_tables == self.tables.len() && !self.has_opaque_scope()
    }

    pub fn columns(&self) -> &[ColumnRef] {
        &self.columns
    }

    pub fn joins(&self) -> &[JoinRef] {
        &self.joins
    }

    /// Outer SELECT list.
    pub fn projection(&self) -> &[Projection] {
        &self.projection
    }

    /// Non-windowed aggregate calls in the outer SELECT list.
    pub fn aggregates(&self) -> &[String] {
        &self.aggregates
    }

    /// GROUP BY expressions, `None` when the clause is absent.
    pub fn group_by(&self) -> Option<&[String]> {
        self.group_by.as_deref()
    }

    pub fn order_by_present(&self) -> bool {
        self.order_by
    }

    /// Numeric LIMIT literal of the outer query.
    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    /// True when the outer query has LIMIT or FETCH, literal or not.
    pub fn has_limit(&self) -> bool {
        self.has_limit
    }

    pub fn ctes(&self) -> &[String] {
        &self.ctes
    }

    pub fn is_cte(&self, name: &str) -> bool {
        self.ctes.iter().any(|cte| cte == name)
    }

    /// Names whose columns cannot be checked: CTEs, derived tables, table functions.
    pub fn scopes(&self) -> impl Iterator<Item = &str> {
        self.ctes.iter().chain(self.opaque_scopes.iter()).map(String::as_str)
    }

    pub fn has_opaque_scope(&self) -> bool {
        !self.ctes.is_empty() || !self.opaque_scopes.is_empty()
    }

    pub fn select_aliases(&self) -> &[String] {
        &self.select_aliases
    }

    /// Every qualifier used on a column or a `q.*` projection.
    pub fn qualifiers(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        let from_columns = self.columns.iter().filter_map(|c| c.qualifier.as_deref());
        for qualifier in from_columns.chain(self.wildcard_qualifiers.iter().map(String::as_str)) {
            if !out.contains(&qualifier) {
                out.push(qualifier);
            }
        }
        out
    }

    /// String literal values, unescaped quotes left as written.
    pub fn string_literals(&self) -> &[String] {
        &self.string_literals
    }

    /// Lowercase names of every function called anywhere in the statement.
    pub fn functions(&self) -> &[String] {
        &self.functions
    }

    pub fn has_wildcard(&self) -> bool {
        self.projection.iter().any(|p| p.kind == ProjectionKind::Wildcard)
    }

    /// True when the body is a plain SELECT (no set operation).
    pub fn is_simple_select(&self) -> bool {
        self.simple_select
    }
}

/// Literal row count of a LIMIT or FETCH clause.
fn row_count(expr: &Expr) -> Option<u32> {
    match expr {
        Expr::Value(Value::Number(n, _)) => n.parse().ok(),
        _ => None,
    }
}

fn statement_keyword(statement: &Statement) -> String {
    statement
        .to_string()
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_uppercase()
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}

fn leftmost_select(body: &SetExpr) -> Option<&Select> {
    match body {
        SetExpr::Select(select) => Some(select),
        SetExpr::Query(query) => leftmost_select(&query.body),
        SetExpr::SetOperation { left, .. } => leftmost_select(left),
        _ => None,
    }
}

fn selects(body: &SetExpr) -> Vec<&Select> {
    match body {
        SetExpr::Select(select) => vec![select],
        SetExpr::SetOperation { left, right, .. } => {
            let mut out = selects(left);
            out.extend(selects(right));
            out
        }
        _ => Vec::new(),
    }
}

fn table_ref(factor: &TableFactor) -> Option<TableRef> {
    match factor {
        TableFactor::Table {
            name, alias, args, ..
        } if args.is_none() => Some(TableRef {
            name: normalize_name(name),
            alias: alias.as_ref().map(|a| a.name.value.to_lowercase()),
        }),
        _ => None,
    }
}

fn from_tables(select: &Select) -> Vec<TableRef> {
    select
        .from
        .iter()
        .flat_map(|twj| std::iter::once(&twj.relation).chain(twj.joins.iter().map(|j| &j.relation)))
        .filter_map(table_ref)
        .collect()
}

fn item_expr(item: &SelectItem) -> Option<&Expr> {
    match item {
        SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => Some(expr),
        _ => None,
    }
}

fn is_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Value(_) | Expr::TypedString { .. } | Expr::Interval(_) => true,
        Expr::Nested(inner) | Expr::UnaryOp { expr: inner, .. } => is_literal(inner),
        _ => false,
    }
}

fn is_aggregate_call(expr: &Expr) -> bool {
    match expr {
        Expr::Function(func) if func.over.is_none() => {
            let name = func.name.to_string().to_lowercase();
            AGGREGATE_FUNCTIONS.contains(&bare_name(&name))
        }
        _ => false,
    }
}

/// Finds aggregate calls belonging to the current query level.
#[derive(Default)]
struct AggregateFinder {
    depth: usize,
    calls: Vec<String>,
}

impl Visitor for AggregateFinder {
    type Break = ();

    fn pre_visit_query(&mut self, _query: &Query) -> ControlFlow<()> {
        self.depth += 1;
        ControlFlow::Continue(())
    }

    fn post_visit_query(&mut self, _query: &Query) -> ControlFlow<()> {
        self.depth -= 1;
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<()> {
        if self.depth == 0 && is_aggregate_call(expr) {
            self.calls.push(expr.to_string());
        }
        ControlFlow::Continue(())
    }
}

fn aggregate_calls(expr: &Expr) -> Vec<String> {
    let mut finder = AggregateFinder::default();
    let _ = expr.visit(&mut finder);
    finder.calls
}

fn classify_item(item: &SelectItem) -> Projection {
    match item {
        SelectItem::Wildcard(_) => Projection {
            expr: "*".to_string(),
            alias: None,
            kind: ProjectionKind::Wildcard,
        },
        SelectItem::QualifiedWildcard(..) => Projection {
            expr: item.to_string(),
            alias: None,
            kind: ProjectionKind::QualifiedWildcard,
        },
        SelectItem::UnnamedExpr(expr) => Projection {
            expr: expr.to_string(),
            alias: None,
            kind: classify_expr(expr),
        },
        SelectItem::ExprWithAlias { expr, alias } => Projection {
            expr: expr.to_string(),
            alias: Some(alias.value.to_lowercase()),
            kind: classify_expr(expr),
        },
    }
}

fn classify_expr(expr: &Expr) -> ProjectionKind {
    if is_literal(expr) {
        ProjectionKind::Literal
    } else if !aggregate_calls(expr).is_empty() {
        ProjectionKind::Aggregate
    } else {
        ProjectionKind::Expr
    }
}

fn join_predicate(operator: &JoinOperator) -> JoinPredicate {
    match operator {
        JoinOperator::Inner(constraint)
        | JoinOperator::LeftOuter(constraint)
        | JoinOperator::RightOuter(constraint)
        | JoinOperator::FullOuter(constraint) => match constraint {
            JoinConstraint::On(_) => JoinPredicate::On,
            JoinConstraint::Using(_) => JoinPredicate::Using,
            JoinConstraint::Natural => JoinPredicate::Natural,
            JoinConstraint::None => JoinPredicate::Missing,
        },
        _ => JoinPredicate::NotRequired,
    }
}

/// Walks the whole statement once and records every reference.
#[derive(Default)]
struct Collector {
    tables: Vec<TableRef>,
    columns: Vec<ColumnRef>,
    joins: Vec<JoinRef>,
    ctes: Vec<String>,
    opaque_scopes: Vec<String>,
    select_aliases: Vec<String>,
    wildcard_qualifiers: Vec<String>,
    string_literals: Vec<String>,
    functions: Vec<String>,
}

impl Visitor for Collector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<()> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                push_unique(&mut self.ctes, cte.alias.name.value.to_lowercase());
            }
        }
        for select in selects(&query.body) {
            for item in &select.projection {
                match item {
                    SelectItem::ExprWithAlias { alias, .. } => {
                        push_unique(&mut self.select_aliases, alias.value.to_lowercase());
                    }
                    SelectItem::QualifiedWildcard(..) => {
                        let rendered = item.to_string();
                        let qualifier = rendered.trim_end_matches('*').trim_end_matches('.');
                        push_unique(
                            &mut self.wildcard_qualifiers,
                            qualifier.replace('"', "").to_lowercase(),
                        );
                    }
                    _ => {}
                }
            }
            for twj in &select.from {
                for join in &twj.joins {
                    let table = match table_ref(&join.relation) {
                        Some(table) => table.name,
                        None => join.relation.to_string(),
                    };
                    self.joins.push(JoinRef {
                        table,
                        predicate: join_predicate(&join.join_operator),
                    });
                }
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<()> {
        if let Some(table) = table_ref(factor) {
            push_unique(&mut self.tables, table);
            return ControlFlow::Continue(());
        }
        match factor {
            TableFactor::Table {
                alias: Some(alias), ..
            }
            | TableFactor::Derived {
                alias: Some(alias), ..
            }
            | TableFactor::TableFunction {
                alias: Some(alias), ..
            }
            | TableFactor::Function {
                alias: Some(alias), ..
            }
            | TableFactor::UNNEST {
                alias: Some(alias), ..
            }
            | TableFactor::NestedJoin {
                alias: Some(alias), ..
            } => {
                push_unique(&mut self.opaque_scopes, alias.name.value.to_lowercase());
            }
            TableFactor::Table { name, .. } => {
                push_unique(&mut self.opaque_scopes, normalize_name(name));
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<()> {
        match expr {
            Expr::Identifier(ident) => {
                push_unique(
                    &mut self.columns,
                    ColumnRef {
                        qualifier: None,
                        name: ident.value.to_lowercase(),
                    },
                );
            }
            Expr::CompoundIdentifier(parts) if parts.len() >= 2 => {
                let Some((name, qualifier)) = parts.split_last() else {
                    return ControlFlow::Continue(());
                };
                let qualifier = qualifier
                    .iter()
                    .map(|ident| ident.value.to_lowercase())
                    .collect::<Vec<_>>()
                    .join(".");
                push_unique(
                    &mut self.columns,
                    ColumnRef {
                        qualifier: Some(qualifier),
                        name: name.value.to_lowercase(),
                    },
                );
            }
            Expr::Value(
                Value::SingleQuotedString(s)
                | Value::EscapedStringLiteral(s)
                | Value::NationalStringLiteral(s),
            ) => {
                self.string_literals.push(s.clone());
            }
            Expr::Function(func) => {
                let name = func.name.to_string().to_lowercase();
                push_unique(&mut self.functions, bare_name(&name).to_string());
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }
}
