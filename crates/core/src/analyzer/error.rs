use thiserror::Error;

/// Result type for analyzer operations
pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

/// Errors that can occur while parsing a query or loading a schema catalog.
///
/// These are hard failures. Problems found *inside* a well-formed query are
/// reported as [`Issue`](crate::analyzer::issues::Issue) values instead.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Wraps parser and tokenizer failures
    #[error("SQL parse error: {0}")]
    Parse(String),

    /// The input held no statement at all
    #[error("No statement found in input")]
    EmptyStatement,

    /// The input held more than one statement
    #[error("Expected a single statement, found {0}")]
    MultipleStatements(usize),

    /// The statement parsed but is not a query
    #[error("Statement is not a query: {0}")]
    NotAQuery(String),

    /// The query has no SELECT body (e.g. a bare VALUES list)
    #[error("Query has no SELECT body")]
    NoSelect,

    /// A JSON schema snapshot could not be decoded
    #[error("Invalid schema snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// Schema definitions were structurally invalid
    #[error("Invalid schema: {message}")]
    InvalidSchema {
        message: String,
        table: Option<String>,
    },
}

impl From<sqlparser::parser::ParserError> for AnalyzerError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<sqlparser::tokenizer::TokenizerError> for AnalyzerError {
    fn from(err: sqlparser::tokenizer::TokenizerError) -> Self {
        Self::Parse(err.to_string())
    }
}

impl AnalyzerError {
    pub fn invalid_schema(message: impl Into<String>, table: Option<&str>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
            table: table.map(str::to_string),
        }
    }

    /// Multi-line message with a suggestion, for terminal output.
    pub fn report(&self) -> String {
        match self {
            Self::Parse(message) => {
                format!(
                    "SQL could not be parsed: {}\n\
                         Suggestion: Check for unbalanced parentheses, missing commas or dialect specific syntax.",
                    message
                )
            }
            Self::EmptyStatement => "No SQL statement was provided\n\
                     Suggestion: Make sure the model output contains a SELECT statement."
                .to_string(),
            Self::MultipleStatements(count) => {
                format!(
                    "Found {} statements where exactly one was expected\n\
                         Suggestion: Submit one SELECT statement at a time.",
                    count
                )
            }
            Self::NotAQuery(kind) => {
                format!(
                    "Statement '{}' is not a read-only query\n\
                         Suggestion: Only SELECT queries can be verified.",
                    kind
                )
            }
            Self::NoSelect => "Query has no SELECT body\n\
                     Suggestion: Rewrite the query as a SELECT statement."
                .to_string(),
            Self::Snapshot(err) => {
                format!(
                    "Schema snapshot could not be decoded: {}\n\
                         Suggestion: Snapshots must look like {{\"tables\": [{{\"name\": \"...\", \"columns\": [...]}}]}}.",
                    err
                )
            }
            Self::InvalidSchema { message, table } => {
                format!(
                    "Invalid schema in table '{}': {}\n\
                         Suggestion: Fix the table definition or regenerate the snapshot.",
                    table.as_deref().unwrap_or("unknown"),
                    message
                )
            }
        }
    }

    /// Checks if this error came from loading a schema
    pub fn is_schema_error(&self) -> bool {
        matches!(self, Self::Snapshot(_) | Self::InvalidSchema { .. })
    }
}
