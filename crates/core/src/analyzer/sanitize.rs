//! Cleanup of raw model output before verification.

use std::sync::OnceLock;

use regex::Regex;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;

use super::error::{AnalyzerError, AnalyzerResult};
use super::repair::edit::{Edit, TokenBuffer};

fn fence_open_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?im)^\s*```(?:json|sql)?\s*").expect("fence open regex should compile")
    })
}

fn fence_close_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"\s*```\s*$").expect("fence close regex should compile"))
}

fn trailing_quote_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r#"["`']+\s*$"#).expect("trailing quote regex should compile"))
}

fn select_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"(?is)\bselect\b").expect("select regex should compile"))
}

fn query_head_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?is)^\s*(select|with)\b").expect("query head regex should compile")
    })
}

fn mysql_limit_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?is)\blimit\s+(\d+)\s*,\s*(\d+)\b").expect("mysql limit regex should compile")
    })
}

/// Pulls the SQL text out of a model response.
///
/// Handles code fences, `{"sql": "..."}` envelopes, wrapping quotes and
/// trailing debris. Text before the first SELECT is dropped unless the
/// statement starts with WITH.
pub fn extract_sql(response: &str) -> AnalyzerResult<String> {
    let mut text = response.trim().to_string();
    text = fence_open_regex().replace_all(&text, "").into_owned();
    text = fence_close_regex().replace(&text, "").into_owned();

    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(&text) {
        if let Some(serde_json::Value::String(sql)) = map.get("sql") {
            text = sql.clone();
        }
    }

    let mut text = text.trim().to_string();
    let wrapped = text.len() >= 2
        && ((text.starts_with('"') && text.ends_with('"'))
            || (text.starts_with('\'') && text.ends_with('\'')));
    if wrapped {
        text = text[1..text.len() - 1].trim().to_string();
    }

    while text.ends_with('}') && text.matches('{').count() < text.matches('}').count() {
        text.pop();
        text.truncate(text.trim_end().len());
    }

    let mut text = trailing_quote_regex()
        .replace(&text, "")
        .replace("```", "")
        .trim()
        .to_string();

    if !query_head_regex().is_match(&text) {
        if let Some(found) = select_regex().find(&text) {
            text = text[found.start()..].trim().to_string();
        }
    }

    if !query_head_regex().is_match(&text) {
        return Err(AnalyzerError::NoSelect);
    }
    Ok(text)
}

/// Rewrites MySQL `LIMIT offset, count` to `LIMIT count OFFSET offset`.
pub fn fix_mysql_limit(sql: &str) -> String {
    mysql_limit_regex()
        .replace_all(sql, "LIMIT ${2} OFFSET ${1}")
        .into_owned()
}

/// Caps the outer `LIMIT n` (or `FETCH FIRST n`) at `max`, or appends
/// `LIMIT max` when the outer query has neither. Limits inside subqueries
/// do not count.
pub fn cap_limit(sql: &str, max: u32) -> String {
    let max = max.max(1);
    let Some(buffer) = TokenBuffer::new(sql) else {
        return sql.to_string();
    };
    let count = match (
        buffer.top_level_keyword(Keyword::LIMIT),
        buffer.top_level_keyword(Keyword::FETCH),
    ) {
        (Some(limit), _) => buffer.next_significant_index(limit + 1),
        (None, Some(fetch)) => buffer
            .next_significant_index(fetch + 1)
            .and_then(|first| buffer.next_significant_index(first + 1)),
        (None, None) => return format!("{} LIMIT {}", buffer.render_trimmed(), max),
    };
    let Some(count) = count else {
        return sql.to_string();
    };
    let within = match buffer.token(count) {
        Token::Number(n, _) => n.parse::<u64>().is_ok_and(|n| n <= u64::from(max)),
        Token::Word(word) => word.keyword != Keyword::ALL,
        _ => true,
    };
    if within {
        return sql.to_string();
    }
    buffer
        .apply(vec![Edit::replace(count, Token::Number(max.to_string(), false))])
        .unwrap_or_else(|| sql.to_string())
}

/// Normalizes a candidate into a single capped SELECT statement.
pub fn sanitize(sql: &str, max: u32) -> AnalyzerResult<String> {
    let sql = sql.trim().trim_matches('`');
    let sql = fix_mysql_limit(sql);
    let first = TokenBuffer::new(&sql)
        .map(|buffer| buffer.render_first_statement())
        .unwrap_or_else(|| sql.split(';').next().unwrap_or_default().to_string());
    let first = first.trim();
    if !query_head_regex().is_match(first) {
        let keyword = first.split_whitespace().next().unwrap_or_default().to_uppercase();
        return Err(AnalyzerError::NotAQuery(keyword));
    }
    Ok(cap_limit(first, max))
}
