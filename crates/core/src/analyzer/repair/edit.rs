//! Token-level text edits.
//!
//! Rules rewrite the original text rather than re-rendering the AST, so the
//! caller's formatting survives a repair. Tokens are produced without
//! unescaping so that rendering them back yields the input verbatim.

use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, Whitespace};

/// A dotted identifier chain such as `o.amount`, `public.orders.id` or `o.*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Chain {
    /// Token indices of the words in the chain
    pub words: Vec<usize>,
    /// Ends in `.*`
    pub star: bool,
    /// One past the last token of the chain
    pub end: usize,
}

impl Chain {
    /// Number of leading words that qualify the final name.
    pub fn qualifier_len(&self) -> usize {
        if self.star {
            self.words.len()
        } else {
            self.words.len() - 1
        }
    }
}

#[derive(Debug)]
pub(crate) struct Edit {
    start: usize,
    end: usize,
    tokens: Vec<Token>,
}

impl Edit {
    /// Replaces the qualifier words of `chain` with a single identifier.
    pub fn qualifier(chain: &Chain, qualifier: &str) -> Self {
        let last = chain.words[chain.qualifier_len() - 1];
        Self {
            start: chain.words[0],
            end: last + 1,
            tokens: vec![Token::make_word(qualifier, None)],
        }
    }

    /// Prefixes a single token with `qualifier.`.
    pub fn prefix(index: usize, qualifier: &str, original: &Token) -> Self {
        Self {
            start: index,
            end: index + 1,
            tokens: vec![
                Token::make_word(qualifier, None),
                Token::Period,
                original.clone(),
            ],
        }
    }

    /// Replaces the token at `index`.
    pub fn replace(index: usize, token: Token) -> Self {
        Self {
            start: index,
            end: index + 1,
            tokens: vec![token],
        }
    }
}

fn is_blank(token: &Token) -> bool {
    matches!(
        token,
        Token::Whitespace(Whitespace::Space | Whitespace::Newline | Whitespace::Tab)
    )
}

fn is_trivia(token: &Token) -> bool {
    matches!(token, Token::Whitespace(_) | Token::SemiColon)
}

#[derive(Debug, Clone)]
pub(crate) struct TokenBuffer {
    tokens: Vec<Token>,
}

impl TokenBuffer {
    pub fn new(sql: &str) -> Option<Self> {
        let dialect = PostgreSqlDialect {};
        let tokens = Tokenizer::new(&dialect, sql)
            .with_unescape(false)
            .tokenize()
            .ok()?
            .into_iter()
            .filter(|token| *token != Token::EOF)
            .collect();
        Some(Self { tokens })
    }

    pub fn token(&self, index: usize) -> &Token {
        &self.tokens[index]
    }

    fn render_range(&self, start: usize, end: usize) -> String {
        self.tokens[start..end].iter().map(ToString::to_string).collect()
    }

    pub fn render(&self) -> String {
        self.render_range(0, self.tokens.len())
    }

    /// Text before `pos`, without the blanks immediately preceding it.
    pub fn render_prefix(&self, pos: usize) -> String {
        let mut end = pos;
        while end > 0 && is_blank(&self.tokens[end - 1]) {
            end -= 1;
        }
        self.render_range(0, end)
    }

    pub fn render_from(&self, pos: usize) -> String {
        self.render_range(pos, self.tokens.len())
    }

    /// Whole text without trailing whitespace, comments and semicolons.
    pub fn render_trimmed(&self) -> String {
        let mut end = self.tokens.len();
        while end > 0 && is_trivia(&self.tokens[end - 1]) {
            end -= 1;
        }
        self.render_range(0, end)
    }

    /// Text up to the first top-level semicolon.
    pub fn render_first_statement(&self) -> String {
        let end = self
            .tokens
            .iter()
            .position(|token| *token == Token::SemiColon)
            .unwrap_or(self.tokens.len());
        self.render_range(0, end)
    }

    /// Lowercase value of a word token.
    pub fn word(&self, index: usize) -> Option<String> {
        match &self.tokens[index] {
            Token::Word(word) => Some(word.value.to_lowercase()),
            _ => None,
        }
    }

    /// Lowercase dotted name of the given word tokens.
    pub fn joined(&self, indices: &[usize]) -> String {
        indices
            .iter()
            .filter_map(|&i| self.word(i))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn next_significant(&self, from: usize) -> Option<&Token> {
        self.tokens[from.min(self.tokens.len())..]
            .iter()
            .find(|token| !matches!(token, Token::Whitespace(_)))
    }

    /// Index of the first non-whitespace token at or after `from`.
    pub fn next_significant_index(&self, from: usize) -> Option<usize> {
        (from..self.tokens.len()).find(|&i| !matches!(self.tokens[i], Token::Whitespace(_)))
    }

    fn prev_significant(&self, before: usize) -> Option<&Token> {
        self.tokens[..before]
            .iter()
            .rev()
            .find(|token| !matches!(token, Token::Whitespace(_)))
    }

    /// Whether the token at or after `from` opens a call, e.g. `schema.fn(`.
    pub fn opens_call(&self, from: usize) -> bool {
        matches!(self.next_significant(from), Some(Token::LParen))
    }

    /// Whether the word at `index` is used as a type name or alias rather than a value.
    pub fn is_declaration_site(&self, index: usize) -> bool {
        let after_as = matches!(
            self.prev_significant(index),
            Some(Token::Word(word)) if word.keyword == Keyword::AS
        );
        let typed_string = matches!(
            self.next_significant(index + 1),
            Some(Token::SingleQuotedString(_))
        );
        after_as || typed_string
    }

    /// All identifier chains, in text order.
    pub fn chains(&self) -> Vec<Chain> {
        let mut chains = Vec::new();
        let mut i = 0;
        while i < self.tokens.len() {
            let starts_chain = matches!(self.tokens[i], Token::Word(_))
                && (i == 0 || self.tokens[i - 1] != Token::Period);
            if !starts_chain {
                i += 1;
                continue;
            }
            let mut chain = Chain {
                words: vec![i],
                star: false,
                end: i + 1,
            };
            while chain.end + 1 < self.tokens.len() && self.tokens[chain.end] == Token::Period {
                match &self.tokens[chain.end + 1] {
                    Token::Word(_) => {
                        chain.words.push(chain.end + 1);
                        chain.end += 2;
                    }
                    Token::Mul => {
                        chain.star = true;
                        chain.end += 2;
                        break;
                    }
                    _ => break,
                }
            }
            i = chain.end;
            chains.push(chain);
        }
        chains
    }

    /// Token ranges enclosed by `USING ( ... )`.
    pub fn using_ranges(&self) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();
        for (i, token) in self.tokens.iter().enumerate() {
            let Token::Word(word) = token else { continue };
            if word.keyword != Keyword::USING {
                continue;
            }
            let Some(open) = (i + 1..self.tokens.len()).find(|&j| !matches!(self.tokens[j], Token::Whitespace(_)))
            else {
                continue;
            };
            if self.tokens[open] != Token::LParen {
                continue;
            }
            let mut depth = 0usize;
            for j in open..self.tokens.len() {
                match self.tokens[j] {
                    Token::LParen => depth += 1,
                    Token::RParen => {
                        depth -= 1;
                        if depth == 0 {
                            ranges.push((open, j));
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
        ranges
    }

    /// Index of `keyword` outside any parentheses.
    pub fn top_level_keyword(&self, keyword: Keyword) -> Option<usize> {
        let mut depth = 0i32;
        for (i, token) in self.tokens.iter().enumerate() {
            match token {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                Token::Word(word) if depth == 0 && word.keyword == keyword => return Some(i),
                _ => {}
            }
        }
        None
    }

    /// Index of the first top-level clause that must follow GROUP BY.
    pub fn clause_after_group_by(&self) -> Option<usize> {
        let mut depth = 0i32;
        for (i, token) in self.tokens.iter().enumerate() {
            match token {
                Token::LParen => depth += 1,
                Token::RParen => depth -= 1,
                Token::Word(word) if depth == 0 => match word.keyword {
                    Keyword::HAVING
                    | Keyword::WINDOW
                    | Keyword::LIMIT
                    | Keyword::OFFSET
                    | Keyword::FETCH
                    | Keyword::FOR => return Some(i),
                    Keyword::ORDER => {
                        if matches!(
                            self.next_significant(i + 1),
                            Some(Token::Word(next)) if next.keyword == Keyword::BY
                        ) {
                            return Some(i);
                        }
                    }
                    _ => {}
                },
                _ => {}
            }
        }
        None
    }

    /// Applies non-overlapping edits and renders the result. `None` when
    /// there is nothing to apply.
    pub fn apply(mut self, mut edits: Vec<Edit>) -> Option<String> {
        if edits.is_empty() {
            return None;
        }
        edits.sort_by(|a, b| b.start.cmp(&a.start));
        for edit in edits {
            self.tokens.splice(edit.start..edit.end, edit.tokens);
        }
        Some(self.render())
    }
}
