//! Glob matching for key scans.

use crate::error::{KvError, KvResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyOne,
    AnyRun,
    Class { negated: bool, items: Vec<ClassItem> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassItem {
    Single(char),
    Range(char, char),
}

impl Token {
    fn matches(&self, c: char) -> bool {
        match self {
            Token::Literal(l) => *l == c,
            Token::AnyOne => true,
            Token::AnyRun => false,
            Token::Class { negated, items } => {
                let hit = items.iter().any(|item| match item {
                    ClassItem::Single(s) => *s == c,
                    ClassItem::Range(lo, hi) => (*lo..=*hi).contains(&c),
                });
                hit != *negated
            }
        }
    }
}

fn parse(pattern: &str) -> KvResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                // Runs of stars collapse into one
                if tokens.last() != Some(&Token::AnyRun) {
                    tokens.push(Token::AnyRun);
                }
            }
            '?' => tokens.push(Token::AnyOne),
            '\\' => tokens.push(Token::Literal(chars.next().unwrap_or('\\'))),
            '[' => {
                let negated = chars.next_if_eq(&'^').is_some();
                let mut items = Vec::new();
                let mut closed = false;

                while let Some(c) = chars.next() {
                    let c = match c {
                        ']' => {
                            closed = true;
                            break;
                        }
                        '\\' => chars.next().unwrap_or('\\'),
                        other => other,
                    };
                    let is_range = chars.peek() == Some(&'-')
                        && chars.clone().nth(1).is_some_and(|next| next != ']');
                    if is_range {
                        chars.next();
                        let hi = chars.next().unwrap_or(c);
                        let (lo, hi) = if c <= hi { (c, hi) } else { (hi, c) };
                        items.push(ClassItem::Range(lo, hi));
                    } else {
                        items.push(ClassItem::Single(c));
                    }
                }

                if !closed {
                    return Err(KvError::invalid_pattern(pattern, "unclosed character class"));
                }
                if items.is_empty() {
                    return Err(KvError::invalid_pattern(pattern, "empty character class"));
                }
                tokens.push(Token::Class { negated, items });
            }
            other => tokens.push(Token::Literal(other)),
        }
    }

    Ok(tokens)
}

/// Matches `text` against a glob `pattern`.
///
/// # Errors
///
/// Returns an error if the pattern contains an unclosed or empty
/// character class.
///
/// # Example
///
/// ```rust
/// use tblcache_kv::glob_match;
///
/// assert!(glob_match("tblRedis:{users}:row:*", "tblRedis:{users}:row:42").unwrap());
/// assert!(!glob_match("tblRedis:{users}:row:*", "tblRedis:{users}:index:a:b").unwrap());
/// ```
pub fn glob_match(pattern: &str, text: &str) -> KvResult<bool> {
    let tokens = parse(pattern)?;
    let text: Vec<char> = text.chars().collect();

    let (mut ti, mut pi) = (0usize, 0usize);
    // Position of the last `*` and the text index it is currently absorbing up to
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < text.len() {
        if let Some(token) = tokens.get(pi) {
            if *token == Token::AnyRun {
                backtrack = Some((pi, ti));
                pi += 1;
                continue;
            }
            if token.matches(text[ti]) {
                pi += 1;
                ti += 1;
                continue;
            }
        }
        match backtrack {
            Some((star_pi, star_ti)) => {
                pi = star_pi + 1;
                ti = star_ti + 1;
                backtrack = Some((star_pi, star_ti + 1));
            }
            None => return Ok(false),
        }
    }

    while tokens.get(pi) == Some(&Token::AnyRun) {
        pi += 1;
    }
    Ok(pi == tokens.len())
}

/// Escapes glob metacharacters so `text` matches only itself.
///
/// # Example
///
/// ```rust
/// use tblcache_kv::{escape_glob, glob_match};
///
/// let table = "odd*name";
/// let pattern = format!("{}:*", escape_glob(table));
/// assert!(glob_match(&pattern, "odd*name:1").unwrap());
/// assert!(!glob_match(&pattern, "oddXname:1").unwrap());
/// ```
pub fn escape_glob(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
