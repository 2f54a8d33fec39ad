use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use thiserror::Error;

/// One `key=value` (or bare `flag`) argument of a statement.
///
/// Values are stored exactly as written, including surrounding quotes, so a
/// statement renders back to the same tokens it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Arg {
    pub key: String,
    pub value: Option<String>,
}

/// A parsed RouterOS command line: `verb [selector] key=value ...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    /// Command verb (`add`, `set`, `remove`, `:global`, ...).
    pub verb: String,
    /// Positional item selector such as `default`, `ether1` or `[ find default-name=ether1 ]`.
    pub selector: Option<String>,
    /// Arguments in source order.
    pub args: Vec<Arg>,
}

/// Errors raised when a statement cannot be split into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatementError {
    #[error("statement is empty")]
    Empty,
    #[error("unbalanced quote in statement")]
    UnbalancedQuote,
    #[error("unbalanced bracket in statement")]
    UnbalancedBracket,
}

impl Statement {
    /// Create a statement with no selector and no arguments.
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            selector: None,
            args: Vec::new(),
        }
    }

    /// Parse one logical statement line (without its section path).
    pub fn parse(text: &str) -> Result<Self, StatementError> {
        let tokens = split_tokens(text)?;
        let mut iter = tokens.into_iter();
        let verb = iter.next().ok_or(StatementError::Empty)?;
        let mut stmt = Statement::new(verb);

        let mut rest = iter.peekable();
        if let Some(first) = rest.peek() {
            if first.starts_with('[') || !first.contains('=') {
                stmt.selector = rest.next();
            }
        }

        for token in rest {
            match token.split_once('=') {
                Some((key, value)) => stmt.args.push(Arg {
                    key: key.to_string(),
                    value: Some(value.to_string()),
                }),
                None => stmt.args.push(Arg {
                    key: token,
                    value: None,
                }),
            }
        }
        Ok(stmt)
    }

    /// Raw value for `key`, quotes included.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|arg| arg.key == key)
            .and_then(|arg| arg.value.as_deref())
    }

    /// Value for `key` with surrounding quotes removed.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).map(unquote)
    }

    pub fn has(&self, key: &str) -> bool {
        self.args.iter().any(|arg| arg.key == key)
    }

    /// Replace the value of `key`, appending the argument when missing.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(arg) = self.args.iter_mut().find(|arg| arg.key == key) {
            arg.value = Some(value);
            return;
        }
        self.args.push(Arg {
            key: key.to_string(),
            value: Some(value),
        });
    }

    /// Append `key=value` only when `key` is absent. Returns whether it was added.
    pub fn ensure(&mut self, key: &str, value: impl Into<String>) -> bool {
        if self.has(key) {
            return false;
        }
        self.set(key, value);
        true
    }

    /// Remove `key`, returning its previous raw value.
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.args.iter().position(|arg| arg.key == key)?;
        self.args.remove(idx).value
    }

    /// Rename `from` to `to` in place. When `to` already exists the `from`
    /// argument is dropped instead, so a rename never produces duplicate keys.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        if from == to || !self.has(from) {
            return false;
        }
        if self.has(to) {
            self.remove(from);
            return true;
        }
        if let Some(arg) = self.args.iter_mut().find(|arg| arg.key == from) {
            arg.key = to.to_string();
        }
        true
    }

    /// Value of `key` inside a `[ find key=value ]` selector.
    pub fn selector_value(&self, key: &str) -> Option<&str> {
        let selector = self.selector.as_deref()?;
        let inner = selector.strip_prefix('[')?.strip_suffix(']')?;
        let needle = format!("{key}=");
        inner
            .split_whitespace()
            .find_map(|token| token.strip_prefix(needle.as_str()))
            .map(unquote)
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.verb)?;
        if let Some(selector) = &self.selector {
            write!(f, " {selector}")?;
        }
        for arg in &self.args {
            match &arg.value {
                Some(value) => write!(f, " {}={}", arg.key, value)?,
                None => write!(f, " {}", arg.key)?,
            }
        }
        Ok(())
    }
}

/// Strip one pair of surrounding double quotes.
pub fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Split a statement on whitespace, keeping quoted strings and bracketed
/// selectors together as single tokens.
pub fn split_tokens(text: &str) -> Result<Vec<String>, StatementError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut escaped = false;
    let mut depth = 0usize;

    for ch in text.chars() {
        if in_quote {
            current.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_quote = false;
            }
            continue;
        }
        match ch {
            '"' => {
                in_quote = true;
                current.push(ch);
            }
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                depth = depth.checked_sub(1).ok_or(StatementError::UnbalancedBracket)?;
                current.push(ch);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if in_quote {
        return Err(StatementError::UnbalancedQuote);
    }
    if depth != 0 {
        return Err(StatementError::UnbalancedBracket);
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}
