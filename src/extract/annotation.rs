//! Restricted evaluation of `#[route(...)]` argument lists.
//!
//! The argument text is parsed into a small expression tree and only
//! literal/constant sub-expressions are resolved: string, integer, float and
//! boolean literals, arrays of those, and bare identifiers looked up in an
//! explicitly registered auxiliary symbol table. Nothing is ever executed, so
//! annotation arguments cannot reach surrounding code. An unknown symbol or a
//! malformed expression is a resolution error that aborts the caller's scan.

use super::types::RouteAnnotation;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// Auxiliary symbols available to annotation arguments, registered once
/// before scanning (typically from the `symbols` section of the config file).
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: BTreeMap<String, Value>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a symbol; an existing name is overwritten.
    pub fn register(&mut self, name: &str, value: Value) {
        self.symbols.insert(name.to_string(), value);
    }

    pub fn resolve(&self, name: &str) -> Option<&Value> {
        self.symbols.get(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Str(String),
    Int(i64),
    Float(f64),
    Ident(String),
    Comma,
    Eq,
    LBracket,
    RBracket,
}

fn tokenize(raw: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = raw.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '[' => {
                chars.next();
                tokens.push(Token::LBracket);
            }
            ']' => {
                chars.next();
                tokens.push(Token::RBracket);
            }
            '"' => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some('n') => s.push('\n'),
                            Some('t') => s.push('\t'),
                            Some(other) => s.push(other),
                            None => bail!("unterminated string literal"),
                        },
                        Some(other) => s.push(other),
                        None => bail!("unterminated string literal"),
                    }
                }
                tokens.push(Token::Str(s));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut num = String::new();
                num.push(c);
                chars.next();
                let mut is_float = false;
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        num.push(d);
                        chars.next();
                    } else if d == '.' && !is_float {
                        is_float = true;
                        num.push(d);
                        chars.next();
                    } else if d == '_' {
                        chars.next();
                    } else {
                        break;
                    }
                }
                if is_float {
                    tokens.push(Token::Float(
                        num.parse().with_context(|| format!("bad float literal `{num}`"))?,
                    ));
                } else {
                    tokens.push(Token::Int(
                        num.parse().with_context(|| format!("bad integer literal `{num}`"))?,
                    ));
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => bail!("unexpected character `{other}` in route annotation"),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    symbols: &'a SymbolTable,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expr(&mut self) -> Result<Value> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Value::String(s)),
            Some(Token::Int(i)) => Ok(Value::from(i)),
            Some(Token::Float(f)) => Ok(Value::from(f)),
            Some(Token::Ident(id)) => match id.as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                name => self
                    .symbols
                    .resolve(name)
                    .cloned()
                    .with_context(|| format!("unknown symbol `{name}` in route annotation")),
            },
            Some(Token::LBracket) => {
                let mut items = Vec::new();
                loop {
                    if matches!(self.peek(), Some(Token::RBracket)) {
                        self.next();
                        break;
                    }
                    items.push(self.expr()?);
                    match self.next() {
                        Some(Token::Comma) => continue,
                        Some(Token::RBracket) => break,
                        _ => bail!("expected `,` or `]` in array"),
                    }
                }
                Ok(Value::Array(items))
            }
            other => bail!("unexpected token {other:?} in route annotation"),
        }
    }
}

fn expect_str(value: Value, key: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        other => bail!("`{key}` must be a string literal, got {other}"),
    }
}

fn expect_bool(value: Value, key: &str) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(b),
        other => bail!("`{key}` must be a boolean literal, got {other}"),
    }
}

fn referer_list(value: Value) -> Result<Vec<String>> {
    match value {
        Value::String(s) => Ok(vec![s]),
        Value::Array(items) => items
            .into_iter()
            .map(|v| expect_str(v, "referer"))
            .collect(),
        other => bail!("`referer` must be a string or array of strings, got {other}"),
    }
}

/// Resolve the raw argument text of one annotation into [`RouteAnnotation`].
///
/// Positional values fill `module` then `name`; everything else must be
/// named. The declared call shape is
/// `route(module?, name?, permission=true, ajax=true, referer=null, ..extra)`.
pub fn parse_annotation_args(raw: &str, symbols: &SymbolTable) -> Result<RouteAnnotation> {
    let tokens = tokenize(raw)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        symbols,
    };

    let mut annotation = RouteAnnotation::new();
    let mut positional = 0usize;
    let mut named_seen = false;
    let mut seen_keys: Vec<String> = Vec::new();

    loop {
        if parser.peek().is_none() {
            break;
        }
        // `ident =` starts a named argument; anything else is positional.
        let key = match (parser.peek().cloned(), parser.tokens.get(parser.pos + 1)) {
            (Some(Token::Ident(id)), Some(Token::Eq)) => {
                parser.next();
                parser.next();
                Some(id)
            }
            _ => None,
        };
        let value = parser.expr()?;

        match key {
            Some(key) => {
                named_seen = true;
                if seen_keys.contains(&key) {
                    bail!("duplicate argument `{key}` in route annotation");
                }
                seen_keys.push(key.clone());
                match key.as_str() {
                    "module" => annotation.module = Some(expect_str(value, "module")?),
                    "name" => annotation.name = Some(expect_str(value, "name")?),
                    "permission" => annotation.permission = expect_bool(value, "permission")?,
                    "ajax" => annotation.ajax = expect_bool(value, "ajax")?,
                    "referer" => annotation.referer = Some(referer_list(value)?),
                    _ => {
                        annotation.extra.insert(key, value);
                    }
                }
            }
            None => {
                if named_seen {
                    bail!("positional route arguments must precede named ones");
                }
                match positional {
                    0 => annotation.module = Some(expect_str(value, "module")?),
                    1 => annotation.name = Some(expect_str(value, "name")?),
                    _ => bail!("too many positional arguments in route annotation"),
                }
                positional += 1;
            }
        }

        match parser.next() {
            Some(Token::Comma) | None => continue,
            Some(other) => bail!("expected `,` between route arguments, got {other:?}"),
        }
    }

    Ok(annotation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_positional_and_named_arguments() {
        let ann = parse_annotation_args(
            r#""Accounts", "Edit user", permission = false, ajax = false"#,
            &SymbolTable::new(),
        )
        .unwrap();
        assert_eq!(ann.module.as_deref(), Some("Accounts"));
        assert_eq!(ann.name.as_deref(), Some("Edit user"));
        assert!(!ann.permission);
        assert!(!ann.ajax);
    }

    #[test]
    fn defaults_hold_for_empty_argument_list() {
        let ann = parse_annotation_args("", &SymbolTable::new()).unwrap();
        assert!(ann.permission);
        assert!(ann.ajax);
        assert!(ann.module.is_none());
        assert!(ann.referer.is_none());
    }

    #[test]
    fn referer_accepts_string_and_array() {
        let one = parse_annotation_args(r#"referer = "portal""#, &SymbolTable::new()).unwrap();
        assert_eq!(one.referer, Some(vec!["portal".to_string()]));
        let many =
            parse_annotation_args(r#"referer = ["portal", "admin"]"#, &SymbolTable::new()).unwrap();
        assert_eq!(
            many.referer,
            Some(vec!["portal".to_string(), "admin".to_string()])
        );
    }

    #[test]
    fn registered_symbols_resolve() {
        let mut symbols = SymbolTable::new();
        symbols.register("ACCOUNTS", json!("Accounts"));
        let ann = parse_annotation_args("module = ACCOUNTS", &symbols).unwrap();
        assert_eq!(ann.module.as_deref(), Some("Accounts"));
    }

    #[test]
    fn unknown_symbol_is_a_resolution_error() {
        let err = parse_annotation_args("module = MISSING", &SymbolTable::new()).unwrap_err();
        assert!(err.to_string().contains("unknown symbol"));
    }

    #[test]
    fn unknown_keys_collect_into_extra() {
        let ann = parse_annotation_args(
            r#"module = "M", audit = true, weight = 3"#,
            &SymbolTable::new(),
        )
        .unwrap();
        assert_eq!(ann.extra.get("audit"), Some(&json!(true)));
        assert_eq!(ann.extra.get("weight"), Some(&json!(3)));
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let err =
            parse_annotation_args(r#"module = "a", module = "b""#, &SymbolTable::new()).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }
}
