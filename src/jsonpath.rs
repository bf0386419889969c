//! Path queries over JSON documents
//!
//! A JSONPath dialect used by `extract` blocks and body assertions. A query
//! yields every matching value in document order; callers only ever consume
//! the first one.
//!
//! Supported syntax:
//!
//! - `$` root
//! - `.name`, `['name']`, `["name"]` child access
//! - `[2]`, `[-1]` array index (negative counts from the end)
//! - `.*`, `[*]` wildcard
//! - `..name`, `..*`, `..[0]` recursive descent
//! - `[1:3]`, `[:2]`, `[::2]` slices
//! - `[0,2]`, `['a','b']` unions
//! - `[?(@.field)]`, `[?(@.price < 10)]` filters with `== != < <= > >=`

use serde_json::Value;

use crate::common::{Error, Result};

/// A parsed path query
#[derive(Debug, Clone, PartialEq)]
pub struct PathQuery {
    source: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Child(Selector),
    Descendant(Selector),
}

#[derive(Debug, Clone, PartialEq)]
enum Selector {
    Name(String),
    Wildcard,
    Index(i64),
    Slice {
        start: Option<i64>,
        end: Option<i64>,
        step: usize,
    },
    Union(Vec<UnionItem>),
    Filter(Filter),
}

#[derive(Debug, Clone, PartialEq)]
enum UnionItem {
    Name(String),
    Index(i64),
}

#[derive(Debug, Clone, PartialEq)]
struct Filter {
    /// Field path relative to the candidate (`@.a.b` -> `["a", "b"]`)
    field: Vec<String>,
    comparison: Option<(CmpOp, Value)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl PathQuery {
    /// Parse a query expression
    pub fn parse(query: &str) -> Result<Self> {
        let segments = Parser::new(query).parse()?;
        Ok(Self {
            source: query.trim().to_string(),
            segments,
        })
    }

    /// The expression this query was parsed from
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// All matches in document order
    pub fn evaluate<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![root];
        for segment in &self.segments {
            let mut next = Vec::new();
            match segment {
                Segment::Child(selector) => {
                    for node in current {
                        select(selector, node, &mut next);
                    }
                }
                Segment::Descendant(selector) => {
                    for node in current {
                        let mut all = Vec::new();
                        descendants(node, &mut all);
                        for candidate in all {
                            select(selector, candidate, &mut next);
                        }
                    }
                }
            }
            current = next;
        }
        current
    }

    /// The first match, if any
    pub fn first<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.evaluate(root).into_iter().next()
    }
}

impl std::fmt::Display for PathQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

/// Equality used by assertions and filters: numbers compare by value, so
/// `1` equals `1.0`; everything else compares structurally.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if x == y {
                return true;
            }
            match (x.as_f64(), y.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        _ => a == b,
    }
}

/// Node followed by all of its descendants, pre-order
fn descendants<'a>(node: &'a Value, out: &mut Vec<&'a Value>) {
    out.push(node);
    match node {
        Value::Object(map) => {
            for child in map.values() {
                descendants(child, out);
            }
        }
        Value::Array(items) => {
            for child in items {
                descendants(child, out);
            }
        }
        _ => {}
    }
}

fn select<'a>(selector: &Selector, node: &'a Value, out: &mut Vec<&'a Value>) {
    match selector {
        Selector::Name(name) => {
            if let Some(child) = node.as_object().and_then(|m| m.get(name)) {
                out.push(child);
            }
        }
        Selector::Wildcard => match node {
            Value::Object(map) => out.extend(map.values()),
            Value::Array(items) => out.extend(items.iter()),
            _ => {}
        },
        Selector::Index(index) => {
            if let Some(child) = node.as_array().and_then(|items| index_into(items, *index)) {
                out.push(child);
            }
        }
        Selector::Slice { start, end, step } => {
            if let Some(items) = node.as_array() {
                let len = items.len() as i64;
                let start = normalize_bound(start.unwrap_or(0), len);
                let end = normalize_bound(end.unwrap_or(len), len);
                let mut i = start;
                while i < end {
                    out.push(&items[i]);
                    i += step;
                }
            }
        }
        Selector::Union(items) => {
            for item in items {
                match item {
                    UnionItem::Name(name) => select(&Selector::Name(name.clone()), node, out),
                    UnionItem::Index(index) => select(&Selector::Index(*index), node, out),
                }
            }
        }
        Selector::Filter(filter) => match node {
            Value::Array(items) => out.extend(items.iter().filter(|c| filter.matches(c))),
            Value::Object(map) => out.extend(map.values().filter(|c| filter.matches(c))),
            _ => {}
        },
    }
}

fn index_into(items: &[Value], index: i64) -> Option<&Value> {
    let len = items.len() as i64;
    let resolved = if index < 0 { len + index } else { index };
    if resolved < 0 {
        return None;
    }
    items.get(resolved as usize)
}

fn normalize_bound(bound: i64, len: i64) -> usize {
    let resolved = if bound < 0 { len + bound } else { bound };
    resolved.clamp(0, len) as usize
}

impl Filter {
    fn matches(&self, candidate: &Value) -> bool {
        let mut current = candidate;
        for key in &self.field {
            match current.as_object().and_then(|m| m.get(key)) {
                Some(next) => current = next,
                None => return false,
            }
        }

        let Some((op, literal)) = &self.comparison else {
            return true;
        };

        match op {
            CmpOp::Eq => loose_eq(current, literal),
            CmpOp::Ne => !loose_eq(current, literal),
            CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
                let Some(ordering) = compare(current, literal) else {
                    return false;
                };
                match op {
                    CmpOp::Lt => ordering.is_lt(),
                    CmpOp::Le => ordering.is_le(),
                    CmpOp::Gt => ordering.is_gt(),
                    _ => ordering.is_ge(),
                }
            }
        }
    }
}

fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.trim().chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> Error {
        Error::invalid_query(self.source, reason)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn parse(mut self) -> Result<Vec<Segment>> {
        if !self.eat('$') {
            return Err(self.error("query must start with '$'"));
        }

        let mut segments = Vec::new();
        while let Some(ch) = self.peek() {
            match ch {
                '.' if self.peek_at(1) == Some('.') => {
                    self.pos += 2;
                    let selector = match self.peek() {
                        Some('[') => {
                            self.pos += 1;
                            self.parse_bracket()?
                        }
                        Some('*') => {
                            self.pos += 1;
                            Selector::Wildcard
                        }
                        _ => Selector::Name(self.parse_name()?),
                    };
                    segments.push(Segment::Descendant(selector));
                }
                '.' => {
                    self.pos += 1;
                    if self.eat('*') {
                        segments.push(Segment::Child(Selector::Wildcard));
                    } else {
                        segments.push(Segment::Child(Selector::Name(self.parse_name()?)));
                    }
                }
                '[' => {
                    self.pos += 1;
                    segments.push(Segment::Child(self.parse_bracket()?));
                }
                other => {
                    return Err(self.error(format!(
                        "unexpected '{}' at position {}",
                        other, self.pos
                    )))
                }
            }
        }
        Ok(segments)
    }

    /// A bare name after `.`, up to the next `.` or `[`
    fn parse_name(&mut self) -> Result<String> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == '.' || ch == '[' {
                break;
            }
            self.pos += 1;
        }
        let name: String = self.chars[start..self.pos].iter().collect();
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(self.error(format!("empty field name at position {}", start)));
        }
        Ok(name)
    }

    /// Selector between `[` (already consumed) and `]`
    fn parse_bracket(&mut self) -> Result<Selector> {
        self.skip_spaces();
        let selector = match self.peek() {
            Some('*') => {
                self.pos += 1;
                Selector::Wildcard
            }
            Some('?') => {
                self.pos += 1;
                Selector::Filter(self.parse_filter()?)
            }
            Some('\'') | Some('"') => self.parse_quoted_names()?,
            Some(_) => self.parse_indices()?,
            None => return Err(self.error("unterminated '['")),
        };
        self.skip_spaces();
        if !self.eat(']') {
            return Err(self.error(format!("expected ']' at position {}", self.pos)));
        }
        Ok(selector)
    }

    fn parse_quoted(&mut self) -> Result<String> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            _ => return Err(self.error("expected a quoted name")),
        };
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error("unterminated string")),
                Some('\\') => {
                    self.pos += 1;
                    if let Some(escaped) = self.peek() {
                        out.push(escaped);
                        self.pos += 1;
                    }
                }
                Some(ch) if ch == quote => {
                    self.pos += 1;
                    return Ok(out);
                }
                Some(ch) => {
                    out.push(ch);
                    self.pos += 1;
                }
            }
        }
    }

    fn parse_quoted_names(&mut self) -> Result<Selector> {
        let mut names = vec![self.parse_quoted()?];
        loop {
            self.skip_spaces();
            if !self.eat(',') {
                break;
            }
            self.skip_spaces();
            names.push(self.parse_quoted()?);
        }
        if names.len() == 1 {
            Ok(Selector::Name(names.remove(0)))
        } else {
            Ok(Selector::Union(names.into_iter().map(UnionItem::Name).collect()))
        }
    }

    /// Index, slice or union of indices/quoted names
    fn parse_indices(&mut self) -> Result<Selector> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch == ']' {
                break;
            }
            self.pos += 1;
        }
        let raw: String = self.chars[start..self.pos].iter().collect();
        let raw = raw.trim();

        if raw.contains(':') {
            return self.parse_slice(raw);
        }

        if raw.contains(',') {
            let items = raw
                .split(',')
                .map(|part| self.parse_union_item(part.trim()))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Selector::Union(items));
        }

        raw.parse::<i64>()
            .map(Selector::Index)
            .map_err(|_| self.error(format!("invalid index '{}'", raw)))
    }

    fn parse_union_item(&self, part: &str) -> Result<UnionItem> {
        if let Ok(index) = part.parse::<i64>() {
            return Ok(UnionItem::Index(index));
        }
        let unquoted = part
            .strip_prefix('\'')
            .and_then(|p| p.strip_suffix('\''))
            .or_else(|| part.strip_prefix('"').and_then(|p| p.strip_suffix('"')));
        match unquoted {
            Some(name) => Ok(UnionItem::Name(name.to_string())),
            None => Err(self.error(format!("invalid union member '{}'", part))),
        }
    }

    fn parse_slice(&self, raw: &str) -> Result<Selector> {
        let parts: Vec<&str> = raw.split(':').map(str::trim).collect();
        if parts.len() > 3 {
            return Err(self.error(format!("invalid slice '{}'", raw)));
        }
        let bound = |part: Option<&&str>| -> Result<Option<i64>> {
            match part {
                None => Ok(None),
                Some(p) if p.is_empty() => Ok(None),
                Some(p) => p
                    .parse::<i64>()
                    .map(Some)
                    .map_err(|_| self.error(format!("invalid slice bound '{}'", p))),
            }
        };
        let start = bound(parts.first())?;
        let end = bound(parts.get(1))?;
        let step = match bound(parts.get(2))? {
            None => 1,
            Some(step) if step > 0 => step as usize,
            Some(step) => {
                return Err(self.error(format!("slice step must be positive, got {}", step)))
            }
        };
        Ok(Selector::Slice { start, end, step })
    }

    /// `(@.field OP literal)` after `?`
    fn parse_filter(&mut self) -> Result<Filter> {
        self.skip_spaces();
        if !self.eat('(') {
            return Err(self.error("expected '(' after '?'"));
        }

        // Scan to the closing parenthesis, skipping quoted text
        let start = self.pos;
        let mut quote: Option<char> = None;
        loop {
            match (self.peek(), quote) {
                (None, _) => return Err(self.error("unterminated filter")),
                (Some(ch), Some(q)) if ch == q => quote = None,
                (Some(_), Some(_)) => {}
                (Some(ch @ ('\'' | '"')), None) => quote = Some(ch),
                (Some(')'), None) => break,
                (Some(_), None) => {}
            }
            self.pos += 1;
        }
        let body: String = self.chars[start..self.pos].iter().collect();
        self.pos += 1;

        self.parse_filter_body(body.trim())
    }

    fn parse_filter_body(&self, body: &str) -> Result<Filter> {
        let Some(rest) = body.strip_prefix('@') else {
            return Err(self.error("filter must start with '@'"));
        };

        let op_start = rest
            .find(|c: char| matches!(c, '=' | '!' | '<' | '>'))
            .unwrap_or(rest.len());
        let (field_part, comparison_part) = rest.split_at(op_start);

        let field: Vec<String> = field_part
            .trim()
            .split('.')
            .filter(|s| !s.is_empty())
            .map(|s| s.trim().to_string())
            .collect();

        let comparison_part = comparison_part.trim();
        if comparison_part.is_empty() {
            return Ok(Filter {
                field,
                comparison: None,
            });
        }

        const OPS: [(&str, CmpOp); 6] = [
            ("==", CmpOp::Eq),
            ("!=", CmpOp::Ne),
            ("<=", CmpOp::Le),
            (">=", CmpOp::Ge),
            ("<", CmpOp::Lt),
            (">", CmpOp::Gt),
        ];
        let (op, literal) = OPS
            .iter()
            .find_map(|(token, op)| comparison_part.strip_prefix(token).map(|lit| (*op, lit)))
            .ok_or_else(|| self.error(format!("invalid filter '{}'", body)))?;

        Ok(Filter {
            field,
            comparison: Some((op, self.parse_literal(literal.trim())?)),
        })
    }

    fn parse_literal(&self, literal: &str) -> Result<Value> {
        if let Some(inner) = literal
            .strip_prefix('\'')
            .and_then(|l| l.strip_suffix('\''))
        {
            return Ok(Value::String(inner.to_string()));
        }
        serde_json::from_str(literal)
            .map_err(|_| self.error(format!("invalid filter literal '{}'", literal)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> Value {
        json!({
            "code": "0000",
            "data": {
                "token": "abc123xyz",
                "userId": 42,
                "orders": [
                    {"id": "A1", "status": "PAID", "amount": 30},
                    {"id": "A2", "status": "PENDING", "amount": 5},
                    {"id": "A3", "status": "PAID", "amount": 12.5}
                ],
                "meta": {"id": "M"}
            }
        })
    }

    fn eval(expr: &str) -> Vec<Value> {
        let doc = store();
        PathQuery::parse(expr)
            .unwrap()
            .evaluate(&doc)
            .into_iter()
            .cloned()
            .collect()
    }

    #[test]
    fn test_root() {
        assert_eq!(eval("$"), vec![store()]);
    }

    #[test]
    fn test_dot_children() {
        assert_eq!(eval("$.data.token"), vec![json!("abc123xyz")]);
        assert_eq!(eval("$.code"), vec![json!("0000")]);
    }

    #[test]
    fn test_bracket_children() {
        assert_eq!(eval("$['data']['userId']"), vec![json!(42)]);
        assert_eq!(eval("$[\"data\"].token"), vec![json!("abc123xyz")]);
    }

    #[test]
    fn test_missing_yields_no_matches() {
        assert!(eval("$.data.missing").is_empty());
        assert!(eval("$.code.deeper").is_empty());
        assert!(eval("$.data.orders[10]").is_empty());
    }

    #[test]
    fn test_indexes() {
        assert_eq!(eval("$.data.orders[0].id"), vec![json!("A1")]);
        assert_eq!(eval("$.data.orders[-1].id"), vec![json!("A3")]);
        assert!(eval("$.data.orders[-4]").is_empty());
    }

    #[test]
    fn test_wildcards() {
        assert_eq!(
            eval("$.data.orders[*].id"),
            vec![json!("A1"), json!("A2"), json!("A3")]
        );
        assert_eq!(eval("$.data.meta.*"), vec![json!("M")]);
    }

    #[test]
    fn test_recursive_descent_in_document_order() {
        assert_eq!(
            eval("$..id"),
            vec![json!("A1"), json!("A2"), json!("A3"), json!("M")]
        );
        assert_eq!(eval("$..token"), vec![json!("abc123xyz")]);
        assert_eq!(eval("$..orders[1].id"), vec![json!("A2")]);
    }

    #[test]
    fn test_slices() {
        assert_eq!(
            eval("$.data.orders[0:2].id"),
            vec![json!("A1"), json!("A2")]
        );
        assert_eq!(eval("$.data.orders[-1:].id"), vec![json!("A3")]);
        assert_eq!(
            eval("$.data.orders[::2].id"),
            vec![json!("A1"), json!("A3")]
        );
    }

    #[test]
    fn test_unions() {
        assert_eq!(
            eval("$.data.orders[0,2].id"),
            vec![json!("A1"), json!("A3")]
        );
        assert_eq!(
            eval("$.data['token','userId']"),
            vec![json!("abc123xyz"), json!(42)]
        );
    }

    #[test]
    fn test_filters() {
        assert_eq!(
            eval("$.data.orders[?(@.status == 'PAID')].id"),
            vec![json!("A1"), json!("A3")]
        );
        assert_eq!(
            eval("$.data.orders[?(@.amount < 10)].id"),
            vec![json!("A2")]
        );
        assert_eq!(
            eval("$.data.orders[?(@.amount >= 12.5)].id"),
            vec![json!("A1"), json!("A3")]
        );
        assert_eq!(
            eval("$.data.orders[?(@.status != \"PAID\")].id"),
            vec![json!("A2")]
        );
        assert_eq!(eval("$.data.orders[?(@.id)]").len(), 3);
        assert!(eval("$.data.orders[?(@.missing)]").is_empty());
    }

    #[test]
    fn test_first() {
        let doc = store();
        let q = PathQuery::parse("$..status").unwrap();
        assert_eq!(q.first(&doc), Some(&json!("PAID")));
        assert_eq!(q.evaluate(&doc).len(), 3);
    }

    #[test]
    fn test_invalid_queries() {
        for bad in [
            "data.token",
            "$.",
            "$.data[",
            "$.data[abc]",
            "$.data[?(@.a == )]",
            "$.data[1:2:0]",
            "$.data[?@.a]",
            "$ data",
        ] {
            assert!(
                matches!(PathQuery::parse(bad), Err(Error::InvalidQuery { .. })),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_loose_eq() {
        assert!(loose_eq(&json!(1), &json!(1.0)));
        assert!(loose_eq(&json!(42), &json!(42)));
        assert!(!loose_eq(&json!(1), &json!("1")));
        assert!(loose_eq(&json!({"a": [1]}), &json!({"a": [1]})));
    }

    #[test]
    fn test_display_round_trip() {
        let q = PathQuery::parse("  $.data.token ").unwrap();
        assert_eq!(q.to_string(), "$.data.token");
        assert_eq!(q.as_str(), "$.data.token");
    }
}
