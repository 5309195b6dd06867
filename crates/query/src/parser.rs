use thiserror::Error;

use crate::ast::{Operator, OrderTerm, Query, QueryParam};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("filter `{0}` has no column name")]
    EmptyColumn(String),
    #[error("`in` filter on `{column}` must be a parenthesised list, got `{value}`")]
    MalformedList { column: String, value: String },
    #[error("empty order term in `{0}`")]
    EmptyOrderTerm(String),
}

/// Parse a query string (with or without the leading `?`).
///
/// Values are kept exactly as written; no percent-decoding is applied, so a
/// translated query can be appended to a URL without re-encoding.
pub fn parse(input: &str) -> Result<Query, ParseError> {
    let input = input.strip_prefix('?').unwrap_or(input);
    let mut params = Vec::new();

    for pair in input.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (pair, None),
        };
        params.push(parse_pair(pair, key, value)?);
    }

    Ok(Query { params })
}

fn parse_pair(pair: &str, key: &str, value: Option<&str>) -> Result<QueryParam, ParseError> {
    let raw = || QueryParam::Raw {
        key: key.to_string(),
        value: value.map(str::to_string),
    };

    let Some(value) = value else {
        return Ok(raw());
    };

    match key {
        "order" => return parse_order(pair, value),
        "limit" => return Ok(value.parse().map(QueryParam::Limit).unwrap_or_else(|_| raw())),
        "offset" => return Ok(value.parse().map(QueryParam::Offset).unwrap_or_else(|_| raw())),
        _ => {}
    }

    let Some((prefix, operand)) = value.split_once('.') else {
        return Ok(raw());
    };
    let Some(op) = Operator::from_prefix(prefix) else {
        return Ok(raw());
    };
    if key.is_empty() {
        return Err(ParseError::EmptyColumn(pair.to_string()));
    }

    if op == Operator::In {
        let list = operand
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(|| ParseError::MalformedList {
                column: key.to_string(),
                value: operand.to_string(),
            })?;
        let values = list
            .split(',')
            .map(|v| v.trim().trim_matches('"').to_string())
            .filter(|v| !v.is_empty())
            .collect();
        return Ok(QueryParam::AnyOf {
            column: key.to_string(),
            values,
        });
    }

    Ok(QueryParam::Filter {
        column: key.to_string(),
        op,
        value: operand.to_string(),
    })
}

fn parse_order(pair: &str, value: &str) -> Result<QueryParam, ParseError> {
    let mut terms = Vec::new();
    for term in value.split(',') {
        let mut parts = term.split('.');
        let column = parts.next().unwrap_or_default();
        if column.is_empty() {
            return Err(ParseError::EmptyOrderTerm(pair.to_string()));
        }
        // Trailing modifiers such as `nullslast` are not supported by the backend.
        let descending = parts.any(|p| p == "desc");
        terms.push(OrderTerm {
            column: column.to_string(),
            descending,
        });
    }
    Ok(QueryParam::Order(terms))
}
