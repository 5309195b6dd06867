use crate::ast::{Operator, Query, QueryParam};
use crate::parser::parse;

/// Render a parsed query in the backend's plain form.
///
/// | input                 | output                         |
/// |-----------------------|--------------------------------|
/// | `col=eq.v`, `col=is.v`| `col=v`                        |
/// | `col=neq.v`           | `col_ne=v`                     |
/// | `col=gt.v` etc.       | `col_gt=v`, `col_gte`, `col_lt`, `col_lte` |
/// | `col=like.v*`         | `col_like=v`                   |
/// | `col=in.(a,b)`        | `col=a&col=b`                  |
/// | `order=c.desc`        | `_sort=c&_order=desc`          |
/// | `limit=n`/`offset=n`  | `_limit=n` / `_start=n`        |
pub fn to_backend(query: &Query) -> String {
    let mut pairs: Vec<String> = Vec::with_capacity(query.params.len());

    for param in &query.params {
        match param {
            QueryParam::Filter { column, op, value } => {
                let pair = match op {
                    Operator::Eq | Operator::Is => format!("{column}={value}"),
                    Operator::Like | Operator::ILike => {
                        format!("{column}_like={}", value.trim_matches('*'))
                    }
                    Operator::Neq => format!("{column}_ne={value}"),
                    Operator::Gt => format!("{column}_gt={value}"),
                    Operator::Gte => format!("{column}_gte={value}"),
                    Operator::Lt => format!("{column}_lt={value}"),
                    Operator::Lte => format!("{column}_lte={value}"),
                    // `in` is parsed into `AnyOf`; a stray one renders as equality.
                    Operator::In => format!("{column}={value}"),
                };
                pairs.push(pair);
            }
            QueryParam::AnyOf { column, values } => {
                pairs.extend(values.iter().map(|v| format!("{column}={v}")));
            }
            QueryParam::Order(terms) => {
                let columns: Vec<&str> = terms.iter().map(|t| t.column.as_str()).collect();
                let directions: Vec<&str> = terms
                    .iter()
                    .map(|t| if t.descending { "desc" } else { "asc" })
                    .collect();
                pairs.push(format!("_sort={}", columns.join(",")));
                pairs.push(format!("_order={}", directions.join(",")));
            }
            QueryParam::Limit(n) => pairs.push(format!("_limit={n}")),
            QueryParam::Offset(n) => pairs.push(format!("_start={n}")),
            QueryParam::Raw { key, value } => match value {
                Some(v) => pairs.push(format!("{key}={v}")),
                None => pairs.push(key.clone()),
            },
        }
    }

    pairs.join("&")
}

/// Translate a raw query string. Never fails: input that cannot be parsed is
/// returned unchanged (minus any leading `?`).
///
/// Translating the output again changes nothing, except when an operand
/// itself starts with an operator prefix: `note=eq.gt.5` becomes `note=gt.5`,
/// which a second pass reads as a filter.
pub fn translate_query(raw: &str) -> String {
    match parse(raw) {
        Ok(query) => to_backend(&query),
        Err(e) => {
            tracing::warn!("passing query through untranslated: {e}");
            raw.strip_prefix('?').unwrap_or(raw).to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eq_prefix_is_stripped() {
        assert_eq!(translate_query("website_id=eq.3"), "website_id=3");
        assert_eq!(translate_query("?id=eq.7&slug=eq.home"), "id=7&slug=home");
    }

    #[test]
    fn like_becomes_suffixed_key() {
        assert_eq!(translate_query("email=like.ann*"), "email_like=ann");
        assert_eq!(translate_query("name=ilike.*smith*"), "name_like=smith");
    }

    #[test]
    fn comparison_operators() {
        assert_eq!(
            translate_query("rating=gte.4&review_count=lt.10&platform=neq.yelp"),
            "rating_gte=4&review_count_lt=10&platform_ne=yelp"
        );
    }

    #[test]
    fn order_limit_offset() {
        assert_eq!(
            translate_query("website_id=eq.1&order=created_at.desc&limit=1&offset=5"),
            "website_id=1&_sort=created_at&_order=desc&_limit=1&_start=5"
        );
    }

    #[test]
    fn in_list_expands() {
        assert_eq!(translate_query("id=in.(4,5)"), "id=4&id=5");
    }

    #[test]
    fn unknown_params_pass_through() {
        assert_eq!(translate_query("select=*&q=plumber"), "select=*&q=plumber");
        assert_eq!(translate_query(""), "");
    }

    #[test]
    fn unparseable_input_is_returned_verbatim() {
        assert_eq!(translate_query("?id=in.oops"), "id=in.oops");
    }

    #[test]
    fn translation_is_idempotent() {
        for raw in [
            "website_id=eq.3&email=like.ann*",
            "order=sort_order.asc&limit=10",
            "id=in.(1,2)&rating=gt.3",
            "plain=value&flag",
        ] {
            let once = translate_query(raw);
            assert_eq!(translate_query(&once), once, "not idempotent for {raw}");
        }
    }

    #[test]
    fn operator_like_operands_are_not_escaped() {
        let once = translate_query("note=eq.gt.5");
        assert_eq!(once, "note=gt.5");
        assert_eq!(translate_query(&once), "note_gt=5");
    }
}
