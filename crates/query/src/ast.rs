use serde::{Deserialize, Serialize};

/// Comparison operators of the `column=op.value` filter convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    ILike,
    In,
    Is,
}

impl Operator {
    /// Recognise the operator prefix of a filter value (`eq`, `like`, ...).
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        let op = match prefix {
            "eq" => Operator::Eq,
            "neq" => Operator::Neq,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "like" => Operator::Like,
            "ilike" => Operator::ILike,
            "in" => Operator::In,
            "is" => Operator::Is,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Like => "like",
            Operator::ILike => "ilike",
            Operator::In => "in",
            Operator::Is => "is",
        }
    }
}

/// One column of an `order=` clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTerm {
    pub column: String,
    pub descending: bool,
}

/// A single `key=value` pair of a query string after classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryParam {
    /// `column=op.value`
    Filter {
        column: String,
        op: Operator,
        value: String,
    },
    /// `column=in.(a,b,c)`
    AnyOf { column: String, values: Vec<String> },
    /// `order=col.desc,other.asc`
    Order(Vec<OrderTerm>),
    /// `limit=n`
    Limit(u64),
    /// `offset=n`
    Offset(u64),
    /// Anything not following the convention. Kept verbatim.
    Raw { key: String, value: Option<String> },
}

/// A parsed query string, parameters in their original order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub params: Vec<QueryParam>,
}

impl Query {
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Value of the first filter on `column` with operator `op`.
    pub fn filter_value(&self, column: &str, op: Operator) -> Option<&str> {
        self.params.iter().find_map(|p| match p {
            QueryParam::Filter {
                column: c,
                op: o,
                value,
            } if c == column && *o == op => Some(value.as_str()),
            _ => None,
        })
    }

    /// Value bound to `column`, either through an `eq.` filter or as a
    /// plain `column=value` pair.
    pub fn equality_value(&self, column: &str) -> Option<&str> {
        self.filter_value(column, Operator::Eq).or_else(|| {
            self.params.iter().find_map(|p| match p {
                QueryParam::Raw {
                    key,
                    value: Some(v),
                } if key == column => Some(v.as_str()),
                _ => None,
            })
        })
    }
}
