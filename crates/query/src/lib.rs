//! PostgREST-style query strings and their translation to the plain
//! key/operator form the REST backend understands.
//!
//! ```text
//! website_id=eq.3&email=like.ann*&order=created_at.desc&limit=1
//!   -> website_id=3&email_like=ann&_sort=created_at&_order=desc&_limit=1
//! ```

pub mod ast;
pub mod parser;
pub mod translate;

pub use ast::{Operator, OrderTerm, Query, QueryParam};
pub use parser::{parse, ParseError};
pub use translate::{to_backend, translate_query};
