//! Natural-language product search
//!
//! The model writes one query inside `<SQL></SQL>` tags; only a statement
//! that passes [`SelectQuery::parse`] is run, on a read-only connection.

pub mod extract;
pub mod narration;
pub mod responder;
pub mod store;

pub use extract::{extract_sql, SelectQuery, SqlExtraction};
pub use narration::{
    discount_phrase, render_product_list, with_discount_text, DISCOUNT_TEXT_KEY, NO_MATCHING_PRODUCTS,
};
pub use responder::{SqlAnswer, SqlResponder};
pub use store::{ProductRecord, ProductStore, Record};
