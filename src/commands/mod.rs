//! Command implementations
//!
//! Each module corresponds to a subcommand of the `ecom_chatbot` CLI.

pub mod ask;
pub mod chat;
pub mod ingest;
pub mod route;
pub mod sql;

pub use ask::run as ask_run;
pub use chat::run as chat_run;
pub use ingest::run as ingest_run;
pub use route::run as route_run;
pub use sql::run as sql_run;
