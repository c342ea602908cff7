//! # keel-core
//!
//! Building blocks shared by the keel accessor and schema blueprints:
//!
//! - [`SqlValue`] and the [`Escape`] primitive used to render literals
//! - [`FilterChain`], the validated predicate grammar
//! - [`ParamBindings`], `?name?` placeholder binding and resolution
//! - [`Renderer`] / [`GenericRenderer`], turning requests into [`Statement`]s
//!
//! ## Example
//!
//! ```rust
//! use keel_core::{FilterChain, GenericRenderer, Operator, QuoteEscape, RenderRequest,
//!     Renderer, ToSqlValue};
//!
//! let mut chain = FilterChain::new();
//! chain.open("name", true).unwrap();
//! chain.compare(Operator::Eq, "'; DROP TABLE users; --".to_sql_value()).unwrap();
//!
//! let statement = GenericRenderer::new()
//!     .render(&RenderRequest::select("users", chain.as_slice()), &QuoteEscape)
//!     .unwrap();
//! assert_eq!(
//!     statement.sql_text(),
//!     "SELECT * FROM users WHERE name = '''; DROP TABLE users; --'"
//! );
//! ```

pub mod filter;
pub mod params;
pub mod render;
pub mod value;

pub use filter::{Filter, FilterChain, FilterError, Joint, Operator};
pub use params::{placeholder, substitute_placeholders, Binding, ParamBindings, Resolution};
pub use render::{GenericRenderer, Operation, RenderError, RenderRequest, Renderer, Statement};
pub use value::{Escape, QuoteEscape, Row, Rowset, SqlValue, ToSqlValue};
