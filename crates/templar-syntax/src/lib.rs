//! Parser for templar's native template syntax.
//!
//! A template is plain text with three kinds of tags:
//!
//! - `{{ expr }}` evaluates an expression and writes its value
//! - `{% ... %}` holds a block (`if`/`else`/`endif`, `for`/`endfor`) or an
//!   expression evaluated only for its side effects, such as
//!   `{% start("scripts") %}`
//! - `{# ... #}` is a comment and produces nothing
//!
//! A `-` just inside a delimiter trims whitespace on that side:
//! `{%- stop() -%}`.
//!
//! # Example
//!
//! ```rust
//! use templar_syntax::{parse, Node};
//!
//! let tpl = parse(r#"{% layout("base") %}<h1>{{ e(title) }}</h1>"#).unwrap();
//! assert_eq!(tpl.nodes.len(), 4);
//! assert!(matches!(tpl.nodes[1], Node::Text(_)));
//! ```
//!
//! # Expressions
//!
//! - Literals: `"text"`, `'text'`, `42`, `-1`, `2.5`, `true`, `false`, `null`
//! - Variables and paths: `user`, `user.name`, `items.0`, `meta["og:title"]`
//! - Calls: `partial("nav", {active: page})`. Only bare names are callable;
//!   what a name means is decided by the renderer, not the parser.
//! - Lists `[a, b]` and maps `{key: value, "other-key": value}`
//! - `not`, `and`, `or`, `==`, `!=`
//!
//! Loops bind one variable for sequences (`{% for item in items %}`) or two for
//! maps (`{% for key, value in map %}`).

mod ast;
mod error;
mod lexer;
mod parser;

pub use ast::{BinOp, Expr, Literal, Node, Template};
pub use error::SyntaxError;

/// Parses template source into a [`Template`] tree.
pub fn parse(source: &str) -> Result<Template, SyntaxError> {
    parser::parse_template(source)
}

/// Parses a single expression, as it would appear inside `{{ }}`.
pub fn parse_expr(source: &str) -> Result<Expr, SyntaxError> {
    parser::parse_expression(source, 1)
}
