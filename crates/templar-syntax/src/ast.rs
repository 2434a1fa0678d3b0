//! Parsed template tree.

/// A parsed template: a flat list of top-level nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub nodes: Vec<Node>,
}

/// One element of a template body.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, written as-is.
    Text(String),

    /// `{{ expr }}`: evaluate and write the value.
    Emit { expr: Expr, line: usize },

    /// `{% expr %}`: evaluate for side effects, discard the value.
    Exec { expr: Expr, line: usize },

    /// `{% if cond %} .. {% else %} .. {% endif %}`
    If {
        cond: Expr,
        then_branch: Vec<Node>,
        else_branch: Vec<Node>,
        line: usize,
    },

    /// `{% for [key,] value in iter %} .. {% endfor %}`
    For {
        key: Option<String>,
        value: String,
        iter: Expr,
        body: Vec<Node>,
        line: usize,
    },
}

/// An expression inside `{{ }}` or `{% %}`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    /// A bare name looked up in the current scope.
    Var(String),
    /// `target.name`, also used for numeric segments (`items.0`).
    Attr { target: Box<Expr>, name: String },
    /// `target[index]`
    Index { target: Box<Expr>, index: Box<Expr> },
    /// `name(args..)`. Only bare names are callable.
    Call { name: String, args: Vec<Expr> },
    List(Vec<Expr>),
    /// `{key: value, ..}` with keys kept in source order.
    Map(Vec<(String, Expr)>),
    Not(Box<Expr>),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    And,
    Or,
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Expr {
    /// Convenience constructor for string literals.
    pub fn str(s: impl Into<String>) -> Self {
        Expr::Literal(Literal::Str(s.into()))
    }
}
