//! Executes a parsed template.

use serde_json::{json, Map, Number, Value};
use templar_syntax::{BinOp, Expr, Literal, Node};

use super::context::RenderContext;
use super::NativeEngine;
use crate::error::TemplateError;
use crate::filters;
use crate::sections::CaptureMode;
use crate::value::{display, get_attr, get_index, is_truthy, kind, loose_eq};

/// Variable holding the name of the executing template.
pub const TEMPLATE_BINDING: &str = "template";

/// Prefix for data keys that collide with a reserved binding.
pub const RESERVED_PREFIX: &str = "data_";

/// Functions callable from native templates.
pub const FUNCTIONS: &[&str] = &[
    "partial", "insert", "layout", "section", "start", "append", "prepend", "stop", "escape",
    "e", "batch", "widget",
];

/// One executing template: its scope stack and its own output buffer.
pub(super) struct Frame<'a> {
    engine: &'a NativeEngine,
    depth: usize,
    scopes: Vec<Map<String, Value>>,
    out: String,
}

impl<'a> Frame<'a> {
    pub fn new(engine: &'a NativeEngine, name: &str, depth: usize, data: Map<String, Value>) -> Self {
        let mut scope = Map::with_capacity(data.len() + 1);
        for (key, value) in data {
            if key == TEMPLATE_BINDING {
                scope.insert(format!("{}{}", RESERVED_PREFIX, key), value);
            } else {
                scope.insert(key, value);
            }
        }
        scope.insert(TEMPLATE_BINDING.to_string(), Value::String(name.to_string()));

        Self {
            engine,
            depth,
            scopes: vec![scope],
            out: String::new(),
        }
    }

    /// Runs `nodes` and returns everything written outside captures.
    pub fn run(mut self, ctx: &mut RenderContext, nodes: &[Node]) -> Result<String, TemplateError> {
        self.exec_nodes(ctx, nodes)?;
        Ok(self.out)
    }

    fn emit(&mut self, ctx: &mut RenderContext, text: &str) {
        ctx.emit(self.depth, &mut self.out, text);
    }

    fn exec_nodes(&mut self, ctx: &mut RenderContext, nodes: &[Node]) -> Result<(), TemplateError> {
        for node in nodes {
            self.exec_node(ctx, node)?;
        }
        Ok(())
    }

    fn exec_node(&mut self, ctx: &mut RenderContext, node: &Node) -> Result<(), TemplateError> {
        match node {
            Node::Text(text) => self.emit(ctx, text),
            Node::Emit { expr, .. } => {
                let value = self.eval(ctx, expr)?;
                self.emit(ctx, &display(&value));
            }
            Node::Exec { expr, .. } => {
                self.eval(ctx, expr)?;
            }
            Node::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                let branch = if is_truthy(&self.eval(ctx, cond)?) {
                    then_branch
                } else {
                    else_branch
                };
                self.exec_nodes(ctx, branch)?;
            }
            Node::For {
                key,
                value,
                iter,
                body,
                line,
            } => {
                let entries: Vec<(Value, Value)> = match self.eval(ctx, iter)? {
                    Value::Array(items) => items
                        .into_iter()
                        .enumerate()
                        .map(|(i, item)| (Value::from(i), item))
                        .collect(),
                    Value::Object(map) => map
                        .into_iter()
                        .map(|(k, item)| (Value::String(k), item))
                        .collect(),
                    Value::Null => Vec::new(),
                    other => {
                        return Err(TemplateError::NotIterable {
                            line: *line,
                            kind: kind(&other),
                        })
                    }
                };

                let length = entries.len();
                for (i, (entry_key, entry_value)) in entries.into_iter().enumerate() {
                    let mut scope = Map::new();
                    if let Some(key) = key {
                        scope.insert(key.clone(), entry_key);
                    }
                    scope.insert(value.clone(), entry_value);
                    scope.insert(
                        "loop".to_string(),
                        json!({
                            "index": i + 1,
                            "index0": i,
                            "first": i == 0,
                            "last": i + 1 == length,
                            "length": length,
                        }),
                    );

                    self.scopes.push(scope);
                    let result = self.exec_nodes(ctx, body);
                    self.scopes.pop();
                    result?;
                }
            }
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Value {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
            .unwrap_or(Value::Null)
    }

    fn eval(&mut self, ctx: &mut RenderContext, expr: &Expr) -> Result<Value, TemplateError> {
        let value = match expr {
            Expr::Literal(lit) => literal(lit),
            Expr::Var(name) => self.lookup(name),
            Expr::Attr { target, name } => get_attr(&self.eval(ctx, target)?, name),
            Expr::Index { target, index } => {
                let target = self.eval(ctx, target)?;
                let index = self.eval(ctx, index)?;
                get_index(&target, &index)
            }
            Expr::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(ctx, arg))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(ctx, name, args)?
            }
            Expr::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.eval(ctx, item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Expr::Map(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, expr) in entries {
                    let value = self.eval(ctx, expr)?;
                    map.insert(key.clone(), value);
                }
                Value::Object(map)
            }
            Expr::Not(inner) => Value::Bool(!is_truthy(&self.eval(ctx, inner)?)),
            // `and`/`or` short-circuit and yield the deciding operand.
            Expr::Binary { op, lhs, rhs } => {
                let lhs = self.eval(ctx, lhs)?;
                match op {
                    BinOp::And if !is_truthy(&lhs) => lhs,
                    BinOp::Or if is_truthy(&lhs) => lhs,
                    BinOp::And | BinOp::Or => self.eval(ctx, rhs)?,
                    BinOp::Eq => Value::Bool(loose_eq(&lhs, &self.eval(ctx, rhs)?)),
                    BinOp::Ne => Value::Bool(!loose_eq(&lhs, &self.eval(ctx, rhs)?)),
                }
            }
        };
        Ok(value)
    }

    fn call(
        &mut self,
        ctx: &mut RenderContext,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, TemplateError> {
        let function = FUNCTIONS
            .iter()
            .copied()
            .find(|f| *f == name)
            .ok_or_else(|| TemplateError::UnknownFunction(name.to_string()))?;
        let mut args = Args::new(function, args);
        let engine = self.engine;

        match function {
            "partial" => {
                let template = args.string()?;
                let data = args.optional_map()?;
                args.finish()?;
                let output = engine.execute(ctx, &template, data, self.depth + 1)?;
                Ok(Value::String(output))
            }
            "insert" => {
                let template = args.string()?;
                let data = args.optional_map()?;
                args.finish()?;
                let output = engine.execute(ctx, &template, data, self.depth + 1)?;
                self.emit(ctx, &output);
                Ok(Value::Null)
            }
            "layout" => {
                let template = args.string()?;
                let data = args.optional_map()?;
                args.finish()?;
                ctx.set_layout(template, data);
                Ok(Value::Null)
            }
            "section" => {
                let section = args.string()?;
                let default = args.optional();
                args.finish()?;
                Ok(match ctx.section(&section) {
                    Some(text) => Value::String(text.to_string()),
                    None => default.unwrap_or(Value::Null),
                })
            }
            "start" | "append" | "prepend" => {
                let section = args.string()?;
                args.finish()?;
                let mode = match function {
                    "append" => CaptureMode::Append,
                    "prepend" => CaptureMode::Prepend,
                    _ => CaptureMode::Replace,
                };
                ctx.open(&section, mode, self.depth)?;
                Ok(Value::Null)
            }
            "stop" => {
                args.finish()?;
                ctx.stop(self.depth)?;
                Ok(Value::Null)
            }
            "escape" | "e" => {
                let value = args.value()?;
                let chain = args.optional_string()?;
                args.finish()?;
                let escaped = filters::escape(engine.filters(), value, chain.as_deref())?;
                Ok(Value::String(escaped))
            }
            "batch" => {
                let value = args.value()?;
                let chain = args.string()?;
                args.finish()?;
                filters::batch(engine.filters(), value, &chain)
            }
            "widget" => {
                let widget = args.string()?;
                let options = args.optional_map()?;
                args.finish()?;
                Ok(Value::String(engine.run_widget(&widget, &options)?))
            }
            _ => Err(TemplateError::UnknownFunction(name.to_string())),
        }
    }
}

fn literal(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::from(*n),
        Literal::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        Literal::Str(s) => Value::String(s.clone()),
    }
}

/// Positional arguments of a template function call.
struct Args {
    function: &'static str,
    values: std::vec::IntoIter<Value>,
    position: usize,
}

impl Args {
    fn new(function: &'static str, values: Vec<Value>) -> Self {
        Self {
            function,
            values: values.into_iter(),
            position: 0,
        }
    }

    fn error(&self, message: String) -> TemplateError {
        TemplateError::InvalidArguments {
            function: self.function,
            message,
        }
    }

    fn optional(&mut self) -> Option<Value> {
        self.position += 1;
        self.values.next()
    }

    fn value(&mut self) -> Result<Value, TemplateError> {
        self.optional()
            .ok_or_else(|| self.error(format!("missing argument {}", self.position)))
    }

    fn string(&mut self) -> Result<String, TemplateError> {
        match self.value()? {
            Value::String(s) => Ok(s),
            other => Err(self.error(format!(
                "argument {} must be a string, got {}",
                self.position,
                kind(&other)
            ))),
        }
    }

    fn optional_string(&mut self) -> Result<Option<String>, TemplateError> {
        match self.optional() {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(self.error(format!(
                "argument {} must be a string, got {}",
                self.position,
                kind(&other)
            ))),
        }
    }

    fn optional_map(&mut self) -> Result<Map<String, Value>, TemplateError> {
        match self.optional() {
            None | Some(Value::Null) => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map),
            Some(other) => Err(self.error(format!(
                "argument {} must be a map, got {}",
                self.position,
                kind(&other)
            ))),
        }
    }

    fn finish(self) -> Result<(), TemplateError> {
        let extra = self.values.len();
        if extra > 0 {
            return Err(self.error(format!(
                "expected at most {} arguments, got {}",
                self.position,
                self.position + extra
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_validation() {
        let mut args = Args::new("start", vec![json!(1)]);
        match args.string() {
            Err(TemplateError::InvalidArguments { function, message }) => {
                assert_eq!(function, "start");
                assert!(message.contains("must be a string"));
            }
            other => panic!("expected InvalidArguments, got {:?}", other),
        }

        let mut args = Args::new("stop", vec![json!("x")]);
        assert!(args.optional_map().is_err());

        let args = Args::new("stop", vec![json!("x")]);
        assert!(matches!(
            args.finish(),
            Err(TemplateError::InvalidArguments { function: "stop", .. })
        ));
    }

    #[test]
    fn test_missing_argument() {
        let mut args = Args::new("partial", Vec::new());
        let err = args.string().unwrap_err();
        assert_eq!(err.to_string(), "partial(): missing argument 1");
    }

    #[test]
    fn test_float_literal() {
        assert_eq!(literal(&Literal::Float(1.5)), json!(1.5));
        assert_eq!(literal(&Literal::Float(f64::NAN)), Value::Null);
    }
}
