//! Recursive-descent parser producing the [`Template`] tree.

use crate::ast::{BinOp, Expr, Literal, Node, Template};
use crate::error::SyntaxError;
use crate::lexer::{segments, tokenize, Segment, Token};

/// Open block waiting for its closing tag.
enum Frame {
    If {
        cond: Expr,
        then_branch: Vec<Node>,
        else_branch: Option<Vec<Node>>,
        line: usize,
    },
    For {
        key: Option<String>,
        value: String,
        iter: Expr,
        body: Vec<Node>,
        line: usize,
    },
}

impl Frame {
    fn nodes_mut(&mut self) -> &mut Vec<Node> {
        match self {
            Frame::If {
                then_branch,
                else_branch,
                ..
            } => else_branch.as_mut().unwrap_or(then_branch),
            Frame::For { body, .. } => body,
        }
    }

    fn describe(&self) -> (&'static str, usize) {
        match self {
            Frame::If { line, .. } => ("if", *line),
            Frame::For { line, .. } => ("for", *line),
        }
    }
}

pub(crate) fn parse_template(source: &str) -> Result<Template, SyntaxError> {
    let mut root: Vec<Node> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    for segment in segments(source)? {
        match segment {
            Segment::Text(text) => {
                current(&mut root, &mut stack).push(Node::Text(text.to_string()));
            }
            Segment::Emit { body, line } => {
                let expr = parse_expression(body, line)?;
                current(&mut root, &mut stack).push(Node::Emit { expr, line });
            }
            Segment::Block { body, line } => block(body, line, &mut root, &mut stack)?,
        }
    }

    if let Some(frame) = stack.last() {
        let (kind, line) = frame.describe();
        return Err(SyntaxError::new(
            line,
            format!("`{}` block is never closed", kind),
        ));
    }

    Ok(Template { nodes: root })
}

fn current<'a>(root: &'a mut Vec<Node>, stack: &'a mut [Frame]) -> &'a mut Vec<Node> {
    match stack.last_mut() {
        Some(frame) => frame.nodes_mut(),
        None => root,
    }
}

/// Splits a leading identifier off a block body.
fn keyword(body: &str) -> (&str, &str) {
    let body = body.trim();
    let end = body
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(body.len());
    (&body[..end], &body[end..])
}

fn block(
    body: &str,
    line: usize,
    root: &mut Vec<Node>,
    stack: &mut Vec<Frame>,
) -> Result<(), SyntaxError> {
    let (word, rest) = keyword(body);
    match word {
        "if" => {
            let cond = parse_expression(rest, line)?;
            stack.push(Frame::If {
                cond,
                then_branch: Vec::new(),
                else_branch: None,
                line,
            });
        }
        "else" => {
            expect_empty(rest, "else", line)?;
            match stack.last_mut() {
                Some(Frame::If { else_branch, .. }) if else_branch.is_none() => {
                    *else_branch = Some(Vec::new());
                }
                Some(Frame::If { .. }) => {
                    return Err(SyntaxError::new(line, "duplicate `else` in `if` block"))
                }
                _ => return Err(SyntaxError::new(line, "`else` outside of an `if` block")),
            }
        }
        "endif" => {
            expect_empty(rest, "endif", line)?;
            match stack.pop() {
                Some(Frame::If {
                    cond,
                    then_branch,
                    else_branch,
                    line: open_line,
                }) => current(root, stack).push(Node::If {
                    cond,
                    then_branch,
                    else_branch: else_branch.unwrap_or_default(),
                    line: open_line,
                }),
                Some(other) => return Err(mismatched(&other, "endif", line)),
                None => return Err(SyntaxError::new(line, "unexpected `endif`")),
            }
        }
        "for" => {
            let (key, value, iter) = parse_for_header(rest, line)?;
            stack.push(Frame::For {
                key,
                value,
                iter,
                body: Vec::new(),
                line,
            });
        }
        "endfor" => {
            expect_empty(rest, "endfor", line)?;
            match stack.pop() {
                Some(Frame::For {
                    key,
                    value,
                    iter,
                    body,
                    line: open_line,
                }) => current(root, stack).push(Node::For {
                    key,
                    value,
                    iter,
                    body,
                    line: open_line,
                }),
                Some(other) => return Err(mismatched(&other, "endfor", line)),
                None => return Err(SyntaxError::new(line, "unexpected `endfor`")),
            }
        }
        _ => {
            let expr = parse_expression(body, line)?;
            current(root, stack).push(Node::Exec { expr, line });
        }
    }
    Ok(())
}

fn expect_empty(rest: &str, word: &str, line: usize) -> Result<(), SyntaxError> {
    if rest.trim().is_empty() {
        Ok(())
    } else {
        Err(SyntaxError::new(
            line,
            format!("unexpected input after `{}`", word),
        ))
    }
}

fn mismatched(open: &Frame, closer: &str, line: usize) -> SyntaxError {
    let (kind, open_line) = open.describe();
    SyntaxError::new(
        line,
        format!(
            "`{}` does not match `{}` opened on line {}",
            closer, kind, open_line
        ),
    )
}

fn parse_for_header(
    src: &str,
    line: usize,
) -> Result<(Option<String>, String, Expr), SyntaxError> {
    let mut p = ExprParser::new(tokenize(src, line)?, line);
    let first = p.ident("loop variable")?;
    let (key, value) = if p.eat(&Token::Comma) {
        (Some(first), p.ident("loop variable")?)
    } else {
        (None, first)
    };
    match p.next() {
        Some(Token::Ident(kw)) if kw == "in" => {}
        _ => return Err(SyntaxError::new(line, "expected `in` in `for` block")),
    }
    let iter = p.expr()?;
    p.finish()?;
    Ok((key, value, iter))
}

/// Parses a standalone expression (the inside of a tag).
pub(crate) fn parse_expression(src: &str, line: usize) -> Result<Expr, SyntaxError> {
    let tokens = tokenize(src, line)?;
    if tokens.is_empty() {
        return Err(SyntaxError::new(line, "empty tag"));
    }
    let mut p = ExprParser::new(tokens, line);
    let expr = p.expr()?;
    p.finish()?;
    Ok(expr)
}

/// Deepest nesting of parentheses, collections and `not` in one expression.
pub(crate) const MAX_NESTING: usize = 128;

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
    line: usize,
    depth: usize,
}

impl ExprParser {
    fn new(tokens: Vec<Token>, line: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            line,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(w)) if w == word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<(), SyntaxError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}", what)))
        }
    }

    fn ident(&mut self, what: &str) -> Result<String, SyntaxError> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(name),
            _ => Err(self.error(format!("expected {}", what))),
        }
    }

    fn finish(&self) -> Result<(), SyntaxError> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(self.error(format!("unexpected {:?}", token))),
        }
    }

    fn error(&self, message: String) -> SyntaxError {
        SyntaxError::new(self.line, message)
    }

    fn expr(&mut self) -> Result<Expr, SyntaxError> {
        self.nested(Self::or_expr)
    }

    /// Runs `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, SyntaxError>,
    ) -> Result<T, SyntaxError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(format!(
                "expression nested deeper than {} levels",
                MAX_NESTING
            )));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn or_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.and_expr()?;
        while self.eat_keyword("or") {
            let rhs = self.and_expr()?;
            lhs = binary(BinOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, SyntaxError> {
        let mut lhs = self.not_expr()?;
        while self.eat_keyword("and") {
            let rhs = self.not_expr()?;
            lhs = binary(BinOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr, SyntaxError> {
        if self.eat_keyword("not") {
            Ok(Expr::Not(Box::new(self.nested(Self::not_expr)?)))
        } else {
            self.cmp_expr()
        }
    }

    fn cmp_expr(&mut self) -> Result<Expr, SyntaxError> {
        let lhs = self.postfix()?;
        let op = if self.eat(&Token::EqEq) {
            BinOp::Eq
        } else if self.eat(&Token::NotEq) {
            BinOp::Ne
        } else {
            return Ok(lhs);
        };
        let rhs = self.postfix()?;
        Ok(binary(op, lhs, rhs))
    }

    fn postfix(&mut self) -> Result<Expr, SyntaxError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                let name = match self.next() {
                    Some(Token::Ident(name)) => name,
                    Some(Token::Int(i)) if i >= 0 => i.to_string(),
                    _ => return Err(self.error("expected attribute name after `.`".into())),
                };
                expr = Expr::Attr {
                    target: Box::new(expr),
                    name,
                };
            } else if self.eat(&Token::LBracket) {
                let index = self.expr()?;
                self.expect(Token::RBracket, "`]`")?;
                expr = Expr::Index {
                    target: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, SyntaxError> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Expr::Literal(Literal::Str(s))),
            Some(Token::Int(i)) => Ok(Expr::Literal(Literal::Int(i))),
            Some(Token::Float(f)) => Ok(Expr::Literal(Literal::Float(f))),
            Some(Token::Ident(name)) => {
                match name.as_str() {
                    "true" => return Ok(Expr::Literal(Literal::Bool(true))),
                    "false" => return Ok(Expr::Literal(Literal::Bool(false))),
                    "null" | "none" => return Ok(Expr::Literal(Literal::Null)),
                    "and" | "or" | "not" | "in" => {
                        return Err(self.error(format!("unexpected keyword `{}`", name)))
                    }
                    _ => {}
                }
                if self.eat(&Token::LParen) {
                    let args = self.list_items(Token::RParen, "`)`")?;
                    Ok(Expr::Call { name, args })
                } else {
                    Ok(Expr::Var(name))
                }
            }
            Some(Token::LParen) => {
                let inner = self.expr()?;
                self.expect(Token::RParen, "`)`")?;
                Ok(inner)
            }
            Some(Token::LBracket) => Ok(Expr::List(self.list_items(Token::RBracket, "`]`")?)),
            Some(Token::LBrace) => self.map_items(),
            Some(token) => Err(self.error(format!("unexpected {:?}", token))),
            None => Err(self.error("unexpected end of expression".into())),
        }
    }

    /// Comma separated expressions up to `close`; trailing comma allowed.
    fn list_items(&mut self, close: Token, what: &str) -> Result<Vec<Expr>, SyntaxError> {
        let mut items = Vec::new();
        loop {
            if self.eat(&close) {
                return Ok(items);
            }
            items.push(self.expr()?);
            if !self.eat(&Token::Comma) {
                self.expect(close, what)?;
                return Ok(items);
            }
        }
    }

    fn map_items(&mut self) -> Result<Expr, SyntaxError> {
        let mut entries = Vec::new();
        loop {
            if self.eat(&Token::RBrace) {
                return Ok(Expr::Map(entries));
            }
            let key = match self.next() {
                Some(Token::Str(key)) | Some(Token::Ident(key)) => key,
                _ => return Err(self.error("expected map key".into())),
            };
            self.expect(Token::Colon, "`:` after map key")?;
            entries.push((key, self.expr()?));
            if !self.eat(&Token::Comma) {
                self.expect(Token::RBrace, "`}`")?;
                return Ok(Expr::Map(entries));
            }
        }
    }
}

fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}
