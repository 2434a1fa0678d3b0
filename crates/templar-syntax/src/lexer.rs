//! Tokenizers for template source.
//!
//! Lexing happens at two levels. [`segments`] splits the raw source into
//! literal text and tags (`{{ }}`, `{% %}`, `{# #}`); [`tokenize`] then breaks
//! the inside of a single tag into expression tokens.

use crate::error::SyntaxError;

/// A chunk of template source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Text(&'a str),
    /// Inside of `{{ .. }}`
    Emit { body: &'a str, line: usize },
    /// Inside of `{% .. %}`
    Block { body: &'a str, line: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Emit,
    Block,
    Comment,
}

impl TagKind {
    fn from_marker(c: u8) -> Option<Self> {
        match c {
            b'{' => Some(TagKind::Emit),
            b'%' => Some(TagKind::Block),
            b'#' => Some(TagKind::Comment),
            _ => None,
        }
    }

    fn opener(self) -> &'static str {
        match self {
            TagKind::Emit => "{{",
            TagKind::Block => "{%",
            TagKind::Comment => "{#",
        }
    }

    fn closer(self) -> &'static str {
        match self {
            TagKind::Emit => "}}",
            TagKind::Block => "%}",
            TagKind::Comment => "#}",
        }
    }
}

/// Finds the next tag opener in `input`, returning its byte offset and kind.
fn find_opener(input: &str) -> Option<(usize, TagKind)> {
    let bytes = input.as_bytes();
    let mut from = 0;
    while let Some(rel) = input[from..].find('{') {
        let idx = from + rel;
        if let Some(kind) = bytes.get(idx + 1).copied().and_then(TagKind::from_marker) {
            return Some((idx, kind));
        }
        from = idx + 1;
    }
    None
}

/// Finds the closer of a tag whose body starts at the beginning of `input`.
///
/// In expression tags the closer only counts outside string literals and
/// outside `{ }` map literals, so `{{ f({a: {b: 1}}) }}` and `{{ e("}}") }}`
/// end at their last `}}`.
fn find_closer(input: &str, kind: TagKind) -> Option<usize> {
    let closer = kind.closer();
    if kind == TagKind::Comment {
        return input.find(closer);
    }

    let bytes = input.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == b'\\' {
                    i += 1;
                } else if b == q {
                    quote = None;
                }
            }
            None if depth == 0 && bytes[i..].starts_with(closer.as_bytes()) => return Some(i),
            None => match b {
                b'"' | b'\'' => quote = Some(b),
                b'{' => depth += 1,
                b'}' => depth = depth.saturating_sub(1),
                _ => {}
            },
        }
        i += 1;
    }
    None
}

/// Splits template source into text and tag segments.
///
/// A `-` right after an opener (`{{-`, `{%-`) strips whitespace at the end of
/// the preceding text; a `-` right before a closer (`-}}`, `-%}`) strips
/// whitespace at the start of the following text. Comments are dropped.
pub(crate) fn segments(source: &str) -> Result<Vec<Segment<'_>>, SyntaxError> {
    let mut out = Vec::new();
    let mut pos = 0;
    let mut line = 1;
    let mut trim_next = false;

    while pos < source.len() {
        let rest = &source[pos..];
        let Some((idx, kind)) = find_opener(rest) else {
            let text = if trim_next { rest.trim_start() } else { rest };
            if !text.is_empty() {
                out.push(Segment::Text(text));
            }
            break;
        };

        let inner_start = idx + 2;
        let trim_before = rest[inner_start..].starts_with('-');

        let mut text = &rest[..idx];
        if trim_next {
            text = text.trim_start();
        }
        if trim_before {
            text = text.trim_end();
        }
        if !text.is_empty() {
            out.push(Segment::Text(text));
        }

        line += rest[..idx].matches('\n').count();
        let tag_line = line;

        let body_start = inner_start + usize::from(trim_before);
        let Some(close_rel) = find_closer(&rest[body_start..], kind) else {
            return Err(SyntaxError::new(
                tag_line,
                format!("unclosed `{}` tag", kind.opener()),
            ));
        };
        let mut body = &rest[body_start..body_start + close_rel];
        let trim_after = body.ends_with('-');
        if trim_after {
            body = &body[..body.len() - 1];
        }
        line += body.matches('\n').count();

        match kind {
            TagKind::Emit => out.push(Segment::Emit {
                body,
                line: tag_line,
            }),
            TagKind::Block => out.push(Segment::Block {
                body,
                line: tag_line,
            }),
            TagKind::Comment => {}
        }

        pos += body_start + close_rel + kind.closer().len();
        trim_next = trim_after;
    }

    Ok(out)
}

/// Expression token.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    EqEq,
    NotEq,
}

/// Tokenizes the inside of a single tag.
pub(crate) fn tokenize(src: &str, line: usize) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' | ')' | '[' | ']' | '{' | '}' | ',' | ':' | '.' => {
                chars.next();
                tokens.push(match ch {
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    '[' => Token::LBracket,
                    ']' => Token::RBracket,
                    '{' => Token::LBrace,
                    '}' => Token::RBrace,
                    ',' => Token::Comma,
                    ':' => Token::Colon,
                    _ => Token::Dot,
                });
            }
            '=' | '!' => {
                chars.next();
                match chars.next() {
                    Some((_, '=')) if ch == '=' => tokens.push(Token::EqEq),
                    Some((_, '=')) => tokens.push(Token::NotEq),
                    _ => {
                        return Err(SyntaxError::new(
                            line,
                            format!("unexpected `{}`; did you mean `{}=`?", ch, ch),
                        ))
                    }
                }
            }
            '"' | '\'' => {
                chars.next();
                tokens.push(Token::Str(lex_string(&mut chars, ch, line)?));
            }
            c if c.is_ascii_digit() || c == '-' => {
                // A number directly after `.` is a path segment, never a float.
                let after_dot = matches!(tokens.last(), Some(Token::Dot));
                tokens.push(lex_number(src, start, &mut chars, after_dot, line)?);
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(src[start..end].to_string()));
            }
            other => {
                return Err(SyntaxError::new(
                    line,
                    format!("unexpected character `{}`", other),
                ))
            }
        }
    }

    Ok(tokens)
}

fn lex_string(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    quote: char,
    line: usize,
) -> Result<String, SyntaxError> {
    let mut value = String::new();
    while let Some((_, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => value.push('\n'),
                Some((_, 't')) => value.push('\t'),
                Some((_, 'r')) => value.push('\r'),
                Some((_, other)) => value.push(other),
                None => break,
            },
            c if c == quote => return Ok(value),
            c => value.push(c),
        }
    }
    Err(SyntaxError::new(line, "unterminated string literal"))
}

fn lex_number(
    src: &str,
    start: usize,
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    after_dot: bool,
    line: usize,
) -> Result<Token, SyntaxError> {
    let mut end = start;
    let mut seen_dot = false;

    if let Some(&(i, '-')) = chars.peek() {
        chars.next();
        end = i + 1;
        if !matches!(chars.peek(), Some((_, c)) if c.is_ascii_digit()) {
            return Err(SyntaxError::new(line, "unexpected character `-`"));
        }
    }

    while let Some(&(i, c)) = chars.peek() {
        if c.is_ascii_digit() {
            end = i + 1;
            chars.next();
        } else if c == '.' && !seen_dot && !after_dot {
            // Only a float if a digit follows the dot.
            let next_is_digit = src[i + 1..]
                .chars()
                .next()
                .is_some_and(|n| n.is_ascii_digit());
            if !next_is_digit {
                break;
            }
            seen_dot = true;
            end = i + 1;
            chars.next();
        } else {
            break;
        }
    }

    let text = &src[start..end];
    if seen_dot {
        text.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| SyntaxError::new(line, format!("invalid number `{}`", text)))
    } else {
        text.parse::<i64>()
            .map(Token::Int)
            .map_err(|_| SyntaxError::new(line, format!("invalid number `{}`", text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_map_stays_inside_emit_tag() {
        let segs = segments(r#"<{{ partial("item", {opts: {a: 1}}) }}>"#).unwrap();
        assert_eq!(
            segs,
            vec![
                Segment::Text("<"),
                Segment::Emit {
                    body: r#" partial("item", {opts: {a: 1}}) "#,
                    line: 1
                },
                Segment::Text(">"),
            ]
        );
    }

    #[test]
    fn closer_inside_string_is_ignored() {
        let segs = segments(r#"{{ e("}}") }}{% start('%}') %}{{ e("a\"}}") }}"#).unwrap();
        assert_eq!(
            segs,
            vec![
                Segment::Emit {
                    body: r#" e("}}") "#,
                    line: 1
                },
                Segment::Block {
                    body: " start('%}') ",
                    line: 1
                },
                Segment::Emit {
                    body: r#" e("a\"}}") "#,
                    line: 1
                },
            ]
        );
    }

    #[test]
    fn non_ascii_inside_tag() {
        let segs = segments("{{ café }}é").unwrap();
        assert_eq!(
            segs,
            vec![
                Segment::Emit {
                    body: " café ",
                    line: 1
                },
                Segment::Text("é"),
            ]
        );
    }

    #[test]
    fn unbalanced_quote_leaves_tag_unclosed() {
        let err = segments("{{ e(\"oops) }}").unwrap_err();
        assert!(err.message.contains("unclosed"));
    }

    #[test]
    fn plain_text_is_single_segment() {
        assert_eq!(
            segments("hello world").unwrap(),
            vec![Segment::Text("hello world")]
        );
    }

    #[test]
    fn tags_are_split_out() {
        let segs = segments("a{{ x }}b{% stop() %}c").unwrap();
        assert_eq!(
            segs,
            vec![
                Segment::Text("a"),
                Segment::Emit {
                    body: " x ",
                    line: 1
                },
                Segment::Text("b"),
                Segment::Block {
                    body: " stop() ",
                    line: 1
                },
                Segment::Text("c"),
            ]
        );
    }

    #[test]
    fn comments_are_dropped() {
        assert_eq!(
            segments("a{# note #}b").unwrap(),
            vec![Segment::Text("a"), Segment::Text("b")]
        );
    }

    #[test]
    fn lone_brace_is_text() {
        assert_eq!(
            segments("fn() { body }").unwrap(),
            vec![Segment::Text("fn() { body }")]
        );
    }

    #[test]
    fn line_numbers_track_newlines() {
        let segs = segments("one\ntwo\n{{ x }}\n{%\nstop()\n%}{{ y }}").unwrap();
        let lines: Vec<usize> = segs
            .iter()
            .filter_map(|s| match s {
                Segment::Emit { line, .. } | Segment::Block { line, .. } => Some(*line),
                Segment::Text(_) => None,
            })
            .collect();
        assert_eq!(lines, vec![3, 4, 6]);
    }

    #[test]
    fn trim_markers_strip_whitespace() {
        let segs = segments("a  \n{%- stop() -%}\n  b").unwrap();
        assert_eq!(segs[0], Segment::Text("a"));
        assert_eq!(segs[2], Segment::Text("b"));
    }

    #[test]
    fn unclosed_tag_is_error() {
        let err = segments("line\n{{ oops").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("{{"));
    }

    #[test]
    fn tokenize_call() {
        let tokens = tokenize(r#"e(title, "upper|trim")"#, 1).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("e".into()),
                Token::LParen,
                Token::Ident("title".into()),
                Token::Comma,
                Token::Str("upper|trim".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn tokenize_numbers() {
        assert_eq!(tokenize("42", 1).unwrap(), vec![Token::Int(42)]);
        assert_eq!(tokenize("-3", 1).unwrap(), vec![Token::Int(-3)]);
        assert_eq!(tokenize("1.5", 1).unwrap(), vec![Token::Float(1.5)]);
    }

    #[test]
    fn numeric_path_segments_stay_integers() {
        let tokens = tokenize("items.0.1", 1).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("items".into()),
                Token::Dot,
                Token::Int(0),
                Token::Dot,
                Token::Int(1),
            ]
        );
    }

    #[test]
    fn string_escapes() {
        assert_eq!(
            tokenize(r#"'it\'s\n'"#, 1).unwrap(),
            vec![Token::Str("it's\n".into())]
        );
    }

    #[test]
    fn unterminated_string_is_error() {
        assert!(tokenize("\"abc", 4).unwrap_err().line == 4);
    }

    #[test]
    fn single_equals_is_error() {
        assert!(tokenize("a = b", 1).is_err());
    }
}
