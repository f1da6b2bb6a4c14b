use crate::ast::*;
use crate::error::{ParseError, ParseResult};
use crate::node_ids::NodeIdAllocator;
use crate::lexer::{tokenize, Token};

/// Cap on group/environment nesting. Keeps traversal time bounded for
/// adversarial input (the preview contract requires bounded execution).
const MAX_DEPTH: usize = 96;

/// Maximum number of brace groups consumed as arguments of one macro.
const MAX_MACRO_ARGS: usize = 9;

/// Macros whose "argument" is the bare text run following them, the way
/// `\item First thing` carries its content without braces.
fn takes_trailing_text(name: &str) -> bool {
    name == "item"
}

/// Tolerant parser for the LaTeX subset.
///
/// The parser never rejects malformed structure: unclosed groups,
/// environments and math regions are closed at end of input, and stray
/// closing tokens are folded into text. The only hard error is exceeding
/// the nesting cap.
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token<'src>, std::ops::Range<usize>)>,
    pos: usize,
    depth: usize,
    ids: NodeIdAllocator,
}

/// Parse in-memory source with a synthetic document path.
pub fn parse(source: &str) -> ParseResult<Document> {
    parse_with_path(source, "/untitled.tex")
}

/// Parse source, deriving span IDs from `path`.
pub fn parse_with_path(source: &str, path: &str) -> ParseResult<Document> {
    Parser::new(source, NodeIdAllocator::for_path(path)).parse_document()
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str, ids: NodeIdAllocator) -> Self {
        Self {
            source,
            tokens: tokenize(source),
            pos: 0,
            depth: 0,
            ids,
        }
    }

    /// Parse a complete document
    pub fn parse_document(&mut self) -> ParseResult<Document> {
        let mut doc = Document::new();

        while !self.is_at_end() {
            match self.parse_node(false, false)? {
                Some(node) => doc.nodes.push(node),
                None => continue,
            }
        }

        Ok(doc)
    }

    /// Parse nodes until end of input, a group close (`in_group`) or an
    /// `\end` control sequence (`in_env`). The terminator itself is left
    /// for the caller.
    fn parse_nodes(&mut self, in_group: bool, in_env: bool) -> ParseResult<Vec<Node>> {
        let mut nodes = Vec::new();

        while let Some((token, _)) = self.peek() {
            match token {
                Token::RBrace if in_group => break,
                Token::Command("end") if in_env => break,
                _ => {}
            }
            if let Some(node) = self.parse_node(in_group, in_env)? {
                nodes.push(node);
            }
        }

        Ok(nodes)
    }

    fn parse_node(&mut self, in_group: bool, in_env: bool) -> ParseResult<Option<Node>> {
        let (token, range) = match self.peek() {
            Some(t) => (t.0.clone(), t.1.clone()),
            None => return Ok(None),
        };

        match token {
            Token::Text(_) | Token::Escaped(_) => Ok(Some(self.parse_text_run())),

            Token::Comment(content) => {
                self.advance();
                Ok(Some(Node::Comment {
                    content: content.to_string(),
                    span: self.span(range.start, range.end),
                }))
            }

            Token::Dollar => {
                self.advance();
                Ok(Some(self.parse_math(range, |t| *t == Token::Dollar, false)))
            }
            Token::DollarDollar => {
                self.advance();
                Ok(Some(
                    self.parse_math(range, |t| *t == Token::DollarDollar, true),
                ))
            }
            Token::InlineMathOpen => {
                self.advance();
                Ok(Some(
                    self.parse_math(range, |t| *t == Token::InlineMathClose, false),
                ))
            }
            Token::DisplayMathOpen => {
                self.advance();
                Ok(Some(
                    self.parse_math(range, |t| *t == Token::DisplayMathClose, true),
                ))
            }

            Token::LBrace => {
                self.advance();
                let group = self.parse_group(range.start)?;
                Ok(Some(group))
            }

            Token::Command("begin") => {
                self.advance();
                Ok(Some(self.parse_environment(range.start)?))
            }

            Token::Command("end") => {
                // Unmatched \end with nothing open: swallow it together
                // with its name group and move on.
                debug_assert!(!in_env);
                self.advance();
                self.parse_brace_text();
                Ok(None)
            }

            Token::Command(name) => {
                self.advance();
                Ok(Some(self.parse_macro(name, range)?))
            }

            // Stray structural tokens degrade to literal text
            Token::RBrace => {
                debug_assert!(!in_group);
                self.advance();
                Ok(Some(Node::Text {
                    content: "}".to_string(),
                    span: self.span(range.start, range.end),
                }))
            }
            Token::LBracket | Token::RBracket
            | Token::InlineMathClose | Token::DisplayMathClose => {
                self.advance();
                Ok(Some(Node::Text {
                    content: self.source[range.clone()].to_string(),
                    span: self.span(range.start, range.end),
                }))
            }
        }
    }

    /// Merge consecutive text and escaped-character tokens into one run.
    fn parse_text_run(&mut self) -> Node {
        let start = self.peek().map(|(_, r)| r.start).unwrap_or(0);
        let mut end = start;
        let mut content = String::new();

        while let Some((token, range)) = self.peek() {
            let piece = match token {
                Token::Text(s) => *s,
                Token::Escaped(c) => *c,
                _ => break,
            };
            end = range.end;
            content.push_str(piece);
            self.advance();
        }

        Node::Text {
            content,
            span: self.span(start, end),
        }
    }

    /// Collect raw source until the closing delimiter; unclosed math runs
    /// to end of input.
    fn parse_math(
        &mut self,
        open: std::ops::Range<usize>,
        is_close: impl Fn(&Token<'src>) -> bool,
        display: bool,
    ) -> Node {
        let content_start = open.end;
        let mut content_end = content_start;
        let mut end = open.end;

        while let Some((token, range)) = self.peek() {
            if is_close(token) {
                end = range.end;
                self.advance();
                break;
            }
            content_end = range.end;
            end = range.end;
            self.advance();
        }

        Node::Math {
            content: self.source[content_start..content_end].to_string(),
            display,
            span: self.span(open.start, end),
        }
    }

    fn parse_group(&mut self, start: usize) -> ParseResult<Node> {
        self.enter(start)?;
        let children = self.parse_nodes(true, false)?;
        self.depth -= 1;

        let end = match self.peek() {
            Some((Token::RBrace, range)) => {
                let end = range.end;
                self.advance();
                end
            }
            // Unclosed group: close at end of input
            _ => self.last_end(),
        };

        Ok(Node::Group {
            children,
            span: self.span(start, end),
        })
    }

    fn parse_environment(&mut self, start: usize) -> ParseResult<Node> {
        let name = self.parse_brace_text();

        self.enter(start)?;
        let body = self.parse_nodes(false, true)?;
        self.depth -= 1;

        // Consume the \end{...} if present. A mismatched name still closes
        // this environment; the unbalanced-input guard lives in the
        // transformer's frame stack.
        let end = match self.peek() {
            Some((Token::Command("end"), range)) => {
                let mut end = range.end;
                self.advance();
                if let Some(close_end) = self.brace_text_end() {
                    end = close_end;
                }
                end
            }
            _ => self.last_end(),
        };

        Ok(Node::Environment {
            name,
            body,
            span: self.span(start, end),
        })
    }

    fn parse_macro(
        &mut self,
        name: &str,
        range: std::ops::Range<usize>,
    ) -> ParseResult<Node> {
        let mut end = range.end;

        // Optional [...] argument, raw text
        let options = if matches!(self.peek(), Some((Token::LBracket, _))) {
            self.advance();
            let mut text = String::new();
            while let Some((token, r)) = self.peek() {
                if *token == Token::RBracket {
                    end = r.end;
                    self.advance();
                    break;
                }
                text.push_str(&self.source[r.clone()]);
                end = r.end;
                self.advance();
            }
            Some(text)
        } else {
            None
        };

        // Consecutive {...} groups become arguments
        let mut args = Vec::new();
        while args.len() < MAX_MACRO_ARGS {
            match self.peek() {
                Some((Token::LBrace, r)) => {
                    let group_start = r.start;
                    self.advance();
                    match self.parse_group(group_start)? {
                        Node::Group { children, span } => {
                            end = span.end;
                            args.push(children);
                        }
                        _ => unreachable!("parse_group returns Group"),
                    }
                }
                _ => break,
            }
        }

        // `\item First thing` style: the following text run is the argument
        if args.is_empty() && takes_trailing_text(name) {
            if let Some((Token::Text(s), _)) = self.peek() {
                if !s.trim().is_empty() {
                    let text = self.parse_text_run();
                    end = text.span().end;
                    args.push(vec![text]);
                }
            }
        }

        Ok(Node::Macro {
            name: name.to_string(),
            options,
            args,
            span: self.span(range.start, end),
        })
    }

    /// Read a `{name}` group as flat text, e.g. an environment name.
    /// Returns an empty string when the group is missing.
    fn parse_brace_text(&mut self) -> String {
        let mut text = String::new();
        if !matches!(self.peek(), Some((Token::LBrace, _))) {
            return text;
        }
        self.advance();
        while let Some((token, range)) = self.peek() {
            if *token == Token::RBrace {
                self.advance();
                break;
            }
            text.push_str(&self.source[range.clone()]);
            self.advance();
        }
        text.trim().to_string()
    }

    /// Like `parse_brace_text` but only reports the end offset.
    fn brace_text_end(&mut self) -> Option<usize> {
        if !matches!(self.peek(), Some((Token::LBrace, _))) {
            return None;
        }
        self.advance();
        let mut end = None;
        while let Some((token, range)) = self.peek() {
            let range_end = range.end;
            let done = *token == Token::RBrace;
            self.advance();
            end = Some(range_end);
            if done {
                break;
            }
        }
        end
    }

    fn enter(&mut self, pos: usize) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::too_deep(pos, MAX_DEPTH));
        }
        Ok(())
    }

    fn span(&mut self, start: usize, end: usize) -> Span {
        Span::new(start, end, self.ids.next_id())
    }

    fn peek(&self) -> Option<&(Token<'src>, std::ops::Range<usize>)> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn last_end(&self) -> usize {
        self.source.len()
    }
}
