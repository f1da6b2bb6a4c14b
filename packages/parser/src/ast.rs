use serde::{Deserialize, Serialize};

/// Span information for source location tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub id: String,
}

impl Span {
    pub fn new(start: usize, end: usize, id: String) -> Self {
        Self { start, end, id }
    }
}

/// Root document node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub nodes: Vec<Node>,
}

/// A node in the LaTeX syntax tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Node {
    /// Control sequence with its brace-delimited arguments:
    /// `\section{Intro}` → name "section", one arg
    Macro {
        name: String,
        /// Optional `[...]` argument, raw text
        options: Option<String>,
        args: Vec<Vec<Node>>,
        span: Span,
    },

    /// `\begin{name} ... \end{name}` block
    Environment {
        name: String,
        body: Vec<Node>,
        span: Span,
    },

    /// Bare `{ ... }` group; transparent to traversal
    Group { children: Vec<Node>, span: Span },

    /// Math region, raw content kept verbatim for the typesetter
    Math {
        content: String,
        display: bool,
        span: Span,
    },

    /// Plain text run (whitespace preserved)
    Text { content: String, span: Span },

    /// `% ...` comment
    Comment { content: String, span: Span },
}

impl Node {
    pub fn span(&self) -> &Span {
        match self {
            Node::Macro { span, .. }
            | Node::Environment { span, .. }
            | Node::Group { span, .. }
            | Node::Math { span, .. }
            | Node::Text { span, .. }
            | Node::Comment { span, .. } => span,
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Concatenated plain-text content of a node list, used for macro
    /// arguments that are expected to be textual (titles, emphasis).
    pub fn text_content(nodes: &[Node]) -> String {
        let mut out = String::new();
        collect_text(nodes, &mut out);
        out
    }
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text { content, .. } => out.push_str(content),
            Node::Group { children, .. } => collect_text(children, out),
            Node::Macro { args, .. } => {
                for arg in args {
                    collect_text(arg, out);
                }
            }
            Node::Environment { body, .. } => collect_text(body, out),
            Node::Math { .. } | Node::Comment { .. } => {}
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
