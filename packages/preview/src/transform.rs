//! AST → render tree transformation.
//!
//! The transformer walks the parsed document with paired enter/leave
//! events and builds the preview render tree. Its contract: `render` is a
//! total function. Any internal failure degrades to a localized
//! `ErrorMarker` node and the rest of the document still renders.
//!
//! Traversal state is an explicit stack of environment frames seeded with
//! one root frame, so the stack can never underflow regardless of how
//! unbalanced the input markup is. Macro dispatch goes through an
//! immutable handler table built once per transformer; there is no global
//! registry.

use std::collections::HashMap;

use texforge_parser::ast::{Document, Node};
use texforge_parser::parse;
use tracing::debug;

use crate::math::{BasicMathRenderer, MathRenderer};
use crate::render::RenderNode;

/// Macro kinds the preview understands. Anything that does not classify
/// into one of these is skipped (forward compatibility over strictness).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroKind {
    Title,
    Author,
    Date,
    MakeTitle,
    Section,
    Subsection,
    TextBf,
    TextIt,
    Item,
}

impl MacroKind {
    /// Classify a control-sequence name; starred variants classify like
    /// their base form.
    pub fn classify(name: &str) -> Option<Self> {
        match name.trim_end_matches('*') {
            "title" => Some(Self::Title),
            "author" => Some(Self::Author),
            "date" => Some(Self::Date),
            "maketitle" => Some(Self::MakeTitle),
            "section" => Some(Self::Section),
            "subsection" => Some(Self::Subsection),
            "textbf" => Some(Self::TextBf),
            "textit" => Some(Self::TextIt),
            "item" => Some(Self::Item),
            _ => None,
        }
    }
}

/// Block environments that open a new container frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Root,
    Itemize,
    Enumerate,
}

impl FrameKind {
    pub fn classify(env_name: &str) -> Option<Self> {
        match env_name {
            "itemize" => Some(Self::Itemize),
            "enumerate" => Some(Self::Enumerate),
            _ => None,
        }
    }

    fn container_tag(self) -> &'static str {
        match self {
            FrameKind::Root => "div",
            FrameKind::Itemize => "ul",
            FrameKind::Enumerate => "ol",
        }
    }
}

/// Stack entry while building nested block structures.
struct EnvironmentFrame {
    kind: FrameKind,
    container: RenderNode,
}

/// Accumulated `\title`/`\author`/`\date` metadata, consumed by
/// `\maketitle` wherever it occurs in the document.
#[derive(Default)]
struct TitleData {
    title: Option<String>,
    author: Option<String>,
    date: Option<String>,
}

/// Mutable traversal state: the frame stack plus the metadata side table.
struct WalkState {
    frames: Vec<EnvironmentFrame>,
    title_data: TitleData,
}

impl WalkState {
    fn new() -> Self {
        let root = EnvironmentFrame {
            kind: FrameKind::Root,
            container: RenderNode::element("div").with_attr("class", "document"),
        };
        Self {
            frames: vec![root],
            title_data: TitleData::default(),
        }
    }

    /// Append a node to the container of the current top frame.
    fn append(&mut self, node: RenderNode) {
        if let Some(frame) = self.frames.last_mut() {
            frame.container.push_child(node);
        }
    }

    fn push_frame(&mut self, kind: FrameKind) {
        self.frames.push(EnvironmentFrame {
            kind,
            container: RenderNode::element(kind.container_tag()),
        });
    }

    /// Leave event for a block environment. Closing a kind that does not
    /// match the current top frame is a no-op, and the root frame is never
    /// popped: depth stays >= 1 for any open/close sequence.
    fn pop_frame(&mut self, kind: FrameKind) {
        if self.frames.len() <= 1 {
            debug!(?kind, "ignoring environment close on root frame");
            return;
        }
        if self.frames.last().map(|f| f.kind) != Some(kind) {
            debug!(?kind, "ignoring unbalanced environment close");
            return;
        }
        if let Some(frame) = self.frames.pop() {
            self.append(frame.container);
        }
    }

    /// Fold any frames left open back into the root container.
    fn finish(mut self) -> RenderNode {
        while self.frames.len() > 1 {
            if let Some(frame) = self.frames.pop() {
                self.append(frame.container);
            }
        }
        match self.frames.pop() {
            Some(root) => root.container,
            // Unreachable: the root frame is never popped during the walk.
            None => RenderNode::element("div").with_attr("class", "document"),
        }
    }

    fn depth(&self) -> usize {
        self.frames.len()
    }
}

type MacroHandler = fn(&mut WalkState, &[Vec<Node>]);

/// Immutable `MacroKind -> handler` mapping, built once per transformer
/// and never mutated afterwards.
struct HandlerTable {
    entries: HashMap<MacroKind, MacroHandler>,
}

impl HandlerTable {
    fn build() -> Self {
        let mut entries: HashMap<MacroKind, MacroHandler> = HashMap::new();
        entries.insert(MacroKind::Title, handle_title);
        entries.insert(MacroKind::Author, handle_author);
        entries.insert(MacroKind::Date, handle_date);
        entries.insert(MacroKind::MakeTitle, handle_maketitle);
        entries.insert(MacroKind::Section, handle_section);
        entries.insert(MacroKind::Subsection, handle_subsection);
        entries.insert(MacroKind::TextBf, handle_textbf);
        entries.insert(MacroKind::TextIt, handle_textit);
        entries.insert(MacroKind::Item, handle_item);
        Self { entries }
    }

    fn get(&self, kind: MacroKind) -> Option<MacroHandler> {
        self.entries.get(&kind).copied()
    }
}

fn first_arg_text(args: &[Vec<Node>]) -> String {
    args.first()
        .map(|arg| Document::text_content(arg))
        .unwrap_or_default()
}

fn all_args_text(args: &[Vec<Node>]) -> String {
    args.iter().map(|arg| Document::text_content(arg)).collect()
}

fn handle_title(state: &mut WalkState, args: &[Vec<Node>]) {
    state.title_data.title = Some(all_args_text(args));
}

fn handle_author(state: &mut WalkState, args: &[Vec<Node>]) {
    state.title_data.author = Some(all_args_text(args));
}

fn handle_date(state: &mut WalkState, args: &[Vec<Node>]) {
    state.title_data.date = Some(all_args_text(args));
}

/// Synthesize the title block from the side table at the point where
/// `\maketitle` occurs. Missing metadata renders as empty strings.
fn handle_maketitle(state: &mut WalkState, _args: &[Vec<Node>]) {
    let title = state.title_data.title.clone().unwrap_or_default();
    let author = state.title_data.author.clone().unwrap_or_default();
    let date = state.title_data.date.clone().unwrap_or_default();

    let block = RenderNode::element("div")
        .with_attr("class", "maketitle")
        .with_child(RenderNode::element("h1").with_child(RenderNode::text(title)))
        .with_child(
            RenderNode::element("p")
                .with_attr("class", "author")
                .with_child(RenderNode::text(author)),
        )
        .with_child(
            RenderNode::element("p")
                .with_attr("class", "date")
                .with_child(RenderNode::text(date)),
        );
    state.append(block);
}

fn handle_section(state: &mut WalkState, args: &[Vec<Node>]) {
    let heading =
        RenderNode::element("h2").with_child(RenderNode::text(first_arg_text(args)));
    state.append(heading);
}

fn handle_subsection(state: &mut WalkState, args: &[Vec<Node>]) {
    let heading =
        RenderNode::element("h3").with_child(RenderNode::text(first_arg_text(args)));
    state.append(heading);
}

fn handle_textbf(state: &mut WalkState, args: &[Vec<Node>]) {
    state.append(
        RenderNode::element("strong").with_child(RenderNode::text(first_arg_text(args))),
    );
}

fn handle_textit(state: &mut WalkState, args: &[Vec<Node>]) {
    state.append(RenderNode::element("em").with_child(RenderNode::text(first_arg_text(args))));
}

fn handle_item(state: &mut WalkState, args: &[Vec<Node>]) {
    let content = all_args_text(args);
    state.append(
        RenderNode::element("li").with_child(RenderNode::text(content.trim().to_string())),
    );
}

/// The preview transformer.
///
/// Holds the handler table and the math collaborator; stateless across
/// renders, so one transformer can serve any number of documents.
pub struct Transformer<M = BasicMathRenderer> {
    math: M,
    handlers: HandlerTable,
}

impl Transformer<BasicMathRenderer> {
    pub fn new() -> Self {
        Self::with_math_renderer(BasicMathRenderer::new())
    }
}

impl Default for Transformer<BasicMathRenderer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: MathRenderer> Transformer<M> {
    pub fn with_math_renderer(math: M) -> Self {
        Self {
            math,
            handlers: HandlerTable::build(),
        }
    }

    pub fn math_renderer(&self) -> &M {
        &self.math
    }

    /// Render source text into a render tree. Total function: parse
    /// failures become an inline error marker under the root instead of an
    /// error return, and per-node failures never abort the walk.
    pub fn render(&self, source: &str) -> RenderNode {
        match parse(source) {
            Ok(doc) => self.transform(&doc),
            Err(err) => {
                debug!(error = %err, "preview parse failed");
                RenderNode::element("div")
                    .with_attr("class", "document")
                    .with_child(RenderNode::error(format!("Preview failed: {}", err)))
            }
        }
    }

    /// Transform an already-parsed document.
    pub fn transform(&self, doc: &Document) -> RenderNode {
        let mut state = WalkState::new();
        self.walk(&doc.nodes, &mut state);
        debug_assert!(state.depth() >= 1);
        state.finish()
    }

    fn walk(&self, nodes: &[Node], state: &mut WalkState) {
        for node in nodes {
            self.enter_node(node, state);
        }
    }

    /// Enter event for one AST node; container environments recurse and
    /// issue their own leave event.
    fn enter_node(&self, node: &Node, state: &mut WalkState) {
        match node {
            Node::Macro { name, args, .. } => match MacroKind::classify(name) {
                Some(kind) => {
                    if let Some(handler) = self.handlers.get(kind) {
                        handler(state, args);
                    }
                }
                None => debug!(name = %name, "skipping unknown macro"),
            },

            Node::Text { content, .. } => {
                if !content.trim().is_empty() {
                    state.append(
                        RenderNode::element("p")
                            .with_child(RenderNode::text(content.trim().to_string())),
                    );
                }
            }

            Node::Math {
                content, display, ..
            } => match self.math.render(content, *display) {
                Ok(markup) => state.append(RenderNode::raw(markup)),
                // Isolated per node: the rest of the walk continues.
                Err(err) => state.append(RenderNode::error(err.to_string())),
            },

            // Bare groups are transparent to traversal
            Node::Group { children, .. } => self.walk(children, state),

            Node::Environment { name, body, .. } => match FrameKind::classify(name) {
                Some(kind) => {
                    state.push_frame(kind);
                    self.walk(body, state);
                    state.pop_frame(kind);
                }
                None => {
                    // Unknown environments render their content in place
                    debug!(name = %name, "unknown environment, no frame");
                    self.walk(body, state);
                }
            },

            Node::Comment { .. } => {}
        }
    }
}

/// Render source with the built-in math renderer. The everyday entry
/// point: `render(source) -> RenderNode`, never panics.
pub fn render(source: &str) -> RenderNode {
    Transformer::new().render(source)
}
