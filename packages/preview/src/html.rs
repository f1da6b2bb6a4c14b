use crate::math::escape_html;
use crate::render::RenderNode;

/// Options for HTML serialization
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Pretty print with one element per line
    pub pretty: bool,
    /// Indentation string
    pub indent: String,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            pretty: true,
            indent: "  ".to_string(),
        }
    }
}

struct Context {
    options: SerializeOptions,
    depth: usize,
    buffer: String,
}

impl Context {
    fn new(options: SerializeOptions) -> Self {
        Self {
            options,
            depth: 0,
            buffer: String::new(),
        }
    }

    fn add(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn add_line(&mut self, text: &str) {
        if self.options.pretty {
            for _ in 0..self.depth {
                self.buffer.push_str(&self.options.indent);
            }
        }
        self.add(text);
        if self.options.pretty {
            self.add("\n");
        }
    }
}

fn is_void_element(tag: &str) -> bool {
    matches!(tag, "br" | "hr" | "img" | "meta" | "link" | "input")
}

/// Serialize a render tree to an HTML fragment.
pub fn serialize(node: &RenderNode, options: SerializeOptions) -> String {
    let mut ctx = Context::new(options);
    serialize_node(node, &mut ctx);
    ctx.buffer
}

/// Serialize with default options.
pub fn to_html(node: &RenderNode) -> String {
    serialize(node, SerializeOptions::default())
}

/// Wrap a render tree in a minimal standalone page.
pub fn to_page(title: &str, node: &RenderNode) -> String {
    let body = to_html(node);
    format!(
        "<!doctype html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_html(title),
        body
    )
}

fn serialize_node(node: &RenderNode, ctx: &mut Context) {
    match node {
        RenderNode::Element {
            tag,
            attributes,
            children,
        } => {
            let mut open = format!("<{}", tag);
            for (key, value) in attributes {
                open.push_str(&format!(" {}=\"{}\"", key, escape_html(value)));
            }

            if is_void_element(tag) {
                open.push_str("/>");
                ctx.add_line(&open);
                return;
            }
            open.push('>');

            if children.is_empty() {
                ctx.add_line(&format!("{}</{}>", open, tag));
                return;
            }

            // Single text child collapses onto one line
            if let [RenderNode::Text { value }] = children.as_slice() {
                ctx.add_line(&format!("{}{}</{}>", open, escape_html(value), tag));
                return;
            }

            ctx.add_line(&open);
            ctx.depth += 1;
            for child in children {
                serialize_node(child, ctx);
            }
            ctx.depth -= 1;
            ctx.add_line(&format!("</{}>", tag));
        }

        RenderNode::Text { value } => {
            ctx.add_line(&escape_html(value));
        }

        // Typesetter output is trusted markup, emitted verbatim
        RenderNode::Raw { value } => {
            ctx.add_line(value);
        }

        RenderNode::ErrorMarker { message } => {
            ctx.add_line(&format!(
                "<span class=\"error-marker\">{}</span>",
                escape_html(message)
            ));
        }
    }
}
