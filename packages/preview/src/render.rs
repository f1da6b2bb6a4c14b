use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A node in the local render tree.
///
/// The render tree is the instant, approximate preview structure, distinct
/// from the authoritative compiled artifact. It is finite, acyclic and
/// single-rooted; errors are represented inline instead of aborting the
/// render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RenderNode {
    /// HTML-like element
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        children: Vec<RenderNode>,
    },

    /// Text node (escaped on serialization)
    Text { value: String },

    /// Pre-rendered markup embedded verbatim (math typesetter output)
    Raw { value: String },

    /// Localized failure, shown inline instead of crashing the preview
    ErrorMarker { message: String },
}

impl RenderNode {
    pub fn element(tag: impl Into<String>) -> Self {
        RenderNode::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        RenderNode::Text {
            value: value.into(),
        }
    }

    pub fn raw(value: impl Into<String>) -> Self {
        RenderNode::Raw {
            value: value.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        RenderNode::ErrorMarker {
            message: message.into(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        if let RenderNode::Element {
            ref mut attributes, ..
        } = self
        {
            attributes.insert(key.into(), value.into());
        }
        self
    }

    pub fn with_child(mut self, child: RenderNode) -> Self {
        if let RenderNode::Element {
            ref mut children, ..
        } = self
        {
            children.push(child);
        }
        self
    }

    pub fn with_children(mut self, new_children: Vec<RenderNode>) -> Self {
        if let RenderNode::Element {
            ref mut children, ..
        } = self
        {
            children.extend(new_children);
        }
        self
    }

    /// Append a child in place. No-op on non-element nodes.
    pub fn push_child(&mut self, child: RenderNode) {
        if let RenderNode::Element {
            ref mut children, ..
        } = self
        {
            children.push(child);
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            RenderNode::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn children(&self) -> &[RenderNode] {
        match self {
            RenderNode::Element { children, .. } => children,
            _ => &[],
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RenderNode::ErrorMarker { .. })
    }

    /// Concatenated text content of this subtree (raw markup excluded).
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            RenderNode::Text { value } => out.push_str(value),
            RenderNode::Element { children, .. } => {
                for child in children {
                    child.collect_text(out);
                }
            }
            RenderNode::Raw { .. } | RenderNode::ErrorMarker { .. } => {}
        }
    }
}
