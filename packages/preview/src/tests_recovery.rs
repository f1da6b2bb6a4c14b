/// Tests for the degradation contract: `render` never fails outright, any
/// local fault turns into an inline marker and the rest of the document
/// still renders.
use crate::math::{MathRenderError, MathRenderer};
use crate::render::RenderNode;
use crate::transform::{render, Transformer};

fn count_errors(node: &RenderNode) -> usize {
    let mut count = usize::from(node.is_error());
    for child in node.children() {
        count += count_errors(child);
    }
    count
}

fn count_tag(node: &RenderNode, tag: &str) -> usize {
    let mut count = usize::from(node.tag() == Some(tag));
    for child in node.children() {
        count += count_tag(child, tag);
    }
    count
}

#[test]
fn test_bad_math_becomes_inline_marker() {
    let tree = render(r"before $\badcmd{x}$ after");

    assert_eq!(count_errors(&tree), 1);
    // Surrounding content still renders
    let text = tree.text_content();
    assert!(text.contains("before"));
    assert!(text.contains("after"));
}

#[test]
fn test_one_bad_math_node_does_not_poison_others() {
    let tree = render(r"$a+b$ $\badcmd{x}$ $c+d$");
    assert_eq!(count_errors(&tree), 1);

    let raw_count = tree
        .children()
        .iter()
        .filter(|n| matches!(n, RenderNode::Raw { .. }))
        .count();
    assert_eq!(raw_count, 2);
}

#[test]
fn test_unbalanced_close_is_soft_ignored() {
    let tree = render("text \\end{itemize} more text");
    assert_eq!(count_errors(&tree), 0);
    assert!(tree.text_content().contains("more text"));
}

#[test]
fn test_unclosed_environment_still_renders() {
    let tree = render("\\begin{itemize}\\item dangling");
    assert_eq!(count_tag(&tree, "ul"), 1);
    assert_eq!(count_tag(&tree, "li"), 1);
}

#[test]
fn test_deeply_nested_input_degrades_to_marker() {
    // Exceeds the parser's nesting cap; the preview stays total
    let source = "{".repeat(200);
    let tree = render(&source);
    assert_eq!(count_errors(&tree), 1);
}

#[test]
fn test_never_panics_on_garbage() {
    for source in [
        "",
        "\\",
        "}}}}{{{{",
        "$",
        "$$",
        "\\begin{itemize}",
        "\\end{enumerate}\\end{itemize}",
        "\\begin{itemize}\\end{enumerate}",
        "% only a comment",
        "\\textbf",
        "\\item",
        "\u{FEFF}\\section{bom}",
    ] {
        let tree = render(source);
        // A root element always comes back
        assert_eq!(tree.tag(), Some("div"), "source: {:?}", source);
    }
}

#[test]
fn test_mismatched_environment_pair_keeps_depth() {
    // \begin{itemize} ... \end{enumerate}: the parser closes the open
    // environment, the frame guard ignores the stray kind; no underflow,
    // no error markers.
    let tree = render("\\begin{itemize}\\item a\\end{enumerate} tail");
    assert_eq!(count_errors(&tree), 0);
    assert_eq!(count_tag(&tree, "ul"), 1);
    assert!(tree.text_content().contains("tail"));
}

/// Math collaborator that always fails, to exercise isolation.
struct FailingMath;

impl MathRenderer for FailingMath {
    fn render(&self, _expression: &str, _display: bool) -> Result<String, MathRenderError> {
        Err(MathRenderError::UnsupportedCommand {
            command: "anything".to_string(),
        })
    }
}

#[test]
fn test_custom_math_renderer_failures_are_isolated() {
    let transformer = Transformer::with_math_renderer(FailingMath);
    let tree = transformer.render("one $x$ two $y$ three");

    assert_eq!(count_errors(&tree), 2);
    let text = tree.text_content();
    assert!(text.contains("one"));
    assert!(text.contains("three"));
}

/// Math collaborator that records call order, to check display-mode wiring.
struct RecordingMath(std::cell::RefCell<Vec<(String, bool)>>);

impl MathRenderer for RecordingMath {
    fn render(&self, expression: &str, display: bool) -> Result<String, MathRenderError> {
        self.0.borrow_mut().push((expression.to_string(), display));
        Ok(String::from("<span class=\"math\"></span>"))
    }
}

#[test]
fn test_display_mode_reaches_collaborator() {
    let recorder = RecordingMath(Default::default());
    let transformer = Transformer::with_math_renderer(recorder);
    transformer.render(r"$inline$ \[block\]");

    let calls = transformer_calls(&transformer);
    assert_eq!(calls.len(), 2);
    assert!(!calls[0].1);
    assert!(calls[1].1);
}

fn transformer_calls(t: &Transformer<RecordingMath>) -> Vec<(String, bool)> {
    t.math_renderer().0.borrow().clone()
}
