/// Structural tests for the AST → render tree transformation.
use crate::render::RenderNode;
use crate::transform::render;

fn children(node: &RenderNode) -> &[RenderNode] {
    node.children()
}

fn find_by_tag<'a>(node: &'a RenderNode, tag: &str) -> Vec<&'a RenderNode> {
    let mut found = Vec::new();
    collect_by_tag(node, tag, &mut found);
    found
}

fn collect_by_tag<'a>(node: &'a RenderNode, tag: &str, out: &mut Vec<&'a RenderNode>) {
    if node.tag() == Some(tag) {
        out.push(node);
    }
    for child in node.children() {
        collect_by_tag(child, tag, out);
    }
}

#[test]
fn test_empty_input_produces_empty_tree() {
    let tree = render("");
    assert_eq!(tree.tag(), Some("div"));
    assert!(children(&tree).is_empty());
}

#[test]
fn test_whitespace_only_produces_empty_tree() {
    let tree = render("  \n\t  \n");
    assert!(children(&tree).is_empty());
}

#[test]
fn test_plain_text_becomes_paragraph() {
    let tree = render("Hello world");
    let paragraphs = find_by_tag(&tree, "p");
    assert_eq!(paragraphs.len(), 1);
    assert_eq!(paragraphs[0].text_content(), "Hello world");
}

#[test]
fn test_section_and_subsection_levels() {
    let tree = render("\\section{First}\n\\subsection{Nested}");
    let h2 = find_by_tag(&tree, "h2");
    let h3 = find_by_tag(&tree, "h3");
    assert_eq!(h2.len(), 1);
    assert_eq!(h2[0].text_content(), "First");
    assert_eq!(h3.len(), 1);
    assert_eq!(h3[0].text_content(), "Nested");
}

#[test]
fn test_emphasis_macros() {
    let tree = render(r"\textbf{bold} \textit{italic}");
    assert_eq!(find_by_tag(&tree, "strong")[0].text_content(), "bold");
    assert_eq!(find_by_tag(&tree, "em")[0].text_content(), "italic");
}

#[test]
fn test_itemize_builds_unordered_list() {
    let tree = render("\\begin{itemize}\n\\item First\n\\item Second\n\\end{itemize}");
    let lists = find_by_tag(&tree, "ul");
    assert_eq!(lists.len(), 1);
    let items = find_by_tag(lists[0], "li");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].text_content(), "First");
    assert_eq!(items[1].text_content(), "Second");
}

#[test]
fn test_enumerate_builds_ordered_list() {
    let tree = render("\\begin{enumerate}\\item one\\end{enumerate}");
    assert_eq!(find_by_tag(&tree, "ol").len(), 1);
    assert_eq!(find_by_tag(&tree, "ul").len(), 0);
}

#[test]
fn test_nested_lists() {
    let source = "\\begin{itemize}\\item outer\\begin{enumerate}\\item inner\\end{enumerate}\\end{itemize}";
    let tree = render(source);
    let uls = find_by_tag(&tree, "ul");
    assert_eq!(uls.len(), 1);
    // The ordered list nests inside the unordered one
    assert_eq!(find_by_tag(uls[0], "ol").len(), 1);
}

#[test]
fn test_maketitle_synthesizes_title_block() {
    let source = "\\title{My Doc}\n\\author{Ada}\n\\date{2024}\n\\maketitle";
    let tree = render(source);

    let blocks = find_by_tag(&tree, "div");
    let maketitle = blocks
        .iter()
        .find(|n| match n {
            RenderNode::Element { attributes, .. } => {
                attributes.get("class").map(String::as_str) == Some("maketitle")
            }
            _ => false,
        })
        .expect("maketitle block present");

    assert_eq!(find_by_tag(maketitle, "h1")[0].text_content(), "My Doc");
    let text = maketitle.text_content();
    assert!(text.contains("Ada"));
    assert!(text.contains("2024"));
}

#[test]
fn test_maketitle_position_follows_occurrence() {
    // Metadata accumulates first, the block appears where \maketitle is
    let source = "intro text\n\n\\title{Late}\n\\maketitle";
    let tree = render(source);
    let kids = children(&tree);
    assert_eq!(kids[0].tag(), Some("p"));
    assert!(matches!(
        kids.last(),
        Some(RenderNode::Element { attributes, .. })
            if attributes.get("class").map(String::as_str) == Some("maketitle")
    ));
}

#[test]
fn test_maketitle_without_metadata_is_empty_strings() {
    let tree = render("\\maketitle");
    let h1 = find_by_tag(&tree, "h1");
    assert_eq!(h1.len(), 1);
    assert_eq!(h1[0].text_content(), "");
}

#[test]
fn test_inline_math_embeds_markup() {
    let tree = render("$E=mc^2$");
    let kids = children(&tree);
    assert_eq!(kids.len(), 1);
    match &kids[0] {
        RenderNode::Raw { value } => {
            assert!(value.contains("math-inline"));
            assert!(value.contains("E=mc^2"));
        }
        other => panic!("Expected raw math markup, got {:?}", other),
    }
}

#[test]
fn test_display_math_markup() {
    let tree = render(r"\[ \sum x \]");
    match &children(&tree)[0] {
        RenderNode::Raw { value } => assert!(value.contains("math-display")),
        other => panic!("Expected raw math markup, got {:?}", other),
    }
}

#[test]
fn test_unknown_macro_is_skipped() {
    let tree = render(r"\weirdmacro{stuff} after");
    // Only the trailing text survives
    let paragraphs = find_by_tag(&tree, "p");
    assert_eq!(paragraphs.len(), 1);
    assert_eq!(paragraphs[0].text_content(), "after");
}

#[test]
fn test_unknown_environment_renders_children() {
    let tree = render("\\begin{center}inside\\end{center}");
    let paragraphs = find_by_tag(&tree, "p");
    assert_eq!(paragraphs.len(), 1);
    assert_eq!(paragraphs[0].text_content(), "inside");
}

#[test]
fn test_comments_are_dropped() {
    let tree = render("% just a comment\nvisible");
    assert_eq!(find_by_tag(&tree, "p").len(), 1);
    assert_eq!(tree.text_content().trim(), "visible");
}

#[test]
fn test_full_document_shape() {
    let source = r"\documentclass{article}
\title{Sample}
\author{Team}
\date{\today}
\begin{document}
\maketitle
\section{Introduction}
Body text with $x^2$ math.
\begin{itemize}
\item First item
\item Second item
\end{itemize}
\end{document}";

    let tree = render(source);
    assert_eq!(find_by_tag(&tree, "h1").len(), 1);
    assert_eq!(find_by_tag(&tree, "h2").len(), 1);
    assert_eq!(find_by_tag(&tree, "ul").len(), 1);
    assert_eq!(find_by_tag(&tree, "li").len(), 2);
    assert!(find_by_tag(&tree, "p").len() >= 1);
}
