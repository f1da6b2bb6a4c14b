//! Lexer for the LaTeX subset using logos
//!
//! Logos provides extremely fast lexing via compile-time DFA generation.
//! Whitespace is NOT skipped: text runs carry their spacing so the
//! transformer can decide what is a paragraph and what is noise.

use logos::Logos;

/// Token types for the LaTeX subset
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
pub enum Token<'src> {
    /// Control sequence: `\section`, `\textbf*`, ...
    #[regex(r"\\[a-zA-Z@]+\*?", |lex| &lex.slice()[1..])]
    Command(&'src str),

    /// Escaped single character: `\%`, `\{`, `\\`, ...
    #[regex(r"\\[^a-zA-Z@]", |lex| &lex.slice()[1..], priority = 1)]
    Escaped(&'src str),

    // Display math delimiters
    #[token("\\[", priority = 10)]
    DisplayMathOpen,
    #[token("\\]", priority = 10)]
    DisplayMathClose,

    // Inline math delimiters (LaTeX style)
    #[token("\\(", priority = 10)]
    InlineMathOpen,
    #[token("\\)", priority = 10)]
    InlineMathClose,

    // TeX math delimiters
    #[token("$$")]
    DollarDollar,
    #[token("$")]
    Dollar,

    // Grouping
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    /// Line comment: `% ...` to end of line
    #[regex(r"%[^\n]*", |lex| lex.slice())]
    Comment(&'src str),

    /// Everything else, including whitespace
    #[regex(r"[^\\{}\[\]$%]+", |lex| lex.slice())]
    Text(&'src str),
}

/// Lex source into tokens with byte spans.
///
/// Lexing never fails: a byte sequence the token grammar does not cover
/// (e.g. a trailing lone backslash) is folded into a `Text` token so the
/// parser always sees the whole input.
pub fn tokenize(source: &str) -> Vec<(Token<'_>, std::ops::Range<usize>)> {
    Token::lexer(source)
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => (token, span),
            Err(_) => (Token::Text(&source[span.clone()]), span),
        })
        .collect()
}
