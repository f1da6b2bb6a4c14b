//! Source normalization: best-effort rewriting of arbitrary (often
//! AI-generated) markup into source that is structurally safe to hand to a
//! compile provider.
//!
//! Normalization is total and deterministic in `(raw_text, engine)`; it
//! never fails, it only rewrites. Directives that would reach out to the
//! network or the local filesystem are neutralized into inert comments so
//! a remote compile cannot fail on resources outside our control.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::engine::Engine;

/// Normalized source, guaranteed to carry exactly one structural envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedSource {
    pub text: String,
    /// Whether the normalized text carries a document envelope. Holds by
    /// construction: fragments get wrapped.
    pub envelope_present: bool,
}

// Bare fences only: a language tag is dropped separately, and only at the
// start of the content, so a closing fence glued to a word keeps the word.
static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new("```").unwrap());
static LEADING_LANG_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(?:latex|tex)\s*\n").unwrap());
static REMOTE_GRAPHICS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\\includegraphics\s*(?:\[[^\]]*\])?\s*\{\s*https?:[^}]*\}").unwrap()
});
static FILE_INCLUSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\\(?:input|include)\s*\{[^}]*\}").unwrap());
static INPUTENC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\\usepackage\s*(?:\[[^\]]*\])?\s*\{\s*inputenc\s*\}").unwrap());
static FONTSPEC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\\usepackage\s*(?:\[[^\]]*\])?\s*\{\s*fontspec\s*\}").unwrap());
static SETMAINFONT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\\setmainfont\s*\{[^}]*\}").unwrap());
static DOCUMENTCLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\documentclass").unwrap());

const REMOTE_GRAPHICS_NOTE: &str = "% external image removed";
const FILE_INCLUSION_NOTE: &str = "% file inclusion removed";
const INPUTENC_NOTE: &str = "% inputenc removed for native-font engine";
const FONTSPEC_NOTE: &str = "% fontspec removed for pdflatex";
const SETMAINFONT_NOTE: &str = "% setmainfont removed for pdflatex";

/// Whether the text already carries a document envelope. This is the
/// wrap decision `normalize` applies: callers can use it on the raw
/// input to tell whether normalization added the envelope.
pub fn has_envelope(text: &str) -> bool {
    DOCUMENTCLASS.is_match(text)
}

/// Normalize raw source for the given engine. Never fails.
pub fn normalize(raw: &str, engine: Engine) -> NormalizedSource {
    // Byte-order marker
    let mut text = raw.trim_start_matches('\u{FEFF}').to_string();

    // Markdown fences and a leading bare language-tag line
    text = FENCE.replace_all(&text, "").into_owned();
    text = LEADING_LANG_TAG.replace(&text, "").into_owned();

    // Neutralize network/file directives
    text = REMOTE_GRAPHICS
        .replace_all(&text, REMOTE_GRAPHICS_NOTE)
        .into_owned();
    text = FILE_INCLUSION
        .replace_all(&text, FILE_INCLUSION_NOTE)
        .into_owned();

    // Reconcile font/encoding directives with the engine family
    if engine.native_fonts() {
        text = INPUTENC.replace_all(&text, INPUTENC_NOTE).into_owned();
    } else {
        text = FONTSPEC.replace_all(&text, FONTSPEC_NOTE).into_owned();
        text = SETMAINFONT
            .replace_all(&text, SETMAINFONT_NOTE)
            .into_owned();
    }

    text = text.trim().to_string();

    // Fragments get wrapped in a minimal valid envelope
    if !has_envelope(&text) {
        text = wrap_in_envelope(&text, engine);
    }

    let envelope_present = has_envelope(&text);
    NormalizedSource {
        text,
        envelope_present,
    }
}

fn wrap_in_envelope(body: &str, engine: Engine) -> String {
    let encoding_line = if engine.native_fonts() {
        "\\usepackage{fontspec}"
    } else {
        "\\usepackage[utf8]{inputenc}"
    };

    format!(
        "\\documentclass{{article}}\n\
         {encoding_line}\n\
         \\usepackage{{amsmath}}\n\
         \\usepackage{{graphicx}}\n\
         \\usepackage{{geometry}}\n\
         \\geometry{{a4paper, margin=1in}}\n\
         \\usepackage{{hyperref}}\n\
         \\title{{Texforge Document}}\n\
         \\author{{Texforge}}\n\
         \\date{{\\today}}\n\
         \\begin{{document}}\n\
         \\maketitle\n\n\
         {body}\n\n\
         \\end{{document}}"
    )
}
