use thiserror::Error;

/// Failure of the math typesetting collaborator.
///
/// Always caught by the transformer and localized to one `ErrorMarker`
/// node; never propagates out of a render.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathRenderError {
    #[error("Unsupported math command: \\{command}")]
    UnsupportedCommand { command: String },

    #[error("Empty math expression")]
    EmptyExpression,
}

/// External math typesetting collaborator.
///
/// `display_mode` selects block layout (`\[ ... \]`) over inline (`$ ... $`).
/// Implementations may fail per expression; callers isolate failures per
/// node.
pub trait MathRenderer {
    fn render(&self, expression: &str, display_mode: bool) -> Result<String, MathRenderError>;
}

/// Control sequences the built-in renderer accepts. Roughly the amsmath
/// household names; anything outside the list fails the node.
const SUPPORTED_COMMANDS: &[&str] = &[
    "frac", "sqrt", "int", "oint", "sum", "prod", "lim", "infty", "partial", "nabla",
    "alpha", "beta", "gamma", "delta", "epsilon", "varepsilon", "zeta", "eta", "theta",
    "iota", "kappa", "lambda", "mu", "nu", "xi", "pi", "rho", "sigma", "tau", "upsilon",
    "phi", "varphi", "chi", "psi", "omega", "Gamma", "Delta", "Theta", "Lambda", "Xi",
    "Pi", "Sigma", "Upsilon", "Phi", "Psi", "Omega",
    "cdot", "times", "div", "pm", "mp", "leq", "geq", "neq", "approx", "equiv", "sim",
    "subset", "supset", "subseteq", "supseteq", "in", "notin", "cup", "cap", "setminus",
    "to", "rightarrow", "leftarrow", "Rightarrow", "Leftarrow", "mapsto",
    "sin", "cos", "tan", "cot", "sec", "csc", "exp", "log", "ln", "min", "max",
    "mathbb", "mathbf", "mathcal", "mathrm", "mathit", "text", "operatorname",
    "left", "right", "hat", "bar", "vec", "tilde", "dot", "ddot", "overline", "underline",
    "dots", "ldots", "cdots", "vdots", "ddots", "quad", "qquad",
];

/// Built-in math renderer.
///
/// Validates every control sequence in the expression against
/// [`SUPPORTED_COMMANDS`] and emits escaped markup wrapped in a math span.
/// This is deliberately a renderer of last resort: the trait seam exists so
/// a real typesetter can be plugged in.
#[derive(Debug, Default, Clone)]
pub struct BasicMathRenderer;

impl BasicMathRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl MathRenderer for BasicMathRenderer {
    fn render(&self, expression: &str, display_mode: bool) -> Result<String, MathRenderError> {
        let trimmed = expression.trim();
        if trimmed.is_empty() {
            return Err(MathRenderError::EmptyExpression);
        }

        for command in control_sequences(trimmed) {
            let base = command.trim_end_matches('*');
            if !SUPPORTED_COMMANDS.contains(&base) {
                return Err(MathRenderError::UnsupportedCommand {
                    command: command.to_string(),
                });
            }
        }

        let class = if display_mode {
            "math math-display"
        } else {
            "math math-inline"
        };
        Ok(format!(
            "<span class=\"{}\">{}</span>",
            class,
            escape_html(trimmed)
        ))
    }
}

/// Iterate the alphabetic control sequences in a math expression.
/// Single-character escapes (`\,`, `\{`, ...) are always legal spacing or
/// literals and are not yielded.
fn control_sequences(expression: &str) -> impl Iterator<Item = &str> {
    let bytes = expression.as_bytes();
    let mut pos = 0;
    std::iter::from_fn(move || {
        while pos < bytes.len() {
            if bytes[pos] == b'\\' {
                let start = pos + 1;
                let mut end = start;
                while end < bytes.len() && (bytes[end].is_ascii_alphabetic() || bytes[end] == b'*')
                {
                    end += 1;
                }
                pos = end.max(start + 1);
                if end > start {
                    return Some(&expression[start..end]);
                }
            } else {
                pos += 1;
            }
        }
        None
    })
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
