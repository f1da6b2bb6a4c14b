use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compile target engine.
///
/// The engine decides which directives are valid in normalized source:
/// native-font engines take `fontspec`, the classic engine takes
/// `inputenc`, and the generated envelope differs accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Pdflatex,
    Xelatex,
    Lualatex,
}

impl Engine {
    pub fn as_str(self) -> &'static str {
        match self {
            Engine::Pdflatex => "pdflatex",
            Engine::Xelatex => "xelatex",
            Engine::Lualatex => "lualatex",
        }
    }

    /// Engines with native (system) font selection.
    pub fn native_fonts(self) -> bool {
        matches!(self, Engine::Xelatex | Engine::Lualatex)
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct UnknownEngine(pub String);

impl fmt::Display for UnknownEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unknown engine '{}'. Use: pdflatex, xelatex, or lualatex",
            self.0
        )
    }
}

impl std::error::Error for UnknownEngine {}

impl FromStr for Engine {
    type Err = UnknownEngine;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdflatex" => Ok(Engine::Pdflatex),
            "xelatex" => Ok(Engine::Xelatex),
            "lualatex" => Ok(Engine::Lualatex),
            other => Err(UnknownEngine(other.to_string())),
        }
    }
}
