pub mod html;
pub mod math;
pub mod render;
pub mod transform;

#[cfg(test)]
mod tests_transform;

#[cfg(test)]
mod tests_recovery;

pub use html::{serialize, to_html, to_page, SerializeOptions};
pub use math::{BasicMathRenderer, MathRenderError, MathRenderer};
pub use render::RenderNode;
pub use transform::{render, FrameKind, MacroKind, Transformer};
