pub mod compile;
pub mod normalize;
pub mod preview;

pub use compile::{compile, CompileArgs};
pub use normalize::{normalize, NormalizeArgs};
pub use preview::{preview, PreviewArgs};
