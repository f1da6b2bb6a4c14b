pub mod ast;
pub mod error;
pub mod lexer;
pub mod node_ids;
pub mod parser;

pub use error::{ParseError, ParseResult};
pub use lexer::{tokenize, Token};
pub use parser::{parse, parse_with_path, Parser};
