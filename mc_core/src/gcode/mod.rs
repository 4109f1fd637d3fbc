//! G-code front end (§4.1, §4.2): normalize → tokenize → evaluate
//! expressions → parse into a block → dispatch against the machine
//! model and planner.

pub mod expr;
pub mod lexer;
pub mod parser;

pub use parser::{Block, Parser, ProgramControl};
