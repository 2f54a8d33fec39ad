//! Generic RouterOS export text primitives used by higher-level tools.
//!
//! Tokenizing never rejects input: comment lines are collected separately,
//! `\` continuations are joined, and statements that do not split into
//! tokens are still returned verbatim as logical lines.

pub mod parser;
pub mod statement;
pub mod writer;

pub use parser::{parse, parse_file, Comment, Document, LineKind, LogicalLine, ParseError};
pub use statement::{unquote, Arg, Statement, StatementError};
pub use writer::{write, write_file, Block, WriteError};
