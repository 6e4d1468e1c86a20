//! JSONL session log parsing
//!
//! [`decoder`] turns single lines into messages; [`builder`] groups them into
//! sessions, either streamed from a file or from an in-memory string.

pub mod builder;
pub mod decoder;
pub mod types;

pub use builder::{parse_content, parse_file, SessionBuilder};
pub use decoder::{decode_line, LineRecord};
pub use types::*;
