//! Fast-path structural extraction for `.bsl` source modules.

pub mod fast_path;
pub mod keywords;
pub mod lexer;

pub use fast_path::parse_module;
