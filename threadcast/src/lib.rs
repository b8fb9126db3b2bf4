// Library interface for threadcast modules
// This allows tests and the binaries to import modules

pub mod artifact;
pub mod error;
pub mod image;
pub mod llm;
pub mod news;
pub mod parser;
pub mod pipeline;
pub mod prompt;
pub mod publish;
pub mod segment;
pub mod social;

pub use error::{Error, Result};
