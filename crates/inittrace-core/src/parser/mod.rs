// Parser module - turns source text into a SourceFile
use crate::ast::SourceFile;
use crate::{Result, TracerError};

pub mod go;


pub use go::GoParser;

/// Trait for source parsers
pub trait Parser: Send {
    /// Parse one file's source text
    fn parse(&mut self, source: &str) -> Result<SourceFile>;

    /// Get parser name for debugging
    fn name(&self) -> &'static str;
}

/// Create a parser for a language name or file extension
pub fn create_parser(language: &str) -> Result<Box<dyn Parser>> {
    match language {
        "go" | "golang" => Ok(Box::new(GoParser::new()?)),
        _ => Err(TracerError::Config(format!("Unknown parser type: {language}"))),
    }
}
