//! Text format (`.usda`) reader and writer for layer documents.

use std::path::Path;

use anyhow::{Context, Result};

use crate::layer::SpecTree;

pub mod parser;
pub mod token;
mod writer;

pub use writer::write_tree;

/// A parsed `.usda` document.
#[derive(Debug)]
pub struct TextReader {
    tree: SpecTree,
}

impl TextReader {
    /// Read and parse a file from disk.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).with_context(|| format!("Unable to read file: {}", path.display()))?;
        Self::parse(&data).with_context(|| format!("Unable to parse {}", path.display()))
    }

    /// Parse document text. Errors point at the offending line.
    pub fn parse(data: &str) -> Result<Self> {
        let mut parser = parser::Parser::new(data);
        match parser.parse() {
            Ok(tree) => Ok(Self::from_data(tree)),
            Err(err) => match parser.last_error_highlight() {
                Some(highlight) => Err(err.context(format!("Parse error\n{highlight}"))),
                None => Err(err),
            },
        }
    }

    pub fn from_data(tree: SpecTree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &SpecTree {
        &self.tree
    }

    pub fn into_tree(self) -> SpecTree {
        self.tree
    }
}
