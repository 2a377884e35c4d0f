//! CLI command implementations.

pub mod check;
pub mod decode;
pub mod dump;
pub mod encode;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use objwire_core::{ObjectGraph, Value};
use serde::{Deserialize, Serialize};

/// A graph exchanged as JSON: the node arena plus the root value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub graph: ObjectGraph,
    pub root: Value,
}

impl GraphDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let doc: GraphDocument = serde_json::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        doc.graph
            .validate()
            .with_context(|| format!("validating {}", path.display()))?;
        Ok(doc)
    }
}

fn read_stream(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("reading {}", path.display()))
}
