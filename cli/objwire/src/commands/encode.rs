//! `objwire encode`: serialize a JSON graph document into a stream.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use super::GraphDocument;
use crate::config::ObjwireConfig;

/// Encode `input` and write the stream to `output`. The output file is
/// only created once encoding has succeeded.
pub fn run(config: &ObjwireConfig, input: &Path, output: &Path, out: &mut impl Write) -> Result<()> {
    let doc = GraphDocument::load(input)?;
    let bytes = config
        .formatter()
        .serialize_to_vec(&doc.graph, &doc.root)
        .with_context(|| format!("encoding {}", input.display()))?;
    fs::write(output, &bytes).with_context(|| format!("writing {}", output.display()))?;
    writeln!(out, "Wrote {} bytes to {}", bytes.len(), output.display())?;
    Ok(())
}
