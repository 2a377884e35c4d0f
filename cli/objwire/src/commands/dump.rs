//! `objwire dump`: list the records of a stream.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use super::read_stream;
use crate::config::ObjwireConfig;

/// Print one line per record, untagged primitive values included.
pub fn run(config: &ObjwireConfig, stream: &Path, out: &mut impl Write) -> Result<()> {
    let bytes = read_stream(stream)?;
    let records = config
        .formatter()
        .inspect(&bytes[..])
        .with_context(|| format!("reading records from {}", stream.display()))?;
    for (index, record) in records.iter().enumerate() {
        writeln!(out, "{index:>5}  {record}")?;
    }
    Ok(())
}
