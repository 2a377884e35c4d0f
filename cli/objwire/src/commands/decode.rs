//! `objwire decode`: deserialize a stream and print its graph.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use objwire_core::{ArrayNode, Node, ObjectNode, Value};

use super::{read_stream, GraphDocument};
use crate::config::ObjwireConfig;

pub fn run(config: &ObjwireConfig, stream: &Path, json: bool, out: &mut impl Write) -> Result<()> {
    let bytes = read_stream(stream)?;
    let decoded = config
        .formatter()
        .deserialize_from_slice(&bytes)
        .with_context(|| format!("decoding {}", stream.display()))?;
    log::info!(
        "{}: {} node(s) from {} bytes",
        stream.display(),
        decoded.graph.len(),
        bytes.len()
    );
    let doc = GraphDocument {
        graph: decoded.graph,
        root: decoded.root,
    };
    if json {
        serde_json::to_writer_pretty(&mut *out, &doc)?;
        writeln!(out)?;
        return Ok(());
    }
    write_tree(&doc, out)
}

/// Plain-text listing: the root, then every node with its members.
fn write_tree(doc: &GraphDocument, out: &mut impl Write) -> Result<()> {
    writeln!(out, "root: {}", render(&doc.root))?;
    for (id, node) in doc.graph.iter() {
        match node {
            Node::Object(object) => write_object(id, object, out)?,
            Node::Array(array) => write_array(id, array, out)?,
        }
    }
    Ok(())
}

fn write_object(id: impl std::fmt::Display, object: &ObjectNode, out: &mut impl Write) -> Result<()> {
    let marker = if object.unresolved { " (unresolved)" } else { "" };
    writeln!(out, "{id} {}{marker}", object.ty)?;
    for field in &object.fields {
        writeln!(out, "    {} = {}", field.name, render(&field.value))?;
    }
    Ok(())
}

fn write_array(id: impl std::fmt::Display, array: &ArrayNode, out: &mut impl Write) -> Result<()> {
    let dims: Vec<String> = array.lengths().iter().map(i32::to_string).collect();
    write!(out, "{id} {}[{}]", array.element(), dims.join(","))?;
    if array.has_offset() {
        write!(out, " from {:?}", array.lower_bounds())?;
    }
    writeln!(out)?;
    for (index, value) in array.iter_indexed() {
        let index: Vec<String> = index.iter().map(i32::to_string).collect();
        writeln!(out, "    [{}] = {}", index.join(","), render(value))?;
    }
    Ok(())
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Primitive(p) => p.to_string(),
        Value::String(s) => format!("{s:?}"),
        Value::Ref(node) => node.to_string(),
    }
}
