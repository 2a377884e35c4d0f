//! `objwire check`: round-trip a JSON graph document through the formatter.

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};

use super::GraphDocument;
use crate::config::ObjwireConfig;

/// Serialize, deserialize, and compare the result with the input graph.
pub fn run(config: &ObjwireConfig, input: &Path, out: &mut impl Write) -> Result<()> {
    let doc = GraphDocument::load(input)?;
    let formatter = config.formatter();
    let bytes = formatter
        .serialize_to_vec(&doc.graph, &doc.root)
        .with_context(|| format!("encoding {}", input.display()))?;
    let decoded = formatter
        .deserialize_from_slice(&bytes)
        .with_context(|| format!("decoding the stream produced from {}", input.display()))?;
    if !doc.graph.equivalent(&doc.root, &decoded.graph, &decoded.root) {
        bail!("{} does not survive a round trip unchanged", input.display());
    }
    writeln!(
        out,
        "ok: {} node(s) reachable as {} bytes",
        decoded.graph.len(),
        bytes.len()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use objwire_core::{
        ArrayNode, ObjectGraph, ObjectNode, PrimitiveType, TypeLayout, TypeName, TypeRef,
    };

    fn config() -> ObjwireConfig {
        r#"
[[types]]
name = "Demo.Cell"
assembly = "DemoApp"
members = [
    { name = "n", type = "int64" },
    { name = "next", type = "Demo.Cell, DemoApp" },
]
"#
        .parse()
        .unwrap()
    }

    #[test]
    fn check_accepts_a_cyclic_graph() {
        let dir = tempfile::tempdir().unwrap();
        let cell = TypeName::new("Demo.Cell", "DemoApp");
        let mut graph = ObjectGraph::new();
        let a = graph.add_object(ObjectNode::new(cell.clone()).with("n", 1i64));
        let b = graph.add_object(ObjectNode::new(cell).with("n", 2i64).with("next", a));
        graph.object_mut(a).unwrap().set("next", b);
        let list = graph.add_array(ArrayNode::new(TypeRef::Object, vec![a.into(), b.into()]));
        let doc = GraphDocument {
            graph,
            root: list.into(),
        };
        let input = dir.path().join("cells.json");
        std::fs::write(&input, serde_json::to_string_pretty(&doc).unwrap()).unwrap();

        let mut out = Vec::new();
        run(&config(), &input, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("ok: 3 node(s)"));
    }

    #[test]
    fn check_flags_lossy_graphs() {
        // A member outside the layout is silently dropped on write.
        let dir = tempfile::tempdir().unwrap();
        let mut config = config();
        config.types.push(
            TypeLayout::new(TypeName::new("Demo.Tag", "DemoApp"))
                .member("code", TypeRef::Primitive(PrimitiveType::Int32)),
        );
        let mut graph = ObjectGraph::new();
        let root = graph.add_object(
            ObjectNode::new(TypeName::new("Demo.Tag", "DemoApp"))
                .with("code", 3i32)
                .with("extra", "lost"),
        );
        let doc = GraphDocument {
            graph,
            root: root.into(),
        };
        let input = dir.path().join("tag.json");
        std::fs::write(&input, serde_json::to_string(&doc).unwrap()).unwrap();

        let err = run(&config, &input, &mut Vec::new()).unwrap_err();
        assert!(err.to_string().contains("does not survive a round trip"));
    }
}
