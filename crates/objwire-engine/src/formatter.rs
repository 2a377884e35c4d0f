//! The formatter facade: one entry point bundling the collaborators and
//! options for both directions.

use std::io::{Read, Write};

use objwire_core::binder::TypeBinder;
use objwire_core::describe::TypeDescriber;
use objwire_core::graph::ObjectGraph;
use objwire_core::surrogate::{Surrogate, SurrogateSelector};
use objwire_core::types::TypeName;
use objwire_core::value::Value;
use objwire_format::Record;

use crate::error::{DecodeResult, EncodeError, EncodeResult};
use crate::options::FormatterOptions;
use crate::reader::Reader;
use crate::writer::Writer;

/// A decoded stream: the rebuilt graph and the value standing for the
/// stream's top object.
#[derive(Debug, Clone, PartialEq)]
pub struct Deserialized {
    pub graph: ObjectGraph,
    pub root: Value,
}

/// Serializes object graphs to streams and back.
///
/// The formatter itself holds no per-call state; identity tables, schema
/// caches and fixups live only for the duration of one call.
pub struct Formatter<D> {
    describer: D,
    surrogates: SurrogateSelector,
    binder: Option<Box<dyn TypeBinder>>,
    options: FormatterOptions,
}

impl<D: TypeDescriber> Formatter<D> {
    pub fn new(describer: D) -> Self {
        Self {
            describer,
            surrogates: SurrogateSelector::new(),
            binder: None,
            options: FormatterOptions::default(),
        }
    }

    pub fn with_options(mut self, options: FormatterOptions) -> Self {
        self.options = options;
        self
    }

    /// Route values of `ty` through `surrogate` in both directions.
    pub fn with_surrogate(mut self, ty: TypeName, surrogate: impl Surrogate + 'static) -> Self {
        self.surrogates.add(ty, surrogate);
        self
    }

    /// Consult `binder` before the describer when resolving stream types.
    pub fn with_binder(mut self, binder: impl TypeBinder + 'static) -> Self {
        self.binder = Some(Box::new(binder));
        self
    }

    pub fn options(&self) -> &FormatterOptions {
        &self.options
    }

    pub fn describer(&self) -> &D {
        &self.describer
    }

    /// Encode the graph reachable from `root` and write it to `out`.
    ///
    /// The stream is assembled in memory first, so `out` receives nothing
    /// when encoding fails.
    pub fn serialize<W: Write>(
        &self,
        graph: &ObjectGraph,
        root: &Value,
        mut out: W,
    ) -> EncodeResult<()> {
        let bytes = self.serialize_to_vec(graph, root)?;
        out.write_all(&bytes)
            .and_then(|()| out.flush())
            .map_err(|e| EncodeError::Format(e.into()))
    }

    pub fn serialize_to_vec(&self, graph: &ObjectGraph, root: &Value) -> EncodeResult<Vec<u8>> {
        Writer::new(graph, &self.describer, &self.surrogates, &self.options).write(root)
    }

    /// Read one stream from `input` and rebuild its graph.
    pub fn deserialize<R: Read>(&self, input: R) -> DecodeResult<Deserialized> {
        let outcome = self.reader(input).read()?;
        Ok(Deserialized {
            graph: outcome.graph,
            root: outcome.root,
        })
    }

    pub fn deserialize_from_slice(&self, bytes: &[u8]) -> DecodeResult<Deserialized> {
        self.deserialize(bytes)
    }

    /// Decode a stream and return its records in order, including the
    /// untagged primitive values, alongside the normal validation.
    pub fn inspect<R: Read>(&self, input: R) -> DecodeResult<Vec<Record>> {
        let outcome = self.reader(input).with_trace().read()?;
        Ok(outcome.records.unwrap_or_default())
    }

    fn reader<R: Read>(&self, input: R) -> Reader<'_, R, D> {
        Reader::new(
            input,
            &self.describer,
            &self.surrogates,
            self.binder.as_deref(),
            &self.options,
        )
    }
}

impl<D> std::fmt::Debug for Formatter<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Formatter")
            .field("surrogates", &self.surrogates)
            .field("binder", &self.binder.is_some())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
