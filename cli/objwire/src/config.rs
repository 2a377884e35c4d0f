//! `objwire.toml` parsing: formatter options, type layouts and bindings.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use objwire_core::{MapBinder, TypeLayout, TypeName, TypeRegistry};
use objwire_engine::{Formatter, FormatterOptions};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "objwire.toml";

/// The top-level configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObjwireConfig {
    /// Formatter options.
    #[serde(default)]
    pub format: FormatterOptions,
    /// Type layouts known to the registry.
    #[serde(default)]
    pub types: Vec<TypeLayout>,
    /// Wire types redirected to other runtime types when reading.
    #[serde(default)]
    pub bindings: Vec<Binding>,
}

/// One `[[bindings]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Binding {
    /// Wire assembly; omitted for core-library types.
    #[serde(default)]
    pub assembly: Option<String>,
    /// Wire type name.
    pub name: String,
    pub target: TypeName,
}

impl ObjwireConfig {
    /// Search upward from `start_dir` for an `objwire.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Ok(Some((Self::load(&candidate)?, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        content
            .parse::<Self>()
            .with_context(|| format!("parsing {}", path.display()))
    }

    pub fn registry(&self) -> TypeRegistry {
        self.types.iter().cloned().collect()
    }

    /// A formatter configured from this file.
    pub fn formatter(&self) -> Formatter<TypeRegistry> {
        let formatter = Formatter::new(self.registry()).with_options(self.format);
        if self.bindings.is_empty() {
            return formatter;
        }
        let binder = self.bindings.iter().fold(MapBinder::new(), |binder, b| {
            binder.map(b.assembly.as_deref(), &b.name, b.target.clone())
        });
        formatter.with_binder(binder)
    }
}

impl std::str::FromStr for ObjwireConfig {
    type Err = toml::de::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        toml::from_str(s)
    }
}
