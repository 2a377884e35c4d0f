//! Formatter options.

use serde::{Deserialize, Serialize};

/// When schema records carry per-member type information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeFormat {
    /// Every schema record is typed.
    #[default]
    Always,
    /// Layout-described objects omit member types; readers take them from
    /// their own layouts. Custom and surrogate objects stay typed.
    WhenNeeded,
}

/// How assembly names are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssemblyFormat {
    #[default]
    Full,
    /// Version, culture and key are stripped.
    Simple,
}

/// Policy for layout members absent from a stream's schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingMembers {
    Reject,
    /// Only members marked optional may be absent.
    #[default]
    AllowOptional,
    AllowAll,
}

/// Policy for stream members the resolved layout does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownMembers {
    #[default]
    Reject,
    /// Read and discard.
    Ignore,
}

/// Largest array, in cells, a reader accepts by default.
pub const DEFAULT_MAX_ARRAY_CELLS: usize = 1 << 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterOptions {
    pub type_format: TypeFormat,
    pub assembly_format: AssemblyFormat,
    pub missing_members: MissingMembers,
    pub unknown_members: UnknownMembers,
    /// Arrays declaring more cells than this are rejected while reading.
    pub max_array_cells: usize,
}

impl Default for FormatterOptions {
    fn default() -> Self {
        Self {
            type_format: TypeFormat::default(),
            assembly_format: AssemblyFormat::default(),
            missing_members: MissingMembers::default(),
            unknown_members: UnknownMembers::default(),
            max_array_cells: DEFAULT_MAX_ARRAY_CELLS,
        }
    }
}
