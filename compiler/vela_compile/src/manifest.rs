//! Unit manifests.
//!
//! Declarative intrinsics do not touch declarations while their unit is
//! being compiled. They append a [`DeclRecord`] to the unit's manifest,
//! which travels with the compiled module as metadata and is applied after
//! the unit runs. A unit loaded from the binary cache therefore replays
//! exactly the declarations it made when it was compiled.

use serde::{Deserialize, Serialize};
use vela_types::TypeDesc;

use crate::{CompileError, Result};

/// Module metadata key holding the encoded manifest.
pub const METADATA_KEY: &str = "vela.unit_manifest";

/// Serializable constant value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConstDesc {
    Int(i64),
    Char(char),
    Str(String),
    Null,
    Type(TypeDesc),
}

/// One declaration made by a unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DeclRecord {
    Alias {
        name: String,
        target: String,
        export: bool,
    },
    Constant {
        name: String,
        ty: TypeDesc,
        value: ConstDesc,
        export: bool,
    },
    Symbol {
        name: String,
        ty: TypeDesc,
        export: bool,
    },
    StructBody {
        name: String,
        elems: Vec<TypeDesc>,
        packed: bool,
    },
    Import {
        path: String,
    },
}

/// Declarations of one unit, in the order they were made.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitManifest {
    pub records: Vec<DeclRecord>,
}

impl UnitManifest {
    pub fn push(&mut self, record: DeclRecord) {
        self.records.push(record);
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| CompileError::Manifest {
            message: e.to_string(),
        })
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| CompileError::Manifest {
            message: e.to_string(),
        })
    }
}
