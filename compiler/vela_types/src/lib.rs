//! Type Store for the Vela compiler.
//!
//! Types are canonical: structurally equal types share one [`TypeId`], so
//! handle equality is type equality. Each store is built for one set of
//! [`TargetWidths`]; the JIT and every target context own separate stores.
//!
//! Backend representations are produced on demand by per-kind hooks the
//! backend installs, and cached per type (see [`TypeStore::materialize`]).

mod data;
mod desc;
mod error;
mod format;
mod id;
mod store;
mod widths;

pub use data::{GenericArg, StructBody, TypeData};
pub use desc::{ArgDesc, TypeDesc};
pub use error::TypeStoreError;
pub use id::{TypeId, TypeKind};
pub use store::{CommonTypes, FunctionSig, IntInfo, MaterializeHook, SharedTypeStore, TypeStore};
pub use widths::TargetWidths;
