//! JSON Patch (RFC 6902) over `serde_json::Value`, applied to a copy.

pub mod apply;
pub mod operation;
pub mod pointer;

pub use apply::{apply_operation, apply_patch, json_equal, PatchError, PatchOutcome};
pub use operation::PatchOperation;
pub use pointer::{parse_index, JsonPointer, PointerError};
