//! Admission-time MAC mutation engine.
//!
//! Each admitted Pod or VirtualMachine is handled as one independent unit of
//! work: the engine decides whether MAC addresses must be allocated or
//! reconciled, hands the allocation itself to the [`MacAllocator`]
//! collaborator, and emits the minimal JSON Patch list covering only the
//! mutations the engine introduced. The caller's own edits are never echoed
//! back as patches.
//!
//! Nothing here persists between requests: the original snapshot is a deep
//! copy frozen before any mutation, the working copy is mutated in place, and
//! both are dropped once the patch list is built.
//!
//! [`MacAllocator`]: macpool_controller_core::MacAllocator

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod patch;
pub mod pod;
pub mod virtual_machine;


pub use self::{pod::PodMutator, virtual_machine::VirtualMachineMutator};
