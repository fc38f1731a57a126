#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod collaborators;
mod timestamp;

pub use self::{
    collaborators::{MacAllocator, ObjectStore},
    timestamp::TransactionTimestamp,
};

use thiserror::Error;

/// Failure surfaced by the mutation engine for a single admission request.
///
/// The transport branches on the variant, never on message text: `Decode` is
/// a client error, everything else a server error. Errors are all-or-nothing;
/// no partial patch list accompanies them.
#[derive(Debug, Error)]
pub enum AdmissionError {
    /// The inbound payload did not decode into the expected resource shape.
    #[error("failed to decode {kind} from admission request: {source}")]
    Decode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// The allocator rejected or failed an allocation pass.
    #[error("allocation failed: {0}")]
    Allocation(#[source] anyhow::Error),

    /// Fetching the previously persisted object failed. Not-found is a valid
    /// lookup outcome, not an error.
    #[error("failed to fetch the existing object: {0}")]
    Lookup(#[source] anyhow::Error),

    /// A patch operation could not be built.
    #[error("failed to build patch: {0}")]
    Patch(#[from] serde_json::Error),

    /// The computed patch could not be attached to the response.
    #[error("failed to serialize patch: {0}")]
    SerializePatch(String),
}

impl AdmissionError {
    /// True when the request itself was malformed and resubmitting it
    /// unchanged cannot succeed.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}
