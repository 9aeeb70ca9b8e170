//! Batch upload coordination: validate a set of candidate files against a
//! type policy, fan the valid ones out to a transport, and track aggregate
//! progress until every submission settles.

pub mod coordinator;
pub mod errors;
pub mod lazy;
pub mod policy;
pub mod progress;
pub mod source;
pub mod transport;
pub mod validate;

pub use coordinator::{BatchUploader, UploadOptions, UploadOutcome, UploadState};
pub use errors::{BatchError, TransportFailure, ValidationFailure};
pub use lazy::{LazyResource, LoadStatus};
pub use policy::{HttpMethod, PolicyRegistry, UnknownKind, UploadPolicy};
pub use progress::ProgressTracker;
pub use source::FileSource;
pub use transport::{HttpTransport, ProgressFn, Transport, TransportError, UploadPayload};
