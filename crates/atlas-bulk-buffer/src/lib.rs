//! Time/count-windowed buffering of individual async operations into bulk
//! calls.
//!
//! Call sites submit single entities through [`OperationBuffer::submit`];
//! the buffer coalesces them into windows bounded by a maximum count or
//! duration, runs one [`BulkOperation`] per window, and fans the results
//! back out to the original submitters by entity id. Every submission
//! resolves exactly once, even when the bulk call fails outright or omits
//! an entity from its response.

pub mod buffer;
pub mod error;

pub use buffer::{BufferOptions, BulkOperation, Entity, OperationBuffer, OperationResult};
pub use error::BufferError;
