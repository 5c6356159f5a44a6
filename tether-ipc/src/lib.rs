//! Inter-context communication for Tether
//!
//! This crate provides the wire protocol shared by privileged surfaces, the
//! evaluation broker and the sandbox, the transport abstraction the messaging
//! bus drives, and the privileged sender guard.

pub mod error;
pub mod protocol;
pub mod sender;
pub mod transport;

// Re-export commonly used types
pub use error::{classify_native_error, FailureReason, IpcError, TransportFailure};
pub use protocol::{kinds, EvalFailure, EvalResult, Message, SandboxRequest, SandboxResponse};
pub use sender::{is_privileged, PrivilegedSenderGuard, SenderIdentity};
pub use transport::{
    Channel, ChannelTransport, ContextId, Endpoint, IncomingMessage, Responder, Transport,
};
