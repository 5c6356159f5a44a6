//! Resilient messaging for Tether
//!
//! `MessageBus` delivers messages to privileged surfaces and tab contexts
//! with bounded retries and an optional acknowledgment timeout.
//! `MessageRouter` is the receiving side: it dispatches by message type and
//! keeps privileged handlers away from ordinary page content. The dialog and
//! preference clients are thin callers built on the bus.

pub mod bus;
pub mod dialog;
pub mod error;
pub mod preference;
pub mod router;

pub use bus::{is_acknowledged, DeliveryPolicy, MessageBus, SendOptions, ACK_FIELDS};
pub use dialog::{DialogArgsClient, DialogArgsRegistry};
pub use error::{BusError, DialogError, PreferenceError};
pub use preference::{PreferenceClient, PreferenceStore};
pub use router::{failure_response, EvaluateHandler, MessageHandler, MessageRouter, UNAUTHORIZED_SENDER};
