//! Protocol data model - frames, methods, properties, and messages.
//!
//! Wire encoding and decoding of frames is the transport collaborator's
//! business; this module only defines the decoded shapes the engine
//! operates on.

mod frame;
mod message;

pub use frame::{
    ContentHeader, Deliver, Frame, FramePayload, GetOk, Method, Properties, DEFAULT_CHANNEL,
};
pub use message::{hexdump, Message};
