//! Core types for the HLS origin: ingress events, media classification,
//! the session aggregate and its enrichment, and the durable-sink contract.

pub mod error;
pub mod event;
pub mod session;
pub mod sink;

pub use error::{Error, Result};
pub use event::{ChunkEvent, Codec, Quality, Source};
pub use session::{Session, UaEnricher, UaProfile};
pub use sink::{ListenerSample, SessionSink};
