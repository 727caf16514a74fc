//! Simulation host boundary
//!
//! Inbound command requests arrive through a [`HostConnection`]; everything
//! the pipeline produces (entity creations, log messages, command responses)
//! is pushed into the [`OutputSink`] and flushed to the connection once per
//! tick.

pub mod connection;
pub mod sink;

use serde::Serialize;

use crate::core::types::RequestId;
use crate::population::PopulateRegionRequest;
use crate::requests::SpawnCommand;

pub use connection::{HostConnection, LoopbackConnection, LoopbackHandle};
pub use sink::{output_channel, FlushCounts, Outbound, OutputDrain, OutputSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Log record forwarded to the simulation host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogMessage {
    pub level: LogLevel,
    pub source: String,
    pub text: String,
}

impl LogMessage {
    pub fn new(level: LogLevel, source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            level,
            source: source.into(),
            text: text.into(),
        }
    }
}

/// Reply to one inbound command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResponse {
    pub request_id: RequestId,
    pub success: bool,
    pub message: String,
}

impl CommandResponse {
    pub fn accepted(request_id: RequestId, message: impl Into<String>) -> Self {
        Self {
            request_id,
            success: true,
            message: message.into(),
        }
    }

    pub fn rejected(request_id: RequestId, message: impl Into<String>) -> Self {
        Self {
            request_id,
            success: false,
            message: message.into(),
        }
    }
}

/// Events pulled from the host at the start of each tick
#[derive(Debug, Clone)]
pub enum InboundEvent {
    PopulateRegion(PopulateRegionRequest),
    Spawn(SpawnCommand),
    Disconnect { reason: String },
}
