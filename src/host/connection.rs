//! Connection to the simulation host

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::entity::FinishedEntity;
use crate::host::{CommandResponse, InboundEvent, LogMessage};

/// Transport to the simulation host
///
/// Implementations decide the wire format; the pipeline only needs to pull
/// inbound events and push its three kinds of output.
pub trait HostConnection: Send {
    /// Events received since the previous call
    fn poll_inbound(&mut self) -> Vec<InboundEvent>;

    fn create_entity(&mut self, entity: FinishedEntity);

    fn send_log(&mut self, message: LogMessage);

    fn send_response(&mut self, response: CommandResponse);

    fn is_connected(&self) -> bool;
}

#[derive(Default)]
struct LoopbackState {
    inbound: VecDeque<InboundEvent>,
    created: Vec<FinishedEntity>,
    logs: Vec<LogMessage>,
    responses: Vec<CommandResponse>,
    disconnected: Option<String>,
}

/// In-process host: events are injected and output recorded through a
/// [`LoopbackHandle`]
pub struct LoopbackConnection {
    state: Arc<Mutex<LoopbackState>>,
}

/// Test and demo side of a [`LoopbackConnection`]
#[derive(Clone)]
pub struct LoopbackHandle {
    state: Arc<Mutex<LoopbackState>>,
}

impl LoopbackConnection {
    pub fn new() -> (Self, LoopbackHandle) {
        let state = Arc::new(Mutex::new(LoopbackState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            LoopbackHandle { state },
        )
    }
}

impl HostConnection for LoopbackConnection {
    fn poll_inbound(&mut self) -> Vec<InboundEvent> {
        let mut state = self.state.lock();
        let events: Vec<_> = state.inbound.drain(..).collect();
        for event in &events {
            if let InboundEvent::Disconnect { reason } = event {
                state.disconnected = Some(reason.clone());
            }
        }
        events
    }

    fn create_entity(&mut self, entity: FinishedEntity) {
        self.state.lock().created.push(entity);
    }

    fn send_log(&mut self, message: LogMessage) {
        self.state.lock().logs.push(message);
    }

    fn send_response(&mut self, response: CommandResponse) {
        self.state.lock().responses.push(response);
    }

    fn is_connected(&self) -> bool {
        self.state.lock().disconnected.is_none()
    }
}

impl LoopbackHandle {
    pub fn send(&self, event: InboundEvent) {
        self.state.lock().inbound.push_back(event);
    }

    pub fn disconnect(&self, reason: impl Into<String>) {
        self.send(InboundEvent::Disconnect {
            reason: reason.into(),
        });
    }

    pub fn created(&self) -> Vec<FinishedEntity> {
        self.state.lock().created.clone()
    }

    pub fn logs(&self) -> Vec<LogMessage> {
        self.state.lock().logs.clone()
    }

    pub fn responses(&self) -> Vec<CommandResponse> {
        self.state.lock().responses.clone()
    }

    pub fn disconnect_reason(&self) -> Option<String> {
        self.state.lock().disconnected.clone()
    }
}
