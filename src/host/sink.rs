//! Output sink shared by every stage
//!
//! Submission is lock-free and safe from any thread, including rayon workers
//! in the middle of a parallel pass. The scheduler owns the single
//! [`OutputDrain`] and empties it at the end of every tick.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::entity::FinishedEntity;
use crate::host::{CommandResponse, HostConnection, LogLevel, LogMessage};

#[derive(Debug, Clone)]
pub enum Outbound {
    CreateEntity(FinishedEntity),
    Log(LogMessage),
    Response(CommandResponse),
}

/// Cloneable submission handle
#[derive(Debug, Clone)]
pub struct OutputSink {
    tx: UnboundedSender<Outbound>,
}

/// Receiving end, owned by the scheduler
#[derive(Debug)]
pub struct OutputDrain {
    rx: UnboundedReceiver<Outbound>,
}

pub fn output_channel() -> (OutputSink, OutputDrain) {
    let (tx, rx) = mpsc::unbounded_channel();
    (OutputSink { tx }, OutputDrain { rx })
}

/// What one flush delivered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushCounts {
    pub responses: usize,
    pub entities: usize,
    pub logs: usize,
}

impl OutputSink {
    pub fn create_entity(&self, entity: FinishedEntity) {
        self.submit(Outbound::CreateEntity(entity));
    }

    /// Queue a host log message and mirror it to tracing
    pub fn log(&self, level: LogLevel, source: &str, text: impl Into<String>) {
        let text = text.into();
        match level {
            LogLevel::Debug => tracing::debug!("[{}] {}", source, text),
            LogLevel::Info => tracing::info!("[{}] {}", source, text),
            LogLevel::Warn => tracing::warn!("[{}] {}", source, text),
            LogLevel::Error => tracing::error!("[{}] {}", source, text),
        }
        self.submit(Outbound::Log(LogMessage::new(level, source, text)));
    }

    pub fn respond(&self, response: CommandResponse) {
        self.submit(Outbound::Response(response));
    }

    fn submit(&self, outbound: Outbound) {
        if self.tx.send(outbound).is_err() {
            tracing::debug!("output drain dropped; discarding outbound message");
        }
    }
}

impl OutputDrain {
    /// Everything submitted so far, in submission order
    pub fn take(&mut self) -> Vec<Outbound> {
        let mut taken = Vec::new();
        while let Ok(outbound) = self.rx.try_recv() {
            taken.push(outbound);
        }
        taken
    }

    /// Deliver pending output: responses, then entity creations, then logs
    pub fn flush<C: HostConnection + ?Sized>(&mut self, connection: &mut C) -> FlushCounts {
        let mut responses = Vec::new();
        let mut entities = Vec::new();
        let mut logs = Vec::new();

        for outbound in self.take() {
            match outbound {
                Outbound::Response(r) => responses.push(r),
                Outbound::CreateEntity(e) => entities.push(e),
                Outbound::Log(l) => logs.push(l),
            }
        }

        let counts = FlushCounts {
            responses: responses.len(),
            entities: entities.len(),
            logs: logs.len(),
        };

        for response in responses {
            connection.send_response(response);
        }
        for entity in entities {
            connection.create_entity(entity);
        }
        for log in logs {
            connection.send_log(log);
        }

        counts
    }
}
