//! Spawn command verification
//!
//! Inbound spawn commands carry an unverified credential. This stage checks
//! that the caller is a client, asks the credential collaborator for the
//! identity behind the credential, and forwards verified identities to vessel
//! intake. Every command gets exactly one response.

use std::sync::Arc;

use ahash::AHashMap;

use crate::core::config::SpawnConfig;
use crate::core::types::RequestId;
use crate::host::{CommandResponse, LogLevel, OutputSink};
use crate::stage::WorkQueue;
use crate::vessel::{IntakeRequest, TokenLayout};

const LOG_SOURCE: &str = "SpawnRequests";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnCommand {
    pub request_id: RequestId,
    pub credential: String,
    pub caller_id: String,
    /// Attribute set of the worker that issued the command
    pub caller_attributes: Vec<String>,
}

impl SpawnCommand {
    pub fn new(credential: impl Into<String>, caller_id: impl Into<String>, attributes: &[&str]) -> Self {
        Self {
            request_id: RequestId::new(),
            credential: credential.into(),
            caller_id: caller_id.into(),
            caller_attributes: attributes.iter().map(|a| (*a).to_owned()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Identity string behind the credential
    Verified(String),
    Rejected(String),
}

/// External credential collaborator
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> Verification;
}

/// Fixed credential table
#[derive(Debug, Clone, Default)]
pub struct StaticVerifier {
    identities: AHashMap<String, String>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, credential: impl Into<String>, identity: impl Into<String>) -> Self {
        self.identities.insert(credential.into(), identity.into());
        self
    }
}

impl CredentialVerifier for StaticVerifier {
    fn verify(&self, credential: &str) -> Verification {
        match self.identities.get(credential) {
            Some(identity) => Verification::Verified(identity.clone()),
            None => Verification::Rejected("unknown credential".into()),
        }
    }
}

/// Outcome counts of one verification tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerifyCounts {
    pub accepted: usize,
    pub rejected: usize,
}

pub struct RequestVerifier<V: ?Sized> {
    commands: WorkQueue<SpawnCommand>,
    intake: WorkQueue<IntakeRequest>,
    layout: TokenLayout,
    client_attribute: String,
    verifier: Arc<V>,
    sink: OutputSink,
}

impl<V: CredentialVerifier + ?Sized> RequestVerifier<V> {
    pub fn new(
        config: &SpawnConfig,
        verifier: Arc<V>,
        intake: WorkQueue<IntakeRequest>,
        sink: OutputSink,
    ) -> Self {
        Self {
            commands: WorkQueue::new(),
            intake,
            layout: TokenLayout::from_config(config),
            client_attribute: config.client_attribute.clone(),
            verifier,
            sink,
        }
    }

    /// Producer handle for inbound dispatch
    pub fn commands(&self) -> WorkQueue<SpawnCommand> {
        self.commands.clone()
    }

    pub fn update(&self) -> VerifyCounts {
        let mut counts = VerifyCounts::default();
        for command in self.commands.drain() {
            match self.verify(&command) {
                Ok(request) => {
                    self.intake.push(request);
                    self.sink
                        .respond(CommandResponse::accepted(command.request_id, "spawn accepted"));
                    counts.accepted += 1;
                }
                Err(reason) => {
                    self.sink.log(LogLevel::Warn, LOG_SOURCE, reason.as_str());
                    self.sink
                        .respond(CommandResponse::rejected(command.request_id, reason));
                    counts.rejected += 1;
                }
            }
        }
        counts
    }

    fn verify(&self, command: &SpawnCommand) -> Result<IntakeRequest, String> {
        if !command.caller_attributes.iter().any(|a| *a == self.client_attribute) {
            return Err(format!(
                "command not issued by a client: {}",
                command.caller_id
            ));
        }

        let identity = match self.verifier.verify(&command.credential) {
            Verification::Verified(identity) => identity,
            Verification::Rejected(reason) => {
                return Err(format!("credential rejected: {}", reason));
            }
        };

        let token = self
            .layout
            .parse(&identity)
            .ok_or_else(|| format!("malformed identity for caller {}", command.caller_id))?;

        Ok(IntakeRequest {
            token,
            caller_id: command.caller_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{output_channel, Outbound, OutputDrain};

    const IDENTITY: &str = "AbCdEfGhIjKlMnOpQrStuvwxyz0123456789ABCDEFGHI";

    fn verifier() -> (RequestVerifier<StaticVerifier>, WorkQueue<IntakeRequest>, OutputDrain) {
        let (sink, drain) = output_channel();
        let intake = WorkQueue::new();
        let credentials = StaticVerifier::new()
            .with("good", IDENTITY)
            .with("short", "tooshort");
        let stage = RequestVerifier::new(
            &SpawnConfig::default(),
            Arc::new(credentials),
            intake.clone(),
            sink,
        );
        (stage, intake, drain)
    }

    fn responses(drain: &mut OutputDrain) -> Vec<CommandResponse> {
        drain
            .take()
            .into_iter()
            .filter_map(|o| match o {
                Outbound::Response(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_verified_command_reaches_intake() {
        let (stage, intake, mut drain) = verifier();
        let command = SpawnCommand::new("good", "worker-1", &["client"]);
        stage.commands().push(command.clone());

        assert_eq!(stage.update(), VerifyCounts { accepted: 1, rejected: 0 });

        let request = intake.pop().unwrap();
        assert_eq!(request.caller_id, "worker-1");
        assert_eq!(request.token.user_id(), &IDENTITY[..20]);

        let responses = responses(&mut drain);
        assert_eq!(responses.len(), 1);
        assert!(responses[0].success);
        assert_eq!(responses[0].request_id, command.request_id);
    }

    #[test]
    fn test_non_client_caller_rejected() {
        let (stage, intake, mut drain) = verifier();
        stage
            .commands()
            .push(SpawnCommand::new("good", "worker-2", &["game_logic"]));

        assert_eq!(stage.update().rejected, 1);
        assert!(intake.is_empty());

        let outbound = drain.take();
        assert!(outbound.iter().any(|o| matches!(
            o,
            Outbound::Log(log) if log.level == LogLevel::Warn && log.text.contains("not issued by a client")
        )));
        assert!(outbound
            .iter()
            .any(|o| matches!(o, Outbound::Response(r) if !r.success)));
    }

    #[test]
    fn test_every_command_gets_one_response() {
        let (stage, intake, mut drain) = verifier();
        let commands = [
            SpawnCommand::new("good", "a", &["client"]),
            SpawnCommand::new("bogus", "b", &["client"]),
            SpawnCommand::new("short", "c", &["client"]),
            SpawnCommand::new("good", "d", &[]),
        ];
        stage.commands().extend(commands.clone());

        assert_eq!(stage.update(), VerifyCounts { accepted: 1, rejected: 3 });
        assert_eq!(intake.len(), 1);

        let responses = responses(&mut drain);
        assert_eq!(responses.len(), commands.len());
        for command in &commands {
            assert_eq!(
                responses.iter().filter(|r| r.request_id == command.request_id).count(),
                1
            );
        }
    }
}
