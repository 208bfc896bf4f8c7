//! Simulated CG635 for tests and for running without hardware.
//!
//! `MockTransport` records every command it receives and keeps just enough
//! instrument state (frequency, display, output standard) to answer the
//! queries the driver sends. The command log is shared through a cloneable
//! [`MockHandle`], so it can still be inspected after the transport has moved
//! into a controller.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use super::Transport;
use crate::config::gpib_resource;
use crate::config::DEFAULT_GPIB_ADDRESS;
use crate::error::{Cg635Error, Cg635Result};

/// Identification string returned for `*IDN?`
pub const MOCK_IDN: &str = "Stanford Research Systems,CG635,s/n000000,ver0.00";

#[derive(Debug)]
struct MockState {
    sent: Vec<String>,
    replies: HashMap<String, String>,
    fail_after: Option<usize>,
    closed: bool,
    frequency: f64,
    display: u8,
    standard: u8,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            sent: Vec::new(),
            replies: HashMap::new(),
            fail_after: None,
            closed: false,
            frequency: 10.0e6,
            display: 0,
            standard: 0,
        }
    }
}

impl MockState {
    fn accept(&mut self, command: &str) -> Cg635Result<()> {
        if self.closed {
            return Err(Cg635Error::Closed);
        }
        if self.fail_after.is_some_and(|limit| self.sent.len() >= limit) {
            return Err(Cg635Error::Transport(format!(
                "simulated bus failure on '{}'",
                command
            )));
        }
        self.sent.push(command.to_string());
        self.apply(command);
        Ok(())
    }

    fn apply(&mut self, command: &str) {
        if let Some(value) = setter_argument(command, "FREQ") {
            if let Ok(frequency) = value.parse() {
                self.frequency = frequency;
            }
        } else if let Some(value) = setter_argument(command, "DISP") {
            if let Ok(display) = value.parse() {
                self.display = display;
            }
        } else if let Some(value) = setter_argument(command, "STDQ") {
            if let Ok(standard) = value.parse() {
                self.standard = standard;
            }
        }
    }

    fn reply(&self, command: &str) -> Cg635Result<String> {
        if let Some(reply) = self.replies.get(command) {
            return Ok(reply.clone());
        }
        match command {
            "*IDN?" => Ok(MOCK_IDN.to_string()),
            "*TST?" => Ok("0".to_string()),
            "FREQ?" => Ok(format!("{}", self.frequency)),
            "DISP?" => Ok(self.display.to_string()),
            "STDQ?" => Ok(self.standard.to_string()),
            _ => Err(Cg635Error::Transport(format!(
                "no simulated reply for '{}'",
                command
            ))),
        }
    }
}

/// Argument of a `HEADER<value>` setter, `None` for queries and other headers
fn setter_argument<'a>(command: &'a str, header: &str) -> Option<&'a str> {
    command
        .strip_prefix(header)
        .filter(|rest| !rest.starts_with('?'))
        .map(str::trim)
}

/// In-process stand-in for a CG635
#[derive(Debug)]
pub struct MockTransport {
    resource: String,
    state: Arc<Mutex<MockState>>,
}

/// Shared view of a [`MockTransport`]'s log and knobs
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    /// Mock bound to the default GPIB address
    pub fn new() -> Self {
        Self::with_resource(&gpib_resource(DEFAULT_GPIB_ADDRESS))
    }

    /// Mock reporting `resource` as its address
    pub fn with_resource(resource: &str) -> Self {
        Self {
            resource: resource.to_string(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    /// Handle for inspecting this transport after it has been moved
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHandle {
    /// Every command accepted so far, in order
    pub fn sent(&self) -> Vec<String> {
        lock(&self.state).sent.clone()
    }

    /// Forget the recorded commands
    pub fn clear(&self) {
        lock(&self.state).sent.clear();
    }

    /// Answer `command` with `reply` instead of the simulated value
    pub fn set_reply(&self, command: &str, reply: &str) {
        lock(&self.state)
            .replies
            .insert(command.to_string(), reply.to_string());
    }

    /// Reject every command once `count` commands have been accepted
    pub fn fail_after(&self, count: usize) {
        lock(&self.state).fail_after = Some(count);
    }

    /// Whether the transport has been closed
    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// Last frequency set through `FREQ<value>`, in Hz
    pub fn frequency(&self) -> f64 {
        lock(&self.state).frequency
    }

    /// Last output standard index set through `STDQ<n>`
    pub fn standard(&self) -> u8 {
        lock(&self.state).standard
    }
}

impl Transport for MockTransport {
    fn write(&mut self, command: &str) -> Cg635Result<()> {
        debug!("Mock write: {}", command);
        lock(&self.state).accept(command)
    }

    fn query(&mut self, command: &str) -> Cg635Result<String> {
        let mut state = lock(&self.state);
        state.accept(command)?;
        let reply = state.reply(command)?;
        debug!("Mock query '{}' -> '{}'", command, reply);
        Ok(reply)
    }

    fn close(&mut self) -> Cg635Result<()> {
        lock(&self.state).closed = true;
        Ok(())
    }

    fn resource(&self) -> &str {
        &self.resource
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_commands() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        mock.write("DISP1").unwrap();
        mock.write("STPU 3").unwrap();
        assert_eq!(handle.sent(), vec!["DISP1", "STPU 3"]);
        assert_eq!(mock.resource(), "GPIB0::23::INSTR");
    }

    #[test]
    fn test_simulated_state_answers_queries() {
        let mut mock = MockTransport::new();
        assert_eq!(mock.query("FREQ?").unwrap(), "10000000");
        mock.write("FREQ1500000").unwrap();
        mock.write("DISP3").unwrap();
        mock.write("STDQ2").unwrap();
        assert_eq!(mock.query("FREQ?").unwrap(), "1500000");
        assert_eq!(mock.query("DISP?").unwrap(), "3");
        assert_eq!(mock.handle().standard(), 2);
        assert_eq!(mock.query("*IDN?").unwrap(), MOCK_IDN);
    }

    #[test]
    fn test_canned_reply_overrides_simulation() {
        let mut mock = MockTransport::new();
        mock.handle().set_reply("FREQ?", "+1.000000E+07");
        assert_eq!(mock.query("FREQ?").unwrap(), "+1.000000E+07");
    }

    #[test]
    fn test_unknown_query_fails() {
        let mut mock = MockTransport::new();
        assert!(matches!(
            mock.query("PHAS?"),
            Err(Cg635Error::Transport(_))
        ));
    }

    #[test]
    fn test_fail_after() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        handle.fail_after(2);
        mock.write("STPD 3").unwrap();
        mock.write("STPD 3").unwrap();
        assert!(mock.write("STPD 3").is_err());
        assert_eq!(handle.sent().len(), 2);
    }

    #[test]
    fn test_closed_rejects_commands() {
        let mut mock = MockTransport::new();
        let handle = mock.handle();
        mock.close().unwrap();
        assert!(handle.is_closed());
        assert!(matches!(mock.write("DISP0"), Err(Cg635Error::Closed)));
    }
}
