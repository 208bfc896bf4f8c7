//! VISA transport for GPIB/USB/Ethernet instruments
//!
//! Wraps the `visa-rs` crate. The session is opened through the system's
//! default resource manager and closed when the transport is closed or
//! dropped.
//!
//! Supports resource strings like:
//! - "GPIB0::23::INSTR" (GPIB interface)
//! - "USB0::0x1234::0x5678::SERIAL::INSTR" (USB)
//! - "TCPIP0::192.168.1.100::INSTR" (Ethernet/LXI)
//!
//! Without the `instrument_visa` feature, [`VisaTransport::open`] fails with
//! `FeatureNotEnabled`.

#[cfg(feature = "instrument_visa")]
use std::ffi::CString;
#[cfg(feature = "instrument_visa")]
use std::io::{BufRead, BufReader, Write};
#[cfg(feature = "instrument_visa")]
use std::time::Duration;

#[cfg(feature = "instrument_visa")]
use tracing::{debug, info};
#[cfg(feature = "instrument_visa")]
use visa_rs::prelude::*;

use super::Transport;
use crate::config::InstrumentSettings;
#[cfg(feature = "instrument_visa")]
use crate::error::Cg635Error;
use crate::error::Cg635Result;

/// VISA session to one instrument
pub struct VisaTransport {
    resource: String,
    #[cfg_attr(not(feature = "instrument_visa"), allow(dead_code))]
    write_terminator: String,
    #[cfg_attr(not(feature = "instrument_visa"), allow(dead_code))]
    read_terminator: String,
    #[cfg(feature = "instrument_visa")]
    session: Option<Instrument>,
    // Keeps the resource manager alive for the lifetime of the session
    #[cfg(feature = "instrument_visa")]
    _rm: DefaultRM,
}

#[cfg(feature = "instrument_visa")]
fn visa_error(context: &str, err: impl std::fmt::Display) -> Cg635Error {
    Cg635Error::Transport(format!("{}: {}", context, err))
}

#[cfg(feature = "instrument_visa")]
impl VisaTransport {
    /// Open `settings.resource` through the default VISA resource manager.
    pub fn open(settings: &InstrumentSettings) -> Cg635Result<Self> {
        let rm = DefaultRM::new()
            .map_err(|e| visa_error("Failed to create VISA resource manager", e))?;

        let name = CString::new(settings.resource.as_str()).map_err(|e| {
            visa_error(&format!("Invalid resource string '{}'", settings.resource), e)
        })?;
        let session = rm
            .open(
                &name.into(),
                AccessMode::NO_LOCK,
                Duration::from_millis(settings.open_timeout_ms),
            )
            .map_err(|e| {
                visa_error(
                    &format!("Failed to open VISA resource '{}'", settings.resource),
                    e,
                )
            })?;

        info!("VISA resource '{}' opened", settings.resource);
        Ok(Self {
            resource: settings.resource.clone(),
            write_terminator: settings.write_terminator.clone(),
            read_terminator: settings.read_terminator.clone(),
            session: Some(session),
            _rm: rm,
        })
    }

    fn session(&mut self) -> Cg635Result<&mut Instrument> {
        self.session.as_mut().ok_or(Cg635Error::Closed)
    }

    fn send(&mut self, command: &str) -> Cg635Result<()> {
        let framed = format!("{}{}", command, self.write_terminator);
        self.session()?
            .write_all(framed.as_bytes())
            .map_err(|e| visa_error(&format!("VISA write failed for '{}'", command), e))
    }
}

#[cfg(feature = "instrument_visa")]
impl Transport for VisaTransport {
    fn write(&mut self, command: &str) -> Cg635Result<()> {
        self.send(command)?;
        debug!("VISA command sent: {}", command);
        Ok(())
    }

    fn query(&mut self, command: &str) -> Cg635Result<String> {
        self.send(command)?;

        let session = self.session()?;
        let mut reader = BufReader::new(&*session);
        let mut line = String::new();
        reader
            .read_line(&mut line)
            .map_err(|e| visa_error(&format!("VISA read failed for '{}'", command), e))?;

        let reply = line
            .trim_end_matches(self.read_terminator.as_str())
            .trim()
            .to_string();
        debug!("VISA query '{}' -> '{}'", command, reply);
        Ok(reply)
    }

    fn close(&mut self) -> Cg635Result<()> {
        if self.session.take().is_some() {
            info!("VISA resource '{}' closed", self.resource);
        }
        Ok(())
    }

    fn resource(&self) -> &str {
        &self.resource
    }
}

#[cfg(not(feature = "instrument_visa"))]
impl VisaTransport {
    /// VISA support is not compiled in; always fails.
    pub fn open(_settings: &InstrumentSettings) -> Cg635Result<Self> {
        Err(crate::error::Cg635Error::FeatureNotEnabled(
            "instrument_visa".to_string(),
        ))
    }
}

#[cfg(not(feature = "instrument_visa"))]
impl Transport for VisaTransport {
    fn write(&mut self, _command: &str) -> Cg635Result<()> {
        Err(crate::error::Cg635Error::FeatureNotEnabled(
            "instrument_visa".to_string(),
        ))
    }

    fn query(&mut self, _command: &str) -> Cg635Result<String> {
        Err(crate::error::Cg635Error::FeatureNotEnabled(
            "instrument_visa".to_string(),
        ))
    }

    fn resource(&self) -> &str {
        &self.resource
    }
}
