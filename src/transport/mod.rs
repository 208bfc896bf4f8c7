//! Transport implementations
//!
//! A transport carries SCPI command strings to one instrument and returns the
//! replies to queries. Framing, terminators on the wire and bus timeouts belong
//! to the transport; the driver only deals in command text.

pub mod mock;
pub mod visa;

pub use mock::{MockHandle, MockTransport};
pub use visa::VisaTransport;

use tracing::info;

use crate::config::{Backend, InstrumentSettings};
use crate::error::Cg635Result;

/// Blocking command/reply channel to one instrument
pub trait Transport: Send {
    /// Send a command without reading a reply.
    fn write(&mut self, command: &str) -> Cg635Result<()>;

    /// Send a command and read one reply line (terminator stripped).
    fn query(&mut self, command: &str) -> Cg635Result<String>;

    /// Release the session. Later calls fail with `Cg635Error::Closed`.
    fn close(&mut self) -> Cg635Result<()> {
        Ok(())
    }

    /// Resource address this transport is bound to
    fn resource(&self) -> &str;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, command: &str) -> Cg635Result<()> {
        (**self).write(command)
    }

    fn query(&mut self, command: &str) -> Cg635Result<String> {
        (**self).query(command)
    }

    fn close(&mut self) -> Cg635Result<()> {
        (**self).close()
    }

    fn resource(&self) -> &str {
        (**self).resource()
    }
}

/// Open the transport selected by `settings.backend`.
pub fn open(settings: &InstrumentSettings) -> Cg635Result<Box<dyn Transport>> {
    info!(
        "Opening {:?} transport for '{}'",
        settings.backend, settings.resource
    );
    match settings.backend {
        Backend::Visa => Ok(Box::new(VisaTransport::open(settings)?)),
        Backend::Mock => Ok(Box::new(MockTransport::with_resource(&settings.resource))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_mock_backend() {
        let settings = InstrumentSettings {
            backend: Backend::Mock,
            resource: "GPIB0::9::INSTR".to_string(),
            ..InstrumentSettings::default()
        };
        let mut transport = open(&settings).unwrap();
        assert_eq!(transport.resource(), "GPIB0::9::INSTR");
        assert!(transport.query("*IDN?").unwrap().contains("CG635"));
    }

    #[cfg(not(feature = "instrument_visa"))]
    #[test]
    fn test_open_visa_without_feature() {
        let settings = InstrumentSettings::default();
        let err = open(&settings).err().unwrap();
        assert!(matches!(
            err,
            crate::error::Cg635Error::FeatureNotEnabled(_)
        ));
    }
}
