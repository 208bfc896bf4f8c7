//! Stanford Research Systems CG635 clock generator driver
//!
//! [`Cg635`] translates configuration calls into CG635 SCPI commands. Every
//! argument is validated before anything is sent; a rejected argument leaves
//! the instrument untouched. Apart from [`Cg635::set_differential_output_level`]
//! each operation sends exactly one command.
//!
//! ## Configuration
//!
//! ```toml
//! [instrument]
//! resource = "GPIB0::23::INSTR"
//! backend = "visa"
//!
//! [echo]
//! frequency = true
//! ```
//!
//! ## Example
//!
//! ```
//! use srs_cg635::instrument::Cg635;
//! use srs_cg635::transport::MockTransport;
//!
//! let mut cg = Cg635::new(MockTransport::new());
//! cg.set_frequency(10e6)?;
//! cg.set_display("q/q! high")?;
//! cg.set_differential_output_level(0.20, 0.60)?;
//! cg.close()?;
//! # Ok::<(), srs_cg635::error::Cg635Error>(())
//! ```

use tracing::{debug, info, warn};

use super::differential::{DifferentialPlan, LEVEL_STEP_VOLTS};
use crate::config::{EchoSettings, Settings};
use crate::error::{Cg635Error, Cg635Result};
use crate::parameters::{DisplayParameter, OutputStandard, ParamArg, ParameterTable, StepParameter};
use crate::transport::{self, Transport};

/// Highest programmable output frequency, Hz
pub const MAX_FREQUENCY_HZ: f64 = 2.05e9;

/// CG635 controller owning one transport session
///
/// The session is released by [`Cg635::close`] or when the controller is
/// dropped.
pub struct Cg635<T: Transport = Box<dyn Transport>> {
    transport: Option<T>,
    echo: EchoSettings,
}

impl Cg635<Box<dyn Transport>> {
    /// Open the transport described by `settings` and wrap it.
    ///
    /// Fails if the resource manager cannot find or open the device.
    pub fn connect(settings: &Settings) -> Cg635Result<Self> {
        let transport = transport::open(&settings.instrument)?;
        info!("Connected to CG635 at '{}'", transport.resource());
        Ok(Self::new(transport).with_echo(settings.echo))
    }
}

impl<T: Transport> Cg635<T> {
    /// Wrap an already-open transport.
    pub fn new(transport: T) -> Self {
        Self {
            transport: Some(transport),
            echo: EchoSettings::default(),
        }
    }

    /// Choose which query replies are printed to stdout.
    pub fn with_echo(mut self, echo: EchoSettings) -> Self {
        self.echo = echo;
        self
    }

    /// Current echo flags
    pub fn echo(&self) -> EchoSettings {
        self.echo
    }

    /// Borrow the transport, failing once the session is closed.
    pub fn transport(&mut self) -> Cg635Result<&mut T> {
        self.transport.as_mut().ok_or(Cg635Error::Closed)
    }

    /// Send a raw command.
    pub fn write(&mut self, command: &str) -> Cg635Result<()> {
        debug!("CG635 <- {}", command);
        self.transport()?.write(command)
    }

    /// Send a raw query and return the reply.
    pub fn query(&mut self, command: &str) -> Cg635Result<String> {
        let reply = self.transport()?.query(command)?;
        debug!("CG635 '{}' -> '{}'", command, reply);
        Ok(reply)
    }

    fn query_echo(&mut self, command: &str, echo: bool) -> Cg635Result<String> {
        let reply = self.query(command)?;
        if echo {
            println!("{}", reply);
        }
        Ok(reply)
    }

    /// Identification string (`*IDN?`)
    pub fn identify(&mut self) -> Cg635Result<String> {
        let echo = self.echo.identify;
        self.query_echo("*IDN?", echo)
    }

    /// Trigger the instrument self test (`*TST?`).
    ///
    /// The result is not read. It stays in the instrument's output queue and
    /// will be returned by the next read.
    pub fn self_test(&mut self) -> Cg635Result<()> {
        warn!("Self-test result is not read back and remains queued on the instrument");
        self.write("*TST?")
    }

    /// Select what the front panel shows (`DISP<n>`).
    pub fn set_display(&mut self, param: impl Into<ParamArg>) -> Cg635Result<DisplayParameter> {
        let display = DisplayParameter::resolve(&param.into())?;
        self.write(&format!("DISP{}", display.index()))?;
        Ok(display)
    }

    /// Currently displayed parameter index (`DISP?`)
    pub fn get_display(&mut self) -> Cg635Result<String> {
        let echo = self.echo.display;
        self.query_echo("DISP?", echo)
    }

    /// Current output frequency (`FREQ?`)
    pub fn get_frequency(&mut self) -> Cg635Result<String> {
        let echo = self.echo.frequency;
        self.query_echo("FREQ?", echo)
    }

    /// Set the output frequency in Hz (`FREQ<value>`), 0 to 2.05 GHz.
    pub fn set_frequency(&mut self, hz: f64) -> Cg635Result<()> {
        if !(0.0..=MAX_FREQUENCY_HZ).contains(&hz) {
            return Err(Cg635Error::FrequencyOutOfRange(hz));
        }
        self.write(&format!("FREQ{}", hz))
    }

    /// Step a parameter down by its step size (`STPD <n>`).
    pub fn step_down(&mut self, param: impl Into<ParamArg>) -> Cg635Result<StepParameter> {
        let step = StepParameter::resolve(&param.into())?;
        self.write(&format!("STPD {}", step.index()))?;
        Ok(step)
    }

    /// Step a parameter up by its step size (`STPU <n>`).
    pub fn step_up(&mut self, param: impl Into<ParamArg>) -> Cg635Result<StepParameter> {
        let step = StepParameter::resolve(&param.into())?;
        self.write(&format!("STPU {}", step.index()))?;
        Ok(step)
    }

    /// Step a parameter `count` times; negative counts step down.
    pub fn step_by(&mut self, param: impl Into<ParamArg>, count: i32) -> Cg635Result<StepParameter> {
        let step = StepParameter::resolve(&param.into())?;
        for _ in 0..count.unsigned_abs() {
            if count < 0 {
                self.step_down(step)?;
            } else {
                self.step_up(step)?;
            }
        }
        Ok(step)
    }

    /// Select the Q/Q! output standard (`STDQ<n>`).
    pub fn set_output_standard(
        &mut self,
        param: impl Into<ParamArg>,
    ) -> Cg635Result<OutputStandard> {
        let standard = OutputStandard::resolve(&param.into())?;
        self.write(&format!("STDQ{}", standard.index()))?;
        Ok(standard)
    }

    /// Set the increment used by step up/down on a parameter (`STPS <n>,<value>`).
    pub fn set_step_size(
        &mut self,
        param: impl Into<ParamArg>,
        value: f64,
    ) -> Cg635Result<StepParameter> {
        let step = StepParameter::resolve(&param.into())?;
        if !value.is_finite() {
            return Err(Cg635Error::InvalidStepSize(value));
        }
        self.write(&format!("STPS {},{}", step.index(), value))?;
        Ok(step)
    }

    /// Drive the Q/Q! outputs to `low_volts` / `high_volts` in LVDS mode.
    ///
    /// Selects LVDS, which resets the rails to 1.07 V / 1.43 V, then steps
    /// each rail in 10 mV increments. The instrument is not read back, so the
    /// result is only correct if nothing else touched the rails meanwhile. A
    /// transport failure part way leaves the rails wherever they got to.
    pub fn set_differential_output_level(
        &mut self,
        low_volts: f64,
        high_volts: f64,
    ) -> Cg635Result<DifferentialPlan> {
        let plan = DifferentialPlan::new(low_volts, high_volts)?;
        info!(
            "Setting Q/Q! levels to {} V / {} V ({} steps)",
            f64::from(plan.low_target) / 100.0,
            f64::from(plan.high_target) / 100.0,
            plan.step_count()
        );

        self.set_output_standard(OutputStandard::Lvds)?;

        self.set_step_size(StepParameter::QqLow, LEVEL_STEP_VOLTS)?;
        self.step_by(StepParameter::QqLow, plan.low_delta)?;

        self.set_step_size(StepParameter::QqHigh, LEVEL_STEP_VOLTS)?;
        self.step_by(StepParameter::QqHigh, plan.high_delta)?;

        Ok(plan)
    }

    /// Release the transport session. Later commands fail with `Closed`.
    pub fn close(&mut self) -> Cg635Result<()> {
        match self.transport.take() {
            Some(mut transport) => {
                info!("Closing CG635 session '{}'", transport.resource());
                transport.close()
            }
            None => Ok(()),
        }
    }
}

impl<T: Transport> Drop for Cg635<T> {
    fn drop(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close() {
                warn!("failed to close CG635 session: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockHandle, MockTransport};
    use tracing_test::traced_test;

    fn mock() -> (Cg635<MockTransport>, MockHandle) {
        let transport = MockTransport::new();
        let handle = transport.handle();
        (Cg635::new(transport), handle)
    }

    #[test]
    fn test_identify() {
        let (mut cg, handle) = mock();
        assert!(cg.identify().unwrap().starts_with("Stanford Research Systems,CG635"));
        assert_eq!(handle.sent(), vec!["*IDN?"]);
    }

    #[traced_test]
    #[test]
    fn test_self_test_is_write_only() {
        let (mut cg, handle) = mock();
        cg.self_test().unwrap();
        assert_eq!(handle.sent(), vec!["*TST?"]);
        assert!(logs_contain("not read back"));
    }

    #[test]
    fn test_set_display_by_name_and_index() {
        let (mut cg, handle) = mock();
        assert_eq!(cg.set_display("CMOS LOW").unwrap(), DisplayParameter::CmosLow);
        cg.set_display(5).unwrap();
        cg.set_display(DisplayParameter::PhaseStep).unwrap();
        assert_eq!(handle.sent(), vec!["DISP5", "DISP5", "DISP7"]);
    }

    #[test]
    fn test_set_display_rejects_unknown_name() {
        let (mut cg, handle) = mock();
        assert!(matches!(
            cg.set_display("bogus"),
            Err(Cg635Error::UnknownParameter { .. })
        ));
        assert!(matches!(
            cg.set_display(12),
            Err(Cg635Error::IndexOutOfRange { .. })
        ));
        assert!(handle.sent().is_empty());
    }

    #[test]
    fn test_get_display_and_frequency() {
        let (mut cg, handle) = mock();
        cg.set_display("phase").unwrap();
        assert_eq!(cg.get_display().unwrap(), "1");
        cg.set_frequency(1e6).unwrap();
        assert_eq!(cg.get_frequency().unwrap(), "1000000");
        assert_eq!(handle.sent(), vec!["DISP1", "DISP?", "FREQ1000000", "FREQ?"]);
    }

    #[test]
    fn test_frequency_formatting() {
        let (mut cg, handle) = mock();
        cg.set_frequency(0.0).unwrap();
        cg.set_frequency(10e6).unwrap();
        cg.set_frequency(1234.5).unwrap();
        cg.set_frequency(MAX_FREQUENCY_HZ).unwrap();
        assert_eq!(
            handle.sent(),
            vec!["FREQ0", "FREQ10000000", "FREQ1234.5", "FREQ2050000000"]
        );
    }

    #[test]
    fn test_frequency_out_of_range() {
        let (mut cg, handle) = mock();
        assert!(cg.set_frequency(-1.0).is_err());
        assert!(cg.set_frequency(2.05e9 + 1.0).is_err());
        assert!(cg.set_frequency(f64::NAN).is_err());
        assert!(handle.sent().is_empty());
    }

    #[test]
    fn test_step_commands() {
        let (mut cg, handle) = mock();
        cg.step_up("q/q! high").unwrap();
        cg.step_down(3).unwrap();
        cg.set_step_size("Frequency", 1000.0).unwrap();
        cg.set_step_size(StepParameter::QqHigh, 0.01).unwrap();
        assert_eq!(
            handle.sent(),
            vec!["STPU 2", "STPD 3", "STPS 0,1000", "STPS 2,0.01"]
        );
        assert!(cg.step_up("Frequency step").is_err());
        assert!(cg.step_down(6).is_err());
    }

    #[test]
    fn test_step_size_must_be_finite() {
        let (mut cg, handle) = mock();
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                cg.set_step_size(StepParameter::QqHigh, value),
                Err(Cg635Error::InvalidStepSize(_))
            ));
        }
        assert!(handle.sent().is_empty());
    }

    #[test]
    fn test_step_by() {
        let (mut cg, handle) = mock();
        cg.step_by("phase", -2).unwrap();
        cg.step_by("phase", 1).unwrap();
        cg.step_by("phase", 0).unwrap();
        assert_eq!(handle.sent(), vec!["STPD 1", "STPD 1", "STPU 1"]);
    }

    #[test]
    fn test_output_standard() {
        let (mut cg, handle) = mock();
        assert_eq!(cg.set_output_standard("pecl 5.0v").unwrap(), OutputStandard::Pecl5V0);
        cg.set_output_standard(0).unwrap();
        assert!(cg.set_output_standard("TTL").is_err());
        assert!(cg.set_output_standard(5).is_err());
        assert_eq!(handle.sent(), vec!["STDQ4", "STDQ0"]);
    }

    #[test]
    fn test_differential_level_sequence() {
        let (mut cg, handle) = mock();
        let plan = cg.set_differential_output_level(1.00, 1.50).unwrap();
        assert_eq!(plan.step_count(), 14);

        let mut expected = vec!["STDQ2".to_string(), "STPS 3,0.01".to_string()];
        expected.extend(std::iter::repeat("STPD 3".to_string()).take(7));
        expected.push("STPS 2,0.01".to_string());
        expected.extend(std::iter::repeat("STPU 2".to_string()).take(7));
        assert_eq!(handle.sent(), expected);
    }

    #[test]
    fn test_differential_level_rejects_non_finite_voltages() {
        let (mut cg, handle) = mock();
        for (low, high) in [
            (f64::NAN, 0.50),
            (0.20, f64::NAN),
            (f64::NEG_INFINITY, 0.50),
            (0.20, f64::INFINITY),
            (-1e300, 1e300),
            (25.0, 25.5),
        ] {
            assert!(matches!(
                cg.set_differential_output_level(low, high),
                Err(Cg635Error::DifferentialOutOfRange { .. })
            ));
        }
        assert!(handle.sent().is_empty());
    }

    #[test]
    fn test_close_releases_transport() {
        let (mut cg, handle) = mock();
        cg.close().unwrap();
        assert!(handle.is_closed());
        assert!(matches!(cg.set_frequency(1e6), Err(Cg635Error::Closed)));
        assert!(matches!(cg.identify(), Err(Cg635Error::Closed)));
        // closing twice is a no-op
        cg.close().unwrap();
        assert!(handle.sent().is_empty());
    }

    #[test]
    fn test_drop_releases_transport() {
        let (cg, handle) = mock();
        drop(cg);
        assert!(handle.is_closed());
    }
}
