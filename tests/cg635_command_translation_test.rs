//! Command translation tests against the simulated instrument.
//!
//! Each test drives the public `Cg635` API and checks the exact command
//! strings that reach the transport.

use srs_cg635::config::{Backend, InstrumentSettings, Settings};
use srs_cg635::instrument::Cg635;
use srs_cg635::parameters::{DisplayParameter, ParameterTable, StepParameter};
use srs_cg635::transport::{MockHandle, MockTransport, Transport};
use srs_cg635::Cg635Error;

fn controller() -> (Cg635<MockTransport>, MockHandle) {
    let transport = MockTransport::new();
    let handle = transport.handle();
    (Cg635::new(transport), handle)
}

/// Mixed-case variant of a name, so lookups cannot rely on exact casing
fn scramble_case(name: &str) -> String {
    name.chars()
        .enumerate()
        .map(|(i, c)| {
            if i % 2 == 0 {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            }
        })
        .collect()
}

#[test]
fn test_frequency_within_range_sends_one_command() {
    let (mut cg, handle) = controller();
    for hz in [0.0, 1.0, 10e6, 1.5e9, 2.05e9] {
        handle.clear();
        cg.set_frequency(hz).unwrap();
        assert_eq!(handle.sent(), vec![format!("FREQ{}", hz)]);
        assert_eq!(handle.frequency(), hz);
    }
}

#[test]
fn test_frequency_outside_range_sends_nothing() {
    let (mut cg, handle) = controller();
    for hz in [-0.001, -1e6, 2.050_000_001e9, 1e12, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            cg.set_frequency(hz),
            Err(Cg635Error::FrequencyOutOfRange(_))
        ));
    }
    assert!(handle.sent().is_empty());
}

#[test]
fn test_every_display_name_matches_its_index() {
    let (mut cg, handle) = controller();
    for (index, name) in DisplayParameter::NAMES.iter().enumerate() {
        handle.clear();
        cg.set_display(scramble_case(name)).unwrap();
        cg.set_display(name.to_lowercase()).unwrap();
        cg.set_display(index as i64).unwrap();
        let expected = format!("DISP{}", index);
        assert_eq!(handle.sent(), vec![expected.clone(), expected.clone(), expected]);
    }
}

#[test]
fn test_step_and_display_tables_agree() {
    for step in StepParameter::ALL {
        let display = DisplayParameter::from(*step);
        assert_eq!(step.index(), display.index());
        assert_eq!(step.name(), display.name());
    }
}

#[test]
fn test_unknown_name_and_bad_index_send_nothing() {
    let (mut cg, handle) = controller();

    match cg.set_display("bogus") {
        Err(Cg635Error::UnknownParameter { name, accepted, .. }) => {
            assert_eq!(name, "bogus");
            assert_eq!(accepted.len(), 12);
        }
        other => panic!("expected UnknownParameter, got {:?}", other.map(|_| ())),
    }
    assert!(matches!(
        cg.set_display(12),
        Err(Cg635Error::IndexOutOfRange { max: 11, .. })
    ));
    assert!(matches!(
        cg.set_display(-1),
        Err(Cg635Error::IndexOutOfRange { .. })
    ));
    assert!(cg.step_up(6).is_err());
    assert!(cg.step_down("Phase step").is_err());
    assert!(cg.set_step_size("Nope", 1.0).is_err());
    assert!(cg.set_output_standard(5).is_err());
    assert!(cg.set_output_standard("CML").is_err());

    assert!(handle.sent().is_empty());
}

#[test]
fn test_differential_level_low_swing_sequence() {
    let (mut cg, handle) = controller();
    let plan = cg.set_differential_output_level(0.20, 0.60).unwrap();

    assert_eq!((plan.low_target, plan.high_target), (20, 60));
    assert_eq!(plan.high_anchor, 120);

    let sent = handle.sent();
    assert_eq!(sent.len(), 150);
    assert_eq!(sent[0], "STDQ2");
    assert_eq!(sent[1], "STPS 3,0.01");
    assert!(sent[2..89].iter().all(|c| c == "STPD 3"));
    assert_eq!(sent[89], "STPS 2,0.01");
    assert!(sent[90..].iter().all(|c| c == "STPD 2"));
    assert_eq!(sent[90..].len(), 60);
    assert_eq!(handle.standard(), 2);
}

#[test]
fn test_differential_level_out_of_range_sends_nothing() {
    let (mut cg, handle) = controller();
    for (low, high) in [(0.0, 0.15), (0.10, 1.50), (1.0, 0.5), (0.5, 0.69)] {
        assert!(matches!(
            cg.set_differential_output_level(low, high),
            Err(Cg635Error::DifferentialOutOfRange { .. })
        ));
    }
    assert!(handle.sent().is_empty());
}

#[test]
fn test_differential_level_truncates_inputs() {
    let (mut cg, handle) = controller();
    let plan = cg.set_differential_output_level(1.079, 1.439).unwrap();
    assert_eq!((plan.low_target, plan.high_target), (107, 143));
    assert_eq!(handle.sent(), vec!["STDQ2", "STPS 3,0.01", "STPS 2,0.01"]);
}

#[test]
fn test_transport_failure_mid_sequence_is_not_rolled_back() {
    let (mut cg, handle) = controller();
    handle.fail_after(10);

    let result = cg.set_differential_output_level(0.20, 0.60);
    assert!(matches!(result, Err(Cg635Error::Transport(_))));

    let sent = handle.sent();
    assert_eq!(sent.len(), 10);
    assert_eq!(sent[0], "STDQ2");
    assert_eq!(sent[9], "STPD 3");
}

#[test]
fn test_canned_replies() {
    let (mut cg, handle) = controller();
    handle.set_reply("FREQ?", "1.0000000000000E+07");
    assert_eq!(cg.get_frequency().unwrap(), "1.0000000000000E+07");
    assert_eq!(cg.query("STDQ?").unwrap(), "0");
    cg.write("*CLS").unwrap();
    assert_eq!(handle.sent(), vec!["FREQ?", "STDQ?", "*CLS"]);
}

#[test]
fn test_connect_with_mock_backend() {
    let settings = Settings {
        instrument: InstrumentSettings {
            resource: "GPIB0::5::INSTR".to_string(),
            backend: Backend::Mock,
            ..InstrumentSettings::default()
        },
        ..Settings::default()
    };

    let mut cg = Cg635::connect(&settings).unwrap();
    assert_eq!(cg.transport().unwrap().resource(), "GPIB0::5::INSTR");
    assert!(cg.identify().unwrap().contains("CG635"));
    cg.close().unwrap();
    assert!(matches!(cg.identify(), Err(Cg635Error::Closed)));
}

#[cfg(not(feature = "instrument_visa"))]
#[test]
fn test_visa_backend_requires_feature() {
    let settings = Settings::default();
    assert!(matches!(
        Cg635::connect(&settings),
        Err(Cg635Error::FeatureNotEnabled(_))
    ));
}
