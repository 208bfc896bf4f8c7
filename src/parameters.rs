//! Enumerated CG635 parameters.
//!
//! The instrument addresses its parameters by zero-based integer index. Each
//! command accepts its own subset:
//!
//! | Table | Commands | Entries |
//! |---|---|---|
//! | [`DisplayParameter`] | `DISP` | 12 |
//! | [`StepParameter`] | `STPU`, `STPD`, `STPS` | 6 |
//! | [`OutputStandard`] | `STDQ` | 5 |
//!
//! A step parameter and the display parameter of the same name share an index.
//!
//! Operations take a [`ParamArg`]: either a name, matched case-insensitively
//! against the table, or an integer index that must fall inside it.

use std::fmt;
use std::str::FromStr;

use crate::error::{Cg635Error, Cg635Result};

/// Name-or-index argument accepted by the enumerated operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamArg {
    /// Human-readable name, case-insensitive
    Name(String),
    /// Zero-based instrument index
    Index(i64),
}

impl ParamArg {
    /// Interpret user input: integers become indices, anything else a name.
    pub fn parse(input: &str) -> Self {
        match input.trim().parse::<i64>() {
            Ok(index) => ParamArg::Index(index),
            Err(_) => ParamArg::Name(input.to_string()),
        }
    }
}

impl From<&str> for ParamArg {
    fn from(name: &str) -> Self {
        ParamArg::Name(name.to_string())
    }
}

impl From<String> for ParamArg {
    fn from(name: String) -> Self {
        ParamArg::Name(name)
    }
}

impl From<i64> for ParamArg {
    fn from(index: i64) -> Self {
        ParamArg::Index(index)
    }
}

impl From<i32> for ParamArg {
    fn from(index: i32) -> Self {
        ParamArg::Index(i64::from(index))
    }
}

impl From<u8> for ParamArg {
    fn from(index: u8) -> Self {
        ParamArg::Index(i64::from(index))
    }
}

/// A fixed, ordered name table mapping onto instrument indices.
pub trait ParameterTable: Copy + Sized + 'static {
    /// Table name used in error messages
    const KIND: &'static str;
    /// Every entry, in index order
    const ALL: &'static [Self];
    /// Display names, in index order
    const NAMES: &'static [&'static str];

    /// Zero-based index sent to the instrument
    fn index(self) -> u8;

    /// Canonical display name
    fn name(self) -> &'static str {
        Self::NAMES[usize::from(self.index())]
    }

    /// Look up an entry by index, rejecting anything outside the table.
    fn from_index(index: i64) -> Cg635Result<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
            .ok_or(Cg635Error::IndexOutOfRange {
                kind: Self::KIND,
                index,
                max: Self::ALL.len() - 1,
            })
    }

    /// Look up an entry by name, ignoring case and surrounding whitespace.
    fn from_name(name: &str) -> Cg635Result<Self> {
        let wanted = name.trim();
        Self::NAMES
            .iter()
            .position(|candidate| candidate.eq_ignore_ascii_case(wanted))
            .map(|i| Self::ALL[i])
            .ok_or_else(|| Cg635Error::UnknownParameter {
                kind: Self::KIND,
                name: name.to_string(),
                accepted: Self::NAMES,
            })
    }

    /// Resolve a name-or-index argument against this table.
    fn resolve(arg: &ParamArg) -> Cg635Result<Self> {
        match arg {
            ParamArg::Name(name) => Self::from_name(name),
            ParamArg::Index(index) => Self::from_index(*index),
        }
    }
}

/// Values the front-panel display can show (`DISP`)
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DisplayParameter {
    Frequency = 0,
    Phase = 1,
    QqHigh = 2,
    QqLow = 3,
    CmosHigh = 4,
    CmosLow = 5,
    FrequencyStep = 6,
    PhaseStep = 7,
    QqHighStep = 8,
    QqLowStep = 9,
    CmosHighStep = 10,
    CmosLowStep = 11,
}

/// Parameters that can be stepped (`STPU`, `STPD`, `STPS`)
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StepParameter {
    Frequency = 0,
    Phase = 1,
    QqHigh = 2,
    QqLow = 3,
    CmosHigh = 4,
    CmosLow = 5,
}

/// Q/Q! output standards (`STDQ`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OutputStandard {
    /// ECL levels
    Ecl = 0,
    /// +7 dBm sine-like levels
    Plus7Dbm = 1,
    /// LVDS, rails reset to 1.07 V / 1.43 V
    Lvds = 2,
    /// PECL with a 3.3 V supply
    Pecl3V3 = 3,
    /// PECL with a 5.0 V supply
    Pecl5V0 = 4,
}

impl ParameterTable for DisplayParameter {
    const KIND: &'static str = "Display parameter";
    const ALL: &'static [Self] = &[
        Self::Frequency,
        Self::Phase,
        Self::QqHigh,
        Self::QqLow,
        Self::CmosHigh,
        Self::CmosLow,
        Self::FrequencyStep,
        Self::PhaseStep,
        Self::QqHighStep,
        Self::QqLowStep,
        Self::CmosHighStep,
        Self::CmosLowStep,
    ];
    const NAMES: &'static [&'static str] = &[
        "Frequency",
        "Phase",
        "Q/Q! High",
        "Q/Q! Low",
        "CMOS high",
        "CMOS low",
        "Frequency step",
        "Phase step",
        "Q/Q! high step",
        "Q/Q! low step",
        "CMOS high step",
        "CMOS low step",
    ];

    fn index(self) -> u8 {
        self as u8
    }
}

impl ParameterTable for StepParameter {
    const KIND: &'static str = "Step parameter";
    const ALL: &'static [Self] = &[
        Self::Frequency,
        Self::Phase,
        Self::QqHigh,
        Self::QqLow,
        Self::CmosHigh,
        Self::CmosLow,
    ];
    const NAMES: &'static [&'static str] = &[
        "Frequency",
        "Phase",
        "Q/Q! High",
        "Q/Q! Low",
        "CMOS high",
        "CMOS low",
    ];

    fn index(self) -> u8 {
        self as u8
    }
}

impl ParameterTable for OutputStandard {
    const KIND: &'static str = "Output standard";
    const ALL: &'static [Self] = &[
        Self::Ecl,
        Self::Plus7Dbm,
        Self::Lvds,
        Self::Pecl3V3,
        Self::Pecl5V0,
    ];
    const NAMES: &'static [&'static str] = &["ECL", "+7 dBm", "LVDS", "PECL 3.3V", "PECL 5.0V"];

    fn index(self) -> u8 {
        self as u8
    }
}

impl From<StepParameter> for DisplayParameter {
    fn from(param: StepParameter) -> Self {
        Self::ALL[usize::from(param.index())]
    }
}

macro_rules! name_conversions {
    ($($table:ty),+) => {$(
        impl fmt::Display for $table {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $table {
            type Err = Cg635Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_name(s)
            }
        }

        impl From<$table> for ParamArg {
            fn from(param: $table) -> Self {
                ParamArg::Index(i64::from(param.index()))
            }
        }
    )+};
}

name_conversions!(DisplayParameter, StepParameter, OutputStandard);
