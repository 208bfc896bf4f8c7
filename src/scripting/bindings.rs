//! Instrument bindings for Rhai scripts
//!
//! Exposes the CG635 controller to scripts as the `Cg635` type. Parameter
//! arguments accept either a name (case-insensitive) or an index, exactly as
//! the Rust API does.
//!
//! ```rhai
//! cg.set_frequency(10e6);
//! cg.set_display("q/q! high");
//! cg.step_by("phase", -3);
//! let steps = cg.set_differential_level(0.20, 0.60);
//! print(`walked ${steps} steps`);
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use rhai::{Engine, EvalAltResult, ImmutableString};

use crate::error::{Cg635Error, Cg635Result};
use crate::instrument::Cg635;
use crate::parameters::ParamArg;

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;

/// Shared handle to a CG635 controller, cloneable into script scope
#[derive(Clone)]
pub struct Cg635Handle {
    inner: Arc<Mutex<Cg635>>,
}

impl Cg635Handle {
    /// Wrap a controller so scripts can drive it
    pub fn new(cg: Cg635) -> Self {
        Self {
            inner: Arc::new(Mutex::new(cg)),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Cg635) -> Cg635Result<R>) -> ScriptResult<R> {
        let mut cg = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut cg).map_err(to_script_error)
    }
}

fn to_script_error(e: Cg635Error) -> Box<EvalAltResult> {
    e.to_string().into()
}

fn name_arg(name: &ImmutableString) -> ParamArg {
    ParamArg::Name(name.to_string())
}

/// Register the `Cg635` type, its methods and `sleep_ms` with an engine
pub fn register_cg635(engine: &mut Engine) {
    engine.register_type_with_name::<Cg635Handle>("Cg635");

    engine.register_fn("idn", |cg: &mut Cg635Handle| cg.with(|c| c.identify()));
    engine.register_fn("self_test", |cg: &mut Cg635Handle| cg.with(|c| c.self_test()));
    engine.register_fn("write", |cg: &mut Cg635Handle, cmd: ImmutableString| {
        cg.with(|c| c.write(&cmd))
    });
    engine.register_fn("query", |cg: &mut Cg635Handle, cmd: ImmutableString| {
        cg.with(|c| c.query(&cmd))
    });
    engine.register_fn("close", |cg: &mut Cg635Handle| cg.with(|c| c.close()));

    // Display
    engine.register_fn("set_display", |cg: &mut Cg635Handle, name: ImmutableString| {
        cg.with(|c| c.set_display(name_arg(&name)).map(|d| d.to_string()))
    });
    engine.register_fn("set_display", |cg: &mut Cg635Handle, index: i64| {
        cg.with(|c| c.set_display(index).map(|d| d.to_string()))
    });
    engine.register_fn("get_display", |cg: &mut Cg635Handle| cg.with(|c| c.get_display()));

    // Frequency
    engine.register_fn("get_frequency", |cg: &mut Cg635Handle| {
        cg.with(|c| c.get_frequency())
    });
    engine.register_fn("set_frequency", |cg: &mut Cg635Handle, hz: f64| {
        cg.with(|c| c.set_frequency(hz))
    });
    engine.register_fn("set_frequency", |cg: &mut Cg635Handle, hz: i64| {
        cg.with(|c| c.set_frequency(hz as f64))
    });

    // Stepping
    engine.register_fn("step_up", |cg: &mut Cg635Handle, name: ImmutableString| {
        cg.with(|c| c.step_up(name_arg(&name)).map(|s| s.to_string()))
    });
    engine.register_fn("step_up", |cg: &mut Cg635Handle, index: i64| {
        cg.with(|c| c.step_up(index).map(|s| s.to_string()))
    });
    engine.register_fn("step_down", |cg: &mut Cg635Handle, name: ImmutableString| {
        cg.with(|c| c.step_down(name_arg(&name)).map(|s| s.to_string()))
    });
    engine.register_fn("step_down", |cg: &mut Cg635Handle, index: i64| {
        cg.with(|c| c.step_down(index).map(|s| s.to_string()))
    });
    engine.register_fn(
        "step_by",
        |cg: &mut Cg635Handle, name: ImmutableString, count: i64| {
            let count = step_count(count)?;
            cg.with(|c| c.step_by(name_arg(&name), count).map(|s| s.to_string()))
        },
    );
    engine.register_fn("step_by", |cg: &mut Cg635Handle, index: i64, count: i64| {
        let count = step_count(count)?;
        cg.with(|c| c.step_by(index, count).map(|s| s.to_string()))
    });
    engine.register_fn(
        "set_step_size",
        |cg: &mut Cg635Handle, name: ImmutableString, value: f64| {
            cg.with(|c| c.set_step_size(name_arg(&name), value).map(|s| s.to_string()))
        },
    );
    engine.register_fn(
        "set_step_size",
        |cg: &mut Cg635Handle, index: i64, value: f64| {
            cg.with(|c| c.set_step_size(index, value).map(|s| s.to_string()))
        },
    );

    // Q/Q! outputs
    engine.register_fn(
        "set_output_standard",
        |cg: &mut Cg635Handle, name: ImmutableString| {
            cg.with(|c| c.set_output_standard(name_arg(&name)).map(|s| s.to_string()))
        },
    );
    engine.register_fn("set_output_standard", |cg: &mut Cg635Handle, index: i64| {
        cg.with(|c| c.set_output_standard(index).map(|s| s.to_string()))
    });
    engine.register_fn(
        "set_differential_level",
        |cg: &mut Cg635Handle, low: f64, high: f64| {
            cg.with(|c| {
                c.set_differential_output_level(low, high)
                    .map(|plan| i64::from(plan.step_count()))
            })
        },
    );

    engine.register_fn("sleep_ms", |ms: i64| {
        thread::sleep(Duration::from_millis(ms.max(0) as u64));
    });
}

fn step_count(count: i64) -> ScriptResult<i32> {
    i32::try_from(count).map_err(|_| format!("step count {} is too large", count).into())
}
