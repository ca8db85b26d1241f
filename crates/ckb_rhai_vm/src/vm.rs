//! Script execution harness.
//!
//! `run` is the whole entry point of a lock/type script:
//!
//! ```text
//! load Script ──fail──▶ -1   (guest code never runs)
//!      │
//!   evaluate args ──uncaught──▶ diagnostic, -2
//!      │
//!      ▼
//!      0
//! ```

use crate::bindings;
use crate::config::VmConfig;
use crate::error::{Exception, ExitStatus};
use ckb_script::{load_and_verify_with, ARGS_SIZE, SCRIPT_SIZE};
use ckb_syscalls::Syscalls;
use rhai::packages::{
    BasicArrayPackage, BasicBlobPackage, BasicMapPackage, BasicMathPackage, BitFieldPackage,
    CorePackage, LogicPackage, MoreStringPackage, Package,
};
use rhai::{Dynamic, Engine, ImmutableString};
use std::rc::Rc;
use tracing::{debug, info, warn};

pub struct ScriptVm {
    engine: Engine,
    host: Rc<dyn Syscalls>,
}

fn sandboxed_engine(cfg: &VmConfig) -> Engine {
    // no time package: evaluation must not observe the wall clock
    let mut engine = Engine::new_raw();
    engine.register_global_module(CorePackage::new().as_shared_module());
    engine.register_global_module(LogicPackage::new().as_shared_module());
    engine.register_global_module(BasicMathPackage::new().as_shared_module());
    engine.register_global_module(BitFieldPackage::new().as_shared_module());
    engine.register_global_module(BasicArrayPackage::new().as_shared_module());
    engine.register_global_module(BasicBlobPackage::new().as_shared_module());
    engine.register_global_module(BasicMapPackage::new().as_shared_module());
    engine.register_global_module(MoreStringPackage::new().as_shared_module());
    engine.set_strict_variables(true);
    cfg.apply(&mut engine);
    engine
}

impl ScriptVm {
    pub fn new(cfg: VmConfig, host: Rc<dyn Syscalls>) -> Self {
        let mut engine = sandboxed_engine(&cfg);

        let h = host.clone();
        engine.on_print(move |text| h.debug(text));
        let h = host.clone();
        engine.on_debug(move |text, _source, _pos| h.debug(text));
        // strings reach the debug channel unquoted
        engine.register_fn("debug", |text: ImmutableString| text);

        bindings::register(&mut engine, host.clone(), cfg.max_array_size);
        Self { engine, host }
    }

    pub fn host(&self) -> &dyn Syscalls {
        self.host.as_ref()
    }

    /// Compiles and evaluates a guest program.
    pub fn evaluate(&self, program: &[u8]) -> Result<Dynamic, Exception> {
        let source = std::str::from_utf8(program)?;
        let ast = self.engine.compile(source)?;
        let value = self.engine.eval_ast::<Dynamic>(&ast)?;
        Ok(value)
    }

    /// Loads the current Script and runs its `args` as the program.
    pub fn run(&self) -> ExitStatus {
        self.run_with::<SCRIPT_SIZE>(ARGS_SIZE)
    }

    /// [`run`](Self::run) with an explicit load buffer and program bound.
    pub fn run_with<const CAP: usize>(&self, max_args: usize) -> ExitStatus {
        let script = match load_and_verify_with::<CAP, _>(self.host.as_ref(), max_args) {
            Ok(script) => script,
            Err(e) => {
                warn!(error = %e, "script load failed");
                return ExitStatus::LoadFailed;
            }
        };
        debug!(?script, "evaluating script args");

        match self.evaluate(script.args()) {
            Ok(_) => {
                info!("script succeeded");
                ExitStatus::Success
            }
            Err(e) => {
                warn!(error = %e, "uncaught exception");
                self.report(&e);
                ExitStatus::Uncaught
            }
        }
    }

    #[cfg(feature = "stdio")]
    fn report(&self, e: &Exception) {
        println!("{}", e.inspect());
    }

    #[cfg(not(feature = "stdio"))]
    fn report(&self, e: &Exception) {
        self.host.debug(&e.inspect());
    }
}
