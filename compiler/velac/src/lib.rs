//! Vela compiler driver.
//!
//! Wires the level-0 [`reader`] and the host [`runtime`] into a
//! [`vela_compile::Session`] over the reference JIT.

pub mod reader;
pub mod runtime;

use std::rc::Rc;
use std::sync::Once;

use vela_backend::Jit;
use vela_compile::{Session, SessionConfig};

pub use reader::{Reader, UnitReader};
pub use runtime::{install_runtime, Sink};

/// Session type the driver runs.
pub type JitSession = Session<Jit>;

/// Environment variable selecting the hierarchical log layout.
pub const LOG_TREE_VAR: &str = "VELA_LOG_TREE";

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Only installs a subscriber when `RUST_LOG` is set. Safe to call more
/// than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_err() {
            return;
        }
        let filter = EnvFilter::from_default_env();
        if std::env::var(LOG_TREE_VAR).is_ok_and(|v| v == "1") {
            tracing_subscriber::registry()
                .with(tracing_tree::HierarchicalLayer::new(2).with_targets(true))
                .with(filter)
                .init();
        } else {
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

/// A JIT session with the level-0 reader and the runtime host functions
/// writing to `sink`.
pub fn new_session(config: SessionConfig, sink: Sink) -> vela_compile::Result<JitSession> {
    let mut session = Session::new(Jit::new(), config, Rc::new(Reader))?;
    install_runtime(&mut session, sink)?;
    Ok(session)
}
