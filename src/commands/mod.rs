//! Commands
//!
//! Entry points exposed to hosts and to the CLI. Every command takes the
//! shared `AppState` and answers with a `CommandResponse`.

pub mod host;
pub mod rules;
pub mod settings;

pub use host::*;
pub use rules::*;
pub use settings::*;
