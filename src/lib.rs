// Decoder, replay and race logic shared by the binary and the integration tests.
// CLI parsing and terminal wiring stay in main.rs.
pub mod app_dirs;
pub mod config;
pub mod decoder;
pub mod error;
pub mod input;
pub mod listener;
pub mod profile;
pub mod race;
pub mod replay;
pub mod runtime;
pub mod session;
pub mod util;

pub use decoder::{Condition, Role, StrokeDecoder, Transition};
pub use error::{Error, Result};
pub use input::{Button, InputEvent, InputLog};
pub use listener::{RowListener, RowSignal};
