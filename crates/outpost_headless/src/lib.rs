//! # Outpost Headless
//!
//! Headless driver for the station simulation, for scripted play,
//! CI checks and balance work.
//!
//! ## Protocol
//!
//! The driver communicates via JSON lines over stdin/stdout:
//! - **Input:** Commands like `{"cmd": "click", "station": "reactor"}`
//! - **Output:** Responses like `{"type": "ack", "cmd": "click", ...}`
//!
//! Logs go to stderr so they never interleave with protocol output.
//!
//! ## Usage
//!
//! ```bash
//! # Serve the protocol against a saved game
//! outpost run --snapshot save.json
//!
//! # Tick an hour of play and write the resulting snapshot
//! outpost simulate --ticks 3600 --snapshot save.json --output after.json
//!
//! # Show what offline catch-up would credit
//! outpost catch-up --snapshot save.json
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod protocol;
pub mod runner;

pub use error::{HeadlessError, Result};
pub use protocol::{Command, Response};
pub use runner::HeadlessRunner;
