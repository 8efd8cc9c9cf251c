//! Core modules for Blinkscan

pub mod catalog;
pub mod scan_machine;
pub mod blink_reducer;
pub mod training;
pub mod frame_log;
pub mod session;
pub mod clock;
pub mod runner;
pub mod api;

pub use catalog::{default_alphabet, load_alphabet, parse_alphabet};
pub use scan_machine::ScanMachine;
pub use blink_reducer::{BlinkReducer, gate_sample, is_probability};
pub use training::{TrainingCoordinator, highlight_color, text_color};
pub use frame_log::{build_log_entry, log_path, read_log, FrameLogWriter};
pub use session::{ScanSession, SessionConfig, new_session_id};
pub use clock::{ScanClock, ClockTick};
pub use runner::SessionHandle;
pub use api::{create_router, run_server, ServerConfig};
