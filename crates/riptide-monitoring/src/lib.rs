//! Traffic accounting engine for the HLS proxy.
//!
//! [`accumulator::TrafficAccumulator`] is the ingest side the streaming
//! transport records every pumped chunk into (via
//! `riptide_types::TrafficRecorder`); [`report`] and [`cleanup`] are its two
//! background loops — periodic upstream reporting and idle eviction.
//! OpenTelemetry wiring (the ambient tracing/metrics export stack) lives in
//! `init` alongside these, following the same "one process-wide init
//! function" shape the teacher used for its telemetry bootstrap.

pub mod accumulator;
pub mod cleanup;
pub mod init;
pub mod report;

pub use accumulator::{TrafficAccumulator, TrafficEngineStatus, TrafficRecord};
pub use cleanup::spawn_long_idle_cleanup_loop;
pub use init::{init_tracing, TracingGuard};
pub use report::{report_once, spawn_report_loop};
