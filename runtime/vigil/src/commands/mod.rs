//! Command handlers for the Vigil CLI.
//!
//! `trace` is the only command with real work; `samples` and `events` print
//! static tables.

mod events;
mod samples;
mod trace;

pub use events::{event_table, print_events};
pub use samples::print_samples;
pub use trace::{
    parse_events, parse_tool, parse_trace_options, trace, OptionError, TraceError, TraceOptions,
    TraceReport,
};
