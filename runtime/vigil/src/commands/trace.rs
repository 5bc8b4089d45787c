//! `vigil trace <sample>`: run a bundled sample under one tool and collect a
//! line per delivered event.

use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use vigil_monitor::{
    Action, Callback, CodeUnit, Event, EventSet, MonitorError, Shape, ToolId, UnknownEvent,
    DISABLE,
};
use vigil_vm::{samples, BuildError, Exception, Limits, Monitoring, Value, Vm, VmHost};

/// Everything but `INSTRUCTION`, which drowns the rest.
const DEFAULT_EVENTS: EventSet = EventSet::all().difference(EventSet::INSTRUCTION);

/// Options for `vigil trace`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TraceOptions {
    /// Events to arm; derived events follow `CALL`.
    pub events: EventSet,
    /// Slot the tracer claims.
    pub tool: ToolId,
    /// Arm only the sample's entry code instead of globally.
    pub local: bool,
    /// Callbacks return `DISABLE` after reporting.
    pub disable: bool,
    /// Number of times the sample runs.
    pub repeat: usize,
    /// Call `restart_events` between runs.
    pub restart: bool,
    pub limits: Limits,
}

impl Default for TraceOptions {
    fn default() -> Self {
        TraceOptions {
            events: DEFAULT_EVENTS,
            tool: ToolId::DEBUGGER,
            local: false,
            disable: false,
            repeat: 1,
            restart: false,
            limits: Limits::default(),
        }
    }
}

/// A `vigil trace` flag that does not parse.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OptionError {
    #[error("unknown option '{0}'")]
    UnknownOption(String),

    #[error(transparent)]
    Event(#[from] UnknownEvent),

    #[error("invalid tool '{0}' (expected 0-5, debugger, coverage, profiler or optimizer)")]
    Tool(String),

    #[error("invalid count '{0}' for {1}")]
    Count(String, &'static str),
}

/// A trace that could not run.
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("unknown sample '{0}' (run `vigil samples` to list them)")]
    UnknownSample(String),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Monitor(#[from] MonitorError),
}

/// Parse a comma-separated event list. `all` names every event.
pub fn parse_events(list: &str) -> Result<EventSet, UnknownEvent> {
    let mut events = EventSet::NO_EVENTS;
    for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
        if name.eq_ignore_ascii_case("all") {
            events |= EventSet::all();
        } else {
            events |= Event::from_str(name)?.bit();
        }
    }
    Ok(events)
}

/// Parse a tool slot number or one of the well-known tool names.
pub fn parse_tool(text: &str) -> Result<ToolId, OptionError> {
    let tool = match text.to_ascii_lowercase().as_str() {
        "debugger" => Some(ToolId::DEBUGGER),
        "coverage" => Some(ToolId::COVERAGE),
        "profiler" => Some(ToolId::PROFILER),
        "optimizer" => Some(ToolId::OPTIMIZER),
        other => other
            .parse::<u32>()
            .ok()
            .and_then(|slot| ToolId::try_from(slot).ok()),
    };
    tool.ok_or_else(|| OptionError::Tool(text.to_string()))
}

fn parse_count(text: &str, option: &'static str) -> Result<usize, OptionError> {
    match text.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(OptionError::Count(text.to_string(), option)),
    }
}

/// Parse the flags following `vigil trace <sample>`.
pub fn parse_trace_options(args: &[String]) -> Result<TraceOptions, OptionError> {
    let mut options = TraceOptions::default();
    for arg in args {
        if let Some(list) = arg.strip_prefix("--events=") {
            options.events = parse_events(list)?;
        } else if let Some(tool) = arg.strip_prefix("--tool=") {
            options.tool = parse_tool(tool)?;
        } else if let Some(n) = arg.strip_prefix("--repeat=") {
            options.repeat = parse_count(n, "--repeat")?;
        } else if let Some(n) = arg.strip_prefix("--max-depth=") {
            options.limits = options.limits.with_max_depth(parse_count(n, "--max-depth")?);
        } else if arg == "--local" {
            options.local = true;
        } else if arg == "--disable" {
            options.disable = true;
        } else if arg == "--restart" {
            options.restart = true;
        } else {
            return Err(OptionError::UnknownOption(arg.clone()));
        }
    }
    Ok(options)
}

/// What a trace produced.
#[derive(Debug)]
pub struct TraceReport {
    /// One rendered line per delivered event, in delivery order.
    pub lines: Vec<String>,
    /// Each run's result.
    pub outcomes: Vec<Result<Value, Exception>>,
}

type Log = Arc<Mutex<Vec<String>>>;

fn render(event: Event, code: &dyn CodeUnit, offset: u32, detail: Option<String>) -> String {
    let mut line = format!("{:<17} {}@{offset}", event.name(), code.name());
    if let Some(detail) = detail {
        line.push(' ');
        line.push_str(&detail);
    }
    line
}

fn callable_name(value: &Value) -> String {
    value
        .callable_name()
        .map_or_else(|| format!("{value:?}"), str::to_string)
}

/// A callback for `event` that appends a rendered line to `log`.
fn printer(event: Event, action: Action, log: &Log) -> Callback<VmHost> {
    let log = Arc::clone(log);
    match event.shape() {
        Shape::Code => Callback::code(move |e| {
            let detail = e.value.map(|v| format!("-> {v:?}"));
            log.lock().push(render(event, e.code, e.offset, detail));
            Ok(action)
        }),
        Shape::Call => Callback::call(move |e| {
            let detail = format!("{} {:?}", callable_name(e.callable), e.arg);
            log.lock().push(render(event, e.code, e.offset, Some(detail)));
            Ok(action)
        }),
        Shape::Line => Callback::line(move |e| {
            let detail = format!("line {}", e.line);
            log.lock().push(render(event, e.code, e.offset, Some(detail)));
            Ok(action)
        }),
        Shape::Instruction => Callback::instruction(move |e| {
            log.lock().push(render(event, e.code, e.offset, None));
            Ok(action)
        }),
        Shape::Exception => Callback::exception(move |e| {
            let detail = format!("{:?}", e.exception);
            log.lock().push(render(event, e.code, e.offset, Some(detail)));
            Ok(action)
        }),
        Shape::Branch => Callback::branch(move |e| {
            let detail = format!("-> {}", e.to);
            log.lock().push(render(event, e.code, e.from, Some(detail)));
            Ok(action)
        }),
    }
}

/// Run the named sample `options.repeat` times under a freshly claimed tool.
///
/// The sample's exceptions are outcomes, not errors; `Err` means the trace
/// itself could not be set up.
pub fn trace(sample: &str, options: &TraceOptions) -> Result<TraceReport, TraceError> {
    let sample =
        samples::find(sample).ok_or_else(|| TraceError::UnknownSample(sample.to_string()))?;
    let code = sample.build()?;
    let monitoring = Arc::new(Monitoring::new());
    let tool = options.tool;
    monitoring.use_tool_id(tool, "vigil trace")?;

    let log = Log::default();
    let action = if options.disable {
        DISABLE
    } else {
        Action::Continue
    };
    for event in options.events.with_derived().events() {
        monitoring.register_callback(tool, event, Some(printer(event, action, &log)))?;
    }
    if options.local {
        monitoring.set_local_events(tool, code.id(), options.events)?;
    } else {
        monitoring.set_events(tool, options.events)?;
    }

    let function = Value::Function(code);
    let mut vm = Vm::with_limits(Arc::clone(&monitoring), options.limits);
    let mut outcomes = Vec::with_capacity(options.repeat);
    for run in 0..options.repeat {
        if run > 0 && options.restart {
            monitoring.restart_events();
        }
        tracing::debug!(sample = sample.name, run, "running sample");
        outcomes.push(vm.call(&function, vec![]));
    }
    tracing::debug!(
        disabled = monitoring.disabled_count(),
        events = log.lock().len(),
        "trace finished"
    );
    monitoring.free_tool_id(tool)?;

    let lines = std::mem::take(&mut *log.lock());
    Ok(TraceReport { lines, outcomes })
}
