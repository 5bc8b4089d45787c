//! Shared helpers: running samples under monitoring and recording what the
//! callbacks see.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use vigil_monitor::{Action, Callback, CodeUnit, Event, EventSet, ToolId};
use vigil_vm::{samples, Exception, Monitoring, Value, Vm, VmHost};

pub fn monitoring() -> Arc<Monitoring> {
    Arc::new(Monitoring::new())
}

/// Run the named sample from the host.
pub fn run(monitoring: &Arc<Monitoring>, name: &str) -> Result<Value, Exception> {
    let sample = samples::find(name).unwrap_or_else(|| panic!("no sample '{name}'"));
    let function = sample.function().unwrap();
    Vm::new(Arc::clone(monitoring)).call(&function, vec![])
}

/// Claim `tool` and arm `events` for it.
pub fn arm(monitoring: &Monitoring, tool: ToolId, events: EventSet) {
    if monitoring.get_tool(tool).is_none() {
        monitoring.use_tool_id(tool, "test").unwrap();
    }
    monitoring.set_events(tool, events).unwrap();
}

/// One delivered event, rendered for comparison.
///
/// `detail` depends on the shape: lines relative to the code's first line,
/// values and exceptions in their debug form, callables by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub event: Event,
    pub code: String,
    pub detail: String,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.detail.is_empty() {
            write!(f, "{} {}", self.event, self.code)
        } else {
            write!(f, "{} {} {}", self.event, self.code, self.detail)
        }
    }
}

fn relative_line(code: &dyn CodeUnit, offset: u32) -> String {
    match code.line_at(offset) {
        Some(line) => (i64::from(line) - i64::from(code.first_line())).to_string(),
        None => "?".to_string(),
    }
}

fn callable_name(value: &Value) -> String {
    value
        .callable_name()
        .map_or_else(|| format!("{value:?}"), str::to_string)
}

/// Collects [`Record`]s from any number of events.
#[derive(Clone, Default)]
pub struct Recorder {
    records: Arc<Mutex<Vec<Record>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: Event, code: &dyn CodeUnit, detail: String) {
        self.records.lock().push(Record {
            event,
            code: code.name().to_string(),
            detail,
        });
    }

    /// A callback for `event` that records and continues.
    pub fn callback(&self, event: Event) -> Callback<VmHost> {
        self.callback_returning(event, Action::Continue)
    }

    /// A callback for `event` that records and then returns `action`.
    pub fn callback_returning(&self, event: Event, action: Action) -> Callback<VmHost> {
        let this = self.clone();
        match event.shape() {
            vigil_monitor::Shape::Code => Callback::code(move |e| {
                let detail = e.value.map(|v| format!("{v:?}")).unwrap_or_default();
                this.push(event, e.code, detail);
                Ok(action)
            }),
            vigil_monitor::Shape::Call => Callback::call(move |e| {
                let detail = format!("{} {:?}", callable_name(e.callable), e.arg);
                this.push(event, e.code, detail);
                Ok(action)
            }),
            vigil_monitor::Shape::Line => Callback::line(move |e| {
                let detail = (i64::from(e.line) - i64::from(e.code.first_line())).to_string();
                this.push(event, e.code, detail);
                Ok(action)
            }),
            vigil_monitor::Shape::Instruction => Callback::instruction(move |e| {
                this.push(event, e.code, e.offset.to_string());
                Ok(action)
            }),
            vigil_monitor::Shape::Exception => Callback::exception(move |e| {
                this.push(event, e.code, format!("{:?}", e.exception));
                Ok(action)
            }),
            vigil_monitor::Shape::Branch => Callback::branch(move |e| {
                let detail = format!(
                    "{}->{}",
                    relative_line(e.code, e.from),
                    relative_line(e.code, e.to)
                );
                this.push(event, e.code, detail);
                Ok(action)
            }),
        }
    }

    /// Register a recording callback for every event in `events` and arm
    /// them, claiming `tool` if needed.
    pub fn install(&self, monitoring: &Monitoring, tool: ToolId, events: EventSet) {
        arm(monitoring, tool, events.normalized());
        for event in events.with_derived().events() {
            monitoring
                .register_callback(tool, event, Some(self.callback(event)))
                .unwrap();
        }
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().clone()
    }

    /// Records rendered with [`Record`]'s `Display`.
    pub fn lines(&self) -> Vec<String> {
        self.records().iter().map(ToString::to_string).collect()
    }

    /// Records of one event, rendered as their detail only.
    pub fn details(&self, event: Event) -> Vec<String> {
        self.records()
            .into_iter()
            .filter(|r| r.event == event)
            .map(|r| r.detail)
            .collect()
    }

    pub fn count(&self, event: Event) -> usize {
        self.records().iter().filter(|r| r.event == event).count()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }
}

/// A callback for `event` that only counts deliveries.
pub fn counter(event: Event) -> (Callback<VmHost>, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let bump = {
        let hits = Arc::clone(&hits);
        move || -> Result<Action, Exception> {
            hits.fetch_add(1, Ordering::Relaxed);
            Ok(Action::Continue)
        }
    };
    let callback = match event.shape() {
        vigil_monitor::Shape::Code => Callback::code(move |_| bump()),
        vigil_monitor::Shape::Call => Callback::call(move |_| bump()),
        vigil_monitor::Shape::Line => Callback::line(move |_| bump()),
        vigil_monitor::Shape::Instruction => Callback::instruction(move |_| bump()),
        vigil_monitor::Shape::Exception => Callback::exception(move |_| bump()),
        vigil_monitor::Shape::Branch => Callback::branch(move |_| bump()),
    };
    (callback, hits)
}

pub fn hits(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::Relaxed)
}
