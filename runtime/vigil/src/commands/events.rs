use vigil_monitor::Event;

/// One row per event: name, bit, payload shape, and the parent event for
/// derived kinds.
pub fn event_table() -> Vec<String> {
    let mut rows = vec![format!(
        "{:<18} {:>6}  {:<12} {}",
        "EVENT", "BIT", "SHAPE", "DERIVED FROM"
    )];
    for event in Event::ALL {
        let parent = event.parent().map_or("", Event::name);
        let row = format!(
            "{:<18} {:>6}  {:<12} {}",
            event.name(),
            format!("{:#x}", event.bit().bits()),
            event.shape().name(),
            parent
        );
        rows.push(row.trim_end().to_string());
    }
    rows
}

/// `vigil events`
pub fn print_events() {
    for row in event_table() {
        println!("{row}");
    }
}
