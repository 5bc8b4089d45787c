use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_bits_follow_declaration_order() {
    for (index, event) in Event::ALL.iter().enumerate() {
        assert_eq!(event.index(), index);
        assert_eq!(event.bit().bits(), 1 << index);
    }
}

#[test]
fn test_frame_events_sum_to_fifteen() {
    let frame = Event::PyStart.bit()
        | Event::PyResume.bit()
        | Event::PyReturn.bit()
        | Event::PyYield.bit();
    assert_eq!(frame.bits(), 15);
}

#[test]
fn test_only_c_events_are_derived() {
    let derived: Vec<Event> = Event::ALL.iter().copied().filter(|e| e.is_derived()).collect();
    assert_eq!(derived, vec![Event::CReturn, Event::CRaise]);
    assert_eq!(Event::CReturn.parent(), Some(Event::Call));
    assert_eq!(Event::CRaise.gate(), Event::Call);
    assert_eq!(Event::Line.gate(), Event::Line);
}

#[test]
fn test_call_family_shares_shape() {
    assert_eq!(Event::Call.shape(), Shape::Call);
    assert_eq!(Event::CReturn.shape(), Shape::Call);
    assert_eq!(Event::CRaise.shape(), Shape::Call);
    assert_eq!(Event::Jump.shape(), Event::Branch.shape());
    assert_eq!(Event::Raise.shape(), Shape::Exception);
    assert_eq!(Event::StopIteration.shape(), Shape::Exception);
}

#[test]
fn test_parse_round_trips_names() {
    for event in Event::ALL {
        assert_eq!(event.name().parse::<Event>(), Ok(event));
        assert_eq!(event.to_string(), event.name());
    }
}

#[test]
fn test_parse_ignores_case() {
    assert_eq!("py_start".parse::<Event>(), Ok(Event::PyStart));
    assert_eq!(" c_raise ".parse::<Event>(), Ok(Event::CRaise));
}

#[test]
fn test_parse_unknown() {
    assert_eq!(
        "PY_THROW".parse::<Event>(),
        Err(UnknownEvent("PY_THROW".to_string()))
    );
}
