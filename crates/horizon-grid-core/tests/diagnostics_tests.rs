//! Diagnostics channel behaviour seen from a subscriber.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use horizon_grid_core::{Diagnostics, Error, GridWarning, WarningCode};
use parking_lot::Mutex;

#[test]
fn test_subscriber_sees_every_warning() {
    let diagnostics = Diagnostics::new();
    diagnostics.set_suppress_logging(true);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    diagnostics.warning.connect(move |warning: &GridWarning| {
        sink.lock().push((warning.code, warning.context_value("rowId").map(str::to_string)));
    });

    diagnostics.report(GridWarning::missing_parent("B", "A"));
    diagnostics.report(GridWarning::cycle_detected("X", "X"));

    assert_eq!(
        *seen.lock(),
        vec![
            (WarningCode::MissingParent, Some("B".to_string())),
            (WarningCode::CycleDetected, Some("X".to_string())),
        ]
    );
    assert_eq!(diagnostics.take().len(), 2);
    assert!(diagnostics.is_empty());
}

#[test]
fn test_history_limit_drops_oldest() {
    let diagnostics = Diagnostics::with_history_limit(2);
    diagnostics.set_suppress_logging(true);
    let emitted = Arc::new(AtomicUsize::new(0));
    let counter = emitted.clone();
    diagnostics.warning.connect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    for id in ["a", "b", "c"] {
        diagnostics.report(GridWarning::row_not_found(id, "remove"));
    }

    let ids: Vec<String> = diagnostics
        .warnings()
        .iter()
        .filter_map(|w| w.context_value("rowId").map(str::to_string))
        .collect();
    assert_eq!(ids, vec!["b", "c"]);
    assert_eq!(emitted.load(Ordering::SeqCst), 3);
}

#[test]
fn test_codes_are_stable() {
    let codes: Vec<u32> = WarningCode::ALL.iter().map(|c| c.code()).collect();
    assert_eq!(codes, (1..=8).collect::<Vec<_>>());
    assert_eq!(WarningCode::from_code(5), Ok(WarningCode::OrphanedChildren));
    assert_eq!(WarningCode::from_code(42), Err(Error::UnknownWarningCode(42)));
}
