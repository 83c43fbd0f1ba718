//! SerialDispatcher tests.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use sourced_dispatch::{
    handler_fn, Command, DispatchError, Dispatcher, HandlerError, SerialDispatcher,
};

use crate::support::{as_handlers, claims, cmd, TestCommand, TestHandler};

fn setup() -> (Arc<TestHandler>, Arc<TestHandler>, SerialDispatcher) {
    let a = TestHandler::for_command(TestCommand::A);
    let b = TestHandler::for_command(TestCommand::B);
    let dispatcher = SerialDispatcher::new(as_handlers(&[&a, &b]));
    (a, b, dispatcher)
}

// ============================================================================
// Construction and registration
// ============================================================================

#[test]
fn dispatches_to_the_matching_handler() {
    let (a, b, dispatcher) = setup();

    dispatcher.dispatch(cmd(TestCommand::A)).unwrap();
    assert_eq!(a.can_handle_calls(), 1);
    assert_eq!(b.can_handle_calls(), 1);
    assert_eq!(a.handle_calls(), 1);
    assert_eq!(b.handle_calls(), 0);

    dispatcher.dispatch(cmd(TestCommand::B)).unwrap();
    assert_eq!(a.can_handle_calls(), 2);
    assert_eq!(b.can_handle_calls(), 2);
    assert_eq!(a.handle_calls(), 1);
    assert_eq!(b.handle_calls(), 1);
}

#[test]
fn append_handlers_extends_the_registry() {
    let (a, b, dispatcher) = setup();
    let c = TestHandler::for_command(TestCommand::C);
    assert_eq!(dispatcher.append_handlers(as_handlers(&[&c])).unwrap(), 1);

    dispatcher.dispatch(cmd(TestCommand::A)).unwrap();
    dispatcher.dispatch(cmd(TestCommand::B)).unwrap();
    dispatcher.dispatch(cmd(TestCommand::C)).unwrap();

    for handler in [&a, &b, &c] {
        assert_eq!(handler.can_handle_calls(), 3);
        assert_eq!(handler.handle_calls(), 1);
    }
}

#[test]
fn appending_the_same_handler_twice_keeps_one_entry() {
    let (a, _b, dispatcher) = setup();
    assert_eq!(dispatcher.append_handlers(as_handlers(&[&a, &a])).unwrap(), 0);
    assert_eq!(dispatcher.handlers().unwrap().len(), 2);

    dispatcher.dispatch(cmd(TestCommand::A)).unwrap();
    assert_eq!(a.can_handle_calls(), 1);
    assert_eq!(a.handle_calls(), 1);
}

// ============================================================================
// Dispatch outcomes
// ============================================================================

#[test]
fn returns_the_handler_error() {
    let (a, _b, dispatcher) = setup();
    a.set_handle(|_, _| Err(HandlerError::rejected("expected")));

    let err = dispatcher.dispatch(cmd(TestCommand::A)).unwrap_err();
    assert!(matches!(err, DispatchError::Handler(HandlerError::Rejected(ref s)) if s == "expected"));
}

#[test]
fn ignores_errors_of_handlers_that_did_not_match() {
    let (a, _b, dispatcher) = setup();
    a.set_handle(|_, _| Err(HandlerError::rejected("not expected")));

    assert!(dispatcher.dispatch(cmd(TestCommand::B)).is_ok());
}

#[test]
fn only_the_second_handler_matches() {
    let (a, b, dispatcher) = setup();

    dispatcher.dispatch(cmd(TestCommand::B)).unwrap();
    assert_eq!(a.can_handle_calls(), 1);
    assert_eq!(b.can_handle_calls(), 1);
    assert_eq!(a.handle_calls(), 0);
    assert_eq!(b.handle_calls(), 1);
}

#[test]
fn no_handler_found_carries_the_command() {
    let (_a, _b, dispatcher) = setup();

    let err = dispatcher.dispatch(cmd(TestCommand::C)).unwrap_err();
    match err {
        DispatchError::NoHandlerFound(e) => {
            assert_eq!(e.command.downcast_ref::<TestCommand>(), Some(&TestCommand::C));
        }
        other => panic!("expected NoHandlerFound, got {:?}", other),
    }
}

#[test]
fn stops_at_the_first_error() {
    let (a, b, dispatcher) = setup();
    b.set_can_handle(|_| true);
    a.set_handle(|_, _| Err(HandlerError::failed("a failed")));

    let err = dispatcher.dispatch(cmd(TestCommand::A)).unwrap_err();
    assert!(matches!(err, DispatchError::Handler(HandlerError::Failed(_))));
    assert_eq!(a.handle_calls(), 1);
    assert_eq!(b.can_handle_calls(), 0);
    assert_eq!(b.handle_calls(), 0);
}

#[test]
fn runs_every_matching_handler_in_order() {
    let (a, b, dispatcher) = setup();
    let order = Arc::new(Mutex::new(Vec::new()));
    b.set_can_handle(claims(TestCommand::A));
    let seen = order.clone();
    a.set_handle(move |_, _| {
        seen.lock().unwrap().push("a");
        Ok(())
    });
    let seen = order.clone();
    b.set_handle(move |_, _| {
        seen.lock().unwrap().push("b");
        Ok(())
    });

    dispatcher.dispatch(cmd(TestCommand::A)).unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
}

// ============================================================================
// Panics
// ============================================================================

#[test]
fn recovers_from_panics() {
    let (a, b, dispatcher) = setup();

    a.set_can_handle(|_| std::panic::panic_any(HandlerError::failed("can_handle panic")));
    let err = dispatcher.dispatch(cmd(TestCommand::A)).unwrap_err();
    assert!(matches!(err, DispatchError::Handler(HandlerError::Failed(ref s)) if s == "can_handle panic"));

    a.clear_can_handle();
    b.set_handle(|_, _| std::panic::panic_any(HandlerError::failed("handle panic")));
    let err = dispatcher.dispatch(cmd(TestCommand::B)).unwrap_err();
    assert!(matches!(err, DispatchError::Handler(HandlerError::Failed(ref s)) if s == "handle panic"));
}

#[test]
fn wraps_non_error_panic_payloads() {
    let (a, _b, dispatcher) = setup();
    a.set_handle(|_, _| panic!("plain message"));

    let err = dispatcher.dispatch(cmd(TestCommand::A)).unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Handler(HandlerError::Panicked { ref message, .. }) if message == "plain message"
    ));

    // The dispatcher keeps working after a panic.
    a.set_handle(|_, _| Ok(()));
    assert!(dispatcher.dispatch(cmd(TestCommand::A)).is_ok());
}

#[test]
fn lone_panicking_predicate_is_reported() {
    let handler = handler_fn(|_| panic!("predicate blew up"), |_, _| Ok(())).into_handler();
    let dispatcher = SerialDispatcher::new(vec![handler]);

    let err = dispatcher.dispatch(Command::new(7u32)).unwrap_err();
    assert!(!err.is_no_handler_found());
    assert!(matches!(
        err,
        DispatchError::Handler(HandlerError::Panicked { ref message, .. }) if message == "predicate blew up"
    ));
    assert!(dispatcher.dispatch_optional(Command::new(7u32)).is_err());
}

// ============================================================================
// Ordering
// ============================================================================

#[test]
fn evaluates_handlers_one_after_another() {
    let (a, b, dispatcher) = setup();
    let order = Arc::new(Mutex::new(Vec::new()));

    let seen = order.clone();
    a.set_can_handle(move |_| {
        thread::sleep(Duration::from_millis(10));
        seen.lock().unwrap().push(1);
        false
    });
    let seen = order.clone();
    b.set_can_handle(move |_| {
        seen.lock().unwrap().push(2);
        true
    });

    dispatcher.dispatch(cmd(TestCommand::B)).unwrap();
    assert_eq!(*order.lock().unwrap(), vec![1, 2]);
}

// ============================================================================
// dispatch_optional
// ============================================================================

#[test]
fn dispatch_optional_returns_handler_errors() {
    let (a, _b, dispatcher) = setup();
    a.set_handle(|_, _| Err(HandlerError::rejected("expected")));

    let err = dispatcher.dispatch_optional(cmd(TestCommand::A)).unwrap_err();
    assert_eq!(err.to_string(), "rejected: expected");
}

#[test]
fn dispatch_optional_absorbs_no_handler_found() {
    let (_a, _b, dispatcher) = setup();
    assert!(dispatcher.dispatch_optional(cmd(TestCommand::C)).is_ok());
    assert!(dispatcher.dispatch_optional(Command::new("unrelated")).is_ok());
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn concurrent_dispatch_and_append() {
    let a = TestHandler::for_command(TestCommand::A);
    let dispatcher = Arc::new(SerialDispatcher::new(as_handlers(&[&a])));

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            thread::spawn(move || {
                for _ in 0..25 {
                    dispatcher.dispatch(cmd(TestCommand::A)).unwrap();
                }
            })
        })
        .collect();

    let extra: Vec<Arc<TestHandler>> = (0..10).map(|_| Arc::new(TestHandler::default())).collect();
    for handler in &extra {
        dispatcher.append_handlers(as_handlers(&[handler])).unwrap();
    }

    for worker in workers {
        worker.join().unwrap();
    }

    assert_eq!(a.handle_calls(), 100);
    assert_eq!(dispatcher.handlers().unwrap().len(), 11);
}
