mod custom_error;
mod register_emissions;

use custom_error::CustomError;
use register_emissions::register_emissions_subscriber;
use rxcore::config::ReplayConfig;
use rxcore::subjects::{BufSize, ReplaySubject};
use rxcore::{Observer, Subscribeable};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn replay_subject_emit_than_complete() {
    let (mut make_subscriber, nexts, completes, errors) = register_emissions_subscriber();

    let x = make_subscriber.pop().unwrap()();
    let (mut stx, mut srx) = ReplaySubject::emitter_receiver(BufSize::Bounded(5));

    // Emitting a value without any registered subscribers yet; still storing the emitted value.
    stx.next(1);

    assert_eq!(srx.len(), 0);
    assert_eq!(nexts.lock().unwrap().len(), 0);

    // Register a subscriber and emit the stored value.
    srx.subscribe(x); // 1st

    assert_eq!(srx.len(), 1);
    assert_eq!(*nexts.lock().unwrap(), vec![1]);

    // Live emissions are stored as well.
    stx.next(2);
    stx.next(3);
    stx.next(4);

    assert_eq!(*nexts.lock().unwrap(), vec![1, 2, 3, 4]);

    // Emit all stored values upon registration of additional subscribers.
    let y = make_subscriber.pop().unwrap()();
    let z = make_subscriber.pop().unwrap()();
    srx.subscribe(y); // 2nd
    srx.subscribe(z); // 3rd

    assert_eq!(srx.len(), 3);
    assert_eq!(nexts.lock().unwrap().len(), 12);

    // Buffer holds at most 5 values; the oldest are dropped.
    stx.next(5);
    stx.next(6);

    assert_eq!(nexts.lock().unwrap().len(), 18);

    let w = make_subscriber.pop().unwrap()();
    srx.subscribe(w); // 4th

    assert_eq!(nexts.lock().unwrap().len(), 23);
    assert_eq!(nexts.lock().unwrap()[18..], [2, 3, 4, 5, 6]);

    stx.complete();

    assert_eq!(srx.len(), 0);
    assert_eq!(completes.lock().unwrap().len(), 4);
    assert_eq!(errors.lock().unwrap().len(), 0);

    // A terminated subject delivers only its terminal event.
    let late = make_subscriber.pop().unwrap()();
    srx.subscribe(late); // 5th
    stx.next(7);

    assert_eq!(srx.len(), 0);
    assert_eq!(nexts.lock().unwrap().len(), 23);
    assert_eq!(completes.lock().unwrap().len(), 5);
}

#[test]
fn replay_subject_emit_than_error() {
    let (mut make_subscriber, nexts, completes, errors) = register_emissions_subscriber();

    let (mut stx, mut srx) = ReplaySubject::emitter_receiver(BufSize::Unbounded);

    srx.subscribe(make_subscriber.pop().unwrap()()); // 1st
    srx.subscribe(make_subscriber.pop().unwrap()()); // 2nd

    for v in 1..=10 {
        stx.next(v);
    }

    assert_eq!(nexts.lock().unwrap().len(), 20);

    // Unbounded buffer replays every value.
    srx.subscribe(make_subscriber.pop().unwrap()()); // 3rd
    assert_eq!(nexts.lock().unwrap().len(), 30);

    stx.error(Arc::new(CustomError));

    assert_eq!(srx.len(), 0);
    assert_eq!(errors.lock().unwrap().len(), 3);

    srx.subscribe(make_subscriber.pop().unwrap()()); // 4th
    stx.next(11);

    assert_eq!(nexts.lock().unwrap().len(), 30);
    assert_eq!(completes.lock().unwrap().len(), 0);
    assert_eq!(errors.lock().unwrap().len(), 4);
}

#[test]
fn replay_subject_time_aware_drops_stale_values() {
    let (mut make_subscriber, nexts, _completes, _errors) = register_emissions_subscriber();

    let (mut stx, mut srx) =
        ReplaySubject::emitter_receiver_time_aware(BufSize::Bounded(10), Duration::from_millis(100));

    stx.next(1);
    stx.next(2);
    std::thread::sleep(Duration::from_millis(250));
    stx.next(3);

    srx.subscribe(make_subscriber.pop().unwrap()());

    assert_eq!(*nexts.lock().unwrap(), vec![3]);
}

#[test]
fn replay_subject_with_config_respects_bound() {
    let (mut make_subscriber, nexts, _completes, _errors) = register_emissions_subscriber();

    let config = ReplayConfig::default().with_initial_capacity(2);
    let (mut stx, mut srx) = ReplaySubject::with_config(BufSize::Bounded(3), None, &config);

    for v in 0..6 {
        stx.next(v);
    }
    srx.subscribe(make_subscriber.pop().unwrap()());

    assert_eq!(*nexts.lock().unwrap(), vec![3, 4, 5]);
}
