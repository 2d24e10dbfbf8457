mod generate_observable;
mod register_emissions;

use std::sync::{Arc, Mutex};

use generate_observable::generate_u32_observable;
use register_emissions::recording_subscriber;

use rxcore::{
    subjects::{PublishRelay, Subject},
    subscribe::{Subscriber, Subscription, Unsubscribeable},
    Observable, ObservableExt, Observer, Subscribeable,
};

#[test]
fn connectable_observable() {
    let emitted = Arc::new(Mutex::new(Vec::with_capacity(27)));
    let emitted_cl1 = Arc::clone(&emitted);
    let emitted_cl2 = Arc::clone(&emitted);
    let emitted_cl3 = Arc::clone(&emitted);

    let observer1 = Subscriber::on_next(move |v| {
        emitted_cl1.lock().unwrap().push(v);
    });
    let observer2 = Subscriber::on_next(move |v| {
        emitted_cl2.lock().unwrap().push(v);
    });
    let observer3 = Subscriber::on_next(move |v| {
        emitted_cl3.lock().unwrap().push(v);
    });

    let observable = generate_u32_observable(8, |_| {});

    let mut connectable = observable.publish();

    connectable.subscribe(observer1);
    connectable.subscribe(observer2);
    connectable.subscribe(observer3);

    assert_eq!(
        emitted.lock().unwrap().len(),
        0,
        "connectable observable emitted values before calling `connect()`"
    );
    assert!(!connectable.is_connected());

    let s = connectable.connect();
    assert!(connectable.is_connected());
    let _ = s.join();

    assert_eq!(
        emitted.lock().unwrap().len(),
        27,
        "connectable observable emitted wrong number of values"
    );
}

#[test]
fn connectable_subscribes_source_once() {
    let runs = Arc::new(Mutex::new(0));
    let runs_c = Arc::clone(&runs);
    let source = Observable::new(move |mut o: Subscriber<i32>| {
        *runs_c.lock().unwrap() += 1;
        o.next(1);
        o.complete();
        Subscription::empty()
    });

    let mut connectable = source.publish();
    let (a, a_log) = recording_subscriber();
    let (b, b_log) = recording_subscriber();
    connectable.subscribe(a);
    connectable.subscribe(b);

    let _ = connectable.connect();
    let _ = connectable.connect();

    assert_eq!(*runs.lock().unwrap(), 1);
    assert!(connectable.is_connected());
    assert_eq!(*a_log.lock().unwrap(), vec!["1", "completed"]);
    assert_eq!(*b_log.lock().unwrap(), vec!["1", "completed"]);
}

#[test]
fn connectable_disconnect_stops_source() {
    let relay = PublishRelay::new();
    let mut connectable = relay.clone().publish();
    let (o, log) = recording_subscriber();
    connectable.subscribe(o);

    let connection = connectable.connect();
    relay.accept(1);
    connection.unsubscribe();
    relay.accept(2);

    assert_eq!(*log.lock().unwrap(), vec!["1"]);
    assert_eq!(relay.len(), 0);
}

#[test]
fn share_replay_subscribes_upstream_once() {
    let runs = Arc::new(Mutex::new(0));
    let runs_c = Arc::clone(&runs);
    let relay = PublishRelay::new();
    let relay_c = relay.clone();

    let mut shared = Observable::deferred(move || {
        *runs_c.lock().unwrap() += 1;
        relay_c.clone().into_observable()
    })
    .share_replay(1);

    let (a, a_log) = recording_subscriber();
    let sa = shared.subscribe(a);
    relay.accept(1);
    relay.accept(2);

    // Late subscriber receives the last value first.
    let (b, b_log) = recording_subscriber();
    let sb = shared.subscribe(b);
    relay.accept(3);

    assert_eq!(*runs.lock().unwrap(), 1);
    assert_eq!(relay.len(), 1);
    assert_eq!(*a_log.lock().unwrap(), vec!["1", "2", "3"]);
    assert_eq!(*b_log.lock().unwrap(), vec!["2", "3"]);

    sa.unsubscribe();
    assert_eq!(relay.len(), 1);
    sb.unsubscribe();
    assert_eq!(relay.len(), 0);

    // The next subscriber reconnects with an empty buffer.
    let (c, c_log) = recording_subscriber();
    shared.subscribe(c);
    relay.accept(4);
    assert_eq!(*runs.lock().unwrap(), 2);
    assert_eq!(*c_log.lock().unwrap(), vec!["4"]);
}

#[test]
fn share_replay_resets_after_completion() {
    let (mut tx, rx) = Subject::emitter_receiver();
    let mut shared = rx.share_replay(2);

    let (a, a_log) = recording_subscriber();
    shared.subscribe(a);
    tx.next(1);
    tx.complete();
    assert_eq!(*a_log.lock().unwrap(), vec!["1", "completed"]);

    // The underlying subject is terminated, so the reconnection completes at once.
    let (b, b_log) = recording_subscriber::<i32>();
    shared.subscribe(b);
    assert_eq!(*b_log.lock().unwrap(), vec!["completed"]);
}
