use std::sync::{Arc, Mutex};

use rxcore::subjects::{BehaviorRelay, PublishRelay};
use rxcore::subscribe::Subscriber;
use rxcore::{Observable, ObservableExt, Subscribeable, Unsubscribeable};

#[test]
fn publish_relay_never_terminates_subscribers() {
    let relay = PublishRelay::new();
    let completes = Arc::new(Mutex::new(0));
    let completes_c = Arc::clone(&completes);
    let values = Arc::new(Mutex::new(Vec::new()));
    let values_c = Arc::clone(&values);

    relay.clone().subscribe(Subscriber::new(
        move |v| values_c.lock().unwrap().push(v),
        |_| panic!("relay delivered an error"),
        move || *completes_c.lock().unwrap() += 1,
    ));

    for v in 0..100 {
        relay.accept(v);
    }

    assert_eq!(values.lock().unwrap().len(), 100);
    assert_eq!(*completes.lock().unwrap(), 0);
    assert_eq!(relay.len(), 1);
}

#[test]
fn behavior_relay_replays_current_value() {
    let relay = BehaviorRelay::new("idle".to_owned());
    relay.accept("loading".to_owned());

    let values = Arc::new(Mutex::new(Vec::new()));
    let values_c = Arc::clone(&values);
    let s = relay
        .clone()
        .subscribe_next(move |v| values_c.lock().unwrap().push(v));

    relay.accept("done".to_owned());
    assert_eq!(relay.value(), "done");
    assert_eq!(*values.lock().unwrap(), vec!["loading", "done"]);

    s.unsubscribe();
    assert!(relay.is_empty());
}

#[test]
fn bind_to_relay_ignores_completion() {
    let relay = BehaviorRelay::new(0);
    let s = Observable::of(vec![1, 2, 3]).bind_to_relay(&relay);

    assert_eq!(relay.value(), 3);
    assert!(s.is_closed());

    let values = Arc::new(Mutex::new(Vec::new()));
    let values_c = Arc::clone(&values);
    relay
        .clone()
        .subscribe_next(move |v| values_c.lock().unwrap().push(v));
    relay.accept(4);
    assert_eq!(*values.lock().unwrap(), vec![3, 4]);
}

#[test]
fn relays_convert_into_observables() {
    let relay = PublishRelay::new();
    let mut doubled = Observable::from(relay.clone()).map(|v: i32| v * 2);

    let values = Arc::new(Mutex::new(Vec::new()));
    let values_c = Arc::clone(&values);
    doubled.subscribe(Subscriber::on_next(move |v| values_c.lock().unwrap().push(v)));

    relay.accept(21);
    assert_eq!(*values.lock().unwrap(), vec![42]);
}
