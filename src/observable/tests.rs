use std::sync::{Arc, Mutex};

use super::*;
use crate::subscription::subscribe::Unsubscribeable;

fn counting_source(emitted: Arc<Mutex<Vec<i32>>>, teardowns: Arc<Mutex<u32>>) -> Observable<i32> {
    Observable::new(move |mut o| {
        for i in 0..100 {
            if o.is_closed() {
                break;
            }
            emitted.lock().unwrap().push(i);
            o.next(i);
        }
        o.complete();
        let teardowns = Arc::clone(&teardowns);
        Subscription::new(
            UnsubscribeLogic::Logic(Box::new(move || *teardowns.lock().unwrap() += 1)),
            SubscriptionHandle::Nil,
        )
    })
}

#[test]
fn lifted_chain_shares_one_disposable() {
    let emitted = Arc::new(Mutex::new(Vec::new()));
    let teardowns = Arc::new(Mutex::new(0));

    let mut chain = counting_source(Arc::clone(&emitted), Arc::clone(&teardowns))
        .map(|v| v * 2)
        .filter(|v| v % 3 == 0)
        .take(2);

    let s = chain.subscribe(Subscriber::on_next(|_| {}));

    // 0 and 6 pass the filter; the source stops right after the fourth item.
    assert_eq!(*emitted.lock().unwrap(), vec![0, 1, 2, 3]);
    assert!(s.is_closed());
    assert_eq!(*teardowns.lock().unwrap(), 1);
}

#[test]
fn child_subscriber_is_disposed_with_parent() {
    let parent = Disposable::new();
    let child = Subscriber::<i32>::on_next(|_| {}).child_of(&parent);

    assert!(!child.is_closed());
    parent.dispose();
    assert!(child.is_closed());
}

#[test]
fn child_subscriber_terminating_leaves_parent_open() {
    let parent = Disposable::new();
    let mut child = Subscriber::<i32>::on_next(|_| {}).child_of(&parent);

    child.complete();

    assert!(child.is_closed());
    assert!(!parent.is_disposed());
}

#[test]
fn merge_state_tracks_live_sources() {
    let owner = Disposable::new();
    let state = MergeState::shared(&owner);
    let a = Disposable::new();
    let b = Disposable::new();

    state.locked().track(a.clone());
    state.locked().track(b.clone());
    assert!(!state.locked().finish_one());

    a.dispose();
    state.locked().track(Disposable::new());
    assert_eq!(state.locked().sources.len(), 2);

    owner.dispose();
    assert!(b.is_disposed());
    assert!(state.locked().sources.is_empty());
}

#[test]
fn unsubscribing_observable_runs_source_teardown() {
    let teardowns = Arc::new(Mutex::new(0));
    let teardowns_c = Arc::clone(&teardowns);
    let mut source = Observable::<i32>::new(move |_| {
        let teardowns = Arc::clone(&teardowns_c);
        Subscription::new(
            UnsubscribeLogic::Logic(Box::new(move || *teardowns.lock().unwrap() += 1)),
            SubscriptionHandle::Nil,
        )
    });

    let s = source.subscribe(Subscriber::on_next(|_| {}));
    assert_eq!(*teardowns.lock().unwrap(), 0);
    s.unsubscribe();
    assert_eq!(*teardowns.lock().unwrap(), 1);
}

#[test]
fn catch_error_does_not_dispose_downstream_on_upstream_error() {
    let values = Arc::new(Mutex::new(Vec::new()));
    let values_c = Arc::clone(&values);
    let mut source = Observable::<i32>::error(RxError::NoElements.into_arc())
        .catch_error(|_| Observable::of(vec![1, 2]));

    let s = source.subscribe(Subscriber::on_next(move |v| values_c.lock().unwrap().push(v)));

    assert_eq!(*values.lock().unwrap(), vec![1, 2]);
    assert!(s.is_closed());
}
