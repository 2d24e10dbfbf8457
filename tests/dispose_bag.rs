use std::sync::{Arc, Mutex};

use rxcore::subjects::PublishRelay;
use rxcore::subscribe::{Subscription, SubscriptionHandle, UnsubscribeLogic};
use rxcore::{DisposeBag, ObservableExt};

fn counted(counter: &Arc<Mutex<Vec<usize>>>, id: usize) -> Subscription {
    let counter = Arc::clone(counter);
    Subscription::new(
        UnsubscribeLogic::Logic(Box::new(move || counter.lock().unwrap().push(id))),
        SubscriptionHandle::Nil,
    )
}

#[test]
fn bag_disposes_in_insertion_order_exactly_once() {
    let disposed = Arc::new(Mutex::new(Vec::new()));
    let bag = DisposeBag::new();

    for id in 0..3 {
        counted(&disposed, id).disposed_by(&bag);
    }
    assert_eq!(bag.len(), 3);

    bag.dispose();
    bag.dispose();

    assert_eq!(*disposed.lock().unwrap(), vec![0, 1, 2]);
    assert!(bag.is_empty());
    assert!(bag.is_disposed());
}

#[test]
fn insert_after_dispose_disposes_immediately() {
    let disposed = Arc::new(Mutex::new(Vec::new()));
    let bag = DisposeBag::new();
    bag.dispose();

    bag.insert(counted(&disposed, 7));

    assert_eq!(*disposed.lock().unwrap(), vec![7]);
    assert!(bag.is_empty());
}

#[test]
fn dropping_bag_cancels_subscriptions() {
    let relay = PublishRelay::new();
    let values = Arc::new(Mutex::new(Vec::new()));
    {
        let bag = DisposeBag::new();
        let values_c = Arc::clone(&values);
        relay
            .clone()
            .map(|v: i32| v + 1)
            .subscribe_next(move |v| values_c.lock().unwrap().push(v))
            .disposed_by(&bag);
        relay.accept(1);
        assert_eq!(relay.len(), 1);
    }
    relay.accept(2);

    assert_eq!(*values.lock().unwrap(), vec![2]);
    assert_eq!(relay.len(), 0);
}
