use std::{
    sync::{mpsc, Arc, Mutex},
    thread,
    time::Duration,
};

use rxcore::{
    config::EventLoopConfig,
    scheduler::{EventLoopScheduler, Scheduler, TokioScheduler, VirtualTimeScheduler},
    subjects::PublishRelay,
    subscribe::Subscriber,
    Binder, Observable, ObservableExt, Subscribeable,
};

#[test]
fn observe_on_event_loop_delivers_on_worker_in_order() {
    let ui = EventLoopScheduler::new(EventLoopConfig::default().with_thread_name("test-ui")).unwrap();
    let (tx, rx) = mpsc::channel();

    let ui_c = ui.clone();
    let tx_c = tx.clone();
    Observable::range(0, 50)
        .observe_on(ui.clone())
        .subscribe(Subscriber::new(
            move |v| tx_c.send((v, ui_c.is_current())).unwrap(),
            |_| {},
            move || drop(tx.send((-1, true))),
        ));

    let received: Vec<_> = rx.iter().take(51).collect();
    assert!(received.iter().all(|(_, on_worker)| *on_worker));
    let values: Vec<i64> = received.iter().map(|(v, _)| *v).collect();
    let mut expected: Vec<i64> = (0..50).collect();
    expected.push(-1);
    assert_eq!(values, expected);
    assert!(!ui.is_current());
}

#[test]
fn binder_applies_values_on_event_loop() {
    let ui = EventLoopScheduler::new(EventLoopConfig::default()).unwrap();
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let ui_c = ui.clone();
    let label = Binder::new(ui.clone(), move |text: String| {
        tx.lock().unwrap().send((text, ui_c.is_current())).unwrap();
    });

    let relay = PublishRelay::new();
    relay
        .clone()
        .map(|n: u32| format!("count {n}"))
        .bind_to(&label);

    // Values emitted from another thread still reach the setter on the loop.
    let relay_c = relay.clone();
    thread::spawn(move || {
        relay_c.accept(1);
        relay_c.accept(2);
    })
    .join()
    .unwrap();

    let received: Vec<_> = rx.iter().take(2).collect();
    assert_eq!(
        received,
        vec![("count 1".to_owned(), true), ("count 2".to_owned(), true)]
    );
}

#[test]
fn cancelled_event_loop_task_never_runs() {
    let ui = EventLoopScheduler::new(EventLoopConfig::default()).unwrap();
    let ran = Arc::new(Mutex::new(false));
    let ran_c = Arc::clone(&ran);

    let s = ui.schedule_after(
        Duration::from_millis(50),
        Box::new(move || *ran_c.lock().unwrap() = true),
    );
    s.disposable().dispose();
    thread::sleep(Duration::from_millis(150));

    assert!(!*ran.lock().unwrap());
}

#[test]
fn virtual_time_runs_tasks_in_due_order() {
    let clock = VirtualTimeScheduler::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    for (id, delay) in [(1, 30), (2, 10), (3, 20), (4, 10)] {
        let order = Arc::clone(&order);
        clock.schedule_after(
            Duration::from_millis(delay),
            Box::new(move || order.lock().unwrap().push(id)),
        );
    }

    clock.advance_by(Duration::from_millis(15));
    assert_eq!(*order.lock().unwrap(), vec![2, 4]);
    clock.advance_to(Duration::from_millis(5));
    assert_eq!(clock.elapsed(), Duration::from_millis(15));
    clock.flush();
    assert_eq!(*order.lock().unwrap(), vec![2, 4, 3, 1]);
    assert_eq!(clock.pending(), 0);
}

#[tokio::test]
async fn delay_on_tokio_scheduler() {
    let scheduler = TokioScheduler::current().unwrap();
    let values = Arc::new(Mutex::new(Vec::new()));
    let values_c = Arc::clone(&values);

    Observable::of(vec![1, 2])
        .delay(Duration::from_millis(20), scheduler)
        .subscribe(Subscriber::on_next(move |v| values_c.lock().unwrap().push(v)));

    assert!(values.lock().unwrap().is_empty());
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(*values.lock().unwrap(), vec![1, 2]);
}
