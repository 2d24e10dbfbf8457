#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use rxcore::subscribe::Subscriber;

pub type Log = Arc<Mutex<Vec<i32>>>;

/// Ten subscriber factories that share one log per notification kind.
pub fn register_emissions_subscriber() -> (Vec<impl FnOnce() -> Subscriber<i32>>, Log, Log, Log) {
    let nexts = Arc::new(Mutex::new(Vec::with_capacity(5)));
    let nexts_c = Arc::clone(&nexts);

    let completes = Arc::new(Mutex::new(Vec::with_capacity(5)));
    let completes_c = Arc::clone(&completes);

    let errors = Arc::new(Mutex::new(Vec::with_capacity(5)));
    let errors_c = Arc::clone(&errors);

    let make_subscriber = vec![
        move || {
            let nexts_c = Arc::clone(&nexts_c);
            let errors_c = Arc::clone(&errors_c);
            let completes_c = Arc::clone(&completes_c);
            Subscriber::new(
                move |n| {
                    // Track next() calls.
                    nexts_c.lock().unwrap().push(n);
                },
                move |_| {
                    // Track error() calls.
                    errors_c.lock().unwrap().push(1);
                },
                move || {
                    // Track complete() calls.
                    completes_c.lock().unwrap().push(1);
                },
            )
        };
        10
    ];
    (make_subscriber, nexts, completes, errors)
}

/// Subscriber recording every notification into one shared log.
pub fn recording_subscriber<T: Send + 'static>() -> (Subscriber<T>, Arc<Mutex<Vec<String>>>)
where
    T: std::fmt::Debug,
{
    let log = Arc::new(Mutex::new(Vec::new()));
    let (log_n, log_e, log_c) = (Arc::clone(&log), Arc::clone(&log), Arc::clone(&log));
    let s = Subscriber::new(
        move |v: T| log_n.lock().unwrap().push(format!("{v:?}")),
        move |e| log_e.lock().unwrap().push(format!("error: {e}")),
        move || log_c.lock().unwrap().push("completed".to_owned()),
    );
    (s, log)
}
