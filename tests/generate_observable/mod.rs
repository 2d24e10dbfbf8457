#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use rxcore::{
    subscribe::{Subscriber, Subscription, SubscriptionHandle, UnsubscribeLogic},
    Observable, Observer,
};

/// Emits `0..=end` from an OS thread, one value per millisecond, and reports the
/// last emitted value to `last_emit_assert` once the thread finishes.
pub fn generate_u32_observable(
    end: u32,
    last_emit_assert: impl FnMut(u32) + Send + Sync + 'static,
) -> Observable<u32> {
    let last_emit_assert = Arc::new(Mutex::new(last_emit_assert));

    Observable::new(move |mut o: Subscriber<_>| {
        let done = Arc::new(AtomicBool::new(false));
        let done_c = Arc::clone(&done);

        let last_emit_assert = Arc::clone(&last_emit_assert);
        let jh = std::thread::spawn(move || {
            let mut last_emit = 0;

            for i in 0..=end {
                if done.load(Ordering::SeqCst) || o.is_closed() {
                    break;
                }
                last_emit = i;
                o.next(i);
                std::thread::sleep(Duration::from_millis(1));
            }
            o.complete();
            last_emit_assert.lock().unwrap()(last_emit);
        });

        Subscription::new(
            UnsubscribeLogic::Logic(Box::new(move || {
                done_c.store(true, Ordering::SeqCst);
            })),
            SubscriptionHandle::JoinThread(jh),
        )
    })
}

/// Same as `generate_u32_observable` but emits from a Tokio task.
pub fn generate_u32_observable_async(
    end: u32,
    last_emit_assert: impl FnMut(u32) + Send + Sync + 'static,
) -> Observable<u32> {
    let last_emit_assert = Arc::new(Mutex::new(last_emit_assert));

    Observable::new(move |mut o: Subscriber<_>| {
        let last_emit_assert = Arc::clone(&last_emit_assert);
        let jh = tokio::spawn(async move {
            let mut last_emit = 0;

            for i in 0..=end {
                if o.is_closed() {
                    break;
                }
                last_emit = i;
                o.next(i);
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            o.complete();
            last_emit_assert.lock().unwrap()(last_emit);
        });

        Subscription::new(UnsubscribeLogic::Nil, SubscriptionHandle::JoinTask(jh))
    })
}

/// Emits `values` synchronously and completes.
pub fn generate_sync_observable(values: Vec<i32>) -> Observable<i32> {
    Observable::new(move |mut o: Subscriber<_>| {
        for v in values.iter().copied() {
            if o.is_closed() {
                break;
            }
            o.next(v);
        }
        o.complete();
        Subscription::empty()
    })
}
