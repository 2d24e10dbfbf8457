use std::{
    error::Error,
    fmt,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use rxcore::{
    config::EventLoopConfig,
    scheduler::{EventLoopScheduler, ImmediateScheduler, VirtualTimeScheduler},
    subjects::{BehaviorRelay, BehaviorSubject, PublishRelay, ReplaySubject, Subject, BufSize},
    subscribe::{Subscriber, Subscription},
    Binder, DisposeBag, FileCache, KeyValueCache, Observable, ObservableExt, Observer,
    Subscribeable, Unsubscribeable,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct LookupFailed(String);

impl fmt::Display for LookupFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no weather for {}", self.0)
    }
}

impl Error for LookupFailed {}

#[derive(Debug, Clone, PartialEq)]
struct Weather {
    city: String,
    temperature: i32,
}

impl Weather {
    fn empty() -> Self {
        Weather {
            city: "n/a".to_owned(),
            temperature: 0,
        }
    }
}

fn fetch_weather(city: String) -> Observable<Weather> {
    Observable::single(move |emitter| {
        let city = city.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            if city.eq_ignore_ascii_case("atlantis") {
                emitter.failure(LookupFailed(city));
            } else {
                let temperature = city.len() as i32 * 3;
                emitter.success(Weather { city, temperature });
            }
        });
        Subscription::empty()
    })
}

fn creating_observables(bag: &DisposeBag) {
    println!("--- just, of, from_iter");
    Observable::just(1)
        .subscribe_next(|v| println!("just {v}"))
        .disposed_by(bag);
    Observable::of(vec![1, 2, 3])
        .subscribe_next(|v| println!("of {v}"))
        .disposed_by(bag);
    Observable::from_iter(1..)
        .take(3)
        .subscribe_all(
            |v| println!("from_iter {v}"),
            |e| println!("error {e}"),
            || println!("from_iter completed"),
        )
        .disposed_by(bag);

    println!("--- empty, never, range");
    Observable::<i32>::empty()
        .subscribe_all(|_| {}, |_| {}, || println!("empty completed"))
        .disposed_by(bag);
    let never = Observable::<i32>::never()
        .debug("never")
        .subscribe_next(|_| {});
    never.unsubscribe();
    Observable::range(1, 5)
        .map(|n| n * n)
        .to_array()
        .subscribe_next(|squares| println!("range squares {squares:?}"))
        .disposed_by(bag);

    println!("--- create, deferred");
    Observable::new(|mut o| {
        o.next("1");
        o.complete();
        o.next("?");
        Subscription::empty()
    })
    .subscribe_all(
        |v| println!("create {v}"),
        |e| println!("create error {e}"),
        || println!("create completed"),
    )
    .disposed_by(bag);

    let flip = Arc::new(Mutex::new(false));
    let mut factory = Observable::deferred(move || {
        let mut flip = flip.lock().unwrap_or_else(|e| e.into_inner());
        *flip = !*flip;
        if *flip {
            Observable::of(vec![1, 2, 3])
        } else {
            Observable::of(vec![4, 5, 6])
        }
    });
    for _ in 0..2 {
        factory
            .subscribe_next(|v| println!("deferred {v}"))
            .disposed_by(bag);
    }
}

fn subjects(bag: &DisposeBag) {
    println!("--- subjects");
    let (mut emitter, mut receiver) = Subject::emitter_receiver();
    emitter.next("lost");
    receiver
        .clone()
        .subscribe_next(|v| println!("subject 1) {v}"))
        .disposed_by(bag);
    emitter.next("1");
    emitter.complete();
    receiver
        .subscribe_all(
            |v| println!("subject 2) {v}"),
            |_| {},
            || println!("subject 2) completed"),
        )
        .disposed_by(bag);

    let (mut emitter, receiver) = BehaviorSubject::emitter_receiver("initial");
    emitter.next("x");
    receiver
        .clone()
        .subscribe_next(|v| println!("behavior {v}"))
        .disposed_by(bag);
    println!("behavior value {}", receiver.value());

    let (mut emitter, receiver) = ReplaySubject::emitter_receiver(BufSize::Bounded(2));
    for v in ["1", "2", "3"] {
        emitter.next(v);
    }
    receiver
        .clone()
        .subscribe_next(|v| println!("replay {v}"))
        .disposed_by(bag);
}

/// Counter view model: taps increment a value that a label renders.
fn counter(bag: &DisposeBag) {
    println!("--- counter view model");
    let taps = PublishRelay::new();
    let count = BehaviorRelay::new(0);

    taps.clone()
        .with_latest_from(count.clone(), |_: (), current: &i32| current + 1)
        .bind_to_relay(&count)
        .disposed_by(bag);

    let label = Binder::new(ImmediateScheduler, |text: String| println!("label: {text}"));
    count
        .clone()
        .map(|n| format!("count {n}"))
        .bind_to(&label)
        .disposed_by(bag);

    for _ in 0..3 {
        taps.accept(());
    }
    println!("final count {}", count.value());
}

/// Weather search: queries are debounced by distinctness, failures fall back to
/// an empty result and values are applied on the event loop thread.
fn weather_search(bag: &DisposeBag, ui: &EventLoopScheduler) -> Result<(), Box<dyn Error>> {
    println!("--- weather search");
    let search = PublishRelay::new();
    let location = PublishRelay::new();

    let cache = FileCache::new(std::env::temp_dir().join("rxcore-playground"))?;
    let cache_w = cache.clone();
    let display = Binder::new(ui.clone(), move |weather: Weather| {
        println!("showing {} {}°", weather.city, weather.temperature);
        let record = format!("{}:{}", weather.city, weather.temperature);
        if let Err(e) = cache_w.write("last-weather", record.as_bytes()) {
            tracing::warn!(error = %e, "failed to cache weather");
        }
    });

    search
        .clone()
        .merge_one(location.clone().into_observable())
        .map(|city: String| city.trim().to_owned())
        .filter(|city| !city.is_empty())
        .distinct_until_changed()
        .flat_map_latest(|city| fetch_weather(city).catch_and_return(Weather::empty()))
        .bind_to(&display)
        .disposed_by(bag);

    search.accept("London".to_owned());
    search.accept(" London ".to_owned());
    location.accept("Atlantis".to_owned());
    search.accept("Paris".to_owned());
    thread::sleep(Duration::from_millis(50));

    if let Some(bytes) = cache.read("last-weather")? {
        println!("cached {}", String::from_utf8_lossy(&bytes));
    }
    Ok(())
}

/// Collage editor: fast repeated taps are throttled and the collage is capped.
fn photos(bag: &DisposeBag) {
    println!("--- photo collage");
    let clock = VirtualTimeScheduler::new();
    let (mut picks, images) = BehaviorSubject::emitter_receiver(Vec::<u32>::new());
    let added = PublishRelay::new();

    added
        .clone()
        .throttle(Duration::from_millis(500), clock.clone())
        .take_while(|photo: &u32| *photo < 6)
        .subscribe(Subscriber::new(
            move |photo| {
                let mut current = images.value();
                current.push(photo);
                picks.next(current);
            },
            |e| println!("picker error {e}"),
            || println!("collage full"),
        ))
        .disposed_by(bag);

    for photo in 0..8 {
        added.accept(photo);
        clock.advance_by(Duration::from_millis(300));
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let ui = EventLoopScheduler::new(EventLoopConfig::default().with_thread_name("ui"))?;
    let bag = DisposeBag::new();

    creating_observables(&bag);
    subjects(&bag);
    counter(&bag);
    weather_search(&bag, &ui)?;
    photos(&bag);

    bag.dispose();
    Ok(())
}
