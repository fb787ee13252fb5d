//! End-to-end recording scenarios across registry, router and sink.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    chrono::NaiveTime,
    rand::{Rng, SeedableRng, rngs::StdRng},
    recordbot_common::ChannelId,
    recordbot_recorder::{
        DestinationName, EventRouter, ManualClock, MessageEvent, RouteOutcome, SessionHandle,
        SessionRegistry, SinkOptions, StartError, StopError,
    },
    tempfile::TempDir,
};

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
}

struct Harness {
    registry: Arc<SessionRegistry>,
    router: EventRouter,
    clock: Arc<ManualClock>,
    dir: TempDir,
}

impl Harness {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(SessionRegistry::new(
            dir.path().join("records"),
            SinkOptions::default(),
        ));
        let clock = Arc::new(ManualClock::new(hm(14, 5)));
        let router = EventRouter::new(Arc::clone(&registry)).with_clock(clock.clone());
        Self {
            registry,
            router,
            clock,
            dir,
        }
    }

    fn record(&self, name: &str) -> String {
        let path = self.dir.path().join("records").join(format!("{name}.txt"));
        std::fs::read_to_string(path).unwrap()
    }
}

#[tokio::test]
async fn record_created_then_stop() {
    let h = Harness::new();
    let general = ChannelId::from("general");

    h.registry
        .start(general.clone(), DestinationName::parse("log1").unwrap())
        .await
        .unwrap();
    let outcome = h
        .router
        .route(&MessageEvent::created(general.clone(), "alice", "hi"))
        .await;
    assert_eq!(outcome, RouteOutcome::Recorded);
    assert_eq!(h.record("log1"), "[14:05]  alice: hi \n");

    h.registry.stop(&general).await.unwrap();
    let outcome = h
        .router
        .route(&MessageEvent::created(general, "alice", "still there?"))
        .await;
    assert_eq!(outcome, RouteOutcome::NotRecording);
    assert_eq!(h.record("log1"), "[14:05]  alice: hi \n");
}

#[tokio::test]
async fn edited_message_gets_marker() {
    let h = Harness::new();
    let general = ChannelId::from("general");
    h.registry
        .start(general.clone(), DestinationName::parse("log1").unwrap())
        .await
        .unwrap();

    h.router
        .route(&MessageEvent::created(general.clone(), "alice", "hi"))
        .await;
    h.clock.set(hm(14, 6));
    h.router
        .route(&MessageEvent::edited(general, "alice", "hi there"))
        .await;

    assert_eq!(
        h.record("log1"),
        "[14:05]  alice: hi \n[14:06] [*] alice: hi there \n"
    );
}

#[tokio::test]
async fn appends_land_in_call_order() {
    let h = Harness::new();
    let general = ChannelId::from("general");
    let session = h
        .registry
        .start(general.clone(), DestinationName::parse("order").unwrap())
        .await
        .unwrap();

    for i in 0..50 {
        h.router
            .route(&MessageEvent::created(general.clone(), "alice", format!("line {i}")))
            .await;
    }
    h.registry.stop(&general).await.unwrap();

    let bodies: Vec<String> = std::fs::read_to_string(session.path())
        .unwrap()
        .lines()
        .map(|l| l.trim_start_matches("[14:05]  alice: ").trim_end().to_string())
        .collect();
    let expected: Vec<String> = (0..50).map(|i| format!("line {i}")).collect();
    assert_eq!(bodies, expected);
}

#[tokio::test]
async fn restarting_appends_to_existing_record() {
    let h = Harness::new();
    let general = ChannelId::from("general");
    let name = || DestinationName::parse("log1").unwrap();

    h.registry.start(general.clone(), name()).await.unwrap();
    h.router
        .route(&MessageEvent::created(general.clone(), "alice", "one"))
        .await;
    h.registry.stop(&general).await.unwrap();

    h.clock.set(hm(9, 0));
    h.registry.start(general.clone(), name()).await.unwrap();
    h.router
        .route(&MessageEvent::created(general.clone(), "bob", "two"))
        .await;
    h.registry.stop(&general).await.unwrap();

    assert_eq!(h.record("log1"), "[14:05]  alice: one \n[9:00]  bob: two \n");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn random_interleavings_keep_one_session_per_channel() {
    let h = Harness::new();
    let channels: Vec<ChannelId> = (0..3_u64).map(ChannelId::from).collect();
    let started: Arc<Mutex<Vec<SessionHandle>>> = Arc::default();

    let tasks: Vec<_> = (0..8_u64)
        .map(|worker| {
            let registry = Arc::clone(&h.registry);
            let channels = channels.clone();
            let started = Arc::clone(&started);
            tokio::spawn(async move {
                let mut rng = StdRng::seed_from_u64(0x5eed + worker);
                for step in 0..40 {
                    let channel = channels[rng.random_range(0..channels.len())].clone();
                    if rng.random_bool(0.5) {
                        let name = DestinationName::parse(&format!("w{worker}-s{step}")).unwrap();
                        match registry.start(channel, name).await {
                            Ok(session) => started.lock().unwrap().push(session),
                            Err(StartError::AlreadyRecording) => {},
                            Err(e) => panic!("unexpected start error: {e}"),
                        }
                    } else {
                        match registry.stop(&channel).await {
                            Ok(()) | Err(StopError::NotRecording) => {},
                        }
                    }
                    if rng.random_bool(0.3) {
                        tokio::task::yield_now().await;
                    }
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let started = started.lock().unwrap();
    assert!(!started.is_empty());
    for channel in &channels {
        let open: Vec<&SessionHandle> = started
            .iter()
            .filter(|s| s.channel() == channel && !s.is_closed())
            .collect();
        assert!(open.len() <= 1, "channel {channel} has {} open sinks", open.len());
        match h.registry.lookup(channel) {
            Some(active) => {
                assert_eq!(open.len(), 1);
                assert!(Arc::ptr_eq(open[0], &active));
            },
            None => assert!(open.is_empty()),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_with_append_in_flight_leaves_whole_line_or_nothing() {
    let h = Harness::new();
    let general = ChannelId::from("general");
    let session = h
        .registry
        .start(general.clone(), DestinationName::parse("final").unwrap())
        .await
        .unwrap();

    let router = Arc::new(h.router);
    let pending = {
        let router = Arc::clone(&router);
        let event = MessageEvent::created(general.clone(), "alice", "last words");
        tokio::spawn(async move { router.route(&event).await })
    };
    h.registry.shutdown_all().await;

    assert!(session.is_closed());
    let content = std::fs::read_to_string(session.path()).unwrap();
    assert!(
        content.is_empty() || content == "[14:05]  alice: last words \n",
        "unexpected record content: {content:?}"
    );

    let outcome = tokio::time::timeout(Duration::from_secs(5), pending)
        .await
        .unwrap()
        .unwrap();
    let content_after = std::fs::read_to_string(session.path()).unwrap();
    assert_eq!(content_after, content, "nothing may be written after shutdown");
    match outcome {
        RouteOutcome::Recorded => assert!(!content.is_empty()),
        RouteOutcome::Failed | RouteOutcome::NotRecording => assert!(content.is_empty()),
    }
}
