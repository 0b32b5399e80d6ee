//! Permission-gated device adapters against the loopback host.

use std::cell::RefCell;
use std::rc::Rc;

use bridge_loopback::LoopbackChannel;
use bridge_traits::OutboundKind;
use core_adapters::{AdapterError, AudioRecorder, RecorderObserver, VideoProvider};
use core_bridge::BridgeContext;
use core_runtime::BridgeConfig;
use futures::{pin_mut, poll};
use mockall::mock;
use serde_json::{json, Value};

mock! {
    Observer {}

    impl RecorderObserver for Observer {
        fn on_started(&self);
        fn on_level(&self, level: f64);
        fn on_error(&self, error: &AdapterError);
    }
}

fn setup() -> (Rc<LoopbackChannel>, BridgeContext) {
    let channel = LoopbackChannel::new();
    let config = BridgeConfig::builder()
        .channel(channel.clone())
        .build()
        .unwrap();
    (channel, BridgeContext::new(config))
}

fn permission_id(channel: &LoopbackChannel, service: &str) -> bridge_traits::CorrelationId {
    channel
        .last_id(OutboundKind::Call, &format!("{}@requestPermission", service))
        .expect("permission requested")
}

// ---- audio ----

#[tokio::test]
async fn test_recorder_streams_scaled_levels() {
    let (channel, ctx) = setup();
    channel.answer("RecordService@requestPermission", |_| Ok(json!(1)));

    let mut observer = MockObserver::new();
    observer.expect_on_started().times(1).return_const(());
    observer
        .expect_on_level()
        .withf(|level| (level - 1.0).abs() < 1e-9)
        .times(1)
        .return_const(());
    observer.expect_on_error().never();

    let recorder = AudioRecorder::new(&ctx);
    recorder.start_listening(Rc::new(observer)).await;
    assert!(recorder.is_listening());

    let id = channel
        .last_id(OutboundKind::Subscribe, "RecordService@listen")
        .unwrap();
    channel.push(id, json!(0.55));
    channel.push(id, json!(0));
    channel.push(id, Value::Null);

    recorder.dispose();
    channel.push(id, json!(0.55));

    assert_eq!(
        channel.last_id(OutboundKind::Unsubscribe, "RecordService@listen"),
        Some(id)
    );
    assert_eq!(channel.sent_to("RecordService@dispose").len(), 1);
}

#[tokio::test]
async fn test_recorder_denial_reports_error() {
    let (channel, ctx) = setup();
    channel.answer("RecordService@requestPermission", |_| Ok(json!(0)));

    let mut observer = MockObserver::new();
    observer.expect_on_started().never();
    observer
        .expect_on_error()
        .withf(|error| error.is_permission_denied())
        .times(1)
        .return_const(());

    let recorder = AudioRecorder::new(&ctx);
    recorder.start_listening(Rc::new(observer)).await;

    assert!(!recorder.is_listening());
    assert!(channel.sent_to("RecordService@listen").is_empty());
}

#[tokio::test]
async fn test_recorder_disposed_while_permission_pending() {
    let (channel, ctx) = setup();

    let mut observer = MockObserver::new();
    observer.expect_on_started().never();
    observer.expect_on_level().never();
    observer.expect_on_error().never();

    let recorder = AudioRecorder::new(&ctx);
    let listening = recorder.start_listening(Rc::new(observer));
    pin_mut!(listening);
    assert!(poll!(listening.as_mut()).is_pending());

    recorder.dispose();
    channel.respond(permission_id(&channel, "RecordService"), json!(1));
    listening.await;

    assert!(channel.sent_to("RecordService@listen").is_empty());
    assert_eq!(ctx.transport().live_subscriptions(), 0);
    assert!(recorder.is_disposed());

    recorder.dispose();
    assert_eq!(channel.sent_to("RecordService@dispose").len(), 1);
}

#[tokio::test]
async fn test_recorder_stop_returns_clip() {
    let (channel, ctx) = setup();
    channel.answer("RecordService@data", |_| Ok(json!("UklGRg==")));

    let recorder = AudioRecorder::new(&ctx);
    recorder.start_recording();
    assert!(recorder.is_recording());

    let clip = recorder.stop().await.unwrap();
    assert_eq!(&clip[..], b"RIFF");
    assert!(!recorder.is_recording());

    let names: Vec<String> = channel
        .sent()
        .iter()
        .map(|message| message.name.to_string())
        .collect();
    assert_eq!(
        names,
        vec!["RecordService@start", "RecordService@stop", "RecordService@data"]
    );
}

#[tokio::test]
async fn test_recorder_stop_without_data() {
    let (channel, ctx) = setup();
    channel.answer("RecordService@data", |_| Ok(Value::Null));

    let recorder = AudioRecorder::new(&ctx);
    assert_eq!(recorder.stop().await, Err(AdapterError::NoRecording));
}

#[tokio::test]
async fn test_recorder_stop_after_dispose_is_ignored() {
    let (channel, ctx) = setup();
    channel.answer("RecordService@data", |_| Ok(json!("UklGRg==")));

    let recorder = AudioRecorder::new(&ctx);
    recorder.start_recording();
    recorder.dispose();
    channel.take_sent();

    assert_eq!(recorder.stop().await, Err(AdapterError::NoRecording));
    assert!(!recorder.is_recording());
    assert!(channel.sent().is_empty());
}

// ---- video ----

#[tokio::test]
async fn test_video_frames_follow_enable_and_disable() {
    let (channel, ctx) = setup();
    channel.answer("CameraService@requestPermission", |_| Ok(json!(true)));

    let video = VideoProvider::new(&ctx);
    assert_eq!(video.enable_video().await, Ok(true));
    assert!(video.video_ready());
    assert!(video.get_frame().is_none());

    let id = channel
        .last_id(OutboundKind::Subscribe, "CameraService@start")
        .unwrap();
    channel.push(id, json!("/9j/"));
    channel.push(id, json!("/9j/4A=="));

    let frame = video.get_frame().unwrap();
    assert_eq!(&frame.jpeg[..], &[0xff, 0xd8, 0xff, 0xe0]);
    assert_eq!(frame.sequence, 2);

    assert_eq!(video.enable_video().await, Ok(true));

    video.disable_video();
    assert!(video.get_frame().is_none());
    assert_eq!(channel.sent_to("CameraService@stop").len(), 1);
    assert!(!ctx.transport().is_live(id));
}

#[tokio::test]
async fn test_video_denied() {
    let (channel, ctx) = setup();
    channel.answer("CameraService@requestPermission", |_| Ok(json!(false)));

    let video = VideoProvider::new(&ctx);
    let err = video.enable_video().await.unwrap_err();
    assert!(err.is_permission_denied());
    assert!(!video.video_ready());
}

#[tokio::test]
async fn test_video_disable_during_setup_is_applied_after() {
    let (channel, ctx) = setup();
    let video = VideoProvider::new(&ctx);

    let mut enabling = video.enable_video();
    assert!(poll!(enabling.as_mut()).is_pending());

    video.disable_video();
    channel.respond(permission_id(&channel, "CameraService"), json!(true));

    assert_eq!(enabling.await, Ok(false));
    assert!(!video.video_ready());
    assert!(channel.sent_to("CameraService@start").is_empty());
}

#[tokio::test]
async fn test_video_reenabled_during_setup_starts() {
    let (channel, ctx) = setup();
    let video = VideoProvider::new(&ctx);

    let mut first = video.enable_video();
    assert!(poll!(first.as_mut()).is_pending());
    video.disable_video();
    assert_eq!(video.enable_video().await, Ok(false));

    channel.respond(permission_id(&channel, "CameraService"), json!(true));

    assert_eq!(first.await, Ok(true));
    assert!(video.video_ready());
    assert_eq!(channel.sent_to("CameraService@requestPermission").len(), 1);
}

#[tokio::test]
async fn test_video_disposed_while_permission_pending() {
    let (channel, ctx) = setup();
    let video = VideoProvider::new(&ctx);

    let mut enabling = video.enable_video();
    assert!(poll!(enabling.as_mut()).is_pending());

    video.dispose();
    channel.respond(permission_id(&channel, "CameraService"), json!(true));

    assert_eq!(enabling.await, Ok(false));
    assert!(channel.sent_to("CameraService@start").is_empty());
    assert!(video.get_frame().is_none());
    assert_eq!(video.enable_video().await, Ok(false));
}

#[tokio::test]
async fn test_video_permission_transport_failure() {
    let (channel, ctx) = setup();
    channel.disconnect();

    let video = VideoProvider::new(&ctx);
    let err = video.enable_video().await.unwrap_err();
    assert!(matches!(err, AdapterError::Bridge(ref e) if e.is_transport()));

    channel.reconnect();
    channel.answer("CameraService@requestPermission", |_| Ok(json!(1)));
    assert_eq!(video.enable_video().await, Ok(true));
}

#[tokio::test]
async fn test_observer_sees_nothing_after_dispose() {
    let (channel, ctx) = setup();
    channel.answer("RecordService@requestPermission", |_| Ok(json!(1)));

    struct Counting(RefCell<Vec<f64>>);
    impl RecorderObserver for Counting {
        fn on_started(&self) {}
        fn on_level(&self, level: f64) {
            self.0.borrow_mut().push(level);
        }
        fn on_error(&self, _error: &AdapterError) {}
    }

    let observer = Rc::new(Counting(RefCell::new(Vec::new())));
    let recorder = AudioRecorder::new(&ctx);
    recorder.start_listening(observer.clone()).await;
    let id = channel
        .last_id(OutboundKind::Subscribe, "RecordService@listen")
        .unwrap();

    channel.push(id, json!(2.2));
    recorder.dispose();
    channel.push(id, json!(2.2));

    let levels = observer.0.borrow();
    assert_eq!(levels.len(), 1);
    assert!((levels[0] - 2.0).abs() < 1e-9);
}
