use std::collections::VecDeque;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, Instant};

use image::{DynamicImage, GrayImage, Luma};
use slint_barcode_scanner::camera::focus::{
    FocusTracker, AF_STATE_ACTIVE_SCAN, AF_STATE_FOCUSED_LOCKED,
};
use slint_barcode_scanner::camera::{
    CameraDevice, CameraEvent, FocusOrigin, ReplayCamera, SurfaceSize, ZoomRange,
};
use slint_barcode_scanner::config::ScannerConfig;
use slint_barcode_scanner::decoder::{Decoder, Symbol, Symbology};
use slint_barcode_scanner::error::CameraError;
use slint_barcode_scanner::frame::{Frame, PreviewImage};
use slint_barcode_scanner::gesture::{Point, TouchAction, TouchEvent};
use slint_barcode_scanner::scanner::{
    EventQueue, PreviewState, ScannerEvent, ScannerHost, ScannerScreen,
};

#[derive(Default)]
struct FakeCamera {
    fail_open: bool,
    no_autofocus: bool,
    opens: u32,
    bound: Vec<SurfaceSize>,
    starts: u32,
    stops: u32,
    releases: u32,
    focus: Vec<FocusOrigin>,
    zoom: Option<ZoomRange>,
}

impl CameraDevice for FakeCamera {
    fn open(&mut self) -> Result<(), CameraError> {
        if self.fail_open {
            return Err(CameraError::DeviceUnavailable("in use".into()));
        }
        self.opens += 1;
        Ok(())
    }

    fn bind_surface(&mut self, surface: SurfaceSize) -> Result<(), CameraError> {
        self.bound.push(surface);
        Ok(())
    }

    fn start(&mut self, _events: Sender<CameraEvent>) -> Result<(), CameraError> {
        self.starts += 1;
        Ok(())
    }

    fn stop(&mut self) {
        self.stops += 1;
    }

    fn release(&mut self) {
        self.releases += 1;
    }

    fn request_autofocus(&mut self, origin: FocusOrigin) {
        self.focus.push(origin);
    }

    fn supports_autofocus(&self) -> bool {
        !self.no_autofocus
    }

    fn zoom(&self) -> Option<ZoomRange> {
        self.zoom
    }

    fn set_zoom(&mut self, level: u32) -> Result<(), CameraError> {
        match self.zoom.as_mut() {
            Some(zoom) => {
                zoom.current = level;
                Ok(())
            }
            None => Err(CameraError::Unsupported("zoom")),
        }
    }
}

/// Returns queued results in order, then nothing.
#[derive(Default)]
struct FakeDecoder {
    results: VecDeque<Vec<Symbol>>,
    calls: u32,
}

impl FakeDecoder {
    fn returning(results: Vec<Vec<Symbol>>) -> Self {
        Self {
            results: results.into(),
            calls: 0,
        }
    }
}

impl Decoder for FakeDecoder {
    fn scan_image(&mut self, _frame: &Frame) -> Vec<Symbol> {
        self.calls += 1;
        self.results.pop_front().unwrap_or_default()
    }
}

#[derive(Default)]
struct FakeHost {
    previews: u32,
    results: Vec<String>,
    result_visible: bool,
    toasts: Vec<String>,
    vibrations: Vec<Duration>,
    scheduled: Vec<(Duration, ScannerEvent)>,
}

impl ScannerHost for FakeHost {
    fn show_preview(&mut self, _image: PreviewImage) {
        self.previews += 1;
    }

    fn show_result(&mut self, text: &str) {
        self.results.push(text.to_string());
        self.result_visible = true;
    }

    fn hide_result(&mut self) {
        self.result_visible = false;
    }

    fn show_toast(&mut self, text: &str) {
        self.toasts.push(text.to_string());
    }

    fn vibrate(&mut self, duration: Duration) {
        self.vibrations.push(duration);
    }

    fn schedule(&mut self, delay: Duration, event: ScannerEvent) {
        self.scheduled.push((delay, event));
    }
}

type Screen = ScannerScreen<FakeCamera, FakeDecoder, FakeHost>;

const SURFACE: SurfaceSize = SurfaceSize {
    width: 592,
    height: 592,
};

fn frame() -> ScannerEvent {
    ScannerEvent::Camera(CameraEvent::Frame(Frame::y800(4, 4, vec![0; 16])))
}

fn preview() -> ScannerEvent {
    ScannerEvent::Camera(CameraEvent::Preview(PreviewImage {
        width: 1,
        height: 1,
        rgba: vec![0, 0, 0, 255],
    }))
}

fn focus_done(origin: FocusOrigin) -> ScannerEvent {
    ScannerEvent::Camera(CameraEvent::AutofocusCompleted {
        origin,
        success: false,
    })
}

fn qr(text: &str) -> Vec<Symbol> {
    vec![Symbol::new(text, Symbology::QrCode)]
}

fn screen_with(camera: FakeCamera, decoder: FakeDecoder) -> (Screen, Receiver<CameraEvent>) {
    let (tx, rx) = channel();
    let mut screen = ScannerScreen::new(
        camera,
        decoder,
        FakeHost::default(),
        ScannerConfig::default(),
        tx,
    );
    screen.enter();
    screen.handle(ScannerEvent::SurfaceCreated(SURFACE));
    screen.handle(ScannerEvent::SurfaceChanged(SURFACE));
    (screen, rx)
}

fn scanning(decoder: FakeDecoder) -> Screen {
    screen_with(FakeCamera::default(), decoder).0
}

fn paused_on(text: &str) -> Screen {
    let mut screen = scanning(FakeDecoder::returning(vec![qr(text)]));
    screen.handle(frame());
    assert_eq!(screen.state(), PreviewState::PausedOnResult);
    screen
}

#[test]
fn entering_opens_binds_starts_and_focuses() {
    let screen = scanning(FakeDecoder::default());
    let camera = screen.camera().device();
    assert_eq!(camera.opens, 1);
    assert_eq!(camera.bound, vec![SURFACE, SURFACE]);
    assert_eq!(camera.starts, 1);
    assert_eq!(camera.focus, vec![FocusOrigin::Loop]);
    assert_eq!(screen.state(), PreviewState::Previewing);
}

#[test]
fn frame_without_symbols_changes_nothing() {
    let mut screen = scanning(FakeDecoder::default());
    screen.handle(frame());
    assert_eq!(screen.state(), PreviewState::Previewing);
    assert!(screen.host().results.is_empty());
    assert!(screen.host().vibrations.is_empty());
    assert_eq!(screen.camera().device().stops, 0);
}

#[test]
fn decoded_text_is_trimmed_and_presented() {
    let screen = paused_on("  ABC123  ");
    assert_eq!(screen.host().results, vec!["ABC123".to_string()]);
    assert_eq!(screen.result(), Some("ABC123"));
    assert_eq!(screen.host().vibrations, vec![Duration::from_millis(300)]);
    assert_eq!(screen.camera().device().stops, 1);
    assert!(!screen.camera().is_streaming());
}

#[test]
fn first_symbol_wins() {
    let mut screen = scanning(FakeDecoder::returning(vec![vec![
        Symbol::new("first", Symbology::QrCode),
        Symbol::new("second", Symbology::QrCode),
    ]]));
    screen.handle(frame());
    assert_eq!(screen.host().results, vec!["first".to_string()]);
}

#[test]
fn paused_screen_ignores_frames_previews_and_focus_retries() {
    let mut screen = paused_on("X");
    let calls = screen.camera().device().focus.len();

    screen.handle(frame());
    screen.handle(preview());
    screen.handle(ScannerEvent::AutofocusDue);

    assert_eq!(screen.host().results.len(), 1);
    assert_eq!(screen.host().previews, 0);
    assert_eq!(screen.camera().device().focus.len(), calls);
}

#[test]
fn in_flight_focus_finishing_after_pause_does_not_reschedule() {
    let mut screen = paused_on("X");
    screen.handle(focus_done(FocusOrigin::Loop));
    assert!(screen.host().scheduled.is_empty());
}

#[test]
fn dismissing_resumes_frames_and_focus() {
    let mut screen = paused_on("ABC123");
    screen.handle(ScannerEvent::ResultDismissed);

    assert_eq!(screen.state(), PreviewState::Previewing);
    assert_eq!(screen.result(), None);
    assert!(!screen.host().result_visible);
    assert_eq!(screen.host().toasts, vec!["ABC123".to_string()]);
    assert!(screen.camera().is_streaming());
    assert_eq!(screen.camera().device().starts, 2);
    assert_eq!(
        screen.camera().device().focus,
        vec![FocusOrigin::Loop, FocusOrigin::Loop]
    );

    screen.handle(preview());
    assert_eq!(screen.host().previews, 1);
}

#[test]
fn dismissing_while_a_retry_is_pending_keeps_one_loop() {
    let mut screen = scanning(FakeDecoder::returning(vec![qr("X")]));
    screen.handle(focus_done(FocusOrigin::Loop));
    assert_eq!(screen.host().scheduled.len(), 1);

    screen.handle(frame());
    screen.handle(ScannerEvent::ResultDismissed);
    // the pending retry carries the loop, no second request yet
    assert_eq!(screen.camera().device().focus.len(), 1);

    screen.handle(ScannerEvent::AutofocusDue);
    assert_eq!(screen.camera().device().focus.len(), 2);
}

#[test]
fn autofocus_loop_reschedules_every_interval() {
    let mut screen = scanning(FakeDecoder::default());
    for round in 1..=3 {
        screen.handle(focus_done(FocusOrigin::Loop));
        let (delay, event) = screen.host().scheduled.last().cloned().unwrap();
        assert_eq!(delay, Duration::from_millis(1000));
        assert_eq!(event, ScannerEvent::AutofocusDue);
        screen.handle(event);
        assert_eq!(screen.camera().device().focus.len(), round + 1);
    }
}

#[test]
fn tap_focus_completion_is_not_rescheduled() {
    let mut screen = scanning(FakeDecoder::default());
    let tap = TouchEvent::new(TouchAction::Up, vec![Point::new(10.0, 10.0)]);
    screen.handle(ScannerEvent::Touch(tap));
    assert_eq!(
        screen.camera().device().focus,
        vec![FocusOrigin::Loop, FocusOrigin::Touch]
    );
    screen.handle(focus_done(FocusOrigin::Touch));
    assert!(screen.host().scheduled.is_empty());
}

#[test]
fn tap_during_loop_focus_keeps_the_loop_alive() {
    let mut screen = scanning(FakeDecoder::default());
    let tap = TouchEvent::new(TouchAction::Up, vec![Point::new(10.0, 10.0)]);
    screen.handle(ScannerEvent::Touch(tap));

    // both triggers overlap on the one AF state machine of the device
    let mut tracker = FocusTracker::new();
    for origin in screen.camera().device().focus.clone() {
        tracker.trigger(origin);
    }
    let mut completed = tracker.observe(AF_STATE_FOCUSED_LOCKED);
    completed.extend(tracker.observe(AF_STATE_ACTIVE_SCAN));
    completed.extend(tracker.observe(AF_STATE_FOCUSED_LOCKED));
    assert_eq!(completed.len(), 2);
    for event in completed {
        screen.handle(event.into());
    }

    assert_eq!(
        screen.host().scheduled,
        vec![(Duration::from_millis(1000), ScannerEvent::AutofocusDue)]
    );
    screen.handle(ScannerEvent::AutofocusDue);
    assert_eq!(
        screen.camera().device().focus,
        vec![FocusOrigin::Loop, FocusOrigin::Touch, FocusOrigin::Loop]
    );
}

#[test]
fn pinch_changes_zoom_one_step_per_move() {
    let camera = FakeCamera {
        zoom: Some(ZoomRange { current: 2, max: 3 }),
        ..Default::default()
    };
    let (mut screen, _rx) = screen_with(camera, FakeDecoder::default());
    let pair = |d: f32| vec![Point::new(0.0, 0.0), Point::new(d, 0.0)];

    screen.handle(ScannerEvent::Touch(TouchEvent::new(
        TouchAction::SecondPointerDown,
        pair(100.0),
    )));
    for d in [200.0, 300.0, 400.0] {
        screen.handle(ScannerEvent::Touch(TouchEvent::new(TouchAction::Move, pair(d))));
    }
    assert_eq!(screen.camera().device().zoom.unwrap().current, 3);

    screen.handle(ScannerEvent::Touch(TouchEvent::new(TouchAction::Move, pair(380.0))));
    assert_eq!(screen.camera().device().zoom.unwrap().current, 3);

    screen.handle(ScannerEvent::Touch(TouchEvent::new(TouchAction::Move, pair(200.0))));
    assert_eq!(screen.camera().device().zoom.unwrap().current, 2);
}

#[test]
fn touches_are_ignored_while_result_is_shown() {
    let mut screen = paused_on("X");
    let before = screen.camera().device().focus.len();
    let tap = TouchEvent::new(TouchAction::Up, vec![Point::new(1.0, 1.0)]);
    screen.handle(ScannerEvent::Touch(tap));
    assert_eq!(screen.camera().device().focus.len(), before);
}

#[test]
fn back_while_previewing_releases_camera() {
    let mut screen = scanning(FakeDecoder::default());
    assert!(screen.leave());
    assert_eq!(screen.camera().device().releases, 1);
    assert!(!screen.camera().is_open());
    // releasing again is harmless
    assert!(screen.leave());
    assert_eq!(screen.camera().device().releases, 1);
}

#[test]
fn back_while_result_shown_resumes_instead_of_leaving() {
    let mut screen = paused_on("X");
    assert!(!screen.leave());
    assert_eq!(screen.state(), PreviewState::Previewing);
    assert!(screen.camera().is_open());
    assert_eq!(screen.camera().device().releases, 0);
    assert!(screen.host().toasts.is_empty());
    assert!(!screen.host().result_visible);
}

#[test]
fn unavailable_camera_leaves_screen_inert() {
    let camera = FakeCamera {
        fail_open: true,
        ..Default::default()
    };
    let (mut screen, _rx) = screen_with(camera, FakeDecoder::default());
    assert!(!screen.camera().is_open());
    assert!(screen.camera().device().bound.is_empty());
    assert_eq!(screen.camera().device().starts, 0);
    assert!(screen.camera().device().focus.is_empty());
    assert!(screen.leave());
    assert_eq!(screen.camera().device().releases, 0);
}

#[test]
fn empty_surface_is_logged_not_bound() {
    let (tx, _rx) = channel();
    let mut screen: Screen = ScannerScreen::new(
        FakeCamera::default(),
        FakeDecoder::default(),
        FakeHost::default(),
        ScannerConfig::default(),
        tx,
    );
    screen.enter();
    screen.handle(ScannerEvent::SurfaceCreated(SurfaceSize::new(0, 0)));
    assert!(screen.camera().device().bound.is_empty());
}

#[test]
fn fixed_focus_camera_never_loops() {
    let camera = FakeCamera {
        no_autofocus: true,
        ..Default::default()
    };
    let (mut screen, _rx) = screen_with(camera, FakeDecoder::default());
    assert!(screen.camera().device().focus.is_empty());
    assert!(!screen.autofocus().is_in_flight());
    screen.handle(ScannerEvent::AutofocusDue);
    assert!(screen.camera().device().focus.is_empty());
}

#[test]
fn replayed_frames_reach_the_decoder_and_stop_after_a_hit() {
    let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 32, Luma([255])));
    let camera = ReplayCamera::with_images(vec![image]).frame_interval(Duration::from_millis(2));
    let decoder = FakeDecoder::returning(vec![vec![], vec![], qr(" hello ")]);
    let (tx, rx) = channel();
    let mut screen = ScannerScreen::new(camera, decoder, FakeHost::default(), ScannerConfig::default(), tx);
    screen.enter();
    screen.handle(ScannerEvent::SurfaceCreated(SurfaceSize::new(16, 16)));
    screen.handle(ScannerEvent::SurfaceChanged(SurfaceSize::new(16, 16)));

    let deadline = Instant::now() + Duration::from_secs(10);
    while screen.state() == PreviewState::Previewing && Instant::now() < deadline {
        if let Ok(event) = rx.recv_timeout(Duration::from_millis(100)) {
            screen.handle(event.into());
        }
    }

    assert_eq!(screen.state(), PreviewState::PausedOnResult);
    assert_eq!(screen.host().results, vec!["hello".to_string()]);
    assert!(screen.host().previews > 0);
    assert!(!screen.camera().is_streaming());
    // the replay's focus completion was turned into a scheduled retry
    assert!(screen
        .host()
        .scheduled
        .iter()
        .all(|(_, event)| *event == ScannerEvent::AutofocusDue));
}

#[test]
fn events_left_by_a_closed_scan_are_not_replayed() {
    let (scheduled_tx, scheduled_rx) = channel();
    let (camera_tx, camera_rx) = channel();
    let queue = EventQueue::new(scheduled_rx, camera_rx);

    let mut first: Screen = ScannerScreen::new(
        FakeCamera::default(),
        FakeDecoder::default(),
        FakeHost::default(),
        ScannerConfig::default(),
        camera_tx.clone(),
    );
    first.enter();
    camera_tx
        .send(CameraEvent::Frame(Frame::y800(4, 4, vec![0; 16])))
        .unwrap();
    scheduled_tx.send(ScannerEvent::AutofocusDue).unwrap();
    assert!(first.leave());
    drop(first);

    assert_eq!(queue.discard(), 2);
    let mut second = screen_with(
        FakeCamera::default(),
        FakeDecoder::returning(vec![qr("stale")]),
    )
    .0;
    for event in queue.take_ready() {
        second.handle(event);
    }
    assert_eq!(second.state(), PreviewState::Previewing);
    assert!(second.host().results.is_empty());
}

#[test]
fn queue_hands_out_scheduled_events_then_latest_frame() {
    let (scheduled_tx, scheduled_rx) = channel();
    let (camera_tx, camera_rx) = channel();
    let queue = EventQueue::new(scheduled_rx, camera_rx);
    for v in 1..=3 {
        camera_tx
            .send(CameraEvent::Frame(Frame::y800(1, 1, vec![v])))
            .unwrap();
    }
    scheduled_tx.send(ScannerEvent::AutofocusDue).unwrap();
    assert_eq!(
        queue.take_ready(),
        vec![
            ScannerEvent::AutofocusDue,
            ScannerEvent::Camera(CameraEvent::Frame(Frame::y800(1, 1, vec![3]))),
        ]
    );
    assert!(queue.take_ready().is_empty());
}
