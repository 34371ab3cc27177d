//! The scanner screen: one state machine fed by a single-threaded event
//! loop. Camera callbacks, delayed autofocus retries, touches and dialog
//! buttons all arrive as [`ScannerEvent`]s.

use std::sync::mpsc::{Receiver, Sender};
use std::time::Duration;

use log::{debug, error, info};

use crate::autofocus::AutofocusLoop;
use crate::camera::{
    coalesce_frames, CameraDevice, CameraEvent, CameraSession, FocusOrigin, SurfaceSize,
};
use crate::config::ScannerConfig;
use crate::decoder::Decoder;
use crate::frame::{Frame, PreviewImage};
use crate::gesture::{GestureOutcome, PinchZoom, TouchEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PreviewState {
    #[default]
    Previewing,
    PausedOnResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScannerEvent {
    SurfaceCreated(SurfaceSize),
    SurfaceChanged(SurfaceSize),
    SurfaceDestroyed,
    Camera(CameraEvent),
    /// The delay after an autofocus cycle elapsed.
    AutofocusDue,
    Touch(TouchEvent),
    /// The user closed the result dialog.
    ResultDismissed,
}

impl From<CameraEvent> for ScannerEvent {
    fn from(event: CameraEvent) -> Self {
        ScannerEvent::Camera(event)
    }
}

/// What the scanner needs from the UI it is embedded in.
pub trait ScannerHost {
    fn show_preview(&mut self, image: PreviewImage);
    fn show_result(&mut self, text: &str);
    fn hide_result(&mut self);
    fn show_toast(&mut self, text: &str);
    fn vibrate(&mut self, duration: Duration);
    /// Deliver `event` back to [`ScannerScreen::handle`] after `delay`.
    fn schedule(&mut self, delay: Duration, event: ScannerEvent);
}

/// Receiving ends of the two channels that feed a scanner screen: events
/// the host scheduled and events the camera streams. Outlives the screens
/// it feeds.
pub struct EventQueue {
    scheduled: Receiver<ScannerEvent>,
    camera: Receiver<CameraEvent>,
}

impl EventQueue {
    pub fn new(scheduled: Receiver<ScannerEvent>, camera: Receiver<CameraEvent>) -> Self {
        Self { scheduled, camera }
    }

    /// Everything queued so far: scheduled events first, then the camera's
    /// with frames coalesced.
    pub fn take_ready(&self) -> Vec<ScannerEvent> {
        let mut events: Vec<ScannerEvent> = self.scheduled.try_iter().collect();
        events.extend(coalesce_frames(self.camera.try_iter()).into_iter().map(ScannerEvent::from));
        events
    }

    /// Drop whatever a previous screen left behind. Returns how many events
    /// were discarded.
    pub fn discard(&self) -> usize {
        self.scheduled.try_iter().count() + self.camera.try_iter().count()
    }
}

pub struct ScannerScreen<C: CameraDevice, D: Decoder, H: ScannerHost> {
    camera: CameraSession<C>,
    decoder: D,
    host: H,
    config: ScannerConfig,
    state: PreviewState,
    autofocus: AutofocusLoop,
    pinch: PinchZoom,
    events: Sender<CameraEvent>,
    surface: Option<SurfaceSize>,
    result: Option<String>,
}

impl<C: CameraDevice, D: Decoder, H: ScannerHost> ScannerScreen<C, D, H> {
    pub fn new(
        camera: C,
        decoder: D,
        host: H,
        config: ScannerConfig,
        events: Sender<CameraEvent>,
    ) -> Self {
        let pinch = PinchZoom::new(config.zoom_threshold);
        Self {
            camera: CameraSession::new(camera),
            decoder,
            host,
            config,
            state: PreviewState::Previewing,
            autofocus: AutofocusLoop::new(),
            pinch,
            events,
            surface: None,
            result: None,
        }
    }

    pub fn state(&self) -> PreviewState {
        self.state
    }

    /// Text of the result on screen, if any.
    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn camera(&self) -> &CameraSession<C> {
        &self.camera
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn autofocus(&self) -> &AutofocusLoop {
        &self.autofocus
    }

    /// Acquire the camera. A failure is logged and leaves the screen without
    /// a preview.
    pub fn enter(&mut self) {
        if let Err(err) = self.camera.open() {
            error!("Failed to open camera: {err}");
        }
    }

    /// Back navigation. Returns `true` when the screen should close; while a
    /// result is displayed it is dismissed instead and the camera is kept.
    pub fn leave(&mut self) -> bool {
        if self.state == PreviewState::PausedOnResult {
            self.resume();
            return false;
        }
        self.camera.release();
        self.autofocus.reset();
        true
    }

    pub fn handle(&mut self, event: ScannerEvent) {
        match event {
            ScannerEvent::SurfaceCreated(size) => {
                self.surface = Some(size);
                self.bind_surface(size);
            }
            ScannerEvent::SurfaceChanged(size) => {
                self.surface = Some(size);
                if self.state == PreviewState::Previewing {
                    self.restart_preview();
                } else {
                    self.bind_surface(size);
                }
            }
            ScannerEvent::SurfaceDestroyed => {
                self.surface = None;
                self.camera.stop();
                self.autofocus.reset();
            }
            ScannerEvent::Camera(CameraEvent::Frame(frame)) => self.on_frame(frame),
            ScannerEvent::Camera(CameraEvent::Preview(image)) => {
                if self.state == PreviewState::Previewing {
                    self.host.show_preview(image);
                }
            }
            ScannerEvent::Camera(CameraEvent::AutofocusCompleted { origin, success }) => {
                match origin {
                    FocusOrigin::Loop => {
                        if self.autofocus.complete() {
                            self.host
                                .schedule(self.config.autofocus_interval, ScannerEvent::AutofocusDue);
                        }
                    }
                    FocusOrigin::Touch => debug!("tap autofocus finished, success={success}"),
                }
            }
            ScannerEvent::AutofocusDue => {
                if self.autofocus.due(self.state) {
                    self.request_loop_focus();
                }
            }
            ScannerEvent::Touch(touch) => self.on_touch(&touch),
            ScannerEvent::ResultDismissed => {
                if let Some(text) = self.result.clone() {
                    self.host.show_toast(&text);
                }
                self.resume();
            }
        }
    }

    fn bind_surface(&mut self, size: SurfaceSize) {
        if let Err(err) = self.camera.bind_surface(size) {
            error!("Failed to bind preview surface: {err}");
        }
    }

    fn restart_preview(&mut self) {
        self.camera.stop();
        self.autofocus.reset();
        if let Some(size) = self.surface {
            self.bind_surface(size);
        }
        self.start_preview();
    }

    fn start_preview(&mut self) {
        if let Err(err) = self.camera.start(self.events.clone()) {
            error!("Failed to start preview: {err}");
            return;
        }
        if self.autofocus.kick() {
            self.request_loop_focus();
        }
    }

    fn request_loop_focus(&mut self) {
        if !self.camera.is_streaming() || !self.camera.supports_autofocus() {
            self.autofocus.reset();
            return;
        }
        self.camera.request_autofocus(FocusOrigin::Loop);
    }

    fn on_frame(&mut self, frame: Frame) {
        if self.state != PreviewState::Previewing {
            return;
        }
        let symbol = match self.decoder.scan_image(&frame).into_iter().next() {
            Some(symbol) => symbol,
            None => return,
        };
        let text = symbol.data.trim().to_string();
        info!("decoded {:?}: {text}", symbol.symbology);

        self.state = PreviewState::PausedOnResult;
        self.camera.stop();
        self.autofocus.reset();
        self.host.vibrate(self.config.vibration);
        self.host.show_result(&text);
        self.result = Some(text);
    }

    fn on_touch(&mut self, touch: &TouchEvent) {
        if self.state != PreviewState::Previewing {
            return;
        }
        match self.pinch.on_touch(touch, self.camera.zoom()) {
            GestureOutcome::Zoom(level) => {
                debug!("zoom -> {level}");
                if let Err(err) = self.camera.set_zoom(level) {
                    error!("Failed to set zoom: {err}");
                }
            }
            GestureOutcome::Focus => {
                if self.camera.supports_autofocus() {
                    self.camera.request_autofocus(FocusOrigin::Touch);
                }
            }
            GestureOutcome::None => {}
        }
    }

    fn resume(&mut self) {
        if self.state != PreviewState::PausedOnResult {
            return;
        }
        self.result = None;
        self.host.hide_result();
        self.state = PreviewState::Previewing;
        self.start_preview();
    }
}
