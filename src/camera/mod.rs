#[cfg(not(target_os = "android"))]
use std::path::PathBuf;
use std::sync::mpsc::Sender;

use log::{info, warn};

use crate::error::CameraError;
use crate::frame::{Frame, PreviewImage};

#[cfg(target_os = "android")]
mod camera2;

#[cfg(target_os = "windows")]
mod pcam;

pub mod focus;
mod replay;

#[cfg(target_os = "android")]
pub use camera2::AndroidCamera;
#[cfg(target_os = "windows")]
pub use pcam::WebCamera;
pub use replay::ReplayCamera;

/// Size of the surface the preview is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Current zoom step and the largest step the device supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomRange {
    pub current: u32,
    pub max: u32,
}

/// Who asked for an autofocus cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusOrigin {
    /// The self-rescheduling focus loop.
    Loop,
    /// A single tap on the preview.
    Touch,
}

/// Everything a streaming camera reports back.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraEvent {
    Frame(Frame),
    Preview(PreviewImage),
    AutofocusCompleted { origin: FocusOrigin, success: bool },
}

/// A camera the scanner can drive. Implemented by the platform backends and
/// by fakes in tests.
pub trait CameraDevice {
    fn open(&mut self) -> Result<(), CameraError>;

    fn bind_surface(&mut self, surface: SurfaceSize) -> Result<(), CameraError>;

    /// Start streaming frames and focus completions into `events`.
    fn start(&mut self, events: Sender<CameraEvent>) -> Result<(), CameraError>;

    /// Stop streaming and drop the event sender.
    fn stop(&mut self);

    /// Free the device. Must be safe to call when nothing is held.
    fn release(&mut self);

    fn request_autofocus(&mut self, origin: FocusOrigin);

    fn supports_autofocus(&self) -> bool {
        true
    }

    /// `None` when the device cannot zoom.
    fn zoom(&self) -> Option<ZoomRange> {
        None
    }

    fn set_zoom(&mut self, _level: u32) -> Result<(), CameraError> {
        Err(CameraError::Unsupported("zoom"))
    }
}

impl<C: CameraDevice + ?Sized> CameraDevice for Box<C> {
    fn open(&mut self) -> Result<(), CameraError> {
        (**self).open()
    }

    fn bind_surface(&mut self, surface: SurfaceSize) -> Result<(), CameraError> {
        (**self).bind_surface(surface)
    }

    fn start(&mut self, events: Sender<CameraEvent>) -> Result<(), CameraError> {
        (**self).start(events)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn release(&mut self) {
        (**self).release()
    }

    fn request_autofocus(&mut self, origin: FocusOrigin) {
        (**self).request_autofocus(origin)
    }

    fn supports_autofocus(&self) -> bool {
        (**self).supports_autofocus()
    }

    fn zoom(&self) -> Option<ZoomRange> {
        (**self).zoom()
    }

    fn set_zoom(&mut self, level: u32) -> Result<(), CameraError> {
        (**self).set_zoom(level)
    }
}

/// Camera for the desktop build: the replayed images when any are given,
/// otherwise webcam `camera_index`.
#[cfg(not(target_os = "android"))]
pub fn desktop_camera(camera_index: usize, replay: &[PathBuf]) -> Box<dyn CameraDevice> {
    if !replay.is_empty() {
        return Box::new(ReplayCamera::new(replay.to_vec()));
    }
    webcam(camera_index)
}

#[cfg(target_os = "windows")]
fn webcam(camera_index: usize) -> Box<dyn CameraDevice> {
    Box::new(WebCamera::new(camera_index))
}

#[cfg(not(any(target_os = "windows", target_os = "android")))]
fn webcam(camera_index: usize) -> Box<dyn CameraDevice> {
    warn!("no webcam backend on this platform, camera {camera_index} unavailable; use --replay");
    Box::new(ReplayCamera::new(vec![]))
}

/// Keeps only the newest frame and the newest preview of a batch; focus
/// completions are kept in order. Frames that piled up while the UI thread
/// was busy would otherwise all be decoded.
pub fn coalesce_frames(events: impl IntoIterator<Item = CameraEvent>) -> Vec<CameraEvent> {
    let mut frame = None;
    let mut preview = None;
    let mut out = vec![];
    for event in events {
        match event {
            CameraEvent::Frame(f) => frame = Some(f),
            CameraEvent::Preview(p) => preview = Some(p),
            other => out.push(other),
        }
    }
    out.extend(preview.map(CameraEvent::Preview));
    out.extend(frame.map(CameraEvent::Frame));
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Opened,
    Streaming,
}

/// Owns the single camera device of the scanner screen and keeps track of
/// whether it is open and streaming.
pub struct CameraSession<C: CameraDevice> {
    device: C,
    state: SessionState,
}

impl<C: CameraDevice> CameraSession<C> {
    pub fn new(device: C) -> Self {
        Self {
            device,
            state: SessionState::Closed,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state != SessionState::Closed
    }

    pub fn is_streaming(&self) -> bool {
        self.state == SessionState::Streaming
    }

    pub fn device(&self) -> &C {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut C {
        &mut self.device
    }

    pub fn open(&mut self) -> Result<(), CameraError> {
        if self.is_open() {
            warn!("camera opened twice without release");
        }
        self.device.open()?;
        self.state = SessionState::Opened;
        info!("camera opened");
        Ok(())
    }

    pub fn bind_surface(&mut self, surface: SurfaceSize) -> Result<(), CameraError> {
        if !self.is_open() {
            return Err(CameraError::DeviceUnavailable("camera not open".into()));
        }
        if surface.is_empty() {
            return Err(CameraError::SurfaceBind(format!(
                "surface not ready ({}x{})",
                surface.width, surface.height
            )));
        }
        self.device.bind_surface(surface)
    }

    pub fn start(&mut self, events: Sender<CameraEvent>) -> Result<(), CameraError> {
        if !self.is_open() {
            return Err(CameraError::DeviceUnavailable("camera not open".into()));
        }
        self.device.start(events)?;
        self.state = SessionState::Streaming;
        Ok(())
    }

    pub fn stop(&mut self) {
        if self.state == SessionState::Streaming {
            self.device.stop();
            self.state = SessionState::Opened;
        }
    }

    pub fn release(&mut self) {
        if !self.is_open() {
            return;
        }
        self.stop();
        self.device.release();
        self.state = SessionState::Closed;
        info!("camera released");
    }

    pub fn request_autofocus(&mut self, origin: FocusOrigin) {
        if self.is_streaming() && self.device.supports_autofocus() {
            self.device.request_autofocus(origin);
        }
    }

    pub fn supports_autofocus(&self) -> bool {
        self.is_open() && self.device.supports_autofocus()
    }

    pub fn zoom(&self) -> Option<ZoomRange> {
        if self.is_open() {
            self.device.zoom()
        } else {
            None
        }
    }

    pub fn set_zoom(&mut self, level: u32) -> Result<(), CameraError> {
        if !self.is_open() {
            return Err(CameraError::DeviceUnavailable("camera not open".into()));
        }
        self.device.set_zoom(level)
    }
}

impl<C: CameraDevice> Drop for CameraSession<C> {
    fn drop(&mut self) {
        self.release();
    }
}
