use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use image::{imageops::FilterType, DynamicImage};
use log::{error, info};

use super::{CameraDevice, CameraEvent, FocusOrigin, SurfaceSize, ZoomRange};
use crate::error::CameraError;
use crate::frame::{Frame, PixelFormat, PreviewImage};

const MAX_ZOOM: u32 = 10;

/// Camera that plays a fixed list of still images in a loop, one every
/// `frame_interval`. Zoom crops toward the centre of the image.
pub struct ReplayCamera {
    paths: Vec<PathBuf>,
    images: Arc<Vec<DynamicImage>>,
    frame_interval: Duration,
    surface: Option<SurfaceSize>,
    zoom: Arc<Mutex<u32>>,
    running: Option<Arc<AtomicBool>>,
    task: Option<std::thread::JoinHandle<Result<()>>>,
    events: Option<Sender<CameraEvent>>,
}

impl ReplayCamera {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self::with_images(vec![]).paths(paths)
    }

    /// Replay already decoded images; `open` then never touches the disk.
    pub fn with_images(images: Vec<DynamicImage>) -> Self {
        Self {
            paths: vec![],
            images: Arc::new(images),
            frame_interval: Duration::from_millis(33),
            surface: None,
            zoom: Arc::new(Mutex::new(0)),
            running: None,
            task: None,
            events: None,
        }
    }

    fn paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.paths = paths;
        self
    }

    pub fn frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    fn load(path: &Path) -> Result<DynamicImage> {
        image::open(path).map_err(|err| anyhow!("{}: {err}", path.display()))
    }
}

/// RGBA frame and preview of one replayed image at the given zoom step.
fn render(image: &DynamicImage, zoom: u32, surface: Option<SurfaceSize>) -> (Frame, PreviewImage) {
    let (width, height) = (image.width(), image.height());
    let scale = 1.0 + zoom as f32 / MAX_ZOOM as f32;
    let crop_w = ((width as f32 / scale) as u32).max(1);
    let crop_h = ((height as f32 / scale) as u32).max(1);
    let cropped = image.crop_imm((width - crop_w) / 2, (height - crop_h) / 2, crop_w, crop_h);

    let rgba = cropped.to_rgba8();
    let frame = Frame::new(rgba.width(), rgba.height(), PixelFormat::Rgba8, rgba.into_raw());

    let preview = match surface {
        Some(size) if !size.is_empty() => cropped.resize(size.width, size.height, FilterType::Triangle),
        _ => cropped,
    };
    (frame, PreviewImage::from_rgba(preview.to_rgba8()))
}

impl CameraDevice for ReplayCamera {
    fn open(&mut self) -> Result<(), CameraError> {
        if self.images.is_empty() {
            if self.paths.is_empty() {
                return Err(CameraError::DeviceUnavailable("no images to replay".into()));
            }
            let images = self
                .paths
                .iter()
                .map(|path| Self::load(path))
                .collect::<Result<Vec<_>>>()
                .map_err(|err| CameraError::DeviceUnavailable(err.to_string()))?;
            self.images = Arc::new(images);
        }
        info!("replay camera: {} image(s)", self.images.len());
        Ok(())
    }

    fn bind_surface(&mut self, surface: SurfaceSize) -> Result<(), CameraError> {
        self.surface = Some(surface);
        Ok(())
    }

    fn start(&mut self, events: Sender<CameraEvent>) -> Result<(), CameraError> {
        self.stop();
        let running = Arc::new(AtomicBool::new(true));
        self.running = Some(running.clone());
        self.events = Some(events.clone());
        let images = self.images.clone();
        let zoom = self.zoom.clone();
        let surface = self.surface;
        let interval = self.frame_interval;
        self.task = Some(std::thread::spawn(move || {
            for image in images.iter().cycle() {
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                let level = zoom.lock().map(|z| *z).unwrap_or(0);
                let (frame, preview) = render(image, level, surface);
                events
                    .send(CameraEvent::Preview(preview))
                    .map_err(|err| anyhow!("{:?}", err))?;
                events
                    .send(CameraEvent::Frame(frame))
                    .map_err(|err| anyhow!("{:?}", err))?;
                std::thread::sleep(interval);
            }
            Ok(())
        }));
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.store(false, Ordering::Relaxed);
        }
        self.events = None;
        if let Some(task) = self.task.take() {
            match task.join() {
                Ok(Err(err)) => error!("replay stopped: {err}"),
                Err(_) => error!("replay thread panicked"),
                Ok(Ok(())) => {}
            }
        }
    }

    fn release(&mut self) {
        self.stop();
        self.surface = None;
    }

    fn request_autofocus(&mut self, origin: FocusOrigin) {
        // still images are always in focus
        if let Some(events) = self.events.as_ref() {
            let _ = events.send(CameraEvent::AutofocusCompleted {
                origin,
                success: true,
            });
        }
    }

    fn zoom(&self) -> Option<ZoomRange> {
        let current = self.zoom.lock().map(|z| *z).unwrap_or(0);
        Some(ZoomRange {
            current,
            max: MAX_ZOOM,
        })
    }

    fn set_zoom(&mut self, level: u32) -> Result<(), CameraError> {
        let mut zoom = self
            .zoom
            .lock()
            .map_err(|_| CameraError::Unsupported("zoom state poisoned"))?;
        *zoom = level.min(MAX_ZOOM);
        Ok(())
    }
}

impl Drop for ReplayCamera {
    fn drop(&mut self) {
        self.stop();
    }
}
