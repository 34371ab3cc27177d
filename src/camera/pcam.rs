use std::{
    sync::{mpsc::Sender, Arc, Mutex},
    time::{Duration, Instant},
};

use anyhow::{anyhow, Result};
use image::{imageops::FilterType, DynamicImage, RgbaImage};
use kamera::Camera as KCamera;
use log::{error, info, warn};

use super::{CameraDevice, CameraEvent, FocusOrigin, SurfaceSize};
use crate::error::CameraError;
use crate::frame::{Frame, PixelFormat, PreviewImage};

/// Desktop webcam through `kamera`. Webcams here are fixed focus and
/// cannot zoom.
pub struct WebCamera {
    index: usize,
    opened: bool,
    surface: Option<SurfaceSize>,
    camera_handle: Option<Arc<Mutex<bool>>>,
    camera_task: Option<std::thread::JoinHandle<Result<()>>>,
}

impl WebCamera {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            opened: false,
            surface: None,
            camera_handle: None,
            camera_task: None,
        }
    }
}

impl CameraDevice for WebCamera {
    fn open(&mut self) -> Result<(), CameraError> {
        if KCamera::new_device(self.index).is_none() {
            return Err(CameraError::DeviceUnavailable(format!(
                "camera id {} not exist",
                self.index
            )));
        }
        self.opened = true;
        Ok(())
    }

    fn bind_surface(&mut self, surface: SurfaceSize) -> Result<(), CameraError> {
        self.surface = Some(surface);
        Ok(())
    }

    fn start(&mut self, events: Sender<CameraEvent>) -> Result<(), CameraError> {
        if !self.opened {
            return Err(CameraError::DeviceUnavailable("camera not open".into()));
        }
        self.stop();
        let camera_handle = Arc::new(Mutex::new(true));
        self.camera_handle = Some(camera_handle.clone());
        let index = self.index;
        let surface = self.surface;
        self.camera_task = Some(std::thread::spawn(move || {
            let camera = match KCamera::new_device(index) {
                None => return Err(anyhow!("camera id not exist")),
                Some(v) => v,
            };
            camera.start();
            let mut count = 0;
            let mut timer = Instant::now();
            loop {
                if let Ok(opened) = camera_handle.lock() {
                    if !*opened {
                        break;
                    }
                }

                let frame = match camera.wait_for_frame() {
                    Some(f) => f,
                    None => {
                        warn!("failed to grab frame");
                        std::thread::sleep(Duration::from_millis(10));
                        continue;
                    }
                };

                let (width, height) = frame.size_u32();
                let frame_data = frame.data();
                let mut rgba = frame_data.data_u8().to_vec();
                for bgra in rgba.chunks_exact_mut(4) {
                    bgra.swap(0, 2);
                }
                let rgba = match RgbaImage::from_raw(width, height, rgba) {
                    Some(img) => DynamicImage::ImageRgba8(img),
                    None => continue,
                };

                let preview = match surface {
                    Some(size) if !size.is_empty() => {
                        rgba.resize(size.width, size.height, FilterType::Triangle)
                    }
                    _ => rgba.clone(),
                };
                events
                    .send(CameraEvent::Preview(PreviewImage::from_rgba(preview.to_rgba8())))
                    .map_err(|err| anyhow!("{:?}", err))?;
                let frame = Frame::new(width, height, PixelFormat::Rgba8, rgba.into_rgba8().into_raw());
                events
                    .send(CameraEvent::Frame(frame))
                    .map_err(|err| anyhow!("{:?}", err))?;

                count += 1;
                if count == 30 {
                    let time = timer.elapsed().as_millis();
                    info!("30 frames in {time}ms, {width}x{height}");
                    count = 0;
                    timer = Instant::now();
                }
            }
            camera.stop();
            Ok(())
        }));
        Ok(())
    }

    fn stop(&mut self) {
        let mut need_close = false;
        if let Some(handle) = self.camera_handle.as_ref() {
            if let Ok(mut handle) = handle.lock() {
                *handle = false;
                need_close = true;
            }
        }

        if need_close {
            info!("stop preview..");
            if let Some(handle) = self.camera_task.take() {
                match handle.join() {
                    Ok(Err(err)) => error!("webcam stopped: {err}"),
                    Err(_) => error!("webcam thread panicked"),
                    Ok(Ok(())) => {}
                }
            }
        }
        self.camera_handle = None;
    }

    fn release(&mut self) {
        self.stop();
        self.opened = false;
    }

    fn request_autofocus(&mut self, origin: FocusOrigin) {
        warn!("{origin:?} autofocus requested on a fixed-focus webcam");
    }

    fn supports_autofocus(&self) -> bool {
        false
    }
}

impl Drop for WebCamera {
    fn drop(&mut self) {
        self.stop();
    }
}
