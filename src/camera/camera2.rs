use core::slice;
use std::{
    ffi::{c_int, c_void, CStr},
    mem::zeroed,
    ptr::null_mut,
    sync::{mpsc::Sender, Mutex},
    time::Instant,
};

use image::{
    imageops::{rotate180, rotate270, rotate90},
    RgbaImage,
};
use log::{debug, error, info, warn};
use ndk_sys::{
    acamera_metadata_tag, camera_status_t, media_status_t, ACameraCaptureFailure,
    ACameraCaptureSession, ACameraCaptureSession_capture, ACameraCaptureSession_captureCallbacks,
    ACameraCaptureSession_close, ACameraCaptureSession_setRepeatingRequest,
    ACameraCaptureSession_stateCallbacks, ACameraCaptureSession_stopRepeating, ACameraDevice,
    ACameraDevice_StateCallbacks, ACameraDevice_close, ACameraDevice_createCaptureRequest,
    ACameraDevice_createCaptureSession, ACameraDevice_getId, ACameraDevice_request_template,
    ACameraManager_create, ACameraManager_delete, ACameraManager_deleteCameraIdList,
    ACameraManager_getCameraCharacteristics, ACameraManager_getCameraIdList,
    ACameraManager_openCamera, ACameraMetadata, ACameraMetadata_const_entry, ACameraMetadata_free,
    ACameraMetadata_getConstEntry, ACameraOutputTarget, ACameraOutputTarget_create,
    ACameraOutputTarget_free, ACaptureRequest, ACaptureRequest_addTarget, ACaptureRequest_free,
    ACaptureRequest_setEntry_i32, ACaptureRequest_setEntry_u8, ACaptureSessionOutput,
    ACaptureSessionOutputContainer, ACaptureSessionOutputContainer_add,
    ACaptureSessionOutputContainer_create, ACaptureSessionOutputContainer_free,
    ACaptureSessionOutput_create, ACaptureSessionOutput_free, AImageReader,
    AImageReader_ImageListener, AImageReader_acquireLatestImage, AImageReader_delete,
    AImageReader_getFormat, AImageReader_getHeight, AImageReader_getWidth,
    AImageReader_getWindow, AImageReader_new, AImageReader_setImageListener, AImage_delete,
    AImage_getPlaneData, AImage_getPlanePixelStride, AImage_getPlaneRowStride, ANativeWindow,
    AIMAGE_FORMATS,
};
use slint::android::AndroidApp;

use super::focus::FocusTracker;
use super::{CameraDevice, CameraEvent, FocusOrigin, SurfaceSize, ZoomRange};
use crate::android::{check_self_permission, request_camera_permission, CAMERA_PERMISSION};
use crate::error::CameraError;
use crate::frame::{decode_yuv420sp, Frame, PreviewImage};

#[link(name = "camera2ndk")]
extern "C" {}

#[link(name = "mediandk")]
extern "C" {}

// android.hardware.camera2.CameraMetadata values
const CONTROL_AF_MODE_AUTO: u8 = 1;
const CONTROL_AF_TRIGGER_IDLE: u8 = 0;
const CONTROL_AF_TRIGGER_START: u8 = 1;

/// Number of zoom steps mapped onto the digital zoom range.
const ZOOM_STEPS: u32 = 30;

/// State shared with the NDK callbacks, which run on camera threads. Boxed
/// so its address survives moves of [`AndroidCamera`].
struct StreamContext {
    image_reader: *mut AImageReader,
    sensor_orientation: i32,
    events: Mutex<Option<Sender<CameraEvent>>>,
    focus: Mutex<FocusTracker>,
    fps: Mutex<(Instant, i32)>,
}

impl StreamContext {
    fn send(&self, event: CameraEvent) {
        if let Ok(events) = self.events.lock() {
            if let Some(events) = events.as_ref() {
                let _ = events.send(event);
            }
        }
    }

    fn track_focus(&self, update: impl FnOnce(&mut FocusTracker) -> Vec<CameraEvent>) {
        let completed = match self.focus.lock() {
            Ok(mut focus) => update(&mut focus),
            Err(_) => return,
        };
        for event in completed {
            self.send(event);
        }
    }
}

pub struct AndroidCamera {
    app: AndroidApp,
    camera_index: usize,
    /// preferred image reader size
    preview_width: u32,
    preview_height: u32,
    camera_device: *mut ACameraDevice,
    capture_request: *mut ACaptureRequest,
    camera_output_target: *mut ACameraOutputTarget,
    session_output: *mut ACaptureSessionOutput,
    capture_session_output_container: *mut ACaptureSessionOutputContainer,
    capture_session: *mut ACameraCaptureSession,
    /// width,height,format
    image_formats: Vec<(i32, i32, i32)>,
    camera_id: Option<String>,
    image_listener: AImageReader_ImageListener,
    capture_session_state_callbacks: ACameraCaptureSession_stateCallbacks,
    capture_callbacks: ACameraCaptureSession_captureCallbacks,
    device_state_callbacks: ACameraDevice_StateCallbacks,
    context: Option<Box<StreamContext>>,
    sensor_orientation: i32,
    /// xmin, ymin, width, height
    active_array: [i32; 4],
    max_digital_zoom: f32,
    zoom_level: u32,
    af_available: bool,
}

impl AndroidCamera {
    pub fn new(app: AndroidApp, camera_index: usize, preview_width: u32, preview_height: u32) -> Self {
        Self {
            app,
            camera_index,
            preview_width,
            preview_height,
            camera_device: null_mut(),
            capture_request: null_mut(),
            camera_output_target: null_mut(),
            session_output: null_mut(),
            capture_session_output_container: null_mut(),
            capture_session: null_mut(),
            image_formats: vec![],
            camera_id: None,
            image_listener: AImageReader_ImageListener {
                context: null_mut(),
                onImageAvailable: None,
            },
            capture_session_state_callbacks: unsafe { zeroed() },
            capture_callbacks: unsafe { zeroed() },
            device_state_callbacks: unsafe { zeroed() },
            context: None,
            sensor_orientation: 0,
            active_array: [0; 4],
            max_digital_zoom: 1.0,
            zoom_level: 0,
            af_available: false,
        }
    }

    fn open_device(&mut self) -> Result<(), String> {
        let camera_id = format!("{}", self.camera_index);
        unsafe {
            let camera_manager = ACameraManager_create();
            let mut camera_id_list_raw = null_mut();
            let camera_status =
                ACameraManager_getCameraIdList(camera_manager, &mut camera_id_list_raw);
            if camera_status != camera_status_t::ACAMERA_OK || camera_id_list_raw.is_null() {
                ACameraManager_delete(camera_manager);
                return Err(format!(
                    "Failed to get camera id list (reason: {:?})",
                    camera_status
                ));
            }

            let camera_id_list = &*camera_id_list_raw;
            if camera_id_list.numCameras < 1 {
                ACameraManager_deleteCameraIdList(camera_id_list_raw);
                ACameraManager_delete(camera_manager);
                return Err("No camera device detected.".into());
            }

            let camera_ids =
                slice::from_raw_parts(camera_id_list.cameraIds, camera_id_list.numCameras as usize);
            let selected_camera_id = camera_ids
                .iter()
                .find(|cid| get_cstr(**cid) == Some(camera_id.as_str()))
                .copied();
            let selected_camera_id = match selected_camera_id {
                Some(id) => id,
                None => {
                    ACameraManager_deleteCameraIdList(camera_id_list_raw);
                    ACameraManager_delete(camera_manager);
                    return Err(format!("Camera Id {camera_id} not found."));
                }
            };

            info!(
                "Trying to open Camera2 (id: {camera_id}, num of camera : {})",
                camera_ids.len()
            );

            let mut camera_metadata = null_mut();
            let camera_status = ACameraManager_getCameraCharacteristics(
                camera_manager,
                selected_camera_id,
                &mut camera_metadata,
            );
            if camera_status != camera_status_t::ACAMERA_OK {
                ACameraManager_deleteCameraIdList(camera_id_list_raw);
                ACameraManager_delete(camera_manager);
                return Err(format!("Failed to get camera meta data of id:{camera_id}"));
            }

            let (lens_facing, sensor_orientation) = Self::get_sensor_orientation(camera_metadata);
            info!("lens_facing: {lens_facing} sensor_orientation: {sensor_orientation}");
            self.sensor_orientation = sensor_orientation;
            self.image_formats = Self::get_video_size(camera_metadata).unwrap_or_default();
            info!("image_formats: {:?}", self.image_formats);
            self.read_zoom_and_focus(camera_metadata);
            ACameraMetadata_free(camera_metadata);

            unsafe extern "C" fn on_disconnected(_data: *mut c_void, device: *mut ACameraDevice) {
                info!("Camera(id: {:?}) is disconnected.", get_cstr(ACameraDevice_getId(device)));
            }

            unsafe extern "C" fn on_error(
                _data: *mut c_void,
                device: *mut ACameraDevice,
                error: c_int,
            ) {
                error!("Error(code: {}) on Camera(id: {:?}).", error, get_cstr(ACameraDevice_getId(device)));
            }

            self.device_state_callbacks.onDisconnected = Some(on_disconnected);
            self.device_state_callbacks.onError = Some(on_error);

            let camera_status = ACameraManager_openCamera(
                camera_manager,
                selected_camera_id,
                &mut self.device_state_callbacks,
                &mut self.camera_device,
            );

            ACameraManager_deleteCameraIdList(camera_id_list_raw);
            ACameraManager_delete(camera_manager);

            if camera_status != camera_status_t::ACAMERA_OK {
                self.camera_device = null_mut();
                return Err(format!("Failed to open camera device (reason: {:?})", camera_status));
            }
        }
        self.camera_id = Some(camera_id);
        Ok(())
    }

    fn get_sensor_orientation(camera_metadata: *mut ACameraMetadata) -> (u8, i32) {
        unsafe {
            let mut lens_facing: ACameraMetadata_const_entry = zeroed();
            let mut sensor_orientation: ACameraMetadata_const_entry = zeroed();

            ACameraMetadata_getConstEntry(
                camera_metadata,
                acamera_metadata_tag::ACAMERA_LENS_FACING.0,
                &mut lens_facing,
            );
            ACameraMetadata_getConstEntry(
                camera_metadata,
                acamera_metadata_tag::ACAMERA_SENSOR_ORIENTATION.0,
                &mut sensor_orientation,
            );

            let lens_facing = if lens_facing.count > 0 { *lens_facing.data.u8_ } else { 0 };
            let sensor_orientation = if sensor_orientation.count > 0 {
                *sensor_orientation.data.i32_
            } else {
                0
            };
            (lens_facing, sensor_orientation)
        }
    }

    // 获取相机支持的分辨率
    fn get_video_size(camera_metadata: *mut ACameraMetadata) -> Result<Vec<(i32, i32, i32)>, String> {
        unsafe {
            let mut available_configs: ACameraMetadata_const_entry = zeroed();
            let camera_status = ACameraMetadata_getConstEntry(
                camera_metadata,
                acamera_metadata_tag::ACAMERA_SCALER_AVAILABLE_STREAM_CONFIGURATIONS.0,
                &mut available_configs,
            );
            if camera_status != camera_status_t::ACAMERA_OK {
                return Err(format!(
                    "Failed to get ACameraMetadata_const_entry res={:?}",
                    camera_status
                ));
            }

            // 数据格式: format, width, height, input?, type int32
            let data_i32_list: &[i32] = slice::from_raw_parts(
                available_configs.data.i32_,
                available_configs.count as usize,
            );
            Ok(data_i32_list
                .chunks_exact(4)
                .filter(|c| c[3] == 0 && c[0] == AIMAGE_FORMATS::AIMAGE_FORMAT_YUV_420_888.0 as i32)
                .map(|c| (c[1], c[2], c[0]))
                .collect())
        }
    }

    fn read_zoom_and_focus(&mut self, camera_metadata: *mut ACameraMetadata) {
        unsafe {
            let mut entry: ACameraMetadata_const_entry = zeroed();
            if ACameraMetadata_getConstEntry(
                camera_metadata,
                acamera_metadata_tag::ACAMERA_SCALER_AVAILABLE_MAX_DIGITAL_ZOOM.0,
                &mut entry,
            ) == camera_status_t::ACAMERA_OK
                && entry.count > 0
            {
                self.max_digital_zoom = *entry.data.f;
            }

            let mut entry: ACameraMetadata_const_entry = zeroed();
            if ACameraMetadata_getConstEntry(
                camera_metadata,
                acamera_metadata_tag::ACAMERA_SENSOR_INFO_ACTIVE_ARRAY_SIZE.0,
                &mut entry,
            ) == camera_status_t::ACAMERA_OK
                && entry.count >= 4
            {
                let array = slice::from_raw_parts(entry.data.i32_, 4);
                self.active_array.copy_from_slice(array);
            }

            let mut entry: ACameraMetadata_const_entry = zeroed();
            if ACameraMetadata_getConstEntry(
                camera_metadata,
                acamera_metadata_tag::ACAMERA_CONTROL_AF_AVAILABLE_MODES.0,
                &mut entry,
            ) == camera_status_t::ACAMERA_OK
            {
                let modes = slice::from_raw_parts(entry.data.u8_, entry.count as usize);
                self.af_available = modes.contains(&CONTROL_AF_MODE_AUTO);
            }
        }
        info!(
            "max_digital_zoom: {} active_array: {:?} af_available: {}",
            self.max_digital_zoom, self.active_array, self.af_available
        );
    }

    /// Supported YUV size closest in area to the preferred preview size.
    fn pick_reader_size(&self) -> (u32, u32) {
        let wanted = self.preview_width as i64 * self.preview_height as i64;
        self.image_formats
            .iter()
            .min_by_key(|(w, h, _)| (*w as i64 * *h as i64 - wanted).abs())
            .map(|(w, h, _)| (*w as u32, *h as u32))
            .unwrap_or((self.preview_width, self.preview_height))
    }

    fn create_image_reader(&mut self, width: u32, height: u32) -> Result<(), String> {
        self.delete_image_reader();
        let mut image_reader = null_mut();
        unsafe {
            let res: media_status_t = AImageReader_new(
                width as i32,
                height as i32,
                AIMAGE_FORMATS::AIMAGE_FORMAT_YUV_420_888.0 as i32,
                2,
                &mut image_reader,
            );
            if res != media_status_t::AMEDIA_OK {
                return Err(format!("create Image Reader error {:?}", res));
            }
        }

        let context = Box::new(StreamContext {
            image_reader,
            sensor_orientation: self.sensor_orientation,
            events: Mutex::new(None),
            focus: Mutex::new(FocusTracker::new()),
            fps: Mutex::new((Instant::now(), 0)),
        });

        unsafe extern "C" fn on_image_available(context: *mut c_void, _reader: *mut AImageReader) {
            let context = &*(context as *const StreamContext);
            if let Err(err) = read_latest_image(context) {
                debug!("{err}");
            }
        }

        self.image_listener.context = &*context as *const StreamContext as *mut c_void;
        self.image_listener.onImageAvailable = Some(on_image_available);
        unsafe {
            let res = AImageReader_setImageListener(image_reader, &mut self.image_listener);
            if res != media_status_t::AMEDIA_OK {
                AImageReader_delete(image_reader);
                return Err("set Image Listener error.".into());
            }
        }
        self.context = Some(context);
        Ok(())
    }

    fn delete_image_reader(&mut self) {
        if let Some(context) = self.context.take() {
            unsafe { AImageReader_delete(context.image_reader) };
        }
    }

    fn start_session(&mut self) -> Result<(), String> {
        let context = self.context.as_ref().ok_or("preview surface not bound")?;
        let context_ptr = &**context as *const StreamContext as *mut c_void;
        let image_reader = context.image_reader;
        unsafe {
            let camera_status = ACameraDevice_createCaptureRequest(
                self.camera_device,
                ACameraDevice_request_template::TEMPLATE_PREVIEW,
                &mut self.capture_request,
            );
            if camera_status != camera_status_t::ACAMERA_OK {
                return Err(format!(
                    "Failed to create preview capture request (id: {:?})",
                    self.camera_id
                ));
            }

            if self.af_available {
                ACaptureRequest_setEntry_u8(
                    self.capture_request,
                    acamera_metadata_tag::ACAMERA_CONTROL_AF_MODE.0,
                    1,
                    &CONTROL_AF_MODE_AUTO,
                );
            }
            self.apply_crop_region();

            let mut native_window: *mut ANativeWindow = null_mut();
            let res = AImageReader_getWindow(image_reader, &mut native_window);
            if res != media_status_t::AMEDIA_OK {
                return Err("AImageReader_getWindow error.".into());
            }

            ACameraOutputTarget_create(native_window, &mut self.camera_output_target);
            ACaptureRequest_addTarget(self.capture_request, self.camera_output_target);
            ACaptureSessionOutput_create(native_window, &mut self.session_output);

            let camera_status =
                ACaptureSessionOutputContainer_create(&mut self.capture_session_output_container);
            if camera_status != camera_status_t::ACAMERA_OK {
                return Err(format!(
                    "Failed to create capture session output container (reason: {:?})",
                    camera_status
                ));
            }
            ACaptureSessionOutputContainer_add(
                self.capture_session_output_container,
                self.session_output,
            );

            unsafe extern "C" fn capture_session_on_ready(
                _context: *mut c_void,
                session: *mut ACameraCaptureSession,
            ) {
                info!("Session is ready. {:?}", session);
            }

            unsafe extern "C" fn capture_session_on_active(
                _context: *mut c_void,
                session: *mut ACameraCaptureSession,
            ) {
                info!("Session is activated. {:?}", session);
            }

            unsafe extern "C" fn capture_session_on_closed(
                _context: *mut c_void,
                session: *mut ACameraCaptureSession,
            ) {
                info!("Session is closed. {:?}", session);
            }

            self.capture_session_state_callbacks.onReady = Some(capture_session_on_ready);
            self.capture_session_state_callbacks.onActive = Some(capture_session_on_active);
            self.capture_session_state_callbacks.onClosed = Some(capture_session_on_closed);
            self.capture_session_state_callbacks.context = context_ptr;

            let camera_status = ACameraDevice_createCaptureSession(
                self.camera_device,
                self.capture_session_output_container,
                &self.capture_session_state_callbacks,
                &mut self.capture_session,
            );
            if camera_status != camera_status_t::ACAMERA_OK {
                return Err(format!(
                    "Failed to create capture session (reason: {:?})",
                    camera_status
                ));
            }

            unsafe extern "C" fn on_capture_completed(
                context: *mut c_void,
                _session: *mut ACameraCaptureSession,
                _request: *mut ACaptureRequest,
                result: *const ACameraMetadata,
            ) {
                let context = &*(context as *const StreamContext);
                let mut entry: ACameraMetadata_const_entry = zeroed();
                if ACameraMetadata_getConstEntry(
                    result,
                    acamera_metadata_tag::ACAMERA_CONTROL_AF_STATE.0,
                    &mut entry,
                ) != camera_status_t::ACAMERA_OK
                    || entry.count < 1
                {
                    return;
                }
                let af_state = *entry.data.u8_;
                context.track_focus(|focus| focus.observe(af_state));
            }

            unsafe extern "C" fn on_capture_failed(
                context: *mut c_void,
                _session: *mut ACameraCaptureSession,
                _request: *mut ACaptureRequest,
                _failure: *mut ACameraCaptureFailure,
            ) {
                let context = &*(context as *const StreamContext);
                context.track_focus(FocusTracker::fail);
            }

            self.capture_callbacks.context = context_ptr;
            self.capture_callbacks.onCaptureCompleted = Some(on_capture_completed);
            self.capture_callbacks.onCaptureFailed = Some(on_capture_failed);
        }
        self.set_repeating_request()
    }

    fn set_repeating_request(&mut self) -> Result<(), String> {
        if self.capture_session.is_null() {
            return Err("no capture session".into());
        }
        let camera_status = unsafe {
            ACameraCaptureSession_setRepeatingRequest(
                self.capture_session,
                &mut self.capture_callbacks,
                1,
                &mut self.capture_request,
                null_mut(),
            )
        };
        if camera_status != camera_status_t::ACAMERA_OK {
            return Err(format!(
                "Failed to set repeating request (reason: {:?})",
                camera_status
            ));
        }
        Ok(())
    }

    /// Crop of the active sensor array for the current zoom step.
    fn crop_region(&self) -> [i32; 4] {
        let [x, y, width, height] = self.active_array;
        let ratio = 1.0 + (self.max_digital_zoom - 1.0) * self.zoom_level as f32 / ZOOM_STEPS as f32;
        let crop_w = (width as f32 / ratio) as i32;
        let crop_h = (height as f32 / ratio) as i32;
        [x + (width - crop_w) / 2, y + (height - crop_h) / 2, crop_w, crop_h]
    }

    fn apply_crop_region(&mut self) {
        if self.capture_request.is_null() || self.active_array[2] == 0 {
            return;
        }
        let crop = self.crop_region();
        unsafe {
            ACaptureRequest_setEntry_i32(
                self.capture_request,
                acamera_metadata_tag::ACAMERA_SCALER_CROP_REGION.0,
                4,
                crop.as_ptr(),
            );
        }
    }

    fn close_session(&mut self) {
        unsafe {
            if !self.capture_session.is_null() {
                ACameraCaptureSession_stopRepeating(self.capture_session);
                ACameraCaptureSession_close(self.capture_session);
                self.capture_session = null_mut();
            }

            if !self.capture_request.is_null() {
                ACaptureRequest_free(self.capture_request);
                self.capture_request = null_mut();
            }

            if !self.camera_output_target.is_null() {
                ACameraOutputTarget_free(self.camera_output_target);
                self.camera_output_target = null_mut();
            }

            if !self.session_output.is_null() {
                ACaptureSessionOutput_free(self.session_output);
                self.session_output = null_mut();
            }

            if !self.capture_session_output_container.is_null() {
                ACaptureSessionOutputContainer_free(self.capture_session_output_container);
                self.capture_session_output_container = null_mut();
            }
        }
    }
}

impl CameraDevice for AndroidCamera {
    fn open(&mut self) -> Result<(), CameraError> {
        let granted = check_self_permission(&self.app, CAMERA_PERMISSION)
            .map_err(|err| CameraError::DeviceUnavailable(err.to_string()))?;
        if !granted {
            if let Err(err) = request_camera_permission(&self.app) {
                error!("request camera permission: {err}");
            }
            return Err(CameraError::DeviceUnavailable("没有相机权限".into()));
        }
        self.open_device().map_err(CameraError::DeviceUnavailable)
    }

    fn bind_surface(&mut self, surface: SurfaceSize) -> Result<(), CameraError> {
        if self.camera_device.is_null() {
            return Err(CameraError::SurfaceBind("camera not open".into()));
        }
        let (width, height) = self.pick_reader_size();
        info!(
            "bind {}x{} preview, image reader {width}x{height}",
            surface.width, surface.height
        );
        if self.capture_session.is_null() || self.context.is_none() {
            self.create_image_reader(width, height)
                .map_err(CameraError::SurfaceBind)?;
        }
        Ok(())
    }

    fn start(&mut self, events: Sender<CameraEvent>) -> Result<(), CameraError> {
        if self.camera_device.is_null() {
            return Err(CameraError::DeviceUnavailable("camera not open".into()));
        }
        self.close_session();
        match self.context.as_ref() {
            Some(context) => {
                if let Ok(mut slot) = context.events.lock() {
                    *slot = Some(events);
                }
            }
            None => return Err(CameraError::SurfaceBind("preview surface not bound".into())),
        }
        self.start_session().map_err(|err| {
            self.close_session();
            CameraError::DeviceUnavailable(err)
        })
    }

    fn stop(&mut self) {
        if let Some(context) = self.context.as_ref() {
            if let Ok(mut slot) = context.events.lock() {
                *slot = None;
            }
            if let Ok(mut focus) = context.focus.lock() {
                focus.clear();
            }
        }
        self.close_session();
    }

    fn release(&mut self) {
        self.stop();
        self.delete_image_reader();
        unsafe {
            if !self.camera_device.is_null() {
                let camera_status = ACameraDevice_close(self.camera_device);
                if camera_status != camera_status_t::ACAMERA_OK {
                    error!("Failed to close CameraDevice.");
                }
                self.camera_device = null_mut();
            }
        }
        self.camera_id = None;
        info!("Close Camera");
    }

    fn request_autofocus(&mut self, origin: FocusOrigin) {
        if !self.af_available || self.capture_session.is_null() || self.capture_request.is_null() {
            return;
        }
        if let Some(context) = self.context.as_ref() {
            if let Ok(mut focus) = context.focus.lock() {
                focus.trigger(origin);
            }
        }
        let camera_status = unsafe {
            ACaptureRequest_setEntry_u8(
                self.capture_request,
                acamera_metadata_tag::ACAMERA_CONTROL_AF_TRIGGER.0,
                1,
                &CONTROL_AF_TRIGGER_START,
            );
            let status = ACameraCaptureSession_capture(
                self.capture_session,
                &mut self.capture_callbacks,
                1,
                &mut self.capture_request,
                null_mut(),
            );
            ACaptureRequest_setEntry_u8(
                self.capture_request,
                acamera_metadata_tag::ACAMERA_CONTROL_AF_TRIGGER.0,
                1,
                &CONTROL_AF_TRIGGER_IDLE,
            );
            status
        };
        if camera_status != camera_status_t::ACAMERA_OK {
            warn!("autofocus trigger failed: {:?}", camera_status);
            if let Some(context) = self.context.as_ref() {
                context.track_focus(FocusTracker::fail);
            }
        }
    }

    fn supports_autofocus(&self) -> bool {
        self.af_available
    }

    fn zoom(&self) -> Option<ZoomRange> {
        if self.max_digital_zoom > 1.0 && self.active_array[2] > 0 {
            Some(ZoomRange {
                current: self.zoom_level,
                max: ZOOM_STEPS,
            })
        } else {
            None
        }
    }

    fn set_zoom(&mut self, level: u32) -> Result<(), CameraError> {
        if self.zoom().is_none() {
            return Err(CameraError::Unsupported("zoom"));
        }
        self.zoom_level = level.min(ZOOM_STEPS);
        self.apply_crop_region();
        if !self.capture_session.is_null() {
            self.set_repeating_request()
                .map_err(CameraError::DeviceUnavailable)?;
        }
        Ok(())
    }
}

impl Drop for AndroidCamera {
    fn drop(&mut self) {
        self.release();
    }
}

/// Pulls the newest YUV_420_888 image off the reader and emits the
/// luminance frame plus a colour preview rotated upright.
unsafe fn read_latest_image(context: &StreamContext) -> Result<(), String> {
    let image_reader = context.image_reader;
    let mut image = null_mut();
    let media_status = AImageReader_acquireLatestImage(image_reader, &mut image);
    if media_status != media_status_t::AMEDIA_OK {
        return Err(
            if media_status == media_status_t::AMEDIA_IMGREADER_NO_BUFFER_AVAILABLE {
                "An image reader frame was discarded".to_string()
            } else {
                format!(
                    "Failed to acquire latest image from image reader, error: {:?}.",
                    media_status
                )
            },
        );
    }

    let result = (|| {
        let mut format = 0;
        if AImageReader_getFormat(image_reader, &mut format) != media_status_t::AMEDIA_OK
            || format != AIMAGE_FORMATS::AIMAGE_FORMAT_YUV_420_888.0 as i32
        {
            return Err("format is not AIMAGE_FORMAT_YUV_420_888".to_string());
        }

        let mut width = 0;
        let mut height = 0;
        AImageReader_getWidth(image_reader, &mut width);
        AImageReader_getHeight(image_reader, &mut height);

        let mut y_stride = 0;
        let mut uv_stride = 0;
        let mut y_pixel = null_mut();
        let mut v_pixel = null_mut();
        let mut y_len = 0;
        let mut v_len = 0;
        let mut vu_pixel_stride = 0;

        AImage_getPlaneRowStride(image, 0, &mut y_stride);
        AImage_getPlaneRowStride(image, 2, &mut uv_stride);
        AImage_getPlaneData(image, 0, &mut y_pixel, &mut y_len);
        AImage_getPlaneData(image, 2, &mut v_pixel, &mut v_len);
        AImage_getPlanePixelStride(image, 2, &mut vu_pixel_stride);

        if y_stride <= 0 || y_pixel.is_null() {
            return Err("empty Y plane".to_string());
        }
        let (w, h) = (width as usize, height as usize);
        let y_plane = slice::from_raw_parts(y_pixel, y_len as usize);
        let mut luma = Vec::with_capacity(w * h);
        for row in y_plane.chunks(y_stride as usize).take(h) {
            luma.extend_from_slice(&row[..w.min(row.len())]);
        }
        if luma.len() != w * h {
            return Err(format!("short Y plane: {} of {}", luma.len(), w * h));
        }

        // V 和 U 交错存放(NV21)时，V 平面的指针就是 VU 数据块的开头
        let rgba = if vu_pixel_stride == 2 && !v_pixel.is_null() {
            let vu_plane = slice::from_raw_parts(v_pixel, v_len as usize);
            let mut nv21 = luma.clone();
            for row in vu_plane.chunks(uv_stride.max(1) as usize).take(h / 2) {
                let mut row = row[..w.min(row.len())].to_vec();
                row.resize(w, 128);
                nv21.extend_from_slice(&row);
            }
            nv21.resize(w * h * 3 / 2, 128);
            decode_yuv420sp(&nv21, width, height)
        } else {
            PreviewImage::from_luma(width as u32, height as u32, &luma)
                .map(|p| p.rgba)
                .unwrap_or_default()
        };

        if let Some(rgba) = RgbaImage::from_raw(width as u32, height as u32, rgba) {
            let upright = match context.sensor_orientation {
                90 => rotate90(&rgba),
                180 => rotate180(&rgba),
                270 => rotate270(&rgba),
                _ => rgba,
            };
            context.send(CameraEvent::Preview(PreviewImage::from_rgba(upright)));
        }
        context.send(CameraEvent::Frame(Frame::y800(width as u32, height as u32, luma)));

        // 预览回调帧率正常是 30FPS
        if let Ok(mut fps) = context.fps.lock() {
            fps.1 += 1;
            if fps.0.elapsed().as_millis() > 1000 {
                debug!("预览 FPS:{}", fps.1);
                *fps = (Instant::now(), 0);
            }
        }
        Ok(())
    })();

    AImage_delete(image);
    result
}

pub unsafe fn get_cstr<'a>(s: *const ::std::os::raw::c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}
