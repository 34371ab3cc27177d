use thiserror::Error;

/// Failures reported by a [`CameraDevice`](crate::camera::CameraDevice).
///
/// None of these reach the user. The session controller logs them and the
/// scanner stays on screen in whatever state the device left it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("camera device unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("failed to bind preview surface: {0}")]
    SurfaceBind(String),
    #[error("operation not supported by this camera: {0}")]
    Unsupported(&'static str),
}
