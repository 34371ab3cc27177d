#[cfg(target_os = "android")]
mod android;

pub mod app;
pub mod autofocus;
pub mod camera;
pub mod config;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod gesture;
pub mod navigation;
pub mod scanner;

#[cfg(target_os = "android")]
#[no_mangle]
fn android_main(app: slint::android::AndroidApp) {
    use std::rc::Rc;

    use log::{error, LevelFilter};

    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(LevelFilter::Info)
            .with_tag("barcode_scanner"),
    );

    if let Err(err) = slint::android::init(app.clone()) {
        error!("slint init failed: {err}");
        return;
    }

    let camera_app = app.clone();
    let platform = app::Platform {
        open_camera: Box::new(move |config: &config::ScannerConfig| -> Box<dyn camera::CameraDevice> {
            Box::new(camera::AndroidCamera::new(
                camera_app.clone(),
                config.camera_index,
                config.preview_width,
                config.preview_height,
            ))
        }),
        vibrate: Rc::new(move |duration: std::time::Duration| {
            if let Err(err) = android::vibrate(&app, duration) {
                error!("vibrate failed: {err}");
            }
        }),
    };

    if let Err(err) = app::run(config::ScannerConfig::default(), platform) {
        error!("app exited with error: {err}");
    }
}
