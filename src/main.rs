#[cfg(not(target_os = "android"))]
fn main() -> anyhow::Result<()> {
    use std::{path::PathBuf, rc::Rc, time::Duration};

    use clap::Parser;
    use log::info;
    use slint_barcode_scanner::{
        app::{self, Platform},
        camera::{desktop_camera, CameraDevice},
        config::ScannerConfig,
    };

    #[derive(Parser)]
    #[command(author, version, about = "Scan barcodes from a camera preview")]
    struct Cli {
        /// Camera index
        #[arg(long, default_value_t = 0)]
        camera: usize,

        /// Finger distance change, in pixels, for one zoom step
        #[arg(long)]
        zoom_threshold: Option<f32>,

        /// Delay between autofocus cycles in milliseconds
        #[arg(long)]
        autofocus_ms: Option<u64>,

        /// Images to replay as camera frames instead of opening a webcam
        #[arg(long, num_args = 1..)]
        replay: Vec<PathBuf>,
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = ScannerConfig {
        camera_index: cli.camera,
        ..ScannerConfig::default()
    };
    if let Some(threshold) = cli.zoom_threshold {
        config.zoom_threshold = threshold;
    }
    if let Some(ms) = cli.autofocus_ms {
        config.autofocus_interval = Duration::from_millis(ms);
    }

    let replay = cli.replay;
    let platform = Platform {
        open_camera: Box::new(move |config: &ScannerConfig| -> Box<dyn CameraDevice> {
            desktop_camera(config.camera_index, &replay)
        }),
        vibrate: Rc::new(|duration: Duration| info!("vibrate {}ms", duration.as_millis())),
    };

    app::run(config, platform)
}

#[cfg(target_os = "android")]
fn main() {}
