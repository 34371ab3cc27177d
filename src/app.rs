use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    sync::mpsc::{channel, Sender},
    time::Duration,
};

use anyhow::Result;
use log::{debug, info};
use slint::{Image, Rgba8Pixel, SharedPixelBuffer, Timer, TimerMode};

use crate::camera::{CameraDevice, CameraEvent, SurfaceSize};
use crate::config::ScannerConfig;
use crate::decoder::RqrrDecoder;
use crate::frame::PreviewImage;
use crate::gesture::{pinch_from_scroll, Point, TouchAction, TouchEvent};
use crate::navigation::Screen;
use crate::scanner::{EventQueue, ScannerEvent, ScannerHost, ScannerScreen};

slint::slint! {
    import { Button, VerticalBox, HorizontalBox } from "std-widgets.slint";
    export component MainWindow inherits Window {
        title: "Barcode Scanner";
        preferred-width: 480px;
        preferred-height: 800px;

        in property <bool> scanning;
        in property <length> preview-margin: 64px;
        in-out property <image> camera-texture;
        in property <bool> result-visible;
        in property <string> result-text;
        in property <string> toast-text;

        callback start-scan();
        callback back();
        callback result-ok();
        callback preview-tapped(length, length);
        callback preview-zoom(length, length, length);

        forward-focus: keys;

        keys := FocusScope {
            width: 100%;
            height: 100%;
            key-pressed(event) => {
                if (event.text == Key.Escape) {
                    root.back();
                    return accept;
                }
                return reject;
            }

            if !root.scanning : VerticalBox {
                alignment: center;
                HorizontalBox {
                    alignment: center;
                    Button {
                        text: "Scan barcode";
                        clicked => {
                            root.start-scan();
                            keys.focus();
                        }
                    }
                }
            }

            if root.scanning : Rectangle {
                width: 100%;
                height: 100%;
                background: black;

                Rectangle {
                    width: max(0px, min(parent.width, parent.height) - 2 * root.preview-margin);
                    height: self.width;
                    x: (parent.width - self.width) / 2;
                    y: (parent.height - self.height) / 2;
                    Image {
                        width: 100%;
                        height: 100%;
                        source: root.camera-texture;
                        image-fit: cover;
                    }
                    TouchArea {
                        pointer-event(event) => {
                            if (event.kind == PointerEventKind.up) {
                                root.preview-tapped(self.mouse-x, self.mouse-y);
                            }
                        }
                        scroll-event(event) => {
                            if (event.modifiers.control) {
                                root.preview-zoom(self.mouse-x, self.mouse-y, event.delta-y);
                                return accept;
                            }
                            return reject;
                        }
                    }
                }

                Button {
                    x: 8px;
                    y: 8px;
                    text: "Back";
                    clicked => { root.back(); }
                }
            }

            if root.result-visible : Rectangle {
                width: 100%;
                height: 100%;
                background: #00000080;
                TouchArea {}
                Rectangle {
                    width: min(parent.width - 48px, 360px);
                    height: dialog.preferred-height;
                    background: white;
                    border-radius: 4px;
                    dialog := VerticalBox {
                        Text {
                            text: "Result";
                            font-size: 20px;
                            color: black;
                        }
                        Text {
                            text: root.result-text;
                            wrap: word-wrap;
                            color: black;
                        }
                        HorizontalBox {
                            alignment: end;
                            Button {
                                text: "OK";
                                clicked => { root.result-ok(); }
                            }
                        }
                    }
                }
            }

            if root.toast-text != "" : Rectangle {
                y: parent.height - self.height - 48px;
                width: toast.preferred-width + 32px;
                height: toast.preferred-height + 16px;
                background: #333333e0;
                border-radius: self.height / 2;
                toast := Text {
                    text: root.toast-text;
                    color: white;
                    horizontal-alignment: center;
                    vertical-alignment: center;
                }
            }
        }
    }
}

/// Platform services the UI cannot provide itself.
pub struct Platform {
    pub open_camera: Box<dyn Fn(&ScannerConfig) -> Box<dyn CameraDevice>>,
    pub vibrate: Rc<dyn Fn(Duration)>,
}

struct AppHost {
    window: slint::Weak<MainWindow>,
    scheduled: Sender<ScannerEvent>,
    vibrate: Rc<dyn Fn(Duration)>,
    toast_duration: Duration,
}

impl ScannerHost for AppHost {
    fn show_preview(&mut self, image: PreviewImage) {
        if let Some(window) = self.window.upgrade() {
            let buffer = SharedPixelBuffer::<Rgba8Pixel>::clone_from_slice(
                &image.rgba,
                image.width,
                image.height,
            );
            window.set_camera_texture(Image::from_rgba8(buffer));
        }
    }

    fn show_result(&mut self, text: &str) {
        if let Some(window) = self.window.upgrade() {
            window.set_result_text(text.into());
            window.set_result_visible(true);
        }
    }

    fn hide_result(&mut self) {
        if let Some(window) = self.window.upgrade() {
            window.set_result_visible(false);
        }
    }

    fn show_toast(&mut self, text: &str) {
        if let Some(window) = self.window.upgrade() {
            window.set_toast_text(text.into());
        }
        let window = self.window.clone();
        Timer::single_shot(self.toast_duration, move || {
            if let Some(window) = window.upgrade() {
                window.set_toast_text("".into());
            }
        });
    }

    fn vibrate(&mut self, duration: Duration) {
        (self.vibrate)(duration);
    }

    fn schedule(&mut self, delay: Duration, event: ScannerEvent) {
        let scheduled = self.scheduled.clone();
        Timer::single_shot(delay, move || {
            let _ = scheduled.send(event);
        });
    }
}

type Scanner = ScannerScreen<Box<dyn CameraDevice>, RqrrDecoder, AppHost>;

pub fn run(config: ScannerConfig, platform: Platform) -> Result<()> {
    let app = MainWindow::new()?;
    app.set_preview_margin(config.preview_margin as f32);

    let (camera_sender, camera_receiver) = channel::<CameraEvent>();
    let (event_sender, event_receiver) = channel::<ScannerEvent>();
    let queue = Rc::new(EventQueue::new(event_receiver, camera_receiver));
    let scanner: Rc<RefCell<Option<Scanner>>> = Rc::new(RefCell::new(None));
    let screen = Rc::new(Cell::new(Screen::Start));
    let platform = Rc::new(platform);

    // 10ms 轮询相机和定时器事件
    let scanner_clone = scanner.clone();
    let queue_clone = queue.clone();
    let timer = Timer::default();
    timer.start(TimerMode::Repeated, Duration::from_millis(10), move || {
        let events = queue_clone.take_ready();
        if let Some(scanner) = scanner_clone.borrow_mut().as_mut() {
            for event in events {
                scanner.handle(event);
            }
        }
    });

    let app_weak = app.as_weak();
    let scanner_clone = scanner.clone();
    let screen_clone = screen.clone();
    let config_clone = config.clone();
    app.on_start_scan(move || {
        let window = match app_weak.upgrade() {
            Some(window) => window,
            None => return,
        };
        if screen_clone.get() != Screen::Start {
            return;
        }
        screen_clone.set(screen_clone.get().start_scan());
        window.set_scanning(true);

        let stale = queue.discard();
        if stale > 0 {
            debug!("dropped {stale} events of the previous scan");
        }

        let host = AppHost {
            window: app_weak.clone(),
            scheduled: event_sender.clone(),
            vibrate: platform.vibrate.clone(),
            toast_duration: config_clone.toast_duration,
        };
        let mut screen = ScannerScreen::new(
            (platform.open_camera)(&config_clone),
            RqrrDecoder::new(),
            host,
            config_clone.clone(),
            camera_sender.clone(),
        );
        screen.enter();

        let size = window.window().size();
        let scale = window.window().scale_factor();
        let side = config_clone.preview_box_side(size.width.min(size.height), scale);
        let surface = SurfaceSize::new(side, side);
        screen.handle(ScannerEvent::SurfaceCreated(surface));
        screen.handle(ScannerEvent::SurfaceChanged(surface));
        *scanner_clone.borrow_mut() = Some(screen);
    });

    let app_weak = app.as_weak();
    let scanner_clone = scanner.clone();
    let screen_clone = screen.clone();
    app.on_back(move || {
        if screen_clone.get() == Screen::Start {
            info!("back on start screen, quitting");
            let _ = slint::quit_event_loop();
            return;
        }
        let mut slot = scanner_clone.borrow_mut();
        let close = slot.as_mut().map(|scanner| scanner.leave()).unwrap_or(true);
        if !close {
            return;
        }
        if let Some(mut scanner) = slot.take() {
            scanner.handle(ScannerEvent::SurfaceDestroyed);
        }
        screen_clone.set(screen_clone.get().back());
        if let Some(window) = app_weak.upgrade() {
            window.set_scanning(false);
            window.set_result_visible(false);
            window.set_camera_texture(Image::default());
        }
    });

    let scanner_clone = scanner.clone();
    app.on_result_ok(move || {
        if let Some(scanner) = scanner_clone.borrow_mut().as_mut() {
            scanner.handle(ScannerEvent::ResultDismissed);
        }
    });

    let scanner_clone = scanner.clone();
    app.on_preview_tapped(move |x, y| {
        if let Some(scanner) = scanner_clone.borrow_mut().as_mut() {
            let touch = TouchEvent::new(TouchAction::Up, vec![Point::new(x, y)]);
            scanner.handle(ScannerEvent::Touch(touch));
        }
    });

    let scanner_clone = scanner.clone();
    let zoom_step = config.zoom_threshold * 2.0 + 1.0;
    app.on_preview_zoom(move |x, y, delta_y| {
        if delta_y == 0.0 {
            return;
        }
        if let Some(scanner) = scanner_clone.borrow_mut().as_mut() {
            // one wheel notch is one pinch step whatever the platform's scroll unit
            for touch in pinch_from_scroll(Point::new(x, y), delta_y.signum() * zoom_step) {
                scanner.handle(ScannerEvent::Touch(touch));
            }
        }
    });

    app.run()?;
    scanner.borrow_mut().take();
    Ok(())
}
