use log::{debug, warn};

use crate::frame::Frame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbology {
    QrCode,
}

/// One decoded barcode payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub data: String,
    pub symbology: Symbology,
}

impl Symbol {
    pub fn new(data: impl Into<String>, symbology: Symbology) -> Self {
        Self {
            data: data.into(),
            symbology,
        }
    }
}

/// External barcode decoder. The number of symbols found is the length of
/// the returned list; the order is whatever the implementation produces.
pub trait Decoder {
    fn scan_image(&mut self, frame: &Frame) -> Vec<Symbol>;
}

impl<D: Decoder + ?Sized> Decoder for Box<D> {
    fn scan_image(&mut self, frame: &Frame) -> Vec<Symbol> {
        (**self).scan_image(frame)
    }
}

/// QR decoder backed by `rqrr`.
#[derive(Debug, Default)]
pub struct RqrrDecoder;

impl RqrrDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for RqrrDecoder {
    fn scan_image(&mut self, frame: &Frame) -> Vec<Symbol> {
        let luma = match frame.luminance() {
            Some(luma) => luma,
            None => {
                warn!(
                    "frame buffer too short: {} bytes for {}x{} {:?}",
                    frame.data.len(),
                    frame.width,
                    frame.height,
                    frame.format
                );
                return vec![];
            }
        };
        let width = frame.width as usize;
        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width, frame.height as usize, |x, y| {
                luma[y * width + x]
            });
        prepared
            .detect_grids()
            .into_iter()
            .filter_map(|grid| match grid.decode() {
                Ok((_meta, content)) => Some(Symbol::new(content, Symbology::QrCode)),
                Err(err) => {
                    debug!("qr grid not decodable: {err:?}");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::PixelFormat;

    #[test]
    fn blank_frame_has_no_symbols() {
        let mut decoder = RqrrDecoder::new();
        let frame = Frame::y800(64, 64, vec![255; 64 * 64]);
        assert!(decoder.scan_image(&frame).is_empty());
    }

    /// Renders `text` as a QR code four pixels per module inside a frame
    /// that is wider than tall, with the code off centre.
    fn qr_frame(text: &str) -> Frame {
        let code = qrcode::QrCode::new(text.as_bytes()).unwrap();
        let modules = code.width();
        let colors = code.to_colors();
        let (scale, left, top) = (4usize, 60usize, 16usize);
        let side = modules * scale;
        let (width, height) = (side + left + 20, side + top * 2);
        let mut luma = vec![255u8; width * height];
        for (i, color) in colors.iter().enumerate() {
            if *color != qrcode::Color::Dark {
                continue;
            }
            let (mx, my) = (i % modules, i / modules);
            for dy in 0..scale {
                for dx in 0..scale {
                    let x = left + mx * scale + dx;
                    let y = top + my * scale + dy;
                    luma[y * width + x] = 0;
                }
            }
        }
        Frame::y800(width as u32, height as u32, luma)
    }

    #[test]
    fn decodes_qr_code_in_wide_frame() {
        let mut decoder = RqrrDecoder::new();
        let frame = qr_frame("https://example.com/item/42");
        assert_ne!(frame.width, frame.height);
        assert_eq!(
            decoder.scan_image(&frame),
            vec![Symbol::new("https://example.com/item/42", Symbology::QrCode)]
        );
    }

    #[test]
    fn decodes_qr_code_from_rgba_frame() {
        let mut decoder = RqrrDecoder::new();
        let gray = qr_frame("ABC123");
        let rgba = gray.data.iter().flat_map(|&v| [v, v, v, 255]).collect();
        let frame = Frame::new(gray.width, gray.height, PixelFormat::Rgba8, rgba);
        let symbols = decoder.scan_image(&frame);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].data, "ABC123");
    }

    #[test]
    fn truncated_frame_is_rejected_quietly() {
        let mut decoder = RqrrDecoder::new();
        let frame = Frame::new(64, 64, PixelFormat::Rgba8, vec![0; 64]);
        assert!(decoder.scan_image(&frame).is_empty());
    }

    #[test]
    fn boxed_decoder_forwards() {
        struct Always;
        impl Decoder for Always {
            fn scan_image(&mut self, _frame: &Frame) -> Vec<Symbol> {
                vec![Symbol::new("x", Symbology::QrCode)]
            }
        }
        let mut decoder: Box<dyn Decoder> = Box::new(Always);
        assert_eq!(decoder.scan_image(&Frame::y800(1, 1, vec![0])).len(), 1);
    }
}
