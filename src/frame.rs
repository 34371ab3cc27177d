use std::borrow::Cow;

use image::{buffer::ConvertBuffer, GrayImage, RgbaImage};

/// Layout tag carried by every frame handed to the decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit luminance, one byte per pixel ("Y800" / GREY).
    Y800,
    /// 8-bit RGBA, four bytes per pixel.
    Rgba8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Y800 => 1,
            PixelFormat::Rgba8 => 4,
        }
    }
}

/// One raw preview frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            data,
        }
    }

    pub fn y800(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self::new(width, height, PixelFormat::Y800, data)
    }

    /// Bytes the declared size and format need.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// Luminance plane of the frame, or `None` when the buffer is shorter
    /// than the declared size.
    pub fn luminance(&self) -> Option<Cow<'_, [u8]>> {
        if self.data.len() < self.expected_len() {
            return None;
        }
        match self.format {
            PixelFormat::Y800 => Some(Cow::Borrowed(&self.data[..self.expected_len()])),
            PixelFormat::Rgba8 => {
                let rgba = RgbaImage::from_raw(
                    self.width,
                    self.height,
                    self.data[..self.expected_len()].to_vec(),
                )?;
                let gray: GrayImage = rgba.convert();
                Some(Cow::Owned(gray.into_raw()))
            }
        }
    }
}

/// RGBA image shown in the preview box. Kept free of UI types so the
/// scanner core can run without a window.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl PreviewImage {
    pub fn from_rgba(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            rgba: image.into_raw(),
        }
    }

    /// Gray preview built from a luminance plane.
    pub fn from_luma(width: u32, height: u32, luma: &[u8]) -> Option<Self> {
        let gray = GrayImage::from_raw(width, height, luma.to_vec())?;
        let rgba: RgbaImage = gray.convert();
        Some(Self::from_rgba(rgba))
    }
}

/// android: YUV420SP(NV21) 转 rgba
pub fn decode_yuv420sp(data: &[u8], width: i32, height: i32) -> Vec<u8> {
    let frame_size = width * height;
    let mut yp = 0;
    let mut rgba_data = Vec::with_capacity(frame_size as usize * 4);
    for j in 0..height {
        let (mut uvp, mut u, mut v) = ((frame_size + (j >> 1) * width) as usize, 0, 0);
        for i in 0..width {
            let y = ((0xff & data[yp] as i32) - 16).max(0);
            if i & 1 == 0 {
                v = (0xff & data[uvp] as i32) - 128;
                uvp += 1;
                u = (0xff & data[uvp] as i32) - 128;
                uvp += 1;
            }

            let y1192 = 1192 * y;
            let r = (y1192 + 1634 * v).clamp(0, 262143);
            let g = (y1192 - 833 * v - 400 * u).clamp(0, 262143);
            let b = (y1192 + 2066 * u).clamp(0, 262143);

            rgba_data.extend_from_slice(&[
                ((r >> 10) & 0xff) as u8,
                ((g >> 10) & 0xff) as u8,
                ((b >> 10) & 0xff) as u8,
                255,
            ]);
            yp += 1;
        }
    }

    rgba_data
}
