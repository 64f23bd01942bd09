//! Software fallback capture via a GDI bit blit.

use anyhow::{Result, anyhow};
use image::{ImageBuffer, Rgba};

use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BitBlt, CreateCompatibleBitmap, CreateCompatibleDC,
    DIB_RGB_COLORS, DeleteDC, DeleteObject, GetDC, GetDIBits, ReleaseDC, SRCCOPY, SelectObject,
};

use super::{BackendKind, CaptureBackend, CaptureFrame};
use crate::geometry::Rect;

pub struct GdiBackend;

impl CaptureBackend for GdiBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Gdi
    }

    fn attempt(&mut self, target: Rect) -> Result<CaptureFrame> {
        if !target.has_area() {
            return Err(anyhow!("target bounds have no area: {:?}", target));
        }

        unsafe {
            let screen_dc = GetDC(None);
            if screen_dc.is_invalid() {
                return Err(anyhow!("failed to get screen DC"));
            }

            let mem_dc = CreateCompatibleDC(screen_dc);
            let bitmap = CreateCompatibleBitmap(screen_dc, target.width, target.height);
            let old_bitmap = SelectObject(mem_dc, bitmap);

            let blit = BitBlt(
                mem_dc,
                0,
                0,
                target.width,
                target.height,
                screen_dc,
                target.x,
                target.y,
                SRCCOPY,
            );

            let mut bmi = BITMAPINFO {
                bmiHeader: BITMAPINFOHEADER {
                    biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                    biWidth: target.width,
                    biHeight: -target.height, // Top-down DIB
                    biPlanes: 1,
                    biBitCount: 32,
                    biCompression: BI_RGB.0,
                    biSizeImage: 0,
                    biXPelsPerMeter: 0,
                    biYPelsPerMeter: 0,
                    biClrUsed: 0,
                    biClrImportant: 0,
                },
                bmiColors: [Default::default()],
            };

            let buffer_size = (target.width * target.height * 4) as usize;
            let mut data = vec![0u8; buffer_size];

            let rows = if blit.is_ok() {
                GetDIBits(
                    mem_dc,
                    bitmap,
                    0,
                    target.height as u32,
                    Some(data.as_mut_ptr() as *mut _),
                    &mut bmi,
                    DIB_RGB_COLORS,
                )
            } else {
                0
            };

            // GDI objects are released before any error is reported.
            SelectObject(mem_dc, old_bitmap);
            let _ = DeleteObject(bitmap);
            let _ = DeleteDC(mem_dc);
            ReleaseDC(None, screen_dc);

            if let Err(e) = blit {
                return Err(anyhow!("BitBlt failed: {}", e));
            }
            if rows == 0 {
                return Err(anyhow!("GetDIBits returned no scan lines"));
            }

            // BGRA -> RGBA in place.
            for pixel in data.chunks_exact_mut(4) {
                pixel.swap(0, 2);
                pixel[3] = 255;
            }

            let img = ImageBuffer::from_raw(target.width as u32, target.height as u32, data)
                .ok_or_else(|| anyhow!("GDI buffer size mismatch"))?;

            Ok(CaptureFrame::new(img, BackendKind::Gdi))
        }
    }
}
