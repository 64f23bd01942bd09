//! Hardware-accelerated capture via the Windows Graphics Capture API.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use image::{ImageBuffer, Rgba};

use windows::Foundation::TypedEventHandler;
use windows::Graphics::Capture::{
    Direct3D11CaptureFramePool, GraphicsCaptureItem, GraphicsCaptureSession,
};
use windows::Graphics::DirectX::DirectXPixelFormat;
use windows::Win32::Foundation::POINT;
use windows::Win32::Graphics::Direct3D::D3D_DRIVER_TYPE_HARDWARE;
use windows::Win32::Graphics::Direct3D11::{
    D3D11_CPU_ACCESS_READ, D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_MAP_READ, D3D11_SDK_VERSION,
    D3D11_TEXTURE2D_DESC, D3D11_USAGE_STAGING, D3D11CreateDevice, ID3D11Device,
    ID3D11DeviceContext, ID3D11Resource, ID3D11Texture2D,
};
use windows::Win32::Graphics::Gdi::{
    GetMonitorInfoW, HMONITOR, MONITOR_DEFAULTTOPRIMARY, MONITORINFO, MonitorFromPoint,
};
use windows::Win32::System::WinRT::Direct3D11::CreateDirect3D11DeviceFromDXGIDevice;
use windows::Win32::System::WinRT::Graphics::Capture::IGraphicsCaptureItemInterop;
use windows::Win32::System::WinRT::{RO_INIT_MULTITHREADED, RoInitialize};
use windows::core::Interface;

use super::{BackendKind, CaptureBackend, CaptureFrame};
use crate::geometry::Rect;

/// How long to wait for the first frame before giving up on this backend.
const FRAME_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

static WINRT_INIT: Once = Once::new();

/// Closes the capture session and frame pool on drop so no exit path leaves
/// the capture running before the next backend is attempted.
struct SessionGuard {
    session: GraphicsCaptureSession,
    frame_pool: Direct3D11CaptureFramePool,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let _ = self.session.Close();
        let _ = self.frame_pool.Close();
    }
}

pub struct GraphicsCaptureBackend;

impl GraphicsCaptureBackend {
    pub fn new() -> Self {
        WINRT_INIT.call_once(|| {
            // RPC_E_CHANGED_MODE just means the host initialized COM first.
            let _ = unsafe { RoInitialize(RO_INIT_MULTITHREADED) };
        });
        Self
    }
}

impl CaptureBackend for GraphicsCaptureBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Hardware
    }

    fn attempt(&mut self, target: Rect) -> Result<CaptureFrame> {
        let monitor = unsafe {
            MonitorFromPoint(
                POINT {
                    x: target.x,
                    y: target.y,
                },
                MONITOR_DEFAULTTOPRIMARY,
            )
        };

        let mut monitor_info = MONITORINFO {
            cbSize: std::mem::size_of::<MONITORINFO>() as u32,
            ..Default::default()
        };
        if !unsafe { GetMonitorInfoW(monitor, &mut monitor_info) }.as_bool() {
            return Err(anyhow!("GetMonitorInfoW failed"));
        }

        let (device, context) = create_d3d11_device()?;
        let item = create_capture_item(monitor)?;
        let size = item.Size()?;

        let d3d_device = create_direct3d_device(&device)?;
        let frame_pool = Direct3D11CaptureFramePool::CreateFreeThreaded(
            &d3d_device,
            DirectXPixelFormat::B8G8R8A8UIntNormalized,
            1,
            size,
        )?;
        let session = frame_pool.CreateCaptureSession(&item)?;
        let guard = SessionGuard {
            session,
            frame_pool,
        };

        let frame_arrived = Arc::new(AtomicBool::new(false));
        let frame_arrived_clone = frame_arrived.clone();
        guard.frame_pool.FrameArrived(&TypedEventHandler::new(
            move |_pool: &Option<Direct3D11CaptureFramePool>, _| {
                frame_arrived_clone.store(true, Ordering::SeqCst);
                Ok(())
            },
        ))?;

        guard.session.StartCapture()?;

        let start = Instant::now();
        while !frame_arrived.load(Ordering::SeqCst) {
            if start.elapsed() > FRAME_WAIT_TIMEOUT {
                return Err(anyhow!("timeout waiting for capture frame"));
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        let frame = guard.frame_pool.TryGetNextFrame()?;
        let surface = frame.Surface()?;

        let access: windows::Win32::System::WinRT::Direct3D11::IDirect3DDxgiInterfaceAccess =
            surface.cast()?;
        let texture: ID3D11Texture2D = unsafe { access.GetInterface()? };

        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };

        let staging_desc = D3D11_TEXTURE2D_DESC {
            Width: desc.Width,
            Height: desc.Height,
            MipLevels: 1,
            ArraySize: 1,
            Format: desc.Format,
            SampleDesc: desc.SampleDesc,
            Usage: D3D11_USAGE_STAGING,
            BindFlags: Default::default(),
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags: Default::default(),
        };

        let staging_texture = unsafe {
            let mut staging: Option<ID3D11Texture2D> = None;
            device.CreateTexture2D(&staging_desc, None, Some(&mut staging))?;
            staging.ok_or_else(|| anyhow!("failed to create staging texture"))?
        };

        unsafe {
            context.CopyResource(
                &staging_texture.cast::<ID3D11Resource>()?,
                &texture.cast::<ID3D11Resource>()?,
            );
        }

        let mapped = unsafe {
            let mut mapped = Default::default();
            context.Map(
                &staging_texture.cast::<ID3D11Resource>()?,
                0,
                D3D11_MAP_READ,
                0,
                Some(&mut mapped),
            )?;
            mapped
        };

        // The texture covers the whole monitor; crop to the requested bounds.
        let crop_x = (target.x - monitor_info.rcMonitor.left).max(0) as u32;
        let crop_y = (target.y - monitor_info.rcMonitor.top).max(0) as u32;
        let crop_width = target.width.max(0) as u32;
        let crop_height = target.height.max(0) as u32;

        let mut img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::new(crop_width, crop_height);

        let src_data = unsafe {
            std::slice::from_raw_parts(
                mapped.pData as *const u8,
                (mapped.RowPitch * desc.Height) as usize,
            )
        };
        let row_pitch = mapped.RowPitch as usize;

        for y in 0..crop_height {
            let src_y = (crop_y + y) as usize;
            if src_y >= desc.Height as usize {
                break;
            }
            for x in 0..crop_width {
                let src_x = (crop_x + x) as usize;
                if src_x >= desc.Width as usize {
                    break;
                }
                let offset = src_y * row_pitch + src_x * 4;
                // BGRA -> RGBA
                let b = src_data[offset];
                let g = src_data[offset + 1];
                let r = src_data[offset + 2];
                let a = src_data[offset + 3];
                img.put_pixel(x, y, Rgba([r, g, b, a]));
            }
        }

        unsafe {
            context.Unmap(&staging_texture.cast::<ID3D11Resource>()?, 0);
        }

        drop(guard);

        Ok(CaptureFrame::new(img, BackendKind::Hardware))
    }
}

fn create_d3d11_device() -> Result<(ID3D11Device, ID3D11DeviceContext)> {
    let mut device: Option<ID3D11Device> = None;
    let mut context: Option<ID3D11DeviceContext> = None;

    unsafe {
        D3D11CreateDevice(
            None,
            D3D_DRIVER_TYPE_HARDWARE,
            None,
            D3D11_CREATE_DEVICE_BGRA_SUPPORT,
            None,
            D3D11_SDK_VERSION,
            Some(&mut device),
            None,
            Some(&mut context),
        )?;
    }

    Ok((
        device.ok_or_else(|| anyhow!("failed to create D3D11 device"))?,
        context.ok_or_else(|| anyhow!("failed to create D3D11 context"))?,
    ))
}

fn create_direct3d_device(
    device: &ID3D11Device,
) -> Result<windows::Graphics::DirectX::Direct3D11::IDirect3DDevice> {
    let dxgi_device: windows::Win32::Graphics::Dxgi::IDXGIDevice = device.cast()?;
    let inspectable = unsafe { CreateDirect3D11DeviceFromDXGIDevice(&dxgi_device)? };
    inspectable
        .cast()
        .context("failed to cast to IDirect3DDevice")
}

fn create_capture_item(monitor: HMONITOR) -> Result<GraphicsCaptureItem> {
    let class_name = windows::core::h!("Windows.Graphics.Capture.GraphicsCaptureItem");
    let interop: IGraphicsCaptureItemInterop = unsafe {
        windows::Win32::System::WinRT::RoGetActivationFactory(class_name)
            .context("failed to get IGraphicsCaptureItemInterop")?
    };

    unsafe {
        interop
            .CreateForMonitor(monitor)
            .context("failed to create capture item for monitor")
    }
}
