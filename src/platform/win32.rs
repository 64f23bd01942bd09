//! Win32 queries for displays, windows, and processes.

use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;

use anyhow::{anyhow, Result};

use windows::Win32::Foundation::{BOOL, CloseHandle, HWND, LPARAM, RECT, TRUE};
use windows::Win32::Graphics::Gdi::{
    EnumDisplayMonitors, GetMonitorInfoW, HDC, HMONITOR, MONITORINFO, MONITORINFOF_PRIMARY,
};
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW, TH32CS_SNAPPROCESS,
};
use windows::Win32::System::Threading::{
    OpenProcess, PROCESS_NAME_WIN32, PROCESS_QUERY_LIMITED_INFORMATION, QueryFullProcessImageNameW,
};
use windows::Win32::UI::HiDpi::{GetDpiForMonitor, MDT_EFFECTIVE_DPI};
use windows::Win32::UI::WindowsAndMessaging::{
    EnumWindows, GW_OWNER, GetWindow, GetWindowRect, GetWindowTextLengthW, GetWindowTextW,
    GetWindowThreadProcessId, IsWindowVisible,
};

use super::{ProcessEntry, RawWindow};
use crate::display::DisplayInfo;
use crate::geometry::Rect;

const BASELINE_DPI: f64 = 96.0;

fn wide_to_string(buf: &[u16]) -> String {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    OsString::from_wide(&buf[..len]).to_string_lossy().to_string()
}

fn rect_from_win32(r: &RECT) -> Rect {
    Rect::new(r.left, r.top, r.right - r.left, r.bottom - r.top)
}

/// Enumerates attached monitors with bounds, DPI scale, and the primary flag.
pub fn list_displays() -> Result<Vec<DisplayInfo>> {
    unsafe extern "system" fn monitor_callback(
        hmonitor: HMONITOR,
        _hdc: HDC,
        _rect: *mut RECT,
        lparam: LPARAM,
    ) -> BOOL {
        unsafe {
            let monitors = &mut *(lparam.0 as *mut Vec<HMONITOR>);
            monitors.push(hmonitor);
            TRUE
        }
    }

    let mut monitors: Vec<HMONITOR> = Vec::new();
    let ok = unsafe {
        EnumDisplayMonitors(
            None,
            None,
            Some(monitor_callback),
            LPARAM(&mut monitors as *mut _ as isize),
        )
    };
    if !ok.as_bool() {
        return Err(anyhow!("EnumDisplayMonitors failed"));
    }

    let mut displays = Vec::with_capacity(monitors.len());
    for (index, hmonitor) in monitors.into_iter().enumerate() {
        let mut info = MONITORINFO {
            cbSize: std::mem::size_of::<MONITORINFO>() as u32,
            ..Default::default()
        };
        if !unsafe { GetMonitorInfoW(hmonitor, &mut info) }.as_bool() {
            continue;
        }

        // DPI query failing is not worth losing the monitor over.
        let mut dpi_x: u32 = 0;
        let mut dpi_y: u32 = 0;
        let scale_factor =
            match unsafe { GetDpiForMonitor(hmonitor, MDT_EFFECTIVE_DPI, &mut dpi_x, &mut dpi_y) } {
                Ok(()) if dpi_x > 0 => dpi_x as f64 / BASELINE_DPI,
                _ => 1.0,
            };

        displays.push(DisplayInfo {
            id: index as u32,
            bounds: rect_from_win32(&info.rcMonitor),
            scale_factor: scale_factor.max(1.0),
            is_primary: info.dwFlags & MONITORINFOF_PRIMARY != 0,
        });
    }

    if displays.is_empty() {
        return Err(anyhow!("no monitors reported"));
    }
    Ok(displays)
}

/// Resolves the executable name (file name only) of a process.
fn process_name_for_pid(pid: u32) -> Option<String> {
    let handle = unsafe { OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid) }.ok()?;

    let mut name_buf: Vec<u16> = vec![0; 1024];
    let mut len = name_buf.len() as u32;
    let result = unsafe {
        QueryFullProcessImageNameW(
            handle,
            PROCESS_NAME_WIN32,
            windows::core::PWSTR(name_buf.as_mut_ptr()),
            &mut len,
        )
    };
    let _ = unsafe { CloseHandle(handle) };

    if result.is_err() || len == 0 {
        return None;
    }

    let full_path = wide_to_string(&name_buf[..len as usize]);
    Some(
        full_path
            .rsplit('\\')
            .next()
            .unwrap_or(&full_path)
            .to_string(),
    )
}

fn window_title(hwnd: HWND) -> String {
    let title_len = unsafe { GetWindowTextLengthW(hwnd) };
    if title_len <= 0 {
        return String::new();
    }
    let mut title_buf: Vec<u16> = vec![0; (title_len + 1) as usize];
    unsafe { GetWindowTextW(hwnd, &mut title_buf) };
    wide_to_string(&title_buf)
}

/// Enumerates all currently visible top-level windows with their titles,
/// owning process names, and bounding rectangles.
pub fn list_windows() -> Result<Vec<RawWindow>> {
    unsafe extern "system" fn enum_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
        unsafe {
            let windows = &mut *(lparam.0 as *mut Vec<RawWindow>);

            if !IsWindowVisible(hwnd).as_bool() {
                return TRUE;
            }

            let mut process_id: u32 = 0;
            GetWindowThreadProcessId(hwnd, Some(&mut process_id));
            if process_id == 0 {
                return TRUE;
            }

            let Some(process_name) = process_name_for_pid(process_id) else {
                return TRUE;
            };

            let mut rect = RECT::default();
            if GetWindowRect(hwnd, &mut rect).is_err() {
                return TRUE;
            }

            let has_parent = GetWindow(hwnd, GW_OWNER)
                .map(|owner| !owner.is_invalid())
                .unwrap_or(false);

            windows.push(RawWindow {
                id: hwnd.0 as usize as u64,
                title: window_title(hwnd),
                process_name,
                bounds: rect_from_win32(&rect),
                has_parent,
            });

            TRUE
        }
    }

    let mut windows: Vec<RawWindow> = Vec::new();
    unsafe {
        EnumWindows(
            Some(enum_callback),
            LPARAM(&mut windows as *mut _ as isize),
        )?;
    }
    Ok(windows)
}

/// Snapshots the OS process list (names and pids, no window API involved).
pub fn list_processes() -> Result<Vec<ProcessEntry>> {
    let snapshot = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) }?;

    let mut entry = PROCESSENTRY32W {
        dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };

    let mut processes = Vec::new();
    if unsafe { Process32FirstW(snapshot, &mut entry) }.is_ok() {
        loop {
            processes.push(ProcessEntry {
                pid: entry.th32ProcessID,
                name: wide_to_string(&entry.szExeFile),
            });
            if unsafe { Process32NextW(snapshot, &mut entry) }.is_err() {
                break;
            }
        }
    }

    let _ = unsafe { CloseHandle(snapshot) };
    Ok(processes)
}

/// Best-effort title lookup for a process: the first visible titled window it
/// owns, or `None` when the window query yields nothing.
pub fn title_for_pid(pid: u32) -> Option<String> {
    struct TitleSearch {
        pid: u32,
        title: Option<String>,
    }

    unsafe extern "system" fn title_callback(hwnd: HWND, lparam: LPARAM) -> BOOL {
        unsafe {
            let search = &mut *(lparam.0 as *mut TitleSearch);

            if !IsWindowVisible(hwnd).as_bool() {
                return TRUE;
            }

            let mut process_id: u32 = 0;
            GetWindowThreadProcessId(hwnd, Some(&mut process_id));
            if process_id != search.pid {
                return TRUE;
            }

            let title = window_title(hwnd);
            if title.is_empty() {
                return TRUE;
            }

            search.title = Some(title);
            BOOL(0) // Stop enumeration.
        }
    }

    let mut search = TitleSearch { pid, title: None };
    unsafe {
        // EnumWindows reports failure when the callback stops it early, which
        // is the found case, not an error.
        let _ = EnumWindows(
            Some(title_callback),
            LPARAM(&mut search as *mut _ as isize),
        );
    }
    search.title
}
