use std::mem;
use std::ptr;
use std::thread;
use std::time::{Duration, Instant};

use widestring::{U16CString, U16String};
use winapi::shared::{
    minwindef::{DWORD, FALSE, HKEY, MAX_PATH, TRUE},
    ntdef::HANDLE,
    winerror::{ERROR_FILE_NOT_FOUND, ERROR_MORE_DATA, ERROR_SUCCESS},
};
use winapi::um::debugapi::{CheckRemoteDebuggerPresent, IsDebuggerPresent};
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::fileapi::GetDiskFreeSpaceExW;
use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
use winapi::um::processthreadsapi::GetCurrentProcess;
use winapi::um::sysinfoapi::{
    GetSystemInfo, GetTickCount64, GlobalMemoryStatusEx, MEMORYSTATUSEX, SYSTEM_INFO,
};
use winapi::um::tlhelp32::{
    CreateToolhelp32Snapshot, Process32FirstW, Process32NextW, PROCESSENTRY32W,
    TH32CS_SNAPPROCESS,
};
use winapi::um::winnt::{KEY_READ, REG_EXPAND_SZ, REG_MULTI_SZ, REG_SZ, ULARGE_INTEGER};
use winapi::um::winreg::{RegCloseKey, RegOpenKeyExW, RegQueryValueExW, HKEY_LOCAL_MACHINE};

use ntapi::ntpsapi::NtCurrentPeb;

use crate::environment::{Environment, QueryResult};
use crate::error::QueryError;

fn last_error(facility: &'static str) -> QueryError {
    QueryError::Os {
        facility,
        code: unsafe { GetLastError() },
    }
}

fn wide(facility: &'static str, s: &str) -> QueryResult<U16CString> {
    U16CString::from_str(s).map_err(|e| QueryError::Malformed {
        facility,
        detail: e.to_string(),
    })
}

/// Text up to the first NUL.
fn from_wide_nul(buf: &[u16]) -> String {
    let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    U16String::from_vec(buf[..end].to_vec()).to_string_lossy()
}

/// REG_MULTI_SZ entries joined by a space.
fn from_wide_multi(buf: &[u16]) -> String {
    buf.split(|&c| c == 0)
        .filter(|s| !s.is_empty())
        .map(|s| U16String::from_vec(s.to_vec()).to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

struct RegKey(HKEY);

impl RegKey {
    /// `Ok(None)` when the key does not exist.
    fn open_local_machine(path: &str) -> QueryResult<Option<RegKey>> {
        let w_path = wide("RegOpenKeyExW", path)?;
        let mut h_key: HKEY = ptr::null_mut();
        let status = unsafe {
            RegOpenKeyExW(HKEY_LOCAL_MACHINE, w_path.as_ptr(), 0, KEY_READ, &mut h_key)
        } as DWORD;

        match status {
            ERROR_SUCCESS => Ok(Some(RegKey(h_key))),
            ERROR_FILE_NOT_FOUND => Ok(None),
            code => Err(QueryError::Os {
                facility: "RegOpenKeyExW",
                code,
            }),
        }
    }

    fn query_string(&self, value_name: &str) -> QueryResult<Option<String>> {
        let w_name = wide("RegQueryValueExW", value_name)?;
        let mut buf: Vec<u16> = vec![0; 256];

        loop {
            let mut value_type: DWORD = 0;
            let mut size = (buf.len() * mem::size_of::<u16>()) as DWORD;
            let status = unsafe {
                RegQueryValueExW(
                    self.0,
                    w_name.as_ptr(),
                    ptr::null_mut(),
                    &mut value_type,
                    buf.as_mut_ptr() as *mut u8,
                    &mut size,
                )
            } as DWORD;

            match status {
                ERROR_SUCCESS => {
                    let data = &buf[..size as usize / mem::size_of::<u16>()];
                    return match value_type {
                        REG_SZ | REG_EXPAND_SZ => Ok(Some(from_wide_nul(data))),
                        REG_MULTI_SZ => Ok(Some(from_wide_multi(data))),
                        other => Err(QueryError::Malformed {
                            facility: "RegQueryValueExW",
                            detail: format!("value type {} is not a string", other),
                        }),
                    };
                }
                ERROR_MORE_DATA => buf.resize(size as usize / mem::size_of::<u16>() + 1, 0),
                ERROR_FILE_NOT_FOUND => return Ok(None),
                code => {
                    return Err(QueryError::Os {
                        facility: "RegQueryValueExW",
                        code,
                    })
                }
            }
        }
    }
}

impl Drop for RegKey {
    fn drop(&mut self) {
        unsafe { RegCloseKey(self.0) };
    }
}

/// Collect running processes
fn get_processes_names() -> QueryResult<Vec<String>> {
    let h_snapshot: HANDLE = unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) };
    if h_snapshot == INVALID_HANDLE_VALUE {
        return Err(last_error("CreateToolhelp32Snapshot"));
    }

    let mut proc_entry = PROCESSENTRY32W {
        dwSize: mem::size_of::<PROCESSENTRY32W>() as u32,
        cntUsage: 0,
        th32ProcessID: 0,
        th32DefaultHeapID: 0,
        th32ModuleID: 0,
        cntThreads: 0,
        th32ParentProcessID: 0,
        pcPriClassBase: 0,
        dwFlags: 0,
        szExeFile: [0; MAX_PATH],
    };
    unsafe {
        if Process32FirstW(h_snapshot, &mut proc_entry) == FALSE {
            let err = last_error("Process32FirstW");
            CloseHandle(h_snapshot);

            return Err(err);
        }
    }

    let mut processes = vec![from_wide_nul(&proc_entry.szExeFile)];
    while unsafe { Process32NextW(h_snapshot, &mut proc_entry) } == TRUE {
        processes.push(from_wide_nul(&proc_entry.szExeFile));
    }

    unsafe { CloseHandle(h_snapshot) };

    Ok(processes)
}

fn is_debugged_peb() -> bool {
    unsafe { (*NtCurrentPeb()).BeingDebugged == 1 }
}

fn is_remotely_debugged() -> QueryResult<bool> {
    let mut result: i32 = 0;
    if unsafe { CheckRemoteDebuggerPresent(GetCurrentProcess(), &mut result) } != 0 {
        Ok(result != 0)
    } else {
        Err(last_error("CheckRemoteDebuggerPresent"))
    }
}

/// Environment provider built on the Win32 API.
pub struct WindowsEnvironment;

impl WindowsEnvironment {
    pub fn new() -> Self {
        WindowsEnvironment
    }
}

impl Default for WindowsEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for WindowsEnvironment {
    fn uptime_seconds(&self) -> QueryResult<u64> {
        Ok(unsafe { GetTickCount64() } / 1000)
    }

    fn logical_processor_count(&self) -> QueryResult<u32> {
        let mut info: SYSTEM_INFO = unsafe { mem::zeroed() };
        unsafe { GetSystemInfo(&mut info) };

        Ok(info.dwNumberOfProcessors)
    }

    fn total_physical_memory_megabytes(&self) -> QueryResult<u64> {
        let mut status: MEMORYSTATUSEX = unsafe { mem::zeroed() };
        status.dwLength = mem::size_of::<MEMORYSTATUSEX>() as DWORD;
        if unsafe { GlobalMemoryStatusEx(&mut status) } == FALSE {
            return Err(last_error("GlobalMemoryStatusEx"));
        }

        Ok(status.ullTotalPhys / (1024 * 1024))
    }

    /// Size of the drive holding the working directory.
    fn total_disk_capacity_gigabytes(&self) -> QueryResult<u64> {
        let mut available: ULARGE_INTEGER = unsafe { mem::zeroed() };
        let mut total: ULARGE_INTEGER = unsafe { mem::zeroed() };
        let mut free: ULARGE_INTEGER = unsafe { mem::zeroed() };
        if unsafe { GetDiskFreeSpaceExW(ptr::null(), &mut available, &mut total, &mut free) } == FALSE {
            return Err(last_error("GetDiskFreeSpaceExW"));
        }

        Ok(unsafe { *total.QuadPart() } / (1024 * 1024 * 1024))
    }

    fn is_debugger_attached(&self) -> QueryResult<bool> {
        if is_debugged_peb() || unsafe { IsDebuggerPresent() } != 0 {
            return Ok(true);
        }

        is_remotely_debugged()
    }

    fn read_config_string(&self, key_path: &str, value_name: &str) -> QueryResult<Option<String>> {
        let key = match RegKey::open_local_machine(key_path)? {
            Some(key) => key,
            None => return Ok(None),
        };
        if value_name.is_empty() {
            return Ok(Some(String::new()));
        }

        key.query_string(value_name)
    }

    fn list_running_process_names(&self) -> QueryResult<Vec<String>> {
        get_processes_names()
    }

    fn sleep_for(&self, duration: Duration) -> QueryResult<Duration> {
        let start = Instant::now();
        thread::sleep(duration);

        Ok(start.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_process() {
        let processes = get_processes_names().unwrap();
        assert!(processes.iter().any(|p| p == "[System Process]"));
    }

    #[test]
    fn test_fake_process() {
        let processes = get_processes_names().unwrap();
        // should be fake enough
        assert!(!processes.iter().any(|p| p == "m0q09fqucnqijx.exe"));
    }

    #[test]
    fn test_bios_key_exists() {
        let env = WindowsEnvironment::new();
        assert_eq!(
            env.read_config_string("HARDWARE\\DESCRIPTION\\System", ""),
            Ok(Some(String::new()))
        );
    }

    #[test]
    fn test_missing_key() {
        let env = WindowsEnvironment::new();
        assert_eq!(env.read_config_string("SOFTWARE\\m0q09fqucnqijx", ""), Ok(None));
    }

    #[test]
    fn test_is_debugged_peb() {
        assert_eq!(is_debugged_peb(), false);
    }

    #[test]
    fn test_is_remotely_debugged() {
        assert_eq!(is_remotely_debugged(), Ok(false));
    }

    #[test]
    fn test_multi_string() {
        let buf: Vec<u16> = "VBOX - 1\0VirtualBox\0\0".encode_utf16().collect();
        assert_eq!(from_wide_multi(&buf), "VBOX - 1 VirtualBox");
    }
}
