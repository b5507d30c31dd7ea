#![cfg_attr(
    not(any(target_os = "windows", target_os = "linux")),
    allow(dead_code, unused_variables, unused_imports)
)]

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::process::EXCLUDED_WORDS;
use crate::error::{AttachError, ReadError};
use crate::process::provider::ProcessInfo;
use crate::process::reader::{PointerWidth, ReadMemory, ReadResult, check_read};
use crate::process::region::MemoryRegion;

#[cfg(target_os = "windows")]
use std::ffi::OsString;
#[cfg(target_os = "windows")]
use std::os::windows::ffi::OsStringExt;
#[cfg(target_os = "windows")]
use tracing::warn;
#[cfg(target_os = "windows")]
use windows::Win32::Foundation::{
    BOOL, CloseHandle, ERROR_ACCESS_DENIED, ERROR_INVALID_PARAMETER, ERROR_NOACCESS,
    ERROR_PARTIAL_COPY, HANDLE, HMODULE,
};
#[cfg(target_os = "windows")]
use windows::Win32::System::Diagnostics::Debug::ReadProcessMemory;
#[cfg(target_os = "windows")]
use windows::Win32::System::Diagnostics::ToolHelp::{
    CreateToolhelp32Snapshot, PROCESSENTRY32W, Process32FirstW, Process32NextW, TH32CS_SNAPPROCESS,
};
#[cfg(target_os = "windows")]
use windows::Win32::System::ProcessStatus::{
    EnumProcessModulesEx, GetModuleInformation, LIST_MODULES_ALL, MODULEINFO,
};
#[cfg(target_os = "windows")]
use windows::Win32::System::Threading::{
    GetExitCodeProcess, IsWow64Process, OpenProcess, PROCESS_NAME_WIN32,
    PROCESS_QUERY_INFORMATION, PROCESS_VM_READ, QueryFullProcessImageNameW,
};
#[cfg(target_os = "windows")]
use windows::core::PWSTR;

#[cfg(target_os = "linux")]
use nix::errno::Errno;
#[cfg(target_os = "linux")]
use nix::sys::uio::{RemoteIoVec, process_vm_readv};
#[cfg(target_os = "linux")]
use nix::unistd::Pid;
#[cfg(target_os = "linux")]
use std::io::IoSliceMut;

/// Immutable description of an attached game process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessTarget {
    pub pid: u32,
    pub name: String,
    pub pointer_width: PointerWidth,
    /// Base address of the main module.
    pub base_address: u64,
    pub module_size: u64,
    /// Directory the game runs from, used to resolve relative song paths.
    pub executable_dir: Option<PathBuf>,
}

/// How to find the process to attach to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessSelector {
    /// Executable name, skipping processes whose command line contains any
    /// of the excluded words.
    Name { name: String, excluded: Vec<String> },
    Pid(u32),
}

impl ProcessSelector {
    pub fn name(name: impl Into<String>) -> Self {
        ProcessSelector::Name {
            name: name.into(),
            excluded: EXCLUDED_WORDS.iter().map(|w| w.to_string()).collect(),
        }
    }
}

impl fmt::Display for ProcessSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessSelector::Name { name, .. } => write!(f, "{}", name),
            ProcessSelector::Pid(pid) => write!(f, "PID {}", pid),
        }
    }
}

/// Read-only handle to the target process.
///
/// The OS handle is released when this value is dropped. Once the process is
/// seen to have exited every further read fails with
/// [`ReadError::ProcessExited`].
pub struct ProcessHandle {
    #[cfg(target_os = "windows")]
    handle: HANDLE,
    target: ProcessTarget,
    exited: AtomicBool,
}

// SAFETY: the raw process HANDLE is only used for read-only queries and is
// owned by exactly one ProcessHandle, which closes it once in Drop. Windows
// process handles may be used from any thread.
#[cfg(target_os = "windows")]
unsafe impl Send for ProcessHandle {}

impl fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessHandle")
            .field("target", &self.target)
            .field("exited", &self.exited.load(Ordering::Relaxed))
            .finish()
    }
}

impl ProcessHandle {
    pub fn attach(selector: &ProcessSelector) -> Result<Self, AttachError> {
        let (pid, name) = match selector {
            ProcessSelector::Name { name, excluded } => {
                let pid = find_process_id(name, excluded).inspect_err(|e| {
                    debug!("Process detection failed: {}", e);
                })?;
                debug!("Found {} with PID {}", name, pid);
                (pid, Some(name.as_str()))
            }
            ProcessSelector::Pid(pid) => (*pid, None),
        };
        Self::open(pid, name)
    }

    pub fn target(&self) -> &ProcessTarget {
        &self.target
    }

    pub fn pid(&self) -> u32 {
        self.target.pid
    }

    fn mark_exited(&self) -> ReadError {
        self.exited.store(true, Ordering::Relaxed);
        ReadError::ProcessExited
    }
}

impl ReadMemory for ProcessHandle {
    fn read_bytes(&self, address: u64, size: usize) -> ReadResult<Vec<u8>> {
        check_read(address, size)?;
        if self.exited.load(Ordering::Relaxed) {
            return Err(ReadError::ProcessExited);
        }
        self.read_raw(address, size).map_err(|e| {
            if e == ReadError::ProcessExited || !self.is_alive() {
                self.mark_exited()
            } else {
                e
            }
        })
    }

    fn base_address(&self) -> u64 {
        self.target.base_address
    }

    fn pointer_width(&self) -> PointerWidth {
        self.target.pointer_width
    }

    fn regions(&self) -> ReadResult<Vec<MemoryRegion>> {
        if self.exited.load(Ordering::Relaxed) {
            return Err(ReadError::ProcessExited);
        }
        self.query_regions().map_err(|e| {
            if !self.is_alive() {
                self.mark_exited()
            } else {
                e
            }
        })
    }
}

impl ProcessInfo for ProcessHandle {
    fn target(&self) -> &ProcessTarget {
        &self.target
    }

    fn is_alive(&self) -> bool {
        !self.exited.load(Ordering::Relaxed) && ProcessHandle::is_alive(self)
    }
}

/// Pointer width declared by the PE header of the image mapped at `base`.
pub fn pe_pointer_width<R: ReadMemory + ?Sized>(reader: &R, base: u64) -> Option<PointerWidth> {
    const MZ: u16 = 0x5A4D;
    const PE: u32 = 0x0000_4550;

    if reader.read_u16(base).ok()? != MZ {
        return None;
    }
    let header = base.checked_add(u64::from(reader.read_u32(base + 0x3C).ok()?))?;
    if reader.read_u32(header).ok()? != PE {
        return None;
    }
    match reader.read_u16(header + 4).ok()? {
        0x014C => Some(PointerWidth::Bits32),
        0x8664 | 0xAA64 => Some(PointerWidth::Bits64),
        _ => None,
    }
}

/// Decide whether a process command line belongs to the game.
///
/// `cmdline` is the NUL-separated argument list. Wrapper processes are
/// rejected when any argument contains an excluded word.
pub fn matches_process(cmdline: &[u8], comm: &str, name: &str, excluded: &[String]) -> bool {
    let args: Vec<String> = cmdline
        .split(|&b| b == 0)
        .filter(|arg| !arg.is_empty())
        .map(|arg| String::from_utf8_lossy(arg).into_owned())
        .collect();

    if args
        .iter()
        .any(|arg| excluded.iter().any(|word| arg.contains(word.as_str())))
    {
        return false;
    }

    comm.eq_ignore_ascii_case(name)
        || args
            .iter()
            .any(|arg| file_name_of(arg).eq_ignore_ascii_case(name))
}

/// Last component of a Unix or Windows style path.
fn file_name_of(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

// --- Windows ---------------------------------------------------------------

#[cfg(target_os = "windows")]
impl ProcessHandle {
    fn open(pid: u32, name: Option<&str>) -> Result<Self, AttachError> {
        // SAFETY: OpenProcess is called with valid flags (PROCESS_QUERY_INFORMATION | PROCESS_VM_READ).
        // The returned handle is managed by this struct and closed in Drop.
        let handle = unsafe {
            OpenProcess(PROCESS_QUERY_INFORMATION | PROCESS_VM_READ, false, pid).map_err(|e| {
                debug!("OpenProcess failed for PID {}: {}", pid, e);
                if e.code() == ERROR_ACCESS_DENIED.to_hresult() {
                    AttachError::PermissionDenied { pid }
                } else if e.code() == ERROR_INVALID_PARAMETER.to_hresult() {
                    AttachError::NotFound(format!("PID {}", pid))
                } else {
                    AttachError::OpenFailed {
                        pid,
                        message: e.to_string(),
                    }
                }
            })?
        };

        let mut process = Self {
            handle,
            target: ProcessTarget {
                pid,
                name: name.unwrap_or_default().to_string(),
                pointer_width: PointerWidth::default(),
                base_address: 0,
                module_size: 0,
                executable_dir: None,
            },
            exited: AtomicBool::new(false),
        };

        // From here on Drop closes the handle on every early return.
        let (base_address, module_size) = get_module_info(handle, pid)?;
        let image = image_path(handle);

        process.target.base_address = base_address;
        process.target.module_size = u64::from(module_size);
        process.target.pointer_width = wow64_pointer_width(handle);
        if process.target.name.is_empty() {
            if let Some(file) = image.as_ref().and_then(|p| p.file_name()) {
                process.target.name = file.to_string_lossy().into_owned();
            }
        }
        process.target.executable_dir = image.and_then(|p| p.parent().map(|d| d.to_path_buf()));

        Ok(process)
    }

    fn read_raw(&self, address: u64, size: usize) -> ReadResult<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        let mut bytes_read = 0;

        // SAFETY: ReadProcessMemory is called with:
        // - A valid process handle obtained via OpenProcess with PROCESS_VM_READ
        // - A properly allocated buffer of the requested size
        // - A pointer to receive the actual bytes read
        // Invalid target addresses make the call fail; that is handled via Result.
        unsafe {
            ReadProcessMemory(
                self.handle,
                address as *const _,
                buffer.as_mut_ptr() as *mut _,
                size,
                Some(&mut bytes_read),
            )
            .map_err(|e| {
                if e.code() == ERROR_PARTIAL_COPY.to_hresult()
                    || e.code() == ERROR_NOACCESS.to_hresult()
                {
                    ReadError::InvalidAddress { address }
                } else {
                    ReadError::Os {
                        address,
                        length: size,
                        message: e.to_string(),
                    }
                }
            })?;
        }

        // All-or-nothing: a partial read means the range crossed into
        // unmapped memory.
        if bytes_read != size {
            return Err(ReadError::InvalidAddress { address });
        }

        Ok(buffer)
    }

    fn query_regions(&self) -> ReadResult<Vec<MemoryRegion>> {
        let max_address = match self.target.pointer_width {
            PointerWidth::Bits32 => 0xFFFF_FFFF,
            PointerWidth::Bits64 => 0x7FFF_FFFF_FFFF,
        };
        Ok(crate::process::region::query_regions(
            self.handle,
            max_address,
        ))
    }

    /// Check if the process is still running
    pub fn is_alive(&self) -> bool {
        const STILL_ACTIVE: u32 = 259;

        let mut exit_code: u32 = 0;
        // SAFETY: GetExitCodeProcess is called with a valid process handle obtained from OpenProcess.
        unsafe {
            if GetExitCodeProcess(self.handle, &mut exit_code).is_ok() {
                exit_code == STILL_ACTIVE
            } else {
                false
            }
        }
    }
}

#[cfg(target_os = "windows")]
impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if !self.handle.is_invalid() {
            // SAFETY: self.handle is a valid handle obtained from OpenProcess and has not been
            // closed yet.
            if let Err(e) = unsafe { CloseHandle(self.handle) } {
                warn!("Failed to close process handle: {}", e);
            }
        }
    }
}

#[cfg(target_os = "windows")]
fn find_process_id(name: &str, _excluded: &[String]) -> Result<u32, AttachError> {
    // SAFETY: CreateToolhelp32Snapshot with TH32CS_SNAPPROCESS is safe to call.
    // The returned handle is closed at the end of this function.
    let snapshot = unsafe {
        CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0)
            .map_err(|e| AttachError::NotFound(e.to_string()))?
    };

    let mut entry = PROCESSENTRY32W {
        dwSize: std::mem::size_of::<PROCESSENTRY32W>() as u32,
        ..Default::default()
    };

    let mut found = None;
    // SAFETY: Process32FirstW and Process32NextW are called with a valid snapshot handle
    // and a properly initialized PROCESSENTRY32W structure. szExeFile is null-terminated.
    unsafe {
        if Process32FirstW(snapshot, &mut entry).is_ok() {
            loop {
                let len = entry
                    .szExeFile
                    .iter()
                    .position(|&c| c == 0)
                    .unwrap_or(entry.szExeFile.len());
                let exe_name = OsString::from_wide(&entry.szExeFile[..len]);

                if exe_name.to_string_lossy().eq_ignore_ascii_case(name) {
                    found = Some(entry.th32ProcessID);
                    break;
                }

                if Process32NextW(snapshot, &mut entry).is_err() {
                    break;
                }
            }
        }
        let _ = CloseHandle(snapshot);
    }

    found.ok_or_else(|| AttachError::NotFound(format!("Process '{}' not found", name)))
}

#[cfg(target_os = "windows")]
fn get_module_info(handle: HANDLE, pid: u32) -> Result<(u64, u32), AttachError> {
    let mut modules = [HMODULE::default(); 1024];
    let mut needed: u32 = 0;

    // SAFETY: EnumProcessModulesEx is called with a valid process handle from OpenProcess,
    // and the modules array is large enough to hold typical module counts.
    unsafe {
        EnumProcessModulesEx(
            handle,
            modules.as_mut_ptr(),
            (modules.len() * std::mem::size_of::<HMODULE>()) as u32,
            &mut needed,
            LIST_MODULES_ALL,
        )
        .map_err(|e| AttachError::OpenFailed {
            pid,
            message: format!("Failed to enumerate modules: {}", e),
        })?;
    }

    if needed == 0 {
        return Err(AttachError::OpenFailed {
            pid,
            message: "No modules found in process".to_string(),
        });
    }

    let mut info = MODULEINFO::default();
    // SAFETY: GetModuleInformation is called with a valid process handle and the first module
    // handle from the enumeration. The info struct is properly sized.
    unsafe {
        GetModuleInformation(
            handle,
            modules[0],
            &mut info,
            std::mem::size_of::<MODULEINFO>() as u32,
        )
        .map_err(|e| AttachError::OpenFailed {
            pid,
            message: format!("Failed to get module info: {}", e),
        })?;
    }

    Ok((info.lpBaseOfDll as u64, info.SizeOfImage))
}

#[cfg(target_os = "windows")]
fn wow64_pointer_width(handle: HANDLE) -> PointerWidth {
    if cfg!(target_pointer_width = "32") {
        return PointerWidth::Bits32;
    }
    let mut wow64 = BOOL::default();
    // SAFETY: IsWow64Process only writes to the provided BOOL.
    match unsafe { IsWow64Process(handle, &mut wow64) } {
        Ok(()) if wow64.as_bool() => PointerWidth::Bits32,
        Ok(()) => PointerWidth::Bits64,
        Err(e) => {
            debug!("IsWow64Process failed, assuming 32-bit target: {}", e);
            PointerWidth::Bits32
        }
    }
}

#[cfg(target_os = "windows")]
fn image_path(handle: HANDLE) -> Option<PathBuf> {
    let mut buffer = [0u16; 1024];
    let mut size = buffer.len() as u32;
    // SAFETY: the buffer length is passed in `size`, which the call updates
    // with the number of characters written.
    unsafe {
        QueryFullProcessImageNameW(
            handle,
            PROCESS_NAME_WIN32,
            PWSTR(buffer.as_mut_ptr()),
            &mut size,
        )
    }
    .ok()?;
    Some(PathBuf::from(OsString::from_wide(&buffer[..size as usize])))
}

// --- Linux -----------------------------------------------------------------

#[cfg(target_os = "linux")]
impl ProcessHandle {
    fn open(pid: u32, name: Option<&str>) -> Result<Self, AttachError> {
        use crate::process::region::read_proc_maps;
        use std::io::ErrorKind;

        let comm = std::fs::read_to_string(format!("/proc/{}/comm", pid))
            .map_err(|_| AttachError::NotFound(format!("PID {}", pid)))?;
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| comm.trim().to_string());

        let maps = read_proc_maps(pid).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied => AttachError::PermissionDenied { pid },
            ErrorKind::NotFound => AttachError::NotFound(format!("PID {}", pid)),
            _ => AttachError::OpenFailed {
                pid,
                message: e.to_string(),
            },
        })?;

        let image: Vec<_> = maps
            .iter()
            .filter(|m| {
                m.path
                    .as_deref()
                    .is_some_and(|p| file_name_of(p).eq_ignore_ascii_case(&name))
            })
            .collect();
        let (base_address, module_end) = match (image.first(), image.last()) {
            (Some(first), Some(last)) => (first.region.base, last.region.end()),
            _ => {
                let first = maps
                    .iter()
                    .find(|m| m.readable)
                    .ok_or_else(|| AttachError::OpenFailed {
                        pid,
                        message: "no readable mappings".to_string(),
                    })?;
                (first.region.base, first.region.end())
            }
        };

        let mut process = Self {
            target: ProcessTarget {
                pid,
                name,
                pointer_width: PointerWidth::default(),
                base_address,
                module_size: module_end - base_address,
                executable_dir: std::fs::read_link(format!("/proc/{}/cwd", pid)).ok(),
            },
            exited: AtomicBool::new(false),
        };

        // Probe once so permission problems surface at attach time.
        match process.read_raw(base_address, 2) {
            Ok(_) | Err(ReadError::InvalidAddress { .. }) => {}
            Err(ReadError::ProcessExited) => {
                return Err(AttachError::NotFound(format!("PID {}", pid)));
            }
            Err(ReadError::AccessDenied { .. }) => {
                return Err(AttachError::PermissionDenied { pid });
            }
            Err(e) => {
                return Err(AttachError::OpenFailed {
                    pid,
                    message: e.to_string(),
                });
            }
        }

        if let Some(width) = pe_pointer_width(&process, base_address) {
            process.target.pointer_width = width;
        }

        Ok(process)
    }

    fn read_raw(&self, address: u64, size: usize) -> ReadResult<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        let read = {
            let mut local = [IoSliceMut::new(&mut buffer)];
            let remote = [RemoteIoVec {
                base: address as usize,
                len: size,
            }];
            process_vm_readv(
                Pid::from_raw(self.target.pid as i32),
                &mut local,
                &remote,
            )
            .map_err(|errno| read_error_from_errno(errno, address, size))?
        };

        if read != size {
            return Err(ReadError::InvalidAddress { address });
        }
        Ok(buffer)
    }

    fn query_regions(&self) -> ReadResult<Vec<MemoryRegion>> {
        let maps = crate::process::region::read_proc_maps(self.target.pid).map_err(|e| {
            ReadError::Os {
                address: 0,
                length: 0,
                message: format!("failed to read memory map: {}", e),
            }
        })?;
        Ok(crate::process::region::coalesce(
            maps.into_iter()
                .filter(|m| m.readable)
                .map(|m| m.region)
                .collect(),
        ))
    }

    /// A zombie or reaped process counts as gone.
    pub fn is_alive(&self) -> bool {
        let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", self.target.pid)) else {
            return false;
        };
        match stat.rfind(')').and_then(|i| stat[i + 1..].split_whitespace().next()) {
            Some(state) => state != "Z" && state != "X",
            None => false,
        }
    }
}

#[cfg(target_os = "linux")]
fn read_error_from_errno(errno: Errno, address: u64, size: usize) -> ReadError {
    match errno {
        Errno::ESRCH => ReadError::ProcessExited,
        Errno::EFAULT => ReadError::InvalidAddress { address },
        // ptrace_scope or a missing CAP_SYS_PTRACE
        Errno::EPERM | Errno::EACCES => ReadError::AccessDenied { address },
        other => ReadError::Os {
            address,
            length: size,
            message: format!("{:?}: {}", other, other.desc()),
        },
    }
}

#[cfg(target_os = "linux")]
fn find_process_id(name: &str, excluded: &[String]) -> Result<u32, AttachError> {
    let own = std::process::id();
    let entries = std::fs::read_dir("/proc")
        .map_err(|e| AttachError::NotFound(format!("/proc is unavailable: {}", e)))?;

    let mut candidates: Vec<u32> = entries
        .flatten()
        .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
        .filter(|&pid| pid != own)
        .filter(|&pid| {
            let Ok(cmdline) = std::fs::read(format!("/proc/{}/cmdline", pid)) else {
                return false;
            };
            let comm = std::fs::read_to_string(format!("/proc/{}/comm", pid)).unwrap_or_default();
            matches_process(&cmdline, comm.trim(), name, excluded)
        })
        .collect();

    candidates.sort_unstable();
    candidates
        .first()
        .copied()
        .ok_or_else(|| AttachError::NotFound(format!("Process '{}' not found", name)))
}

// --- Other platforms -------------------------------------------------------

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
impl ProcessHandle {
    fn open(_pid: u32, _name: Option<&str>) -> Result<Self, AttachError> {
        Err(AttachError::UnsupportedPlatform)
    }

    fn read_raw(&self, address: u64, size: usize) -> ReadResult<Vec<u8>> {
        Err(ReadError::Os {
            address,
            length: size,
            message: "process access is not supported on this platform".to_string(),
        })
    }

    fn query_regions(&self) -> ReadResult<Vec<MemoryRegion>> {
        Ok(Vec::new())
    }

    pub fn is_alive(&self) -> bool {
        false
    }
}

#[cfg(not(any(target_os = "windows", target_os = "linux")))]
fn find_process_id(_name: &str, _excluded: &[String]) -> Result<u32, AttachError> {
    Err(AttachError::UnsupportedPlatform)
}
