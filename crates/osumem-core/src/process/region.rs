//! Enumeration of readable memory regions in the target.

#![cfg_attr(not(target_os = "windows"), allow(dead_code))]

use serde::Serialize;

#[cfg(target_os = "windows")]
use windows::Win32::Foundation::HANDLE;
#[cfg(target_os = "windows")]
use windows::Win32::System::Memory::{
    MEM_COMMIT, MEMORY_BASIC_INFORMATION, PAGE_GUARD, PAGE_NOACCESS, VirtualQueryEx,
};

/// A contiguous range of readable, committed memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryRegion {
    pub base: u64,
    pub size: u64,
}

impl MemoryRegion {
    pub fn new(base: u64, size: u64) -> Self {
        Self { base, size }
    }

    pub fn end(&self) -> u64 {
        self.base.saturating_add(self.size)
    }

    pub fn contains(&self, address: u64) -> bool {
        address >= self.base && address < self.end()
    }
}

/// One line of `/proc/<pid>/maps`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapsEntry {
    pub region: MemoryRegion,
    pub readable: bool,
    pub path: Option<String>,
}

/// Parse a `/proc/<pid>/maps` line such as
/// `00400000-0040b000 r-xp 00000000 08:01 1234   /usr/bin/foo`.
pub fn parse_maps_line(line: &str) -> Option<MapsEntry> {
    let mut fields = line.split_whitespace();
    let range = fields.next()?;
    let perms = fields.next()?;
    // offset, dev, inode
    let _ = (fields.next()?, fields.next()?, fields.next()?);
    let path = fields.collect::<Vec<_>>().join(" ");

    let (start, end) = range.split_once('-')?;
    let start = u64::from_str_radix(start, 16).ok()?;
    let end = u64::from_str_radix(end, 16).ok()?;
    if end <= start {
        return None;
    }

    Some(MapsEntry {
        region: MemoryRegion::new(start, end - start),
        readable: perms.starts_with('r'),
        path: if path.is_empty() { None } else { Some(path) },
    })
}

/// Merge adjacent regions so a scan can carry its overlap across them.
pub fn coalesce(mut regions: Vec<MemoryRegion>) -> Vec<MemoryRegion> {
    regions.sort_by_key(|r| r.base);
    let mut merged: Vec<MemoryRegion> = Vec::with_capacity(regions.len());
    for region in regions {
        match merged.last_mut() {
            Some(last) if last.end() == region.base => last.size += region.size,
            _ => merged.push(region),
        }
    }
    merged
}

#[cfg(target_os = "linux")]
pub(crate) fn read_proc_maps(pid: u32) -> std::io::Result<Vec<MapsEntry>> {
    let content = std::fs::read_to_string(format!("/proc/{}/maps", pid))?;
    Ok(content.lines().filter_map(parse_maps_line).collect())
}

#[cfg(target_os = "windows")]
pub(crate) fn query_regions(handle: HANDLE, max_address: u64) -> Vec<MemoryRegion> {
    let mut regions = Vec::new();
    let mut current: u64 = 0;

    while current < max_address {
        let mut info = MEMORY_BASIC_INFORMATION::default();
        // SAFETY: VirtualQueryEx is called with a valid process handle owned by
        // ProcessHandle and a properly sized MEMORY_BASIC_INFORMATION buffer.
        let written = unsafe {
            VirtualQueryEx(
                handle,
                Some(current as *const _),
                &mut info,
                std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            )
        };
        if written == 0 || info.RegionSize == 0 {
            break;
        }

        let readable = info.State == MEM_COMMIT
            && (info.Protect.0 & PAGE_NOACCESS.0) == 0
            && (info.Protect.0 & PAGE_GUARD.0) == 0;
        if readable {
            regions.push(MemoryRegion::new(
                info.BaseAddress as u64,
                info.RegionSize as u64,
            ));
        }

        current = (info.BaseAddress as u64).saturating_add(info.RegionSize as u64);
    }

    coalesce(regions)
}
