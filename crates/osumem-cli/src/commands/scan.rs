//! Scan command: find a byte signature in the game's memory.
//!
//! Useful when building an offset table for a new client version.

use anyhow::{Context, Result};
use osumem_core::process::ProcessProvider;
use osumem_core::scan::format_pattern;
use osumem_core::{ReadMemory, Signature, SignatureScanner, SystemProvider};

use super::Options;

/// Run the scan command
pub fn run(options: &Options, pattern: &str, cap: u64) -> Result<()> {
    let signature: Signature = pattern
        .parse()
        .with_context(|| format!("Invalid pattern '{}'", pattern))?;

    let config = options.loop_config()?;
    let process = SystemProvider.attach(&config.selector())?;
    let target = process.target();
    println!(
        "Found process (PID: {}, Base: 0x{:X}, Size: 0x{:X})",
        target.pid, target.base_address, target.module_size
    );

    let regions = process.regions()?;
    let total: u64 = regions.iter().map(|r| r.size).sum();
    println!(
        "Scanning {} readable regions ({} KiB, cap {} KiB) for {}",
        regions.len(),
        total / 1024,
        cap / 1024,
        format_pattern(signature.bytes())
    );

    let address = SignatureScanner::new(cap).find(&process, &signature)?;
    println!("Match at 0x{:X}", address);
    if let Some(offset) = address.checked_sub(target.base_address) {
        if offset < target.module_size {
            println!("  module offset +0x{:X}", offset);
        }
    }

    if let Ok(window) = process.read_bytes(address, signature.len().max(16)) {
        let hex: Vec<String> = window.iter().map(|b| format!("{:02X}", b)).collect();
        println!("  bytes: {}", hex.join(" "));
    }
    Ok(())
}
