//! Snapshot command: read the current beatmap once.

use anyhow::{Result, bail};
use osumem_core::export::format_beatmap_console;
use osumem_core::offset::{AnchorCache, detect_table};
use osumem_core::process::ProcessProvider;
use osumem_core::{BeatmapAssembler, SignatureScanner, SystemProvider};
use serde_json::json;

use super::Options;

/// Run the snapshot command
pub fn run(options: &Options, json: bool) -> Result<()> {
    let config = options.loop_config()?;
    let registry = options.registry()?;

    let process = SystemProvider.attach(&config.selector())?;
    let target = process.target().clone();
    if !json {
        println!(
            "Found process (PID: {}, Base: 0x{:X}, {}-bit)",
            target.pid,
            target.base_address,
            target.pointer_width.bits()
        );
    }

    let scanner = SignatureScanner::new(config.scan_cap);
    let mut anchors = AnchorCache::new();
    let table = detect_table(&process, &registry, &scanner, &mut anchors, target.pid)?;

    let mut assembler = BeatmapAssembler::new(table)
        .with_scanner(scanner)
        .with_anchors(anchors);
    assembler.reset_for(&target);

    let (info, report) = match assembler.snapshot_with_report(&process) {
        Ok(result) => result,
        Err(e) => bail!("No beatmap could be read: {}", e),
    };
    let state = assembler.game_state(&process)?;
    let menu_mods = assembler.menu_mods(&process)?;
    let play_time = assembler.play_time_ms(&process)?;
    let songs = assembler.songs_directory(&process)?;
    let paths = songs.as_deref().map(|dir| info.paths(dir));

    if json {
        let unknown: Vec<_> = report
            .unknown
            .iter()
            .map(|u| json!({ "field": u.field, "unsupported": u.is_unsupported() }))
            .collect();
        let output = json!({
            "pid": target.pid,
            "family": assembler.table().family,
            "game_state": state,
            "menu_mods": menu_mods,
            "play_time_ms": play_time,
            "beatmap": info,
            "paths": paths,
            "unknown": unknown,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Table: {}  State: {}", assembler.table().family, state);
    match (menu_mods, play_time) {
        (Some(mods), Some(time)) => println!("Mods: 0x{:X}  Time: {}ms", mods, time),
        (Some(mods), None) => println!("Mods: 0x{:X}", mods),
        (None, Some(time)) => println!("Time: {}ms", time),
        (None, None) => {}
    }
    println!("{}", format_beatmap_console(&info));
    if let Some(paths) = paths {
        println!("Beatmap: {}", paths.beatmap.display());
    }
    for unknown in report.unsupported() {
        println!("  {} not available in this version", unknown.field);
    }
    for unknown in report.failed() {
        println!("  {} unreadable: {}", unknown.field, unknown.cause);
    }
    Ok(())
}
