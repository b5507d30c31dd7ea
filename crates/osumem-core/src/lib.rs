pub mod beatmap;
pub mod config;
pub mod decode;
pub mod error;
pub mod export;
pub mod offset;
pub mod pointer;
pub mod poll;
pub mod process;
pub mod scan;
pub mod tracker;

pub use beatmap::{
    BeatmapAssembler, BeatmapInfo, BeatmapPaths, GameMode, GameState, RankedStatus,
    RatingRequest, RatingSource, SnapshotRecord, SnapshotReport, StarRating,
};
pub use config::LoopConfig;
pub use error::{Error, Result};
pub use offset::{OffsetRegistry, OffsetTable, load_table, save_table};
pub use poll::{LoopEvent, LoopState, PollLoop, ShutdownSignal, SnapshotCell};
pub use process::{ProcessHandle, ProcessSelector, ProcessTarget, ReadMemory, SystemProvider};
pub use scan::{Signature, SignatureScanner};
pub use tracker::{Tracker, get_beatmap_info, init_loop, init_loop_with};
