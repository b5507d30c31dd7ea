use thiserror::Error;

/// Failure to attach to a target process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachError {
    #[error("Process not found: {0}")]
    NotFound(String),

    #[error("Permission denied while opening process {pid}")]
    PermissionDenied { pid: u32 },

    #[error("Failed to open process {pid}: {message}")]
    OpenFailed { pid: u32, message: String },

    #[error("No offset table matches process {pid}")]
    UnsupportedVersion { pid: u32 },

    #[error("Process access is not supported on this platform")]
    UnsupportedPlatform,
}

/// Failure of a single raw read against the target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("Invalid address {address:#x}")]
    InvalidAddress { address: u64 },

    #[error("Read length {length} out of bounds (max {max})")]
    LengthOutOfBounds { length: usize, max: usize },

    #[error("Target process has exited")]
    ProcessExited,

    #[error("Access denied reading {address:#x}")]
    AccessDenied { address: u64 },

    #[error("Failed to read {length} bytes at {address:#x}: {message}")]
    Os {
        address: u64,
        length: usize,
        message: String,
    },
}

/// Why a pointer chain could not be walked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainFault {
    #[error("null pointer")]
    NullPointer,

    #[error("address overflow")]
    Overflow,

    #[error("{0}")]
    Read(ReadError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Pointer chain broken at step {step} ({address:#x}): {kind}")]
pub struct ChainBroken {
    /// Index of the offset being applied when the walk failed.
    pub step: usize,
    /// Address that was being read (or computed) at that step.
    pub address: u64,
    pub kind: ChainFault,
}

impl ChainBroken {
    pub fn is_process_exited(&self) -> bool {
        matches!(self.kind, ChainFault::Read(ReadError::ProcessExited))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Null reference at {address:#x}")]
    NullReference { address: u64 },

    #[error("String at {address:#x} exceeds {max} characters")]
    TooLong { address: u64, max: usize },

    #[error("Invalid length {length} at {address:#x}")]
    InvalidLength { address: u64, length: i64 },

    #[error("Malformed data at {address:#x}: {reason}")]
    Malformed { address: u64, reason: String },

    #[error(transparent)]
    Read(#[from] ReadError),
}

impl DecodeError {
    pub fn is_process_exited(&self) -> bool {
        matches!(self, DecodeError::Read(ReadError::ProcessExited))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("Pattern not found after scanning {scanned} bytes")]
    NotFound { scanned: u64 },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    #[error(transparent)]
    Read(#[from] ReadError),
}

/// Why a single logical field could not be produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("not supported by this offset table")]
    Unsupported,

    #[error("no locator for field")]
    MissingEntry,

    #[error("anchor '{0}' is unavailable")]
    AnchorUnavailable(String),

    #[error(transparent)]
    Chain(#[from] ChainBroken),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("unexpected value: {0}")]
    Invalid(String),
}

impl FieldError {
    pub fn is_process_exited(&self) -> bool {
        match self {
            FieldError::Chain(e) => e.is_process_exited(),
            FieldError::Decode(e) => e.is_process_exited(),
            FieldError::Scan(ScanError::Read(ReadError::ProcessExited)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("Incomplete beatmap state: {field}: {cause}")]
    IncompleteState {
        field: &'static str,
        cause: FieldError,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Attach(#[from] AttachError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Chain(#[from] ChainBroken),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("Invalid offset table: {0}")]
    InvalidOffsetTable(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("No snapshot has been produced yet")]
    NoSnapshot,

    #[error("Process {requested} is no longer tracked (current: {current:?})")]
    StaleTarget { requested: u32, current: Option<u32> },

    #[error("Giving up: {0}")]
    Terminal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_table(message: impl Into<String>) -> Self {
        Error::InvalidOffsetTable(message.into())
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfig(message.into())
    }

    /// True when this error, or any cause nested inside it, reports that the
    /// target process went away.
    pub fn is_process_exited(&self) -> bool {
        match self {
            Error::Read(e) => *e == ReadError::ProcessExited,
            Error::Chain(e) => e.is_process_exited(),
            Error::Decode(e) => e.is_process_exited(),
            Error::Scan(ScanError::Read(ReadError::ProcessExited)) => true,
            Error::Snapshot(SnapshotError::IncompleteState { cause, .. }) => {
                cause.is_process_exited()
            }
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Error::Terminal(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_exited_direct() {
        assert!(Error::Read(ReadError::ProcessExited).is_process_exited());
        assert!(!Error::Read(ReadError::InvalidAddress { address: 0 }).is_process_exited());
    }

    #[test]
    fn test_process_exited_nested_in_snapshot() {
        let cause = FieldError::Chain(ChainBroken {
            step: 1,
            address: 0x1000,
            kind: ChainFault::Read(ReadError::ProcessExited),
        });
        let err = Error::Snapshot(SnapshotError::IncompleteState {
            field: "beatmap.folder",
            cause,
        });
        assert!(err.is_process_exited());
    }

    #[test]
    fn test_process_exited_nested_in_decode() {
        let err = FieldError::Decode(DecodeError::Read(ReadError::ProcessExited));
        assert!(err.is_process_exited());
        assert!(!FieldError::Unsupported.is_process_exited());
    }

    #[test]
    fn test_chain_broken_display() {
        let err = ChainBroken {
            step: 2,
            address: 0x2000,
            kind: ChainFault::NullPointer,
        };
        assert_eq!(
            err.to_string(),
            "Pointer chain broken at step 2 (0x2000): null pointer"
        );
    }

    #[test]
    fn test_terminal() {
        assert!(Error::Terminal("permission denied".to_string()).is_terminal());
        assert!(!Error::NoSnapshot.is_terminal());
    }
}
