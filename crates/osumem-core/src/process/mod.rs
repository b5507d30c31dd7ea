mod bytes;
mod handle;
pub mod provider;
mod reader;
pub mod region;

// Mock memory reader for testing (always available for unit and integration tests)
#[doc(hidden)]
pub mod mock;

pub use bytes::ByteBuffer;
pub use handle::{ProcessHandle, ProcessSelector, ProcessTarget, matches_process, pe_pointer_width};
pub use provider::{ProcessInfo, ProcessProvider, SystemProvider};
pub use reader::{PointerWidth, ReadMemory, ReadResult, check_read};
pub use region::MemoryRegion;

// Re-export mock for convenient access in tests
#[doc(hidden)]
pub use mock::{MockMemoryBuilder, MockMemoryReader, MockProcessProvider};
