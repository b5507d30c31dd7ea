//! Process provider abstraction for testability.
//!
//! The poll loop attaches through a [`ProcessProvider`], so tests can hand it
//! an in-memory process instead of a running game.

use crate::error::AttachError;
use crate::process::handle::{ProcessHandle, ProcessSelector, ProcessTarget};
use crate::process::reader::ReadMemory;

/// Trait for accessing process information.
pub trait ProcessInfo {
    fn target(&self) -> &ProcessTarget;

    /// Check if the process is still running.
    fn is_alive(&self) -> bool;

    fn pid(&self) -> u32 {
        self.target().pid
    }
}

/// Trait for finding and opening processes.
pub trait ProcessProvider {
    /// The type of process returned by this provider.
    type Process: ReadMemory + ProcessInfo + Send;

    fn attach(&self, selector: &ProcessSelector) -> Result<Self::Process, AttachError>;
}

/// Provider backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProvider;

impl ProcessProvider for SystemProvider {
    type Process = ProcessHandle;

    fn attach(&self, selector: &ProcessSelector) -> Result<Self::Process, AttachError> {
        ProcessHandle::attach(selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::mock::{MockMemoryBuilder, MockProcessProvider};

    #[test]
    fn test_mock_provider_attach() {
        let provider = MockProcessProvider::default();
        provider.set_process(MockMemoryBuilder::new().pid(1234).with_size(16).build());

        let process = provider
            .attach(&ProcessSelector::name("osu!.exe"))
            .unwrap();
        assert_eq!(process.pid(), 1234);
        assert!(process.is_alive());
    }

    #[test]
    fn test_mock_provider_not_found() {
        let provider = MockProcessProvider::default();

        let result = provider.attach(&ProcessSelector::name("osu!.exe"));
        assert!(matches!(result, Err(AttachError::NotFound(_))));
    }

    #[test]
    fn test_mock_provider_attach_by_pid() {
        let provider = MockProcessProvider::default();
        provider.set_process(MockMemoryBuilder::new().pid(1234).with_size(16).build());

        assert!(provider.attach(&ProcessSelector::Pid(1234)).is_ok());
        assert!(provider.attach(&ProcessSelector::Pid(9999)).is_err());
    }
}
