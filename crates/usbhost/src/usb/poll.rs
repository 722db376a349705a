//! Poll-set bookkeeping
//!
//! Every open handle owns one entry here: its descriptor and the readiness
//! it is interested in. [`PollRegistry::snapshot`] hands an event loop a
//! point-in-time copy; it must be re-requested after any open or close.

use nix::poll::PollFlags;
use serde::{Deserialize, Serialize};
use std::os::fd::RawFd;
use tracing::warn;

/// Readiness a handle wants to be woken for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interest {
    Read,
    /// Registered for every newly opened handle unless configured otherwise
    #[default]
    Write,
    ReadWrite,
}

impl Interest {
    pub fn poll_flags(self) -> PollFlags {
        match self {
            Interest::Read => PollFlags::POLLIN,
            Interest::Write => PollFlags::POLLOUT,
            Interest::ReadWrite => PollFlags::POLLIN | PollFlags::POLLOUT,
        }
    }
}

/// One (descriptor, interest) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollEntry {
    pub fd: RawFd,
    pub interest: Interest,
}

impl PollEntry {
    /// Interest as a `poll(2)` events mask
    pub fn events(&self) -> PollFlags {
        self.interest.poll_flags()
    }
}

/// Registered descriptors, in registration order
#[derive(Debug, Default)]
pub struct PollRegistry {
    entries: Vec<PollEntry>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, fd: RawFd, interest: Interest) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.fd == fd) {
            warn!("fd {} registered twice, replacing interest", fd);
            entry.interest = interest;
            return;
        }
        self.entries.push(PollEntry { fd, interest });
    }

    /// Change the interest of a registered descriptor
    pub fn update(&mut self, fd: RawFd, interest: Interest) -> bool {
        match self.entries.iter_mut().find(|e| e.fd == fd) {
            Some(entry) => {
                entry.interest = interest;
                true
            }
            None => false,
        }
    }

    pub fn deregister(&mut self, fd: RawFd) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.fd != fd);
        self.entries.len() != before
    }

    pub fn snapshot(&self) -> Vec<PollEntry> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interest_flags() {
        assert_eq!(Interest::default(), Interest::Write);
        assert_eq!(Interest::Write.poll_flags(), PollFlags::POLLOUT);
        assert_eq!(Interest::Read.poll_flags(), PollFlags::POLLIN);
        assert!(Interest::ReadWrite.poll_flags().contains(PollFlags::POLLIN));
        assert!(Interest::ReadWrite.poll_flags().contains(PollFlags::POLLOUT));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut registry = PollRegistry::new();
        assert!(registry.snapshot().is_empty());

        registry.register(7, Interest::Write);
        registry.register(3, Interest::Read);
        let snapshot = registry.snapshot();

        registry.deregister(7);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].fd, 7);
        assert_eq!(snapshot[1].fd, 3);
        assert_eq!(registry.snapshot(), vec![PollEntry { fd: 3, interest: Interest::Read }]);
    }

    #[test]
    fn test_update_and_deregister_unknown() {
        let mut registry = PollRegistry::new();
        assert!(!registry.update(9, Interest::Read));
        assert!(!registry.deregister(9));

        registry.register(9, Interest::Write);
        assert!(registry.update(9, Interest::ReadWrite));
        assert_eq!(registry.snapshot()[0].events(), PollFlags::POLLIN | PollFlags::POLLOUT);
    }

    #[test]
    fn test_duplicate_register_replaces() {
        let mut registry = PollRegistry::new();
        registry.register(4, Interest::Write);
        registry.register(4, Interest::Read);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.snapshot()[0].interest, Interest::Read);
    }
}
