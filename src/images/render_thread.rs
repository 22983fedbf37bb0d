// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The single-writer check for native calls.

use logwise::privacy::LogIt;
use std::thread::ThreadId;

/// What a context does when it is driven from a thread other than its render thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThreadPolicy {
    /// Log the misuse and panic.
    #[default]
    Panic,
    /// Log the misuse and carry on.
    Report,
}

/// Remembers the first thread that issued native calls.
#[derive(Debug)]
pub(crate) struct RenderThread {
    owner: Option<ThreadId>,
    policy: ThreadPolicy,
}

impl RenderThread {
    pub(crate) fn new(policy: ThreadPolicy) -> Self {
        RenderThread { owner: None, policy }
    }

    pub(crate) fn check(&mut self, operation: &'static str) {
        let current = std::thread::current();
        match self.owner {
            None => self.owner = Some(current.id()),
            Some(owner) if owner == current.id() => {}
            Some(owner) => {
                logwise::error_sync!(
                    "{operation} called from {thread} but the render thread is {owner}",
                    operation = LogIt(operation),
                    thread = LogIt(current.name().unwrap_or("<unnamed>")),
                    owner = LogIt(&owner)
                );
                if self.policy == ThreadPolicy::Panic {
                    panic!("{operation} called off the render thread {owner:?}");
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn owner(&self) -> Option<ThreadId> {
        self.owner
    }
}
