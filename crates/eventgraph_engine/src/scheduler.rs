// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deferred continuations.
//!
//! A delay node does not suspend the call stack. It records which execution
//! output to fire later and returns; when the host's timer reaches the due
//! time the output is fired as a fresh top-level run. Nothing but the
//! continuation record and the variable store survives in between.

use crate::node::NodeId;
use crate::store::InstanceId;
use std::time::Duration;

/// A pending "fire this execution output later"
#[derive(Debug, Clone, PartialEq)]
pub struct Continuation {
    /// Graph holding the node
    pub graph: String,
    /// Node whose output fires
    pub node: NodeId,
    /// Run of the node that scheduled the continuation
    pub instance: InstanceId,
    /// Execution output to fire
    pub output: String,
    /// Clock time at which it becomes due
    pub due: Duration,
    seq: u64,
}

/// Pending continuations ordered on a virtual clock
#[derive(Debug, Default)]
pub struct Scheduler {
    now: Duration,
    pending: Vec<Continuation>,
    next_seq: u64,
}

impl Scheduler {
    /// Create an empty scheduler at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current clock time
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule an output to fire after `delay`
    pub fn schedule(
        &mut self,
        graph: &str,
        node: NodeId,
        instance: InstanceId,
        output: &str,
        delay: Duration,
    ) {
        let continuation = Continuation {
            graph: graph.to_string(),
            node,
            instance,
            output: output.to_string(),
            due: self.now + delay,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.pending.push(continuation);
    }

    /// Time left until the earliest continuation is due
    pub fn next_due(&self) -> Option<Duration> {
        self.pending
            .iter()
            .map(|c| c.due.saturating_sub(self.now))
            .min()
    }

    /// Advance the clock and take every continuation now due, earliest first
    pub fn advance(&mut self, elapsed: Duration) -> Vec<Continuation> {
        self.now += elapsed;
        let now = self.now;
        let (mut due, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.pending).into_iter().partition(|c| c.due <= now);
        self.pending = pending;
        due.sort_by_key(|c| (c.due, c.seq));
        due
    }

    /// Number of continuations waiting
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drop the continuations of a removed node
    pub fn cancel_node(&mut self, node: NodeId) -> usize {
        let before = self.pending.len();
        self.pending.retain(|c| c.node != node);
        before - self.pending.len()
    }

    /// Drop every pending continuation
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_due_order() {
        let mut scheduler = Scheduler::new();
        let node = NodeId::new();
        let instance = InstanceId::new();
        scheduler.schedule("g", node, instance, "late", Duration::from_secs(2));
        scheduler.schedule("g", node, instance, "early", Duration::from_secs(1));
        scheduler.schedule("g", node, instance, "early_second", Duration::from_secs(1));

        assert_eq!(scheduler.next_due(), Some(Duration::from_secs(1)));
        assert!(scheduler.advance(Duration::from_millis(500)).is_empty());

        let fired = scheduler.advance(Duration::from_millis(600));
        let outputs: Vec<&str> = fired.iter().map(|c| c.output.as_str()).collect();
        assert_eq!(outputs, vec!["early", "early_second"]);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.next_due(), Some(Duration::from_millis(900)));
    }

    #[test]
    fn test_empty_scheduler() {
        let mut scheduler = Scheduler::new();
        assert_eq!(scheduler.next_due(), None);
        assert!(scheduler.advance(Duration::from_secs(10)).is_empty());
        assert_eq!(scheduler.now(), Duration::from_secs(10));
    }
}
