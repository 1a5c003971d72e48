use parking_lot::Mutex;

use pulse_core::ops::Operation;

/// The in-memory operation queue, the one shared mutable structure.
///
/// Draining is atomic: a flush takes a snapshot of everything queued and
/// removes it in the same step, before any network call begins, so
/// overlapping flush triggers can never double-send an operation.
#[derive(Default)]
pub struct OperationQueue {
    ops: Mutex<Vec<Operation>>,
}

impl OperationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation. Non-blocking, never fails.
    pub fn enqueue(&self, op: Operation) {
        self.ops.lock().push(op);
    }

    /// Snapshot-and-clear in one step. Preserves enqueue order.
    pub fn drain(&self) -> Vec<Operation> {
        std::mem::take(&mut *self.ops.lock())
    }

    pub fn len(&self) -> usize {
        self.ops.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn drain_empties_and_preserves_order() {
        let queue = OperationQueue::new();
        queue.enqueue(Operation::append("a", json!(1)));
        queue.enqueue(Operation::set("b", json!(2)));
        queue.enqueue(Operation::increment("c"));

        let drained = queue.drain();
        assert_eq!(drained.len(), 3);
        assert_eq!(drained[0].path(), "a");
        assert_eq!(drained[1].path(), "b");
        assert_eq!(drained[2].path(), "c");
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_on_empty_queue_is_a_noop() {
        let queue = OperationQueue::new();
        assert!(queue.drain().is_empty());
    }

    #[test]
    fn second_drain_sees_nothing_from_the_first() {
        let queue = OperationQueue::new();
        queue.enqueue(Operation::increment("x"));
        let first = queue.drain();
        let second = queue.drain();
        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
    }
}
