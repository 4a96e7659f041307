use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;
use tokio::sync::oneshot::{Receiver, Sender};

/// Work accepted by the reconciliation worker. Resets travel through the
/// same queue so they never overlap a fragment that is being interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inbound {
    Fragment(String),
    Reset,
}

pub trait FragmentQueue: Send + Sync {
    fn push(&self, item: Inbound) -> Result<(), QueueError>;
    /// Resolves with the next item, or errors once the queue is closed.
    fn pop(&self) -> Receiver<Inbound>;
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn close(&self);
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue closed")]
    Closed,
}

pub struct FifoQueue {
    state: Mutex<QueueState>,
}

struct QueueState {
    items: VecDeque<Inbound>,
    waiters: VecDeque<Sender<Inbound>>,
    closed: bool,
}

impl FifoQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                waiters: VecDeque::new(),
                closed: false,
            }),
        }
    }

    /// Fragments waiting behind the one in flight, oldest first.
    pub fn pending_fragments(&self) -> Vec<String> {
        self.state
            .lock()
            .items
            .iter()
            .filter_map(|item| match item {
                Inbound::Fragment(text) => Some(text.clone()),
                Inbound::Reset => None,
            })
            .collect()
    }

    fn close_inner(&self) {
        let mut state = self.state.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        state.waiters.clear();
        state.items.clear();
    }
}

impl FragmentQueue for FifoQueue {
    fn push(&self, item: Inbound) -> Result<(), QueueError> {
        let mut pending = item;

        loop {
            let waiter = {
                let mut state = self.state.lock();
                if state.closed {
                    return Err(QueueError::Closed);
                }
                match state.waiters.pop_front() {
                    Some(waiter) => waiter,
                    None => {
                        state.items.push_back(pending);
                        return Ok(());
                    }
                }
            };

            // A waiter whose receiver was dropped hands the item back.
            match waiter.send(pending) {
                Ok(()) => return Ok(()),
                Err(item) => pending = item,
            }
        }
    }

    fn pop(&self) -> Receiver<Inbound> {
        let (tx, rx) = tokio::sync::oneshot::channel();

        let mut state = self.state.lock();
        if state.closed {
            drop(tx);
            return rx;
        }

        if let Some(item) = state.items.pop_front() {
            drop(state);
            if let Err(item) = tx.send(item) {
                self.state.lock().items.push_front(item);
            }
        } else {
            state.waiters.push_back(tx);
        }

        rx
    }

    fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    fn close(&self) {
        self.close_inner();
    }
}

impl Drop for FifoQueue {
    fn drop(&mut self) {
        self.close_inner();
    }
}

impl fmt::Debug for FifoQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FifoQueue")
            .field("pending_items", &state.items.len())
            .field("waiting_receivers", &state.waiters.len())
            .field("closed", &state.closed)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::runtime::Runtime;

    fn fragment(text: &str) -> Inbound {
        Inbound::Fragment(text.to_owned())
    }

    #[test]
    fn fifo_ordering_is_preserved() {
        let queue = FifoQueue::new(8);
        queue.push(fragment("one")).unwrap();
        queue.push(Inbound::Reset).unwrap();
        queue.push(fragment("two")).unwrap();

        let rt = Runtime::new().unwrap();
        assert_eq!(rt.block_on(queue.pop()).unwrap(), fragment("one"));
        assert_eq!(rt.block_on(queue.pop()).unwrap(), Inbound::Reset);
        assert_eq!(rt.block_on(queue.pop()).unwrap(), fragment("two"));
    }

    #[test]
    fn pop_before_push_completes_when_item_arrives() {
        let queue = FifoQueue::new(2);
        let rx = queue.pop();
        queue.push(fragment("late")).unwrap();
        let rt = Runtime::new().unwrap();
        assert_eq!(rt.block_on(rx).unwrap(), fragment("late"));
        assert!(queue.is_empty());
    }

    #[test]
    fn dropped_waiters_do_not_swallow_items() {
        let queue = FifoQueue::new(2);
        drop(queue.pop());
        queue.push(fragment("kept")).unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pending_fragments(), vec!["kept"]);
    }

    #[test]
    fn len_reflects_enqueued_items() {
        let queue = FifoQueue::new(2);
        assert_eq!(queue.len(), 0);
        queue.push(fragment("a")).unwrap();
        queue.push(Inbound::Reset).unwrap();
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pending_fragments(), vec!["a"]);
        let rt = Runtime::new().unwrap();
        let _ = rt.block_on(queue.pop()).unwrap();
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn push_after_close_returns_error() {
        let queue = FifoQueue::new(2);
        queue.close();
        assert!(matches!(queue.push(fragment("x")), Err(QueueError::Closed)));
    }

    #[test]
    fn outstanding_waiters_receive_error_when_closed() {
        let queue = FifoQueue::new(2);
        let rx = queue.pop();
        queue.close();
        let rt = Runtime::new().unwrap();
        assert!(rt.block_on(rx).is_err());
        assert!(rt.block_on(queue.pop()).is_err());
    }
}
