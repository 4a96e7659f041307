use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::events::ReconcileEvent;
use super::queue::{FifoQueue, FragmentQueue, Inbound, QueueError};
use super::reconciler::Reconciler;
use super::state::HandState;
use super::worker::ReconcileWorker;

const LOG_TARGET: &str = "voice_hand_history::reconcile::operator";

fn spawn_named_task<F, S>(name: S, future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
    S: Into<String>,
{
    use tracing::Instrument;
    let name_owned = name.into();
    let span = tracing::info_span!("task", task_name = %name_owned);
    tokio::spawn(future.instrument(span))
}

/// Facade over the queue, worker, published state and event channel.
/// Producers call [`submit`](Self::submit) from anywhere; the single worker
/// task processes fragments strictly in arrival order.
pub struct ReconcileOperator {
    queue: Arc<FifoQueue>,
    state: Arc<HandState>,
    events_tx: broadcast::Sender<ReconcileEvent>,
    cancel: CancellationToken,
}

impl ReconcileOperator {
    /// Wires the pieces around `reconciler`. The returned worker does nothing
    /// until handed to [`start`](Self::start).
    pub fn new(reconciler: Reconciler) -> (Self, ReconcileWorker) {
        let config = reconciler.config().clone();
        let queue = Arc::new(FifoQueue::new(config.queue_capacity));
        let state = Arc::new(HandState::new(
            reconciler.document().clone(),
            reconciler.hash(),
        ));
        let (events_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let cancel = CancellationToken::new();

        let worker = ReconcileWorker::new(
            Arc::clone(&queue) as Arc<dyn FragmentQueue>,
            reconciler,
            Arc::clone(&state),
            events_tx.clone(),
            cancel.clone(),
        );
        let operator = Self {
            queue,
            state,
            events_tx,
            cancel,
        };
        (operator, worker)
    }

    pub fn start(&self, worker: ReconcileWorker) -> JoinHandle<Reconciler> {
        spawn_named_task("reconcile-worker", worker.run())
    }

    /// Queues a fragment behind whatever is already waiting.
    #[instrument(skip(self, fragment), level = "debug", target = LOG_TARGET)]
    pub fn submit(&self, fragment: impl Into<String>) -> Result<usize, QueueError> {
        self.queue.push(Inbound::Fragment(fragment.into()))?;
        let pending = self.queue.len();
        info!(target: LOG_TARGET, pending, "fragment enqueued");
        Ok(pending)
    }

    /// Queues a reset; fragments submitted earlier are still processed first.
    pub fn reset(&self) -> Result<(), QueueError> {
        self.queue.push(Inbound::Reset)?;
        info!(target: LOG_TARGET, "reset enqueued");
        Ok(())
    }

    pub fn state(&self) -> Arc<HandState> {
        Arc::clone(&self.state)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReconcileEvent> {
        self.events_tx.subscribe()
    }

    pub fn pending(&self) -> Vec<String> {
        self.queue.pending_fragments()
    }

    /// Stops the worker after its current item and refuses new work.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.queue.close();
        info!(target: LOG_TARGET, "reconcile operator shut down");
    }
}
