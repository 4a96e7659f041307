use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::events::ReconcileEvent;
use super::queue::{FragmentQueue, Inbound};
use super::reconciler::Reconciler;
use super::state::HandState;

const LOG_TARGET: &str = "voice_hand_history::reconcile::worker";

/// Drains the queue one item at a time. Only this loop touches the
/// reconciler, so at most one fragment is ever being interpreted.
pub struct ReconcileWorker {
    queue: Arc<dyn FragmentQueue>,
    reconciler: Reconciler,
    state: Arc<HandState>,
    events_tx: broadcast::Sender<ReconcileEvent>,
    cancel: CancellationToken,
}

impl ReconcileWorker {
    pub fn new(
        queue: Arc<dyn FragmentQueue>,
        reconciler: Reconciler,
        state: Arc<HandState>,
        events_tx: broadcast::Sender<ReconcileEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            queue,
            reconciler,
            state,
            events_tx,
            cancel,
        }
    }

    /// Runs until cancelled or the queue closes, then hands the reconciler
    /// back so callers can inspect the final hand.
    pub async fn run(mut self) -> Reconciler {
        info!(
            target: LOG_TARGET,
            interpreter = self.reconciler.interpreter_name(),
            "reconcile worker started"
        );
        loop {
            let next = tokio::select! {
                _ = self.cancel.cancelled() => break,
                item = self.queue.pop() => item,
            };
            let Ok(item) = next else {
                break;
            };
            self.handle(item).await;
        }
        info!(
            target: LOG_TARGET,
            fragments = self.reconciler.log().len(),
            "reconcile worker stopped"
        );
        self.reconciler
    }

    pub async fn handle(&mut self, item: Inbound) {
        let event = match item {
            Inbound::Fragment(fragment) => {
                debug!(target: LOG_TARGET, %fragment, pending = self.queue.len(), "fragment dequeued");
                self.state.begin(&fragment);
                let record = self.reconciler.process(fragment).await;
                ReconcileEvent::from(&record)
            }
            Inbound::Reset => {
                self.reconciler.reset();
                ReconcileEvent::Reset {
                    state_hash: self.reconciler.hash(),
                }
            }
        };

        self.state.publish(
            self.reconciler.document().clone(),
            self.reconciler.hash(),
            self.reconciler.log().clone(),
        );
        // No subscribers is fine; the state above is still current.
        let _ = self.events_tx.send(event);
    }
}
