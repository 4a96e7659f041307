//! The reconciliation loop: fragments in, validated commits and events out.
//!
//! [`Reconciler`] is the owned context that does the work for one fragment.
//! [`ReconcileOperator`] wraps it in a queue-fed worker task for callers that
//! submit fragments concurrently.

pub mod chat;
pub mod events;
pub mod hash;
pub mod history;
pub mod interpreter;
pub mod operator;
pub mod prompt;
pub mod queue;
pub mod reconciler;
pub mod scripted;
pub mod state;
pub mod worker;

pub use chat::{ChatInterpreter, ChatInterpreterConfig};
pub use events::ReconcileEvent;
pub use hash::{hash_document, StateHash};
pub use history::{FragmentLog, FragmentOutcome, FragmentRecord};
pub use interpreter::{FragmentInterpreter, InterpretError, StateContext};
pub use operator::ReconcileOperator;
pub use queue::{FifoQueue, FragmentQueue, Inbound, QueueError};
pub use reconciler::{stage, Reconciler, StageError, Staged};
pub use scripted::{ScriptEntry, ScriptedInterpreter};
pub use state::{HandState, PublishedHand};
pub use worker::ReconcileWorker;
