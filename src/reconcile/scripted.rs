use std::collections::VecDeque;
use std::path::Path;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::interpreter::{FragmentInterpreter, InterpretError, StateContext};
use crate::patch::PatchOperation;

/// One recorded interpreter exchange.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScriptEntry {
    pub fragment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patches: Option<Vec<PatchOperation>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScriptEntry {
    pub fn ok(fragment: impl Into<String>, patches: Vec<PatchOperation>) -> Self {
        Self {
            fragment: fragment.into(),
            patches: Some(patches),
            error: None,
        }
    }

    pub fn failed(fragment: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            fragment: fragment.into(),
            patches: None,
            error: Some(error.into()),
        }
    }
}

/// Replays recorded exchanges in order. Each call consumes the next entry;
/// a fragment that does not match the entry's text is an error.
pub struct ScriptedInterpreter {
    entries: Mutex<VecDeque<ScriptEntry>>,
}

impl ScriptedInterpreter {
    pub fn new(entries: impl IntoIterator<Item = ScriptEntry>) -> Self {
        Self {
            entries: Mutex::new(entries.into_iter().collect()),
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let entries: Vec<ScriptEntry> = serde_json::from_str(&raw)?;
        Ok(Self::new(entries))
    }

    /// Fragments still to be replayed, in order.
    pub fn fragments(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .map(|entry| entry.fragment.clone())
            .collect()
    }

    pub fn remaining(&self) -> usize {
        self.entries.lock().len()
    }
}

#[async_trait]
impl FragmentInterpreter for ScriptedInterpreter {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn interpret(
        &self,
        fragment: &str,
        _prior: &[String],
        _context: &StateContext,
    ) -> Result<Vec<PatchOperation>, InterpretError> {
        let entry = self
            .entries
            .lock()
            .pop_front()
            .ok_or_else(|| InterpretError::Unavailable("script exhausted".into()))?;

        if entry.fragment != fragment {
            return Err(InterpretError::MalformedResponse(format!(
                "script expected {:?}, got {:?}",
                entry.fragment, fragment
            )));
        }
        match (entry.patches, entry.error) {
            (_, Some(error)) => Err(InterpretError::Upstream(error)),
            (Some(patches), None) => Ok(patches),
            (None, None) => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::empty_hand;

    #[tokio::test]
    async fn replays_entries_in_order() {
        let interpreter = ScriptedInterpreter::new([
            ScriptEntry::ok(
                "hero is seat one",
                vec![PatchOperation::Replace {
                    path: "/hero_player_id".into(),
                    value: 1.into(),
                }],
            ),
            ScriptEntry::failed("mumble", "no idea"),
        ]);
        let context = StateContext::from_hand(&empty_hand());
        assert_eq!(interpreter.fragments(), vec!["hero is seat one", "mumble"]);

        let ops = interpreter
            .interpret("hero is seat one", &[], &context)
            .await
            .unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(
            interpreter.interpret("mumble", &[], &context).await,
            Err(InterpretError::Upstream("no idea".into()))
        );
        assert!(matches!(
            interpreter.interpret("more", &[], &context).await,
            Err(InterpretError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn mismatched_fragment_is_reported() {
        let interpreter = ScriptedInterpreter::new([ScriptEntry::ok("a", vec![])]);
        let context = StateContext::from_hand(&empty_hand());
        assert!(matches!(
            interpreter.interpret("b", &[], &context).await,
            Err(InterpretError::MalformedResponse(_))
        ));
        assert_eq!(interpreter.remaining(), 0);
    }

    #[test]
    fn reads_recorded_script_shape() {
        let entries: Vec<ScriptEntry> = serde_json::from_value(serde_json::json!([
            { "fragment": "nice hand", "patches": [] },
            { "fragment": "uh", "error": "timeout" }
        ]))
        .unwrap();
        assert_eq!(entries[0], ScriptEntry::ok("nice hand", vec![]));
        assert_eq!(entries[1], ScriptEntry::failed("uh", "timeout"));
    }
}
