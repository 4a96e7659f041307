use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::operation::PatchOperation;
use super::pointer::{parse_index, JsonPointer, PointerError};

#[derive(Clone, Debug, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatchError {
    #[error("invalid pointer {path:?}: {reason}")]
    InvalidPointer { path: String, reason: String },
    #[error("path {path:?} does not exist")]
    PathNotFound { path: String },
    #[error("{token:?} is not a valid array index in {path:?}")]
    InvalidIndex { path: String, token: String },
    #[error("index {index} is out of bounds in {path:?} (length {len})")]
    IndexOutOfBounds {
        path: String,
        index: usize,
        len: usize,
    },
    #[error("parent of {path:?} is neither an object nor an array")]
    NotAContainer { path: String },
    #[error("the document root cannot be removed")]
    RemoveRoot,
    #[error("test failed: value at {path:?} differs from the expected value")]
    TestFailed { path: String },
    #[error("cannot move {from:?} into its own child {path:?}")]
    MoveIntoDescendant { from: String, path: String },
    #[error("not applied: an earlier operation in the batch failed")]
    NotApplied,
}

impl PatchError {
    fn pointer(path: &str, err: PointerError) -> Self {
        PatchError::InvalidPointer {
            path: path.to_owned(),
            reason: err.to_string(),
        }
    }
}

/// Result of applying a batch: the working copy plus one entry per operation,
/// `None` meaning the operation succeeded.
#[derive(Clone, Debug, PartialEq)]
pub struct PatchOutcome {
    pub document: Value,
    pub results: Vec<Option<PatchError>>,
}

impl PatchOutcome {
    pub fn is_success(&self) -> bool {
        self.results.iter().all(Option::is_none)
    }

    /// Index and error of the operation that aborted the batch.
    pub fn first_error(&self) -> Option<(usize, &PatchError)> {
        self.results
            .iter()
            .enumerate()
            .find_map(|(index, result)| result.as_ref().map(|err| (index, err)))
    }

    /// The patched document, or the first failure.
    pub fn into_result(self) -> Result<Value, (usize, PatchError)> {
        match self.results.into_iter().enumerate().find_map(|(i, r)| r.map(|e| (i, e))) {
            Some(failure) => Err(failure),
            None => Ok(self.document),
        }
    }
}

/// Applies `operations` in order to a clone of `document`. The input is never
/// mutated. The first failing operation aborts the batch; every operation
/// after it reports [`PatchError::NotApplied`] and `document` in the outcome
/// is only meaningful when every result is `None`.
pub fn apply_patch(document: &Value, operations: &[PatchOperation]) -> PatchOutcome {
    let mut working = document.clone();
    let mut results = Vec::with_capacity(operations.len());
    let mut failed = false;

    for operation in operations {
        if failed {
            results.push(Some(PatchError::NotApplied));
            continue;
        }
        match apply_operation(&mut working, operation) {
            Ok(()) => results.push(None),
            Err(err) => {
                failed = true;
                results.push(Some(err));
            }
        }
    }

    PatchOutcome {
        document: working,
        results,
    }
}

pub fn apply_operation(doc: &mut Value, operation: &PatchOperation) -> Result<(), PatchError> {
    match operation {
        PatchOperation::Add { path, value } => add(doc, path, value.clone()),
        PatchOperation::Remove { path } => remove(doc, path).map(drop),
        PatchOperation::Replace { path, value } => replace(doc, path, value.clone()),
        PatchOperation::Move { from, path } => {
            if from == path {
                return resolve(doc, from).map(drop);
            }
            let from_ptr = parse(from)?;
            let to_ptr = parse(path)?;
            if from_ptr.is_proper_prefix_of(&to_ptr) {
                return Err(PatchError::MoveIntoDescendant {
                    from: from.clone(),
                    path: path.clone(),
                });
            }
            let value = remove(doc, from)?;
            add(doc, path, value)
        }
        PatchOperation::Copy { from, path } => {
            let value = resolve(doc, from)?.clone();
            add(doc, path, value)
        }
        PatchOperation::Test { path, value } => {
            let actual = resolve(doc, path)?;
            if json_equal(actual, value) {
                Ok(())
            } else {
                Err(PatchError::TestFailed { path: path.clone() })
            }
        }
    }
}

fn parse(path: &str) -> Result<JsonPointer, PatchError> {
    JsonPointer::parse(path).map_err(|err| PatchError::pointer(path, err))
}

fn resolve<'a>(doc: &'a Value, path: &str) -> Result<&'a Value, PatchError> {
    let pointer = parse(path)?;
    let mut current = doc;
    for token in pointer.tokens() {
        current = match current {
            Value::Object(map) => map.get(token.as_str()),
            Value::Array(items) => parse_index(token).and_then(|i| items.get(i)),
            _ => None,
        }
        .ok_or_else(|| PatchError::PathNotFound {
            path: path.to_owned(),
        })?;
    }
    Ok(current)
}

fn resolve_mut<'a>(
    doc: &'a mut Value,
    tokens: &[String],
    path: &str,
) -> Result<&'a mut Value, PatchError> {
    let mut current = doc;
    for token in tokens {
        current = match current {
            Value::Object(map) => map.get_mut(token.as_str()),
            Value::Array(items) => parse_index(token).and_then(move |i| items.get_mut(i)),
            _ => None,
        }
        .ok_or_else(|| PatchError::PathNotFound {
            path: path.to_owned(),
        })?;
    }
    Ok(current)
}

fn add(doc: &mut Value, path: &str, value: Value) -> Result<(), PatchError> {
    let pointer = parse(path)?;
    let Some((parent_tokens, last)) = pointer.split_last() else {
        *doc = value;
        return Ok(());
    };
    match resolve_mut(doc, parent_tokens, path)? {
        Value::Object(map) => {
            map.insert(last.to_owned(), value);
            Ok(())
        }
        Value::Array(items) => {
            if last == "-" {
                items.push(value);
                return Ok(());
            }
            let index = array_index(last, path)?;
            if index > items.len() {
                return Err(PatchError::IndexOutOfBounds {
                    path: path.to_owned(),
                    index,
                    len: items.len(),
                });
            }
            items.insert(index, value);
            Ok(())
        }
        _ => Err(PatchError::NotAContainer {
            path: path.to_owned(),
        }),
    }
}

fn remove(doc: &mut Value, path: &str) -> Result<Value, PatchError> {
    let pointer = parse(path)?;
    let Some((parent_tokens, last)) = pointer.split_last() else {
        return Err(PatchError::RemoveRoot);
    };
    match resolve_mut(doc, parent_tokens, path)? {
        Value::Object(map) => map.remove(last).ok_or_else(|| PatchError::PathNotFound {
            path: path.to_owned(),
        }),
        Value::Array(items) => {
            let index = array_index(last, path)?;
            if index >= items.len() {
                return Err(PatchError::IndexOutOfBounds {
                    path: path.to_owned(),
                    index,
                    len: items.len(),
                });
            }
            Ok(items.remove(index))
        }
        _ => Err(PatchError::NotAContainer {
            path: path.to_owned(),
        }),
    }
}

fn replace(doc: &mut Value, path: &str, value: Value) -> Result<(), PatchError> {
    let pointer = parse(path)?;
    let target = resolve_mut(doc, pointer.tokens(), path)?;
    *target = value;
    Ok(())
}

fn array_index(token: &str, path: &str) -> Result<usize, PatchError> {
    parse_index(token).ok_or_else(|| PatchError::InvalidIndex {
        path: path.to_owned(),
        token: token.to_owned(),
    })
}

/// Structural equality where numbers compare by value, so `1` equals `1.0`.
pub fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (x.as_u64(), y.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => x.as_f64() == y.as_f64(),
            },
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| json_equal(x, y)))
        }
        _ => a == b,
    }
}
