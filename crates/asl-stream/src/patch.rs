use serde_json::Value;

use crate::commit::PatchOp;
use crate::error::{StreamError, StreamResult};

/// Split a slash-delimited pointer into unescaped tokens.
///
/// `""` and `"/"` address the whole document. A missing leading slash is
/// tolerated, so `"a/b"` and `"/a/b"` are the same path.
fn tokens(path: &str) -> Vec<String> {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    if trimmed.is_empty() {
        return Vec::new();
    }
    trimmed
        .split('/')
        .map(|t| t.replace("~1", "/").replace("~0", "~"))
        .collect()
}

fn child<'a>(value: &'a Value, token: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => map.get(token),
        Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(value: &'a mut Value, token: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => map.get_mut(token),
        Value::Array(items) => token.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
        _ => None,
    }
}

/// Look up the value at `path`. `None` when any segment is missing.
pub fn get<'a>(content: &'a Value, path: &str) -> Option<&'a Value> {
    tokens(path)
        .iter()
        .try_fold(content, |value, token| child(value, token))
}

/// Apply patch operations in order to a copy of `content`.
///
/// Any failing operation fails the whole patch and `content` is unchanged.
pub fn apply_patch(content: &Value, ops: &[PatchOp]) -> StreamResult<Value> {
    let mut doc = content.clone();
    for op in ops {
        apply_op(&mut doc, op)?;
    }
    Ok(doc)
}

fn apply_op(doc: &mut Value, op: &PatchOp) -> StreamResult<()> {
    let path = op.path();
    let invalid = |reason: &str| StreamError::InvalidPatch {
        path: path.to_string(),
        reason: reason.to_string(),
    };

    let mut tokens = tokens(path);
    let Some(last) = tokens.pop() else {
        return match op {
            PatchOp::Add { value, .. } | PatchOp::Replace { value, .. } => {
                *doc = value.clone();
                Ok(())
            }
            PatchOp::Remove { .. } => Err(invalid("cannot remove the document root")),
        };
    };

    let mut parent = &mut *doc;
    for token in &tokens {
        parent = child_mut(parent, token).ok_or_else(|| invalid("parent does not exist"))?;
    }

    match (op, parent) {
        (PatchOp::Add { value, .. }, Value::Object(map)) => {
            map.insert(last, value.clone());
        }
        (PatchOp::Add { value, .. }, Value::Array(items)) => {
            let index = if last == "-" {
                items.len()
            } else {
                last.parse::<usize>()
                    .ok()
                    .filter(|i| *i <= items.len())
                    .ok_or_else(|| invalid("array index out of range"))?
            };
            items.insert(index, value.clone());
        }
        (PatchOp::Replace { value, .. }, parent) => {
            let target = child_mut(parent, &last).ok_or_else(|| invalid("target does not exist"))?;
            *target = value.clone();
        }
        (PatchOp::Remove { .. }, Value::Object(map)) => {
            map.remove(&last).ok_or_else(|| invalid("target does not exist"))?;
        }
        (PatchOp::Remove { .. }, Value::Array(items)) => {
            let index = last
                .parse::<usize>()
                .ok()
                .filter(|i| *i < items.len())
                .ok_or_else(|| invalid("array index out of range"))?;
            items.remove(index);
        }
        _ => return Err(invalid("parent is not a container")),
    }
    Ok(())
}
