//! Emptiness predicates for successful query data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Decides whether successful query data counts as "nothing to show".
///
/// `None` means the query succeeded without data.
pub trait EmptyPredicate<T: ?Sized> {
    fn is_empty(&self, data: Option<&T>) -> bool;
}

impl<T: ?Sized, F> EmptyPredicate<T> for F
where
    F: Fn(Option<&T>) -> bool,
{
    fn is_empty(&self, data: Option<&T>) -> bool {
        self(data)
    }
}

/// Missing or zero-length list.
pub fn array<U>(data: Option<&Vec<U>>) -> bool {
    data.map_or(true, |items| items.is_empty())
}

/// Missing value.
pub fn object<T>(data: Option<&T>) -> bool {
    data.is_none()
}

/// Missing or blank after trimming.
pub fn string<S: AsRef<str>>(data: Option<&S>) -> bool {
    data.map_or(true, |text| text.as_ref().trim().is_empty())
}

/// Built-in predicate selectable from configuration, applied to JSON payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyCondition {
    /// Missing, `null`, `[]` or `""`.
    #[default]
    Array,
    /// Missing or `null`.
    Object,
    /// Missing, `null`, or a string that is blank after trimming.
    String,
}

impl EmptyPredicate<Value> for EmptyCondition {
    fn is_empty(&self, data: Option<&Value>) -> bool {
        match (self, data) {
            (_, None | Some(Value::Null)) => true,
            (EmptyCondition::Array, Some(Value::Array(items))) => items.is_empty(),
            (EmptyCondition::Array, Some(Value::String(text))) => text.is_empty(),
            (EmptyCondition::String, Some(Value::String(text))) => text.trim().is_empty(),
            _ => false,
        }
    }
}
