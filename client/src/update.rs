use serde::{Deserialize, Serialize};

/// The result of a reaction handler: either a new value for its output, or an
/// explicit "leave it as it is".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Update<T> {
    NoUpdate,
    Set(T),
}

impl<T> Update<T> {
    pub fn is_no_update(&self) -> bool {
        matches!(self, Update::NoUpdate)
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Update::Set(_))
    }

    pub fn as_ref(&self) -> Update<&T> {
        match self {
            Update::NoUpdate => Update::NoUpdate,
            Update::Set(v) => Update::Set(v),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Update<U> {
        match self {
            Update::NoUpdate => Update::NoUpdate,
            Update::Set(v) => Update::Set(f(v)),
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Update::NoUpdate => None,
            Update::Set(v) => Some(v),
        }
    }
}

impl<T> Default for Update<T> {
    fn default() -> Self {
        Update::NoUpdate
    }
}

impl<T> From<Option<T>> for Update<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Update::Set(v),
            None => Update::NoUpdate,
        }
    }
}
