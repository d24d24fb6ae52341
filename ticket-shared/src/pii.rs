use serde::{Serialize, Serializer};
use std::fmt;

/// Wraps personally identifiable data (e-mail addresses, requester ids) so that
/// `Debug` and `Display` never print it. Serialization still emits the real value,
/// which API responses need.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Borrow the unmasked value. Callers own the decision to expose it.
    pub fn expose(&self) -> &T {
        &self.0
    }
}
