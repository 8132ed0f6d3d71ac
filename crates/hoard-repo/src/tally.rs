//! Accumulated non-fatal errors of one operation.

use std::fmt;

/// Count and messages of the errors an operation recorded and got past.
///
/// Each operation owns its tally and hands it back in its report; callers
/// merge tallies upward. A non-empty tally makes the operation as a whole
/// fail even though every step after the error still ran.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorTally {
    messages: Vec<String>,
}

impl ErrorTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error and log it.
    pub fn record(&mut self, error: impl fmt::Display) {
        let message = error.to_string();
        tracing::error!("{message}");
        self.messages.push(message);
    }

    /// Fold another tally into this one.
    pub fn merge(&mut self, other: ErrorTally) {
        self.messages.extend(other.messages);
    }

    pub fn count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_clean(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

impl fmt::Display for ErrorTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.count() {
            0 => write!(f, "no errors"),
            1 => write!(f, "1 error"),
            n => write!(f, "{n} errors"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_and_merge() {
        let mut outer = ErrorTally::new();
        assert!(outer.is_clean());
        outer.record("first");

        let mut inner = ErrorTally::new();
        inner.record(std::io::Error::other("second"));
        outer.merge(inner);

        assert_eq!(outer.count(), 2);
        assert_eq!(outer.messages(), ["first", "second"]);
        assert_eq!(outer.to_string(), "2 errors");
    }
}
