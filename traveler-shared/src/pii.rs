use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps personal data (emails) so it never shows up in `Debug`/`Display` output.
/// Serialization still emits the real value since API responses need it.
#[derive(Clone, Deserialize, PartialEq, Eq)]
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
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl From<&str> for Masked<String> {
    fn from(value: &str) -> Self {
        Masked(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masked_hides_value_in_logs() {
        let email = Masked::from("traveler@example.com");
        assert_eq!(format!("{}", email), "********");
        assert_eq!(format!("{:?}", email), "********");
    }

    #[test]
    fn test_masked_serializes_real_value() {
        let email = Masked::from("traveler@example.com");
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"traveler@example.com\"");
        assert_eq!(email.into_inner(), "traveler@example.com");
    }
}
