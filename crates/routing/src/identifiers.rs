//! Cheap-to-clone identifiers for providers, incidents and suggestions.
//!
//! All identifiers use Arc<str> so they can be copied into every route and
//! navigation state without reallocating.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

macro_rules! impl_identifier {
    ($name:ident) => {
        #[derive(Clone, Debug, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn new(s: impl AsRef<str>) -> Self {
                Self(s.as_ref().into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.hash(state);
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::new(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

impl_identifier!(ProviderIdentifier);
impl_identifier!(IncidentIdentifier);
impl_identifier!(SuggestionIdentifier);

impl ProviderIdentifier {
    pub fn tomtom() -> Self {
        Self::new("tomtom")
    }

    pub fn osrm() -> Self {
        Self::new("osrm")
    }

    pub fn nominatim() -> Self {
        Self::new("nominatim")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_equality() {
        let id1 = ProviderIdentifier::new("osrm");
        let id2 = ProviderIdentifier::osrm();
        let id3 = id1.clone();

        assert_eq!(id1, id2);
        assert_eq!(id1, id3);
        assert!(Arc::ptr_eq(&id1.0, &id3.0));
    }

    #[test]
    fn test_identifier_display() {
        let id = IncidentIdentifier::new("inc-3");
        assert_eq!(format!("{}", id), "inc-3");
    }

    #[test]
    fn test_identifier_serializes_as_plain_string() {
        let id = ProviderIdentifier::tomtom();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"tomtom\"");

        let back: ProviderIdentifier = serde_json::from_str("\"tomtom\"").unwrap();
        assert_eq!(back, id);
    }
}
