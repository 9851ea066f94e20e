//! Strongly-typed resource names.
//!
//! Cloud API resources are addressed by opaque strings. Wrapping each kind
//! in its own type keeps a site name from being passed where an environment
//! name is expected.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Macro to generate strongly-typed name wrapper types.
macro_rules! name_type {
    ($(#[$meta:meta])* $name:ident, $doc:expr) => {
        $(#[$meta])*
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new name wrapper.
            #[must_use]
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            /// Parses a name, rejecting empty input and the dot segments
            /// `.` and `..`.
            ///
            /// # Errors
            ///
            /// Returns an error if the string is empty, only whitespace, or a
            /// dot segment.
            pub fn parse_str(input: &str) -> Result<Self> {
                if input.trim().is_empty() {
                    return Err(Error::invalid_field(stringify!($name), "a non-empty name"));
                }
                if matches!(input, "." | "..") {
                    return Err(Error::invalid_field(
                        stringify!($name),
                        "a name other than `.` or `..`",
                    ));
                }
                Ok(Self(input.to_string()))
            }

            /// Returns the name as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Converts into the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl From<String> for $name {
            fn from(name: String) -> Self {
                Self(name)
            }
        }

        impl From<&str> for $name {
            fn from(name: &str) -> Self {
                Self(name.to_string())
            }
        }

        impl From<$name> for String {
            fn from(name: $name) -> Self {
                name.0
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::parse_str(s)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

name_type!(
    SiteName,
    "Site name in `stage:username` format (e.g. `devcloud:mysite`)."
);
name_type!(
    EnvironmentName,
    "Environment name (e.g. `prod`, `test`, `dev`)."
);
name_type!(ServerName, "Server name, the host's fifth-level domain label.");
name_type!(DatabaseName, "Database name within a site.");

impl SiteName {
    /// The hosting stage: the part before the first `:`, or the whole name
    /// when there is no `:`.
    #[must_use]
    pub fn hosting_stage(&self) -> &str {
        hosting_stage(&self.0)
    }
}

/// Hosting stage portion of a `stage:username` site name.
///
/// Names without a `:` are returned unchanged.
#[must_use]
pub fn hosting_stage(name: &str) -> &str {
    name.split_once(':').map_or(name, |(stage, _)| stage)
}
