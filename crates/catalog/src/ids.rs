//! Catalog keys.
//!
//! Service types and material types are keyed by their name, services by a
//! short code and materials by a positive integer surrogate.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use costbook_core::{DomainError, DomainResult};

macro_rules! impl_name_key {
    ($t:ident, $label:literal, $max:expr) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $t(String);

        impl $t {
            pub fn new(value: impl Into<String>) -> DomainResult<Self> {
                let value = value.into();
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    return Err(DomainError::invalid_id(concat!($label, " cannot be empty")));
                }
                if trimmed.chars().count() > $max {
                    return Err(DomainError::invalid_id(format!(
                        "{} must be at most {} characters",
                        $label, $max
                    )));
                }
                Ok(Self(trimmed.to_string()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_name_key!(ServiceTypeName, "service type name", 50);
impl_name_key!(MaterialTypeName, "material type name", 50);
impl_name_key!(ServiceCode, "service code", 10);

/// Surrogate key of a material.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct MaterialId(i32);

impl MaterialId {
    pub fn new(value: i32) -> DomainResult<Self> {
        if value <= 0 {
            return Err(DomainError::invalid_id(format!("material id must be positive (got {value})")));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl core::fmt::Display for MaterialId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for MaterialId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i32>()
            .map_err(|e| DomainError::invalid_id(format!("material id: {e}")))?;
        Self::new(value)
    }
}

impl TryFrom<i32> for MaterialId {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MaterialId> for i32 {
    fn from(value: MaterialId) -> Self {
        value.0
    }
}
