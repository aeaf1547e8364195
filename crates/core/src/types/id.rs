//! Newtype IDs for type-safe entity references.
//!
//! Customer and merchant identifiers come from outside this system (the
//! identity provider and the merchant onboarding flow), so they are opaque
//! strings. Use the `define_id!` macro to create wrappers that prevent
//! accidentally passing a merchant ID where a customer ID is expected.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors that can occur when parsing an external identifier.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input string is empty or whitespace.
    #[error("{kind} cannot be empty")]
    Empty {
        /// Which identifier was being parsed.
        kind: &'static str,
    },
    /// The input string is too long.
    #[error("{kind} must be at most {max} characters")]
    TooLong {
        /// Which identifier was being parsed.
        kind: &'static str,
        /// Maximum allowed length.
        max: usize,
    },
}

/// Maximum length of an external identifier.
pub const MAX_ID_LENGTH: usize = 128;

/// Macro to define a type-safe external ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` as a plain string, validated on the way in
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `parse()` which trims and rejects empty or oversized values
/// - `sqlx` `Type`, `Encode`, and `Decode` implementations (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use loyalty_core::define_id;
/// define_id!(TerminalId, "terminal id");
///
/// let id = TerminalId::parse(" term-1 ").unwrap();
/// assert_eq!(id.as_str(), "term-1");
/// assert!(TerminalId::parse("   ").is_err());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident, $kind:literal) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse an ID, trimming surrounding whitespace.
            ///
            /// # Errors
            ///
            /// Returns an error if the trimmed input is empty or longer than
            /// [`MAX_ID_LENGTH`]($crate::types::id::MAX_ID_LENGTH) characters.
            pub fn parse(s: &str) -> ::core::result::Result<Self, $crate::types::id::IdError> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err($crate::types::id::IdError::Empty { kind: $kind });
                }
                if trimmed.chars().count() > $crate::types::id::MAX_ID_LENGTH {
                    return Err($crate::types::id::IdError::TooLong {
                        kind: $kind,
                        max: $crate::types::id::MAX_ID_LENGTH,
                    });
                }
                Ok(Self(trimmed.to_owned()))
            }

            /// Returns the ID as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $name {
            type Error = $crate::types::id::IdError;

            fn try_from(value: String) -> ::core::result::Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::id::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <String as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <String as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                let raw = <String as ::sqlx::Decode<::sqlx::Postgres>>::decode(value)?;
                Ok(Self::parse(&raw)?)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <String as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_id!(CustomerId, "customer id");
define_id!(MerchantId, "merchant id");

/// Internal ID of a reward ledger entry.
///
/// Generated by this system when an entry is created, unlike customer and
/// merchant IDs which are assigned elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type), sqlx(transparent))]
pub struct LedgerEntryId(Uuid);

impl LedgerEntryId {
    /// Generate a fresh random ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Get the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for LedgerEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_whitespace() {
        let id = CustomerId::parse("  did:privy:abc123 ").unwrap();
        assert_eq!(id.as_str(), "did:privy:abc123");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(
            MerchantId::parse("   ").unwrap_err(),
            IdError::Empty {
                kind: "merchant id"
            }
        );
    }

    #[test]
    fn test_parse_rejects_too_long() {
        let long = "m".repeat(MAX_ID_LENGTH + 1);
        assert!(matches!(
            MerchantId::parse(&long),
            Err(IdError::TooLong { .. })
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: CustomerId = serde_json::from_str("\"cust-1\"").unwrap();
        assert_eq!(ok.to_string(), "cust-1");

        let err = serde_json::from_str::<CustomerId>("\"\"");
        assert!(err.is_err());
    }

    #[test]
    fn test_ledger_entry_ids_are_unique() {
        assert_ne!(LedgerEntryId::generate(), LedgerEntryId::generate());
    }
}
