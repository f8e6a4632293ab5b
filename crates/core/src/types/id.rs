//! Newtype IDs for type-safe entity references.
//!
//! The marketplace API hands out opaque string identifiers. The `define_id!`
//! macro wraps them so a district id can never be passed where a province id
//! is expected.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `new()`, `as_str()`, `into_inner()`, `is_blank()`
/// - `Display`, `From<String>`, `From<&str>`, `AsRef<str>`
///
/// # Example
///
/// ```rust
/// # use ocop_core::define_id;
/// define_id!(ShopId);
/// define_id!(OrderId);
///
/// let shop = ShopId::new("42");
/// assert_eq!(shop.as_str(), "42");
///
/// // These are different types, so this won't compile:
/// // let _: OrderId = shop;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
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
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from anything string-like.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }

            /// Whether the identifier is empty or whitespace only.
            #[must_use]
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId);
define_id!(StoreId);
define_id!(ProductId);
define_id!(ProvinceId);
define_id!(DistrictId);
define_id!(WardId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_ids() {
        assert!(StoreId::new("").is_blank());
        assert!(StoreId::new("  ").is_blank());
        assert!(!StoreId::new("s-1").is_blank());
    }

    #[test]
    fn test_ids_are_transparent_in_json() {
        let id = ProvinceId::new("01");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"01\"");
        let back: ProvinceId = serde_json::from_str("\"01\"").unwrap();
        assert_eq!(back, id);
    }
}
