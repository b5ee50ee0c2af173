// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job and worker identifiers.
//!
//! The scheduler tags every queued task with the job and worker it runs
//! under, so ids get copied constantly: into tasks, trace entries, and the
//! job lookup table. They are stored inline (`Copy`, no heap) as
//! `{4-char kind prefix}{19-char nanoid}` strings.

/// Exact byte length of a minted id: 4 prefix bytes + 19 nanoid bytes.
pub const ID_LEN: usize = 23;

/// Inline id storage: at most [`ID_LEN`] ASCII bytes, `Copy`.
///
/// Parsed ids may be shorter (hosts sometimes mint their own); anything
/// longer is rejected at the serde boundary and debug-asserted elsewhere.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct InlineId {
    len: u8,
    bytes: [u8; ID_LEN],
}

impl InlineId {
    pub fn new(s: &str) -> Self {
        debug_assert!(s.len() <= ID_LEN, "id longer than {ID_LEN} bytes: {s:?}");
        let len = s.len().min(ID_LEN);
        let mut bytes = [0u8; ID_LEN];
        bytes[..len].copy_from_slice(&s.as_bytes()[..len]);
        Self { len: len as u8, bytes }
    }

    pub fn as_str(&self) -> &str {
        // Construction is &str-only, so the active bytes are valid UTF-8.
        match std::str::from_utf8(&self.bytes[..self.len as usize]) {
            Ok(s) => s,
            Err(_) => unreachable!("id bytes not UTF-8"),
        }
    }
}

// Hash and Borrow agree with `str`, so id-keyed maps accept `&str` lookups.
impl std::hash::Hash for InlineId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl std::borrow::Borrow<str> for InlineId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Debug for InlineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl std::fmt::Display for InlineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for InlineId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for InlineId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = <&str>::deserialize(deserializer)?;
        if s.len() > ID_LEN {
            return Err(serde::de::Error::custom(format!(
                "id longer than {ID_LEN} bytes: {s:?}"
            )));
        }
        Ok(InlineId::new(s))
    }
}

/// Declare an id newtype with a fixed kind prefix.
///
/// `JobId` and `WorkerId` are declared this way. `new()` mints a random
/// id; `from_string()` re-wraps ids arriving from hosts or documents.
/// The generated impls cover exactly what the scheduler needs: `Display`,
/// string conversions/comparisons, and `Borrow<str>` for map lookups.
///
/// ```ignore
/// crate::define_id! {
///     /// One `post()` against a flow.
///     pub struct JobId("job-");
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($prefix:literal);
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $crate::id::InlineId);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Mint a fresh random id with the kind prefix.
            pub fn new() -> Self {
                Self($crate::id::InlineId::new(&format!(
                    "{}{}",
                    Self::PREFIX,
                    nanoid::nanoid!(19)
                )))
            }

            /// Wrap an existing id string (host-supplied or deserialized).
            pub fn from_string(id: impl AsRef<str>) -> Self {
                Self($crate::id::InlineId::new(id.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.0.as_str())
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from_string(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::from_string(s)
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0.as_str() == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0.as_str() == *other
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.0.as_str()
            }
        }
    };
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
