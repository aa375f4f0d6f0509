//! Keys that hide an original registration behind an implicit proxy.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::key::ServiceKey;

const HASH_SEED: u32 = 870983858;

/// Service key under which an implicitly proxied service keeps its original
/// registration.
///
/// There are two modes:
///
/// - **Raw** wraps any key (or none). It equals only another raw key wrapping
///   an equal key.
/// - **String convention** renders as [`DEFAULT_STRING_PREFIX`] followed by the
///   wrapped string. It also equals, and hashes like, the plain
///   [`ServiceKey::Str`] with that exact text, so callers that only know the
///   convention can still reach the original service.
///
/// [`DEFAULT_STRING_PREFIX`]: OriginalServiceKey::DEFAULT_STRING_PREFIX
///
/// # Examples
///
/// ```rust
/// use ferrous_typed_di::{OriginalServiceKey, ServiceKey};
///
/// let wrapped = OriginalServiceKey::create_original_service_key(Some(ServiceKey::Int(3)));
/// assert_eq!(wrapped.original_key(), Some(ServiceKey::Int(3)));
/// assert_ne!(wrapped, OriginalServiceKey::DEFAULT);
///
/// let unkeyed = OriginalServiceKey::string_default();
/// assert_eq!(unkeyed.to_string(), OriginalServiceKey::DEFAULT_STRING_PREFIX);
/// assert!(unkeyed.original_key().is_none());
/// ```
#[derive(Debug, Clone)]
pub enum OriginalServiceKey {
    /// Wraps an arbitrary key; `None` stands for an unkeyed original
    Raw(Option<Box<ServiceKey>>),
    /// Wraps a string key rendered behind the default prefix
    StringConvention(Option<Cow<'static, str>>),
}

impl OriginalServiceKey {
    /// Prefix of every string-convention key.
    pub const DEFAULT_STRING_PREFIX: &'static str =
        "[ferrous_typed_di::proxy::OriginalServiceKey](ImplicitDefault)";

    /// Raw key for an unkeyed original.
    pub const DEFAULT: OriginalServiceKey = OriginalServiceKey::Raw(None);

    /// String-convention key for an unkeyed original.
    pub const fn string_default() -> Self {
        OriginalServiceKey::StringConvention(None)
    }

    /// Wraps `key`, choosing string mode for string keys and raw mode otherwise.
    ///
    /// This is the key implicit proxies rekey their originals under, so a keyed
    /// original stays reachable by its spelled-out string. Use
    /// [`create_raw_original_service_key`](Self::create_raw_original_service_key)
    /// to wrap a string key without the convention.
    pub fn create_original_service_key(key: Option<ServiceKey>) -> Self {
        match key {
            Some(ServiceKey::Str(s)) => OriginalServiceKey::StringConvention(Some(s)),
            other => OriginalServiceKey::Raw(other.map(Box::new)),
        }
    }

    /// Wraps any key in raw mode, string keys included.
    pub fn create_raw_original_service_key(key: Option<ServiceKey>) -> Self {
        OriginalServiceKey::Raw(key.map(Box::new))
    }

    /// Wraps a string key in string-convention mode.
    pub fn create_string_original_service_key(key: Option<&str>) -> Self {
        OriginalServiceKey::StringConvention(key.map(|k| Cow::Owned(k.to_owned())))
    }

    /// The key of the original registration.
    pub fn original_key(&self) -> Option<ServiceKey> {
        match self {
            OriginalServiceKey::Raw(inner) => inner.as_deref().cloned(),
            OriginalServiceKey::StringConvention(inner) => inner.clone().map(ServiceKey::Str),
        }
    }

    pub fn is_string_mode(&self) -> bool {
        matches!(self, OriginalServiceKey::StringConvention(_))
    }

    fn suffix(&self) -> Option<&str> {
        match self {
            OriginalServiceKey::StringConvention(inner) => Some(inner.as_deref().unwrap_or("")),
            OriginalServiceKey::Raw(_) => None,
        }
    }

    /// Whether a plain string key spells out this string-convention key.
    pub fn matches_str(&self, text: &str) -> bool {
        match self.suffix() {
            Some(suffix) => text
                .strip_prefix(Self::DEFAULT_STRING_PREFIX)
                .map_or(false, |rest| rest == suffix),
            None => false,
        }
    }

    /// Full rendered text of a string-convention key.
    pub fn rendered(&self) -> Option<String> {
        self.suffix()
            .map(|suffix| format!("{}{}", Self::DEFAULT_STRING_PREFIX, suffix))
    }
}

impl Default for OriginalServiceKey {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl PartialEq for OriginalServiceKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (OriginalServiceKey::Raw(a), OriginalServiceKey::Raw(b)) => a == b,
            (OriginalServiceKey::StringConvention(_), OriginalServiceKey::StringConvention(_)) => {
                self.suffix() == other.suffix()
            }
            _ => false,
        }
    }
}

impl Eq for OriginalServiceKey {}

impl Hash for OriginalServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            OriginalServiceKey::StringConvention(_) => {
                // Must agree with ServiceKey::Str of the rendered text
                let rendered = self.rendered().unwrap_or_default();
                0u8.hash(state);
                rendered.as_str().hash(state);
            }
            OriginalServiceKey::Raw(inner) => {
                2u8.hash(state);
                HASH_SEED.hash(state);
                if let Some(key) = inner {
                    key.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for OriginalServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginalServiceKey::StringConvention(_) => {
                f.write_str(Self::DEFAULT_STRING_PREFIX)?;
                f.write_str(self.suffix().unwrap_or(""))
            }
            OriginalServiceKey::Raw(Some(inner)) => write!(f, "original({})", inner),
            OriginalServiceKey::Raw(None) => f.write_str("original(default)"),
        }
    }
}
