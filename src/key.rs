//! Service key types for the dependency injection container.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::proxy::OriginalServiceKey;
use crate::service_type::ServiceType;

/// Key distinguishing several registrations of the same service type.
///
/// Unkeyed registrations use `Option<ServiceKey>::None`. The `Original`
/// variant is reserved for the proxy layer, which re-registers a service under
/// an [`OriginalServiceKey`] before putting the proxy in its place.
///
/// A string-convention original key equals the plain string key that spells
/// out the same text, in both directions, and hashes identically.
///
/// # Examples
///
/// ```rust
/// use ferrous_typed_di::{ServiceKey, OriginalServiceKey};
///
/// let plain: ServiceKey = "primary".into();
/// let number: ServiceKey = 7i64.into();
/// assert_ne!(plain, number);
///
/// let original = ServiceKey::Original(OriginalServiceKey::create_string_original_service_key(Some("primary")));
/// let spelled = ServiceKey::from(format!("{}primary", OriginalServiceKey::DEFAULT_STRING_PREFIX));
/// assert_eq!(original, spelled);
/// assert_eq!(spelled, original);
/// ```
#[derive(Debug, Clone)]
pub enum ServiceKey {
    /// String key
    Str(Cow<'static, str>),
    /// Integer key
    Int(i64),
    /// Proxy-layer key that hides an original registration
    Original(OriginalServiceKey),
}

impl ServiceKey {
    /// Borrow the string form, if this is a string key.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ServiceKey::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for ServiceKey {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ServiceKey::Str(a), ServiceKey::Str(b)) => a == b,
            (ServiceKey::Int(a), ServiceKey::Int(b)) => a == b,
            (ServiceKey::Original(a), ServiceKey::Original(b)) => a == b,
            (ServiceKey::Str(s), ServiceKey::Original(o))
            | (ServiceKey::Original(o), ServiceKey::Str(s)) => o.matches_str(s),
            _ => false,
        }
    }
}

impl Eq for ServiceKey {}

impl Hash for ServiceKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ServiceKey::Str(s) => {
                let text: &str = s;
                0u8.hash(state);
                text.hash(state);
            }
            ServiceKey::Int(n) => {
                1u8.hash(state);
                n.hash(state);
            }
            // String-convention originals hash through the same 0u8 arm
            ServiceKey::Original(original) => original.hash(state),
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKey::Str(s) => f.write_str(s),
            ServiceKey::Int(n) => write!(f, "{}", n),
            ServiceKey::Original(original) => write!(f, "{}", original),
        }
    }
}

impl From<&'static str> for ServiceKey {
    fn from(value: &'static str) -> Self {
        ServiceKey::Str(Cow::Borrowed(value))
    }
}

impl From<String> for ServiceKey {
    fn from(value: String) -> Self {
        ServiceKey::Str(Cow::Owned(value))
    }
}

impl From<i64> for ServiceKey {
    fn from(value: i64) -> Self {
        ServiceKey::Int(value)
    }
}

impl From<i32> for ServiceKey {
    fn from(value: i32) -> Self {
        ServiceKey::Int(value as i64)
    }
}

impl From<OriginalServiceKey> for ServiceKey {
    fn from(value: OriginalServiceKey) -> Self {
        ServiceKey::Original(value)
    }
}

/// Key for service storage and lookup.
///
/// Pairs the service type with an optional service key. This is the identity
/// of a registration in the exact-match table and the frame pushed on the
/// circular-dependency stack.
///
/// # Examples
///
/// ```rust
/// use ferrous_typed_di::{Key, ServiceKey, ServiceType, key_of_type};
///
/// let plain = key_of_type::<u32>();
/// let keyed = Key::new(ServiceType::of::<u32>(), Some(ServiceKey::from("port")));
///
/// assert_ne!(plain, keyed);
/// assert_eq!(plain.display_name(), "u32");
/// assert_eq!(keyed.to_string(), "u32 (key: port)");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    /// Service type token
    pub service: ServiceType,
    /// Optional service key
    pub service_key: Option<ServiceKey>,
}

impl Key {
    pub fn new(service: ServiceType, service_key: Option<ServiceKey>) -> Self {
        Self { service, service_key }
    }

    /// Get the type or trait name for display
    ///
    /// Returns the `std::any::type_name` of the service type.
    pub fn display_name(&self) -> &'static str {
        self.service.name()
    }

    pub fn is_keyed(&self) -> bool {
        self.service_key.is_some()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.service_key {
            Some(key) => write!(f, "{} (key: {})", self.service.name(), key),
            None => f.write_str(self.service.name()),
        }
    }
}

// Helper function for creating type keys - add aggressive inlining
#[inline(always)]
pub fn key_of_type<T: 'static>() -> Key {
    Key::new(ServiceType::of::<T>(), None)
}
