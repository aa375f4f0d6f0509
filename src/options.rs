//! Provider build options.

#[cfg(feature = "config")]
use crate::error::{DiError, DiResult};

/// Options controlling how a `ServiceProvider` is built and how it resolves.
///
/// # Examples
///
/// ```rust
/// use ferrous_typed_di::{ServiceCollection, ServiceProviderOptions, Resolver};
///
/// let mut services = ServiceCollection::new();
/// services.add_scoped_factory::<String, _>(|_| "per-scope".to_string());
///
/// let options = ServiceProviderOptions { validate_scopes: false, ..Default::default() };
/// let provider = services.build_with_options(options).unwrap();
///
/// // Without scope validation the root provider acts as its own scope
/// assert_eq!(&*provider.get_required::<String>(), "per-scope");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ServiceProviderOptions {
    /// Reject scoped services resolved from the root provider
    pub validate_scopes: bool,
    /// Construct every exact singleton during build and report the first failure
    pub validate_on_build: bool,
}

impl Default for ServiceProviderOptions {
    fn default() -> Self {
        Self {
            validate_scopes: true,
            validate_on_build: false,
        }
    }
}

#[cfg(feature = "config")]
impl ServiceProviderOptions {
    /// Reads options from JSON; missing fields take their defaults.
    ///
    /// ```rust
    /// use ferrous_typed_di::ServiceProviderOptions;
    ///
    /// let options = ServiceProviderOptions::from_json(r#"{ "validate_on_build": true }"#).unwrap();
    /// assert!(options.validate_scopes);
    /// assert!(options.validate_on_build);
    /// ```
    pub fn from_json(json: &str) -> DiResult<Self> {
        serde_json::from_str(json).map_err(|e| DiError::InvalidOptions(e.to_string()))
    }

    pub fn to_json(&self) -> DiResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DiError::InvalidOptions(e.to_string()))
    }
}

#[cfg(all(test, feature = "config"))]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip_keeps_flags() {
        let options = ServiceProviderOptions { validate_scopes: false, validate_on_build: true };
        let json = options.to_json().unwrap();
        assert_eq!(ServiceProviderOptions::from_json(&json).unwrap(), options);
    }

    #[test]
    fn malformed_json_is_invalid_options() {
        let err = ServiceProviderOptions::from_json("{ validate_scopes: ").unwrap_err();
        assert!(matches!(err, DiError::InvalidOptions(_)));
    }
}
