//! Error types for the dependency injection container.

use std::fmt;

/// Dependency injection errors
///
/// Represents the error conditions that can occur during service
/// registration, typed-factory and proxy configuration, or resolution.
///
/// Configuration mistakes (`InvalidDescriptor`, `NotKeyed`, `NotInterface`,
/// `OriginalNotFound`, `RegistryNotSolidified`) are programmer errors and are
/// reported as early as possible. `NotFound` and `KeyedNotFound` are the
/// ordinary "no such service" outcome and are never wrapped by the proxy layer.
///
/// # Examples
///
/// ```rust
/// use ferrous_typed_di::{DiError, ServiceCollection, Resolver};
///
/// let provider = ServiceCollection::new().build();
/// match provider.get::<String>() {
///     Err(DiError::NotFound(type_name)) => {
///         assert_eq!(type_name, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_typed_di::DiError;
///
/// let not_keyed = DiError::NotKeyed("This service descriptor is not keyed.");
/// let circular = DiError::Circular(vec!["ServiceA".into(), "ServiceB".into(), "ServiceA".into()]);
///
/// assert_eq!(not_keyed.to_string(), "Invalid operation: This service descriptor is not keyed.");
/// assert_eq!(circular.to_string(), "Circular dependency: ServiceA -> ServiceB -> ServiceA");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum DiError {
    /// Service not registered
    NotFound(&'static str),
    /// Keyed service not registered
    KeyedNotFound {
        /// Type name of the requested service
        service: &'static str,
        /// Display form of the requested key
        key: String,
    },
    /// Type downcast failed
    TypeMismatch(&'static str),
    /// Circular dependency detected (includes path)
    Circular(Vec<String>),
    /// Invalid lifetime resolution (e.g., scoped from root)
    WrongLifetime(&'static str),
    /// Maximum recursion depth exceeded
    DepthExceeded(usize),
    /// A descriptor was built through a path it does not support
    InvalidDescriptor(String),
    /// Keyed accessor used on a non-keyed descriptor
    NotKeyed(&'static str),
    /// Proxy registration for a type that is not a proxyable interface
    NotInterface(&'static str),
    /// Implicit proxy registration found no original registration to replace
    OriginalNotFound(String),
    /// Generic proxy resolved before the proxy registry was solidified
    RegistryNotSolidified(String),
    /// Provider options could not be read
    InvalidOptions(String),
    /// An intercepted call finished without a return value of the expected type
    MissingReturnValue(String),
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::NotFound(name) => write!(f, "Service not found: {}", name),
            DiError::KeyedNotFound { service, key } => {
                write!(f, "Service not found: {} (key: {})", service, key)
            }
            DiError::TypeMismatch(name) => write!(f, "Type mismatch for: {}", name),
            DiError::Circular(path) => {
                write!(f, "Circular dependency: {}", path.join(" -> "))
            }
            DiError::WrongLifetime(msg) => write!(f, "Lifetime error: {}", msg),
            DiError::DepthExceeded(depth) => write!(f, "Max depth {} exceeded", depth),
            DiError::InvalidDescriptor(msg) => write!(f, "Invalid descriptor: {}", msg),
            DiError::NotKeyed(msg) => write!(f, "Invalid operation: {}", msg),
            DiError::NotInterface(name) => {
                write!(f, "Proxy requires an interface type, but {} is not a proxyable interface", name)
            }
            DiError::OriginalNotFound(msg) => write!(f, "Configuration error: {}", msg),
            DiError::RegistryNotSolidified(msg) => write!(f, "Configuration error: {}", msg),
            DiError::InvalidOptions(msg) => write!(f, "Invalid provider options: {}", msg),
            DiError::MissingReturnValue(method) => {
                write!(f, "Intercepted call {} produced no return value", method)
            }
        }
    }
}

impl std::error::Error for DiError {}

/// Result type for DI operations
///
/// A convenience type alias for `Result<T, DiError>` used throughout the crate.
///
/// # Examples
///
/// ```rust
/// use ferrous_typed_di::{DiResult, DiError};
///
/// fn failing_operation() -> DiResult<()> {
///     Err(DiError::NotFound("some_service"))
/// }
///
/// assert!(failing_operation().is_err());
/// ```
pub type DiResult<T> = Result<T, DiError>;
