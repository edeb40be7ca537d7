//! Error types for the dependency-resolution container.

use std::fmt;

/// Resolution and registration errors.
///
/// Every failure surfaced by the container carries the name of the token it
/// concerns, so call sites can trace a failed lookup without a debugger.
///
/// # Examples
///
/// ```rust
/// use strata_di::{Container, Token, DiError};
///
/// let root = Container::builder().build().unwrap();
/// let missing = Token::new("MISSING");
/// match root.get::<u32>(&missing) {
///     Err(DiError::NoProvider(name)) => assert_eq!(name, "MISSING"),
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Debug, Clone)]
pub enum DiError {
    /// No provider registered for the token (suppressed by the optional flag)
    NoProvider(String),
    /// Malformed provider shape for the token
    InvalidProvider(String),
    /// Contradictory resolution flags (e.g. skip-self combined with self-only)
    InvalidFlags(&'static str),
    /// Typed lookup downcast failed
    TypeMismatch(String),
    /// Synchronous re-entry on a record with an in-flight async resolution
    ConcurrentResolution(String),
    /// Cycle routed through a provider form that cannot host a placeholder
    CyclicUnsupported(String),
    /// Cycle detected on the asynchronous resolution path (includes the chain)
    AsyncCycle(Vec<String>),
    /// Pending resolution exceeded the configured deadline
    Timeout { token: String, millis: u64 },
    /// Multiple contributing providers failed; one reason per entry
    Aggregate(Vec<String>),
    /// `set` attempted to overwrite an already-instantiated single binding
    AlreadyInstantiated(String),
    /// `set` attempted to append to an already-resolved multi binding
    MultiAfterResolution(String),
    /// Operation against a destroyed container that required a value
    Destroyed(String),
    /// Visibility-restricted binding looked up across a container boundary
    ScopeMismatch(String),
    /// Second scope/transient/admission/custom-factory hook on one token
    DuplicateHook { token: String, kind: &'static str },
    /// Synchronous resolution produced a pending asynchronous result
    SyncResolvedAsync(String),
    /// Failure raised by user construction logic
    Construction(String),
    /// An error annotated with the token whose resolution raised it
    WithToken { token: String, source: Box<DiError> },
}

impl DiError {
    /// Annotates an error with the token it was raised for. Repeated
    /// annotation with the same token collapses to a single frame.
    pub fn with_token(self, token: &str) -> DiError {
        if let DiError::WithToken { token: t, .. } = &self {
            if t == token {
                return self;
            }
        }
        DiError::WithToken {
            token: token.to_string(),
            source: Box::new(self),
        }
    }

    /// Unwraps token annotations down to the originating error.
    pub fn root_cause(&self) -> &DiError {
        match self {
            DiError::WithToken { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::NoProvider(name) => write!(f, "No provider for {}", name),
            DiError::InvalidProvider(name) => write!(
                f,
                "Invalid provider definition for token: {}. \
                 Ensure a value, delegate, factory or class form is configured.",
                name
            ),
            DiError::InvalidFlags(msg) => write!(f, "Invalid resolution flags: {}", msg),
            DiError::TypeMismatch(name) => write!(f, "Type mismatch for: {}", name),
            DiError::ConcurrentResolution(name) => write!(
                f,
                "Token '{}' is currently being resolved asynchronously. \
                 Use the async path or await the parent resolution.",
                name
            ),
            DiError::CyclicUnsupported(name) => write!(
                f,
                "Cannot create a cyclic placeholder for '{}'. \
                 Factory providers do not support cyclic dependencies.",
                name
            ),
            DiError::AsyncCycle(path) => {
                write!(f, "Cyclic dependency in async resolution: {}", path.join(" -> "))
            }
            DiError::Timeout { token, millis } => {
                write!(f, "Async resolution timeout after {}ms for token: {}", millis, token)
            }
            DiError::Aggregate(reasons) => {
                write!(f, "Multiple dependency failures: {}", reasons.join("; "))
            }
            DiError::AlreadyInstantiated(name) => write!(
                f,
                "Cannot overwrite provider for '{}' because it has already been instantiated.",
                name
            ),
            DiError::MultiAfterResolution(name) => write!(
                f,
                "Cannot add a provider to the already resolved multi-token '{}'.",
                name
            ),
            DiError::Destroyed(name) => {
                write!(f, "Container destroyed during access to: {}", name)
            }
            DiError::ScopeMismatch(name) => {
                write!(f, "No provider for {} (private to its defining container)", name)
            }
            DiError::DuplicateHook { token, kind } => {
                write!(f, "Duplicate {} hook on {}", kind, token)
            }
            DiError::SyncResolvedAsync(name) => write!(
                f,
                "Synchronous resolution of '{}' produced a pending asynchronous result. \
                 Resolve it asynchronously or keep its dependencies synchronous.",
                name
            ),
            DiError::Construction(msg) => write!(f, "Construction failed: {}", msg),
            DiError::WithToken { token, source } => write!(f, "{}  -> {}", source, token),
        }
    }
}

impl std::error::Error for DiError {}

/// Result type for container operations.
pub type DiResult<T> = Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_token_collapses_repeats() {
        let e = DiError::NoProvider("A".into())
            .with_token("B")
            .with_token("B");
        match &e {
            DiError::WithToken { token, source } => {
                assert_eq!(token, "B");
                assert!(matches!(**source, DiError::NoProvider(_)));
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(matches!(e.root_cause(), DiError::NoProvider(_)));
    }

    #[test]
    fn display_names_token() {
        let e = DiError::Timeout { token: "Db".into(), millis: 50 };
        assert_eq!(e.to_string(), "Async resolution timeout after 50ms for token: Db");
    }
}
