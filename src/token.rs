//! Token identities for binding lookup.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::provider::Provider;

static NEXT_SYMBOL: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TokenId {
    /// Identity derived from a Rust type.
    Type(TypeId),
    /// Process-unique symbolic identity.
    Symbol(u64),
}

struct TokenInner {
    id: TokenId,
    name: String,
    default: Option<DefaultBinding>,
}

pub(crate) struct DefaultBinding {
    pub(crate) provider: Provider,
    pub(crate) provided_in: Option<String>,
}

/// Opaque identity used to request a binding from a container.
///
/// Tokens are compared and hashed by identity, never by name. Cloning a
/// token is cheap and yields the same identity; two calls to
/// [`Token::new`] with the same name produce distinct tokens, while two
/// calls to [`Token::of::<T>`] for the same `T` produce equal ones.
///
/// A symbolic token may carry a declared default binding via
/// [`Token::with_default`], optionally restricted to a named scope. The
/// binding is compiled lazily the first time a container without an
/// explicit provider for the token resolves it.
///
/// # Examples
///
/// ```rust
/// use strata_di::Token;
///
/// let a = Token::new("Config");
/// let b = a.clone();
/// assert_eq!(a, b);
/// assert_ne!(a, Token::new("Config"));
/// assert_eq!(Token::of::<u32>(), Token::of::<u32>());
/// ```
#[derive(Clone)]
pub struct Token {
    inner: Arc<TokenInner>,
}

impl Token {
    /// Creates a fresh symbolic token. Each call yields a new identity.
    pub fn new(name: impl Into<String>) -> Token {
        Token {
            inner: Arc::new(TokenInner {
                id: TokenId::Symbol(NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed)),
                name: name.into(),
                default: None,
            }),
        }
    }

    /// Creates the token identified by the type `T`. Stable across calls.
    pub fn of<T: 'static>() -> Token {
        Token {
            inner: Arc::new(TokenInner {
                id: TokenId::Type(TypeId::of::<T>()),
                name: std::any::type_name::<T>().to_string(),
                default: None,
            }),
        }
    }

    /// Creates a symbolic token carrying a declared default binding.
    ///
    /// `provided_in` restricts the binding to containers whose scope
    /// identifier matches; `None` leaves it unrestricted.
    pub fn with_default(
        name: impl Into<String>,
        provider: Provider,
        provided_in: Option<String>,
    ) -> Token {
        Token {
            inner: Arc::new(TokenInner {
                id: TokenId::Symbol(NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed)),
                name: name.into(),
                default: Some(DefaultBinding { provider, provided_in }),
            }),
        }
    }

    /// Display name for diagnostics.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub(crate) fn default_binding(&self) -> Option<&DefaultBinding> {
        self.inner.default.as_ref()
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({})", self.inner.name)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)
    }
}

/// Resolves to the container handling the resolution. Never cached.
pub static CONTAINER: Lazy<Token> = Lazy::new(|| Token::new("CONTAINER"));

/// A container's scope identifier, read once at build time (self, optional).
pub static CONTAINER_SCOPE: Lazy<Token> = Lazy::new(|| Token::new("CONTAINER_SCOPE"));

/// Multi token contributing interceptors to the declaring container's chain.
pub static INTERCEPTORS: Lazy<Token> = Lazy::new(|| Token::new("INTERCEPTORS"));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_not_name() {
        let a = Token::new("T");
        let b = Token::new("T");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn typed_tokens_are_stable() {
        assert_eq!(Token::of::<String>(), Token::of::<String>());
        assert_ne!(Token::of::<String>(), Token::of::<u32>());
    }
}
