//! Disposal traits for resource teardown.

/// Trait for synchronous resource teardown.
///
/// Implement this for instances that need structured cleanup (flushing
/// caches, closing handles). Mark the provider with
/// [`Provider::disposable`](crate::Provider::disposable) so the container
/// tears the instance down, in reverse creation order, when
/// [`Container::destroy`](crate::Container::destroy) runs.
///
/// # Examples
///
/// ```rust
/// use strata_di::{Container, Dispose, Provider, Token};
///
/// struct Cache {
///     name: String,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) {
///         println!("flushing {}", self.name);
///     }
/// }
///
/// let cache = Token::new("Cache");
/// let root = Container::builder()
///     .provide(&cache, Provider::value(Cache { name: "users".into() }).disposable::<Cache>())
///     .build()
///     .unwrap();
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}

/// Trait for asynchronous resource teardown.
///
/// Implement this for instances whose cleanup awaits I/O (graceful
/// connection shutdown). Async teardown handles are collected during
/// `destroy()` and awaited together; individual failures never abort the
/// remaining teardown.
#[async_trait::async_trait]
pub trait AsyncDispose: Send + Sync + 'static {
    /// Perform asynchronous cleanup of resources.
    async fn dispose(&self);
}
