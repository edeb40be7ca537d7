//! Dynamic property surface for class-bound instances.

use futures::future::BoxFuture;

use crate::{DiResult, Instance};

/// Dynamic property access for instances produced by class providers.
///
/// Class providers use this surface for declared property injection, and
/// the cyclic-dependency placeholder uses it to replay properties written
/// during a cyclic window onto the real instance once it exists. Types
/// whose providers declare no property injection and never sit inside a
/// cycle can rely on the default no-op implementations.
///
/// `on_init` runs after construction and property injection, before
/// interceptors. An implementation with asynchronous initialization work
/// returns it from `on_init_async`; the future is awaited on the
/// asynchronous resolution path and reported through the configured
/// sync/async boundary policy on the synchronous one.
pub trait Injectable: Send + Sync + 'static {
    /// Stores `value` under `name`. Declared property injection and cyclic
    /// property replay arrive through this method.
    fn inject_property(&self, name: &str, value: Instance) {
        let _ = (name, value);
    }

    /// Reads the property stored under `name`, if any.
    fn get_property(&self, name: &str) -> Option<Instance> {
        let _ = name;
        None
    }

    /// Synchronous post-construction initialization.
    fn on_init(&self) -> DiResult<()> {
        Ok(())
    }

    /// Asynchronous post-construction initialization, if any.
    fn on_init_async(&self) -> Option<BoxFuture<'static, DiResult<()>>> {
        None
    }
}
