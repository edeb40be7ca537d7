//! Container configuration.

use std::time::Duration;

/// Configuration owned by the root container and inherited by children.
///
/// There is no process-global policy: each container tree carries its own
/// options, fixed at build time.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use strata_di::{Container, ContainerOptions};
///
/// let root = Container::builder()
///     .options(ContainerOptions {
///         resolution_timeout: Duration::from_millis(50),
///         ..ContainerOptions::default()
///     })
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ContainerOptions {
    /// Deadline every pending asynchronous resolution races against.
    pub resolution_timeout: Duration,
    /// Successful resolutions slower than this are logged as warnings.
    pub slow_threshold: Duration,
    /// When true (default), a synchronous resolution whose factory yields
    /// a pending result is a hard error; when false it is logged and a
    /// [`PendingResolution`](crate::PendingResolution) is returned. The
    /// leaked handle also reaches dependent synchronous factories as a
    /// dependency argument, so their typed downcasts fail until someone
    /// awaits it.
    pub strict_async_boundary: bool,
    /// When true (default), registering into an already-resolved multi
    /// binding is a hard error; when false it is logged and ignored.
    pub strict_multi_injection: bool,
}

impl Default for ContainerOptions {
    fn default() -> ContainerOptions {
        ContainerOptions {
            resolution_timeout: Duration::from_secs(10),
            slow_threshold: Duration::from_millis(500),
            strict_async_boundary: true,
            strict_multi_injection: true,
        }
    }
}
