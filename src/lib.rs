//! # strata-di
//!
//! Hierarchical, runtime dependency-resolution container with sync/async
//! duality, cyclic-dependency placeholders, and a pluggable lifecycle
//! hook system.
//!
//! ## Features
//!
//! - **Hierarchical containers**: parent-chained registries with shadowing,
//!   self-only / skip-self lookup flags, and private (container-local) bindings
//! - **Lazy records**: providers compile into per-container records; values
//!   are built on first request, cached, and torn down in reverse creation order
//! - **Cyclic guard**: class-provider cycles resolve through a deferred
//!   placeholder with identity restored after construction
//! - **Async governance**: joinable in-flight resolutions, configurable
//!   timeout race, slow-path warnings, transactional multi-provider rollback
//! - **Lifecycle hooks**: per-token admission/scope/transience checks,
//!   custom factory wrappers, and ordered before/after/error/dispose listeners
//! - **Ambient container**: construction code can resolve further tokens
//!   through [`inject`] without explicit plumbing, isolated per logical chain
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use strata_di::{arg, Container, Dep, Provider, Token};
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let db = Token::new("Database");
//! let users = Token::new("UserService");
//!
//! let root = Container::builder()
//!     .provide(&db, Provider::value(Database {
//!         url: "postgres://localhost".to_string(),
//!     }))
//!     .provide(&users, Provider::factory(vec![Dep::new(&db)], |args| {
//!         Ok(Arc::new(UserService { db: arg::<Database>(args, 0)? }))
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let service = root.get::<UserService>(&users).unwrap();
//! assert_eq!(service.db.url, "postgres://localhost");
//!
//! // Cached: the second lookup returns the identical instance.
//! assert!(Arc::ptr_eq(&service, &root.get::<UserService>(&users).unwrap()));
//! ```
//!
//! ## Hierarchy
//!
//! ```rust
//! use strata_di::{Container, InjectFlags, Provider, Token};
//!
//! let port = Token::new("Port");
//! let root = Container::builder()
//!     .provide(&port, Provider::value(80u16))
//!     .build()
//!     .unwrap();
//! let child = Container::builder()
//!     .parent(&root)
//!     .provide(&port, Provider::value(8080u16))
//!     .build()
//!     .unwrap();
//!
//! // A child's own binding shadows the ancestor's.
//! assert_eq!(*child.get::<u16>(&port).unwrap(), 8080);
//! // SKIP_SELF starts the lookup at the parent.
//! let parent_port = child
//!     .resolve(&port, InjectFlags::SKIP_SELF)
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(*parent_port.downcast_ref::<u16>().unwrap(), 80);
//! ```

mod compile;
mod container;
mod context;
mod cyclic;
mod disposal;
mod error;
mod flags;
mod governance;
mod hooks;
mod instantiate;
mod options;
mod provider;
mod record;
mod token;
mod traits;

pub use container::{Container, ContainerBuilder, Interceptor};
pub use context::{current_container, inject, inject_async, inject_optional, run_in_container};
pub use cyclic::{unwrap_deferred, Deferred};
pub use error::{DiError, DiResult};
pub use flags::InjectFlags;
pub use governance::PendingResolution;
pub use hooks::{
    AdmissionFn, AfterFn, BaseFactory, BeforeFn, CustomFactoryFn, DisposeFn, ErrorFn,
    HookOptions, HookRegistry, ScopeCheckFn, TransienceFn,
};
pub use options::ContainerOptions;
pub use provider::{arg, opt_arg, Args, Dep, Provider};
pub use token::{Token, CONTAINER, CONTAINER_SCOPE, INTERCEPTORS};
pub use traits::{AsyncDispose, Dispose, Injectable};

use std::any::Any;
use std::sync::Arc;

/// Type-erased instance handle: what records cache and factories receive.
pub type Instance = Arc<dyn Any + Send + Sync>;
