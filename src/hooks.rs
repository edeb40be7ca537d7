//! Lifecycle hook registry.
//!
//! Five extension points, each optional and owned per token: scope-check,
//! transience, admission, custom factory (at most one each, duplicates
//! fail fast) plus ordered before/after/error/dispose listener chains.
//! Hooks inherit along links declared with [`HookRegistry::inherit`]
//! through a copy-on-first-write store, so overriding a hook on a derived
//! token never mutates the ancestor's store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::provider::Provider;
use crate::token::Token;
use crate::Instance;

/// Base factory handed to a custom-factory wrapper.
pub type BaseFactory<'a> = dyn Fn() -> DiResult<Instance> + 'a;

/// Decides whether a declared binding is visible under a scope identifier.
pub type ScopeCheckFn = Arc<dyn Fn(Option<&str>, &Token) -> bool + Send + Sync>;
/// When true, the resolved value is never cached on the record.
pub type TransienceFn = Arc<dyn Fn(&Token) -> bool + Send + Sync>;
/// Decides whether an explicit provider registration is accepted.
pub type AdmissionFn = Arc<dyn Fn(&Token, &Provider) -> bool + Send + Sync>;
/// Wraps the base factory with cross-cutting construction behavior.
pub type CustomFactoryFn =
    Arc<dyn for<'a> Fn(&Token, &BaseFactory<'a>, &Container) -> DiResult<Instance> + Send + Sync>;
/// Invoked immediately before construction.
pub type BeforeFn = Arc<dyn Fn(&Token) + Send + Sync>;
/// Invoked immediately after a successful construction.
pub type AfterFn = Arc<dyn Fn(&Token, &Instance) + Send + Sync>;
/// Offered a construction error; the first `Some` short-circuits it.
pub type ErrorFn = Arc<dyn Fn(&Token, &DiError) -> Option<Instance> + Send + Sync>;
/// Invoked for each instance during disposal.
pub type DisposeFn = Arc<dyn Fn(&Token, &Instance) + Send + Sync>;

#[derive(Clone)]
struct Listener<F> {
    order: i32,
    func: F,
}

/// The per-token hook bundle.
#[derive(Clone, Default)]
pub(crate) struct HookStore {
    scope_check: Option<ScopeCheckFn>,
    transient: Option<TransienceFn>,
    admission: Option<AdmissionFn>,
    custom_factory: Option<CustomFactoryFn>,
    before: Vec<Listener<BeforeFn>>,
    after: Vec<Listener<AfterFn>>,
    error: Vec<Listener<ErrorFn>>,
    dispose: Vec<Listener<DisposeFn>>,
}

fn insert_ordered<F>(list: &mut Vec<Listener<F>>, order: i32, func: F) {
    // Stable for ties: equal orders keep registration sequence.
    let at = list.partition_point(|l| l.order <= order);
    list.insert(at, Listener { order, func });
}

impl HookStore {
    pub(crate) fn is_transient(&self, token: &Token) -> bool {
        match &self.transient {
            Some(f) => f(token),
            None => false,
        }
    }

    pub(crate) fn admits(&self, token: &Token, provider: &Provider) -> bool {
        match &self.admission {
            Some(f) => f(token, provider),
            None => true,
        }
    }

    /// The scope-check hook's verdict, if one is registered. The verdict
    /// replaces the built-in scope comparison entirely.
    pub(crate) fn scope_check(&self, scope: Option<&str>, token: &Token) -> Option<bool> {
        self.scope_check.as_ref().map(|f| f(scope, token))
    }

    pub(crate) fn custom_factory(&self) -> Option<&CustomFactoryFn> {
        self.custom_factory.as_ref()
    }

    pub(crate) fn fire_before(&self, token: &Token) {
        for l in &self.before {
            (l.func)(token);
        }
    }

    pub(crate) fn fire_after(&self, token: &Token, value: &Instance) {
        for l in &self.after {
            (l.func)(token, value);
        }
    }

    /// Offers `error` to the chain; the first listener returning a value
    /// suppresses the error.
    pub(crate) fn offer_error(&self, token: &Token, error: &DiError) -> Option<Instance> {
        for l in &self.error {
            if let Some(value) = (l.func)(token, error) {
                return Some(value);
            }
        }
        None
    }

    pub(crate) fn fire_dispose(&self, token: &Token, value: &Instance) {
        for l in &self.dispose {
            (l.func)(token, value);
        }
    }
}

/// Hook bundle accepted by [`HookRegistry::register`].
///
/// # Examples
///
/// ```rust
/// use strata_di::{Container, HookOptions, Provider, Token};
///
/// let t = Token::new("Service");
/// let root = Container::builder()
///     .provide(&t, Provider::value(1u32))
///     .build()
///     .unwrap();
/// root.hooks()
///     .register(&t, HookOptions::new().before(0, |token| {
///         println!("constructing {}", token);
///     }))
///     .unwrap();
/// ```
#[derive(Default)]
pub struct HookOptions {
    scope_check: Option<ScopeCheckFn>,
    transient: Option<TransienceFn>,
    admission: Option<AdmissionFn>,
    custom_factory: Option<CustomFactoryFn>,
    before: Vec<(i32, BeforeFn)>,
    after: Vec<(i32, AfterFn)>,
    error: Vec<(i32, ErrorFn)>,
    dispose: Vec<(i32, DisposeFn)>,
}

impl HookOptions {
    pub fn new() -> HookOptions {
        HookOptions::default()
    }

    pub fn scope_check<F>(mut self, f: F) -> HookOptions
    where
        F: Fn(Option<&str>, &Token) -> bool + Send + Sync + 'static,
    {
        self.scope_check = Some(Arc::new(f));
        self
    }

    pub fn transient<F>(mut self, f: F) -> HookOptions
    where
        F: Fn(&Token) -> bool + Send + Sync + 'static,
    {
        self.transient = Some(Arc::new(f));
        self
    }

    pub fn admission<F>(mut self, f: F) -> HookOptions
    where
        F: Fn(&Token, &Provider) -> bool + Send + Sync + 'static,
    {
        self.admission = Some(Arc::new(f));
        self
    }

    pub fn custom_factory<F>(mut self, f: F) -> HookOptions
    where
        F: for<'a> Fn(&Token, &BaseFactory<'a>, &Container) -> DiResult<Instance>
            + Send
            + Sync
            + 'static,
    {
        self.custom_factory = Some(Arc::new(f));
        self
    }

    pub fn before<F>(mut self, order: i32, f: F) -> HookOptions
    where
        F: Fn(&Token) + Send + Sync + 'static,
    {
        self.before.push((order, Arc::new(f)));
        self
    }

    pub fn after<F>(mut self, order: i32, f: F) -> HookOptions
    where
        F: Fn(&Token, &Instance) + Send + Sync + 'static,
    {
        self.after.push((order, Arc::new(f)));
        self
    }

    pub fn on_error<F>(mut self, order: i32, f: F) -> HookOptions
    where
        F: Fn(&Token, &DiError) -> Option<Instance> + Send + Sync + 'static,
    {
        self.error.push((order, Arc::new(f)));
        self
    }

    pub fn on_dispose<F>(mut self, order: i32, f: F) -> HookOptions
    where
        F: Fn(&Token, &Instance) + Send + Sync + 'static,
    {
        self.dispose.push((order, Arc::new(f)));
        self
    }
}

#[derive(Default)]
struct RegistryInner {
    stores: HashMap<Token, Arc<HookStore>>,
    parents: HashMap<Token, Token>,
}

impl RegistryInner {
    /// Nearest store along the inherit chain, starting at `token` itself.
    fn effective(&self, token: &Token) -> Option<Arc<HookStore>> {
        let mut current = token.clone();
        loop {
            if let Some(store) = self.stores.get(&current) {
                return Some(store.clone());
            }
            match self.parents.get(&current) {
                Some(parent) => current = parent.clone(),
                None => return None,
            }
        }
    }

    /// Inherited store only, never the token's own.
    fn inherited(&self, token: &Token) -> Option<Arc<HookStore>> {
        let parent = self.parents.get(token)?;
        self.effective(parent)
    }
}

/// Registry of lifecycle hooks, shared by a container tree.
///
/// Obtained via [`Container::hooks`]. Writing a hook on a token that only
/// has inherited hooks first copies the ancestor's store, so the ancestor
/// is never mutated through a derived token.
#[derive(Default)]
pub struct HookRegistry {
    inner: Mutex<RegistryInner>,
}

impl HookRegistry {
    pub(crate) fn new() -> HookRegistry {
        HookRegistry::default()
    }

    /// Declares that `token` inherits hooks from `parent` until it gets
    /// hooks of its own.
    pub fn inherit(&self, token: &Token, parent: &Token) {
        let mut inner = self.inner.lock().unwrap();
        inner.parents.insert(token.clone(), parent.clone());
    }

    /// Registers `options` against `token`. A second
    /// scope-check/transience/admission/custom-factory on the same token
    /// fails with [`DiError::DuplicateHook`]; listeners accumulate.
    pub fn register(&self, token: &Token, options: HookOptions) -> DiResult<()> {
        let mut inner = self.inner.lock().unwrap();

        // Copy-on-first-write: seed from the inherited store.
        let mut store = match inner.stores.get(token) {
            Some(own) => (**own).clone(),
            None => match inner.inherited(token) {
                Some(inherited) => (*inherited).clone(),
                None => HookStore::default(),
            },
        };

        let duplicate = |kind: &'static str| DiError::DuplicateHook {
            token: token.name().to_string(),
            kind,
        };
        if let Some(f) = options.scope_check {
            if store.scope_check.is_some() {
                return Err(duplicate("scope-check"));
            }
            store.scope_check = Some(f);
        }
        if let Some(f) = options.transient {
            if store.transient.is_some() {
                return Err(duplicate("transience"));
            }
            store.transient = Some(f);
        }
        if let Some(f) = options.admission {
            if store.admission.is_some() {
                return Err(duplicate("admission"));
            }
            store.admission = Some(f);
        }
        if let Some(f) = options.custom_factory {
            if store.custom_factory.is_some() {
                return Err(duplicate("custom-factory"));
            }
            store.custom_factory = Some(f);
        }
        for (order, f) in options.before {
            insert_ordered(&mut store.before, order, f);
        }
        for (order, f) in options.after {
            insert_ordered(&mut store.after, order, f);
        }
        for (order, f) in options.error {
            insert_ordered(&mut store.error, order, f);
        }
        for (order, f) in options.dispose {
            insert_ordered(&mut store.dispose, order, f);
        }

        inner.stores.insert(token.clone(), Arc::new(store));
        Ok(())
    }

    /// Snapshot of the hooks applying to `token`, if any.
    pub(crate) fn store_for(&self, token: &Token) -> Option<Arc<HookStore>> {
        self.inner.lock().unwrap().effective(token)
    }

    /// The token's own store, ignoring inheritance. Test support.
    #[cfg(test)]
    fn own_store(&self, token: &Token) -> Option<Arc<HookStore>> {
        self.inner.lock().unwrap().stores.get(token).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_singleton_hook_fails() {
        let registry = HookRegistry::new();
        let t = Token::new("T");
        registry
            .register(&t, HookOptions::new().transient(|_| true))
            .unwrap();
        let err = registry
            .register(&t, HookOptions::new().transient(|_| false))
            .unwrap_err();
        assert!(matches!(err, DiError::DuplicateHook { kind: "transience", .. }));
    }

    #[test]
    fn copy_on_first_write_preserves_ancestor() {
        let registry = HookRegistry::new();
        let base = Token::new("Base");
        let derived = Token::new("Derived");
        registry.inherit(&derived, &base);
        registry
            .register(&base, HookOptions::new().transient(|_| true))
            .unwrap();

        // Derived sees the inherited store until it writes its own.
        assert!(registry.store_for(&derived).unwrap().is_transient(&derived));
        assert!(registry.own_store(&derived).is_none());

        registry
            .register(&derived, HookOptions::new().before(0, |_| {}))
            .unwrap();
        // Derived now owns a copy seeded with the inherited transience.
        assert!(registry.own_store(&derived).is_some());
        assert!(registry.store_for(&derived).unwrap().is_transient(&derived));
        // Ancestor untouched by further derived writes.
        registry
            .register(&derived, HookOptions::new().admission(|_, _| false))
            .unwrap();
        assert!(registry.store_for(&base).unwrap().admission.is_none());
    }

    #[test]
    fn listeners_run_in_ascending_order() {
        let registry = HookRegistry::new();
        let t = Token::new("T");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let (s1, s2, s3) = (seen.clone(), seen.clone(), seen.clone());
        registry
            .register(
                &t,
                HookOptions::new()
                    .before(10, move |_| s1.lock().unwrap().push(10))
                    .before(-1, move |_| s2.lock().unwrap().push(-1))
                    .before(0, move |_| s3.lock().unwrap().push(0)),
            )
            .unwrap();
        registry.store_for(&t).unwrap().fire_before(&t);
        assert_eq!(*seen.lock().unwrap(), vec![-1, 0, 10]);
    }
}
