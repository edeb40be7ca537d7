//! The hierarchical container.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::compile::{self, Constructed};
use crate::context::{self, ChainState};
use crate::cyclic::Deferred;
use crate::disposal::DisposalRegistry;
use crate::error::{DiError, DiResult};
use crate::flags::InjectFlags;
use crate::governance::{self, PendingResolution};
use crate::hooks::HookRegistry;
use crate::instantiate;
use crate::options::ContainerOptions;
use crate::provider::{Provider, ProviderForm, Teardown};
use crate::record::{
    Record, FLAG_HAS_PLACEHOLDER, FLAG_INSTANTIATING, FLAG_MULTI, FLAG_PRIVATE,
};
use crate::token::{Token, CONTAINER, CONTAINER_SCOPE, INTERCEPTORS};
use crate::Instance;

/// Interceptor applied to every instance the declaring container (and its
/// children) produces. Child chains run before parent chains.
pub type Interceptor =
    Arc<dyn Fn(Instance, &Token, &Container) -> DiResult<Instance> + Send + Sync>;

pub(crate) struct ContainerInner {
    records: Mutex<HashMap<Token, Arc<Record>>>,
    parent: Option<Container>,
    scope: OnceLock<String>,
    interceptors: OnceLock<Vec<Interceptor>>,
    disposal: DisposalRegistry,
    destroyed: AtomicBool,
    options: ContainerOptions,
    hooks: Arc<HookRegistry>,
}

impl Drop for ContainerInner {
    fn drop(&mut self) {
        if !self.destroyed.load(Ordering::Relaxed) && !self.disposal.is_empty() {
            tracing::warn!("container dropped with pending teardowns; call destroy()");
        }
    }
}

enum Produced {
    Single(Constructed),
    Multi(Vec<Instance>),
}

/// A node in a tree of containers.
///
/// Providers declared on a container are lazily compiled into records,
/// constructed on first request, cached, and torn down in reverse
/// creation order by [`Container::destroy`]. Lookups fall through to the
/// parent unless flagged otherwise; a child's own binding always shadows
/// an ancestor's.
///
/// `Container` is a cheap-clone handle; clones share one node.
///
/// # Examples
///
/// ```rust
/// use strata_di::{Container, Provider, Token};
///
/// let greeting = Token::new("Greeting");
/// let root = Container::builder()
///     .provide(&greeting, Provider::value("hello".to_string()))
///     .build()
///     .unwrap();
/// let child = Container::builder().parent(&root).build().unwrap();
/// assert_eq!(*child.get::<String>(&greeting).unwrap(), "hello");
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

/// Configures and builds a [`Container`].
#[derive(Default)]
pub struct ContainerBuilder {
    providers: Vec<(Token, Provider)>,
    parent: Option<Container>,
    options: Option<ContainerOptions>,
    interceptors: Vec<Interceptor>,
}

impl ContainerBuilder {
    /// Declares an initial provider for `token`.
    pub fn provide(mut self, token: &Token, provider: Provider) -> ContainerBuilder {
        self.providers.push((token.clone(), provider));
        self
    }

    /// Links the new container under `parent`. Options and the hook
    /// registry are inherited from the parent's root.
    pub fn parent(mut self, parent: &Container) -> ContainerBuilder {
        self.parent = Some(parent.clone());
        self
    }

    /// Overrides the inherited [`ContainerOptions`].
    pub fn options(mut self, options: ContainerOptions) -> ContainerBuilder {
        self.options = Some(options);
        self
    }

    /// Appends an interceptor to the container's own chain.
    pub fn interceptor<F>(mut self, f: F) -> ContainerBuilder
    where
        F: Fn(Instance, &Token, &Container) -> DiResult<Instance> + Send + Sync + 'static,
    {
        self.interceptors.push(Arc::new(f));
        self
    }

    pub fn build(self) -> DiResult<Container> {
        let options = match (&self.options, &self.parent) {
            (Some(options), _) => options.clone(),
            (None, Some(parent)) => parent.inner.options.clone(),
            (None, None) => ContainerOptions::default(),
        };
        let hooks = match &self.parent {
            Some(parent) => parent.inner.hooks.clone(),
            None => Arc::new(HookRegistry::new()),
        };
        let container = Container {
            inner: Arc::new(ContainerInner {
                records: Mutex::new(HashMap::new()),
                parent: self.parent,
                scope: OnceLock::new(),
                interceptors: OnceLock::new(),
                disposal: DisposalRegistry::default(),
                destroyed: AtomicBool::new(false),
                options,
                hooks,
            }),
        };
        for (token, provider) in self.providers {
            container.set(&token, provider)?;
        }

        // The scope identifier is read once, locally, at build time.
        let scope_flags = InjectFlags::OPTIONAL | InjectFlags::SELF_ONLY;
        if let Some(value) = container.resolve(&CONTAINER_SCOPE, scope_flags)? {
            if let Ok(scope) = value.downcast::<String>() {
                let _ = container.inner.scope.set((*scope).clone());
            }
        }

        // Interceptors contributed through the multi token join the
        // builder-declared chain, after it.
        let mut chain = self.interceptors;
        if let Some(value) = container.resolve(&INTERCEPTORS, scope_flags)? {
            if let Some(list) = value.downcast_ref::<Vec<Instance>>() {
                for entry in list {
                    if let Some(interceptor) = entry.downcast_ref::<Interceptor>() {
                        chain.push(interceptor.clone());
                    }
                }
            }
        }
        let _ = container.inner.interceptors.set(chain);
        Ok(container)
    }
}

fn miss(token: &Token, flags: InjectFlags) -> DiResult<Option<Instance>> {
    if flags.contains(InjectFlags::OPTIONAL) {
        Ok(None)
    } else {
        Err(DiError::NoProvider(token.name().to_string()))
    }
}

fn downcast<T: Send + Sync + 'static>(token: &Token, value: Instance) -> DiResult<Arc<T>> {
    value
        .downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(token.name().to_string()))
}

enum Step {
    Value(Option<Instance>),
    Fail(DiError),
    Construct,
    JoinPending(crate::record::SharedResolution),
}

impl Container {
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::default()
    }

    /// Whether `destroy()` has run.
    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }

    /// The lifecycle hook registry shared by this container tree.
    pub fn hooks(&self) -> &HookRegistry {
        &self.inner.hooks
    }

    pub(crate) fn options(&self) -> &ContainerOptions {
        &self.inner.options
    }

    pub(crate) fn scope(&self) -> Option<&str> {
        self.inner.scope.get().map(|s| s.as_str())
    }

    pub(crate) fn composed_interceptors(&self) -> Vec<Interceptor> {
        let mut chain = self.inner.interceptors.get().cloned().unwrap_or_default();
        if let Some(parent) = &self.inner.parent {
            chain.extend(parent.composed_interceptors());
        }
        chain
    }

    fn is_transient(&self, token: &Token) -> bool {
        match self.inner.hooks.store_for(token) {
            Some(store) => store.is_transient(token),
            None => false,
        }
    }

    fn record_for(&self, token: &Token) -> Option<Arc<Record>> {
        self.inner.records.lock().unwrap().get(token).cloned()
    }

    fn attach_record(&self, token: &Token, provider: Provider) -> Arc<Record> {
        let mut records = self.inner.records.lock().unwrap();
        records
            .entry(token.clone())
            .or_insert_with(|| {
                Arc::new(if provider.is_multi() {
                    Record::multi(token.clone(), provider.clone())
                } else {
                    Record::single(token.clone(), provider.clone())
                })
            })
            .clone()
    }

    /// Registers `provider` for `token` after construction.
    ///
    /// Returns `Ok(false)` when the token's admission hook vetoes the
    /// registration. Overwriting an already-instantiated single binding
    /// fails with [`DiError::AlreadyInstantiated`]; appending to an
    /// already-resolved multi binding fails or is ignored with a warning
    /// per [`ContainerOptions::strict_multi_injection`].
    pub fn set(&self, token: &Token, provider: Provider) -> DiResult<bool> {
        if self.is_destroyed() {
            return Err(DiError::Destroyed(token.name().to_string()));
        }
        if let Some(store) = self.inner.hooks.store_for(token) {
            if !store.admits(token, &provider) {
                return Ok(false);
            }
        }
        let mut records = self.inner.records.lock().unwrap();
        let existing = records.get(token).cloned();
        match existing {
            None => {
                let record = if provider.is_multi() {
                    Record::multi(token.clone(), provider)
                } else {
                    Record::single(token.clone(), provider)
                };
                records.insert(token.clone(), Arc::new(record));
                Ok(true)
            }
            Some(record) => {
                let mut state = record.lock();
                if state.has(FLAG_MULTI) != provider.is_multi() {
                    return Err(DiError::InvalidProvider(token.name().to_string()));
                }
                if state.has(FLAG_MULTI) {
                    if state.value.is_some() {
                        if self.inner.options.strict_multi_injection {
                            return Err(DiError::MultiAfterResolution(
                                token.name().to_string(),
                            ));
                        }
                        tracing::warn!(
                            token = %token.name(),
                            "provider registered into an already-resolved multi binding; ignored"
                        );
                        return Ok(false);
                    }
                    state.contributors.push(provider);
                    Ok(true)
                } else {
                    if state.value.is_some()
                        || state.pending.is_some()
                        || state.has(FLAG_INSTANTIATING)
                    {
                        return Err(DiError::AlreadyInstantiated(token.name().to_string()));
                    }
                    drop(state);
                    records.insert(token.clone(), Arc::new(Record::single(token.clone(), provider)));
                    Ok(true)
                }
            }
        }
    }

    /// Synchronous resolution.
    ///
    /// Returns `Ok(None)` when the token is missing and `OPTIONAL` is
    /// set, and for any lookup against a destroyed container.
    pub fn resolve(&self, token: &Token, flags: InjectFlags) -> DiResult<Option<Instance>> {
        if flags.contains(InjectFlags::SELF_ONLY) && flags.contains(InjectFlags::SKIP_SELF) {
            return Err(DiError::InvalidFlags("SELF_ONLY combined with SKIP_SELF"));
        }
        if self.is_destroyed() {
            return Ok(None);
        }
        if token == &*CONTAINER {
            return Ok(Some(Arc::new(self.clone()) as Instance));
        }
        if flags.contains(InjectFlags::SKIP_SELF) {
            // An explicit skip-self lookup is not a child fall-through:
            // the parent's private bindings stay visible to it.
            let flags = flags.without(InjectFlags::SKIP_SELF);
            return match &self.inner.parent {
                Some(parent) => parent.resolve(token, flags),
                None => miss(token, flags),
            };
        }

        if let Some(record) = self.record_for(token) {
            match self.step_for(token, &record, flags, false) {
                Step::Value(value) => return Ok(value),
                Step::Fail(error) => return Err(error),
                Step::JoinPending(_) => {
                    return Err(DiError::ConcurrentResolution(token.name().to_string()))
                }
                Step::Construct => return self.construct_record_sync(token, &record),
            }
        }

        if let Some(provider) = compile::usable_default_binding(self, token) {
            let record = self.attach_record(token, provider);
            return self.construct_record_sync(token, &record);
        }

        if flags.contains(InjectFlags::SELF_ONLY) {
            return miss(token, flags);
        }
        match &self.inner.parent {
            Some(parent) => parent.resolve(token, flags | InjectFlags::FROM_CHILD),
            None => miss(token, flags),
        }
    }

    /// Asynchronous resolution. An in-flight resolution for the same
    /// token is joined instead of rejected; cycles across the chain fail
    /// with [`DiError::AsyncCycle`].
    pub fn resolve_async(
        &self,
        token: &Token,
        flags: InjectFlags,
    ) -> BoxFuture<'static, DiResult<Option<Instance>>> {
        let this = self.clone();
        let token = token.clone();
        async move { this.resolve_async_inner(token, flags).await }.boxed()
    }

    async fn resolve_async_inner(
        self,
        token: Token,
        flags: InjectFlags,
    ) -> DiResult<Option<Instance>> {
        if flags.contains(InjectFlags::SELF_ONLY) && flags.contains(InjectFlags::SKIP_SELF) {
            return Err(DiError::InvalidFlags("SELF_ONLY combined with SKIP_SELF"));
        }
        if self.is_destroyed() {
            return Ok(None);
        }
        if token == *CONTAINER {
            return Ok(Some(Arc::new(self.clone()) as Instance));
        }
        if flags.contains(InjectFlags::SKIP_SELF) {
            let flags = flags.without(InjectFlags::SKIP_SELF);
            return match &self.inner.parent {
                Some(parent) => parent.resolve_async(&token, flags).await,
                None => miss(&token, flags),
            };
        }

        if let Some(record) = self.record_for(&token) {
            match self.step_for(&token, &record, flags, true) {
                Step::Value(value) => return Ok(value),
                Step::Fail(error) => return Err(error),
                Step::JoinPending(handle) => {
                    if let Some(chain) = context::current_chain() {
                        chain.guard(&token)?;
                    }
                    return governance::await_governed(&token, handle, self.options())
                        .await
                        .map(Some);
                }
                Step::Construct => return self.construct_record_async(&token, &record).await,
            }
        }

        if let Some(provider) = compile::usable_default_binding(&self, &token) {
            let record = self.attach_record(&token, provider);
            return self.construct_record_async(&token, &record).await;
        }

        if flags.contains(InjectFlags::SELF_ONLY) {
            return miss(&token, flags);
        }
        match &self.inner.parent {
            Some(parent) => {
                parent
                    .resolve_async(&token, flags | InjectFlags::FROM_CHILD)
                    .await
            }
            None => miss(&token, flags),
        }
    }

    /// Shared fast-path dispatch over a record's current state.
    fn step_for(
        &self,
        token: &Token,
        record: &Arc<Record>,
        flags: InjectFlags,
        async_path: bool,
    ) -> Step {
        let mut state = record.lock();
        if state.has(FLAG_PRIVATE) && flags.contains(InjectFlags::FROM_CHILD) {
            return if flags.contains(InjectFlags::OPTIONAL) {
                Step::Value(None)
            } else {
                Step::Fail(DiError::ScopeMismatch(token.name().to_string()))
            };
        }
        if state.has(FLAG_INSTANTIATING) {
            // Sync re-entry: cycle. Only class providers host a placeholder.
            let is_class = matches!(
                state.provider.as_ref().map(|p| &p.form),
                Some(ProviderForm::Class { .. })
            );
            if !is_class || async_path {
                return Step::Fail(DiError::CyclicUnsupported(token.name().to_string()));
            }
            let placeholder = state
                .placeholder
                .get_or_insert_with(|| Deferred::new(token.name()))
                .clone();
            state.set(FLAG_HAS_PLACEHOLDER);
            return Step::Value(Some(placeholder as Instance));
        }
        if let Some(value) = &state.value {
            if self.is_transient(token) {
                return Step::Construct;
            }
            if async_path {
                if let Some(pending) = value.downcast_ref::<PendingResolution>() {
                    return Step::JoinPending(pending.handle());
                }
            }
            return Step::Value(Some(value.clone()));
        }
        if let Some(pending) = &state.pending {
            return Step::JoinPending(pending.clone());
        }
        Step::Construct
    }

    fn construct_record_sync(
        &self,
        token: &Token,
        record: &Arc<Record>,
    ) -> DiResult<Option<Instance>> {
        let (provider, contributors, is_multi) = {
            let mut state = record.lock();
            state.set(FLAG_INSTANTIATING);
            (
                state.provider.clone(),
                state.contributors.clone(),
                state.has(FLAG_MULTI),
            )
        };

        // Async factories cannot run on this path; apply boundary policy.
        if let Some(provider) = &provider {
            if matches!(provider.form, ProviderForm::AsyncFactory { .. }) {
                if let Err(error) = governance::sync_boundary(self, token, "async factory") {
                    record.lock().clear(FLAG_INSTANTIATING);
                    return Err(error);
                }
                return Ok(Some(self.leak_pending(token, record)));
            }
        }

        let result = if is_multi {
            self.construct_multi_sync(token, &contributors)
        } else {
            match &provider {
                Some(provider) => instantiate::instantiate_sync(self, token, provider)
                    .map(Produced::Single),
                None => Err(DiError::InvalidProvider(token.name().to_string())),
            }
        };
        self.finish_sync(token, record, result)
    }

    // Every contributor gets the full hook treatment: before/after
    // listeners, error-chain substitution, init, and interceptors run
    // per element, not once per list.
    fn construct_multi_sync(
        &self,
        token: &Token,
        contributors: &[Provider],
    ) -> DiResult<Produced> {
        let mut values: Vec<Instance> = Vec::with_capacity(contributors.len());
        for provider in contributors {
            let constructed = instantiate::instantiate_sync(self, token, provider)?;
            values.push(constructed.instance);
        }
        Ok(Produced::Multi(values))
    }

    fn finish_sync(
        &self,
        token: &Token,
        record: &Arc<Record>,
        result: DiResult<Produced>,
    ) -> DiResult<Option<Instance>> {
        let transient = self.is_transient(token);
        let mut state = record.lock();
        state.clear(FLAG_INSTANTIATING);
        match result {
            Err(error) => {
                state.clear(FLAG_HAS_PLACEHOLDER);
                state.placeholder = None;
                Err(error)
            }
            Ok(produced) => {
                let (instance, injectable, teardowns) = match produced {
                    Produced::Single(constructed) => {
                        let teardown = state.provider.as_ref().and_then(|p| p.teardown.clone());
                        (
                            constructed.instance,
                            constructed.injectable,
                            vec![(None, teardown)],
                        )
                    }
                    Produced::Multi(values) => {
                        let teardowns: Vec<(Option<Instance>, Option<Teardown>)> = state
                            .contributors
                            .iter()
                            .map(|p| p.teardown.clone())
                            .zip(values.iter().cloned())
                            .map(|(t, v)| (Some(v), t))
                            .collect();
                        (Arc::new(values) as Instance, None, teardowns)
                    }
                };
                if state.has(FLAG_HAS_PLACEHOLDER) {
                    if let Some(placeholder) = state.placeholder.take() {
                        placeholder.link(instance.clone(), injectable);
                    }
                    state.clear(FLAG_HAS_PLACEHOLDER);
                }
                let cache = !transient && state.value.is_none();
                if cache {
                    state.value = Some(instance.clone());
                }
                drop(state);
                if cache {
                    for (element, teardown) in teardowns {
                        let element = element.unwrap_or_else(|| instance.clone());
                        self.inner.disposal.register(token, element, teardown);
                    }
                }
                Ok(Some(instance))
            }
        }
    }

    /// Builds the shared construction future for a record, installs it as
    /// the in-flight handle, and drives it under the timeout race.
    async fn construct_record_async(
        &self,
        token: &Token,
        record: &Arc<Record>,
    ) -> DiResult<Option<Instance>> {
        let chain = context::current_chain().unwrap_or_default();
        let shared = self.construction_future(token, record, chain);
        {
            record.lock().pending = Some(shared.clone());
        }
        let result = governance::await_governed(token, shared, self.options()).await;
        if matches!(result, Err(DiError::Timeout { .. })) {
            // Free the lock so a later attempt can retry.
            record.lock().pending = None;
        }
        result.map(Some)
    }

    fn construction_future(
        &self,
        token: &Token,
        record: &Arc<Record>,
        chain: Arc<ChainState>,
    ) -> crate::record::SharedResolution {
        let container = self.clone();
        let token = token.clone();
        let record = record.clone();
        let body_chain = chain.clone();
        let body = async move {
            let outcome = match body_chain.enter(&token) {
                Err(error) => Err(error),
                Ok(()) => {
                    let (provider, contributors, is_multi) = {
                        let state = record.lock();
                        (
                            state.provider.clone(),
                            state.contributors.clone(),
                            state.has(FLAG_MULTI),
                        )
                    };
                    let result = if is_multi {
                        governance::resolve_multi_transactional(&container, &token, &contributors)
                            .await
                            .map(Produced::Multi)
                    } else {
                        match &provider {
                            Some(provider) => {
                                instantiate::instantiate_async(&container, &token, provider)
                                    .await
                                    .map(Produced::Single)
                            }
                            None => Err(DiError::InvalidProvider(token.name().to_string())),
                        }
                    };
                    body_chain.exit(&token);
                    container
                        .finish_async(&token, &record, result, &contributors)
                        .await
                }
            };
            record.lock().pending = None;
            outcome
        };
        context::scope_async(self.clone(), chain, body)
            .boxed()
            .shared()
    }

    async fn finish_async(
        &self,
        token: &Token,
        record: &Arc<Record>,
        result: DiResult<Produced>,
        contributors: &[Provider],
    ) -> DiResult<Instance> {
        let produced = result?;

        // Destroyed while the resolution was in flight: dispose what was
        // produced and fail.
        if self.is_destroyed() {
            match &produced {
                Produced::Single(constructed) => {
                    let teardown =
                        record.lock().provider.as_ref().and_then(|p| p.teardown.clone());
                    if let Some(teardown) = teardown {
                        if let Some(pending) = teardown.run(&constructed.instance) {
                            pending.await;
                        }
                    }
                }
                Produced::Multi(values) => {
                    for (provider, value) in contributors.iter().zip(values.iter()) {
                        if let Some(teardown) = &provider.teardown {
                            if let Some(pending) = teardown.run(value) {
                                pending.await;
                            }
                        }
                    }
                }
            }
            return Err(DiError::Destroyed(token.name().to_string()));
        }

        let transient = self.is_transient(token);
        let mut state = record.lock();
        let (instance, teardowns): (Instance, Vec<(Option<Instance>, Option<Teardown>)>) =
            match produced {
                Produced::Single(constructed) => {
                    let teardown = state.provider.as_ref().and_then(|p| p.teardown.clone());
                    (constructed.instance, vec![(None, teardown)])
                }
                Produced::Multi(values) => {
                    let teardowns = state
                        .contributors
                        .iter()
                        .map(|p| p.teardown.clone())
                        .zip(values.iter().cloned())
                        .map(|(t, v)| (Some(v), t))
                        .collect();
                    (Arc::new(values) as Instance, teardowns)
                }
            };
        // A cached leaked-pending value is replaced by the settled value
        // of the same resolution; anything else is never overwritten.
        let replaceable = match &state.value {
            None => true,
            Some(value) => governance::is_pending(value),
        };
        let cache = !transient && replaceable;
        if cache {
            state.value = Some(instance.clone());
        }
        drop(state);
        if cache {
            for (element, teardown) in teardowns {
                let element = element.unwrap_or_else(|| instance.clone());
                self.inner.disposal.register(token, element, teardown);
            }
        }
        Ok(instance)
    }

    /// Lenient boundary: cache and return a [`PendingResolution`] for a
    /// synchronous resolution that produced a pending result.
    fn leak_pending(&self, token: &Token, record: &Arc<Record>) -> Instance {
        let shared = self.construction_future(token, record, Arc::default());
        let value: Instance = Arc::new(PendingResolution::new(token, shared.clone()));
        let mut state = record.lock();
        state.clear(FLAG_INSTANTIATING);
        state.pending = Some(shared);
        state.value = Some(value.clone());
        value
    }

    /// Resolves `token` to a value of type `T`. Required: a missing
    /// provider, a destroyed container, and a failed downcast are errors.
    pub fn get<T: Send + Sync + 'static>(&self, token: &Token) -> DiResult<Arc<T>> {
        if self.is_destroyed() {
            return Err(DiError::Destroyed(token.name().to_string()));
        }
        match self.resolve(token, InjectFlags::DEFAULT)? {
            Some(value) => downcast(token, value),
            None => Err(DiError::NoProvider(token.name().to_string())),
        }
    }

    /// Resolves `token` to a value of type `T`, tolerating absence.
    pub fn get_optional<T: Send + Sync + 'static>(
        &self,
        token: &Token,
    ) -> DiResult<Option<Arc<T>>> {
        match self.resolve(token, InjectFlags::OPTIONAL)? {
            Some(value) => downcast(token, value).map(Some),
            None => Ok(None),
        }
    }

    /// Asynchronous required resolution of `token` to a value of type `T`.
    pub async fn get_async<T: Send + Sync + 'static>(&self, token: &Token) -> DiResult<Arc<T>> {
        if self.is_destroyed() {
            return Err(DiError::Destroyed(token.name().to_string()));
        }
        match self.resolve_async(token, InjectFlags::DEFAULT).await? {
            Some(value) => downcast(token, value),
            None => Err(DiError::NoProvider(token.name().to_string())),
        }
    }

    /// Asynchronous optional resolution.
    pub async fn get_async_optional<T: Send + Sync + 'static>(
        &self,
        token: &Token,
    ) -> DiResult<Option<Arc<T>>> {
        match self.resolve_async(token, InjectFlags::OPTIONAL).await? {
            Some(value) => downcast(token, value).map(Some),
            None => Ok(None),
        }
    }

    /// Resolves a multi token to its ordered contributions, each
    /// downcast to `T`.
    pub fn get_all<T: Send + Sync + 'static>(&self, token: &Token) -> DiResult<Vec<Arc<T>>> {
        if self.is_destroyed() {
            return Err(DiError::Destroyed(token.name().to_string()));
        }
        let value = match self.resolve(token, InjectFlags::DEFAULT)? {
            Some(value) => value,
            None => return Err(DiError::NoProvider(token.name().to_string())),
        };
        let list = value
            .downcast::<Vec<Instance>>()
            .map_err(|_| DiError::TypeMismatch(token.name().to_string()))?;
        list.iter().cloned().map(|v| downcast(token, v)).collect()
    }

    /// Asynchronous variant of [`Container::get_all`].
    pub async fn get_all_async<T: Send + Sync + 'static>(
        &self,
        token: &Token,
    ) -> DiResult<Vec<Arc<T>>> {
        if self.is_destroyed() {
            return Err(DiError::Destroyed(token.name().to_string()));
        }
        let value = match self.resolve_async(token, InjectFlags::DEFAULT).await? {
            Some(value) => value,
            None => return Err(DiError::NoProvider(token.name().to_string())),
        };
        let list = value
            .downcast::<Vec<Instance>>()
            .map_err(|_| DiError::TypeMismatch(token.name().to_string()))?;
        list.iter().cloned().map(|v| downcast(token, v)).collect()
    }

    /// Transitions to the destroyed state and tears everything down:
    /// dispose listeners, then instance teardown, most recently created
    /// first. Idempotent; later lookups return empty results and required
    /// lookups fail with [`DiError::Destroyed`].
    pub async fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.disposal.dispose_all(&self.inner.hooks).await;
        self.inner.records.lock().unwrap().clear();
    }

    /// Whether two handles refer to the same container node.
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("scope", &self.scope())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
