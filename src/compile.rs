//! Record compilation: turning a provider into a constructed value.
//!
//! Form priority: fixed value (dependencies ignored), delegate, factory,
//! async factory, class construction with property injection. On the
//! async path all dependencies are awaited together in declared argument
//! order; a mix of ready and pending values is never resolved serially.

use std::sync::Arc;

use futures::future::try_join_all;

use crate::container::Container;
use crate::context;
use crate::error::{DiError, DiResult};
use crate::provider::{Dep, Provider, ProviderForm};
use crate::token::Token;
use crate::traits::Injectable;
use crate::Instance;

pub(crate) struct Constructed {
    pub(crate) instance: Instance,
    pub(crate) injectable: Option<Arc<dyn Injectable>>,
}

impl Constructed {
    pub(crate) fn opaque(instance: Instance) -> Constructed {
        Constructed { instance, injectable: None }
    }
}

fn resolve_deps_sync(
    container: &Container,
    deps: &[Dep],
) -> DiResult<Vec<Option<Instance>>> {
    deps.iter()
        .map(|dep| container.resolve(&dep.token, dep.flags))
        .collect()
}

async fn resolve_deps_async(
    container: &Container,
    deps: &[Dep],
) -> DiResult<Vec<Option<Instance>>> {
    let pending: Vec<_> = deps
        .iter()
        .map(|dep| container.resolve_async(&dep.token, dep.flags))
        .collect();
    try_join_all(pending).await
}

/// Synchronous construction. An async-factory form cannot run here; the
/// resolver applies its boundary policy before calling in.
pub(crate) fn construct_sync(
    container: &Container,
    token: &Token,
    provider: &Provider,
) -> DiResult<Constructed> {
    match &provider.form {
        ProviderForm::Value(value) => Ok(Constructed::opaque(value.clone())),
        ProviderForm::Existing(target) => {
            let value = container
                .resolve(target, crate::InjectFlags::DEFAULT)?
                .ok_or_else(|| DiError::NoProvider(target.name().to_string()))?;
            Ok(Constructed::opaque(value))
        }
        ProviderForm::Factory { func, deps } => {
            let args = resolve_deps_sync(container, deps)?;
            let value = context::run_in_container(container, || func(&args))?;
            Ok(Constructed::opaque(value))
        }
        ProviderForm::AsyncFactory { .. } => {
            Err(DiError::SyncResolvedAsync(token.name().to_string()))
        }
        ProviderForm::Class { construct, deps, props } => {
            let args = resolve_deps_sync(container, deps)?;
            let (instance, injectable) =
                context::run_in_container(container, || construct(&args))?;
            for (name, dep) in props {
                if let Some(value) = container.resolve(&dep.token, dep.flags)? {
                    injectable.inject_property(name, value);
                }
            }
            Ok(Constructed { instance, injectable: Some(injectable) })
        }
    }
}

/// Asynchronous construction. Every dependency is awaited; promotion to
/// the async path happens for the whole argument list at once.
pub(crate) async fn construct_async(
    container: &Container,
    provider: &Provider,
) -> DiResult<Constructed> {
    match &provider.form {
        ProviderForm::Value(value) => Ok(Constructed::opaque(value.clone())),
        ProviderForm::Existing(target) => {
            let value = container
                .resolve_async(target, crate::InjectFlags::DEFAULT)
                .await?
                .ok_or_else(|| DiError::NoProvider(target.name().to_string()))?;
            Ok(Constructed::opaque(value))
        }
        ProviderForm::Factory { func, deps } => {
            let args = resolve_deps_async(container, deps).await?;
            let value = context::run_in_container(container, || func(&args))?;
            Ok(Constructed::opaque(value))
        }
        ProviderForm::AsyncFactory { func, deps } => {
            let args = resolve_deps_async(container, deps).await?;
            let value = func(args).await?;
            Ok(Constructed::opaque(value))
        }
        ProviderForm::Class { construct, deps, props } => {
            let args = resolve_deps_async(container, deps).await?;
            let (instance, injectable) =
                context::run_in_container(container, || construct(&args))?;
            for (name, dep) in props {
                if let Some(value) = container.resolve_async(&dep.token, dep.flags).await? {
                    injectable.inject_property(name, value);
                }
            }
            Ok(Constructed { instance, injectable: Some(injectable) })
        }
    }
}

/// The provider compiled from `token`'s own declared binding, when usable
/// in `container`. A registered scope-check hook's verdict replaces the
/// built-in `provided_in` comparison, in both directions: it may admit a
/// binding into a non-matching scope or veto a matching one. Without a
/// hook the scope restriction must match the container's scope. The
/// token's admission hook may veto the declarative binding outright.
pub(crate) fn usable_default_binding(container: &Container, token: &Token) -> Option<Provider> {
    let binding = token.default_binding()?;
    let store = container.hooks().store_for(token);
    if let Some(store) = &store {
        if !store.admits(token, &binding.provider) {
            return None;
        }
    }
    let allowed = store
        .as_ref()
        .and_then(|s| s.scope_check(container.scope(), token))
        .unwrap_or_else(|| match &binding.provided_in {
            Some(required) => container.scope() == Some(required.as_str()),
            None => true,
        });
    if !allowed {
        return None;
    }
    Some(binding.provider.clone())
}
