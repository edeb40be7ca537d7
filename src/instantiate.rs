//! Hook-gated construction.
//!
//! Invocation order around every construction: before listeners, the base
//! factory (or the token's custom-factory wrapper around it), the error
//! listener chain on failure, after listeners, `on_init`, then the
//! composed interceptor chain.

use std::sync::{Arc, Mutex};

use crate::compile::{self, Constructed};
use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::governance;
use crate::hooks::HookStore;
use crate::provider::Provider;
use crate::token::Token;
use crate::traits::Injectable;
use crate::Instance;

fn finish(
    token: &Token,
    store: Option<&Arc<HookStore>>,
    outcome: DiResult<Constructed>,
) -> DiResult<Constructed> {
    let constructed = match outcome {
        Ok(constructed) => constructed,
        Err(error) => {
            if let Some(store) = store {
                if let Some(value) = store.offer_error(token, &error) {
                    return Ok(Constructed::opaque(value));
                }
            }
            return Err(error.with_token(token.name()));
        }
    };
    if let Some(store) = store {
        store.fire_after(token, &constructed.instance);
    }
    Ok(constructed)
}

fn apply_interceptors(
    container: &Container,
    token: &Token,
    mut constructed: Constructed,
    sync_path: bool,
) -> DiResult<Constructed> {
    for interceptor in container.composed_interceptors() {
        let value = interceptor(constructed.instance.clone(), token, container)
            .map_err(|e| e.with_token(token.name()))?;
        if sync_path && governance::is_pending(&value) {
            return Err(DiError::SyncResolvedAsync(format!(
                "interceptor on {}",
                token.name()
            )));
        }
        constructed.instance = value;
    }
    Ok(constructed)
}

fn init_sync(
    container: &Container,
    token: &Token,
    injectable: &Arc<dyn Injectable>,
) -> DiResult<()> {
    crate::context::run_in_container(container, || injectable.on_init())
        .map_err(|e| e.with_token(token.name()))?;
    if let Some(pending) = injectable.on_init_async() {
        drop(pending);
        return governance::sync_boundary(container, token, "on_init");
    }
    Ok(())
}

/// Synchronous hook-gated construction.
pub(crate) fn instantiate_sync(
    container: &Container,
    token: &Token,
    provider: &Provider,
) -> DiResult<Constructed> {
    let store = container.hooks().store_for(token);
    if let Some(store) = &store {
        store.fire_before(token);
    }

    let injectable_slot: Mutex<Option<Arc<dyn Injectable>>> = Mutex::new(None);
    let base = || -> DiResult<Instance> {
        let constructed = compile::construct_sync(container, token, provider)?;
        *injectable_slot.lock().unwrap() = constructed.injectable;
        Ok(constructed.instance)
    };
    let outcome = match store.as_ref().and_then(|s| s.custom_factory()) {
        Some(wrap) => wrap(token, &base, container),
        None => base(),
    }
    .map(|instance| Constructed {
        instance,
        injectable: injectable_slot.lock().unwrap().take(),
    });

    let constructed = finish(token, store.as_ref(), outcome)?;
    if let Some(injectable) = &constructed.injectable {
        init_sync(container, token, injectable)?;
    }
    apply_interceptors(container, token, constructed, true)
}

/// Asynchronous hook-gated construction. A custom-factory wrapper runs
/// after the real construction completed, over a base returning the
/// finished instance, since the wrapper itself is synchronous.
pub(crate) async fn instantiate_async(
    container: &Container,
    token: &Token,
    provider: &Provider,
) -> DiResult<Constructed> {
    let store = container.hooks().store_for(token);
    if let Some(store) = &store {
        store.fire_before(token);
    }

    let outcome = match compile::construct_async(container, provider).await {
        Ok(mut constructed) => {
            if let Some(wrap) = store.as_ref().and_then(|s| s.custom_factory()) {
                let ready = constructed.instance.clone();
                let base = move || Ok(ready.clone());
                match wrap(token, &base, container) {
                    Ok(instance) => {
                        constructed.instance = instance;
                        Ok(constructed)
                    }
                    Err(error) => Err(error),
                }
            } else {
                Ok(constructed)
            }
        }
        Err(error) => Err(error),
    };

    let constructed = finish(token, store.as_ref(), outcome)?;
    if let Some(injectable) = &constructed.injectable {
        crate::context::run_in_container(container, || injectable.on_init())
            .map_err(|e| e.with_token(token.name()))?;
        if let Some(pending) = injectable.on_init_async() {
            pending.await.map_err(|e| e.with_token(token.name()))?;
        }
    }
    apply_interceptors(container, token, constructed, false)
}
