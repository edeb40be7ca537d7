//! Teardown registry.

use std::sync::Mutex;

use futures::future::{join_all, BoxFuture};

use crate::hooks::HookRegistry;
use crate::provider::Teardown;
use crate::token::Token;
use crate::Instance;

struct Entry {
    token: Token,
    instance: Instance,
    teardown: Option<Teardown>,
}

/// Instances a container created, in creation order. Disposed in reverse
/// order during `destroy()`.
#[derive(Default)]
pub(crate) struct DisposalRegistry {
    entries: Mutex<Vec<Entry>>,
}

impl DisposalRegistry {
    pub(crate) fn register(&self, token: &Token, instance: Instance, teardown: Option<Teardown>) {
        self.entries.lock().unwrap().push(Entry {
            token: token.clone(),
            instance,
            teardown,
        });
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Runs dispose listeners and instance teardown most-recently-created
    /// first. Asynchronous teardown handles are collected and awaited
    /// together; individual failures never abort the remaining teardown.
    pub(crate) async fn dispose_all(&self, hooks: &HookRegistry) {
        let mut entries: Vec<Entry> = {
            let mut guard = self.entries.lock().unwrap();
            guard.drain(..).collect()
        };
        let mut pending: Vec<BoxFuture<'static, ()>> = Vec::new();
        while let Some(entry) = entries.pop() {
            if let Some(store) = hooks.store_for(&entry.token) {
                store.fire_dispose(&entry.token, &entry.instance);
            }
            if let Some(teardown) = &entry.teardown {
                if let Some(handle) = teardown.run(&entry.instance) {
                    pending.push(handle);
                }
            }
        }
        join_all(pending).await;
    }
}
