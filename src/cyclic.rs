//! Cyclic-dependency placeholder.
//!
//! When a synchronous resolution re-enters a token that is currently
//! instantiating, the guard hands out a [`Deferred`] instead of recursing.
//! The placeholder is a property bag behind the same [`Injectable`]
//! surface as a real instance; once the real instance exists the
//! placeholder is linked to it, properties written during the cyclic
//! window are replayed onto it, and further access forwards.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::traits::Injectable;
use crate::Instance;

struct Target {
    instance: Instance,
    injectable: Option<Arc<dyn Injectable>>,
}

/// Deferred stand-in for an instance whose construction is in progress.
///
/// Before linking, property writes land in a private backing map. After
/// [`link`](Deferred::link), reads and writes forward to the real
/// instance and [`Deferred::target`] yields it, restoring object identity
/// for cycle participants.
pub struct Deferred {
    token_name: String,
    window: Mutex<HashMap<String, Instance>>,
    target: OnceLock<Target>,
}

impl Deferred {
    pub(crate) fn new(token_name: &str) -> Arc<Deferred> {
        Arc::new(Deferred {
            token_name: token_name.to_string(),
            window: Mutex::new(HashMap::new()),
            target: OnceLock::new(),
        })
    }

    /// The real instance, once construction finished.
    pub fn target(&self) -> Option<Instance> {
        self.target.get().map(|t| t.instance.clone())
    }

    /// Links the placeholder to the finished instance. Properties written
    /// during the cyclic window are copied onto it; names whose
    /// constructor-initialized values get overwritten by the copy are
    /// reported with a non-fatal warning.
    pub(crate) fn link(&self, instance: Instance, injectable: Option<Arc<dyn Injectable>>) {
        let window: Vec<(String, Instance)> =
            self.window.lock().unwrap().drain().collect();
        if let Some(target) = &injectable {
            let mut overwritten = overwritten_names(target.as_ref(), &window);
            if !overwritten.is_empty() {
                overwritten.sort_unstable();
                tracing::warn!(
                    token = %self.token_name,
                    properties = ?overwritten,
                    "cyclic placeholder copy overwrote instance properties"
                );
            }
            for (name, value) in window {
                target.inject_property(&name, value);
            }
        } else if !window.is_empty() {
            tracing::warn!(
                token = %self.token_name,
                count = window.len(),
                "dropping properties written to a cyclic placeholder with no property surface"
            );
        }
        let _ = self.target.set(Target { instance, injectable });
    }
}

/// Window-written names the copy will actually change. A name counts as
/// overwritten only when the instance holds a different value, not merely
/// the same one written twice.
fn overwritten_names<'w>(
    target: &dyn Injectable,
    window: &'w [(String, Instance)],
) -> Vec<&'w str> {
    window
        .iter()
        .filter(|(name, value)| {
            target
                .get_property(name)
                .is_some_and(|existing| !Arc::ptr_eq(&existing, value))
        })
        .map(|(name, _)| name.as_str())
        .collect()
}

impl Injectable for Deferred {
    fn inject_property(&self, name: &str, value: Instance) {
        match self.target.get() {
            Some(Target { injectable: Some(t), .. }) => t.inject_property(name, value),
            Some(_) => {}
            None => {
                self.window.lock().unwrap().insert(name.to_string(), value);
            }
        }
    }

    fn get_property(&self, name: &str) -> Option<Instance> {
        match self.target.get() {
            Some(Target { injectable: Some(t), .. }) => t.get_property(name),
            Some(_) => None,
            None => self.window.lock().unwrap().get(name).cloned(),
        }
    }
}

/// Unwraps a value that may be a cyclic placeholder to the real instance.
///
/// Values handed out during a cyclic window are placeholders; after the
/// cycle completes, this returns the linked instance (and the input
/// otherwise), so identity checks across a cycle compare real instances.
pub fn unwrap_deferred(value: &Instance) -> Instance {
    if let Some(deferred) = value.downcast_ref::<Deferred>() {
        if let Some(target) = deferred.target() {
            return target;
        }
    }
    value.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Bag {
        props: Mutex<HashMap<String, Instance>>,
    }

    impl Injectable for Bag {
        fn inject_property(&self, name: &str, value: Instance) {
            self.props.lock().unwrap().insert(name.to_string(), value);
        }
        fn get_property(&self, name: &str) -> Option<Instance> {
            self.props.lock().unwrap().get(name).cloned()
        }
    }

    #[test]
    fn window_properties_replay_onto_target() {
        let deferred = Deferred::new("T");
        deferred.inject_property("x", Arc::new(1u32) as Instance);

        let real = Arc::new(Bag { props: Mutex::new(HashMap::new()) });
        real.inject_property("x", Arc::new(0u32) as Instance);
        deferred.link(real.clone() as Instance, Some(real.clone() as Arc<dyn Injectable>));

        // Window value overwrote the constructor-initialized one.
        let x = real.get_property("x").unwrap();
        assert_eq!(*x.downcast_ref::<u32>().unwrap(), 1);

        // Post-link writes forward.
        deferred.inject_property("y", Arc::new(2u32) as Instance);
        assert!(real.get_property("y").is_some());
    }

    #[test]
    fn equal_values_are_not_counted_as_overwritten() {
        let real = Bag { props: Mutex::new(HashMap::new()) };
        let shared: Instance = Arc::new(1u32);
        real.inject_property("same", shared.clone());
        real.inject_property("diff", Arc::new(2u32) as Instance);

        let window = vec![
            ("same".to_string(), shared),
            ("diff".to_string(), Arc::new(3u32) as Instance),
            ("fresh".to_string(), Arc::new(4u32) as Instance),
        ];
        assert_eq!(overwritten_names(&real, &window), ["diff"]);
    }

    #[test]
    fn unwrap_restores_identity() {
        let deferred = Deferred::new("T");
        let as_instance: Instance = deferred.clone();
        let real: Instance = Arc::new(5u32);
        deferred.link(real.clone(), None);
        assert!(Arc::ptr_eq(&unwrap_deferred(&as_instance), &real));
    }
}
