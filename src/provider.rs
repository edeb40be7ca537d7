//! Provider declarations: the recipes a container compiles into records.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::{DiError, DiResult};
use crate::flags::InjectFlags;
use crate::token::Token;
use crate::traits::{AsyncDispose, Dispose, Injectable};
use crate::Instance;

/// A declared dependency: the token to resolve plus per-parameter flags.
///
/// Dependency lists are ordered; the resolved values are applied to the
/// factory or constructor in declared order. A slot resolved with
/// [`Dep::optional`] and no matching provider arrives as `None`.
#[derive(Clone)]
pub struct Dep {
    pub(crate) token: Token,
    pub(crate) flags: InjectFlags,
}

impl Dep {
    /// A required dependency on `token`.
    pub fn new(token: &Token) -> Dep {
        Dep { token: token.clone(), flags: InjectFlags::DEFAULT }
    }

    /// Missing provider yields `None` instead of failing the construction.
    pub fn optional(mut self) -> Dep {
        self.flags |= InjectFlags::OPTIONAL;
        self
    }

    /// Resolve only in the requesting container, never in ancestors.
    pub fn self_only(mut self) -> Dep {
        self.flags |= InjectFlags::SELF_ONLY;
        self
    }

    /// Resolve starting at the parent, skipping the requesting container.
    pub fn skip_self(mut self) -> Dep {
        self.flags |= InjectFlags::SKIP_SELF;
        self
    }
}

/// Arguments handed to factory and class constructors. One slot per
/// declared dependency, in declared order; `None` marks an optional
/// dependency with no provider.
pub type Args<'a> = &'a [Option<Instance>];

pub(crate) type FactoryFn = dyn Fn(Args<'_>) -> DiResult<Instance> + Send + Sync;
pub(crate) type AsyncFactoryFn =
    dyn Fn(Vec<Option<Instance>>) -> BoxFuture<'static, DiResult<Instance>> + Send + Sync;
pub(crate) type ConstructFn =
    dyn Fn(Args<'_>) -> DiResult<(Instance, Arc<dyn Injectable>)> + Send + Sync;

#[derive(Clone)]
pub(crate) enum ProviderForm {
    /// Fixed value; declared dependencies are ignored.
    Value(Instance),
    /// Delegate to another token through the resolving container.
    Existing(Token),
    /// User function over resolved dependency values.
    Factory { func: Arc<FactoryFn>, deps: Vec<Dep> },
    /// User async function over resolved dependency values.
    AsyncFactory { func: Arc<AsyncFactoryFn>, deps: Vec<Dep> },
    /// Class construction plus declared property injection.
    Class {
        construct: Arc<ConstructFn>,
        deps: Vec<Dep>,
        props: Vec<(String, Dep)>,
    },
}

#[derive(Clone)]
pub(crate) enum Teardown {
    Sync(Arc<dyn Fn(&Instance) + Send + Sync>),
    Async(Arc<dyn Fn(Instance) -> BoxFuture<'static, ()> + Send + Sync>),
}

impl Teardown {
    pub(crate) fn run(&self, instance: &Instance) -> Option<BoxFuture<'static, ()>> {
        match self {
            Teardown::Sync(f) => {
                f(instance);
                None
            }
            Teardown::Async(f) => Some(f(instance.clone())),
        }
    }
}

/// A declaration of how to produce a value for a token.
///
/// Forms, in compilation priority order: fixed value, delegate to another
/// token, factory function, async factory function, class construction
/// with optional property injection. A provider additionally carries a
/// `multi` flag (contributes to an ordered list instead of replacing a
/// single value), a `private` flag (invisible to child containers), and
/// an optional captured teardown.
///
/// # Examples
///
/// ```rust
/// use strata_di::{arg, Container, Dep, Provider, Token};
///
/// let port = Token::new("Port");
/// let url = Token::new("Url");
/// let root = Container::builder()
///     .provide(&port, Provider::value(8080u16))
///     .provide(&url, Provider::factory(vec![Dep::new(&port)], |args| {
///         let port = arg::<u16>(args, 0)?;
///         Ok(std::sync::Arc::new(format!("http://localhost:{}", port)))
///     }))
///     .build()
///     .unwrap();
/// assert_eq!(*root.get::<String>(&url).unwrap(), "http://localhost:8080");
/// ```
#[derive(Clone)]
pub struct Provider {
    pub(crate) form: ProviderForm,
    pub(crate) multi: bool,
    pub(crate) private: bool,
    pub(crate) teardown: Option<Teardown>,
}

impl Provider {
    fn from_form(form: ProviderForm) -> Provider {
        Provider { form, multi: false, private: false, teardown: None }
    }

    /// A fixed value. Dependencies are never consulted.
    pub fn value<T: Send + Sync + 'static>(value: T) -> Provider {
        Provider::from_form(ProviderForm::Value(Arc::new(value)))
    }

    /// A fixed, already type-erased value.
    pub fn value_arc(value: Instance) -> Provider {
        Provider::from_form(ProviderForm::Value(value))
    }

    /// Delegates resolution to `target`, looked up through the resolving
    /// container (so a child rebinding `target` takes effect).
    pub fn existing(target: &Token) -> Provider {
        Provider::from_form(ProviderForm::Existing(target.clone()))
    }

    /// A factory function over its declared dependency values.
    pub fn factory<F>(deps: Vec<Dep>, func: F) -> Provider
    where
        F: Fn(Args<'_>) -> DiResult<Instance> + Send + Sync + 'static,
    {
        Provider::from_form(ProviderForm::Factory { func: Arc::new(func), deps })
    }

    /// An async factory function over its declared dependency values.
    ///
    /// Resolving one synchronously is an error under the default strict
    /// boundary policy. Under the lenient policy the synchronous caller
    /// receives a [`PendingResolution`](crate::PendingResolution) handle
    /// instead of the real value, including as a dependency argument to
    /// another synchronous factory, where a typed downcast will fail
    /// until the handle is awaited.
    pub fn async_factory<F, Fut>(deps: Vec<Dep>, func: F) -> Provider
    where
        F: Fn(Vec<Option<Instance>>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = DiResult<Instance>> + Send + 'static,
    {
        let func: Arc<AsyncFactoryFn> = Arc::new(move |args| func(args).boxed());
        Provider::from_form(ProviderForm::AsyncFactory { func, deps })
    }

    /// Class construction: `construct` builds the instance from its
    /// declared constructor dependencies, then declared property injection
    /// runs through [`Injectable::inject_property`]. Only this form can
    /// host a cyclic-dependency placeholder.
    pub fn class<T, F>(deps: Vec<Dep>, construct: F) -> Provider
    where
        T: Injectable,
        F: Fn(Args<'_>) -> DiResult<T> + Send + Sync + 'static,
    {
        let construct: Arc<ConstructFn> = Arc::new(move |args| {
            let built = Arc::new(construct(args)?);
            Ok((built.clone() as Instance, built as Arc<dyn Injectable>))
        });
        Provider::from_form(ProviderForm::Class { construct, deps, props: Vec::new() })
    }

    /// Declares property injection for a class provider: after
    /// construction, `dep` is resolved and written to the property `name`.
    pub fn with_property(mut self, name: impl Into<String>, dep: Dep) -> Provider {
        if let ProviderForm::Class { props, .. } = &mut self.form {
            props.push((name.into(), dep));
        }
        self
    }

    /// Contributes to an ordered list under the token instead of replacing
    /// a single value.
    pub fn multi(mut self) -> Provider {
        self.multi = true;
        self
    }

    /// Restricts visibility to the defining container: lookups crossing in
    /// from a child fail with a scope mismatch unless optional.
    pub fn private(mut self) -> Provider {
        self.private = true;
        self
    }

    /// Captures a synchronous teardown for the produced instance, run in
    /// reverse creation order during `destroy()`.
    pub fn disposable<T: Dispose>(mut self) -> Provider {
        self.teardown = Some(Teardown::Sync(Arc::new(|instance: &Instance| {
            if let Some(value) = instance.downcast_ref::<T>() {
                value.dispose();
            }
        })));
        self
    }

    /// Captures an asynchronous teardown for the produced instance.
    pub fn async_disposable<T: AsyncDispose>(mut self) -> Provider {
        self.teardown = Some(Teardown::Async(Arc::new(|instance: Instance| {
            match instance.downcast::<T>() {
                Ok(value) => async move { value.dispose().await }.boxed(),
                Err(_) => async {}.boxed(),
            }
        })));
        self
    }

    pub(crate) fn is_multi(&self) -> bool {
        self.multi
    }
}

/// Downcasts the required dependency slot `index` to `T`.
pub fn arg<T: Send + Sync + 'static>(args: Args<'_>, index: usize) -> DiResult<Arc<T>> {
    match args.get(index) {
        Some(Some(instance)) => instance
            .clone()
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(format!("argument {}", index))),
        _ => Err(DiError::Construction(format!("missing argument {}", index))),
    }
}

/// Downcasts the optional dependency slot `index` to `T`, if present.
pub fn opt_arg<T: Send + Sync + 'static>(
    args: Args<'_>,
    index: usize,
) -> DiResult<Option<Arc<T>>> {
    match args.get(index) {
        Some(Some(instance)) => instance
            .clone()
            .downcast::<T>()
            .map(Some)
            .map_err(|_| DiError::TypeMismatch(format!("argument {}", index))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arg_downcasts() {
        let args = vec![Some(Arc::new(7u32) as Instance), None];
        assert_eq!(*arg::<u32>(&args, 0).unwrap(), 7);
        assert!(arg::<String>(&args, 0).is_err());
        assert!(arg::<u32>(&args, 1).is_err());
        assert!(opt_arg::<u32>(&args, 1).unwrap().is_none());
    }
}
