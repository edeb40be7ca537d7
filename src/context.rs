//! Ambient current-container propagation.
//!
//! The ambient container is scoped to the logical resolution chain, never
//! to a physical thread: synchronous chains push a thread-local frame for
//! exactly the duration of a factory call (no suspension inside), while
//! asynchronous chains carry the container in a tokio task-local scope
//! wrapped around the construction future. Two interleaving async chains
//! therefore never observe each other's ambient container.

use std::cell::RefCell;
use std::future::Future;
use std::sync::{Arc, Mutex};

use crate::container::Container;
use crate::error::{DiError, DiResult};
use crate::token::Token;

thread_local! {
    static SYNC_AMBIENT: RefCell<Vec<Container>> = RefCell::new(Vec::new());
}

tokio::task_local! {
    static ASYNC_AMBIENT: AmbientChain;
}

pub(crate) struct AmbientChain {
    pub(crate) container: Container,
    pub(crate) chain: Arc<ChainState>,
}

/// Per-chain resolution stack for async cycle detection.
#[derive(Default)]
pub(crate) struct ChainState {
    stack: Mutex<Vec<Token>>,
}

impl ChainState {
    pub(crate) fn enter(&self, token: &Token) -> DiResult<()> {
        let mut stack = self.stack.lock().unwrap();
        if stack.iter().any(|t| t == token) {
            let mut path: Vec<String> = stack.iter().map(|t| t.name().to_string()).collect();
            path.push(token.name().to_string());
            return Err(DiError::AsyncCycle(path));
        }
        stack.push(token.clone());
        Ok(())
    }

    /// Fails if `token` is already on this chain, without entering it.
    /// Joining an in-flight resolution that sits above us on the same
    /// chain would await our own future.
    pub(crate) fn guard(&self, token: &Token) -> DiResult<()> {
        let stack = self.stack.lock().unwrap();
        if stack.iter().any(|t| t == token) {
            let mut path: Vec<String> = stack.iter().map(|t| t.name().to_string()).collect();
            path.push(token.name().to_string());
            return Err(DiError::AsyncCycle(path));
        }
        Ok(())
    }

    pub(crate) fn exit(&self, token: &Token) {
        let mut stack = self.stack.lock().unwrap();
        if let Some(at) = stack.iter().rposition(|t| t == token) {
            stack.remove(at);
        }
    }
}

/// The chain state of the current async resolution, if inside one.
pub(crate) fn current_chain() -> Option<Arc<ChainState>> {
    ASYNC_AMBIENT.try_with(|a| a.chain.clone()).ok()
}

/// Runs `fut` with `container` ambient for its logical chain. The chain
/// state is shared down through nested scopes so cycle detection spans
/// the whole chain.
pub(crate) fn scope_async<F>(
    container: Container,
    chain: Arc<ChainState>,
    fut: F,
) -> impl Future<Output = F::Output>
where
    F: Future,
{
    ASYNC_AMBIENT.scope(AmbientChain { container, chain }, fut)
}

struct SyncGuard;

impl Drop for SyncGuard {
    fn drop(&mut self) {
        SYNC_AMBIENT.with(|s| {
            s.borrow_mut().pop();
        });
    }
}

/// Runs `f` with `container` as the ambient container on this thread.
///
/// Construction code (factories, constructors, `on_init`) runs inside
/// such a frame automatically; this entry point exists for callers that
/// want [`inject`] to work outside a resolution, e.g. in tests or
/// composition code.
pub fn run_in_container<T>(container: &Container, f: impl FnOnce() -> T) -> T {
    SYNC_AMBIENT.with(|s| s.borrow_mut().push(container.clone()));
    let _guard = SyncGuard;
    f()
}

/// The container ambient to the calling code, if any.
///
/// Checks the innermost synchronous frame first, then the task-local
/// scope of the surrounding async chain.
pub fn current_container() -> Option<Container> {
    let sync = SYNC_AMBIENT.with(|s| s.borrow().last().cloned());
    if sync.is_some() {
        return sync;
    }
    ASYNC_AMBIENT.try_with(|a| a.container.clone()).ok()
}

fn ambient() -> DiResult<Container> {
    current_container().ok_or_else(|| {
        DiError::Construction("no ambient container for inject()".to_string())
    })
}

/// Resolves `token` through the ambient container.
pub fn inject<T: Send + Sync + 'static>(token: &Token) -> DiResult<Arc<T>> {
    ambient()?.get::<T>(token)
}

/// Resolves `token` through the ambient container, tolerating absence.
pub fn inject_optional<T: Send + Sync + 'static>(token: &Token) -> DiResult<Option<Arc<T>>> {
    ambient()?.get_optional::<T>(token)
}

/// Resolves `token` asynchronously through the ambient container.
pub async fn inject_async<T: Send + Sync + 'static>(token: &Token) -> DiResult<Arc<T>> {
    ambient()?.get_async::<T>(token).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_detects_cycles() {
        let chain = ChainState::default();
        let a = Token::new("A");
        let b = Token::new("B");
        chain.enter(&a).unwrap();
        chain.enter(&b).unwrap();
        let err = chain.enter(&a).unwrap_err();
        match err {
            DiError::AsyncCycle(path) => assert_eq!(path, vec!["A", "B", "A"]),
            other => panic!("unexpected: {:?}", other),
        }
        chain.exit(&b);
        chain.exit(&a);
        chain.enter(&a).unwrap();
    }
}
