//! Live per-container resolution state.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, Shared};

use crate::cyclic::Deferred;
use crate::error::DiResult;
use crate::provider::{Provider, Teardown};
use crate::token::Token;
use crate::Instance;

/// Joinable handle to an in-flight asynchronous resolution.
pub(crate) type SharedResolution = Shared<BoxFuture<'static, DiResult<Instance>>>;

pub(crate) const FLAG_INSTANTIATING: u8 = 1 << 0;
pub(crate) const FLAG_HAS_PLACEHOLDER: u8 = 1 << 1;
pub(crate) const FLAG_PRIVATE: u8 = 1 << 2;
pub(crate) const FLAG_MULTI: u8 = 1 << 3;

/// The resolution state for one token inside one container.
///
/// Invariants: `value`, once set, is only cleared by teardown; a record
/// with an in-flight handle must not start a second resolution (the sync
/// path errors, the async path joins the handle).
pub(crate) struct Record {
    pub(crate) token: Token,
    state: Mutex<RecordState>,
}

pub(crate) struct RecordState {
    /// Single-binding provider. Empty for multi records.
    pub(crate) provider: Option<Provider>,
    /// Contributing providers, registration order. Multi records only.
    pub(crate) contributors: Vec<Provider>,
    pub(crate) value: Option<Instance>,
    pub(crate) flags: u8,
    pub(crate) pending: Option<SharedResolution>,
    pub(crate) placeholder: Option<Arc<Deferred>>,
}

impl Record {
    pub(crate) fn single(token: Token, provider: Provider) -> Record {
        let mut flags = 0;
        if provider.private {
            flags |= FLAG_PRIVATE;
        }
        Record {
            token,
            state: Mutex::new(RecordState {
                provider: Some(provider),
                contributors: Vec::new(),
                value: None,
                flags,
                pending: None,
                placeholder: None,
            }),
        }
    }

    pub(crate) fn multi(token: Token, provider: Provider) -> Record {
        let mut flags = FLAG_MULTI;
        if provider.private {
            flags |= FLAG_PRIVATE;
        }
        Record {
            token,
            state: Mutex::new(RecordState {
                provider: None,
                contributors: vec![provider],
                value: None,
                flags,
                pending: None,
                placeholder: None,
            }),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, RecordState> {
        self.state.lock().unwrap()
    }

    pub(crate) fn teardown(&self) -> Option<Teardown> {
        let state = self.lock();
        match &state.provider {
            Some(p) => p.teardown.clone(),
            None => None,
        }
    }
}

impl RecordState {
    pub(crate) fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    pub(crate) fn set(&mut self, flag: u8) {
        self.flags |= flag;
    }

    pub(crate) fn clear(&mut self, flag: u8) {
        self.flags &= !flag;
    }
}
