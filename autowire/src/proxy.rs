//! Deferred-binding cells used to break construction cycles.
//!
//! When the resolver meets a provider that is already being constructed on
//! the current path, it hands out a proxy instead of recursing. The proxy is
//! bound once the original construction returns; until then every access
//! fails with [`ErrorKind::ProxyNotBound`](crate::error::ErrorKind::ProxyNotBound).
//!
//! Binding is a one-way transition. A cell whose construction fails is marked
//! failed and stays unusable.

use crate::descriptor::TypeDescriptor;
use crate::error::Error;
use crate::provider::ProviderId;
use crate::runtime::Store;
use crate::value::Value;

#[cfg(feature = "tracing")]
use tracing::debug;

#[derive(Debug)]
enum ProxyState {
    Unbound,
    Bound(Value),
    Failed,
}

#[derive(Debug)]
pub struct ProxyCell {
    target: TypeDescriptor,
    provider: ProviderId,
    state: Store<ProxyState>,
}

impl ProxyCell {
    pub(crate) fn new(target: TypeDescriptor, provider: ProviderId) -> Self {
        Self {
            target,
            provider,
            state: Store::new(ProxyState::Unbound),
        }
    }

    /// The descriptor whose construction this cell stands in for.
    pub fn target(&self) -> &TypeDescriptor {
        &self.target
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    pub fn is_bound(&self) -> bool {
        matches!(*self.state.borrow(), ProxyState::Bound(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(*self.state.borrow(), ProxyState::Failed)
    }

    pub(crate) fn bind(&self, value: Value) {
        let mut state = self.state.borrow_mut();
        if matches!(*state, ProxyState::Unbound) {
            #[cfg(feature = "tracing")]
            debug!("Binding proxy for {} ({})", self.target, self.provider);

            *state = ProxyState::Bound(value);
        }
    }

    pub(crate) fn fail(&self) {
        let mut state = self.state.borrow_mut();
        if matches!(*state, ProxyState::Unbound) {
            #[cfg(feature = "tracing")]
            debug!("Proxy for {} ({}) will never be bound", self.target, self.provider);

            *state = ProxyState::Failed;
        }
    }

    /// The bound value.
    pub fn value(&self) -> Result<Value, Error> {
        match &*self.state.borrow() {
            ProxyState::Bound(value) => Ok(value.clone()),
            ProxyState::Unbound => Err(Error::proxy_not_bound(&self.target.to_string())),
            ProxyState::Failed => Err(Error::proxy_failed(&self.target.to_string())),
        }
    }
}
