//! Resolution stack for cycle detection.
//!
//! One stack lives for one top-level resolution call and holds a frame per
//! provider invocation on the current path. Frames are pushed before a
//! provider's parameters are resolved and popped once it returns, whether it
//! succeeded or not, so sibling branches never see each other's frames.
//!
//! Reaching a frame that is already on the stack closes a cycle. Instead of
//! failing, the resolver hands out the frame's [`ProxyCell`], which is bound
//! when the frame's provider returns.

use crate::descriptor::TypeDescriptor;
use crate::provider::ProviderId;
use crate::proxy::ProxyCell;
use crate::runtime::Shared;

#[cfg(feature = "tracing")]
use tracing::debug;

/// One provider invocation on the current path.
#[derive(Debug)]
pub struct Frame {
    descriptor: TypeDescriptor,
    provider: ProviderId,
    singleton: bool,
    proxy: Option<Shared<ProxyCell>>,
}

impl Frame {
    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn provider(&self) -> ProviderId {
        self.provider
    }

    /// The proxy handed out for this frame, if a cycle reached it.
    pub fn proxy_cell(&self) -> Option<&Shared<ProxyCell>> {
        self.proxy.as_ref()
    }

    fn matches(&self, descriptor: &TypeDescriptor, provider: ProviderId) -> bool {
        // A singleton is in flight as a whole, whichever key reached it.
        self.provider == provider && (self.singleton || &self.descriptor == descriptor)
    }
}

#[derive(Debug, Default)]
pub struct ResolutionStack {
    frames: Vec<Frame>,
}

impl ResolutionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a provider invocation; returns the depth of the new frame.
    pub fn push(&mut self, descriptor: TypeDescriptor, provider: ProviderId, singleton: bool) -> usize {
        self.frames.push(Frame {
            descriptor,
            provider,
            singleton,
            proxy: None,
        });
        self.frames.len() - 1
    }

    /// Leave the innermost invocation.
    ///
    /// # Panics
    ///
    /// Panics when the stack is empty, which means push and pop are unbalanced.
    pub fn pop(&mut self) -> Frame {
        self.frames
            .pop()
            .unwrap_or_else(|| panic!("resolution stack underflow"))
    }

    /// Depth of the frame that `(descriptor, provider)` would cycle back to.
    pub fn find(&self, descriptor: &TypeDescriptor, provider: ProviderId) -> Option<usize> {
        self.frames
            .iter()
            .position(|frame| frame.matches(descriptor, provider))
    }

    /// The proxy cell of the frame at `depth`, created on first use.
    pub fn proxy(&mut self, depth: usize) -> Shared<ProxyCell> {
        let Frame {
            descriptor,
            provider,
            proxy,
            ..
        } = &mut self.frames[depth];
        proxy
            .get_or_insert_with(|| {
                #[cfg(feature = "tracing")]
                debug!(
                    "Cycle detected on {} ({}), deferring with a proxy",
                    descriptor, provider
                );

                Shared::new(ProxyCell::new(descriptor.clone(), *provider))
            })
            .clone()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Descriptors on the current path, outermost first.
    pub fn path(&self) -> Vec<String> {
        self.frames
            .iter()
            .map(|frame| frame.descriptor.to_string())
            .collect()
    }
}
