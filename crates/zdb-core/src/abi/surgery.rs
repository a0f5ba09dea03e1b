//! # Shared-Handle Surgery
//!
//! Getting a `TypeSummaryImplSP` without constructing one.
//!
//! LLDB's public `SBTypeSummary` has exactly one data member, an
//! `std::shared_ptr<TypeSummaryImpl>`. The public factory
//! `SBTypeSummary::CreateWithCallback` builds a callback summary for us, so the
//! handle the private `AddTypeSummary` wants is already sitting at offset 0 of
//! the wrapper. We read it in place.
//!
//! The wrapper (not a copy of its handle) is then parked in a
//! [`SummaryRegistry`] that is never dropped, so the reference count LLDB sees
//! stays valid for the rest of the process.

use super::SharedHandle;
use crate::summaries::SummaryKind;

/// A public summary wrapper whose only member is a [`SharedHandle`].
///
/// # Safety
///
/// Implementors guarantee that [`HandleWrapper::shared_handle`] returns the
/// wrapper's own storage (not a copy) and that the storage stays at the same
/// address for as long as the wrapper is not moved.
pub unsafe trait HandleWrapper
{
    /// Whether the factory produced a usable summary.
    fn is_valid(&self) -> bool;

    /// The embedded handle.
    fn shared_handle(&mut self) -> &mut SharedHandle;
}

/// Produces summary wrappers around the callbacks in [`crate::summaries`].
pub trait SummaryFactory
{
    type Wrapper: HandleWrapper;

    /// Build a wrapper whose callback renders `kind`, with the cascade option set.
    ///
    /// Returns `None` when the host refuses to build one.
    fn create(&self, kind: SummaryKind, description: &str) -> Option<Self::Wrapper>;
}

/// Process-lifetime, append-only store of summary wrappers.
pub struct SummaryRegistry<W>
{
    wrappers: Vec<Box<W>>,
}

impl<W: HandleWrapper> SummaryRegistry<W>
{
    pub fn new() -> Self
    {
        Self { wrappers: Vec::new() }
    }

    /// Keep `wrapper` and hand out its embedded handle.
    ///
    /// Invalid wrappers are dropped and yield `None`. Each kept wrapper is boxed,
    /// so the returned handle does not move when later wrappers are added.
    pub fn adopt(&mut self, wrapper: W) -> Option<&mut SharedHandle>
    {
        if !wrapper.is_valid() {
            return None;
        }

        self.wrappers.push(Box::new(wrapper));
        self.wrappers.last_mut().map(|wrapper| wrapper.shared_handle())
    }

    pub fn len(&self) -> usize
    {
        self.wrappers.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.wrappers.is_empty()
    }

    /// Give up ownership so the wrappers outlive every category entry.
    pub fn into_process_lifetime(self) -> &'static Self
    where
        W: 'static,
    {
        Box::leak(Box::new(self))
    }
}

impl<W: HandleWrapper> Default for SummaryRegistry<W>
{
    fn default() -> Self
    {
        Self::new()
    }
}
