//! Breakpoint set mirrored into the native core.

use std::collections::BTreeSet;

use log::debug;

use crate::{NativeCore, NativeResult};

/// Authoritative set of breakpoint addresses.
///
/// Every mutation goes to the core first and is applied locally only once
/// the core accepted it, so a failed call leaves both sides unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreakpointSet {
    addresses: BTreeSet<u16>,
}

impl BreakpointSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            addresses: BTreeSet::new(),
        }
    }

    /// Adds `addr`. Already present is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the core's failure; the set is left unchanged.
    pub fn add<C: NativeCore + ?Sized>(&mut self, core: &mut C, addr: u16) -> NativeResult<()> {
        if self.addresses.contains(&addr) {
            return Ok(());
        }
        core.add_breakpoint(addr)?;
        self.addresses.insert(addr);
        debug!("breakpoint added at ${addr:04X}");
        Ok(())
    }

    /// Removes `addr`. Absent is a no-op.
    ///
    /// # Errors
    ///
    /// Returns the core's failure; the set is left unchanged.
    pub fn remove<C: NativeCore + ?Sized>(&mut self, core: &mut C, addr: u16) -> NativeResult<()> {
        if !self.addresses.contains(&addr) {
            return Ok(());
        }
        core.remove_breakpoint(addr)?;
        self.addresses.remove(&addr);
        debug!("breakpoint removed at ${addr:04X}");
        Ok(())
    }

    /// Flips membership of `addr` and returns the new membership.
    ///
    /// # Errors
    ///
    /// Returns the core's failure; the set is left unchanged.
    pub fn toggle<C: NativeCore + ?Sized>(&mut self, core: &mut C, addr: u16) -> NativeResult<bool> {
        if self.contains(addr) {
            self.remove(core, addr)?;
            Ok(false)
        } else {
            self.add(core, addr)?;
            Ok(true)
        }
    }

    /// Removes every breakpoint.
    ///
    /// # Errors
    ///
    /// Returns the core's failure; the set is left unchanged.
    pub fn clear<C: NativeCore + ?Sized>(&mut self, core: &mut C) -> NativeResult<()> {
        core.clear_breakpoints()?;
        self.addresses.clear();
        debug!("breakpoints cleared");
        Ok(())
    }

    /// Membership query used by rendering and halt classification.
    #[must_use]
    pub fn contains(&self, addr: u16) -> bool {
        self.addresses.contains(&addr)
    }

    /// Addresses in ascending order.
    #[must_use]
    pub fn list_sorted(&self) -> Vec<u16> {
        self.addresses.iter().copied().collect()
    }

    /// Number of breakpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Returns `true` when no breakpoint is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}
