//! The label table: names bound to addresses during a single assembly pass,
//! with a queue of not-yet-patched forward references per unbound label.

use std::collections::HashMap;

/// One label's resolution state.
#[derive(Debug, Clone, Default)]
pub struct LabelEntry {
    /// The bound address, once known. `None` means "seen only as a forward
    /// reference so far".
    pub address: Option<i32>,
    /// Addresses of instruction words still waiting for this label's value.
    pub forward_refs: Vec<i32>,
    /// Every address that ever referenced this label, bound or not (kept
    /// for diagnostics; unlike `forward_refs` this is never drained).
    pub refs: Vec<i32>,
}

/// Labels seen during one assembly pass, keyed by name.
#[derive(Debug, Default)]
pub struct LabelTable {
    entries: HashMap<String, LabelEntry>,
}

impl LabelTable {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// Bind `name` to `address`.
    ///
    /// Returns `Ok(forward_refs)` — the (now emptied) queue of instruction
    /// addresses waiting on this label, for the caller to patch — unless
    /// `name` was already bound, in which case this is a duplicate
    /// definition and `Err(())` is returned with the table left untouched.
    pub fn bind(&mut self, name: &str, address: i32) -> Result<Vec<i32>, ()> {
        let entry = self.entries.entry(name.to_string()).or_default();
        if entry.address.is_some() {
            return Err(());
        }
        entry.address = Some(address);
        Ok(std::mem::take(&mut entry.forward_refs))
    }

    /// Reference `name` from the instruction at `referencing_addr`.
    ///
    /// Returns `Some(address)` if the label is already bound (the caller
    /// resolves it immediately); `None` if it is still unresolved (the
    /// caller must queue a pending fixup, and this call has already
    /// recorded `referencing_addr` in the forward-reference queue).
    pub fn reference(&mut self, name: &str, referencing_addr: i32) -> Option<i32> {
        let entry = self.entries.entry(name.to_string()).or_default();
        entry.refs.push(referencing_addr);
        match entry.address {
            Some(addr) => Some(addr),
            None => {
                entry.forward_refs.push(referencing_addr);
                None
            }
        }
    }

    /// Names of every label that never bound to an address (after a clean
    /// load, this is empty).
    #[must_use]
    pub fn unresolved(&self) -> Vec<String> {
        let mut names: Vec<String> =
            self.entries.iter().filter(|(_, e)| e.address.is_none()).map(|(n, _)| n.clone()).collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_reference_then_bind_returns_queued_addresses() {
        let mut table = LabelTable::new();
        assert_eq!(table.reference("LOOP", 100), None);
        assert_eq!(table.reference("LOOP", 105), None);
        assert_eq!(table.bind("LOOP", 120).unwrap(), vec![100, 105]);
        assert!(table.unresolved().is_empty());
    }

    #[test]
    fn reference_after_bind_resolves_immediately() {
        let mut table = LabelTable::new();
        table.bind("START", 24).unwrap();
        assert_eq!(table.reference("START", 50), Some(24));
    }

    #[test]
    fn duplicate_bind_is_rejected() {
        let mut table = LabelTable::new();
        table.bind("X", 10).unwrap();
        assert!(table.bind("X", 20).is_err());
    }

    #[test]
    fn unbound_label_is_unresolved() {
        let mut table = LabelTable::new();
        table.reference("GHOST", 10);
        assert_eq!(table.unresolved(), vec!["GHOST".to_string()]);
    }
}
