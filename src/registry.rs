//! Option descriptor and registry (C2).
//!
//! An `Arc<RwLock<_>>`-backed newtype over a `BTreeMap<u8, _>`, chosen for
//! ordered O(log n) lookup and O(n) bulk-load.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::vocab::option;

/// A predicate over an option id, e.g. "do we accept enabling this option
/// locally/remotely". Stored by callable value so descriptors stay `Clone`
/// and referentially transparent.
pub type Predicate = Arc<dyn Fn(u8) -> bool + Send + Sync>;

/// Static description of a single Telnet option.
///
/// Immutable after registration; cloning a
/// descriptor is cheap (an `Arc` clone per predicate) and a clone is never
/// invalidated by a later registry mutation (registry snapshot stability).
#[derive(Clone)]
pub struct OptionDescriptor {
    id: u8,
    name: &'static str,
    supports_local: Predicate,
    supports_remote: Predicate,
    supports_subneg: bool,
    max_subneg_bytes: usize,
}

impl OptionDescriptor {
    /// Construct a descriptor. `max_subneg_bytes == 0` means unbounded
    /// (discouraged; the registry's defaults use 1024).
    pub fn new(
        id: u8,
        name: &'static str,
        supports_local: Predicate,
        supports_remote: Predicate,
        supports_subneg: bool,
        max_subneg_bytes: usize,
    ) -> Self {
        Self { id, name, supports_local, supports_remote, supports_subneg, max_subneg_bytes }
    }

    /// Convenience constructor for an option with constant (non-predicate)
    /// local/remote acceptability.
    #[must_use]
    pub fn simple(
        id: u8,
        name: &'static str,
        accept_local: bool,
        accept_remote: bool,
        supports_subneg: bool,
        max_subneg_bytes: usize,
    ) -> Self {
        Self::new(
            id,
            name,
            Arc::new(move |_| accept_local),
            Arc::new(move |_| accept_remote),
            supports_subneg,
            max_subneg_bytes,
        )
    }

    /// The option id.
    #[must_use]
    pub fn id(&self) -> u8 {
        self.id
    }

    /// The option's human-readable name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Whether we are willing to enable this option locally (the `us`
    /// side). Predicates are pure: identical input yields identical result
    /// (accepting a descriptor can never silently widen what was previously rejected).
    #[must_use]
    pub fn accepts_local(&self, opt: u8) -> bool {
        (self.supports_local)(opt)
    }

    /// Whether we are willing to accept this option remotely (the `them`
    /// side).
    #[must_use]
    pub fn accepts_remote(&self, opt: u8) -> bool {
        (self.supports_remote)(opt)
    }

    /// Whether this option supports subnegotiation at all.
    #[must_use]
    pub fn supports_subneg(&self) -> bool {
        self.supports_subneg
    }

    /// The maximum subnegotiation payload size, or `0` for unbounded.
    #[must_use]
    pub fn max_subneg_bytes(&self) -> usize {
        self.max_subneg_bytes
    }
}

impl fmt::Debug for OptionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("supports_subneg", &self.supports_subneg)
            .field("max_subneg_bytes", &self.max_subneg_bytes)
            .finish_non_exhaustive()
    }
}

/// Thread-safe registry of known option descriptors.
///
/// Readers never block each other; a concurrent `upsert`/`upsert_bulk`
/// blocks readers only for the duration of its own critical section.
/// Keyed by a `BTreeMap<u8, _>` rather than a `HashMap`, since option ids
/// are dense and small.
#[derive(Clone)]
pub struct OptionRegistry(Arc<RwLock<BTreeMap<u8, OptionDescriptor>>>);

impl OptionRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(RwLock::new(BTreeMap::new())))
    }

    /// A registry pre-loaded with the commonly negotiated options named as
    /// pre-registered: BINARY, ECHO, SUPPRESS-GO-AHEAD, STATUS,
    /// TIMING-MARK, TERMINAL-TYPE, NAWS, TERMINAL-SPEED, LINEMODE,
    /// NEW-ENVIRON, CHARSET, plus END-OF-RECORD (needed to drive `IAC EOR`
    /// signal semantics regardless of enablement).
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut defaults = vec![
            OptionDescriptor::simple(option::BINARY, "BINARY", true, true, false, 0),
            // ECHO: local-only acceptability is intentional — see
            // DESIGN.md for the rationale.
            OptionDescriptor::simple(option::ECHO, "ECHO", true, false, false, 0),
            OptionDescriptor::simple(
                option::SUPPRESS_GO_AHEAD,
                "SUPPRESS-GO-AHEAD",
                true,
                true,
                false,
                0,
            ),
            OptionDescriptor::simple(option::STATUS, "STATUS", true, true, true, 1024),
            OptionDescriptor::simple(option::TIMING_MARK, "TIMING-MARK", true, true, false, 0),
            OptionDescriptor::simple(
                option::TERMINAL_TYPE,
                "TERMINAL-TYPE",
                true,
                true,
                true,
                1024,
            ),
            OptionDescriptor::simple(option::NAWS, "NAWS", true, true, true, 4),
            OptionDescriptor::simple(
                option::TERMINAL_SPEED,
                "TERMINAL-SPEED",
                true,
                true,
                true,
                1024,
            ),
            OptionDescriptor::simple(option::LINEMODE, "LINEMODE", true, true, true, 1024),
            OptionDescriptor::simple(
                option::NEW_ENVIRON,
                "NEW-ENVIRON",
                true,
                true,
                true,
                1024,
            ),
            OptionDescriptor::simple(option::CHARSET, "CHARSET", true, true, true, 1024),
            OptionDescriptor::simple(
                option::END_OF_RECORD,
                "END-OF-RECORD",
                true,
                true,
                false,
                0,
            ),
        ];
        defaults.sort_by_key(OptionDescriptor::id);
        let registry = Self::new();
        registry.upsert_bulk(defaults);
        registry
    }

    /// Look up a descriptor by id. Returns an owned clone (value
    /// semantics); the clone is never invalidated by a later `upsert`.
    #[must_use]
    pub fn get(&self, id: u8) -> Option<OptionDescriptor> {
        self.read(|map| map.get(&id).cloned())
    }

    /// Whether `id` has a registered descriptor.
    #[must_use]
    pub fn has(&self, id: u8) -> bool {
        self.read(|map| map.contains_key(&id))
    }

    /// Insert or replace a descriptor.
    pub fn upsert(&self, descriptor: OptionDescriptor) {
        let mut map = self.0.write().expect("option registry lock poisoned");
        map.insert(descriptor.id(), descriptor);
    }

    /// Batch-load descriptors, presorted by id, in a single locked section.
    pub fn upsert_bulk(&self, descriptors: impl IntoIterator<Item = OptionDescriptor>) {
        let mut map = self.0.write().expect("option registry lock poisoned");
        for descriptor in descriptors {
            map.insert(descriptor.id(), descriptor);
        }
    }

    fn read<T>(&self, f: impl FnOnce(&BTreeMap<u8, OptionDescriptor>) -> T) -> T {
        let guard = self.0.read().expect("option registry lock poisoned");
        f(&guard)
    }
}

impl Default for OptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_spec_options() {
        let reg = OptionRegistry::with_defaults();
        for id in [
            option::BINARY,
            option::ECHO,
            option::SUPPRESS_GO_AHEAD,
            option::STATUS,
            option::TIMING_MARK,
            option::TERMINAL_TYPE,
            option::NAWS,
            option::TERMINAL_SPEED,
            option::LINEMODE,
            option::NEW_ENVIRON,
            option::CHARSET,
            option::END_OF_RECORD,
        ] {
            assert!(reg.has(id), "missing default for option {id}");
        }
        assert!(!reg.has(200));
    }

    #[test]
    fn echo_is_local_only() {
        let reg = OptionRegistry::with_defaults();
        let echo = reg.get(option::ECHO).unwrap();
        assert!(echo.accepts_local(option::ECHO));
        assert!(!echo.accepts_remote(option::ECHO));
    }

    #[test]
    fn get_is_a_stable_snapshot() {
        let reg = OptionRegistry::new();
        reg.upsert(OptionDescriptor::simple(1, "ECHO", true, true, false, 0));
        let snapshot = reg.get(1).unwrap();
        reg.upsert(OptionDescriptor::simple(1, "ECHO-V2", false, false, false, 0));
        assert_eq!(snapshot.name(), "ECHO");
        assert!(snapshot.accepts_local(1));
        let latest = reg.get(1).unwrap();
        assert_eq!(latest.name(), "ECHO-V2");
    }

    #[test]
    fn upsert_bulk_loads_many() {
        let reg = OptionRegistry::new();
        reg.upsert_bulk(vec![
            OptionDescriptor::simple(1, "A", true, true, false, 0),
            OptionDescriptor::simple(2, "B", true, true, false, 0),
        ]);
        assert!(reg.has(1));
        assert!(reg.has(2));
    }

    #[test]
    fn concurrent_readers_see_consistent_state() {
        use std::thread;

        let reg = OptionRegistry::with_defaults();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = reg.clone();
                thread::spawn(move || reg.get(option::ECHO).is_some())
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
    }
}
