//! RFC 1143 Q-Method option negotiation engine (C3).
//!
//! Tracks the full four-state-plus-queue table RFC 1143 specifies for each
//! option, on each side, so that a peer's in-flight request can be
//! answered correctly even while we've independently changed our mind
//! about the same option — a scenario a plain accept-list can't represent
//! without entering a negotiation loop. State is kept in a one-entry-per-
//! option table indexed by the option byte.

use std::collections::HashMap;

use crate::error::{ErrorKind, Result};
use crate::registry::OptionRegistry;
use crate::vocab::{DO, DONT, WILL, WONT};

/// One side's negotiation state for a single option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegState {
    /// The option is disabled.
    No,
    /// The option is enabled.
    Yes,
    /// We've asked to disable it and are awaiting confirmation.
    WantNo,
    /// We've asked to enable it and are awaiting confirmation.
    WantYes,
}

/// The queue bit, only meaningful while in `WantNo`/`WantYes`: records
/// that we changed our mind again while a request was already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Queue {
    /// No second request is queued.
    Empty,
    /// The opposite of the in-flight request is queued.
    Opposite,
}

/// One side (`us` or `them`) of an option's negotiation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Side {
    state: NegState,
    queue: Queue,
}

impl Side {
    const fn new() -> Self {
        Self { state: NegState::No, queue: Queue::Empty }
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> NegState {
        self.state
    }

    /// The current queue bit.
    #[must_use]
    pub fn queue(&self) -> Queue {
        self.queue
    }

    fn set_queue(&mut self, opt: u8) -> Result<()> {
        if !matches!(self.state, NegState::WantNo | NegState::WantYes) {
            return Err(ErrorKind::NegotiationQueueError(opt).into());
        }
        self.queue = Queue::Opposite;
        Ok(())
    }
}

impl Default for Side {
    fn default() -> Self {
        Self::new()
    }
}

/// The `(us, them)` state pair for one option.
///
/// Created lazily on first reference; a missing entry is equivalent to
/// `(NO, NO)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OptionState {
    /// Our willingness to perform the option ourselves.
    pub us: Side,
    /// Our willingness to let the peer perform the option.
    pub them: Side,
}

/// Which side of an option an operation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    /// The local host's side (`us`), reacts to DO/DONT, emits WILL/WONT.
    Us,
    /// The remote peer's side (`them`), reacts to WILL/WONT, emits DO/DONT.
    Them,
}

/// RFC 1143 Q-Method negotiation engine.
///
/// Owns the per-option `(us, them)` state pairs and (optionally) a handle
/// to the [`OptionRegistry`] used to decide whether unknown/known options
/// are acceptable. A missing registry entry for an option falls back to the
/// configured unknown-option handler.
pub struct NegotiationEngine {
    states: HashMap<u8, OptionState>,
    registry: OptionRegistry,
    unknown_option_handler: Box<dyn Fn(u8) -> bool + Send + Sync>,
}

impl NegotiationEngine {
    /// Construct an engine over `registry`, consulting
    /// `unknown_option_handler` for options the registry doesn't know about.
    /// If it returns `true`, an unknown option is treated
    /// as though a default-reject descriptor were registered (we still
    /// answer with DONT/WONT, but don't error).
    pub fn new(
        registry: OptionRegistry,
        unknown_option_handler: impl Fn(u8) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self { states: HashMap::new(), registry, unknown_option_handler: Box::new(unknown_option_handler) }
    }

    /// The current state pair for `opt` (a missing entry reads as `(NO, NO)`
    /// without being materialized).
    #[must_use]
    pub fn state(&self, opt: u8) -> OptionState {
        self.states.get(&opt).copied().unwrap_or_default()
    }

    fn entry(&mut self, opt: u8) -> &mut OptionState {
        self.states.entry(opt).or_default()
    }

    fn acceptable(&self, opt: u8, remote: bool) -> bool {
        match self.registry.get(opt) {
            Some(desc) => {
                if remote {
                    desc.accepts_remote(opt)
                } else {
                    desc.accepts_local(opt)
                }
            }
            None => (self.unknown_option_handler)(opt),
        }
    }

    // ── Inbound WILL/WONT (drives `them`) ───────────────────────────────

    /// Handle inbound `IAC WILL <opt>`. Returns the `(cmd, opt)` to send
    /// back, if any.
    pub fn receive_will(&mut self, opt: u8) -> Result<Option<(u8, u8)>> {
        let accept = self.acceptable(opt, true);
        let side = &mut self.entry(opt).them;
        let response = match (side.state, side.queue) {
            (NegState::No, _) => {
                if accept {
                    side.state = NegState::Yes;
                    Some(DO)
                } else {
                    Some(DONT)
                }
            }
            (NegState::Yes, _) => None,
            (NegState::WantNo, Queue::Empty) => {
                // Peer shouldn't WILL after we DONT'd; recoverable protocol
                // error, but we still resync our own state to NO.
                side.state = NegState::No;
                None
            }
            (NegState::WantNo, Queue::Opposite) => {
                side.state = NegState::Yes;
                side.queue = Queue::Empty;
                None
            }
            (NegState::WantYes, Queue::Empty) => {
                side.state = NegState::Yes;
                None
            }
            (NegState::WantYes, Queue::Opposite) => {
                side.state = NegState::WantNo;
                side.queue = Queue::Empty;
                Some(DONT)
            }
        };
        Ok(response.map(|cmd| (cmd, opt)))
    }

    /// Handle inbound `IAC WONT <opt>`.
    pub fn receive_wont(&mut self, opt: u8) -> Result<Option<(u8, u8)>> {
        let side = &mut self.entry(opt).them;
        let response = match (side.state, side.queue) {
            (NegState::No, _) => None,
            (NegState::Yes, _) => {
                side.state = NegState::No;
                Some(DONT)
            }
            (NegState::WantNo, Queue::Empty) => {
                side.state = NegState::No;
                None
            }
            (NegState::WantNo, Queue::Opposite) => {
                side.state = NegState::WantYes;
                side.queue = Queue::Empty;
                Some(DO)
            }
            (NegState::WantYes, Queue::Empty) => {
                side.state = NegState::No;
                None
            }
            (NegState::WantYes, Queue::Opposite) => {
                side.state = NegState::No;
                side.queue = Queue::Empty;
                None
            }
        };
        Ok(response.map(|cmd| (cmd, opt)))
    }

    // ── Inbound DO/DONT (drives `us`) ───────────────────────────────────

    /// Handle inbound `IAC DO <opt>`. Symmetric with [`Self::receive_will`]
    /// on the `us` side, emitting WILL/WONT.
    pub fn receive_do(&mut self, opt: u8) -> Result<Option<(u8, u8)>> {
        let accept = self.acceptable(opt, false);
        let side = &mut self.entry(opt).us;
        let response = match (side.state, side.queue) {
            (NegState::No, _) => {
                if accept {
                    side.state = NegState::Yes;
                    Some(WILL)
                } else {
                    Some(WONT)
                }
            }
            (NegState::Yes, _) => None,
            (NegState::WantNo, Queue::Empty) => {
                side.state = NegState::No;
                None
            }
            (NegState::WantNo, Queue::Opposite) => {
                side.state = NegState::Yes;
                side.queue = Queue::Empty;
                None
            }
            (NegState::WantYes, Queue::Empty) => {
                side.state = NegState::Yes;
                None
            }
            (NegState::WantYes, Queue::Opposite) => {
                side.state = NegState::WantNo;
                side.queue = Queue::Empty;
                Some(WONT)
            }
        };
        Ok(response.map(|cmd| (cmd, opt)))
    }

    /// Handle inbound `IAC DONT <opt>`.
    pub fn receive_dont(&mut self, opt: u8) -> Result<Option<(u8, u8)>> {
        let side = &mut self.entry(opt).us;
        let response = match (side.state, side.queue) {
            (NegState::No, _) => None,
            (NegState::Yes, _) => {
                side.state = NegState::No;
                Some(WONT)
            }
            (NegState::WantNo, Queue::Empty) => {
                side.state = NegState::No;
                None
            }
            (NegState::WantNo, Queue::Opposite) => {
                side.state = NegState::WantYes;
                side.queue = Queue::Empty;
                Some(WILL)
            }
            (NegState::WantYes, Queue::Empty) => {
                side.state = NegState::No;
                None
            }
            (NegState::WantYes, Queue::Opposite) => {
                side.state = NegState::No;
                side.queue = Queue::Empty;
                None
            }
        };
        Ok(response.map(|cmd| (cmd, opt)))
    }

    /// Dispatch a received negotiation command to the matching
    /// `receive_*` method, for callers (the protocol FSM) that only have
    /// the raw `(cmd, opt)` pair. `cmd` values outside WILL/WONT/DO/DONT
    /// return `None`; the FSM never produces one.
    pub fn respond(&mut self, cmd: u8, opt: u8) -> Option<(u8, u8)> {
        let result = match cmd {
            WILL => self.receive_will(opt),
            WONT => self.receive_wont(opt),
            DO => self.receive_do(opt),
            DONT => self.receive_dont(opt),
            _ => return None,
        };
        result.expect("receive_* negotiation handlers never fail")
    }

    /// The registered `max_subneg_bytes` for `opt`, if it has a
    /// descriptor.
    #[must_use]
    pub fn registry_max_subneg_bytes(&self, opt: u8) -> Option<usize> {
        self.registry.get(opt).map(|descriptor| descriptor.max_subneg_bytes())
    }

    /// A cheap handle to the underlying registry, for callers that need
    /// to consult it without holding a borrow of the engine itself.
    #[must_use]
    pub fn registry_handle(&self) -> OptionRegistry {
        self.registry.clone()
    }

    // ── Local request API ───────────────────────────────────────────────

    /// Ask to enable `opt` on the given `side`. Returns the `(cmd, opt)` to
    /// send, if any, per the RFC 1143 local-request table.
    pub fn ask_enable(&mut self, party: Party, opt: u8) -> Result<Option<(u8, u8)>> {
        let (side, enable_cmd) = match party {
            Party::Us => (&mut self.entry(opt).us, WILL),
            Party::Them => (&mut self.entry(opt).them, DO),
        };
        match (side.state, side.queue) {
            (NegState::No, _) => {
                side.state = NegState::WantYes;
                Ok(Some((enable_cmd, opt)))
            }
            (NegState::Yes, _) => Ok(None),
            (NegState::WantNo, Queue::Empty) => {
                side.set_queue(opt)?;
                Ok(None)
            }
            (NegState::WantNo, Queue::Opposite) => Ok(None),
            (NegState::WantYes, _) => Ok(None),
        }
    }

    /// Ask to disable `opt` on the given `side`. Mirrors [`Self::ask_enable`].
    pub fn ask_disable(&mut self, party: Party, opt: u8) -> Result<Option<(u8, u8)>> {
        let (side, disable_cmd) = match party {
            Party::Us => (&mut self.entry(opt).us, WONT),
            Party::Them => (&mut self.entry(opt).them, DONT),
        };
        match (side.state, side.queue) {
            (NegState::Yes, _) => {
                side.state = NegState::WantNo;
                Ok(Some((disable_cmd, opt)))
            }
            (NegState::No, _) => Ok(None),
            (NegState::WantYes, Queue::Empty) => {
                side.set_queue(opt)?;
                Ok(None)
            }
            (NegState::WantYes, Queue::Opposite) => Ok(None),
            (NegState::WantNo, _) => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::OptionRegistry;

    fn engine() -> NegotiationEngine {
        NegotiationEngine::new(OptionRegistry::with_defaults(), |_| false)
    }

    #[test]
    fn do_echo_on_default_registers_will() {
        // IAC DO ECHO -> IAC WILL ECHO.
        let mut eng = engine();
        let resp = eng.receive_do(1).unwrap();
        assert_eq!(resp, Some((WILL, 1)));
        assert_eq!(eng.state(1).us.state(), NegState::Yes);
        assert_eq!(eng.state(1).them.state(), NegState::No);
    }

    #[test]
    fn unknown_option_default_reject() {
        // Scenario 3: unregistered option 42 (CHARSET is actually
        // pre-registered by default; use a genuinely unknown id instead).
        let mut eng = NegotiationEngine::new(OptionRegistry::new(), |_| false);
        let resp = eng.receive_will(200).unwrap();
        assert_eq!(resp, Some((DONT, 200)));
    }

    #[test]
    fn unknown_option_handler_can_accept() {
        let mut eng = NegotiationEngine::new(OptionRegistry::new(), |_| true);
        let resp = eng.receive_will(200).unwrap();
        assert_eq!(resp, Some((DO, 200)));
        assert_eq!(eng.state(200).them.state(), NegState::Yes);
    }

    #[test]
    fn will_after_wantno_empty_is_protocol_error_but_recovers() {
        let mut eng = engine();
        eng.entry(1).them = Side { state: NegState::WantNo, queue: Queue::Empty };
        let resp = eng.receive_will(1).unwrap();
        assert_eq!(resp, None);
        assert_eq!(eng.state(1).them.state(), NegState::No);
    }

    #[test]
    fn will_after_wantno_opposite_confirms_yes() {
        let mut eng = engine();
        eng.entry(1).them = Side { state: NegState::WantNo, queue: Queue::Opposite };
        let resp = eng.receive_will(1).unwrap();
        assert_eq!(resp, None);
        assert_eq!(eng.state(1).them.state(), NegState::Yes);
    }

    #[test]
    fn will_after_wantyes_opposite_requeues_dont() {
        let mut eng = engine();
        eng.entry(1).them = Side { state: NegState::WantYes, queue: Queue::Opposite };
        let resp = eng.receive_will(1).unwrap();
        assert_eq!(resp, Some((DONT, 1)));
        assert_eq!(eng.state(1).them.state(), NegState::WantNo);
        assert_eq!(eng.state(1).them.queue(), Queue::Empty);
    }

    #[test]
    fn wont_clears_active_option() {
        let mut eng = engine();
        eng.entry(1).them = Side { state: NegState::Yes, queue: Queue::Empty };
        let resp = eng.receive_wont(1).unwrap();
        assert_eq!(resp, Some((DONT, 1)));
        assert_eq!(eng.state(1).them.state(), NegState::No);
    }

    #[test]
    fn wont_after_wantno_opposite_requeues_do() {
        let mut eng = engine();
        eng.entry(1).them = Side { state: NegState::WantNo, queue: Queue::Opposite };
        let resp = eng.receive_wont(1).unwrap();
        assert_eq!(resp, Some((DO, 1)));
        assert_eq!(eng.state(1).them.state(), NegState::WantYes);
    }

    #[test]
    fn ask_enable_from_no_sends_request() {
        let mut eng = engine();
        let resp = eng.ask_enable(Party::Them, 1).unwrap();
        assert_eq!(resp, Some((DO, 1)));
        assert_eq!(eng.state(1).them.state(), NegState::WantYes);
    }

    #[test]
    fn ask_enable_while_yes_is_noop() {
        let mut eng = engine();
        eng.entry(1).them = Side { state: NegState::Yes, queue: Queue::Empty };
        assert_eq!(eng.ask_enable(Party::Them, 1).unwrap(), None);
    }

    #[test]
    fn ask_enable_while_wantno_empty_sets_queue() {
        let mut eng = engine();
        eng.entry(1).them = Side { state: NegState::WantNo, queue: Queue::Empty };
        assert_eq!(eng.ask_enable(Party::Them, 1).unwrap(), None);
        assert_eq!(eng.state(1).them.queue(), Queue::Opposite);
    }

    #[test]
    fn queue_bit_rejected_outside_wantno_wantyes() {
        let mut eng = engine();
        // In NO state, asking to enable transitions to WantYes directly
        // (no queue error possible via the public API) — exercise the
        // invariant directly via Side::set_queue.
        let mut side = Side::new();
        let err = side.set_queue(1).unwrap_err();
        assert_eq!(err.kind().identifier(), "negotiation_queue_error");
    }

    #[test]
    fn ask_disable_mirrors_ask_enable() {
        let mut eng = engine();
        eng.entry(1).us = Side { state: NegState::Yes, queue: Queue::Empty };
        let resp = eng.ask_disable(Party::Us, 1).unwrap();
        assert_eq!(resp, Some((WONT, 1)));
        assert_eq!(eng.state(1).us.state(), NegState::WantNo);
    }

    #[test]
    fn missing_option_state_reads_as_no_no() {
        let eng = engine();
        let state = eng.state(99);
        assert_eq!(state.us.state(), NegState::No);
        assert_eq!(state.them.state(), NegState::No);
    }
}
