//! Byte-level Telnet protocol state machine, RFC 1143 Q-Method option
//! negotiation, and an async framing stream built on top of both.
//!
//! This crate is deliberately narrow: it understands the Telnet wire
//! protocol (RFC 854 and friends) and nothing about any particular
//! application built on top of it. Transport (TCP/TLS), line editing, and
//! higher-level protocols layered over subnegotiation payloads (MCCP,
//! GMCP, ...) are all left to the caller.
//!
//! ```text
//! vocab       — command bytes, option ids, signals            (C1)
//! registry    — OptionDescriptor / OptionRegistry              (C2)
//! negotiation — RFC 1143 Q-Method engine                       (C3)
//! fsm         — byte-level protocol parser                     (C4)
//! encoder     — outbound framing                                (C5)
//! stream      — async adapter tying C3/C4/C5 to a transport    (C6)
//! config      — pluggable handlers and constants
//! error       — crate error taxonomy
//! ```

pub mod config;
pub mod encoder;
pub mod error;
pub mod fsm;
pub mod negotiation;
pub mod registry;
pub mod stream;
pub mod vocab;

pub use config::{Configuration, ConfigurationBuilder};
pub use error::{Error, ErrorKind, Result};
pub use fsm::{Event, Fsm, Verdict};
pub use negotiation::{NegState, NegotiationEngine, OptionState, Party, Queue};
pub use registry::{OptionDescriptor, OptionRegistry};
pub use stream::{ReadOutcome, TelnetStream, Transport};
pub use vocab::{Command, Condition, ProcessingSignal};
