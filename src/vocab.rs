//! Telnet byte and command vocabulary.
//!
//! Corresponds to the command-byte and option-id constants in `telnet.rs`,
//! extended to the full command set a conforming parser must recognize.

// ── Command bytes ───────────────────────────────────────────────────────────

/// Interpret As Command — starts every Telnet command sequence.
pub const IAC: u8 = 255;
/// Subnegotiation Begin.
pub const SB: u8 = 250;
/// Subnegotiation End.
pub const SE: u8 = 240;
/// No Operation.
pub const NOP: u8 = 241;
/// Data Mark — marks the data position of a Synch event.
pub const DM: u8 = 242;
/// Break.
pub const BRK: u8 = 243;
/// Interrupt Process.
pub const IP: u8 = 244;
/// Abort Output.
pub const AO: u8 = 245;
/// Are You There.
pub const AYT: u8 = 246;
/// Erase Character.
pub const EC: u8 = 247;
/// Erase Line.
pub const EL: u8 = 248;
/// Go Ahead — signals end-of-turn / prompt boundary.
pub const GA: u8 = 249;
/// End of Record — alternative prompt boundary used by some servers.
pub const EOR: u8 = 239;
/// WILL — sender will enable the option.
pub const WILL: u8 = 251;
/// WONT — sender will not enable the option.
pub const WONT: u8 = 252;
/// DO — sender requests the receiver to enable the option.
pub const DO: u8 = 253;
/// DONT — sender requests the receiver to disable the option.
pub const DONT: u8 = 254;

/// Single-byte commands that carry no option and aren't otherwise handled
/// by the parser as a distinct state (EOR/NOP/DM/BRK/IP/AO/AYT/EC/EL/GA).
#[must_use]
pub fn is_bare_command(cmd: u8) -> bool {
    matches!(cmd, EOR | NOP | DM | BRK | IP | AO | AYT | EC | EL | GA)
}

/// Well-known Telnet option numbers (RFC 854 plus the handful of others
/// this crate pre-registers by default).
pub mod option {
    /// Binary Transmission (RFC 856).
    pub const BINARY: u8 = 0;
    /// Echo (RFC 857).
    pub const ECHO: u8 = 1;
    /// Suppress Go Ahead (RFC 858).
    pub const SUPPRESS_GO_AHEAD: u8 = 3;
    /// Status (RFC 859).
    pub const STATUS: u8 = 5;
    /// Timing Mark (RFC 860).
    pub const TIMING_MARK: u8 = 6;
    /// Terminal Type (RFC 1091).
    pub const TERMINAL_TYPE: u8 = 24;
    /// End of Record (RFC 885).
    pub const END_OF_RECORD: u8 = 25;
    /// Negotiate About Window Size (RFC 1073).
    pub const NAWS: u8 = 31;
    /// Terminal Speed (RFC 1079).
    pub const TERMINAL_SPEED: u8 = 32;
    /// Line Mode (RFC 1184).
    pub const LINEMODE: u8 = 34;
    /// New Environment (RFC 1572).
    pub const NEW_ENVIRON: u8 = 39;
    /// Charset (RFC 2066).
    pub const CHARSET: u8 = 42;
}

/// An IAC-prefixed command as dispatched by the parser.
///
/// Negotiation commands (WILL/WONT/DO/DONT) and the subnegotiation
/// begin/end markers are distinguished by name; everything else passes
/// through as [`Command::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `IAC WILL <opt>`.
    Will(u8),
    /// `IAC WONT <opt>`.
    Wont(u8),
    /// `IAC DO <opt>`.
    Do(u8),
    /// `IAC DONT <opt>`.
    Dont(u8),
    /// `IAC SB` — begin subnegotiation.
    SubnegotiationBegin,
    /// `IAC SE` — end subnegotiation.
    SubnegotiationEnd,
    /// Any other one-byte IAC-prefixed command (NOP, GA, EOR, AYT, ...).
    Other(u8),
}

/// A non-error inbound event that may cause a read to complete early.
///
/// Covers events a caller may want to react to that aren't themselves
/// application data: liveness pings, prompts, and bare commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingSignal {
    /// `IAC EOR`.
    EndOfRecord,
    /// `IAC GA`.
    GoAhead,
    /// `IAC EC`.
    EraseCharacter,
    /// `IAC EL`.
    EraseLine,
    /// `IAC AO`.
    AbortOutput,
    /// `IAC IP`.
    InterruptProcess,
    /// `IAC BRK`.
    TelnetBreak,
    /// `IAC DM`.
    DataMark,
}

impl ProcessingSignal {
    /// Map a bare IAC-prefixed command byte to its signal, if it has one.
    ///
    /// Returns `None` for NOP and AYT, which are not surfaced as signals
    /// (NOP is silently discarded; AYT instead queues the configured
    /// response string).
    #[must_use]
    pub fn from_command(cmd: u8) -> Option<Self> {
        Some(match cmd {
            EOR => Self::EndOfRecord,
            GA => Self::GoAhead,
            EC => Self::EraseCharacter,
            EL => Self::EraseLine,
            AO => Self::AbortOutput,
            IP => Self::InterruptProcess,
            BRK => Self::TelnetBreak,
            DM => Self::DataMark,
            _ => return None,
        })
    }
}

/// Cross-category condition code each [`crate::error::ErrorKind`] maps to.
///
/// Lets a caller reason about an error's category without matching on
/// every [`crate::error::ErrorKind`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Generic RFC 854 violation / impossible state transition.
    ProtocolError,
    /// A buffered payload exceeded a configured size limit.
    MessageSize,
    /// The requested option/handler/feature isn't supported.
    NotSupported,
    /// The stream is unhealthy and must be dropped.
    StateNotRecoverable,
    /// The caller attempted an operation the API forbids.
    OperationNotPermitted,
}
