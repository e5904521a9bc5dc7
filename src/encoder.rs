//! Outbound framing encoder (C5).
//!
//! Builds the raw bytes for application data, bare commands, negotiation
//! commands, and subnegotiations, escaping literal `IAC` bytes wherever
//! they appear in a payload. Invalid command/negotiation bytes are
//! rejected by returning a `Result` rather than silently encoding garbage.

use crate::error::{Error, ErrorKind, Result};
use crate::vocab::{is_bare_command, DO, DONT, IAC, SB, SE, WILL, WONT};

/// Encode application data, doubling every literal `0xFF` byte so it
/// cannot be mistaken for an `IAC`.
#[must_use]
pub fn encode_data(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &b in data {
        out.push(b);
        if b == IAC {
            out.push(IAC);
        }
    }
    out
}

/// Encode a bare one-byte command, e.g. `GA`, `NOP`, `AYT`.
///
/// # Errors
/// Returns [`ErrorKind::InvalidCommand`] if `cmd` is not one of the
/// recognized bare command bytes.
pub fn encode_command(cmd: u8) -> Result<Vec<u8>> {
    if !is_bare_command(cmd) {
        return Err(Error::from(ErrorKind::InvalidCommand(cmd)));
    }
    Ok(vec![IAC, cmd])
}

/// Encode a negotiation command, `IAC <WILL|WONT|DO|DONT> <opt>`.
///
/// # Errors
/// Returns [`ErrorKind::InvalidNegotiation`] if `cmd` is not one of
/// WILL/WONT/DO/DONT.
pub fn encode_negotiation(cmd: u8, opt: u8) -> Result<Vec<u8>> {
    if !matches!(cmd, WILL | WONT | DO | DONT) {
        return Err(Error::from(ErrorKind::InvalidNegotiation(cmd)));
    }
    Ok(vec![IAC, cmd, opt])
}

/// Encode a subnegotiation, `IAC SB <opt> <escaped payload> IAC SE`.
///
/// The payload is escaped the same way [`encode_data`] escapes ordinary
/// data — every literal `0xFF` is doubled so it cannot be mistaken for
/// the terminating `IAC SE`.
#[must_use]
pub fn encode_subnegotiation(opt: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 5);
    out.push(IAC);
    out.push(SB);
    out.push(opt);
    for &b in payload {
        out.push(b);
        if b == IAC {
            out.push(IAC);
        }
    }
    out.push(IAC);
    out.push(SE);
    out
}
