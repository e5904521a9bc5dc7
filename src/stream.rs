//! Async stream adapter (C6).
//!
//! Stays transport-agnostic: a [`Transport`] trait stands in for a
//! concrete socket type, and the read loop drives the [`Fsm`] (C4) and
//! [`NegotiationEngine`] (C3) over whatever bytes it reads, using a flat
//! `READ_BUF` scratch array.

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::config::Configuration;
use crate::encoder;
use crate::error::{Error, Result};
use crate::fsm::{Event, Fsm, Verdict};
use crate::negotiation::NegotiationEngine;
use crate::registry::OptionRegistry;
use crate::vocab::ProcessingSignal;

const READ_BUF: usize = 8192;
const SIDEBAND_CAPACITY: usize = 16;

/// The byte-level transport a [`TelnetStream`] reads from and writes to.
///
/// A blanket impl covers any `T: AsyncRead + AsyncWrite + Unpin`
/// (ordinary TCP/TLS streams); implement this directly only for transports
/// that aren't already `AsyncRead + AsyncWrite`.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Read at least one byte, or return `Ok(0)` on EOF.
    async fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// Write the entire buffer.
    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
}

impl<T: AsyncRead + AsyncWrite + Unpin> Transport for T {
    async fn read_some(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        AsyncReadExt::read(self, buf).await
    }

    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        AsyncWriteExt::write_all(self, buf).await
    }
}

/// The result of a single [`TelnetStream::read`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// Application data decoded from the stream.
    Data(Vec<u8>),
    /// The peer closed the connection.
    Closed,
}

/// Coordinates reads and writes over a [`Transport`], driving the protocol
/// FSM (C4) and Q-Method negotiation engine (C3) and queuing their
/// responses for transmission.
///
/// Not `Sync`-shared by convention: a single owner drives it with `&mut
/// self` methods.
pub struct TelnetStream<T> {
    transport: T,
    fsm: Fsm,
    negotiation: NegotiationEngine,
    config: Configuration,
    read_buf: [u8; READ_BUF],
    pending_out: Vec<u8>,
    signal_tx: mpsc::Sender<ProcessingSignal>,
    signal_rx: mpsc::Receiver<ProcessingSignal>,
    dropped_signals: Arc<AtomicU64>,
}

impl<T: Transport> TelnetStream<T> {
    /// Wrap `transport`, using `registry` for negotiation acceptability
    /// and `config` for the pluggable handlers/constants.
    #[must_use]
    pub fn new(transport: T, registry: OptionRegistry, config: Configuration) -> Self {
        let unknown_handler = config.unknown_option_handler.clone();
        let negotiation = NegotiationEngine::new(registry, move |opt| unknown_handler(opt));
        let (signal_tx, signal_rx) = mpsc::channel(SIDEBAND_CAPACITY);
        Self {
            transport,
            fsm: Fsm::new(),
            negotiation,
            config,
            read_buf: [0u8; READ_BUF],
            pending_out: Vec::new(),
            signal_tx,
            signal_rx,
            dropped_signals: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A cloneable sender for the sideband signal channel, for callers
    /// that want to observe [`ProcessingSignal`]s from another task.
    #[must_use]
    pub fn signal_sender(&self) -> mpsc::Sender<ProcessingSignal> {
        self.signal_tx.clone()
    }

    /// Receive the next buffered sideband signal without blocking on a
    /// network read, if one is already queued.
    pub fn try_recv_signal(&mut self) -> Option<ProcessingSignal> {
        self.signal_rx.try_recv().ok()
    }

    /// Number of sideband signals dropped due to a full channel.
    #[must_use]
    pub fn dropped_signals(&self) -> u64 {
        self.dropped_signals.load(Ordering::Relaxed)
    }

    /// Read from the transport, decode one chunk, and flush any
    /// negotiation responses the chunk produced before returning.
    ///
    /// A `Signal` event (GA, AYT, ...) does not stop the loop early: it is
    /// queued to the sideband channel and the rest of the chunk is still
    /// consumed, trading immediate/early completion for simpler
    /// iteration. Callers that need a signal the instant it arrives should
    /// poll `try_recv_signal` from another task rather than relying on
    /// `read` to return right after it.
    ///
    /// A per-byte protocol error (e.g. a subnegotiation overflowing its
    /// bound, or an invalid command/negotiation byte) ends the chunk: any
    /// bytes already queued for transmission are flushed first, then the
    /// error is returned from `read` itself so the caller sees it as part
    /// of the read that produced it, not just through `error_logger`.
    pub async fn read(&mut self) -> Result<ReadOutcome> {
        let n = self.transport.read_some(&mut self.read_buf).await.map_err(Error::from)?;
        if n == 0 {
            return Ok(ReadOutcome::Closed);
        }

        let registry = self.negotiation.registry_handle();
        let default_max = self.config.default_max_subneg_bytes;

        let mut data = Vec::new();
        for i in 0..n {
            let byte = self.read_buf[i];
            let result = self.fsm.step(
                byte,
                |opt| registry.get(opt).map(|d| d.max_subneg_bytes()).unwrap_or(default_max),
                |cmd, opt| self.negotiation.respond(cmd, opt),
            );

            match result.verdict {
                Verdict::Keep | Verdict::KeepEscaped => data.push(byte),
                Verdict::Discard => {}
            }

            if let Some(event) = result.event {
                if let Err(err) = self.handle_event(event).await {
                    let _ = self.flush_pending().await;
                    return Err(err);
                }
            }
        }

        self.flush_pending().await?;

        // `data` may be empty if every byte in this chunk was protocol
        // machinery; callers loop on `read` rather than treating an empty
        // chunk as EOF (only `ReadOutcome::Closed` means that).
        Ok(ReadOutcome::Data(data))
    }

    async fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::NegotiationResponse(cmd, opt) => {
                let bytes = encoder::encode_negotiation(cmd, opt)?;
                self.pending_out.extend_from_slice(&bytes);
            }
            Event::Signal(signal) => {
                self.queue_signal(signal);
            }
            Event::AreYouThere => {
                let response = self.config.ayt_response.clone();
                self.pending_out.extend_from_slice(&encoder::encode_data(response.as_bytes()));
            }
            Event::SubnegotiationComplete(opt, payload) => {
                if let Some(handler) = self.config.subneg_handlers.get(&opt) {
                    if let Some(reply) = handler(&payload) {
                        let bytes = encoder::encode_subnegotiation(opt, &reply);
                        self.pending_out.extend_from_slice(&bytes);
                    }
                }
            }
            Event::Error(kind) => {
                (self.config.error_logger)(&kind, "fsm");
                return Err(kind.into());
            }
        }
        Ok(())
    }

    fn queue_signal(&mut self, signal: ProcessingSignal) {
        if self.signal_tx.try_send(signal).is_err() {
            let _ = self.signal_rx.try_recv();
            if self.signal_tx.try_send(signal).is_err() {
                self.dropped_signals.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    async fn flush_pending(&mut self) -> Result<()> {
        if !self.pending_out.is_empty() {
            let bytes = std::mem::take(&mut self.pending_out);
            self.transport.write_all(&bytes).await.map_err(Error::from)?;
        }
        Ok(())
    }

    /// Write application data, IAC-escaping it first.
    pub async fn write(&mut self, data: &[u8]) -> Result<()> {
        let encoded = encoder::encode_data(data);
        self.transport.write_all(&encoded).await.map_err(Error::from)
    }

    /// Write a bare command, e.g. `GA`.
    pub async fn write_command(&mut self, cmd: u8) -> Result<()> {
        let encoded = encoder::encode_command(cmd)?;
        self.transport.write_all(&encoded).await.map_err(Error::from)
    }

    /// Send a negotiation command directly, bypassing the Q-Method
    /// engine's own request bookkeeping. Prefer driving negotiation
    /// through [`Self::ask_enable`]/[`Self::ask_disable`] instead, unless
    /// the caller needs to answer out-of-band.
    pub async fn send_negotiation(&mut self, cmd: u8, opt: u8) -> Result<()> {
        let encoded = encoder::encode_negotiation(cmd, opt)?;
        self.transport.write_all(&encoded).await.map_err(Error::from)
    }

    /// Send a subnegotiation.
    pub async fn send_subnegotiation(&mut self, opt: u8, payload: &[u8]) -> Result<()> {
        let encoded = encoder::encode_subnegotiation(opt, payload);
        self.transport.write_all(&encoded).await.map_err(Error::from)
    }

    /// Ask to enable `opt` locally or request the peer enable it,
    /// transmitting the request if the Q-Method engine produces one.
    pub async fn ask_enable(&mut self, party: crate::negotiation::Party, opt: u8) -> Result<()> {
        if let Some((cmd, opt)) = self.negotiation.ask_enable(party, opt)? {
            self.send_negotiation(cmd, opt).await?;
        }
        Ok(())
    }

    /// Mirror of [`Self::ask_enable`] for disabling an option.
    pub async fn ask_disable(&mut self, party: crate::negotiation::Party, opt: u8) -> Result<()> {
        if let Some((cmd, opt)) = self.negotiation.ask_disable(party, opt)? {
            self.send_negotiation(cmd, opt).await?;
        }
        Ok(())
    }

    /// Shared access to the negotiation state, e.g. for UI that reports
    /// which options are currently active.
    #[must_use]
    pub fn negotiation_state(&self, opt: u8) -> crate::negotiation::OptionState {
        self.negotiation.state(opt)
    }
}
