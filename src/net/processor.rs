//! Frames signals, tracks acknowledgements and watches the connection.
//!
//! All timing is driven by the `Instant`s the caller passes in, so a peer
//! can be tested without sleeping.

use std::{
    collections::{BTreeMap, VecDeque},
    time::{Duration, Instant},
};

use color_eyre::Result;
use log::{debug, error, trace, warn};

use super::{
    packet::{Frame, Reliability},
    transport::Transport,
};

/// Errors tolerated before the connection is dropped.
pub const MAX_CONNECTION_ERRORS: u32 = 10;
/// Acknowledged round trips kept for the latency average.
pub const RTT_WINDOW: usize = 10;

pub struct PacketProcessor<T> {
    transport: T,
    next_id: u64,
    /// Outbound sequence numbers per signal kind.
    next_seq: BTreeMap<u8, u64>,
    /// Newest sequence number seen per signal kind.
    newest_seq: BTreeMap<u8, u64>,
    unacked: BTreeMap<u64, Instant>,
    rtts: VecDeque<Duration>,
    handshake_id: Option<u64>,
    handshake_acked: bool,
    handshakes_sent: u32,
    handshakes_received: u32,
    last_heard: Option<Instant>,
    kick_for_silence: bool,
    silence_timeout: Duration,
    errors: u32,
    kicked: bool,
}

impl<T: Transport> PacketProcessor<T> {
    pub fn new(transport: T, silence_timeout: Duration) -> Self {
        Self {
            transport,
            next_id: 0,
            next_seq: BTreeMap::new(),
            newest_seq: BTreeMap::new(),
            unacked: BTreeMap::new(),
            rtts: VecDeque::with_capacity(RTT_WINDOW),
            handshake_id: None,
            handshake_acked: false,
            handshakes_sent: 0,
            handshakes_received: 0,
            last_heard: None,
            kick_for_silence: false,
            silence_timeout,
            errors: 0,
            kicked: false,
        }
    }

    /// Sends a signal body and returns the id of the frame carrying it.
    pub fn send(&mut self, reliability: Reliability, body: Vec<u8>, now: Instant) -> Result<u64> {
        self.next_id += 1;
        let id = self.next_id;
        let kind = body.first().copied().unwrap_or_default();
        let seq = self.next_seq.entry(kind).or_default();
        *seq += 1;
        let frame = Frame::Data {
            id,
            reliability,
            seq: *seq,
            body,
        };
        if reliability.is_reliable() {
            self.unacked.insert(id, now);
        }
        self.transport.send(reliability, frame.encode())?;
        Ok(id)
    }

    /// Drains every frame that has arrived and returns the signal bodies to
    /// apply, in arrival order.
    pub fn poll(&mut self, now: Instant) -> Vec<Vec<u8>> {
        let mut bodies = vec![];
        while let Some(bytes) = self.transport.try_recv() {
            let frame = match Frame::decode(&bytes) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("netplay: dropping malformed frame: {e:#}");
                    continue;
                }
            };
            self.last_heard = Some(now);

            match frame {
                Frame::Ack { id } => self.acknowledged(id, now),
                Frame::Data { id, reliability, seq, body } => {
                    if reliability.is_reliable() {
                        let ack = Frame::Ack { id };
                        if let Err(e) = self.transport.send(ack.reliability(), ack.encode()) {
                            warn!("netplay: could not ack frame {id}: {e}");
                        }
                    } else if !self.is_newest(&body, seq) {
                        trace!("netplay: dropping stale frame {id} (seq {seq})");
                        continue;
                    }
                    bodies.push(body);
                }
            }
        }
        bodies
    }

    fn is_newest(&mut self, body: &[u8], seq: u64) -> bool {
        let kind = body.first().copied().unwrap_or_default();
        let newest = self.newest_seq.entry(kind).or_default();
        if seq <= *newest {
            return false;
        }
        *newest = seq;
        true
    }

    fn acknowledged(&mut self, id: u64, now: Instant) {
        let Some(sent) = self.unacked.remove(&id) else {
            return;
        };
        if self.rtts.len() == RTT_WINDOW {
            self.rtts.pop_front();
        }
        self.rtts.push_back(now.saturating_duration_since(sent));
        if self.handshake_id == Some(id) {
            debug!("netplay: handshake {id} acknowledged");
            self.handshake_acked = true;
        }
    }

    /// Rolling average over the last acknowledged round trips.
    pub fn average_rtt(&self) -> Duration {
        if self.rtts.is_empty() {
            return Duration::ZERO;
        }
        self.rtts.iter().sum::<Duration>() / self.rtts.len() as u32
    }

    /// Marks frame `id` as carrying our latest handshake.
    pub fn update_handshake_id(&mut self, id: u64) {
        self.handshake_id = Some(id);
        self.handshake_acked = !self.unacked.contains_key(&id);
        self.handshakes_sent += 1;
    }

    pub fn remote_handshake_received(&mut self) {
        self.handshakes_received += 1;
    }

    /// True once our latest handshake was acknowledged and the remote's
    /// handshake for the same round has arrived.
    pub fn is_handshake_complete(&self) -> bool {
        self.handshakes_sent > 0 && self.handshake_acked && self.handshakes_received >= self.handshakes_sent
    }

    pub fn enable_kick_for_silence(&mut self, enabled: bool, now: Instant) {
        self.kick_for_silence = enabled;
        self.last_heard = Some(now);
    }

    /// Checks the connection; returns whether the remote should be dropped.
    pub fn update(&mut self, now: Instant) -> bool {
        if self.kick_for_silence && !self.kicked {
            let heard = self.last_heard.unwrap_or(now);
            if now.saturating_duration_since(heard) > self.silence_timeout {
                error!("netplay: remote silent for over {:?}, kicking", self.silence_timeout);
                self.kicked = true;
            }
        }
        self.kicked
    }

    pub fn handle_error(&mut self) {
        self.errors += 1;
        warn!("netplay: connection error {}/{}", self.errors, MAX_CONNECTION_ERRORS);
        if self.errors >= MAX_CONNECTION_ERRORS && !self.kicked {
            error!("netplay: too many connection errors, kicking");
            self.kicked = true;
        }
    }

    pub fn is_kicked(&self) -> bool {
        self.kicked
    }

    pub fn errors(&self) -> u32 {
        self.errors
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
