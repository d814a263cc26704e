//! Frame transports. Both ends of a transport are polled from the battle
//! loop; nothing here blocks the caller.

use std::{
    cmp::Reverse,
    collections::BinaryHeap,
    sync::mpsc::{self, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use color_eyre::{eyre::eyre, Result};
use log::{debug, info, trace};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use super::packet::Reliability;
use crate::engine::config::ChaosConfig;

pub trait Transport {
    fn send(&mut self, reliability: Reliability, frame: Vec<u8>) -> Result<()>;

    /// The next frame that has arrived, if any.
    fn try_recv(&mut self) -> Option<Vec<u8>>;
}

/// An in-memory transport: frames arrive on the next poll, in order.
pub struct ChannelTransport {
    outbound: UnboundedSender<Vec<u8>>,
    inbound: UnboundedReceiver<Vec<u8>>,
}

pub fn channel_pair() -> (ChannelTransport, ChannelTransport) {
    let (a_tx, a_rx) = unbounded_channel();
    let (b_tx, b_rx) = unbounded_channel();
    (
        ChannelTransport { outbound: a_tx, inbound: b_rx },
        ChannelTransport { outbound: b_tx, inbound: a_rx },
    )
}

impl Transport for ChannelTransport {
    fn send(&mut self, _reliability: Reliability, frame: Vec<u8>) -> Result<()> {
        self.outbound.send(frame).map_err(|_| eyre!("transport: peer hung up"))
    }

    fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.inbound.try_recv().ok()
    }
}

/// One end of a simulated network link. Each direction runs on its own
/// thread which delays, reorders and drops frames according to a
/// [`ChaosConfig`]. Reliable frames are never dropped and ordered frames
/// never overtake each other.
pub struct LinkTransport {
    outbound: mpsc::Sender<(Reliability, Vec<u8>)>,
    inbound: UnboundedReceiver<Vec<u8>>,
}

pub fn loopback_pair(chaos: ChaosConfig) -> (LinkTransport, LinkTransport) {
    let (a_out, a_link) = mpsc::channel();
    let (b_out, b_link) = mpsc::channel();
    let (a_in_tx, a_in) = unbounded_channel();
    let (b_in_tx, b_in) = unbounded_channel();

    spawn_link("a->b", chaos.clone(), chaos.seed, a_link, b_in_tx);
    spawn_link("b->a", chaos.clone(), chaos.seed.wrapping_add(1), b_link, a_in_tx);

    (
        LinkTransport { outbound: a_out, inbound: a_in },
        LinkTransport { outbound: b_out, inbound: b_in },
    )
}

impl Transport for LinkTransport {
    fn send(&mut self, reliability: Reliability, frame: Vec<u8>) -> Result<()> {
        self.outbound
            .send((reliability, frame))
            .map_err(|_| eyre!("transport: link is down"))
    }

    fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.inbound.try_recv().ok()
    }
}

const IDLE_WAIT: Duration = Duration::from_millis(50);

struct LinkState {
    chaos: ChaosConfig,
    rng: StdRng,
    queue: BinaryHeap<Reverse<(Instant, u64, Vec<u8>)>>,
    counter: u64,
    last_ordered: Option<Instant>,
}

impl LinkState {
    fn admit(&mut self, reliability: Reliability, frame: Vec<u8>, now: Instant) {
        if !reliability.is_reliable() && self.rng.gen_bool(self.chaos.drop_rate) {
            trace!("link: dropped a {} byte frame", frame.len());
            return;
        }

        let jitter = self.chaos.jitter.as_nanos() as u64;
        let mut deliver_at = now + self.chaos.latency + Duration::from_nanos(self.rng.gen_range(0..=jitter));
        if reliability == Reliability::ReliableOrdered {
            if let Some(last) = self.last_ordered {
                deliver_at = deliver_at.max(last);
            }
            self.last_ordered = Some(deliver_at);
        }

        // the counter keeps frames due at the same instant in send order
        self.counter += 1;
        self.queue.push(Reverse((deliver_at, self.counter, frame)));
    }

    fn next_due(&self) -> Option<Instant> {
        self.queue.peek().map(|Reverse((at, _, _))| *at)
    }
}

fn spawn_link(
    name: &'static str,
    chaos: ChaosConfig,
    seed: u64,
    frames: mpsc::Receiver<(Reliability, Vec<u8>)>,
    deliver: UnboundedSender<Vec<u8>>,
) {
    thread::spawn(move || {
        info!("link {name}: up with {chaos:?}");
        let mut link = LinkState {
            rng: StdRng::seed_from_u64(seed),
            chaos,
            queue: BinaryHeap::new(),
            counter: 0,
            last_ordered: None,
        };
        let mut sender_gone = false;

        loop {
            let now = Instant::now();
            while link.next_due().is_some_and(|at| at <= now) {
                let Some(Reverse((_, _, frame))) = link.queue.pop() else {
                    break;
                };
                if deliver.send(frame).is_err() {
                    debug!("link {name}: receiver gone, shutting down");
                    return;
                }
            }

            if sender_gone {
                if link.queue.is_empty() {
                    debug!("link {name}: drained, shutting down");
                    return;
                }
                thread::sleep(link.next_due().map_or(IDLE_WAIT, |at| at.saturating_duration_since(now)));
                continue;
            }

            let wait = link.next_due().map_or(IDLE_WAIT, |at| at.saturating_duration_since(now));
            match frames.recv_timeout(wait) {
                Ok((reliability, frame)) => link.admit(reliability, frame, Instant::now()),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => sender_gone = true,
            }
        }
    });
}
