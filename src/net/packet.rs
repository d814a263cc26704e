use color_eyre::{eyre::bail, Result};

use super::signal::{BufferReader, BufferWriter};

/// Delivery guarantees a frame is sent with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Reliability {
    /// May be lost; older frames of the same kind are discarded on arrival.
    UnreliableSequenced = 0,
    /// Always arrives and is acknowledged, in any order.
    Reliable = 1,
    /// Always arrives, acknowledged, in send order.
    ReliableOrdered = 2,
}

impl Reliability {
    pub fn is_reliable(self) -> bool {
        self != Reliability::UnreliableSequenced
    }
}

impl TryFrom<u8> for Reliability {
    type Error = color_eyre::Report;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Reliability::UnreliableSequenced,
            1 => Reliability::Reliable,
            2 => Reliability::ReliableOrdered,
            other => bail!("unknown reliability {other}"),
        })
    }
}

const DATA: u8 = 0;
const ACK: u8 = 1;

/// What actually travels over a transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Data {
        id: u64,
        reliability: Reliability,
        /// Per signal kind counter, used to drop stale sequenced frames.
        seq: u64,
        body: Vec<u8>,
    },
    Ack {
        id: u64,
    },
}

impl Frame {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BufferWriter::default();
        match self {
            Frame::Data { id, reliability, seq, body } => {
                buf.u8(DATA);
                buf.u64(*id);
                buf.u8(*reliability as u8);
                buf.u64(*seq);
                buf.0.extend_from_slice(body);
            }
            Frame::Ack { id } => {
                buf.u8(ACK);
                buf.u64(*id);
            }
        }
        buf.0
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut buf = BufferReader::new(bytes);
        Ok(match buf.u8()? {
            DATA => {
                let id = buf.u64()?;
                let reliability = Reliability::try_from(buf.u8()?)?;
                let seq = buf.u64()?;
                let body = buf.take(buf.remaining())?.to_vec();
                Frame::Data { id, reliability, seq, body }
            }
            ACK => Frame::Ack { id: buf.u64()? },
            other => bail!("unknown frame type {other}"),
        })
    }

    pub fn reliability(&self) -> Reliability {
        match self {
            Frame::Data { reliability, .. } => *reliability,
            // losing an ack would stall the handshake
            Frame::Ack { .. } => Reliability::Reliable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_survive_the_wire() {
        let data = Frame::Data {
            id: 9,
            reliability: Reliability::ReliableOrdered,
            seq: 3,
            body: vec![4, 1, 2],
        };
        assert_eq!(Frame::decode(&data.encode()).unwrap(), data);

        let ack = Frame::Ack { id: 12 };
        assert_eq!(Frame::decode(&ack.encode()).unwrap(), ack);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Frame::decode(&[]).is_err());
        assert!(Frame::decode(&[7, 0]).is_err());
        assert!(Frame::decode(&[ACK, 1, 2]).is_err());
        let mut bad_tier = Frame::Data {
            id: 1,
            reliability: Reliability::Reliable,
            seq: 0,
            body: vec![],
        }
        .encode();
        bad_tier[9] = 42;
        assert!(Frame::decode(&bad_tier).is_err());
    }
}
