//! Netplay signals and their wire encoding.
//!
//! A signal body is a one byte kind followed by its payload. Integers are
//! little-endian, strings are a `u64` byte count followed by UTF-8 bytes and
//! sequences are a `u64` element count followed by the elements.

use color_eyre::{
    eyre::{bail, eyre, WrapErr},
    Result,
};

use super::packet::Reliability;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    /// The cards and form picked during card select.
    Handshake { form: i32, cards: Vec<String> },
    Connect { navi: u32 },
    CardUse { timestamp: u64, uuid: String },
    Form(i32),
    Hp(i32),
    Loser,
    Tile { x: i32, y: i32 },
    Shoot,
    Special,
    Charge(bool),
    /// The sender opened card select.
    CardSelect,
}

/// The kind byte of each signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum SignalKind {
    Handshake = 0,
    Connect = 1,
    CardUse = 2,
    Form = 3,
    Hp = 4,
    Loser = 5,
    Tile = 6,
    Shoot = 7,
    Special = 8,
    Charge = 9,
    CardSelect = 10,
}

impl TryFrom<u8> for SignalKind {
    type Error = color_eyre::Report;

    fn try_from(value: u8) -> Result<Self> {
        use SignalKind::*;
        Ok(match value {
            0 => Handshake,
            1 => Connect,
            2 => CardUse,
            3 => Form,
            4 => Hp,
            5 => Loser,
            6 => Tile,
            7 => Shoot,
            8 => Special,
            9 => Charge,
            10 => CardSelect,
            other => bail!("unknown signal kind {other}"),
        })
    }
}

impl Signal {
    pub fn kind(&self) -> SignalKind {
        match self {
            Signal::Handshake { .. } => SignalKind::Handshake,
            Signal::Connect { .. } => SignalKind::Connect,
            Signal::CardUse { .. } => SignalKind::CardUse,
            Signal::Form(_) => SignalKind::Form,
            Signal::Hp(_) => SignalKind::Hp,
            Signal::Loser => SignalKind::Loser,
            Signal::Tile { .. } => SignalKind::Tile,
            Signal::Shoot => SignalKind::Shoot,
            Signal::Special => SignalKind::Special,
            Signal::Charge(_) => SignalKind::Charge,
            Signal::CardSelect => SignalKind::CardSelect,
        }
    }

    /// The delivery guarantee the signal is sent with.
    pub fn reliability(&self) -> Reliability {
        match self {
            Signal::Handshake { .. } => Reliability::Reliable,
            Signal::Hp(_) | Signal::Tile { .. } => Reliability::UnreliableSequenced,
            _ => Reliability::ReliableOrdered,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BufferWriter::default();
        buf.u8(self.kind() as u8);
        match self {
            Signal::Handshake { form, cards } => {
                buf.i32(*form);
                buf.u64(cards.len() as u64);
                for uuid in cards {
                    buf.string(uuid);
                }
            }
            Signal::Connect { navi } => buf.u32(*navi),
            Signal::CardUse { timestamp, uuid } => {
                buf.u64(*timestamp);
                buf.string(uuid);
            }
            Signal::Form(form) => buf.i32(*form),
            Signal::Hp(hp) => buf.i32(*hp),
            Signal::Tile { x, y } => {
                buf.i32(*x);
                buf.i32(*y);
            }
            Signal::Charge(charging) => buf.u8(*charging as u8),
            Signal::Loser | Signal::Shoot | Signal::Special | Signal::CardSelect => {}
        }
        buf.0
    }

    /// Decodes a full signal body. Truncated or otherwise malformed bodies
    /// are errors; trailing bytes are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut buf = BufferReader::new(bytes);
        let kind = SignalKind::try_from(buf.u8().wrap_err("empty signal")?)?;
        Self::decode_payload(kind, &mut buf).wrap_err_with(|| format!("malformed {kind:?} signal"))
    }

    fn decode_payload(kind: SignalKind, buf: &mut BufferReader) -> Result<Self> {
        Ok(match kind {
            SignalKind::Handshake => {
                let form = buf.i32()?;
                let count = buf.u64()?;
                // every uuid takes at least its length prefix
                if count > (buf.remaining() / 8) as u64 {
                    bail!("handshake claims {count} cards");
                }
                let cards = (0..count).map(|_| buf.string()).collect::<Result<_>>()?;
                Signal::Handshake { form, cards }
            }
            SignalKind::Connect => Signal::Connect { navi: buf.u32()? },
            SignalKind::CardUse => Signal::CardUse {
                timestamp: buf.u64()?,
                uuid: buf.string()?,
            },
            SignalKind::Form => Signal::Form(buf.i32()?),
            SignalKind::Hp => Signal::Hp(buf.i32()?),
            SignalKind::Loser => Signal::Loser,
            SignalKind::Tile => Signal::Tile {
                x: buf.i32()?,
                y: buf.i32()?,
            },
            SignalKind::Shoot => Signal::Shoot,
            SignalKind::Special => Signal::Special,
            SignalKind::Charge => Signal::Charge(buf.u8()? != 0),
            SignalKind::CardSelect => Signal::CardSelect,
        })
    }
}

#[derive(Default)]
pub(crate) struct BufferWriter(pub(crate) Vec<u8>);

impl BufferWriter {
    pub(crate) fn u8(&mut self, value: u8) {
        self.0.push(value);
    }

    pub(crate) fn u32(&mut self, value: u32) {
        self.0.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn i32(&mut self, value: i32) {
        self.0.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn u64(&mut self, value: u64) {
        self.0.extend_from_slice(&value.to_le_bytes());
    }

    fn string(&mut self, value: &str) {
        self.u64(value.len() as u64);
        self.0.extend_from_slice(value.as_bytes());
    }
}

pub(crate) struct BufferReader<'a> {
    bytes: &'a [u8],
    read: usize,
}

impl<'a> BufferReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, read: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.read
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(eyre!("needed {len} bytes at offset {}, only {} left", self.read, self.remaining()));
        }
        let slice = &self.bytes[self.read..self.read + len];
        self.read += len;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub(crate) fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub(crate) fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u64()?;
        let len = usize::try_from(len).map_err(|_| eyre!("string length {len} does not fit in memory"))?;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).wrap_err("string is not utf-8")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handshake_layout() {
        let bytes = Signal::Handshake {
            form: 2,
            cards: vec!["ab".into()],
        }
        .encode();
        let mut expected = vec![0u8];
        expected.extend(2i32.to_le_bytes());
        expected.extend(1u64.to_le_bytes());
        expected.extend(2u64.to_le_bytes());
        expected.extend(b"ab");
        assert_eq!(bytes, expected);
    }

    #[test]
    fn every_signal_survives_the_wire() {
        let signals = vec![
            Signal::Handshake {
                form: -1,
                cards: vec!["cannon-a".into(), "sword-s".into()],
            },
            Signal::Connect { navi: 3 },
            Signal::CardUse {
                timestamp: 1234,
                uuid: "recov-10".into(),
            },
            Signal::Form(1),
            Signal::Hp(-5),
            Signal::Loser,
            Signal::Tile { x: 4, y: 2 },
            Signal::Shoot,
            Signal::Special,
            Signal::Charge(true),
            Signal::CardSelect,
        ];
        for signal in signals {
            assert_eq!(Signal::decode(&signal.encode()).unwrap(), signal);
        }
    }

    #[test]
    fn truncated_bodies_are_rejected() {
        let mut connect = Signal::Connect { navi: 7 }.encode();
        connect.truncate(3);
        assert!(Signal::decode(&connect).is_err());

        let mut card = Signal::CardUse {
            timestamp: 9,
            uuid: "cannon-a".into(),
        }
        .encode();
        card.pop();
        assert!(Signal::decode(&card).is_err());

        assert!(Signal::decode(&[]).is_err());
        assert!(Signal::decode(&[200]).is_err());
    }

    #[test]
    fn absurd_card_counts_are_rejected() {
        let mut buf = BufferWriter::default();
        buf.u8(SignalKind::Handshake as u8);
        buf.i32(0);
        buf.u64(u64::MAX);
        assert!(Signal::decode(&buf.0).is_err());
    }

    #[test]
    fn tiers() {
        assert_eq!(Signal::Hp(1).reliability(), Reliability::UnreliableSequenced);
        assert_eq!(Signal::Tile { x: 1, y: 1 }.reliability(), Reliability::UnreliableSequenced);
        assert_eq!(Signal::Handshake { form: 0, cards: vec![] }.reliability(), Reliability::Reliable);
        assert_eq!(Signal::Loser.reliability(), Reliability::ReliableOrdered);
        assert_eq!(Signal::Connect { navi: 0 }.reliability(), Reliability::ReliableOrdered);
    }
}
