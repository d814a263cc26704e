use std::{collections::BTreeMap, rc::Rc};

use color_eyre::{eyre::eyre, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use super::prelude::*;

/// The shared card definitions both peers agree on. Looking a card up by
/// uuid is how a peer turns the identifiers it receives into real cards.
#[derive(Default)]
pub struct CardLibrary {
    by_uuid: BTreeMap<String, CardRef>,
}

impl CardLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, card: Card) -> CardRef {
        let card = Rc::new(card);
        self.by_uuid.insert(card.uuid.clone(), card.clone());
        card
    }

    pub fn get(&self, uuid: &str) -> Option<CardRef> {
        self.by_uuid.get(uuid).cloned()
    }

    /// Builds a card list from identifiers, failing on the first unknown one.
    pub fn make_list<S: AsRef<str>>(&self, uuids: &[S]) -> Result<CardList> {
        uuids
            .iter()
            .map(|uuid| {
                self.get(uuid.as_ref())
                    .ok_or_else(|| eyre!("unknown card uuid '{}'", uuid.as_ref()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_uuid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uuid.is_empty()
    }

    pub fn cards(&self) -> impl Iterator<Item = &CardRef> {
        self.by_uuid.values()
    }
}

/// A player's folder: the pool card select deals from. Dealt cards go to the
/// bottom so the folder never runs dry.
pub struct Folder {
    cards: Vec<CardRef>,
    rng: StdRng,
}

impl Folder {
    pub fn new(cards: Vec<CardRef>, seed: u64) -> Self {
        Self {
            cards,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn shuffle(&mut self) {
        self.cards.shuffle(&mut self.rng);
    }

    pub fn deal(&mut self, count: usize) -> CardList {
        let count = count.min(self.cards.len());
        let dealt: Vec<CardRef> = self.cards.drain(..count).collect();
        self.cards.extend(dealt.iter().cloned());
        dealt.into()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> CardLibrary {
        let mut lib = CardLibrary::new();
        lib.insert(Card::new("cannon-a", "Cannon", 'A', CardProperties::default()));
        lib.insert(Card::new("cannon-b", "Cannon", 'B', CardProperties::default()));
        lib
    }

    #[test]
    fn make_list_keeps_order() {
        let list = library().make_list(&["cannon-b", "cannon-a"]).unwrap();
        assert_eq!(list.uuids(), vec!["cannon-b", "cannon-a"]);
    }

    #[test]
    fn make_list_rejects_unknown_cards() {
        let err = library().make_list(&["cannon-a", "nope"]).unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn folder_deals_and_recycles() {
        let lib = library();
        let mut folder = Folder::new(lib.cards().cloned().collect(), 7);
        let first = folder.deal(5);
        assert_eq!(first.len(), 2);
        assert_eq!(folder.len(), 2);
        let second = folder.deal(1);
        assert_eq!(second[0].uuid, first[0].uuid);
    }
}
