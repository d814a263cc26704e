use std::{
    fmt,
    ops::Deref,
    rc::Rc,
};

/// Cards are shared by reference; a card list never owns a card definition.
pub type CardRef = Rc<Card>;

/// The "any code" wildcard used by recipes and by code-less cards.
pub const ANY_CODE: char = '*';

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Element {
    #[default]
    None,
    Fire,
    Aqua,
    Elec,
    Wood,
    Sword,
    Break,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CardClass {
    #[default]
    Standard,
    Mega,
    Giga,
    /// Boosts the card before it instead of being used on its own.
    Support,
    /// Synthesized by a program advance.
    ProgramAdvance,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct CardProperties {
    pub damage: i32,
    pub element: Element,
    pub class: CardClass,
    pub time_freeze: bool,
    pub skip_time_freeze_intro: bool,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Card {
    pub uuid: String,
    pub short_name: String,
    pub code: char,
    pub props: CardProperties,
}

impl Card {
    pub fn new(uuid: impl Into<String>, short_name: impl Into<String>, code: char, props: CardProperties) -> Self {
        Self {
            uuid: uuid.into(),
            short_name: short_name.into(),
            code,
            props,
        }
    }

    pub fn is_time_freeze(&self) -> bool {
        self.props.time_freeze
    }

    pub fn is_support(&self) -> bool {
        self.props.class == CardClass::Support
    }

    pub fn with_damage(mut self, damage: i32) -> Self {
        self.props.damage = damage;
        self
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.props.element = element;
        self
    }

    pub fn with_class(mut self, class: CardClass) -> Self {
        self.props.class = class;
        self
    }

    pub fn with_time_freeze(mut self) -> Self {
        self.props.time_freeze = true;
        self
    }

    pub fn skipping_intro(mut self) -> Self {
        self.props.skip_time_freeze_intro = true;
        self
    }

    /// Name and code padded the way the combo reveal lists them, e.g. `Cannon  A`.
    pub fn label(&self) -> String {
        format!("{:<8}{}", self.short_name, self.code)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.short_name, self.code)
    }
}

/// An ordered list of selected cards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CardList(Vec<CardRef>);

impl CardList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, card: CardRef) {
        self.0.push(card);
    }

    /// Removes and returns the next card to be used.
    pub fn pop_front(&mut self) -> Option<CardRef> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.remove(0))
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Replaces the whole list, as a handshake does.
    pub fn replace(&mut self, cards: Vec<CardRef>) {
        self.0 = cards;
    }

    pub fn uuids(&self) -> Vec<String> {
        self.0.iter().map(|card| card.uuid.clone()).collect()
    }

    pub fn into_inner(self) -> Vec<CardRef> {
        self.0
    }
}

impl Deref for CardList {
    type Target = [CardRef];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<CardRef>> for CardList {
    fn from(cards: Vec<CardRef>) -> Self {
        Self(cards)
    }
}

impl FromIterator<CardRef> for CardList {
    fn from_iter<I: IntoIterator<Item = CardRef>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a CardList {
    type Item = &'a CardRef;
    type IntoIter = std::slice::Iter<'a, CardRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(name: &str, code: char) -> CardRef {
        Rc::new(Card::new(name, name, code, CardProperties::default()))
    }

    #[test]
    fn pop_front_uses_cards_in_order() {
        let mut list: CardList = vec![card("Cannon", 'A'), card("Sword", 'S')].into();
        assert_eq!(list.len(), 2);
        assert_eq!(list.pop_front().unwrap().short_name, "Cannon");
        assert_eq!(list.pop_front().unwrap().short_name, "Sword");
        assert!(list.pop_front().is_none());
        assert!(list.is_empty());
    }

    #[test]
    fn label_pads_name_before_code() {
        assert_eq!(card("Cannon", 'A').label(), "Cannon  A");
    }
}
