//! Program advance recipes and the pure list operations behind them.
//!
//! A recipe is an ordered list of `(name, code)` steps. A card list
//! contains a program advance when some contiguous run of its cards matches
//! a recipe step for step. The run is then merged into a single, stronger
//! card synthesized from the recipe.

use std::rc::Rc;

use log::debug;

use super::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecipeStep {
    pub name: String,
    pub code: char,
}

impl RecipeStep {
    pub fn new(name: impl Into<String>, code: char) -> Self {
        Self { name: name.into(), code }
    }

    pub fn matches(&self, card: &Card) -> bool {
        self.name == card.short_name
            && (self.code == card.code || self.code == ANY_CODE || card.code == ANY_CODE)
    }
}

#[derive(Clone, Debug)]
pub struct Recipe {
    pub steps: Vec<RecipeStep>,
    /// The card the steps merge into.
    pub advance: Card,
}

impl Recipe {
    pub fn new(steps: Vec<RecipeStep>, advance: Card) -> Self {
        Self { steps, advance }
    }

    fn matches_at(&self, cards: &[CardRef], start: usize) -> bool {
        let end = start + self.steps.len();
        end <= cards.len()
            && self
                .steps
                .iter()
                .zip(&cards[start..end])
                .all(|(step, card)| step.matches(card))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramAdvanceMatch {
    pub start: usize,
    pub steps: usize,
    /// Index of the matched recipe in registration order.
    pub recipe: usize,
}

impl ProgramAdvanceMatch {
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.start + self.steps
    }
}

/// The registered recipes. Lookups are deterministic: the earliest start
/// index wins, then the longest recipe, then the one registered first.
#[derive(Clone, Debug, Default)]
pub struct ProgramAdvance {
    recipes: Vec<Recipe>,
}

impl ProgramAdvance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipe(mut self, recipe: Recipe) -> Self {
        self.add_recipe(recipe);
        self
    }

    pub fn add_recipe(&mut self, recipe: Recipe) {
        if recipe.steps.is_empty() {
            debug!("program advance: ignoring empty recipe for {}", recipe.advance.short_name);
            return;
        }
        self.recipes.push(recipe);
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn find_match(&self, cards: &[CardRef]) -> Option<ProgramAdvanceMatch> {
        (0..cards.len()).find_map(|start| {
            self.recipes
                .iter()
                .enumerate()
                .filter(|(_, recipe)| recipe.matches_at(cards, start))
                // max_by_key keeps the last maximum, so compare against the
                // negated index to let the first registered recipe win ties
                .max_by_key(|(index, recipe)| (recipe.steps.len(), std::cmp::Reverse(*index)))
                .map(|(index, recipe)| ProgramAdvanceMatch {
                    start,
                    steps: recipe.steps.len(),
                    recipe: index,
                })
        })
    }

    /// A fresh card for the match; never one of the source cards.
    pub fn build_advance_card(&self, found: &ProgramAdvanceMatch) -> CardRef {
        Rc::new(self.recipes[found.recipe].advance.clone())
    }
}

/// Replaces `[start, start + steps)` with `advance`, keeping every other card
/// in its relative order. The source cards are only dropped from the list.
pub fn apply_merge(cards: &CardList, found: &ProgramAdvanceMatch, advance: CardRef) -> CardList {
    let mut staged = Vec::with_capacity(cards.len() + 1 - found.steps);
    let mut index = 0;
    while index < cards.len() {
        if index == found.start {
            staged.push(advance.clone());
            index += found.steps;
            continue;
        }
        staged.push(cards[index].clone());
        index += 1;
    }
    staged.into()
}

/// Folds support cards into the card right before them. A support card with
/// nothing to boost is dropped.
pub fn filter_support_cards(cards: &CardList) -> CardList {
    let mut filtered: Vec<CardRef> = Vec::with_capacity(cards.len());
    for card in cards {
        if !card.is_support() {
            filtered.push(card.clone());
            continue;
        }
        match filtered.last_mut() {
            Some(prev) if !prev.is_support() => {
                let boosted = (**prev).clone().with_damage(prev.props.damage + card.props.damage);
                debug!("program advance: {} boosts {} to {}", card.short_name, prev.short_name, boosted.props.damage);
                *prev = Rc::new(boosted);
            }
            _ => debug!("program advance: dropping {} with nothing to boost", card.short_name),
        }
    }
    filtered.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn card(name: &str, code: char) -> CardRef {
        Rc::new(Card::new(format!("{name}-{code}"), name, code, CardProperties::default()))
    }

    fn advance(name: &str) -> Card {
        Card::new(name, name, ANY_CODE, CardProperties::default()).with_class(CardClass::ProgramAdvance)
    }

    fn cannon_pa() -> ProgramAdvance {
        ProgramAdvance::new().with_recipe(Recipe::new(
            vec![RecipeStep::new("Cannon", 'A'), RecipeStep::new("Cannon", 'B'), RecipeStep::new("Cannon", 'C')],
            advance("Z-Cannon"),
        ))
    }

    #[test]
    fn no_recipe_no_match() {
        let cards: CardList = vec![card("Cannon", 'A'), card("Sword", 'S'), card("Cannon", 'B')].into();
        assert_eq!(cannon_pa().find_match(&cards), None);
        assert_eq!(ProgramAdvance::new().find_match(&cards), None);
    }

    #[test]
    fn merge_replaces_range_and_keeps_order() {
        let cards: CardList = vec![
            card("Sword", 'S'),
            card("Cannon", 'A'),
            card("Cannon", 'B'),
            card("Cannon", 'C'),
            card("Recov", 'R'),
        ]
        .into();
        let pa = cannon_pa();
        let found = pa.find_match(&cards).unwrap();
        assert_eq!(found, ProgramAdvanceMatch { start: 1, steps: 3, recipe: 0 });

        let merged = apply_merge(&cards, &found, pa.build_advance_card(&found));
        let names: Vec<_> = merged.iter().map(|c| c.short_name.as_str()).collect();
        assert_eq!(names, vec!["Sword", "Z-Cannon", "Recov"]);
        assert_eq!(merged.len(), cards.len() - 3 + 1);
    }

    #[test]
    fn advance_card_is_never_a_source_card() {
        let cards: CardList = vec![card("Cannon", 'A'), card("Cannon", 'B'), card("Cannon", 'C')].into();
        let pa = cannon_pa();
        let found = pa.find_match(&cards).unwrap();
        let advance = pa.build_advance_card(&found);
        assert!(cards.iter().all(|c| !Rc::ptr_eq(c, &advance)));
        // building twice gives two distinct cards
        assert!(!Rc::ptr_eq(&advance, &pa.build_advance_card(&found)));
    }

    #[test]
    fn earliest_start_then_longest_recipe_wins() {
        let pa = ProgramAdvance::new()
            .with_recipe(Recipe::new(
                vec![RecipeStep::new("Sword", 'S'), RecipeStep::new("WideSwrd", 'S')],
                advance("TwinSwrd"),
            ))
            .with_recipe(Recipe::new(
                vec![RecipeStep::new("Sword", 'S'), RecipeStep::new("WideSwrd", 'S'), RecipeStep::new("LongSwrd", 'S')],
                advance("LifeSwrd"),
            ))
            .with_recipe(Recipe::new(
                vec![RecipeStep::new("Cannon", 'A'), RecipeStep::new("Cannon", 'B')],
                advance("MiniCann"),
            ));

        let cards: CardList = vec![
            card("Cannon", 'A'),
            card("Cannon", 'B'),
            card("Sword", 'S'),
            card("WideSwrd", 'S'),
            card("LongSwrd", 'S'),
        ]
        .into();
        assert_eq!(pa.find_match(&cards), Some(ProgramAdvanceMatch { start: 0, steps: 2, recipe: 2 }));

        let swords: CardList = cards[2..].to_vec().into();
        assert_eq!(pa.find_match(&swords), Some(ProgramAdvanceMatch { start: 0, steps: 3, recipe: 1 }));
    }

    #[test]
    fn equal_length_recipes_prefer_first_registered() {
        let pa = ProgramAdvance::new()
            .with_recipe(Recipe::new(vec![RecipeStep::new("Cannon", '*'), RecipeStep::new("Cannon", '*')], advance("First")))
            .with_recipe(Recipe::new(vec![RecipeStep::new("Cannon", 'A'), RecipeStep::new("Cannon", 'A')], advance("Second")));
        let cards: CardList = vec![card("Cannon", 'A'), card("Cannon", 'A')].into();
        assert_eq!(pa.find_match(&cards).unwrap().recipe, 0);
    }

    #[test]
    fn wildcard_code_matches_any_code() {
        let pa = ProgramAdvance::new().with_recipe(Recipe::new(
            vec![RecipeStep::new("Cannon", 'A'), RecipeStep::new("Cannon", 'B')],
            advance("MiniCann"),
        ));
        let cards: CardList = vec![card("Cannon", ANY_CODE), card("Cannon", 'B')].into();
        assert!(pa.find_match(&cards).is_some());
    }

    #[test]
    fn support_cards_boost_the_previous_card() {
        let plus = Rc::new(
            Card::new("atk10", "Atk+10", ANY_CODE, CardProperties::default())
                .with_class(CardClass::Support)
                .with_damage(10),
        );
        let cannon = Rc::new(Card::new("cannon-a", "Cannon", 'A', CardProperties::default()).with_damage(40));
        let cards: CardList = vec![plus.clone(), cannon.clone(), plus.clone(), plus].into();

        let filtered = filter_support_cards(&cards);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].props.damage, 60);
        // the library definition is untouched
        assert_eq!(cannon.props.damage, 40);
    }

    proptest! {
        #[test]
        fn merge_length_and_order(prefix in 0usize..5, suffix in 0usize..5) {
            let mut cards: Vec<CardRef> = (0..prefix).map(|i| card("Sword", char::from(b'a' + i as u8))).collect();
            cards.extend([card("Cannon", 'A'), card("Cannon", 'B'), card("Cannon", 'C')]);
            cards.extend((0..suffix).map(|i| card("Recov", char::from(b'a' + i as u8))));
            let cards: CardList = cards.into();

            let pa = cannon_pa();
            let found = pa.find_match(&cards).unwrap();
            prop_assert_eq!(found.start, prefix);

            let merged = apply_merge(&cards, &found, pa.build_advance_card(&found));
            prop_assert_eq!(merged.len(), cards.len() - 3 + 1);
            prop_assert_eq!(&merged[prefix].short_name, "Z-Cannon");
            prop_assert_eq!(&merged[..prefix], &cards[..prefix]);
            prop_assert_eq!(&merged[prefix + 1..], &cards[prefix + 3..]);
        }
    }
}
