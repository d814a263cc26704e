use std::rc::Rc;

use crate::engine::prelude::*;

pub const CANNON_A: &str = "cannon-a";
pub const CANNON_B: &str = "cannon-b";
pub const CANNON_C: &str = "cannon-c";
pub const SWORD: &str = "sword-s";
pub const WIDE_SWORD: &str = "widesword-s";
pub const LONG_SWORD: &str = "longsword-s";
pub const RECOVER_30: &str = "recov30-a";
pub const ATTACK_PLUS_10: &str = "atk10";
pub const QUAKE: &str = "quake-q";
pub const ROLL: &str = "roll-r";
pub const GUTSMAN: &str = "gutsman-g";
pub const BASS: &str = "bass-x";
pub const Z_CANNON: &str = "pa-zcannon";
pub const LIFE_SWORD: &str = "pa-lifesword";

fn card(uuid: &str, name: &str, code: char, damage: i32, description: &str) -> Card {
    Card::new(
        uuid,
        name,
        code,
        CardProperties {
            damage,
            description: description.into(),
            ..Default::default()
        },
    )
}

pub fn get_card(uuid: &str) -> Option<Card> {
    Some(match uuid {
        CANNON_A => card(CANNON_A, "Cannon", 'A', 40, "Cannon to attack 1 enemy"),
        CANNON_B => card(CANNON_B, "Cannon", 'B', 40, "Cannon to attack 1 enemy"),
        CANNON_C => card(CANNON_C, "Cannon", 'C', 40, "Cannon to attack 1 enemy"),
        SWORD => card(SWORD, "Sword", 'S', 80, "Cuts enmy in front!").with_element(Element::Sword),
        WIDE_SWORD => card(WIDE_SWORD, "WideSwrd", 'S', 80, "Cuts enmy in front!").with_element(Element::Sword),
        LONG_SWORD => card(LONG_SWORD, "LongSwrd", 'S', 100, "Cuts enmy 2ahead!").with_element(Element::Sword),
        RECOVER_30 => card(RECOVER_30, "Recov30", 'A', 30, "Recovers 30HP"),
        ATTACK_PLUS_10 => card(ATTACK_PLUS_10, "Atk+10", ANY_CODE, 10, "+10 for selectd atk chip").with_class(CardClass::Support),
        QUAKE => quake(),
        ROLL => card(ROLL, "Roll", 'R', 60, "Roll attacks 1 enemy")
            .with_class(CardClass::Mega)
            .with_time_freeze(),
        GUTSMAN => card(GUTSMAN, "GutsMan", 'G', 80, "Smash w/ GutsHammr!")
            .with_class(CardClass::Mega)
            .with_element(Element::Break)
            .with_time_freeze(),
        BASS => card(BASS, "Bass", 'X', 120, "Hell's Rolling!")
            .with_class(CardClass::Giga)
            .with_time_freeze()
            .skipping_intro(),
        Z_CANNON => z_cannon(),
        LIFE_SWORD => life_sword(),
        _ => return None,
    })
}

pub fn quake() -> Card {
    card(QUAKE, "Quake", 'Q', 50, "Shakes every enemy panel").with_element(Element::Break)
}

fn z_cannon() -> Card {
    card(Z_CANNON, "Z-Canon1", ANY_CODE, 200, "Giant cannon blast").with_class(CardClass::ProgramAdvance)
}

fn life_sword() -> Card {
    card(LIFE_SWORD, "LifeSwrd", ANY_CODE, 400, "Giant sword of life")
        .with_class(CardClass::ProgramAdvance)
        .with_element(Element::Sword)
}

const ALL: [&str; 14] = [
    CANNON_A,
    CANNON_B,
    CANNON_C,
    SWORD,
    WIDE_SWORD,
    LONG_SWORD,
    RECOVER_30,
    ATTACK_PLUS_10,
    QUAKE,
    ROLL,
    GUTSMAN,
    BASS,
    Z_CANNON,
    LIFE_SWORD,
];

/// Every card either peer may name, program advances included.
pub fn builtin_library() -> CardLibrary {
    let mut library = CardLibrary::new();
    for card in ALL.iter().filter_map(|uuid| get_card(uuid)) {
        library.insert(card);
    }
    library
}

pub fn builtin_recipes() -> ProgramAdvance {
    ProgramAdvance::new()
        .with_recipe(Recipe::new(
            vec![RecipeStep::new("Cannon", 'A'), RecipeStep::new("Cannon", 'B'), RecipeStep::new("Cannon", 'C')],
            z_cannon(),
        ))
        .with_recipe(Recipe::new(
            vec![
                RecipeStep::new("Sword", 'S'),
                RecipeStep::new("WideSwrd", 'S'),
                RecipeStep::new("LongSwrd", 'S'),
            ],
            life_sword(),
        ))
}

/// Thirty cards, the way a starting folder is built.
pub fn starter_folder(library: &CardLibrary) -> Vec<CardRef> {
    let counts = [
        (CANNON_A, 4),
        (CANNON_B, 4),
        (CANNON_C, 4),
        (SWORD, 3),
        (WIDE_SWORD, 3),
        (LONG_SWORD, 3),
        (RECOVER_30, 2),
        (ATTACK_PLUS_10, 2),
        (QUAKE, 2),
        (ROLL, 1),
        (GUTSMAN, 1),
        (BASS, 1),
    ];
    counts
        .iter()
        .filter_map(|(uuid, count)| library.get(uuid).map(|card| (card, *count)))
        .flat_map(|(card, count)| std::iter::repeat(card).take(count))
        .collect::<Vec<Rc<Card>>>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_knows_every_advance() {
        let library = builtin_library();
        for recipe in builtin_recipes().recipes() {
            assert!(library.get(&recipe.advance.uuid).is_some());
        }
    }

    #[test]
    fn starter_folder_has_thirty_cards() {
        assert_eq!(starter_folder(&builtin_library()).len(), 30);
    }

    #[test]
    fn cannons_merge_into_z_cannon() {
        let library = builtin_library();
        let mut hand = library.make_list(&[SWORD, CANNON_A, CANNON_B, CANNON_C, ATTACK_PLUS_10]).unwrap();
        ComboReveal::simulate_headless(&mut hand, &builtin_recipes(), FRAME).unwrap();
        let names: Vec<_> = hand.iter().map(|c| c.short_name.as_str()).collect();
        assert_eq!(names, vec!["Sword", "Z-Canon1"]);
        assert_eq!(hand[1].props.damage, 210);
    }
}
