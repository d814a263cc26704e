pub use crate::engine::{
    action::*,
    audio::*,
    card::*,
    card_library::*,
    combo_reveal::*,
    config::*,
    field::*,
    program_advance::*,
    timer::*,
    util::id::*,
};
