pub mod util;

pub mod action;
pub mod audio;
pub mod card;
pub mod card_library;
pub mod combo_reveal;
pub mod config;
pub mod field;
pub mod program_advance;
pub mod scene;
pub mod states;
pub mod surface;
pub mod timer;

pub mod prelude;
