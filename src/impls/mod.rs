pub mod actions;
pub mod cards;
