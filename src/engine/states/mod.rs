//! The phases of a network battle.

pub mod battle_over;
pub mod battle_start;
pub mod card_combo;
pub mod card_select;
pub mod combat;
pub mod fade_out;
pub mod sync;
pub mod time_freeze;
pub mod transform;

pub use battle_over::BattleOverState;
pub use battle_start::BattleStartState;
pub use card_combo::CardComboState;
pub use card_select::CardSelectState;
pub use combat::CombatState;
pub use fade_out::FadeOutState;
pub use sync::NetworkSyncState;
pub use time_freeze::{TimeFreezePhase, TimeFreezeState};
pub use transform::CharacterTransformState;
