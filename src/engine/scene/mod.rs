pub mod context;
pub mod graph;

pub use context::{BattleContext, CardUse, PlayerInput, Side, TrackedForm};
pub use graph::{BattleState, StateGraph, StateNode, States, Transition};
