pub mod battle_scene;
pub mod packet;
pub mod processor;
pub mod remote_state;
pub mod signal;
pub mod transport;

pub use battle_scene::NetworkBattle;
pub use remote_state::RemoteState;
pub use signal::Signal;
