//! Plays a side of the battle without a human at the keyboard.

use std::time::Duration;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::engine::scene::{BattleContext, PlayerInput};

const THINK_TIME: Duration = Duration::from_millis(250);

pub struct Autopilot {
    rng: StdRng,
    idle: Duration,
}

impl Autopilot {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            idle: Duration::ZERO,
        }
    }

    /// The input for the frame about to run in `state`.
    pub fn drive(&mut self, state: Option<&str>, ctx: &BattleContext, elapsed: Duration) -> PlayerInput {
        let mut input = PlayerInput::default();
        self.idle += elapsed;
        if self.idle < THINK_TIME {
            return input;
        }
        self.idle = Duration::ZERO;

        match state {
            Some("card select") => {
                let picks = self.rng.gen_range(0..=ctx.config.hand_size.min(3));
                input.picks = (0..picks).collect();
                input.toggle_form = self.rng.gen_bool(0.1);
                input.confirm = true;
            }
            Some("combat") => match self.rng.gen_range(0..10) {
                0..=3 => input.shoot = true,
                4 | 5 => input.use_card = true,
                6 => input.request_card_select = true,
                7 => input.charge = true,
                _ => {
                    let dx = self.rng.gen_range(-1..=1);
                    let dy = self.rng.gen_range(-1..=1);
                    input.movement = Some((dx, dy));
                }
            },
            Some("time freeze") => {
                input.use_card = ctx.hand.first().is_some_and(|card| card.is_time_freeze());
            }
            _ => {}
        }
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scene::context::fixtures::*;

    #[test]
    fn confirms_card_select_after_thinking() {
        let ctx = context();
        let mut pilot = Autopilot::new(7);
        let input = pilot.drive(Some("card select"), &ctx, Duration::from_millis(100));
        assert_eq!(input, PlayerInput::default());

        let input = pilot.drive(Some("card select"), &ctx, THINK_TIME);
        assert!(input.confirm);
        assert!(input.picks.len() <= 3);
    }

    #[test]
    fn stays_idle_while_waiting() {
        let ctx = context();
        let mut pilot = Autopilot::new(7);
        let input = pilot.drive(Some("sync"), &ctx, THINK_TIME);
        assert_eq!(input, PlayerInput::default());
    }
}
