use std::time::Duration;

use log::debug;
use ratatui::style::{Color, Modifier, Style};

use crate::engine::{
    prelude::*,
    scene::{BattleContext, BattleState},
    surface::{draw_banner, Surface},
};

pub const INTRO_LENGTH: Duration = frames(60);

/// Shows the round banner. Also absorbs the difference between the
/// opponent's combo reveal and ours, so both sides start fighting together.
#[derive(Default)]
pub struct BattleStartState {
    timer: Timer,
    wait: Duration,
}

impl BattleStartState {
    pub fn is_finished(&self) -> bool {
        self.timer.elapsed() >= self.wait
    }

    pub fn wait(&self) -> Duration {
        self.wait
    }
}

impl BattleState<BattleContext> for BattleStartState {
    fn name(&self) -> &'static str {
        "battle start"
    }

    fn on_start(&mut self, ctx: &mut BattleContext) {
        let extra = ctx.round_start_delay.saturating_sub(ctx.local_combo_duration);
        self.wait = INTRO_LENGTH + extra;
        self.timer.restart();
        debug!("battle start: waiting {:?} ({:?} for the remote)", self.wait, extra);
        ctx.play(AudioType::BattleStart, AudioPriority::Low);
    }

    fn on_update(&mut self, _ctx: &mut BattleContext, elapsed: Duration) {
        self.timer.update(elapsed);
    }

    fn on_draw(&self, ctx: &BattleContext, surface: &mut Surface) {
        let text = if self.timer.elapsed() >= INTRO_LENGTH {
            "Waiting...".to_string()
        } else {
            format!("Round {} - Battle start!", ctx.round)
        };
        draw_banner(surface, 0, &text, Style::default().fg(Color::White).add_modifier(Modifier::BOLD));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scene::context::fixtures::*;

    #[test]
    fn waits_for_a_longer_remote_combo() {
        let mut ctx = context();
        ctx.round_start_delay = Duration::from_secs(3);
        ctx.local_combo_duration = Duration::from_secs(1);
        let mut state = BattleStartState::default();
        state.on_start(&mut ctx);
        assert_eq!(state.wait(), INTRO_LENGTH + Duration::from_secs(2));

        ctx.local_combo_duration = Duration::from_secs(5);
        state.on_start(&mut ctx);
        assert_eq!(state.wait(), INTRO_LENGTH);
        state.on_update(&mut ctx, INTRO_LENGTH);
        assert!(state.is_finished());
    }
}
