use std::time::Duration;

use log::info;
use ratatui::style::{Color, Modifier, Style};

use crate::engine::{
    scene::{BattleContext, BattleState},
    surface::{draw_backdrop, draw_banner, draw_field, Surface},
};

/// Closes the battle. Reached after a win, a loss or a disconnect.
#[derive(Default)]
pub struct FadeOutState {
    finished: bool,
}

impl FadeOutState {
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn outcome(ctx: &BattleContext) -> &'static str {
        if ctx.remote_state.loser {
            "You win"
        } else if ctx.is_player_deleted() {
            "You lose"
        } else {
            "Disconnected"
        }
    }
}

impl BattleState<BattleContext> for FadeOutState {
    fn name(&self) -> &'static str {
        "fade out"
    }

    fn on_start(&mut self, ctx: &mut BattleContext) {
        info!("fade out: {}", Self::outcome(ctx));
        self.finished = false;
        ctx.field.toggle_time_freeze(false);
    }

    fn on_update(&mut self, ctx: &mut BattleContext, elapsed: Duration) {
        if !self.finished {
            self.finished = ctx.fade_in_backdrop(elapsed, 1.0);
        }
    }

    fn on_draw(&self, ctx: &BattleContext, surface: &mut Surface) {
        draw_field(surface, &ctx.field, 3);
        draw_backdrop(surface, ctx.backdrop);
        let style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
        draw_banner(surface, 0, Self::outcome(ctx), style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scene::context::fixtures::*;

    #[test]
    fn fades_to_black() {
        let mut ctx = context();
        let mut state = FadeOutState::default();
        state.on_start(&mut ctx);
        state.on_update(&mut ctx, Duration::from_millis(400));
        assert!(!state.is_finished());
        state.on_update(&mut ctx, Duration::from_secs(1));
        assert!(state.is_finished());
        assert_eq!(ctx.backdrop, 1.0);
    }
}
