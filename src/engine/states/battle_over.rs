use std::time::Duration;

use log::info;
use ratatui::style::{Color, Modifier, Style};

use crate::engine::{
    prelude::*,
    scene::{BattleContext, BattleState},
    surface::{draw_banner, draw_field, Surface},
};

pub const VICTORY_LENGTH: Duration = Duration::from_secs(2);

/// Victory banner before the scene fades out.
#[derive(Default)]
pub struct BattleOverState {
    timer: Timer,
}

impl BattleOverState {
    pub fn is_finished(&self) -> bool {
        self.timer.elapsed() >= VICTORY_LENGTH
    }
}

impl BattleState<BattleContext> for BattleOverState {
    fn name(&self) -> &'static str {
        "battle over"
    }

    fn on_start(&mut self, ctx: &mut BattleContext) {
        info!("battle over: won in round {}", ctx.round);
        self.timer.restart();
        ctx.active_actions.clear();
        ctx.play(AudioType::Win, AudioPriority::Highest);
    }

    fn on_update(&mut self, _ctx: &mut BattleContext, elapsed: Duration) {
        self.timer.update(elapsed);
    }

    fn on_draw(&self, ctx: &BattleContext, surface: &mut Surface) {
        draw_field(surface, &ctx.field, 3);
        let style = Style::default().fg(Color::LightYellow).add_modifier(Modifier::BOLD);
        draw_banner(surface, 0, "ENEMY DELETED!", style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scene::context::fixtures::*;

    #[test]
    fn celebrates_then_finishes() {
        let recorder = AudioRecorder::new();
        let mut ctx = context_with(Box::new(recorder.clone()));
        let mut state = BattleOverState::default();
        state.on_start(&mut ctx);
        assert_eq!(recorder.count(AudioType::Win), 1);
        state.on_update(&mut ctx, Duration::from_secs(1));
        assert!(!state.is_finished());
        state.on_update(&mut ctx, Duration::from_secs(1));
        assert!(state.is_finished());
    }
}
