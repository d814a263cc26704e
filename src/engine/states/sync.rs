use std::time::Duration;

use ratatui::style::{Color, Style};

use crate::engine::{
    scene::{BattleContext, BattleState},
    surface::{draw_banner, Surface},
};

/// Waits for the opponent to connect.
#[derive(Default)]
pub struct NetworkSyncState {
    waited: Duration,
}

impl BattleState<BattleContext> for NetworkSyncState {
    fn name(&self) -> &'static str {
        "sync"
    }

    fn on_update(&mut self, _ctx: &mut BattleContext, elapsed: Duration) {
        self.waited += elapsed;
    }

    fn on_draw(&self, _ctx: &BattleContext, surface: &mut Surface) {
        let dots = ".".repeat(1 + (self.waited.as_millis() / 500 % 3) as usize);
        draw_banner(surface, 2, &format!("Waiting for opponent{dots}"), Style::default().fg(Color::Yellow));
    }
}
