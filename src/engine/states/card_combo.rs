use std::time::Duration;

use log::debug;
use ratatui::style::{Color, Modifier, Style};

use crate::engine::{
    prelude::*,
    scene::{BattleContext, BattleState},
    surface::{draw_banner, draw_label, Surface},
};

/// Plays the program advance reveal over the local hand.
#[derive(Default)]
pub struct CardComboState {
    reveal: ComboReveal,
    elapsed: Duration,
    recorded: bool,
}

impl CardComboState {
    pub fn is_done(&self) -> bool {
        self.reveal.is_done()
    }

    pub fn reveal(&self) -> &ComboReveal {
        &self.reveal
    }
}

impl BattleState<BattleContext> for CardComboState {
    fn name(&self) -> &'static str {
        "combo"
    }

    fn on_start(&mut self, _ctx: &mut BattleContext) {
        self.reveal.reset();
        self.elapsed = Duration::ZERO;
        self.recorded = false;
    }

    fn on_update(&mut self, ctx: &mut BattleContext, elapsed: Duration) {
        if self.reveal.is_done() {
            return;
        }
        self.elapsed += elapsed;

        match self.reveal.simulate(elapsed, &mut ctx.hand, &ctx.recipes) {
            Some(RevealCue::Point) => ctx.play(AudioType::Point, AudioPriority::Low),
            Some(RevealCue::Advance) => ctx.play(AudioType::PaAdvance, AudioPriority::High),
            None => {}
        }

        if self.reveal.is_done() && !self.recorded {
            self.recorded = true;
            ctx.local_combo_duration = self.elapsed;
            debug!("combo: local reveal took {:?}, {} cards left", self.elapsed, ctx.hand.len());
        }
    }

    fn on_draw(&self, ctx: &BattleContext, surface: &mut Surface) {
        let Some(found) = self.reveal.found() else {
            return;
        };
        let step = self.reveal.step_index();
        let shown = step.min(ctx.hand.len());
        for (index, card) in ctx.hand.iter().take(shown).enumerate() {
            let style = if found.contains(index) {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            draw_label(surface, 2, 2 + index as u16, &card.label(), style);
        }
        if step > ctx.hand.len() {
            if let Some(advance) = self.reveal.advance_card() {
                draw_banner(surface, 0, &format!("Program Advance: {}", advance.short_name), Style::default().fg(Color::LightGreen));
            }
        }
    }
}
