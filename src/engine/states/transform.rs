use std::{collections::VecDeque, time::Duration};

use log::info;
use ratatui::style::{Color, Style};

use crate::engine::{
    prelude::*,
    scene::{BattleContext, BattleState, Side},
    surface::{draw_banner, Surface},
};
use crate::net::Signal;

/// How long one character takes to change form.
pub const FORM_LENGTH: Duration = frames(40);

/// Changes every character with a pending form, one after the other.
#[derive(Default)]
pub struct CharacterTransformState {
    queue: VecDeque<Side>,
    timer: Timer,
}

impl CharacterTransformState {
    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }
}

impl BattleState<BattleContext> for CharacterTransformState {
    fn name(&self) -> &'static str {
        "forms"
    }

    fn on_start(&mut self, ctx: &mut BattleContext) {
        self.queue = [Side::Local, Side::Remote]
            .into_iter()
            .filter(|&side| ctx.tracked_form(side).is_pending())
            .collect();
        self.timer.restart();
        if !self.queue.is_empty() {
            ctx.play(AudioType::Transform, AudioPriority::High);
        }
    }

    fn on_update(&mut self, ctx: &mut BattleContext, elapsed: Duration) {
        let Some(&side) = self.queue.front() else {
            return;
        };
        self.timer.update(elapsed);
        if self.timer.elapsed() < FORM_LENGTH {
            return;
        }

        self.queue.pop_front();
        self.timer.restart();
        if let Some(form) = ctx.tracked_form(side).apply() {
            info!("forms: {side:?} changed into form {form}");
            if let Some(character) = ctx.entity(side).and_then(|id| ctx.field.get_mut(id)) {
                character.form = Some(form);
            }
            if side == Side::Local {
                ctx.send(Signal::Form(form));
            }
        }
    }

    fn on_draw(&self, _ctx: &BattleContext, surface: &mut Surface) {
        if let Some(side) = self.queue.front() {
            let who = match side {
                Side::Local => "You",
                Side::Remote => "Opponent",
            };
            draw_banner(surface, 0, &format!("{who} transform!"), Style::default().fg(Color::LightMagenta));
        }
    }
}
