use std::time::Duration;

use log::info;
use ratatui::style::{Color, Modifier, Style};

use crate::engine::{
    prelude::*,
    scene::{BattleContext, BattleState},
    surface::{draw_banner, draw_label, Surface},
};
use crate::net::Signal;

/// Forms a player can pick from card select.
pub const FORM_COUNT: i32 = 2;

/// Deals cards from the folder and lets the player pick a hand and a form.
/// Confirming sends the handshake; the scene decides when both sides are
/// ready to move on.
#[derive(Default)]
pub struct CardSelectState {
    dealt: CardList,
    picked: Vec<usize>,
    form: i32,
    confirmed: bool,
    new_chips: bool,
}

impl CardSelectState {
    pub fn dealt(&self) -> &CardList {
        &self.dealt
    }

    pub fn picked(&self) -> &[usize] {
        &self.picked
    }

    pub fn ok_is_pressed(&self) -> bool {
        self.confirmed
    }

    pub fn selected_new_chips(&self) -> bool {
        self.confirmed && self.new_chips
    }

    pub fn has_form(&self, ctx: &BattleContext) -> bool {
        self.confirmed && (ctx.local_form.is_pending() || ctx.remote_form.is_pending())
    }

    fn toggle(&mut self, slot: usize) {
        if slot >= self.dealt.len() {
            return;
        }
        match self.picked.iter().position(|&p| p == slot) {
            Some(index) => {
                self.picked.remove(index);
            }
            None => self.picked.push(slot),
        }
    }

    fn confirm(&mut self, ctx: &mut BattleContext) {
        self.confirmed = true;
        let hand: CardList = self.picked.iter().map(|&slot| self.dealt[slot].clone()).collect();
        self.new_chips = !hand.is_empty();
        info!("card select: confirmed {} cards in form {}", hand.len(), self.form);

        ctx.send(Signal::Handshake {
            form: self.form,
            cards: hand.uuids(),
        });
        ctx.hand = hand;
        ctx.local_form.select(self.form);
        ctx.local_combo_duration = Duration::ZERO;
        ctx.handshake_complete = false;
    }
}

impl BattleState<BattleContext> for CardSelectState {
    fn name(&self) -> &'static str {
        "card select"
    }

    fn on_start(&mut self, ctx: &mut BattleContext) {
        ctx.round += 1;
        self.dealt = ctx.folder.deal(ctx.config.hand_size);
        self.picked.clear();
        self.form = ctx.local_form.current;
        self.confirmed = false;
        self.new_chips = false;
        ctx.hand.clear();
        ctx.handshake_complete = false;
        ctx.remote_state.opened_card_select = false;
        ctx.field.highlight_tiles(false);
        ctx.play(AudioType::CustomScreenOpen, AudioPriority::Low);
        info!("card select: round {} dealt {} cards", ctx.round, self.dealt.len());
    }

    fn on_update(&mut self, ctx: &mut BattleContext, _elapsed: Duration) {
        // a request crossing ours on the wire is already satisfied
        ctx.remote_state.opened_card_select = false;

        if self.confirmed {
            return;
        }
        let input = std::mem::take(&mut ctx.input);
        for slot in input.picks {
            self.toggle(slot);
        }
        if input.toggle_form {
            self.form = (self.form + 1) % FORM_COUNT;
        }
        if input.confirm {
            self.confirm(ctx);
        }
    }

    fn on_end(&mut self, ctx: &mut BattleContext) {
        ctx.field.highlight_tiles(true);
    }

    fn on_draw(&self, ctx: &BattleContext, surface: &mut Surface) {
        draw_banner(surface, 0, &format!("CUSTOM  round {}", ctx.round), Style::default().fg(Color::Cyan));
        for (slot, card) in self.dealt.iter().enumerate() {
            let order = self.picked.iter().position(|&p| p == slot);
            let style = match order {
                Some(_) => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                None => Style::default(),
            };
            let mark = order.map_or(" ".to_string(), |o| (o + 1).to_string());
            draw_label(surface, 2, 2 + slot as u16, &format!("{} [{}] {}", slot + 1, mark, card.label()), style);
        }
        let form = if self.form == 0 { "Normal".to_string() } else { format!("Form {}", self.form) };
        let footer = if self.confirmed { "Waiting for opponent..." } else { "Enter: OK  f: form" };
        let y = 3 + self.dealt.len() as u16;
        draw_label(surface, 2, y, &form, Style::default().fg(Color::Magenta));
        draw_label(surface, 2, y + 1, footer, Style::default().add_modifier(Modifier::DIM));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scene::context::fixtures::*;

    #[test]
    fn confirm_builds_the_hand_in_pick_order() {
        let mut ctx = context();
        let mut state = CardSelectState::default();
        state.on_start(&mut ctx);
        assert_eq!(state.dealt().len(), 5);

        ctx.input.picks = vec![3, 1, 3, 0];
        state.on_update(&mut ctx, FRAME);
        assert_eq!(state.picked(), &[1, 0]);
        assert!(!state.ok_is_pressed());

        ctx.input.confirm = true;
        state.on_update(&mut ctx, FRAME);
        assert!(state.selected_new_chips());
        assert_eq!(ctx.hand.uuids(), vec![state.dealt()[1].uuid.clone(), state.dealt()[0].uuid.clone()]);
        assert!(matches!(&ctx.outbox[..], [Signal::Handshake { form: 0, cards }] if cards.len() == 2));
    }

    #[test]
    fn empty_hand_still_confirms() {
        let mut ctx = context();
        let mut state = CardSelectState::default();
        state.on_start(&mut ctx);
        ctx.input.toggle_form = true;
        ctx.input.confirm = true;
        state.on_update(&mut ctx, FRAME);
        assert!(state.ok_is_pressed());
        assert!(!state.selected_new_chips());
        assert!(state.has_form(&ctx));
        assert_eq!(ctx.local_form.pending, Some(1));
    }
}
