use std::time::Duration;

use log::{debug, info};
use ratatui::style::{Color, Modifier, Style};

use crate::engine::{
    prelude::*,
    scene::{context::CHARGE_TIME, BattleContext, BattleState, CardUse},
    surface::{draw_field, draw_label, Surface},
};
use crate::net::Signal;

/// Real-time fighting between card selects.
#[derive(Default)]
pub struct CombatState {
    custom: Timer,
    charge: Timer,
    requested_card_select: bool,
    player_won: bool,
    player_lost: bool,
    loser_sent: bool,
}

impl CombatState {
    pub fn player_won(&self) -> bool {
        self.player_won
    }

    pub fn player_lost(&self) -> bool {
        self.player_lost
    }

    pub fn is_custom_full(&self, ctx: &BattleContext) -> bool {
        self.custom.elapsed() >= ctx.config.custom_duration
    }

    /// Either we opened card select or the opponent did.
    pub fn is_card_select_requested(&self, ctx: &BattleContext) -> bool {
        self.requested_card_select || ctx.remote_state.opened_card_select
    }

    pub fn has_time_freeze(&self, ctx: &BattleContext) -> bool {
        !ctx.time_freeze_requests.is_empty()
    }

    pub fn is_charging(&self) -> bool {
        self.charge.is_running()
    }

    /// Holds the buster, or lets go of it: a full charge fires the special,
    /// anything less a plain shot.
    fn toggle_charge(&mut self, ctx: &mut BattleContext) {
        if !self.charge.is_running() {
            self.charge.restart();
            ctx.send(Signal::Charge(true));
            return;
        }
        let full = self.charge.elapsed() >= CHARGE_TIME;
        self.charge.reset();
        ctx.send(Signal::Charge(false));
        if full {
            debug!("combat: charged shot");
            ctx.fire_special(ctx.local);
            ctx.send(Signal::Special);
        } else {
            ctx.fire_buster(ctx.local);
            ctx.send(Signal::Shoot);
        }
    }

    /// Time freeze cards wait for their own state; everything else runs now.
    fn dispatch(ctx: &mut BattleContext, card_use: CardUse) {
        let mut action = ctx.make_action(&card_use);
        if card_use.card.is_time_freeze() {
            debug!("combat: {} freezes time", card_use.card);
            ctx.time_freeze_requests.push_back(action);
            return;
        }
        if action.can_execute(&ctx.field) {
            action.execute(card_use.actor, &mut ctx.field);
            ctx.active_actions.push(action);
        } else {
            debug!("combat: {} could not be used", card_use.card);
        }
    }

    fn process_input(&mut self, ctx: &mut BattleContext) {
        let input = std::mem::take(&mut ctx.input);
        if let Some((dx, dy)) = input.movement {
            if let Some(tile) = ctx.local_character().map(|c| c.tile) {
                let to = Tile::new(tile.x + dx, tile.y + dy);
                // players stay on their own half
                if to.x <= ctx.field.width() / 2 {
                    ctx.field.move_to(ctx.local, to);
                }
            }
        }
        if input.shoot {
            ctx.fire_buster(ctx.local);
            ctx.send(Signal::Shoot);
        }
        if input.charge {
            self.toggle_charge(ctx);
        }
        if input.use_card {
            if let Some(card_use) = ctx.use_local_card() {
                Self::dispatch(ctx, card_use);
            }
        }
        if input.request_card_select && self.is_custom_full(ctx) && !self.requested_card_select {
            info!("combat: opening card select");
            self.requested_card_select = true;
            ctx.send(Signal::CardSelect);
        }
    }
}

impl BattleState<BattleContext> for CombatState {
    fn name(&self) -> &'static str {
        "combat"
    }

    fn on_start(&mut self, ctx: &mut BattleContext) {
        self.custom.start();
        ctx.field.toggle_time_freeze(false);
    }

    fn on_update(&mut self, ctx: &mut BattleContext, elapsed: Duration) {
        self.custom.update(elapsed);
        self.charge.update(elapsed);

        if !self.player_lost {
            self.process_input(ctx);
        }
        while let Some(card_use) = ctx.card_uses.pop_front() {
            Self::dispatch(ctx, card_use);
        }

        for action in ctx.active_actions.iter_mut() {
            action.update(elapsed, &mut ctx.field);
        }
        ctx.active_actions.retain(|action| !action.is_finished());

        if ctx.remote_state.loser && !self.player_won {
            info!("combat: opponent deleted");
            self.player_won = true;
        }
        if ctx.is_player_deleted() && !self.player_lost {
            info!("combat: player deleted");
            self.player_lost = true;
            ctx.play(AudioType::Deleted, AudioPriority::Highest);
        }
        if self.player_lost && !self.loser_sent {
            self.loser_sent = true;
            ctx.send(Signal::Loser);
        }
    }

    fn on_end(&mut self, ctx: &mut BattleContext) {
        if self.charge.is_running() {
            self.charge.reset();
            ctx.send(Signal::Charge(false));
        }
        if self.is_card_select_requested(ctx) {
            self.custom.reset();
            self.requested_card_select = false;
        }
    }

    fn on_draw(&self, ctx: &BattleContext, surface: &mut Surface) {
        let gauge_width = 20;
        let ratio = self.custom.elapsed().as_secs_f32() / ctx.config.custom_duration.as_secs_f32().max(f32::EPSILON);
        let filled = ((ratio.min(1.0)) * gauge_width as f32) as usize;
        let gauge = format!("CUSTOM [{}{}]", "#".repeat(filled), " ".repeat(gauge_width - filled));
        let style = if self.is_custom_full(ctx) {
            Style::default().fg(Color::LightGreen).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        draw_label(surface, 0, 0, &gauge, style);

        let next = ctx.hand.first().map_or("-".to_string(), |card| card.label());
        draw_label(surface, 0, 1, &format!("Next: {next}  ({} left)", ctx.hand.len()), Style::default());
        let mut charging = vec![];
        if self.is_charging() {
            charging.push(if self.charge.elapsed() >= CHARGE_TIME { "CHARGED" } else { "charging" });
        }
        if ctx.remote_state.charge {
            charging.push("opponent charging");
        }
        draw_label(surface, 0, 2, &charging.join("  "), Style::default().fg(Color::Yellow));
        draw_field(surface, &ctx.field, 3);
    }
}
