use std::time::Duration;

use log::{debug, info, warn};
use ratatui::style::{Color, Modifier, Style};

use crate::engine::{
    prelude::*,
    scene::{BattleContext, BattleState},
    surface::{draw_backdrop, draw_banner, draw_field, draw_label, Surface},
};

/// How long a time freeze card's name is shown. Counters must land in this window.
pub const SUMMON_TEXT_LENGTH: Duration = frames(60);
pub const BACKDROP_MAX: f32 = 0.5;
/// Length of the "countered" alert over the losing event's user.
pub const ALERT_LENGTH: Duration = frames(30);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeFreezePhase {
    FadeIn,
    DisplayName,
    Animate,
    FadeOut,
}

pub struct TimeFreezeEvent {
    pub action: Box<dyn CardAction>,
    pub user: EntityID,
    pub team: Team,
    pub name: String,
    pub stand_in: Option<EntityID>,
    pub animate_counter: bool,
    pub alert_elapsed: Duration,
}

/// Stops the battle while time freeze cards resolve. The opposing side gets a
/// short window to answer with its own time freeze card, which then resolves
/// first.
pub struct TimeFreezeState {
    phase: TimeFreezePhase,
    events: Vec<TimeFreezeEvent>,
    summon_elapsed: Duration,
    summon_started: bool,
    player_countered: bool,
    faded_out: bool,
    label: String,
}

impl Default for TimeFreezeState {
    fn default() -> Self {
        Self {
            phase: TimeFreezePhase::FadeIn,
            events: Vec::new(),
            summon_elapsed: Duration::ZERO,
            summon_started: false,
            player_countered: false,
            faded_out: false,
            label: String::new(),
        }
    }
}

impl TimeFreezeState {
    pub fn phase(&self) -> TimeFreezePhase {
        self.phase
    }

    pub fn events(&self) -> &[TimeFreezeEvent] {
        &self.events
    }

    pub fn is_over(&self) -> bool {
        self.phase == TimeFreezePhase::FadeOut && self.faded_out
    }

    fn is_window_open(&self) -> bool {
        matches!(self.phase, TimeFreezePhase::FadeIn | TimeFreezePhase::DisplayName)
            && self.summon_elapsed <= SUMMON_TEXT_LENGTH
    }

    /// A team may answer while the name is still up, and never answer itself.
    pub fn can_counter(&self, team: Team) -> bool {
        self.is_window_open() && self.events.first().map_or(true, |front| front.team != team)
    }

    /// Offers a time freeze action to the queue. Returns whether it was taken.
    pub fn on_card_action_used(&mut self, action: Box<dyn CardAction>, field: &Field) -> bool {
        if !action.metadata().time_freeze {
            return false;
        }
        let user = action.actor();
        let Some(team) = field.get(user).map(|c| c.team) else {
            return false;
        };
        if !self.can_counter(team) {
            debug!("time freeze: {} from {:?} rejected", action.metadata().short_name, team);
            return false;
        }
        if !self.events.is_empty() {
            info!("time freeze: {:?} counters with {}", team, action.metadata().short_name);
            self.player_countered = true;
        }
        let event = TimeFreezeEvent {
            name: action.metadata().short_name.clone(),
            action,
            user,
            team,
            stand_in: None,
            animate_counter: false,
            alert_elapsed: Duration::ZERO,
        };
        self.events.insert(0, event);
        true
    }

    fn process_inputs(&mut self, ctx: &mut BattleContext) {
        let input = std::mem::take(&mut ctx.input);
        let next_is_time_freeze = ctx.hand.first().is_some_and(|card| card.is_time_freeze());
        let local_team = ctx.team_of(ctx.local);
        if input.use_card && next_is_time_freeze && local_team.is_some_and(|team| self.can_counter(team)) {
            if let Some(card_use) = ctx.use_local_card() {
                let action = ctx.make_action(&card_use);
                self.on_card_action_used(action, &ctx.field);
            }
        }

        // only time freeze cards can answer; the rest wait for combat
        for card_use in std::mem::take(&mut ctx.card_uses) {
            if card_use.card.is_time_freeze() {
                let action = ctx.make_action(&card_use);
                if !self.on_card_action_used(action, &ctx.field) {
                    debug!("time freeze: dropped remote {}", card_use.card);
                }
            } else {
                ctx.card_uses.push_back(card_use);
            }
        }
    }

    /// Puts a stand-in on the front user's tile and starts its action.
    /// Fronts that can no longer act are dropped.
    fn execute_front(&mut self, ctx: &mut BattleContext) {
        loop {
            let Some(event) = self.events.first_mut() else {
                self.phase = TimeFreezePhase::FadeOut;
                return;
            };
            if !event.action.can_execute(&ctx.field) {
                debug!("time freeze: {} can no longer be used", event.name);
                self.events.remove(0);
                continue;
            }
            let Some(stand_in) = ctx.field.make_stand_in(event.user) else {
                self.events.remove(0);
                continue;
            };
            let tile = stand_in.tile;
            ctx.field.hide(event.user);
            match ctx.field.add_entity(stand_in, tile) {
                AddEntityStatus::Added(id) => {
                    event.stand_in = Some(id);
                    event.action.use_stand_in(id);
                    event.action.execute(event.user, &mut ctx.field);
                    self.label = event.name.clone();
                    self.phase = TimeFreezePhase::Animate;
                }
                AddEntityStatus::Deleted => {
                    warn!("time freeze: no room for {}'s stand-in at {:?}", event.name, tile);
                    ctx.field.reveal(event.user);
                    self.phase = TimeFreezePhase::FadeOut;
                }
            }
            return;
        }
    }

    fn release(event: &TimeFreezeEvent, field: &mut Field) {
        field.reveal(event.user);
        if let Some(stand_in) = event.stand_in {
            field.dealloc(stand_in);
        }
    }

    fn update_display_name(&mut self, ctx: &mut BattleContext, elapsed: Duration) {
        if let Some(front) = self.events.first() {
            self.label = front.name.clone();
        }
        if self.player_countered {
            self.player_countered = false;
            ctx.play(AudioType::Trap, AudioPriority::High);
            if let Some(countered) = self.events.get_mut(1) {
                countered.animate_counter = true;
                countered.alert_elapsed = Duration::ZERO;
            }
            self.summon_elapsed = Duration::ZERO;
        }
        for event in self.events.iter_mut().filter(|e| e.animate_counter) {
            event.alert_elapsed = (event.alert_elapsed + elapsed).min(ALERT_LENGTH);
        }

        if self.summon_elapsed >= SUMMON_TEXT_LENGTH {
            self.events.truncate(2);
            ctx.field.highlight_tiles(true);
            self.execute_front(ctx);
        }
    }

    fn update_animate(&mut self, ctx: &mut BattleContext, elapsed: Duration) {
        let Some(front) = self.events.first_mut() else {
            self.phase = TimeFreezePhase::FadeOut;
            return;
        };
        if !front.action.is_finished() {
            front.action.update(elapsed, &mut ctx.field);
            return;
        }

        let done = self.events.remove(0);
        Self::release(&done, &mut ctx.field);
        debug!("time freeze: {} finished", done.name);
        if self.events.is_empty() {
            self.phase = TimeFreezePhase::FadeOut;
        } else {
            self.execute_front(ctx);
        }
    }
}

impl BattleState<BattleContext> for TimeFreezeState {
    fn name(&self) -> &'static str {
        "time freeze"
    }

    fn on_start(&mut self, ctx: &mut BattleContext) {
        *self = Self::default();
        ctx.field.highlight_tiles(false);
        while let Some(action) = ctx.time_freeze_requests.pop_front() {
            self.on_card_action_used(action, &ctx.field);
        }

        let skip_intro = self.events.first().map(|front| front.action.metadata().skip_time_freeze_intro);
        match skip_intro {
            None => self.phase = TimeFreezePhase::FadeOut,
            Some(true) => {
                ctx.field.toggle_time_freeze(true);
                ctx.field.highlight_tiles(true);
                self.execute_front(ctx);
            }
            Some(false) => info!("time freeze: {} by {:?}", self.events[0].name, self.events[0].team),
        }
    }

    fn on_update(&mut self, ctx: &mut BattleContext, elapsed: Duration) {
        self.process_inputs(ctx);
        if self.summon_started {
            self.summon_elapsed += elapsed;
        }

        match self.phase {
            TimeFreezePhase::FadeIn => {
                if ctx.fade_in_backdrop(elapsed, BACKDROP_MAX) {
                    self.phase = TimeFreezePhase::DisplayName;
                    self.summon_started = true;
                    ctx.field.toggle_time_freeze(true);
                    ctx.play(AudioType::TimeFreeze, AudioPriority::Highest);
                }
            }
            TimeFreezePhase::DisplayName => self.update_display_name(ctx, elapsed),
            TimeFreezePhase::Animate => self.update_animate(ctx, elapsed),
            TimeFreezePhase::FadeOut => self.faded_out = ctx.fade_out_backdrop(elapsed),
        }
    }

    fn on_end(&mut self, ctx: &mut BattleContext) {
        for event in self.events.drain(..) {
            Self::release(&event, &mut ctx.field);
        }
        ctx.field.toggle_time_freeze(false);
        ctx.field.highlight_tiles(true);
        ctx.backdrop = 0.0;
        ctx.settle_remote_tile();
    }

    fn on_draw(&self, ctx: &BattleContext, surface: &mut Surface) {
        draw_field(surface, &ctx.field, 3);
        draw_backdrop(surface, ctx.backdrop);
        if matches!(self.phase, TimeFreezePhase::DisplayName | TimeFreezePhase::Animate) {
            let style = Style::default().fg(Color::White).add_modifier(Modifier::BOLD);
            draw_banner(surface, 0, &self.label, style);
        }
        for (row, event) in self.events.iter().filter(|e| e.animate_counter && e.alert_elapsed < ALERT_LENGTH).enumerate() {
            let style = Style::default().fg(Color::Red).add_modifier(Modifier::BOLD);
            draw_label(surface, 0, 1 + row as u16, &format!("! {} countered", event.name), style);
        }
    }
}
