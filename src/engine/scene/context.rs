use std::{collections::VecDeque, rc::Rc, time::Duration};

use color_eyre::{eyre::bail, Result};
use log::{debug, info};

use crate::engine::prelude::*;
use crate::net::{RemoteState, Signal};

/// A card someone used, waiting to be turned into an action.
#[derive(Clone, Debug)]
pub struct CardUse {
    pub actor: EntityID,
    pub card: CardRef,
    /// Battle clock in milliseconds at the time of use.
    pub timestamp: u64,
}

/// One frame worth of player intent. Cleared after every tick.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlayerInput {
    /// Card select slots toggled this frame, in order.
    pub picks: Vec<usize>,
    pub toggle_form: bool,
    pub confirm: bool,
    pub use_card: bool,
    pub shoot: bool,
    /// Starts holding the buster, or lets go if already holding it.
    pub charge: bool,
    pub request_card_select: bool,
    pub movement: Option<(i32, i32)>,
}

/// A character's form and the one it is about to change into.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrackedForm {
    pub current: i32,
    pub pending: Option<i32>,
}

impl TrackedForm {
    pub fn select(&mut self, form: i32) {
        self.pending = (form != self.current).then_some(form);
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Commits the pending form, if any.
    pub fn apply(&mut self) -> Option<i32> {
        let form = self.pending.take()?;
        self.current = form;
        Some(form)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Local,
    Remote,
}

/// Backdrop opacity gained or lost per second.
pub const BACKDROP_RATE: f32 = 1.25;
pub const BUSTER_DAMAGE: i32 = 1;
pub const SPECIAL_DAMAGE: i32 = 10;
/// How long the buster has to be held before letting go fires the special.
pub const CHARGE_TIME: Duration = frames(60);

/// Everything the battle states share. States never talk to each other or to
/// the network directly; they read and write this.
pub struct BattleContext {
    pub config: BattleConfig,
    pub field: Field,
    pub local: EntityID,
    /// The opponent's avatar, once they connected.
    pub remote: Option<EntityID>,
    pub hand: CardList,
    pub remote_hand: CardList,
    pub remote_state: RemoteState,
    pub local_form: TrackedForm,
    pub remote_form: TrackedForm,
    /// Card uses that still have to be resolved.
    pub card_uses: VecDeque<CardUse>,
    pub time_freeze_requests: VecDeque<Box<dyn CardAction>>,
    pub active_actions: Vec<Box<dyn CardAction>>,
    /// Signals to send once the current frame is done.
    pub outbox: Vec<Signal>,
    pub input: PlayerInput,
    pub library: Rc<CardLibrary>,
    pub recipes: Rc<ProgramAdvance>,
    pub actions: Rc<ActionLibrary>,
    pub folder: Folder,
    pub audio: Box<dyn Audio>,
    pub round: u32,
    pub clock: Duration,
    /// How long the opponent's combo reveal plus the link latency takes.
    pub round_start_delay: Duration,
    pub local_combo_duration: Duration,
    pub handshake_complete: bool,
    pub backdrop: f32,
    pub quit_requested: bool,
}

impl BattleContext {
    pub fn new(
        config: BattleConfig,
        library: Rc<CardLibrary>,
        recipes: Rc<ProgramAdvance>,
        actions: Rc<ActionLibrary>,
        folder: Vec<CardRef>,
        audio: Box<dyn Audio>,
    ) -> Result<Self> {
        let mut field = Field::new(config.field_width, config.field_height);
        let player = Character::new("Player", Team::Red, config.max_hp);
        let AddEntityStatus::Added(local) = field.add_entity(player, Tile::new(2, 2)) else {
            bail!("the player does not fit on a {}x{} field", config.field_width, config.field_height);
        };

        let mut folder = Folder::new(folder, config.seed);
        folder.shuffle();

        Ok(Self {
            field,
            local,
            remote: None,
            hand: CardList::new(),
            remote_hand: CardList::new(),
            remote_state: RemoteState::default(),
            local_form: TrackedForm::default(),
            remote_form: TrackedForm::default(),
            card_uses: VecDeque::new(),
            time_freeze_requests: VecDeque::new(),
            active_actions: Vec::new(),
            outbox: Vec::new(),
            input: PlayerInput::default(),
            library,
            recipes,
            actions,
            folder,
            audio,
            round: 0,
            clock: Duration::ZERO,
            round_start_delay: Duration::ZERO,
            local_combo_duration: Duration::ZERO,
            handshake_complete: false,
            backdrop: 0.0,
            quit_requested: false,
            config,
        })
    }

    pub fn send(&mut self, signal: Signal) {
        self.outbox.push(signal);
    }

    pub fn play(&mut self, sound: AudioType, priority: AudioPriority) {
        self.audio.play(sound, priority);
    }

    pub fn local_character(&self) -> Option<&Character> {
        self.field.get(self.local)
    }

    pub fn remote_character(&self) -> Option<&Character> {
        self.remote.and_then(|id| self.field.get(id))
    }

    pub fn is_player_deleted(&self) -> bool {
        self.local_character().map_or(true, Character::is_deleted)
    }

    pub fn team_of(&self, id: EntityID) -> Option<Team> {
        self.field.get(id).map(|c| c.team)
    }

    /// Places the opponent's avatar on the tile we last heard about.
    pub fn spawn_remote(&mut self, navi: u32) -> Result<EntityID> {
        let tile = Tile::new(self.remote_state.tile_x, self.remote_state.tile_y);
        let avatar = Character::new(format!("Navi{navi}"), Team::Blue, self.config.max_hp);
        self.remote_state.hp = self.config.max_hp;
        match self.field.add_entity(avatar, tile) {
            AddEntityStatus::Added(id) => {
                info!("battle: remote avatar spawned at {:?}", tile);
                self.remote = Some(id);
                Ok(id)
            }
            AddEntityStatus::Deleted => bail!("could not place the remote avatar at {:?}", tile),
        }
    }

    /// Takes the next card from the local hand and announces its use.
    pub fn use_local_card(&mut self) -> Option<CardUse> {
        let card = self.hand.pop_front()?;
        let timestamp = self.clock.as_millis() as u64;
        debug!("battle: using {} at {}ms", card, timestamp);
        self.send(Signal::CardUse {
            timestamp,
            uuid: card.uuid.clone(),
        });
        Some(CardUse {
            actor: self.local,
            card,
            timestamp,
        })
    }

    pub fn make_action(&self, card_use: &CardUse) -> Box<dyn CardAction> {
        self.actions.make_action(&card_use.card, card_use.actor)
    }

    /// A plain shot at the closest opponent.
    pub fn fire_buster(&mut self, shooter: EntityID) {
        let Some(team) = self.team_of(shooter) else {
            return;
        };
        if let Some(target) = self.field.nearest_target(team) {
            self.field.hit(target, BUSTER_DAMAGE);
        }
    }

    /// The navi's special attack, fired by letting go of a full charge.
    pub fn fire_special(&mut self, shooter: EntityID) {
        let Some(team) = self.team_of(shooter) else {
            return;
        };
        if let Some(target) = self.field.nearest_target(team) {
            debug!("battle: special hits {:?}", target);
            self.field.hit(target, SPECIAL_DAMAGE);
        }
    }

    /// Moves the opponent's avatar to the tile they last reported. Nothing
    /// moves while time is frozen, so this is retried once it thaws.
    pub fn settle_remote_tile(&mut self) {
        let Some(remote) = self.remote else {
            return;
        };
        let tile = Tile::new(self.remote_state.tile_x, self.remote_state.tile_y);
        if !self.field.move_to(remote, tile) {
            debug!("battle: remote avatar cannot move to {:?} yet", tile);
        }
    }

    pub fn tracked_form(&mut self, side: Side) -> &mut TrackedForm {
        match side {
            Side::Local => &mut self.local_form,
            Side::Remote => &mut self.remote_form,
        }
    }

    pub fn entity(&self, side: Side) -> Option<EntityID> {
        match side {
            Side::Local => Some(self.local),
            Side::Remote => self.remote,
        }
    }

    /// Raises the backdrop towards `max`; true once it got there.
    pub fn fade_in_backdrop(&mut self, elapsed: Duration, max: f32) -> bool {
        self.backdrop = (self.backdrop + BACKDROP_RATE * elapsed.as_secs_f32()).min(max);
        self.backdrop >= max
    }

    /// Lowers the backdrop; true once it is gone.
    pub fn fade_out_backdrop(&mut self, elapsed: Duration) -> bool {
        self.backdrop = (self.backdrop - BACKDROP_RATE * elapsed.as_secs_f32()).max(0.0);
        self.backdrop <= 0.0
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::impls::cards::*;

    #[test]
    fn tracked_form_only_pends_on_change() {
        let mut form = TrackedForm::default();
        form.select(0);
        assert!(!form.is_pending());
        form.select(2);
        assert_eq!(form.apply(), Some(2));
        assert_eq!(form.current, 2);
        assert_eq!(form.apply(), None);
    }

    #[test]
    fn using_a_card_announces_it() {
        let mut ctx = context();
        ctx.hand = vec![card(&ctx, CANNON_A), card(&ctx, SWORD)].into();
        ctx.clock = Duration::from_millis(1500);
        let used = ctx.use_local_card().unwrap();
        assert_eq!(used.card.uuid, CANNON_A);
        assert_eq!(used.actor, ctx.local);
        assert_eq!(ctx.hand.len(), 1);
        assert_eq!(
            ctx.outbox,
            vec![Signal::CardUse {
                timestamp: 1500,
                uuid: CANNON_A.into()
            }]
        );
    }

    #[test]
    fn remote_spawns_on_the_blue_side() {
        let ctx = connected_context();
        let remote = ctx.remote_character().unwrap();
        assert_eq!(remote.team, Team::Blue);
        assert_eq!(remote.tile, Tile::new(5, 2));
    }

    #[test]
    fn backdrop_fades_both_ways() {
        let mut ctx = context();
        assert!(!ctx.fade_in_backdrop(Duration::from_millis(100), 0.5));
        assert!(ctx.fade_in_backdrop(Duration::from_secs(1), 0.5));
        assert_eq!(ctx.backdrop, 0.5);
        assert!(ctx.fade_out_backdrop(Duration::from_secs(1)));
        assert_eq!(ctx.backdrop, 0.0);
    }
}
