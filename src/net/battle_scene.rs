//! A battle against a remote peer: the state graph plus the signal plumbing
//! that keeps both sides in step.

use std::time::{Duration, Instant};

use color_eyre::{
    eyre::{bail, eyre, WrapErr},
    Result,
};
use log::{debug, error, info, warn};

use super::{processor::PacketProcessor, signal::Signal, transport::Transport};
use crate::engine::{
    prelude::*,
    scene::{BattleContext, CardUse, PlayerInput, StateGraph, StateNode},
    states::*,
    surface::Surface,
};

/// Handles to every state of the battle graph.
#[derive(Clone, Copy, Debug)]
pub struct BattleNodes {
    pub sync: StateNode<NetworkSyncState>,
    pub card_select: StateNode<CardSelectState>,
    pub combo: StateNode<CardComboState>,
    pub forms: StateNode<CharacterTransformState>,
    pub battle_start: StateNode<BattleStartState>,
    pub combat: StateNode<CombatState>,
    pub time_freeze: StateNode<TimeFreezeState>,
    pub battle_over: StateNode<BattleOverState>,
    pub fade_out: StateNode<FadeOutState>,
}

impl BattleNodes {
    fn add_to(graph: &mut StateGraph<BattleContext>) -> Self {
        Self {
            sync: graph.add_state(NetworkSyncState::default()),
            card_select: graph.add_state(CardSelectState::default()),
            combo: graph.add_state(CardComboState::default()),
            forms: graph.add_state(CharacterTransformState::default()),
            battle_start: graph.add_state(BattleStartState::default()),
            combat: graph.add_state(CombatState::default()),
            time_freeze: graph.add_state(TimeFreezeState::default()),
            battle_over: graph.add_state(BattleOverState::default()),
            fade_out: graph.add_state(FadeOutState::default()),
        }
    }

    fn link(self, graph: &mut StateGraph<BattleContext>) {
        let n = self;
        graph.link(n.sync, n.card_select, |_, ctx| ctx.remote_state.connected);

        graph
            .edges_from(n.card_select)
            .to(n.combo, move |states, ctx| {
                states.get(n.card_select).selected_new_chips() && ctx.handshake_complete
            })
            .to(n.forms, move |states, ctx| {
                states.get(n.card_select).has_form(ctx) && ctx.handshake_complete
            })
            .to(n.battle_start, move |states, ctx| {
                states.get(n.card_select).ok_is_pressed() && ctx.handshake_complete
            });

        graph
            .edges_from(n.combo)
            .to(n.forms, move |states, ctx| {
                states.get(n.combo).is_done() && (ctx.local_form.is_pending() || ctx.remote_form.is_pending())
            })
            .to(n.battle_start, move |states, _| states.get(n.combo).is_done());

        graph.change_on(n.forms, n.battle_start, CharacterTransformState::is_finished);
        graph.change_on(n.battle_start, n.combat, BattleStartState::is_finished);
        graph.change_on(n.time_freeze, n.combat, TimeFreezeState::is_over);

        graph
            .edges_from(n.combat)
            .to(n.battle_over, move |states, _| states.get(n.combat).player_won())
            .to(n.fade_out, move |states, _| states.get(n.combat).player_lost())
            .to(n.card_select, move |states, ctx| states.get(n.combat).is_card_select_requested(ctx))
            .to(n.time_freeze, move |states, ctx| states.get(n.combat).has_time_freeze(ctx));

        graph.change_on(n.battle_over, n.fade_out, BattleOverState::is_finished);
    }
}

pub struct NetworkBattle<T> {
    ctx: BattleContext,
    graph: StateGraph<BattleContext>,
    nodes: BattleNodes,
    processor: PacketProcessor<T>,
    last_tile: Option<Tile>,
}

impl<T: Transport> NetworkBattle<T> {
    /// Builds the battle graph and announces ourselves to the remote.
    pub fn new(ctx: BattleContext, transport: T, now: Instant) -> Self {
        let mut graph = StateGraph::new();
        let nodes = BattleNodes::add_to(&mut graph);
        nodes.link(&mut graph);

        let processor = PacketProcessor::new(transport, ctx.config.silence_timeout);
        let mut battle = Self {
            ctx,
            graph,
            nodes,
            processor,
            last_tile: None,
        };
        battle.graph.start(nodes.sync, &mut battle.ctx);
        let navi = battle.ctx.config.navi;
        battle.send_signal(Signal::Connect { navi }, now);
        battle
    }

    /// Runs one frame: network in, simulation, network out.
    pub fn update(&mut self, elapsed: Duration, now: Instant) {
        if self.processor.update(now) {
            self.quit();
        }
        for body in self.processor.poll(now) {
            self.process_packet_body(&body, now);
        }
        self.ctx.handshake_complete = self.processor.is_handshake_complete();

        self.ctx.clock += elapsed;
        self.graph.tick(&mut self.ctx, elapsed);
        self.ctx.input = PlayerInput::default();

        for signal in std::mem::take(&mut self.ctx.outbox) {
            self.send_signal(signal, now);
        }
        self.send_continuous(now);

        if self.ctx.quit_requested {
            self.quit();
        }
    }

    pub fn draw(&self, surface: &mut Surface) {
        self.graph.draw(&self.ctx, surface);
    }

    /// Leaves the battle no matter what state it is in.
    pub fn quit(&mut self) {
        if self.graph.force(self.nodes.fade_out, &mut self.ctx).is_some() {
            info!("netplay: leaving the battle");
        }
    }

    pub fn is_over(&self) -> bool {
        self.graph.is_current(self.nodes.fade_out) && self.graph.get(self.nodes.fade_out).is_finished()
    }

    pub fn input_mut(&mut self) -> &mut PlayerInput {
        &mut self.ctx.input
    }

    pub fn current_state(&self) -> Option<&'static str> {
        self.graph.current()
    }

    pub fn nodes(&self) -> BattleNodes {
        self.nodes
    }

    pub fn graph(&self) -> &StateGraph<BattleContext> {
        &self.graph
    }

    pub fn context(&self) -> &BattleContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut BattleContext {
        &mut self.ctx
    }

    pub fn average_rtt(&self) -> Duration {
        self.processor.average_rtt()
    }

    pub fn is_kicked(&self) -> bool {
        self.processor.is_kicked()
    }

    pub fn connection_errors(&self) -> u32 {
        self.processor.errors()
    }

    fn send_signal(&mut self, signal: Signal, now: Instant) {
        let is_handshake = matches!(signal, Signal::Handshake { .. });
        match self.processor.send(signal.reliability(), signal.encode(), now) {
            Ok(id) if is_handshake => self.processor.update_handshake_id(id),
            Ok(_) => {}
            Err(e) => {
                error!("netplay: could not send {:?}: {e:#}", signal.kind());
                self.processor.handle_error();
            }
        }
    }

    /// HP every frame while alive, the tile whenever it changes.
    fn send_continuous(&mut self, now: Instant) {
        if !self.ctx.remote_state.connected {
            return;
        }
        let Some((health, tile)) = self.ctx.local_character().map(|c| (c.health, c.tile)) else {
            return;
        };
        if !self.ctx.is_player_deleted() {
            self.send_signal(Signal::Hp(health), now);
        }
        if self.last_tile != Some(tile) {
            self.last_tile = Some(tile);
            self.send_signal(Signal::Tile { x: tile.x, y: tile.y }, now);
        }
    }

    /// Decodes and applies one inbound signal body.
    pub fn process_packet_body(&mut self, body: &[u8], now: Instant) {
        let signal = match Signal::decode(body) {
            Ok(signal) => signal,
            Err(e) => {
                warn!("netplay: dropping malformed signal: {e:#}");
                return;
            }
        };
        if let Err(e) = self.apply(signal, now) {
            error!("netplay: {e:#}");
            self.processor.handle_error();
        }
    }

    fn apply(&mut self, signal: Signal, now: Instant) -> Result<()> {
        // the handshake is unordered and may overtake the connect
        let early = !matches!(signal, Signal::Connect { .. } | Signal::Handshake { .. });
        if early && !self.ctx.remote_state.connected {
            debug!("netplay: ignoring {:?} before connect", signal.kind());
            return Ok(());
        }

        match signal {
            Signal::Connect { navi } => self.receive_connect(navi, now)?,
            Signal::Handshake { form, cards } => self.receive_handshake(form, &cards)?,
            Signal::CardUse { timestamp, uuid } => self.receive_card_use(timestamp, uuid)?,
            Signal::Form(form) => self.receive_form(form),
            Signal::Hp(hp) => {
                self.ctx.remote_state.hp = hp;
                if let Some(remote) = self.ctx.remote {
                    self.ctx.field.set_health(remote, hp);
                }
            }
            Signal::Tile { x, y } => self.receive_tile(x, y),
            Signal::Loser => self.receive_loser(now),
            Signal::Shoot => {
                if let Some(remote) = self.ctx.remote {
                    self.ctx.fire_buster(remote);
                }
            }
            Signal::Special => {
                if let Some(remote) = self.ctx.remote {
                    self.ctx.fire_special(remote);
                }
            }
            Signal::Charge(charging) => self.ctx.remote_state.charge = charging,
            Signal::CardSelect => {
                debug!("netplay: remote opened card select");
                self.ctx.remote_state.opened_card_select = true;
            }
        }
        Ok(())
    }

    fn receive_connect(&mut self, navi: u32, now: Instant) -> Result<()> {
        if self.ctx.remote_state.connected {
            debug!("netplay: ignoring duplicate connect");
            return Ok(());
        }
        self.ctx.remote_state.navi = navi;
        self.ctx.spawn_remote(navi).wrap_err("remote connected")?;
        self.ctx.remote_state.connected = true;
        self.processor.enable_kick_for_silence(true, now);
        info!("netplay: remote connected with navi {navi}");
        Ok(())
    }

    /// Replays the remote's combo to learn how long their reveal takes.
    fn receive_handshake(&mut self, form: i32, cards: &[String]) -> Result<()> {
        self.processor.remote_handshake_received();
        let mut hand = self.ctx.library.make_list(cards).wrap_err("remote handshake")?;
        let duration = ComboReveal::simulate_headless(&mut hand, &self.ctx.recipes, FRAME)?;
        self.ctx.round_start_delay = duration + self.processor.average_rtt();
        debug!(
            "netplay: remote hand of {} cards, reveal {:?}, start delay {:?}",
            hand.len(),
            duration,
            self.ctx.round_start_delay
        );
        self.ctx.remote_hand = hand;
        self.ctx.remote_form.select(form);
        self.ctx.remote_state.ready = true;
        Ok(())
    }

    /// Remote cards come out of the hand replayed at handshake, so merged and
    /// boosted cards keep the damage the remote saw.
    fn receive_card_use(&mut self, timestamp: u64, uuid: String) -> Result<()> {
        let Some(actor) = self.ctx.remote else {
            bail!("card use with no remote avatar");
        };
        let in_order = self.ctx.remote_hand.first().is_some_and(|next| next.uuid == uuid);
        let from_hand = if in_order { self.ctx.remote_hand.pop_front() } else { None };
        let card = match from_hand {
            Some(card) => card,
            None => {
                warn!("netplay: remote used {uuid} out of hand order, falling back to the library card");
                self.ctx
                    .library
                    .get(&uuid)
                    .ok_or_else(|| eyre!("remote used unknown card {uuid}"))?
            }
        };
        self.ctx.card_uses.push_back(CardUse { actor, card, timestamp });
        self.ctx.remote_state.last_card_used = Some(uuid);
        Ok(())
    }

    fn receive_form(&mut self, form: i32) {
        self.ctx.remote_state.form = form;
        let tracked = &mut self.ctx.remote_form;
        if tracked.is_pending() || tracked.current == form {
            return;
        }
        tracked.current = form;
        if let Some(character) = self.ctx.remote.and_then(|id| self.ctx.field.get_mut(id)) {
            character.form = Some(form);
        }
    }

    fn receive_tile(&mut self, x: i32, y: i32) {
        let x = (self.ctx.field.width() - x) + 1;
        self.ctx.remote_state.tile_x = x;
        self.ctx.remote_state.tile_y = y;
        self.ctx.settle_remote_tile();
    }

    /// The remote lost. Combat notices on its own; anywhere else we just leave.
    fn receive_loser(&mut self, now: Instant) {
        info!("netplay: remote reports defeat");
        self.ctx.remote_state.loser = true;
        self.processor.enable_kick_for_silence(false, now);
        let fighting =
            self.graph.is_current(self.nodes.combat) || self.graph.is_current(self.nodes.time_freeze);
        if !fighting {
            self.quit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::scene::context::{fixtures::*, SPECIAL_DAMAGE};
    use crate::impls::cards::*;
    use crate::net::{
        packet::Frame,
        processor::MAX_CONNECTION_ERRORS,
        transport::{channel_pair, ChannelTransport},
    };

    fn peer() -> NetworkBattle<ChannelTransport> {
        let (transport, _) = channel_pair();
        NetworkBattle::new(context(), transport, Instant::now())
    }

    /// A peer whose other end stays open, so sends never fail.
    fn linked_peer() -> (NetworkBattle<ChannelTransport>, ChannelTransport) {
        let (transport, remote) = channel_pair();
        let mut battle = NetworkBattle::new(context(), transport, Instant::now());
        receive(&mut battle, Signal::Connect { navi: 3 });
        (battle, remote)
    }

    fn sent_signals(remote: &mut ChannelTransport) -> Vec<Signal> {
        let mut signals = vec![];
        while let Some(bytes) = remote.try_recv() {
            if let Frame::Data { body, .. } = Frame::decode(&bytes).unwrap() {
                signals.push(Signal::decode(&body).unwrap());
            }
        }
        signals
    }

    fn receive(battle: &mut NetworkBattle<ChannelTransport>, signal: Signal) {
        battle.process_packet_body(&signal.encode(), Instant::now());
    }

    fn connected_peer() -> NetworkBattle<ChannelTransport> {
        let mut battle = peer();
        receive(&mut battle, Signal::Connect { navi: 3 });
        battle
    }

    #[test]
    fn remote_hp_is_last_write_wins() {
        let mut battle = connected_peer();
        receive(&mut battle, Signal::Hp(300));
        receive(&mut battle, Signal::Hp(42));
        assert_eq!(battle.context().remote_state.hp, 42);
        assert_eq!(battle.context().remote_character().unwrap().health, 42);
    }

    #[test]
    fn short_connect_is_rejected() {
        let mut battle = peer();
        battle.process_packet_body(&[1, 7, 0], Instant::now());
        assert!(!battle.context().remote_state.connected);
        assert!(battle.context().remote.is_none());
    }

    #[test]
    fn tiles_are_mirrored() {
        let mut battle = connected_peer();
        receive(&mut battle, Signal::Tile { x: 3, y: 1 });
        assert_eq!(battle.context().remote_character().unwrap().tile, Tile::new(4, 1));
        assert_eq!(battle.context().remote_state.tile_x, 4);
    }

    #[test]
    fn second_connect_is_ignored() {
        let mut battle = connected_peer();
        receive(&mut battle, Signal::Connect { navi: 9 });
        assert_eq!(battle.context().field.characters().count(), 2);
        assert_eq!(battle.context().remote_state.navi, 3);
    }

    #[test]
    fn signals_before_connect_are_ignored() {
        let mut battle = peer();
        let before = battle.context().remote_state.clone();
        receive(&mut battle, Signal::Hp(42));
        receive(&mut battle, Signal::Loser);
        assert_eq!(battle.context().remote_state, before);
        assert_eq!(battle.current_state(), Some("sync"));
    }

    #[test]
    fn handshake_replays_the_remote_combo() {
        let mut battle = connected_peer();
        let cards: Vec<String> = [CANNON_A, CANNON_B, CANNON_C].map(String::from).to_vec();
        let mut expected = battle.context().library.make_list(&cards).unwrap();
        let duration = ComboReveal::simulate_headless(&mut expected, &battle.context().recipes, FRAME).unwrap();

        receive(&mut battle, Signal::Handshake { form: 1, cards });
        let ctx = battle.context();
        assert_eq!(ctx.remote_hand.uuids(), vec![Z_CANNON.to_string()]);
        assert_eq!(ctx.round_start_delay, duration);
        assert_eq!(ctx.remote_form.pending, Some(1));
        assert!(ctx.remote_state.ready);
    }

    #[test]
    fn out_of_order_card_use_falls_back_to_the_library() {
        let (mut battle, _remote) = linked_peer();
        receive(&mut battle, Signal::CardUse { timestamp: 20, uuid: ATTACK_PLUS_10.into() });
        assert_eq!(battle.connection_errors(), 0);
        receive(&mut battle, Signal::CardUse { timestamp: 30, uuid: "nope".into() });
        assert_eq!(battle.connection_errors(), 1);

        let ctx = battle.context();
        assert_eq!(ctx.card_uses.len(), 1);
        assert_eq!(ctx.card_uses[0].card.props.damage, 10);
        assert_eq!(ctx.remote_state.last_card_used.as_deref(), Some(ATTACK_PLUS_10));
    }

    #[test]
    fn remote_card_use_keeps_its_support_boost() {
        let mut battle = connected_peer();
        let cards = [CANNON_A, ATTACK_PLUS_10].map(String::from).to_vec();
        receive(&mut battle, Signal::Handshake { form: 0, cards });
        assert_eq!(battle.context().remote_hand.len(), 1);

        receive(&mut battle, Signal::CardUse { timestamp: 10, uuid: CANNON_A.into() });
        let ctx = battle.context();
        assert_eq!(ctx.card_uses.len(), 1);
        assert_eq!(ctx.card_uses[0].card.props.damage, 50);
        assert!(ctx.remote_hand.is_empty());
    }

    #[test]
    fn remote_program_advance_is_used_as_merged() {
        let mut battle = connected_peer();
        let cards = [CANNON_A, CANNON_B, CANNON_C, ATTACK_PLUS_10].map(String::from).to_vec();
        receive(&mut battle, Signal::Handshake { form: 0, cards });

        receive(&mut battle, Signal::CardUse { timestamp: 10, uuid: Z_CANNON.into() });
        let ctx = battle.context();
        assert_eq!(ctx.card_uses[0].card.uuid, Z_CANNON);
        assert_eq!(ctx.card_uses[0].card.props.damage, 210);
        assert!(ctx.remote_hand.is_empty());
    }

    #[test]
    fn repeated_apply_errors_end_the_battle() {
        let (mut battle, _remote) = linked_peer();
        let unknown = || Signal::CardUse { timestamp: 0, uuid: "nope".into() };
        for _ in 1..MAX_CONNECTION_ERRORS {
            receive(&mut battle, unknown());
        }
        assert_eq!(battle.connection_errors(), MAX_CONNECTION_ERRORS - 1);
        assert!(!battle.is_kicked());

        receive(&mut battle, unknown());
        assert!(battle.is_kicked());
        battle.update(FRAME, Instant::now());
        assert_eq!(battle.current_state(), Some("fade out"));
    }

    #[test]
    fn silent_remote_is_kicked() {
        let (transport, _remote) = channel_pair();
        let start = Instant::now();
        let mut battle = NetworkBattle::new(context(), transport, start);
        battle.process_packet_body(&Signal::Connect { navi: 3 }.encode(), start);
        let timeout = battle.context().config.silence_timeout;

        battle.update(FRAME, start + timeout - Duration::from_secs(1));
        assert!(!battle.is_kicked());
        assert_ne!(battle.current_state(), Some("fade out"));

        battle.update(FRAME, start + timeout + Duration::from_secs(1));
        assert!(battle.is_kicked());
        assert_eq!(battle.current_state(), Some("fade out"));
    }

    #[test]
    fn hp_stops_once_the_player_is_deleted() {
        let (mut battle, mut remote) = linked_peer();
        let now = Instant::now();
        battle.update(FRAME, now);
        assert!(sent_signals(&mut remote).iter().any(|s| matches!(s, Signal::Hp(_))));

        let local = battle.context().local;
        battle.context_mut().field.set_health(local, 0);
        battle.update(FRAME, now);
        assert!(!sent_signals(&mut remote).iter().any(|s| matches!(s, Signal::Hp(_))));
    }

    #[test]
    fn tiles_wait_out_a_time_freeze() {
        let mut battle = connected_peer();
        battle.context_mut().field.toggle_time_freeze(true);
        receive(&mut battle, Signal::Tile { x: 2, y: 3 });
        assert_eq!(battle.context().remote_character().unwrap().tile, Tile::new(5, 2));

        let ctx = battle.context_mut();
        ctx.field.toggle_time_freeze(false);
        ctx.settle_remote_tile();
        assert_eq!(battle.context().remote_character().unwrap().tile, Tile::new(5, 3));
    }

    #[test]
    fn remote_special_hits_harder_than_a_shot() {
        let mut battle = connected_peer();
        let max_hp = battle.context().config.max_hp;
        receive(&mut battle, Signal::Charge(true));
        assert!(battle.context().remote_state.charge);
        receive(&mut battle, Signal::Charge(false));
        receive(&mut battle, Signal::Special);
        assert_eq!(battle.context().local_character().unwrap().health, max_hp - SPECIAL_DAMAGE);
    }

    #[test]
    fn loser_outside_combat_ends_the_battle() {
        let mut battle = connected_peer();
        receive(&mut battle, Signal::Loser);
        assert!(battle.context().remote_state.loser);
        assert_eq!(battle.current_state(), Some("fade out"));
    }

    #[test]
    fn two_peers_reach_combat() {
        let (a, b) = channel_pair();
        let mut now = Instant::now();
        let mut peers = [NetworkBattle::new(context(), a, now), NetworkBattle::new(context(), b, now)];

        for _ in 0..2000 {
            now += FRAME;
            for battle in peers.iter_mut() {
                if battle.current_state() == Some("card select") {
                    let input = battle.input_mut();
                    input.picks = vec![0, 1];
                    input.confirm = true;
                }
                battle.update(FRAME, now);
            }
            if peers.iter().all(|battle| battle.current_state() == Some("combat")) {
                break;
            }
        }

        for battle in &peers {
            assert_eq!(battle.current_state(), Some("combat"));
            assert!(battle.context().remote_state.ready);
            assert_eq!(battle.context().round, 1);
            assert!(!battle.is_kicked());
        }
    }
}
