//! Concrete card actions.

use std::{rc::Rc, time::Duration};

use log::debug;

use crate::engine::prelude::*;

const STRIKE_WINDUP: Duration = frames(10);
const STRIKE_LENGTH: Duration = frames(30);
const RECOVER_LENGTH: Duration = frames(30);

/// Hits the closest opponent once, partway into the animation.
#[derive(Clone)]
pub struct StrikeAction {
    meta: ActionMetadata,
    actor: EntityID,
    stand_in: Option<EntityID>,
    elapsed: Duration,
    started: bool,
    landed: bool,
}

impl StrikeAction {
    pub fn new(card: &Card, actor: EntityID) -> Self {
        Self {
            meta: card.into(),
            actor,
            stand_in: None,
            elapsed: Duration::ZERO,
            started: false,
            landed: false,
        }
    }
}

impl CardAction for StrikeAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    fn actor(&self) -> EntityID {
        self.actor
    }

    fn set_actor(&mut self, actor: EntityID) {
        self.actor = actor;
    }

    fn lockout(&self) -> LockoutType {
        LockoutType::Animation
    }

    fn execute(&mut self, actor: EntityID, _field: &mut Field) {
        self.actor = actor;
        self.started = true;
    }

    fn use_stand_in(&mut self, stand_in: EntityID) {
        self.stand_in = Some(stand_in);
    }

    fn update(&mut self, elapsed: Duration, field: &mut Field) {
        if !self.started {
            return;
        }
        self.elapsed += elapsed;
        if !self.landed && self.elapsed >= STRIKE_WINDUP {
            self.landed = true;
            let team = field.get(self.actor).map(|c| c.team);
            if let Some(target) = team.and_then(|team| field.nearest_target(team)) {
                debug!("actions: {} hits {:?} for {}", self.meta.short_name, target, self.meta.damage);
                field.hit(target, self.meta.damage);
            }
        }
    }

    fn is_animation_over(&self) -> bool {
        self.elapsed >= STRIKE_LENGTH
    }

    fn is_lockout_over(&self) -> bool {
        self.is_animation_over()
    }
}

/// Heals the user. Locks the user out for a fixed time.
#[derive(Clone)]
pub struct RecoverAction {
    meta: ActionMetadata,
    actor: EntityID,
    elapsed: Duration,
    healed: bool,
}

impl RecoverAction {
    pub fn new(card: &Card, actor: EntityID) -> Self {
        Self {
            meta: card.into(),
            actor,
            elapsed: Duration::ZERO,
            healed: false,
        }
    }
}

impl CardAction for RecoverAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    fn actor(&self) -> EntityID {
        self.actor
    }

    fn set_actor(&mut self, actor: EntityID) {
        self.actor = actor;
    }

    fn lockout(&self) -> LockoutType {
        LockoutType::Time(RECOVER_LENGTH)
    }

    fn execute(&mut self, actor: EntityID, field: &mut Field) {
        self.actor = actor;
        if !self.healed {
            self.healed = field.heal(actor, self.meta.damage);
        }
    }

    fn use_stand_in(&mut self, _stand_in: EntityID) {}

    fn update(&mut self, elapsed: Duration, _field: &mut Field) {
        self.elapsed += elapsed;
    }

    fn is_animation_over(&self) -> bool {
        self.elapsed >= RECOVER_LENGTH
    }

    fn is_lockout_over(&self) -> bool {
        self.is_animation_over()
    }
}

/// A helper that appears, attacks, and leaves. Each step of the sequence
/// takes one `step` of time.
#[derive(Clone)]
pub struct SummonAction {
    meta: ActionMetadata,
    actor: EntityID,
    stand_in: Option<EntityID>,
    step: Duration,
    elapsed: Duration,
    steps_done: usize,
    started: bool,
}

const SUMMON_STEPS: usize = 3;

impl SummonAction {
    pub fn new(card: &Card, actor: EntityID) -> Self {
        Self {
            meta: card.into(),
            actor,
            stand_in: None,
            step: frames(20),
            elapsed: Duration::ZERO,
            steps_done: 0,
            started: false,
        }
    }

    pub fn stand_in(&self) -> Option<EntityID> {
        self.stand_in
    }
}

impl CardAction for SummonAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    fn actor(&self) -> EntityID {
        self.actor
    }

    fn set_actor(&mut self, actor: EntityID) {
        self.actor = actor;
    }

    fn lockout(&self) -> LockoutType {
        LockoutType::Sequence
    }

    fn execute(&mut self, actor: EntityID, _field: &mut Field) {
        self.actor = actor;
        self.started = true;
    }

    fn use_stand_in(&mut self, stand_in: EntityID) {
        self.stand_in = Some(stand_in);
    }

    fn update(&mut self, elapsed: Duration, field: &mut Field) {
        if !self.started || self.is_lockout_over() {
            return;
        }
        self.elapsed += elapsed;
        while self.elapsed >= self.step && self.steps_done < SUMMON_STEPS {
            self.elapsed -= self.step;
            self.steps_done += 1;
            // the middle step is the attack
            if self.steps_done == 2 {
                let team = field.get(self.actor).map(|c| c.team);
                if let Some(target) = team.and_then(|team| field.nearest_target(team)) {
                    debug!("actions: {} strikes {:?}", self.meta.short_name, target);
                    field.hit(target, self.meta.damage);
                }
            }
        }
    }

    fn is_animation_over(&self) -> bool {
        self.is_lockout_over()
    }

    fn is_lockout_over(&self) -> bool {
        self.steps_done >= SUMMON_STEPS
    }
}

pub type FieldHook = Rc<dyn Fn(&mut Field, EntityID)>;

/// An action assembled from optional hooks, for cards whose behavior is
/// supplied from outside.
#[derive(Clone)]
pub struct ScriptedAction {
    meta: ActionMetadata,
    actor: EntityID,
    length: Duration,
    elapsed: Duration,
    started: bool,
    ended: bool,
    pub on_execute: Option<FieldHook>,
    pub on_end: Option<FieldHook>,
}

impl ScriptedAction {
    pub fn new(card: &Card, length: Duration) -> Self {
        Self {
            meta: card.into(),
            // replaced by the action library before use
            actor: IDFactory::<EntityID>::new().get_id(),
            length,
            elapsed: Duration::ZERO,
            started: false,
            ended: false,
            on_execute: None,
            on_end: None,
        }
    }

    pub fn with_execute(mut self, hook: impl Fn(&mut Field, EntityID) + 'static) -> Self {
        self.on_execute = Some(Rc::new(hook));
        self
    }

    pub fn with_end(mut self, hook: impl Fn(&mut Field, EntityID) + 'static) -> Self {
        self.on_end = Some(Rc::new(hook));
        self
    }

    pub fn damage(&self) -> i32 {
        self.meta.damage
    }
}

impl CardAction for ScriptedAction {
    fn metadata(&self) -> &ActionMetadata {
        &self.meta
    }

    fn actor(&self) -> EntityID {
        self.actor
    }

    fn set_actor(&mut self, actor: EntityID) {
        self.actor = actor;
    }

    fn lockout(&self) -> LockoutType {
        LockoutType::Animation
    }

    fn execute(&mut self, actor: EntityID, field: &mut Field) {
        self.actor = actor;
        self.started = true;
        if let Some(hook) = &self.on_execute {
            hook(field, actor);
        }
    }

    fn use_stand_in(&mut self, _stand_in: EntityID) {}

    fn update(&mut self, elapsed: Duration, field: &mut Field) {
        if !self.started || self.ended {
            return;
        }
        self.elapsed += elapsed;
        if self.elapsed >= self.length {
            self.ended = true;
            if let Some(hook) = &self.on_end {
                hook(field, self.actor);
            }
        }
    }

    fn is_animation_over(&self) -> bool {
        self.ended
    }

    fn is_lockout_over(&self) -> bool {
        self.ended
    }
}

/// The default action for a card without a registered one.
pub fn card_to_action(card: &Card, actor: EntityID) -> Box<dyn CardAction> {
    if card.is_time_freeze() {
        Box::new(SummonAction::new(card, actor))
    } else if card.short_name.starts_with("Recov") {
        Box::new(RecoverAction::new(card, actor))
    } else {
        Box::new(StrikeAction::new(card, actor))
    }
}

/// Hits every opponent of `user` with `damage`.
fn quake(damage: i32) -> impl Fn(&mut Field, EntityID) {
    move |field, user| {
        let Some(team) = field.get(user).map(|c| c.team) else {
            return;
        };
        let targets: Vec<_> = field
            .characters()
            .filter(|c| c.team != team && !c.hidden && !c.is_stand_in())
            .map(|c| c.id)
            .collect();
        for target in targets {
            field.hit(target, damage);
        }
    }
}

pub fn builtin_actions() -> ActionLibrary {
    let quake_card = super::cards::quake();
    let damage = quake_card.props.damage;
    ActionLibrary::new(card_to_action).with_prototype(
        quake_card.uuid.clone(),
        Box::new(ScriptedAction::new(&quake_card, frames(40)).with_execute(quake(damage))),
    )
}
