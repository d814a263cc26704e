use std::{collections::BTreeMap, time::Duration};

use dyn_clone::DynClone;

use super::prelude::*;

/// What has to finish before an action lets go of its user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LockoutType {
    /// A multi-step sequence; ends when every step has run.
    Sequence,
    /// Ends with the user's animation.
    Animation,
    /// Ends after a fixed amount of time.
    Time(Duration),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionMetadata {
    pub short_name: String,
    pub damage: i32,
    pub element: Element,
    pub time_freeze: bool,
    pub skip_time_freeze_intro: bool,
}

impl From<&Card> for ActionMetadata {
    fn from(card: &Card) -> Self {
        Self {
            short_name: card.short_name.clone(),
            damage: card.props.damage,
            element: card.props.element,
            time_freeze: card.props.time_freeze,
            skip_time_freeze_intro: card.props.skip_time_freeze_intro,
        }
    }
}

/// The behavior behind a used card. Battle states only drive actions through
/// this interface; what an action does on the field is up to the action.
pub trait CardAction: DynClone {
    fn metadata(&self) -> &ActionMetadata;

    fn actor(&self) -> EntityID;

    fn set_actor(&mut self, actor: EntityID);

    fn lockout(&self) -> LockoutType;

    fn can_execute(&self, field: &Field) -> bool {
        field.get(self.actor()).is_some_and(|c| !c.is_deleted())
    }

    /// Starts the action on behalf of `actor`.
    fn execute(&mut self, actor: EntityID, field: &mut Field);

    /// Redirects visuals to a stand-in while the real user is hidden.
    fn use_stand_in(&mut self, stand_in: EntityID);

    fn update(&mut self, elapsed: Duration, field: &mut Field);

    fn is_animation_over(&self) -> bool;

    fn is_lockout_over(&self) -> bool;

    /// Whether the action has released its user, according to its lockout.
    fn is_finished(&self) -> bool {
        match self.lockout() {
            LockoutType::Sequence => self.is_lockout_over(),
            _ => self.is_animation_over(),
        }
    }
}

dyn_clone::clone_trait_object!(CardAction);

/// Builds the action for a used card.
pub type ActionFactory = fn(&Card, EntityID) -> Box<dyn CardAction>;

/// Maps card uuids to action prototypes. Cards without a registered
/// prototype fall back to the factory.
pub struct ActionLibrary {
    prototypes: BTreeMap<String, Box<dyn CardAction>>,
    fallback: ActionFactory,
}

impl ActionLibrary {
    pub fn new(fallback: ActionFactory) -> Self {
        Self {
            prototypes: BTreeMap::new(),
            fallback,
        }
    }

    pub fn with_prototype(mut self, uuid: impl Into<String>, action: Box<dyn CardAction>) -> Self {
        self.prototypes.insert(uuid.into(), action);
        self
    }

    pub fn make_action(&self, card: &Card, actor: EntityID) -> Box<dyn CardAction> {
        match self.prototypes.get(&card.uuid) {
            Some(prototype) => {
                let mut action = dyn_clone::clone_box(&**prototype);
                action.set_actor(actor);
                action
            }
            None => (self.fallback)(card, actor),
        }
    }
}
