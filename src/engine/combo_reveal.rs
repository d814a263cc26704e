//! The program advance reveal: steps through the selected cards one at a
//! time, lingers on the merged result, then commits the merge.
//!
//! Everything here runs on frame deltas only, so the same machine can be
//! driven headlessly to learn how long the opponent's reveal will take.

use std::time::Duration;

use color_eyre::{eyre::bail, Result};
use log::{debug, trace};

use super::prelude::*;

/// Delay between detecting a program advance and showing the first step.
pub const PA_LEAD_IN: Duration = Duration::from_millis(500);
/// Base delay between two revealed steps.
pub const STEP_COOLDOWN: Duration = Duration::from_millis(500);
/// Upper bound on the simulated time of a headless run.
pub const MAX_HEADLESS_TIME: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealPhase {
    Idle,
    Detect,
    LeadIn,
    StepThrough,
    Linger,
    MergeCommit,
    Done,
}

/// Sound cues the reveal asks for; the caller decides whether to play them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevealCue {
    /// A card inside the matched range was revealed.
    Point,
    /// The merged card is on display.
    Advance,
}

#[derive(Clone, Debug)]
pub struct ComboReveal {
    phase: RevealPhase,
    found: Option<ProgramAdvanceMatch>,
    advance: Option<CardRef>,
    lead_in: Timer,
    cooldown: Duration,
    step_index: usize,
    advance_cued: bool,
    merges: usize,
}

impl Default for ComboReveal {
    fn default() -> Self {
        Self::new()
    }
}

impl ComboReveal {
    pub fn new() -> Self {
        Self {
            phase: RevealPhase::Idle,
            found: None,
            advance: None,
            lead_in: Timer::new(),
            cooldown: STEP_COOLDOWN,
            step_index: 0,
            advance_cued: false,
            merges: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == RevealPhase::Done
    }

    pub fn found(&self) -> Option<ProgramAdvanceMatch> {
        self.found
    }

    pub fn advance_card(&self) -> Option<&CardRef> {
        self.advance.as_ref()
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn lead_in_elapsed(&self) -> Duration {
        self.lead_in.elapsed()
    }

    /// How many times the merge was committed; at most once per reset.
    pub fn merges(&self) -> usize {
        self.merges
    }

    /// Advances the reveal by `elapsed`, mutating `cards` when the merge commits.
    pub fn simulate(&mut self, elapsed: Duration, cards: &mut CardList, recipes: &ProgramAdvance) -> Option<RevealCue> {
        self.lead_in.update(elapsed);

        match self.phase {
            RevealPhase::Idle => {
                self.phase = RevealPhase::Detect;
                self.detect(cards, recipes);
                None
            }
            RevealPhase::Detect => {
                self.detect(cards, recipes);
                None
            }
            RevealPhase::LeadIn => {
                if self.lead_in.elapsed() > PA_LEAD_IN {
                    self.phase = RevealPhase::StepThrough;
                }
                None
            }
            RevealPhase::StepThrough | RevealPhase::Linger => {
                if !self.cooldown.is_zero() {
                    self.cooldown = self.cooldown.saturating_sub(elapsed);
                    return None;
                }
                if self.step_index == cards.len() + 2 {
                    self.phase = RevealPhase::MergeCommit;
                    self.commit(cards);
                    return None;
                }
                self.step(cards.len())
            }
            RevealPhase::MergeCommit => {
                self.commit(cards);
                None
            }
            RevealPhase::Done => None,
        }
    }

    fn detect(&mut self, cards: &mut CardList, recipes: &ProgramAdvance) {
        match recipes.find_match(cards) {
            Some(found) => {
                debug!("combo: program advance at {} over {} cards", found.start, found.steps);
                self.advance = Some(recipes.build_advance_card(&found));
                self.found = Some(found);
                self.lead_in.restart();
                self.phase = RevealPhase::LeadIn;
            }
            None => {
                *cards = filter_support_cards(cards);
                self.phase = RevealPhase::Done;
            }
        }
    }

    /// Shows the current step and picks the cooldown before the next one.
    fn step(&mut self, card_count: usize) -> Option<RevealCue> {
        let Some(found) = self.found else {
            return None;
        };
        let mut cue = None;

        if self.step_index == card_count + 1 {
            // linger on the merged card
            self.phase = RevealPhase::Linger;
            self.cooldown = STEP_COOLDOWN * 2;
            if !self.advance_cued {
                self.advance_cued = true;
                cue = Some(RevealCue::Advance);
            }
        } else {
            self.cooldown = STEP_COOLDOWN * 7 / 10;
        }

        if found.contains(self.step_index) {
            self.cooldown = STEP_COOLDOWN;
            cue = Some(RevealCue::Point);
        }

        trace!("combo: step {} cooldown {:?}", self.step_index, self.cooldown);
        self.step_index += 1;
        cue
    }

    fn commit(&mut self, cards: &mut CardList) {
        if let (Some(found), Some(advance)) = (self.found, self.advance.clone()) {
            if self.merges == 0 {
                let merged = apply_merge(cards, &found, advance);
                *cards = filter_support_cards(&merged);
                self.merges += 1;
                debug!("combo: merged into {} cards", cards.len());
            }
        }
        self.phase = RevealPhase::Done;
    }

    /// Runs a fresh reveal over `cards` with a fixed `step` until it is done
    /// and returns how long it took. `cards` ends up merged and filtered.
    pub fn simulate_headless(cards: &mut CardList, recipes: &ProgramAdvance, step: Duration) -> Result<Duration> {
        if step.is_zero() {
            bail!("headless combo simulation needs a non-zero step");
        }

        let mut reveal = Self::new();
        let mut duration = Duration::ZERO;
        while !reveal.is_done() {
            if duration > MAX_HEADLESS_TIME {
                bail!("headless combo simulation did not finish within {:?}", MAX_HEADLESS_TIME);
            }
            reveal.simulate(step, cards, recipes);
            duration += step;
        }
        Ok(duration)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use proptest::prelude::*;

    fn card(name: &str, code: char) -> CardRef {
        Rc::new(Card::new(format!("{name}-{code}"), name, code, CardProperties::default()))
    }

    fn recipes() -> ProgramAdvance {
        ProgramAdvance::new().with_recipe(Recipe::new(
            vec![RecipeStep::new("Alpha", '1'), RecipeStep::new("Beta", '2')],
            Card::new("merged", "Merged", ANY_CODE, CardProperties::default()).with_class(CardClass::ProgramAdvance),
        ))
    }

    #[test]
    fn two_step_recipe_merges_to_one_card() {
        let mut cards: CardList = vec![card("Alpha", '1'), card("Beta", '2')].into();
        let pa = recipes();
        let mut reveal = ComboReveal::new();
        let mut cues = vec![];
        let mut guard = 0;
        while !reveal.is_done() {
            cues.extend(reveal.simulate(FRAME, &mut cards, &pa));
            guard += 1;
            assert!(guard < 10_000);
        }
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].short_name, "Merged");
        assert_eq!(reveal.merges(), 1);
        assert_eq!(cues, vec![RevealCue::Point, RevealCue::Point, RevealCue::Advance]);
    }

    #[test]
    fn no_match_is_done_without_merging() {
        let original: CardList = vec![card("Beta", '2'), card("Alpha", '1')].into();
        let mut cards = original.clone();
        let mut reveal = ComboReveal::new();
        reveal.simulate(FRAME, &mut cards, &recipes());
        assert!(reveal.is_done());
        assert_eq!(reveal.merges(), 0);
        assert_eq!(reveal.found(), None);
        assert_eq!(cards, original);
    }

    #[test]
    fn lead_in_then_steps() {
        let mut cards: CardList = vec![card("Alpha", '1'), card("Beta", '2')].into();
        let pa = recipes();
        let mut reveal = ComboReveal::new();

        reveal.simulate(FRAME, &mut cards, &pa);
        assert_eq!(reveal.phase(), RevealPhase::LeadIn);

        reveal.simulate(PA_LEAD_IN, &mut cards, &pa);
        assert_eq!(reveal.phase(), RevealPhase::LeadIn);
        reveal.simulate(FRAME, &mut cards, &pa);
        assert_eq!(reveal.phase(), RevealPhase::StepThrough);

        // the initial cooldown has to drain before step 0 shows
        reveal.simulate(STEP_COOLDOWN, &mut cards, &pa);
        assert_eq!(reveal.step_index(), 0);
        assert_eq!(reveal.simulate(FRAME, &mut cards, &pa), Some(RevealCue::Point));
        assert_eq!(reveal.step_index(), 1);
    }

    #[test]
    fn headless_duration_is_deterministic() {
        let pa = recipes();
        let hand = || -> CardList { vec![card("Gamma", '3'), card("Alpha", '1'), card("Beta", '2')].into() };

        let mut first = hand();
        let mut second = hand();
        let a = ComboReveal::simulate_headless(&mut first, &pa, FRAME).unwrap();
        let b = ComboReveal::simulate_headless(&mut second, &pa, FRAME).unwrap();
        assert_eq!(a, b);
        assert_eq!(first, second);
        assert!(a > PA_LEAD_IN);
    }

    #[test]
    fn headless_without_match_takes_one_frame() {
        let mut cards: CardList = vec![card("Gamma", '3')].into();
        let duration = ComboReveal::simulate_headless(&mut cards, &recipes(), FRAME).unwrap();
        assert_eq!(duration, FRAME);
    }

    #[test]
    fn headless_rejects_zero_step() {
        let mut cards = CardList::new();
        assert!(ComboReveal::simulate_headless(&mut cards, &recipes(), Duration::ZERO).is_err());
    }

    proptest! {
        #[test]
        fn identical_deltas_reproduce_duration(millis in 1u64..40, extra in 0usize..4) {
            let pa = recipes();
            let build = || -> CardList {
                let mut cards = vec![card("Alpha", '1'), card("Beta", '2')];
                cards.extend((0..extra).map(|_| card("Gamma", '3')));
                cards.into()
            };
            let step = Duration::from_millis(millis);
            let mut a = build();
            let mut b = build();
            prop_assert_eq!(
                ComboReveal::simulate_headless(&mut a, &pa, step).unwrap(),
                ComboReveal::simulate_headless(&mut b, &pa, step).unwrap()
            );
            prop_assert_eq!(a.len(), extra + 1);
        }
    }
}
