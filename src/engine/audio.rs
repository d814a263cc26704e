use std::{cell::RefCell, rc::Rc};

use log::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioType {
    TimeFreeze,
    Trap,
    PaAdvance,
    Point,
    CustomScreenOpen,
    BattleStart,
    Transform,
    Hurt,
    Deleted,
    Win,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AudioPriority {
    Lowest,
    Low,
    High,
    Highest,
}

/// Fire-and-forget sound playback.
pub trait Audio {
    fn play(&mut self, sound: AudioType, priority: AudioPriority);
}

/// Discards every sound. Used by headless peers.
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl Audio for Silent {
    fn play(&mut self, sound: AudioType, priority: AudioPriority) {
        trace!("audio: muted {sound:?} ({priority:?})");
    }
}

/// Keeps a log of everything played. The log is shared so it can be read
/// after the recorder was handed off.
#[derive(Clone, Debug, Default)]
pub struct AudioRecorder {
    played: Rc<RefCell<Vec<(AudioType, AudioPriority)>>>,
}

impl AudioRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<(AudioType, AudioPriority)> {
        self.played.borrow().clone()
    }

    pub fn count(&self, sound: AudioType) -> usize {
        self.played.borrow().iter().filter(|(s, _)| *s == sound).count()
    }
}

impl Audio for AudioRecorder {
    fn play(&mut self, sound: AudioType, priority: AudioPriority) {
        trace!("audio: {sound:?} ({priority:?})");
        self.played.borrow_mut().push((sound, priority));
    }
}
