use std::{
    rc::Rc,
    thread,
    time::{Duration, Instant},
};

use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::info;

use super::{
    autopilot::Autopilot,
    event::{Event, EventHandler},
    tui::Tui,
};
use crate::engine::{
    prelude::*,
    scene::{BattleContext, PlayerInput},
};
use crate::impls::{
    actions::builtin_actions,
    cards::{builtin_library, builtin_recipes, starter_folder},
};
use crate::net::{
    transport::{loopback_pair, LinkTransport},
    NetworkBattle,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Running,
    Quitting,
}

type Peer = NetworkBattle<LinkTransport>;

/// Two peers joined by a simulated link. The local one is shown on screen
/// and played from the keyboard unless headless; the remote one always plays
/// itself.
pub struct App {
    local: Peer,
    remote: Peer,
    local_pilot: Option<Autopilot>,
    remote_pilot: Autopilot,
    mode: Mode,
}

impl App {
    pub fn new(config: BattleConfig, chaos: ChaosConfig, headless: bool) -> Result<Self> {
        info!("app: starting peers with {chaos:?}");
        let (a, b) = loopback_pair(chaos);
        let now = Instant::now();
        let remote_config = config
            .clone()
            .with_seed(config.seed.wrapping_add(1))
            .with_navi(config.navi + 1);
        Ok(Self {
            local_pilot: headless.then(|| Autopilot::new(config.seed)),
            remote_pilot: Autopilot::new(config.seed.wrapping_add(1)),
            local: Self::peer(config, a, now)?,
            remote: Self::peer(remote_config, b, now)?,
            mode: Mode::Running,
        })
    }

    fn peer(config: BattleConfig, transport: LinkTransport, now: Instant) -> Result<Peer> {
        let library = Rc::new(builtin_library());
        let folder = starter_folder(&library);
        let ctx = BattleContext::new(
            config,
            library,
            Rc::new(builtin_recipes()),
            Rc::new(builtin_actions()),
            folder,
            Box::new(Silent),
        )?;
        Ok(NetworkBattle::new(ctx, transport, now))
    }

    pub fn local(&self) -> &Peer {
        &self.local
    }

    pub fn running(&self) -> bool {
        self.mode != Mode::Quitting
    }

    pub fn quit(&mut self) {
        self.mode = Mode::Quitting;
    }

    /// Runs the battle in the terminal until the player leaves or it ends.
    pub fn run(&mut self) -> Result<()> {
        let backend = ratatui::backend::CrosstermBackend::new(std::io::stderr());
        let terminal = ratatui::Terminal::new(backend)?;
        let mut tui = Tui::new(terminal, EventHandler::new());
        tui.enter()?;

        info!("app: entering main loop");
        let mut next_frame = Instant::now();
        while self.running() {
            tui.draw(self)?;

            next_frame += FRAME;
            while let Some(event) = tui.events.next(next_frame.saturating_duration_since(Instant::now()))? {
                if let Event::Key(key) = event {
                    self.handle_key(key);
                }
            }
            self.step(FRAME, Instant::now());
            if self.local.is_over() {
                self.quit();
            }
        }

        tui.exit()?;
        Ok(())
    }

    /// Lets both autopilots play for at most `limit`.
    pub fn run_headless(&mut self, limit: Duration) -> Result<()> {
        info!("app: running headless for up to {limit:?}");
        let started = Instant::now();
        let mut next_frame = started;
        while self.running() && started.elapsed() < limit {
            next_frame += FRAME;
            self.step(FRAME, Instant::now());
            if self.local.is_over() && self.remote.is_over() {
                self.quit();
            }
            thread::sleep(next_frame.saturating_duration_since(Instant::now()));
        }
        info!("app: {}", self.summary());
        Ok(())
    }

    /// One frame for both peers.
    pub fn step(&mut self, elapsed: Duration, now: Instant) {
        if let Some(pilot) = self.local_pilot.as_mut() {
            let input = pilot.drive(self.local.current_state(), self.local.context(), elapsed);
            *self.local.input_mut() = input;
        }
        let input = self.remote_pilot.drive(self.remote.current_state(), self.remote.context(), elapsed);
        *self.remote.input_mut() = input;

        self.local.update(elapsed, now);
        self.remote.update(elapsed, now);
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let ctrl_c = key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c');
        if ctrl_c || (self.local.is_over() && matches!(key.code, KeyCode::Char('q') | KeyCode::Esc)) {
            self.quit();
            return;
        }
        if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
            self.local.quit();
            return;
        }
        apply_key(self.local.input_mut(), key.code);
    }

    pub fn summary(&self) -> String {
        let describe = |peer: &Peer| {
            let ctx = peer.context();
            format!(
                "{} (hp {}, round {})",
                peer.current_state().unwrap_or("-"),
                ctx.local_character().map_or(0, |c| c.health),
                ctx.round
            )
        };
        format!("local {} / remote {}", describe(&self.local), describe(&self.remote))
    }
}

/// Maps a key onto this frame's input.
pub fn apply_key(input: &mut PlayerInput, code: KeyCode) {
    match code {
        KeyCode::Enter => input.confirm = true,
        KeyCode::Char(c @ '1'..='5') => input.picks.push(c as usize - '1' as usize),
        KeyCode::Char('f') => input.toggle_form = true,
        KeyCode::Char(' ') => input.use_card = true,
        KeyCode::Char('x') => input.shoot = true,
        KeyCode::Char('z') => input.charge = true,
        KeyCode::Char('c') => input.request_card_select = true,
        KeyCode::Left => input.movement = Some((-1, 0)),
        KeyCode::Right => input.movement = Some((1, 0)),
        KeyCode::Up => input.movement = Some((0, -1)),
        KeyCode::Down => input.movement = Some((0, 1)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_fill_the_frame_input() {
        let mut input = PlayerInput::default();
        for code in [KeyCode::Char('3'), KeyCode::Char('1'), KeyCode::Enter, KeyCode::Up, KeyCode::Char('z')] {
            apply_key(&mut input, code);
        }
        assert_eq!(input.picks, vec![2, 0]);
        assert!(input.confirm);
        assert_eq!(input.movement, Some((0, -1)));
        assert!(!input.use_card);
    }

    #[test]
    fn quit_key_fades_out_first() {
        let mut app = App::new(BattleConfig::default(), ChaosConfig::default(), false).unwrap();
        assert_eq!(app.local().current_state(), Some("sync"));
        app.handle_key(KeyEvent::from(KeyCode::Char('q')));
        assert_eq!(app.local().current_state(), Some("fade out"));
        assert!(app.running());
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(!app.running());
    }
}
