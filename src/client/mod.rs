//! Terminal front end: two peers on a simulated link, the local one on screen.

mod app;
mod autopilot;
mod event;
mod tui;
mod ui;

pub use app::App;
