use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout},
    prelude::{Alignment, Frame},
    style::{Color, Style},
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::client::app::App;

const HELP: &str = "Enter ok  1-5 pick  f form  Space card  x shoot  z charge  c custom  arrows move  q quit";

pub fn render(app: &App, f: &mut Frame) {
    let [body, status] = {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.size());
        [rows[0], rows[1]]
    };

    let block = Block::default()
        .title("netbattle")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(Color::Gray));
    let inner = block.inner(body);
    f.render_widget(block, body);

    let mut scene = Buffer::empty(inner);
    app.local().draw(&mut scene);
    f.buffer_mut().merge(&scene);

    let battle = app.local();
    let ctx = battle.context();
    let hp = ctx.local_character().map_or(0, |c| c.health);
    let line = format!(
        "{} | HP {} vs {} | rtt {}ms | net errors {} | {}",
        battle.current_state().unwrap_or("-"),
        hp,
        ctx.remote_state.hp,
        battle.average_rtt().as_millis(),
        battle.connection_errors(),
        HELP,
    );
    f.render_widget(Paragraph::new(line).style(Style::default().fg(Color::DarkGray)), status);
}
