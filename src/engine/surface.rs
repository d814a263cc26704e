//! Helpers for drawing battle states into a terminal buffer.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
};

use super::field::{Field, Team};

pub type Surface = Buffer;

/// Writes `text` at `(x, y)` relative to the buffer area. Text that does not
/// fit is clipped; out of range coordinates draw nothing.
pub fn draw_label(surface: &mut Surface, x: u16, y: u16, text: &str, style: Style) {
    let area = surface.area;
    if x >= area.width || y >= area.height {
        return;
    }
    let width = (area.width - x) as usize;
    surface.set_stringn(area.x + x, area.y + y, text, width, style);
}

/// Centers `text` on row `y`.
pub fn draw_banner(surface: &mut Surface, y: u16, text: &str, style: Style) {
    let len = text.chars().count() as u16;
    let x = surface.area.width.saturating_sub(len) / 2;
    draw_label(surface, x, y, text, style);
}

/// Dims the whole buffer; `opacity` is the backdrop strength in `0.0..=1.0`.
pub fn draw_backdrop(surface: &mut Surface, opacity: f32) {
    if opacity <= 0.0 {
        return;
    }
    let style = if opacity >= 0.5 {
        Style::default().add_modifier(Modifier::DIM).bg(Color::Black)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };
    let area = surface.area;
    surface.set_style(area, style);
}

const TILE_WIDTH: u16 = 6;
const TILE_HEIGHT: u16 = 2;

/// Draws the grid with every visible character, starting at row `top`.
pub fn draw_field(surface: &mut Surface, field: &Field, top: u16) {
    let area = surface.area;
    for row in 0..field.height() {
        for col in 0..field.width() {
            let x = col as u16 * TILE_WIDTH;
            let y = top + row as u16 * TILE_HEIGHT;
            let team_color = if col < field.width() / 2 { Color::Red } else { Color::Blue };
            let mut style = Style::default().fg(team_color);
            if !field.is_highlighting() {
                style = style.add_modifier(Modifier::DIM);
            }
            draw_label(surface, x, y, "[    ]", style);
        }
    }

    for character in field.characters().filter(|c| !c.hidden && !c.is_deleted()) {
        let x = (character.tile.x - 1) as u16 * TILE_WIDTH + 1;
        let y = top + (character.tile.y - 1) as u16 * TILE_HEIGHT;
        let color = match character.team {
            Team::Red => Color::LightRed,
            Team::Blue => Color::LightBlue,
        };
        let mut style = Style::default().fg(color).add_modifier(Modifier::BOLD);
        // only whoever acts during a time freeze stays lit
        if field.is_time_frozen() && !character.is_stand_in() {
            style = style.add_modifier(Modifier::DIM);
        }
        let name: String = character.name.chars().take(4).collect();
        draw_label(surface, x, y, &name, style);
        if y + 1 < area.height {
            draw_label(surface, x, y + 1, &format!("{:>4}", character.health), Style::default().fg(color));
        }
    }
}
