//! Terminal view: status line plus a colored grid for 1D and 2D sessions.
//! Higher dimensions show the z=0 (and w=0) slice with a note in the header.

use std::io::Write;

use crossterm::{
    cursor::MoveTo,
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};

use cellchord_types::render::cell_color;
use cellchord_types::{Dimension, EnginePhase, SessionState, CELL_DEAD, CELL_DYING};

const ALIVE_GLYPH: &str = "██";
const DYING_GLYPH: &str = "▒▒";
const DEAD_GLYPH: &str = "··";

fn phase_label(phase: EnginePhase) -> &'static str {
    match phase {
        EnginePhase::Idle => "idle",
        EnginePhase::Running => "running",
        EnginePhase::Transitioning => "transitioning",
    }
}

/// Redraw the whole screen for the current session state.
pub fn draw(out: &mut impl Write, session: &SessionState) -> std::io::Result<()> {
    queue!(out, Clear(ClearType::All), MoveTo(0, 0))?;

    let slice_note = match session.dimension() {
        Dimension::Three => "  (z=0 slice)",
        Dimension::Four => "  (z=0 w=0 slice)",
        _ => "",
    };
    queue!(
        out,
        Print(format!(
            "cellchord  gen {:>5}  {}  {}  {}x{}{}  {} Hz  {} ms  arp {}  [{}]",
            session.generation,
            session.rules.current(),
            session.dimension(),
            session.grid_size(),
            session.grid_size(),
            slice_note,
            session.base_frequency,
            session.generation_ms,
            session.arp_mode.name(),
            phase_label(session.phase),
        )),
        MoveTo(0, 1),
        Print("space start/stop  s step  r reset  a arp  1-4 dimension  +/- size  [/] speed  q quit"),
    )?;

    let size = session.grid_size();
    let rows = if session.dimension() == Dimension::One {
        1
    } else {
        size
    };
    for y in 0..rows {
        queue!(out, MoveTo(0, (y + 3) as u16))?;
        for x in 0..size {
            let coord = [x, y, 0, 0];
            let cell = session.grid.get(coord);
            if cell == CELL_DEAD {
                queue!(out, SetForegroundColor(Color::DarkGrey), Print(DEAD_GLYPH))?;
            } else {
                let color = cell_color(coord, &session.ratios, session.dimension());
                let (r, g, b) = color.to_rgb();
                let glyph = if cell == CELL_DYING {
                    DYING_GLYPH
                } else {
                    ALIVE_GLYPH
                };
                queue!(
                    out,
                    SetForegroundColor(Color::Rgb { r, g, b }),
                    Print(glyph)
                )?;
            }
        }
    }
    queue!(
        out,
        ResetColor,
        MoveTo(0, (rows + 4) as u16),
        Print(format!(
            "{} live cells",
            session.grid.alive_count()
        ))
    )?;
    out.flush()
}
