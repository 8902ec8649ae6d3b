//! ANSI cursor operations (spec.md §4.10), thin wrappers over `crossterm`'s
//! terminal commands — mirrors the teacher's direct `crossterm::execute!`
//! usage rather than going through a heavier TUI framework, since scripts
//! only need line-level control, not a full widget tree.

use crossterm::cursor::MoveTo;
use crossterm::terminal::{Clear, ClearType};
use crossterm::{execute, QueueableCommand};
use std::io::{self, Write};

pub struct CursorOps;

impl CursorOps {
    pub fn clear_line() -> io::Result<()> {
        let mut out = io::stdout();
        execute!(out, Clear(ClearType::CurrentLine))?;
        out.flush()
    }

    pub fn clear_lines(count: u16) -> io::Result<()> {
        let mut out = io::stdout();
        for _ in 0..count {
            out.queue(Clear(ClearType::CurrentLine))?;
            out.queue(crossterm::cursor::MoveUp(1))?;
        }
        out.flush()
    }

    pub fn move_to(col: u16, row: u16) -> io::Result<()> {
        let mut out = io::stdout();
        execute!(out, MoveTo(col, row))?;
        out.flush()
    }

    /// `moveCursor(dx, dy)` (spec.md §4.10): relative movement, positive
    /// `dx`/`dy` moving right/down, negative moving left/up.
    pub fn move_cursor(dx: i32, dy: i32) -> io::Result<()> {
        let mut out = io::stdout();
        if dx > 0 {
            out.queue(crossterm::cursor::MoveRight(dx as u16))?;
        } else if dx < 0 {
            out.queue(crossterm::cursor::MoveLeft((-dx) as u16))?;
        }
        if dy > 0 {
            out.queue(crossterm::cursor::MoveDown(dy as u16))?;
        } else if dy < 0 {
            out.queue(crossterm::cursor::MoveUp((-dy) as u16))?;
        }
        out.flush()
    }

    pub fn write(text: &str) -> io::Result<()> {
        let mut out = io::stdout();
        out.write_all(text.as_bytes())?;
        out.flush()
    }
}
