/// Terminal presentation of rendered RGB frames
use crossterm::{
    cursor,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    QueueableCommand,
};
use std::io::Write;
use sr3d_core::FrameBuffer;

/// Character luminosity ramp for ASCII output (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Upper half block: foreground paints the top pixel, background the bottom one
const HALF_BLOCK: char = '\u{2580}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentMode {
    /// Two pixels per cell in 24-bit color
    TrueColor,
    /// One pixel per cell, mapped onto the luminosity ramp
    Ascii,
}

/// Writes frame buffers to a terminal, starting at a given row
pub struct TerminalPresenter {
    mode: PresentMode,
    top: u16,
}

impl TerminalPresenter {
    pub fn new(mode: PresentMode, top: u16) -> Self {
        Self { mode, top }
    }

    pub fn mode(&self) -> PresentMode {
        self.mode
    }

    /// Largest frame that fits `columns` x `rows` cells and looks square.
    ///
    /// Cells are about twice as tall as wide: half blocks give square pixels,
    /// ASCII cells need twice as many columns as rows.
    pub fn frame_size(&self, columns: u16, rows: u16) -> (usize, usize) {
        let (columns, rows) = (columns as usize, rows.saturating_sub(self.top) as usize);
        match self.mode {
            PresentMode::TrueColor => {
                let side = columns.min(rows * 2);
                (side, side)
            }
            PresentMode::Ascii => {
                let height = rows.min(columns / 2);
                (height * 2, height)
            }
        }
    }

    pub fn draw<W: Write>(&self, frame: &FrameBuffer, writer: &mut W) -> std::io::Result<()> {
        match self.mode {
            PresentMode::TrueColor => self.draw_truecolor(frame, writer),
            PresentMode::Ascii => self.draw_ascii(frame, writer),
        }
    }

    fn draw_truecolor<W: Write>(&self, frame: &FrameBuffer, writer: &mut W) -> std::io::Result<()> {
        for row in 0..frame.height().div_ceil(2) {
            writer.queue(cursor::MoveTo(0, self.top + row as u16))?;
            for x in 0..frame.width() {
                let top = frame.get(x, row * 2).unwrap_or_default();
                let bottom = frame.get(x, row * 2 + 1).unwrap_or_default();
                writer.queue(SetForegroundColor(rgb(top)))?;
                writer.queue(SetBackgroundColor(rgb(bottom)))?;
                writer.queue(Print(HALF_BLOCK))?;
            }
            writer.queue(ResetColor)?;
        }
        Ok(())
    }

    fn draw_ascii<W: Write>(&self, frame: &FrameBuffer, writer: &mut W) -> std::io::Result<()> {
        for y in 0..frame.height() {
            writer.queue(cursor::MoveTo(0, self.top + y as u16))?;
            for x in 0..frame.width() {
                let c = ramp_char(frame.get(x, y).unwrap_or_default());

                // Color based on character intensity
                let color = match c {
                    ' ' | '.' | ':' => Color::DarkGrey,
                    '-' | '=' => Color::Grey,
                    _ => Color::White,
                };

                writer.queue(SetForegroundColor(color))?;
                writer.queue(Print(c))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

fn rgb(color: sr3d_core::Color) -> Color {
    Color::Rgb {
        r: color.r,
        g: color.g,
        b: color.b,
    }
}

/// Ramp character for the luminance of `color`
pub fn ramp_char(color: sr3d_core::Color) -> char {
    let level = color.luminance().clamp(0.0, 1.0);
    let index = (level * (LUMINOSITY_RAMP.len() - 1) as f32).round() as usize;
    LUMINOSITY_RAMP[index]
}
