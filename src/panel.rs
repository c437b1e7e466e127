//! Display devices.
//!
//! A [`Panel`] receives complete frames only. The scheduler draws into a back
//! buffer and presents the front buffer after a swap, so a panel never shows
//! a half-drawn frame.
//!
//! # Backends
//!
//! | Backend | Feature | Output |
//! |---------|---------|--------|
//! | [`TerminalPanel`] | default | ANSI true-color half blocks, two pixel rows per line |
//! | `SimulatorPanel` | `simulator` | SDL2 window with scaled pixels |
//!
//! Brightness is applied when a frame is presented, not when it is drawn.

use std::io::{self, Stdout, Write};

use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::Size;

use crate::error::PanelError;
use crate::frame::Frame;

/// A device that can show frames.
pub trait Panel {
    /// Pixel dimensions.
    fn size(&self) -> Size;

    /// Show a complete frame.
    fn present(
        &mut self,
        frame: &Frame,
    ) -> Result<(), PanelError>;

    /// Turn every pixel off.
    fn clear(&mut self) -> Result<(), PanelError> {
        let blank = Frame::new(self.size());
        self.present(&blank)
    }
}

/// Scale a color by `brightness` percent (clamped to 100).
pub fn apply_brightness(
    color: Rgb888,
    brightness: u8,
) -> Rgb888 {
    let pct = u16::from(brightness.min(100));
    let scale = |c: u8| ((u16::from(c) * pct + 50) / 100) as u8;
    Rgb888::new(scale(color.r()), scale(color.g()), scale(color.b()))
}

fn check_size(
    frame: &Frame,
    panel: Size,
) -> Result<(), PanelError> {
    let size = embedded_graphics::prelude::OriginDimensions::size(frame);
    if size == panel {
        Ok(())
    } else {
        Err(PanelError::SizeMismatch {
            frame_width: size.width,
            frame_height: size.height,
            panel_width: panel.width,
            panel_height: panel.height,
        })
    }
}

// =============================================================================
// Terminal
// =============================================================================

/// Upper half block: foreground paints the even row, background the odd row.
const HALF_BLOCK: char = '\u{2580}';

/// Renders frames into the terminal's alternate screen.
pub struct TerminalPanel {
    out: Stdout,
    size: Size,
    brightness: u8,
}

impl TerminalPanel {
    /// Switch to the alternate screen and hide the cursor.
    pub fn new(
        size: Size,
        brightness: u8,
    ) -> Result<Self, PanelError> {
        let mut out = io::stdout();
        execute!(out, EnterAlternateScreen, cursor::Hide, Clear(ClearType::All))?;
        Ok(Self { out, size, brightness })
    }
}

impl Panel for TerminalPanel {
    fn size(&self) -> Size { self.size }

    fn present(
        &mut self,
        frame: &Frame,
    ) -> Result<(), PanelError> {
        check_size(frame, self.size)?;

        let rows: Vec<&[Rgb888]> = frame.rows().collect();
        for (line, pair) in rows.chunks(2).enumerate() {
            queue!(self.out, cursor::MoveTo(0, line as u16))?;
            for x in 0..self.size.width as usize {
                let upper = apply_brightness(pair[0][x], self.brightness);
                let lower = pair.get(1).map_or(Rgb888::BLACK, |row| apply_brightness(row[x], self.brightness));
                queue!(
                    self.out,
                    SetForegroundColor(to_terminal(upper)),
                    SetBackgroundColor(to_terminal(lower)),
                    Print(HALF_BLOCK)
                )?;
            }
            queue!(self.out, ResetColor)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

impl Drop for TerminalPanel {
    fn drop(&mut self) {
        let _ = execute!(self.out, ResetColor, cursor::Show, LeaveAlternateScreen);
    }
}

fn to_terminal(color: Rgb888) -> Color {
    Color::Rgb {
        r: color.r(),
        g: color.g(),
        b: color.b(),
    }
}

// =============================================================================
// Simulator Window
// =============================================================================

#[cfg(feature = "simulator")]
pub use simulator::SimulatorPanel;

#[cfg(feature = "simulator")]
mod simulator {
    use embedded_graphics::pixelcolor::Rgb888;
    use embedded_graphics::prelude::*;
    use embedded_graphics_simulator::{OutputSettingsBuilder, SimulatorDisplay, SimulatorEvent, Window};

    use super::{Panel, apply_brightness, check_size};
    use crate::error::PanelError;
    use crate::frame::Frame;

    /// Pixel scale of the desktop window.
    const WINDOW_SCALE: u32 = 8;

    /// Desktop window showing the panel with enlarged LED pixels.
    pub struct SimulatorPanel {
        display: SimulatorDisplay<Rgb888>,
        window: Window,
        brightness: u8,
    }

    impl SimulatorPanel {
        pub fn new(
            size: Size,
            brightness: u8,
        ) -> Self {
            let output_settings = OutputSettingsBuilder::new().scale(WINDOW_SCALE).pixel_spacing(1).build();
            Self {
                display: SimulatorDisplay::new(size),
                window: Window::new("Departure Board", &output_settings),
                brightness,
            }
        }
    }

    impl Panel for SimulatorPanel {
        fn size(&self) -> Size { self.display.size() }

        fn present(
            &mut self,
            frame: &Frame,
        ) -> Result<(), PanelError> {
            let size = self.display.size();
            check_size(frame, size)?;

            let brightness = self.brightness;
            let pixels = frame.rows().enumerate().flat_map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .map(move |(x, &c)| Pixel(Point::new(x as i32, y as i32), apply_brightness(c, brightness)))
            });
            self.display.draw_iter(pixels).ok();
            self.window.update(&self.display);

            if self.window.events().any(|ev| matches!(ev, SimulatorEvent::Quit)) {
                return Err(PanelError::Closed);
            }
            Ok(())
        }
    }
}

// =============================================================================
// Test Support
// =============================================================================


// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use departure_board_common::colors::{AMBER, WHITE};

    #[test]
    fn test_brightness_scaling() {
        assert_eq!(apply_brightness(WHITE, 100), WHITE);
        assert_eq!(apply_brightness(WHITE, 0), Rgb888::BLACK);
        assert_eq!(apply_brightness(WHITE, 60), Rgb888::new(153, 153, 153));
        assert_eq!(apply_brightness(AMBER, 50), Rgb888::new(128, 83, 0));
    }

    #[test]
    fn test_brightness_above_100_is_clamped() {
        assert_eq!(apply_brightness(WHITE, 250), WHITE);
    }

    #[test]
    fn test_size_check() {
        let frame = Frame::new(Size::new(64, 32));
        assert!(check_size(&frame, Size::new(64, 32)).is_ok());
        let err = check_size(&frame, Size::new(32, 16)).unwrap_err();
        assert!(matches!(
            err,
            PanelError::SizeMismatch {
                frame_width: 64,
                panel_width: 32,
                ..
            }
        ));
    }
}
