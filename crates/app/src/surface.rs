use std::{cell::RefCell, rc::Rc};

use pulsehz_core::{scale_from_default, Result, Surface};

/// Width of a meter lane in characters.
pub const METER_WIDTH: usize = 32;

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

/// One line of terminal text. Clones share the same line, so the host keeps
/// a handle to print while the render unit owns another to paint into.
#[derive(Debug, Clone, Default)]
pub struct TextSurface {
    line: Rc<RefCell<String>>,
}

impl TextSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.line.borrow().clone()
    }

    pub fn write(&self, text: &str) {
        self.line.borrow_mut().push_str(text);
    }
}

impl Surface for TextSurface {
    fn clear(&mut self) -> Result<()> {
        self.line.borrow_mut().clear();
        Ok(())
    }
}

/// Horizontal bar whose length follows the value across `[0, 127]`.
pub fn meter(_step: i64, value: f64, surface: &mut TextSurface) -> Result<()> {
    let filled = scale_from_default(value, [0.0, METER_WIDTH as f64])?
        .round()
        .clamp(0.0, METER_WIDTH as f64) as usize;
    surface.write(&format!(
        "[{}{}] {value:7.2}",
        "#".repeat(filled),
        " ".repeat(METER_WIDTH - filled)
    ));
    Ok(())
}

/// Sync step counter padded to six digits.
pub fn step_readout(step: i64, _value: f64, surface: &mut TextSurface) -> Result<()> {
    surface.write(&format!("SS:{step:06}"));
    Ok(())
}

pub fn fps_readout(_step: i64, value: f64, surface: &mut TextSurface) -> Result<()> {
    surface.write(&format!("FPS:{value:.2}"));
    Ok(())
}

pub fn bpm_readout(_step: i64, value: f64, surface: &mut TextSurface) -> Result<()> {
    surface.write(&format!("BPM:{value:.2}"));
    Ok(())
}

/// Four-frame ASCII spinner driven by a ramp, turning eight times per loop.
pub fn spinner(_step: i64, value: f64, surface: &mut TextSurface) -> Result<()> {
    let turns = scale_from_default(value, [1.0, (SPINNER.len() * 8) as f64])?.floor();
    let index = (turns as i64).rem_euclid(SPINNER.len() as i64) as usize;
    surface.write(&format!("[{}]", SPINNER[index]));
    Ok(())
}
