//! SSD1306 status display
//!
//! Lays out the view model text on a 128x64 panel: title, a separator and up to three
//! status lines. A panel that fails to initialize is logged once and then ignored, the
//! logger keeps working without it.

use datalogger_core::display::{ViewModel, TITLE};
use datalogger_core::interface::Display;
use defmt::{info, warn, Debug2Format};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::I2C1;
use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle, MonoTextStyleBuilder},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle},
    text::{Baseline, Text},
};
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::{prelude::*, I2CDisplayInterface, Ssd1306};

use crate::system::resources::DisplayResources;

const I2C_FREQUENCY_HZ: u32 = 400_000;

/// Vertical distance between two text lines
const LINE_HEIGHT: i32 = 12;

type Panel = Ssd1306<
    I2CInterface<I2c<'static, I2C1, i2c::Blocking>>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

pub struct Oled {
    panel: Panel,
    ready: bool,
    shown: Option<ViewModel>,
}

impl Oled {
    pub fn new(r: DisplayResources) -> Self {
        let mut config = i2c::Config::default();
        config.frequency = I2C_FREQUENCY_HZ;
        let bus = I2c::new_blocking(r.i2c, r.scl, r.sda, config);

        let interface = I2CDisplayInterface::new(bus);
        let mut panel = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();

        let ready = match panel.init() {
            Ok(()) => {
                info!("Display initialized");
                true
            }
            Err(e) => {
                warn!("Display init failed: {:?}", Debug2Format(&e));
                false
            }
        };

        Self {
            panel,
            ready,
            shown: None,
        }
    }

    fn draw(&mut self, view: &ViewModel) -> Result<(), <Panel as DrawTarget>::Error> {
        let style: MonoTextStyle<BinaryColor> = MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(BinaryColor::On)
            .build();

        self.panel.clear_buffer();
        Text::with_baseline(TITLE, Point::zero(), style, Baseline::Top).draw(&mut self.panel)?;
        Line::new(Point::new(0, LINE_HEIGHT - 1), Point::new(127, LINE_HEIGHT - 1))
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(&mut self.panel)?;

        for (row, line) in view.status_lines().iter().enumerate() {
            let y = LINE_HEIGHT * (row as i32 + 1) + 4;
            Text::with_baseline(line.as_str(), Point::new(0, y), style, Baseline::Top)
                .draw(&mut self.panel)?;
        }

        self.panel.flush()
    }
}

impl Display for Oled {
    fn render(&mut self, view: &ViewModel) {
        if !self.ready || self.shown.as_ref() == Some(view) {
            return;
        }
        match self.draw(view) {
            Ok(()) => self.shown = Some(*view),
            Err(e) => warn!("Display update failed: {:?}", Debug2Format(&e)),
        }
    }
}
