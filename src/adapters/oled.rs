//! OLED display adapter.
//!
//! [`Framebuffer`] is a 128×64 1-bpp buffer in SH1106 page order (eight
//! 128-byte pages, LSB at the top of each column). It implements the
//! embedded-graphics [`DrawTarget`] and the [`DisplayPort`] primitives on
//! top of it, so every mode renders the same way on the host and on the
//! board. On its own it is the simulation display: `flush` just counts.
//!
//! [`Sh1106`] owns a framebuffer plus an `embedded-hal` I2C bus and
//! pushes the pages to the panel on `flush`.

use core::convert::Infallible;

use embedded_graphics::image::{Image, ImageRaw};
use embedded_graphics::mono_font::ascii::{FONT_6X10, FONT_10X20};
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Circle, Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use log::{info, warn};

use crate::app::ports::{DisplayError, DisplayPort, TextAlign, TextSize};

pub const WIDTH: i32 = 128;
pub const HEIGHT: i32 = 64;
const PAGES: usize = (HEIGHT / 8) as usize;
const BUF_LEN: usize = WIDTH as usize * PAGES;

// ───────────────────────────────────────────────────────────────
// Framebuffer
// ───────────────────────────────────────────────────────────────

pub struct Framebuffer {
    buf: [u8; BUF_LEN],
    dirty: bool,
    brightness: u8,
    powered: bool,
    flushes: u32,
    /// Strings drawn since the last `clear`, in draw order.
    texts: Vec<String>,
}

impl Framebuffer {
    pub fn new() -> Self {
        Self {
            buf: [0; BUF_LEN],
            dirty: true,
            brightness: 255,
            powered: true,
            flushes: 0,
            texts: Vec::new(),
        }
    }

    pub fn pixel(&self, x: i32, y: i32) -> bool {
        if !(0..WIDTH).contains(&x) || !(0..HEIGHT).contains(&y) {
            return false;
        }
        let idx = x as usize + (y as usize / 8) * WIDTH as usize;
        self.buf[idx] & (1 << (y % 8)) != 0
    }

    pub fn lit_pixels(&self) -> u32 {
        self.buf.iter().map(|b| b.count_ones()).sum()
    }

    /// Text drawn since the last clear.
    pub fn text_log(&self) -> &[String] {
        &self.texts
    }

    pub fn page(&self, page: usize) -> &[u8] {
        let start = page * WIDTH as usize;
        &self.buf[start..start + WIDTH as usize]
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn flush_count(&self) -> u32 {
        self.flushes
    }

    fn set_pixel(&mut self, x: i32, y: i32, on: bool) {
        if !(0..WIDTH).contains(&x) || !(0..HEIGHT).contains(&y) {
            return;
        }
        let idx = x as usize + (y as usize / 8) * WIDTH as usize;
        let mask = 1u8 << (y % 8);
        if on {
            self.buf[idx] |= mask;
        } else {
            self.buf[idx] &= !mask;
        }
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, color) in pixels {
            self.set_pixel(p.x, p.y, color.is_on());
        }
        Ok(())
    }
}

fn stroke() -> PrimitiveStyle<BinaryColor> {
    PrimitiveStyle::with_stroke(BinaryColor::On, 1)
}

fn style(filled: bool) -> PrimitiveStyle<BinaryColor> {
    if filled {
        PrimitiveStyle::with_fill(BinaryColor::On)
    } else {
        stroke()
    }
}

impl DisplayPort for Framebuffer {
    fn width(&self) -> i32 {
        WIDTH
    }

    fn height(&self) -> i32 {
        HEIGHT
    }

    fn clear(&mut self) {
        self.buf.fill(0);
        self.texts.clear();
        self.dirty = true;
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32, size: TextSize, align: TextAlign) {
        let font = match size {
            TextSize::Small => &FONT_6X10,
            TextSize::Large => &FONT_10X20,
        };
        let span = text.chars().count() as i32 * size.char_width();
        let left = match align {
            TextAlign::Left => x,
            TextAlign::Center => x - span / 2,
            TextAlign::Right => x - span,
        };
        let style = MonoTextStyle::new(font, BinaryColor::On);
        let _ = Text::with_baseline(text, Point::new(left, y), style, Baseline::Top).draw(self);
        self.texts.push(text.to_owned());
        self.dirty = true;
    }

    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        let _ = Line::new(Point::new(x0, y0), Point::new(x1, y1))
            .into_styled(stroke())
            .draw(self);
        self.dirty = true;
    }

    fn draw_rect(&mut self, x: i32, y: i32, w: u32, h: u32, filled: bool) {
        let _ = Rectangle::new(Point::new(x, y), Size::new(w, h))
            .into_styled(style(filled))
            .draw(self);
        self.dirty = true;
    }

    fn draw_circle(&mut self, cx: i32, cy: i32, radius: u32, filled: bool) {
        let _ = Circle::with_center(Point::new(cx, cy), radius * 2 + 1)
            .into_styled(style(filled))
            .draw(self);
        self.dirty = true;
    }

    fn draw_bitmap(&mut self, x: i32, y: i32, w: u32, _h: u32, data: &[u8]) {
        let raw = ImageRaw::<BinaryColor>::new(data, w);
        let _ = Image::new(&raw, Point::new(x, y)).draw(self);
        self.dirty = true;
    }

    fn draw_progress_bar(&mut self, x: i32, y: i32, w: u32, h: u32, progress: f32) {
        self.draw_rect(x, y, w, h, false);
        let inner = w.saturating_sub(4);
        let fill = (inner as f32 * progress.clamp(0.0, 1.0)) as u32;
        if fill > 0 && h > 4 {
            self.draw_rect(x + 2, y + 2, fill, h - 4, true);
        }
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        self.flushes = self.flushes.wrapping_add(1);
        self.dirty = false;
        Ok(())
    }

    fn set_brightness(&mut self, level: u8) {
        self.brightness = level;
    }

    fn set_power(&mut self, on: bool) {
        self.powered = on;
    }

    fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
    }
}

// ───────────────────────────────────────────────────────────────
// SH1106 over I2C
// ───────────────────────────────────────────────────────────────

const CTRL_CMD: u8 = 0x00;
const CTRL_DATA: u8 = 0x40;
/// The controller has 132 columns of RAM; the 128-px glass starts at 2.
const COLUMN_OFFSET: u8 = 2;

const INIT_SEQUENCE: &[u8] = &[
    0xAE, // display off
    0xD5, 0x80, // clock divide
    0xA8, 0x3F, // multiplex 1/64
    0xD3, 0x00, // display offset
    0x40, // start line 0
    0xAD, 0x8B, // DC-DC on
    0xA1, // segment remap
    0xC8, // COM scan descending
    0xDA, 0x12, // COM pins
    0x81, 0xFF, // contrast
    0xD9, 0x1F, // pre-charge
    0xDB, 0x40, // VCOMH
    0xA4, // follow RAM
    0xA6, // normal, not inverted
    0xAF, // display on
];

/// SH1106 128×64 panel.
pub struct Sh1106<I2C> {
    i2c: I2C,
    address: u8,
    fb: Framebuffer,
}

impl<I2C> Sh1106<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            fb: Framebuffer::new(),
        }
    }

    /// Send the init sequence and blank the panel. A panel that does not
    /// answer here is a boot failure.
    pub fn init(&mut self) -> Result<(), DisplayError> {
        self.command(INIT_SEQUENCE)
            .map_err(|_| DisplayError::InitFailed)?;
        DisplayPort::clear(&mut self.fb);
        self.flush()?;
        info!("OLED: SH1106 ready at 0x{:02X}", self.address);
        Ok(())
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.fb
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn command(&mut self, bytes: &[u8]) -> Result<(), I2C::Error> {
        let mut frame = heapless::Vec::<u8, 32>::new();
        let _ = frame.push(CTRL_CMD);
        let _ = frame.extend_from_slice(bytes);
        self.i2c.write(self.address, &frame)
    }

    fn write_page(&mut self, page: usize) -> Result<(), I2C::Error> {
        self.command(&[
            0xB0 | page as u8,
            COLUMN_OFFSET & 0x0F,
            0x10 | (COLUMN_OFFSET >> 4),
        ])?;
        let mut data = [0u8; WIDTH as usize + 1];
        data[0] = CTRL_DATA;
        data[1..].copy_from_slice(self.fb.page(page));
        self.i2c.write(self.address, &data)
    }
}

impl<I2C> DisplayPort for Sh1106<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    fn width(&self) -> i32 {
        WIDTH
    }

    fn height(&self) -> i32 {
        HEIGHT
    }

    fn clear(&mut self) {
        DisplayPort::clear(&mut self.fb);
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32, size: TextSize, align: TextAlign) {
        self.fb.draw_text(text, x, y, size, align);
    }

    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        self.fb.draw_line(x0, y0, x1, y1);
    }

    fn draw_rect(&mut self, x: i32, y: i32, w: u32, h: u32, filled: bool) {
        self.fb.draw_rect(x, y, w, h, filled);
    }

    fn draw_circle(&mut self, cx: i32, cy: i32, radius: u32, filled: bool) {
        self.fb.draw_circle(cx, cy, radius, filled);
    }

    fn draw_bitmap(&mut self, x: i32, y: i32, w: u32, h: u32, data: &[u8]) {
        self.fb.draw_bitmap(x, y, w, h, data);
    }

    fn draw_progress_bar(&mut self, x: i32, y: i32, w: u32, h: u32, progress: f32) {
        self.fb.draw_progress_bar(x, y, w, h, progress);
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        for page in 0..PAGES {
            self.write_page(page).map_err(|_| DisplayError::BusError)?;
        }
        self.fb.flush()
    }

    fn set_brightness(&mut self, level: u8) {
        if self.command(&[0x81, level]).is_err() {
            warn!("OLED: contrast write failed");
        }
        self.fb.set_brightness(level);
    }

    fn set_power(&mut self, on: bool) {
        if self.command(&[if on { 0xAF } else { 0xAE }]).is_err() {
            warn!("OLED: power command failed");
        }
        self.fb.set_power(on);
    }

    fn is_dirty(&self) -> bool {
        self.fb.is_dirty()
    }

    fn mark_dirty(&mut self) {
        self.fb.mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingBus {
        writes: Vec<(u8, Vec<u8>)>,
        fail: bool,
    }

    #[derive(Debug)]
    struct Nak;

    impl embedded_hal::i2c::Error for Nak {
        fn kind(&self) -> embedded_hal::i2c::ErrorKind {
            embedded_hal::i2c::ErrorKind::NoAcknowledge(
                embedded_hal::i2c::NoAcknowledgeSource::Address,
            )
        }
    }

    impl embedded_hal::i2c::ErrorType for RecordingBus {
        type Error = Nak;
    }

    impl embedded_hal::i2c::I2c for RecordingBus {
        fn transaction(
            &mut self,
            address: u8,
            operations: &mut [embedded_hal::i2c::Operation<'_>],
        ) -> Result<(), Nak> {
            if self.fail {
                return Err(Nak);
            }
            for op in operations {
                if let embedded_hal::i2c::Operation::Write(bytes) = op {
                    self.writes.push((address, bytes.to_vec()));
                }
            }
            Ok(())
        }
    }

    #[test]
    fn text_alignment_and_log() {
        let mut fb = Framebuffer::new();
        fb.draw_text("AB", 64, 0, TextSize::Small, TextAlign::Center);
        assert_eq!(fb.text_log(), ["AB".to_string()]);
        // Two 6 px glyphs centred on x=64 occupy 58..70.
        assert!((58..70).any(|x| (0..10).any(|y| fb.pixel(x, y))));
        assert!(!(0..58).any(|x| (0..10).any(|y| fb.pixel(x, y))));
        DisplayPort::clear(&mut fb);
        assert!(fb.text_log().is_empty());
        assert_eq!(fb.lit_pixels(), 0);
    }

    #[test]
    fn progress_bar_fill_is_clamped() {
        let mut fb = Framebuffer::new();
        fb.draw_progress_bar(0, 0, 104, 8, 2.0);
        let full = fb.lit_pixels();
        DisplayPort::clear(&mut fb);
        fb.draw_progress_bar(0, 0, 104, 8, 1.0);
        assert_eq!(fb.lit_pixels(), full);
        DisplayPort::clear(&mut fb);
        fb.draw_progress_bar(0, 0, 104, 8, 0.0);
        assert!(fb.lit_pixels() < full);
        assert!(!fb.pixel(50, 4));
    }

    #[test]
    fn bitmap_is_msb_first() {
        let mut fb = Framebuffer::new();
        fb.draw_bitmap(0, 0, 8, 1, &[0b1000_0001]);
        assert!(fb.pixel(0, 0));
        assert!(fb.pixel(7, 0));
        assert!(!fb.pixel(1, 0));
    }

    #[test]
    fn flush_clears_dirty() {
        let mut fb = Framebuffer::new();
        fb.draw_line(0, 0, 10, 0);
        assert!(fb.is_dirty());
        fb.flush().unwrap();
        assert!(!fb.is_dirty());
        assert_eq!(fb.flush_count(), 1);
    }

    #[test]
    fn sh1106_writes_eight_pages_with_offset() {
        let mut panel = Sh1106::new(RecordingBus::default(), 0x3C);
        panel.init().unwrap();
        let bus = panel.release();
        assert_eq!(bus.writes[0].1[0], CTRL_CMD);
        assert_eq!(bus.writes[0].1[1], 0xAE);
        let data: Vec<_> = bus.writes.iter().filter(|(_, b)| b[0] == CTRL_DATA).collect();
        assert_eq!(data.len(), PAGES);
        assert!(data.iter().all(|(a, b)| *a == 0x3C && b.len() == WIDTH as usize + 1));
        assert!(bus.writes.iter().any(|(_, b)| b.as_slice() == [CTRL_CMD, 0xB0, 0x02, 0x10]));
    }

    #[test]
    fn sh1106_missing_panel_fails_init() {
        let mut panel = Sh1106::new(
            RecordingBus {
                fail: true,
                ..Default::default()
            },
            0x3C,
        );
        assert_eq!(panel.init(), Err(DisplayError::InitFailed));
        assert_eq!(panel.flush(), Err(DisplayError::BusError));
    }
}
