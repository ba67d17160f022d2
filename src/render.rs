use crate::canvas::Canvas;
use crate::color::Rgb;
use std::io::{self, Write};

/// Flattens layer canvases over a background color and writes the result as
/// `▄` cells: background carries the top pixel, foreground the bottom one.
pub struct HalfBlockPresenter {
    width: usize,
    height: usize,
    frame: Vec<(f32, f32, f32)>,
    output_buf: Vec<u8>,
}

impl HalfBlockPresenter {
    /// `width` x `height` in device pixels (rows * 2 for the height).
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            frame: vec![(0.0, 0.0, 0.0); width * height],
            output_buf: Vec::with_capacity(width * height * 25),
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.frame = vec![(0.0, 0.0, 0.0); width * height];
    }

    pub fn begin(&mut self, bg_color: Rgb) {
        let bg = (bg_color.0 as f32, bg_color.1 as f32, bg_color.2 as f32);
        self.frame.fill(bg);
    }

    /// Composites a premultiplied canvas whose top-left sits at `origin`.
    pub fn composite(&mut self, canvas: &Canvas, origin: (usize, usize)) {
        let (ox, oy) = origin;
        for y in 0..canvas.height() {
            let fy = oy + y;
            if fy >= self.height {
                break;
            }
            for x in 0..canvas.width() {
                let fx = ox + x;
                if fx >= self.width {
                    break;
                }
                let src = canvas.pixels()[y * canvas.width() + x];
                if src[3] <= 0.0 {
                    continue;
                }
                let dst = &mut self.frame[fy * self.width + fx];
                let keep = 1.0 - src[3].min(1.0);
                dst.0 = src[0] + dst.0 * keep;
                dst.1 = src[1] + dst.1 * keep;
                dst.2 = src[2] + dst.2 * keep;
            }
        }
    }

    pub fn color_at(&self, x: usize, y: usize) -> Option<Rgb> {
        if x < self.width && y < self.height {
            Some(quantize(self.frame[y * self.width + x]))
        } else {
            None
        }
    }

    pub fn present<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        self.output_buf.clear();
        self.output_buf.extend_from_slice(b"\x1b[H");

        let mut prev_top_color: Option<Rgb> = None;
        let mut prev_bot_color: Option<Rgb> = None;

        for y in (0..self.height).step_by(2) {
            for x in 0..self.width {
                let top_idx = y * self.width + x;
                let bot_idx = if y + 1 < self.height {
                    (y + 1) * self.width + x
                } else {
                    top_idx
                };

                let top_color = quantize(self.frame[top_idx]);
                let bot_color = quantize(self.frame[bot_idx]);

                if prev_top_color != Some(top_color) {
                    write!(
                        self.output_buf,
                        "\x1b[48;2;{};{};{}m",
                        top_color.0, top_color.1, top_color.2
                    )?;
                    prev_top_color = Some(top_color);
                }
                if prev_bot_color != Some(bot_color) {
                    write!(
                        self.output_buf,
                        "\x1b[38;2;{};{};{}m",
                        bot_color.0, bot_color.1, bot_color.2
                    )?;
                    prev_bot_color = Some(bot_color);
                }

                self.output_buf.extend_from_slice("▄".as_bytes());
            }
            self.output_buf.extend_from_slice(b"\x1b[0m");
            prev_top_color = None;
            prev_bot_color = None;
            if y + 2 < self.height {
                self.output_buf.extend_from_slice(b"\r\n");
            }
        }

        out.write_all(&self.output_buf)?;
        out.flush()
    }
}

fn quantize(c: (f32, f32, f32)) -> Rgb {
    (
        c.0.round().clamp(0.0, 255.0) as u8,
        c.1.round().clamp(0.0, 255.0) as u8,
        c.2.round().clamp(0.0, 255.0) as u8,
    )
}
