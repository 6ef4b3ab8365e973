//! 2D canvas backend (wasm32 only)

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use super::{Color, DrawCommand};

/// CSS `rgba()` string for a color
pub fn css(color: Color) -> String {
    format!(
        "rgba({}, {}, {}, {:.3})",
        (color[0].clamp(0.0, 1.0) * 255.0).round() as u8,
        (color[1].clamp(0.0, 1.0) * 255.0).round() as u8,
        (color[2].clamp(0.0, 1.0) * 255.0).round() as u8,
        color[3].clamp(0.0, 1.0)
    )
}

/// Replays draw commands on a canvas
pub struct CanvasBackend {
    ctx: CanvasRenderingContext2d,
    width: f64,
    height: f64,
}

impl CanvasBackend {
    pub fn new(canvas: &HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self {
            ctx,
            width: canvas.width() as f64,
            height: canvas.height() as f64,
        })
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width;
        self.height = height;
    }

    pub fn clear(&self) {
        self.ctx.clear_rect(0.0, 0.0, self.width, self.height);
    }

    pub fn draw(&self, commands: &[DrawCommand]) -> Result<(), JsValue> {
        let ctx = &self.ctx;
        for command in commands {
            match command {
                DrawCommand::Fade { color } => {
                    ctx.set_fill_style_str(&css(*color));
                    ctx.fill_rect(0.0, 0.0, self.width, self.height);
                }
                DrawCommand::Circle {
                    center,
                    radius,
                    color,
                } => {
                    ctx.set_fill_style_str(&css(*color));
                    ctx.begin_path();
                    ctx.arc(
                        center.x as f64,
                        center.y as f64,
                        radius.max(0.0) as f64,
                        0.0,
                        std::f64::consts::TAU,
                    )?;
                    ctx.fill();
                }
                DrawCommand::Glow {
                    center,
                    radius,
                    stops,
                } => {
                    let (x, y, r) = (center.x as f64, center.y as f64, radius.max(0.0) as f64);
                    let gradient = ctx.create_radial_gradient(x, y, 0.0, x, y, r)?;
                    for (offset, color) in stops {
                        gradient.add_color_stop(*offset, &css(*color))?;
                    }
                    ctx.set_fill_style_canvas_gradient(&gradient);
                    ctx.begin_path();
                    ctx.arc(x, y, r, 0.0, std::f64::consts::TAU)?;
                    ctx.fill();
                }
                DrawCommand::Line {
                    from,
                    to,
                    width,
                    color,
                } => {
                    ctx.set_stroke_style_str(&css(*color));
                    ctx.set_line_width(*width as f64);
                    ctx.begin_path();
                    ctx.move_to(from.x as f64, from.y as f64);
                    ctx.line_to(to.x as f64, to.y as f64);
                    ctx.stroke();
                }
                DrawCommand::Glyph {
                    center,
                    glyph,
                    size,
                    rotation,
                    color,
                } => {
                    ctx.save();
                    ctx.translate(center.x as f64, center.y as f64)?;
                    ctx.rotate(rotation.to_radians() as f64)?;
                    ctx.set_font(&format!("900 {:.1}px monospace", size));
                    ctx.set_text_align("center");
                    ctx.set_text_baseline("middle");
                    ctx.set_fill_style_str(&css(*color));
                    ctx.fill_text(&glyph.to_string(), 0.0, 0.0)?;
                    ctx.restore();
                }
            }
        }
        Ok(())
    }
}
