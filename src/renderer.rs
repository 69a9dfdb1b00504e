//! Canvas 2D renderer
//!
//! Draws the playfield from a read-only view of the session state. Menu and
//! game-over screens are DOM overlays, so the canvas only ever shows the
//! field itself.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::consts::*;
use crate::ms_to_ticks;
use crate::settings::Settings;
use crate::sim::{GamePhase, SessionState};

const BACKGROUND: &str = "#0f172a";
const LANE_LINE: &str = "#1e293b";
const BLOCK_FILL: &str = "#1e3a8a";
const BLOCK_BORDER: &str = "#60a5fa";
const BLOCK_TEXT: &str = "#f8fafc";
const CATCHER_FILL: &str = "#f59e0b";
const CATCHER_BORDER: &str = "#b45309";
const BANNER_TEXT: &str = "#fbbf24";

pub struct Renderer {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        canvas.set_width(FIELD_WIDTH as u32);
        canvas.set_height(FIELD_HEIGHT as u32);
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("canvas has no 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self { canvas, ctx })
    }

    pub fn render(&self, state: &SessionState, settings: &Settings) {
        self.draw_background();

        if state.phase != GamePhase::Menu {
            self.draw_blocks(state);
            self.draw_catcher(state);
        }

        if state.banner_ticks > 0 {
            self.draw_level_banner(state, settings);
        }
        if state.flash_ticks > 0 && settings.effective_flash() {
            self.draw_mistake_flash(state);
        }
    }

    fn draw_background(&self) {
        let w = self.canvas.width() as f64;
        let h = self.canvas.height() as f64;
        self.ctx.set_fill_style_str(BACKGROUND);
        self.ctx.fill_rect(0.0, 0.0, w, h);

        // Catch lane marker
        let lane_y = (CATCHER_Y + CATCHER_HEIGHT / 2.0) as f64;
        self.ctx.set_stroke_style_str(LANE_LINE);
        self.ctx.set_line_width(2.0);
        self.ctx.begin_path();
        self.ctx.move_to(0.0, lane_y);
        self.ctx.line_to(w, lane_y);
        self.ctx.stroke();
    }

    fn draw_blocks(&self, state: &SessionState) {
        // Every answer renders identically; nothing may hint at correctness
        self.ctx.set_font("bold 22px 'Segoe UI', sans-serif");
        self.ctx.set_text_align("center");
        self.ctx.set_text_baseline("middle");
        self.ctx.set_line_width(2.0);

        for entity in state.field.iter() {
            let aabb = entity.aabb();
            let x = aabb.min.x as f64;
            let y = aabb.min.y as f64;
            let w = aabb.width() as f64;
            let h = aabb.height() as f64;

            self.ctx.set_fill_style_str(BLOCK_FILL);
            self.ctx.fill_rect(x, y, w, h);
            self.ctx.set_stroke_style_str(BLOCK_BORDER);
            self.ctx.stroke_rect(x, y, w, h);

            self.ctx.set_fill_style_str(BLOCK_TEXT);
            self.ctx
                .fill_text(
                    &entity.value.to_string(),
                    entity.pos.x as f64,
                    entity.pos.y as f64,
                )
                .ok();
        }
    }

    fn draw_catcher(&self, state: &SessionState) {
        let aabb = state.catcher.aabb();
        let x = aabb.min.x as f64;
        let y = aabb.min.y as f64;
        let w = aabb.width() as f64;
        let h = aabb.height() as f64;

        self.ctx.set_fill_style_str(CATCHER_FILL);
        self.ctx.fill_rect(x, y, w, h);
        self.ctx.set_stroke_style_str(CATCHER_BORDER);
        self.ctx.set_line_width(3.0);
        self.ctx.stroke_rect(x, y, w, h);
    }

    fn draw_level_banner(&self, state: &SessionState, settings: &Settings) {
        let total = ms_to_ticks(BANNER_MS) as f64;
        let alpha = if settings.reduced_motion {
            1.0
        } else {
            (state.banner_ticks as f64 / total).clamp(0.0, 1.0)
        };

        let cx = self.canvas.width() as f64 / 2.0;
        let cy = self.canvas.height() as f64 / 3.0;

        self.ctx.set_global_alpha(alpha);
        self.ctx.set_font("bold 48px 'Segoe UI', sans-serif");
        self.ctx.set_text_align("center");
        self.ctx.set_text_baseline("middle");
        self.ctx.set_fill_style_str(BANNER_TEXT);
        self.ctx
            .fill_text(&format!("LEVEL {}", state.level), cx, cy)
            .ok();
        self.ctx.set_global_alpha(1.0);
    }

    fn draw_mistake_flash(&self, state: &SessionState) {
        let total = ms_to_ticks(FLASH_MS) as f64;
        let alpha = (state.flash_ticks as f64 / total).clamp(0.0, 1.0) * 0.35;

        self.ctx.set_global_alpha(alpha);
        self.ctx.set_fill_style_str("#dc2626");
        self.ctx.fill_rect(
            0.0,
            0.0,
            self.canvas.width() as f64,
            self.canvas.height() as f64,
        );
        self.ctx.set_global_alpha(1.0);
    }
}
