use crate::{
    canvas::{CanvasSession, EditCommand, GestureState, PointerEvent},
    cfg::Cfg,
    error::{Error, Result},
    navigator::{NavCommand, Navigator, Step},
    store::Point,
};
use eframe::egui;
use std::{cell::RefCell, rc::Rc, time::Duration};
use tracing::error;

pub const WINDOW_TITLE: &str = "Image Segmentation";

/// Error that ended the display loop, handed back to `main`.
pub type FatalSlot = Rc<RefCell<Option<Error>>>;

// ── Key bindings ────────────────────────────────────────────────────────────

fn edit_command(key: egui::Key) -> Option<EditCommand> {
    match key {
        egui::Key::S => Some(EditCommand::Save),
        egui::Key::C => Some(EditCommand::Clear),
        egui::Key::Q | egui::Key::Escape => Some(EditCommand::Quit),
        _ => None,
    }
}

fn nav_command(key: egui::Key) -> NavCommand {
    match key {
        egui::Key::N => NavCommand::Next,
        egui::Key::P => NavCommand::Previous,
        egui::Key::Escape => NavCommand::Exit,
        _ => NavCommand::Reopen,
    }
}

/// Closed polyline for a contour, or a dot when it has a single point.
fn contour_shape(points: Vec<egui::Pos2>, stroke: egui::Stroke) -> Option<egui::Shape> {
    match points.as_slice() {
        [] => None,
        [single] => Some(egui::Shape::circle_filled(*single, stroke.width * 0.5, stroke.color)),
        _ => Some(egui::Shape::closed_line(points, stroke)),
    }
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct SegmentApp {
    nav: Navigator,
    /// Uploaded image, tagged with the session it belongs to.
    texture: Option<(u64, egui::TextureHandle)>,
    stroke: egui::Stroke,
    poll_interval: Duration,
    fatal: FatalSlot,

    // pan & zoom, reset per session
    view_session: u64,
    pan: egui::Vec2,
    zoom: f32,
}

impl SegmentApp {
    pub fn new(nav: Navigator, cfg: &Cfg, fatal: FatalSlot) -> Self {
        let [r, g, b] = cfg.stroke.color;
        Self {
            nav,
            texture: None,
            stroke: egui::Stroke::new(cfg.stroke.width, egui::Color32::from_rgb(r, g, b)),
            poll_interval: Duration::from_millis(cfg.poll_interval_ms),
            fatal,
            view_session: 0,
            pan: egui::Vec2::ZERO,
            zoom: 1.0,
        }
    }

    fn image_size(&self) -> egui::Vec2 {
        self.nav
            .session()
            .map(|s| {
                let (w, h) = s.image_size();
                egui::vec2(w as f32, h as f32)
            })
            .unwrap_or(egui::Vec2::ZERO)
    }

    /// Convert image-space coords to screen-space
    fn image_to_screen(&self, canvas_rect: egui::Rect, img_pos: egui::Pos2) -> egui::Pos2 {
        canvas_rect.center() + self.pan + (img_pos.to_vec2() - self.image_size() * 0.5) * self.zoom
    }

    /// Convert screen-space coords to image-space
    fn screen_to_image(&self, canvas_rect: egui::Rect, screen_pos: egui::Pos2) -> egui::Pos2 {
        let rel = screen_pos - canvas_rect.center() - self.pan;
        (rel / self.zoom + self.image_size() * 0.5).to_pos2()
    }

    fn image_rect_on_screen(&self, canvas_rect: egui::Rect) -> egui::Rect {
        let top_left = self.image_to_screen(canvas_rect, egui::Pos2::ZERO);
        let bot_right = self.image_to_screen(canvas_rect, self.image_size().to_pos2());
        egui::Rect::from_min_max(top_left, bot_right)
    }

    fn to_image_point(&self, canvas_rect: egui::Rect, screen_pos: egui::Pos2) -> Option<Point> {
        let session = self.nav.session()?;
        let p = self.screen_to_image(canvas_rect, screen_pos);
        Some(Point::from_image_pos(p.x, p.y, session.image_size()))
    }

    fn reset_view_on_new_session(&mut self) {
        let id = self.nav.session_id();
        if self.view_session != id {
            self.view_session = id;
            self.pan = egui::Vec2::ZERO;
            self.zoom = 1.0;
        }
    }

    /// Uploads the image whenever a new session opened, even if the previous
    /// one ended in the same frame; drops it between sessions.
    fn sync_texture(&mut self, ctx: &egui::Context) {
        self.reset_view_on_new_session();
        let id = self.nav.session_id();
        let Some(session) = self.nav.session() else {
            self.texture = None;
            return;
        };
        if matches!(&self.texture, Some((tex_id, _)) if *tex_id == id) {
            return;
        }
        let rgba = session.image();
        let size = [rgba.width() as usize, rgba.height() as usize];
        let pixels = rgba.as_flat_samples();
        let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
        let tex = ctx.load_texture("image", color_image, egui::TextureOptions::LINEAR);
        self.texture = Some((id, tex));
    }

    fn draw_contours(&self, painter: &egui::Painter, canvas_rect: egui::Rect, session: &CanvasSession) {
        let stroke = egui::Stroke::new(self.stroke.width * self.zoom, self.stroke.color);
        for contour in session.annotations().contours() {
            let points: Vec<egui::Pos2> = contour
                .points()
                .iter()
                .map(|p| self.image_to_screen(canvas_rect, egui::pos2(p.x as f32, p.y as f32)))
                .collect();
            if let Some(shape) = contour_shape(points, stroke) {
                painter.add(shape);
            }
        }
    }

    fn fail(&mut self, ctx: &egui::Context, e: Error) {
        error!("{e}");
        *self.fatal.borrow_mut() = Some(e);
        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
    }

    /// Feeds one frame's raw input events to the navigator, in arrival order.
    fn handle_events(&mut self, events: &[egui::Event], canvas_rect: egui::Rect) -> Result<Step> {
        for event in events.iter().cloned() {
            match event {
                egui::Event::Key {
                    key,
                    pressed: true,
                    repeat: false,
                    ..
                } => {
                    if self.nav.session().is_some() {
                        if let Some(cmd) = edit_command(key) {
                            self.nav.edit(cmd)?;
                        }
                    } else if self.nav.navigate(nav_command(key))? == Step::Exit {
                        return Ok(Step::Exit);
                    }
                    self.reset_view_on_new_session();
                }
                egui::Event::PointerButton {
                    pos,
                    button: egui::PointerButton::Primary,
                    pressed,
                    ..
                } => {
                    if pressed && !canvas_rect.contains(pos) {
                        continue;
                    }
                    if let Some(p) = self.to_image_point(canvas_rect, pos) {
                        let event = if pressed {
                            PointerEvent::Down(p)
                        } else {
                            PointerEvent::Up(p)
                        };
                        self.nav.pointer(event);
                    }
                }
                egui::Event::PointerMoved(pos) => {
                    let drawing = self
                        .nav
                        .session()
                        .is_some_and(|s| s.state() == GestureState::Drawing);
                    if drawing {
                        if let Some(p) = self.to_image_point(canvas_rect, pos) {
                            self.nav.pointer(PointerEvent::Move(p));
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(Step::Continue)
    }

    fn status_line(&self) -> String {
        let ring = self.nav.ring();
        match self.nav.session() {
            Some(session) => {
                let name = session
                    .image_path()
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!(
                    "{name} ({}/{})  |  contours: {}  |  S save · C clear · Q/Esc done",
                    ring.idx() + 1,
                    ring.len(),
                    session.annotations().len()
                )
            }
            None => "Press 'n' for next image, 'p' for previous image, or 'ESC' to exit.".to_string(),
        }
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for SegmentApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync_texture(ctx);

        egui::TopBottomPanel::top("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(self.status_line());
                if let Some(msg) = self.nav.session().and_then(|s| s.status()) {
                    ui.separator();
                    ui.label(msg);
                }
                ui.separator();
                ui.label(format!("Zoom: {:.0}%", self.zoom * 100.0));
            });
        });

        let canvas_rect = egui::CentralPanel::default()
            .show(ctx, |ui| {
                let (response, painter) =
                    ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
                let canvas_rect = response.rect;

                painter.rect_filled(canvas_rect, 0.0, egui::Color32::from_gray(40));

                match (self.nav.session(), &self.texture) {
                    (Some(session), Some((_, tex))) => {
                        painter.image(
                            tex.id(),
                            self.image_rect_on_screen(canvas_rect),
                            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                            egui::Color32::WHITE,
                        );
                        self.draw_contours(&painter, canvas_rect, session);
                    }
                    _ => {
                        painter.text(
                            canvas_rect.center(),
                            egui::Align2::CENTER_CENTER,
                            "N next · P previous · Esc exit",
                            egui::FontId::proportional(24.0),
                            egui::Color32::from_gray(200),
                        );
                    }
                }

                // Handle pan (middle mouse button)
                if ctx.input(|i| i.pointer.middle_down()) {
                    self.pan += ctx.input(|i| i.pointer.delta());
                }

                // Handle zoom (scroll wheel)
                let scroll_delta = ctx.input(|i| i.smooth_scroll_delta.y);
                if scroll_delta != 0.0 && response.hovered() {
                    let zoom_factor = 1.0 + scroll_delta * 0.002;
                    let new_zoom = (self.zoom * zoom_factor).clamp(0.1, 10.0);
                    if let Some(cursor) = response.hover_pos() {
                        let cursor_rel = cursor - canvas_rect.center() - self.pan;
                        self.pan -= cursor_rel * (new_zoom / self.zoom - 1.0);
                    }
                    self.zoom = new_zoom;
                }
                canvas_rect
            })
            .inner;

        let events = ctx.input(|i| i.events.clone());
        match self.handle_events(&events, canvas_rect) {
            Ok(Step::Exit) => ctx.send_viewport_cmd(egui::ViewportCommand::Close),
            Ok(Step::Continue) => {}
            Err(e) => self.fail(ctx, e),
        }
        ctx.request_repaint_after(self.poll_interval);
    }
}
