use std::path::{Path, PathBuf};
use std::time::Instant;

use eframe::egui;

use crate::composite::Feather;
use crate::error::{Error, Result};
use crate::frames::{self, Direction};
use crate::geometry::{Mapper, ViewPoint, Viewport};
use crate::session::{DisplayTarget, Session};
use crate::settings::Settings;
use crate::trace::PathTracer;

// ── Canvas interaction ──────────────────────────────────────────────────────

/// What a primary-button press on the canvas does.
#[derive(Clone, Copy, Debug, PartialEq)]
enum CanvasMode {
    /// Click shows the next frame.
    ClickToAdvance,
    /// Drag a rectangle to zoom into.
    Zoom { start: Option<ViewPoint> },
    /// Drag a freehand region to copy.
    Trace,
    /// Clicks are ignored.
    Inspect,
}

/// Used when the monitor size isn't reported.
const FALLBACK_SCREEN: (f32, f32) = (1920.0, 1080.0);

// ── App ─────────────────────────────────────────────────────────────────────

pub struct ReviewApp {
    session: Session,
    settings: Settings,
    settings_path: PathBuf,
    saved_settings: Settings,

    tracer: PathTracer,
    mode: CanvasMode,
    tools_visible: bool,

    texture: Option<(u64, egui::TextureHandle)>,
    index_input: String,
    held_scan: Option<Direction>,
    notice: Option<String>,
}

impl ReviewApp {
    pub fn new(settings_path: PathBuf, start_dir: Option<PathBuf>) -> Self {
        let settings = Settings::load(&settings_path);
        let mut app = Self {
            session: Session::default(),
            saved_settings: settings.clone(),
            settings,
            settings_path,
            tracer: PathTracer::default(),
            mode: CanvasMode::ClickToAdvance,
            tools_visible: false,
            texture: None,
            index_input: "1".to_owned(),
            held_scan: None,
            notice: None,
        };
        if let Some(dir) = start_dir.or_else(|| app.settings.last_directory.clone()) {
            app.open_directory(&dir);
        }
        app
    }

    fn report(&mut self, result: Result<()>) {
        if let Err(e) = result {
            log::error!("{}", e);
            self.notice = Some(e.to_string());
        }
    }

    fn after_load(&mut self) {
        self.index_input = self.session.navigator().index().to_string();
        self.tools_visible = self.settings.keep_tools_visible;
    }

    fn select_directory(&mut self) {
        if let Some(dir) = rfd::FileDialog::new().pick_folder() {
            self.open_directory(&dir);
        }
    }

    fn open_directory(&mut self, dir: &Path) {
        let result = self.session.open_directory(dir);
        if self.session.frames().is_some_and(|f| f.merged_dir() == dir) {
            self.settings.last_directory = Some(dir.to_path_buf());
            self.tracer.cancel();
        }
        self.after_load();
        self.report(result);
    }

    fn step(&mut self, direction: Direction) {
        let result = self.session.navigate(direction).map(|_| ());
        if result.is_err() {
            self.session.navigator_mut().stop_scan();
        }
        self.after_load();
        self.report(result);
    }

    fn go_to_input(&mut self) {
        let result = frames::parse_index(&self.index_input).and_then(|i| self.session.go_to(i));
        self.after_load();
        self.report(result);
    }

    fn process(&mut self) {
        let result = self.session.process();
        self.tools_visible = result.is_ok() || self.settings.keep_tools_visible;
        self.report(result);
    }

    fn copy_traced_area(&mut self) {
        let Some(polygon) = self.tracer.take_polygon() else {
            return;
        };
        let feather = Feather::from_settings(self.settings.feather_enabled, self.settings.feather_radius);
        let result = self.session.apply_polygon(&polygon, feather).map(|_| ());
        self.report(result);
    }

    fn save(&mut self) {
        let result = self.session.save(self.settings.backup_on_save).map(|_| ());
        if matches!(result, Ok(()) | Err(Error::Reload { .. })) {
            self.after_load();
        }
        self.report(result);
    }

    fn use_original(&mut self) {
        let result = self.session.use_original(self.settings.backup_on_use_original);
        self.after_load();
        self.report(result);
    }

    fn viewport(&self, ctx: &egui::Context) -> Viewport {
        let screen = ctx
            .input(|i| i.viewport().monitor_size)
            .map(|s| (s.x, s.y))
            .unwrap_or(FALLBACK_SCREEN);
        Viewport::from_screen(screen.0, screen.1, self.settings.canvas_zoom_percent)
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        let revision = self.session.revision();
        if matches!(self.texture, Some((r, _)) if r == revision) {
            return;
        }
        self.texture = self.session.displayed_image().map(|img| {
            let size = [img.width() as usize, img.height() as usize];
            let color_image = egui::ColorImage::from_rgb(size, img.as_raw());
            let tex = ctx.load_texture("frame", color_image, egui::TextureOptions::LINEAR);
            (revision, tex)
        });
    }

    fn poll_scan(&mut self, ctx: &egui::Context) {
        let now = Instant::now();
        let delay = self.settings.advance_delay_ms;
        if let Some(direction) = self.session.navigator_mut().poll_scan(now, delay) {
            self.step(direction);
        }
        if let Some(wait) = self.session.navigator().time_to_next_step(now) {
            ctx.request_repaint_after(wait);
        }
    }

    /// Start or stop continuous advance for a scan button held this frame.
    fn scan_button(&mut self, ui: &mut egui::Ui, label: &str, direction: Direction) {
        let held = ui
            .add(egui::Button::new(label).sense(egui::Sense::click_and_drag()))
            .is_pointer_button_down_on();
        if held && self.held_scan.is_none() {
            self.held_scan = Some(direction);
            let delay = self.settings.advance_delay_ms;
            self.session
                .navigator_mut()
                .start_scan(direction, Instant::now(), delay);
            self.step(direction);
        } else if !held && self.held_scan == Some(direction) {
            self.held_scan = None;
            self.session.navigator_mut().stop_scan();
        }
    }

    // ── Panels ──────────────────────────────────────────────────────────────

    fn left_panel(&mut self, ui: &mut egui::Ui) {
        if ui.button("Select Image Directory").clicked() {
            self.select_directory();
        }
        if let Some(frames) = self.session.frames() {
            ui.small(frames.merged_dir().display().to_string());
        }
        ui.separator();

        ui.label("Current Image Number:");
        let entry = ui.text_edit_singleline(&mut self.index_input);
        if entry.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
            self.go_to_input();
        }

        ui.label("Canvas Zoom (%)");
        let mut percent = self.settings.canvas_zoom_percent;
        let range = Viewport::MIN_PERCENT..=Viewport::MAX_PERCENT;
        if ui.add(egui::DragValue::new(&mut percent).range(range)).changed() {
            self.settings.set_canvas_zoom_percent(percent);
        }
    }

    fn nav_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            self.scan_button(ui, "Previous Scan", Direction::Backward);
            let idle = !self.session.navigator().is_scanning();
            if ui
                .add_enabled(idle, egui::Button::new("Previous Image"))
                .clicked()
            {
                self.step(Direction::Backward);
            }
            if ui
                .add_enabled(idle, egui::Button::new("Next Image"))
                .clicked()
            {
                self.step(Direction::Forward);
            }
            self.scan_button(ui, "Forward Scan", Direction::Forward);

            ui.label("Speed (ms):");
            let mut delay = self.settings.advance_delay_ms;
            if ui
                .add(egui::DragValue::new(&mut delay).range(1..=1000))
                .changed()
            {
                self.settings.set_advance_delay_ms(delay);
            }

            let (label, fraction) = self
                .session
                .progress()
                .unwrap_or_else(|| ("0/0".to_owned(), 0.0));
            ui.label(label);
            ui.add(egui::ProgressBar::new(fraction).desired_width(200.0));
        });
    }

    fn tools_panel(&mut self, ui: &mut egui::Ui) {
        if ui.button("Process Image").clicked() {
            self.process();
        }

        if self.tools_visible || self.settings.keep_tools_visible {
            ui.separator();
            let mut target = self.session.display();
            egui::ComboBox::from_label("Select Image")
                .selected_text(match target {
                    DisplayTarget::Merged => "Merged Image",
                    DisplayTarget::Original => "Original Image",
                })
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut target, DisplayTarget::Merged, "Merged Image");
                    ui.selectable_value(&mut target, DisplayTarget::Original, "Original Image");
                });
            self.session.set_display(target);

            if ui.button("Zoom").clicked() {
                self.mode = CanvasMode::Zoom { start: None };
            }
            if let Some(zoom) = self.session.zoom() {
                let origin = zoom.origin();
                ui.small(format!(
                    "{}×{} at ({}, {})",
                    zoom.width(),
                    zoom.height(),
                    origin.x,
                    origin.y
                ));
            }
            if ui.button("Reset Zoom").clicked() {
                self.session.reset_zoom();
                self.mode = CanvasMode::Inspect;
            }
            let tracing = self.mode == CanvasMode::Trace;
            if ui.selectable_label(tracing, "Trace").clicked() {
                self.mode = CanvasMode::Trace;
            }
            if ui
                .add_enabled(self.tracer.is_closed(), egui::Button::new("Copy"))
                .clicked()
            {
                self.copy_traced_area();
            }
            if ui
                .add_enabled(self.session.can_undo(), egui::Button::new("Undo"))
                .clicked()
            {
                self.session.undo();
            }

            ui.checkbox(&mut self.settings.feather_enabled, "Apply Smoothing");
            if self.settings.feather_enabled {
                ui.horizontal(|ui| {
                    ui.label("Feather Radius:");
                    let mut radius = self.settings.feather_radius;
                    if ui
                        .add(egui::DragValue::new(&mut radius).range(1..=64))
                        .changed()
                    {
                        self.settings.set_feather_radius(radius);
                    }
                });
            }

            ui.checkbox(&mut self.settings.backup_on_save, "Make Backup");
            if ui.button("Save").clicked() {
                self.save();
            }
            if ui.button("Use Original").clicked() {
                self.use_original();
            }
            ui.checkbox(
                &mut self.settings.backup_on_use_original,
                "Backup on Use Original",
            );
        }

        ui.with_layout(egui::Layout::bottom_up(egui::Align::LEFT), |ui| {
            ui.checkbox(&mut self.settings.keep_tools_visible, "Keep Tools Visible");
        });
    }

    // ── Canvas ──────────────────────────────────────────────────────────────

    fn canvas(&mut self, ui: &mut egui::Ui, viewport: Viewport) {
        let (response, painter) = ui.allocate_painter(
            egui::vec2(viewport.width, viewport.height),
            egui::Sense::click_and_drag(),
        );
        let origin = response.rect.min;
        painter.rect_filled(response.rect, 0.0, egui::Color32::WHITE);

        let Some(mapper) = self.session.mapper(viewport) else {
            return;
        };
        self.draw_frame(&painter, origin, &mapper);
        if mapper.is_zoomed() {
            painter.text(
                response.rect.right_top() + egui::vec2(-6.0, 6.0),
                egui::Align2::RIGHT_TOP,
                format!("{:.0}%", mapper.scale() * 100.0),
                egui::FontId::proportional(12.0),
                egui::Color32::RED,
            );
        }

        let to_view = |p: egui::Pos2| ViewPoint::new(p.x - origin.x, p.y - origin.y);
        let to_screen = |p: ViewPoint| origin + egui::vec2(p.x, p.y);
        let pointer = response
            .interact_pointer_pos()
            .or_else(|| ui.input(|i| i.pointer.latest_pos()))
            .map(to_view);

        match self.mode {
            CanvasMode::ClickToAdvance => {
                if response.clicked() {
                    self.step(Direction::Forward);
                }
            }
            CanvasMode::Inspect => {}
            CanvasMode::Zoom { start } => {
                if response.drag_started() {
                    self.mode = CanvasMode::Zoom { start: pointer };
                }
                if let (Some(a), Some(b)) = (start, pointer) {
                    let rect = egui::Rect::from_two_pos(to_screen(a), to_screen(b));
                    painter.rect_stroke(
                        rect,
                        0.0,
                        egui::Stroke::new(1.0, egui::Color32::RED),
                        egui::StrokeKind::Middle,
                    );
                    if response.drag_stopped() {
                        let size = self.session.pair().map_or((0, 0), |p| p.merged.dimensions());
                        if let Some(region) = mapper.zoom_region_from_drag(a, b, size) {
                            self.session.set_zoom(region);
                        }
                        self.mode = CanvasMode::Inspect;
                    }
                }
            }
            CanvasMode::Trace => {
                if response.drag_started() {
                    if let Some(p) = pointer {
                        self.tracer.begin(p);
                    }
                } else if response.dragged() {
                    if let Some(p) = pointer {
                        if self.tracer.view_points().last() != Some(&p) {
                            self.tracer.extend(p);
                        }
                    }
                }
                if response.drag_stopped() {
                    self.tracer.finish(&mapper);
                }
            }
        }

        self.draw_trace(&painter, to_screen);
    }

    fn draw_frame(&self, painter: &egui::Painter, origin: egui::Pos2, mapper: &Mapper) {
        let (Some((_, tex)), Some(pair)) = (&self.texture, self.session.pair()) else {
            return;
        };
        let (w, h) = pair.merged.dimensions();
        let (start, end) = mapper.source_rect();
        let uv = egui::Rect::from_min_max(
            egui::pos2(start.x as f32 / w as f32, start.y as f32 / h as f32),
            egui::pos2(end.x as f32 / w as f32, end.y as f32 / h as f32),
        );
        let (dw, dh) = mapper.display_size();
        let rect = egui::Rect::from_min_size(origin, egui::vec2(dw, dh));
        painter.image(tex.id(), rect, uv, egui::Color32::WHITE);
    }

    fn draw_trace(&self, painter: &egui::Painter, to_screen: impl Fn(ViewPoint) -> egui::Pos2) {
        let points = self.tracer.view_points();
        let Some(&first) = points.first() else {
            return;
        };
        let stroke = if self.tracer.is_tracing() {
            painter.circle_filled(to_screen(first), 5.0, egui::Color32::RED);
            egui::Stroke::new(1.0, egui::Color32::BLUE)
        } else {
            egui::Stroke::new(2.0, egui::Color32::YELLOW)
        };
        for pair in points.windows(2) {
            painter.line_segment([to_screen(pair[0]), to_screen(pair[1])], stroke);
        }
    }

    fn notice_window(&mut self, ctx: &egui::Context) {
        let Some(message) = self.notice.clone() else {
            return;
        };
        egui::Window::new("Error")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.label(message);
                if ui.button("OK").clicked() {
                    self.notice = None;
                }
            });
    }

    fn persist_settings(&mut self) {
        if self.settings != self.saved_settings {
            self.settings.save(&self.settings_path);
            self.saved_settings = self.settings.clone();
        }
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for ReviewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_scan(ctx);

        ctx.input(|i| {
            if i.key_pressed(egui::Key::Escape) {
                self.tracer.cancel();
            }
            if i.modifiers.ctrl && i.key_pressed(egui::Key::Z) {
                self.session.undo();
            }
        });

        self.ensure_texture(ctx);
        let viewport = self.viewport(ctx);

        egui::SidePanel::left("controls").show(ctx, |ui| self.left_panel(ui));
        egui::SidePanel::right("tools")
            .exact_width(250.0)
            .show(ctx, |ui| self.tools_panel(ui));
        egui::CentralPanel::default().show(ctx, |ui| {
            self.canvas(ui, viewport);
            self.nav_bar(ui);
        });

        self.notice_window(ctx);
        self.persist_settings();
    }
}
