//! wavescope - audio waveform visualizer
//!
//! Demo shell around the `wavescope` library: a tone engine plays
//! through the default output device while a [`WaveformRenderer`]
//! draws the signal on a software surface. The egui repaint loop acts
//! as the display pump, firing the renderer's frame requests.

use eframe::egui;

use wavescope::audio::{TapConfig, ToneEngine, ToneParams, Waveform};
use wavescope::host::SurfaceHost;
use wavescope::render::{Color, StepScheduler, WaveformRenderer};
use wavescope::settings::AppSettings;

/// Surface id the scope is bound to
const SCOPE_SURFACE: &str = "scope";

/// Height reserved under the scope for the status row
const STATUS_ROW_HEIGHT: f32 = 20.0;

/// Analysis window choices offered in the UI
const WINDOW_CHOICES: [usize; 5] = [256, 512, 1024, 2048, 4096];

fn main() -> eframe::Result<()> {
    env_logger::init();
    log::info!("Starting wavescope");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 640.0])
            .with_title("wavescope"),
        ..Default::default()
    };

    eframe::run_native(
        "wavescope",
        options,
        Box::new(|cc| Ok(Box::new(ScopeApp::new(cc)))),
    )
}

/// Main application state
struct ScopeApp {
    host: SurfaceHost,
    scheduler: StepScheduler,
    renderer: WaveformRenderer,
    engine: ToneEngine,

    // UI state
    show_settings: bool,
    tone: ToneParams,
    stroke: [u8; 3],
    background: [u8; 3],
    stroke_width: f32,
    show_grid: bool,
    window_size: usize,
    smoothing: f32,

    // GPU copy of the scope surface
    texture: Option<egui::TextureHandle>,
}

impl ScopeApp {
    fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings = AppSettings::load();
        let style = settings.style();
        let tap = settings.tap_config();

        let mut host = SurfaceHost::with_scale_factor(cc.egui_ctx.pixels_per_point());
        host.insert_surface(SCOPE_SURFACE, 640.0, 360.0);

        let mut renderer = WaveformRenderer::with_tap_config(tap);
        renderer.set_style(style);
        renderer.set_event_sink(|event| log::debug!("scope event: {:?}", event));
        renderer.initialize(&mut host, SCOPE_SURFACE);

        // Prime the canvas so the panel isn't transparent before the
        // first connect.
        if let Some(surface) = host.surface(SCOPE_SURFACE) {
            if let Ok(mut canvas) = surface.lock() {
                canvas.fill(style.background);
            }
        }

        let engine = ToneEngine::new();
        engine.set_params(settings.tone_params());

        Self {
            host,
            scheduler: StepScheduler::new(),
            renderer,
            engine,
            show_settings: settings.show_settings,
            tone: settings.tone_params(),
            stroke: [style.stroke.r, style.stroke.g, style.stroke.b],
            background: [style.background.r, style.background.g, style.background.b],
            stroke_width: style.stroke_width,
            show_grid: style.show_grid,
            window_size: tap.window_size,
            smoothing: tap.smoothing_time_constant,
            texture: None,
        }
    }

    /// Push the UI's style fields into the renderer.
    fn apply_style(&mut self) {
        let mut style = *self.renderer.style();
        style.stroke_width = self.stroke_width;
        style.show_grid = self.show_grid;
        self.renderer.set_style(style);
        self.renderer.set_colors(
            Color::rgb(self.stroke[0], self.stroke[1], self.stroke[2]),
            Color::rgb(self.background[0], self.background[1], self.background[2]),
        );
    }

    /// Upload the surface pixels and draw them into `rect`.
    fn present_scope(&mut self, ui: &mut egui::Ui, rect: egui::Rect) {
        let Some(surface) = self.host.surface(SCOPE_SURFACE) else {
            return;
        };
        let (pixels, width, height) = {
            let Ok(canvas) = surface.lock() else { return };
            let (w, h) = canvas.physical_size();
            (canvas.pixels().to_vec(), w as usize, h as usize)
        };
        if width == 0 || height == 0 {
            return;
        }

        let image = egui::ColorImage::from_rgba_unmultiplied([width, height], &pixels);
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::NEAREST),
            None => {
                self.texture =
                    Some(ui.ctx()
                        .load_texture("scope", image, egui::TextureOptions::NEAREST));
            }
        }

        if let Some(texture) = &self.texture {
            let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
            ui.painter().image(texture.id(), rect, uv, egui::Color32::WHITE);
        }
    }
}

impl eframe::App for ScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint();

        // Follow the window's pixel ratio; bound surfaces rescale
        // through the resize bus.
        self.host.set_scale_factor(ctx.pixels_per_point());

        // Top panel
        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("wavescope");
                ui.separator();

                let tone_text = if self.engine.is_playing() {
                    "⏹ Stop tone"
                } else {
                    "▶ Play tone"
                };
                if ui.button(tone_text).clicked() {
                    self.engine.toggle();
                }

                ui.separator();

                if self.renderer.is_connected() {
                    let scope_text = if self.renderer.is_active() {
                        "⏸ Freeze"
                    } else {
                        "▶ Run"
                    };
                    if ui.button(scope_text).clicked() {
                        if self.renderer.is_active() {
                            self.renderer.stop(&mut self.scheduler);
                        } else {
                            self.renderer.resume(&mut self.scheduler);
                        }
                    }
                    if ui.button("Disconnect").clicked() {
                        self.renderer.disconnect(&mut self.scheduler);
                    }
                } else if ui.button("Connect scope").clicked() {
                    self.renderer.connect(&mut self.engine, &mut self.scheduler);
                }

                ui.separator();
                ui.toggle_value(&mut self.show_settings, "⚙ Settings");
                ui.separator();
                ui.label(&self.engine.status);
            });
        });

        // Settings panel
        if self.show_settings {
            egui::SidePanel::left("settings_panel")
                .min_width(220.0)
                .show(ctx, |ui| {
                    ui.heading("Tone");
                    ui.separator();

                    let mut tone_changed = false;

                    egui::ComboBox::from_label("Waveform")
                        .selected_text(self.tone.waveform.name())
                        .show_ui(ui, |ui| {
                            for waveform in Waveform::all() {
                                if ui
                                    .selectable_value(
                                        &mut self.tone.waveform,
                                        waveform,
                                        waveform.name(),
                                    )
                                    .clicked()
                                {
                                    tone_changed = true;
                                }
                            }
                        });

                    if ui
                        .add(
                            egui::Slider::new(&mut self.tone.frequency, 20.0..=2000.0)
                                .text("Frequency (Hz)")
                                .logarithmic(true),
                        )
                        .changed()
                    {
                        tone_changed = true;
                    }

                    if ui
                        .add(egui::Slider::new(&mut self.tone.volume, 0.0..=1.0).text("Volume"))
                        .changed()
                    {
                        tone_changed = true;
                    }

                    if tone_changed {
                        self.engine.set_params(self.tone);
                    }

                    ui.separator();

                    // Scope display settings
                    ui.collapsing("Display", |ui| {
                        let mut style_changed = false;

                        if ui
                            .add(
                                egui::Slider::new(&mut self.stroke_width, 0.5..=5.0)
                                    .text("Line width"),
                            )
                            .changed()
                        {
                            style_changed = true;
                        }
                        if ui.checkbox(&mut self.show_grid, "Show grid").changed() {
                            style_changed = true;
                        }

                        ui.horizontal(|ui| {
                            ui.label("Trace");
                            if ui.color_edit_button_srgb(&mut self.stroke).changed() {
                                style_changed = true;
                            }
                            ui.label("Background");
                            if ui.color_edit_button_srgb(&mut self.background).changed() {
                                style_changed = true;
                            }
                        });

                        // Presets
                        ui.horizontal(|ui| {
                            if ui.button("Green").clicked() {
                                self.stroke = [100, 255, 100];
                                self.background = [10, 20, 10];
                                style_changed = true;
                            }
                            if ui.button("Amber").clicked() {
                                self.stroke = [255, 176, 0];
                                self.background = [20, 15, 5];
                                style_changed = true;
                            }
                            if ui.button("Blue").clicked() {
                                self.stroke = [100, 150, 255];
                                self.background = [10, 10, 20];
                                style_changed = true;
                            }
                        });

                        if style_changed {
                            self.apply_style();
                        }
                    });

                    ui.separator();

                    // Analysis settings: picked up on the next connect
                    ui.collapsing("Analysis", |ui| {
                        let mut tap_changed = false;

                        egui::ComboBox::from_label("Window")
                            .selected_text(format!("{}", self.window_size))
                            .show_ui(ui, |ui| {
                                for choice in WINDOW_CHOICES {
                                    if ui
                                        .selectable_value(
                                            &mut self.window_size,
                                            choice,
                                            format!("{}", choice),
                                        )
                                        .clicked()
                                    {
                                        tap_changed = true;
                                    }
                                }
                            });

                        if ui
                            .add(
                                egui::Slider::new(&mut self.smoothing, 0.0..=0.99)
                                    .text("Smoothing"),
                            )
                            .changed()
                        {
                            tap_changed = true;
                        }

                        if tap_changed {
                            self.renderer.set_tap_config(TapConfig {
                                window_size: self.window_size,
                                smoothing_time_constant: self.smoothing,
                            });
                        }

                        if self.renderer.is_connected() {
                            ui.small("Applies after reconnecting");
                        }
                    });
                });
        }

        // Scope display
        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            let scope_size = egui::vec2(
                available.x,
                (available.y - STATUS_ROW_HEIGHT).max(0.0),
            );
            self.host
                .set_logical_size(SCOPE_SURFACE, scope_size.x, scope_size.y);

            // Display pump: fire the frame the renderer asked for.
            if let Some(frame) = self.scheduler.take_due() {
                self.renderer.on_frame(frame, &mut self.scheduler);
            }

            let (rect, _response) = ui.allocate_exact_size(scope_size, egui::Sense::hover());
            self.present_scope(ui, rect);

            ui.horizontal(|ui| {
                let (width, height) = self
                    .host
                    .surface(SCOPE_SURFACE)
                    .and_then(|s| s.lock().ok().map(|c| c.physical_size()))
                    .unwrap_or((0, 0));
                ui.small(format!(
                    "surface {}x{} @ {:.2}x",
                    width,
                    height,
                    self.host.scale_factor()
                ));
                ui.separator();
                ui.small(format!("frames {}", self.scheduler.requested()));
                ui.separator();
                ui.small(format!("taps {}", self.engine.live_tap_count()));
            });
        });
    }
}

impl Drop for ScopeApp {
    fn drop(&mut self) {
        AppSettings::from_parts(
            self.renderer.style(),
            self.renderer.tap_config(),
            self.tone,
            self.show_settings,
        )
        .save();
        log::info!("Settings saved");
    }
}
