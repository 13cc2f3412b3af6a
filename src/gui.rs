use anyhow::Result;
use customfps::{
    log_info, AdapterSelection, AdapterSnapshot, OutputRef, RenderSettings, SessionConfig, SettingsError, SettingsForm,
    StateManager, WindowMode,
};
use std::sync::Arc;

/// Shows the settings window until the user starts a session or closes it.
/// `last_error` is shown in the status line, e.g. why the previous session ended.
pub fn show_settings(
    state: Arc<StateManager>,
    snapshot: AdapterSnapshot,
    last_error: Option<String>,
) -> Result<Option<SessionConfig>> {
    let outcome: Arc<parking_lot::Mutex<Option<SessionConfig>>> = Arc::new(parking_lot::Mutex::new(None));

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([460.0, 420.0])
            .with_resizable(false)
            .with_decorations(false)
            .with_icon(load_window_icon()),
        run_and_return: true,
        ..Default::default()
    };

    let outcome_for_gui = Arc::clone(&outcome);
    eframe::run_native(
        "CustomFPS",
        native_options,
        Box::new(move |_cc| Ok(Box::new(SettingsGui::new(state, snapshot, last_error, outcome_for_gui)))),
    )
    .map_err(|e| anyhow::anyhow!("Settings window failed: {}", e))?;

    let config = outcome.lock().take();
    Ok(config)
}

/// Selection and form state, kept apart from the widgets.
struct SettingsDraft {
    snapshot: AdapterSnapshot,
    render_adapter: usize,
    output: Option<OutputRef>,
    form: SettingsForm,
}

impl SettingsDraft {
    /// Restores the last choices when the adapters are still present,
    /// otherwise picks the adapter with the most dedicated memory and the
    /// first output.
    fn restore(snapshot: AdapterSnapshot, state: &StateManager) -> Self {
        let (luid, output_name, settings) =
            state.read(|s| (s.render_adapter_luid, s.display_output.clone(), s.render_settings()));

        let render_adapter = luid
            .and_then(|luid| snapshot.find_adapter_by_luid(luid))
            .or_else(|| {
                snapshot
                    .adapters()
                    .iter()
                    .max_by_key(|a| a.dedicated_video_memory)
                    .map(|a| a.index)
            })
            .unwrap_or(0);

        let output = output_name
            .and_then(|name| snapshot.find_output_by_name(&name))
            .or_else(|| snapshot.default_output());

        Self {
            snapshot,
            render_adapter,
            output,
            form: SettingsForm::from_settings(&settings),
        }
    }

    fn build(&self) -> Result<(AdapterSelection, RenderSettings), SettingsError> {
        let settings = self.form.validate()?;
        let output = self.output.ok_or(SettingsError::NoAdapters)?;
        let selection = self.snapshot.select(self.render_adapter, output)?;
        Ok((selection, settings))
    }

    fn output_label(&self, output: OutputRef) -> String {
        self.snapshot
            .outputs()
            .find(|(r, _, _)| *r == output)
            .map(|(_, adapter, info)| format!("{} ({}) on {}", info.device_name, info.bounds.extent(), adapter.name))
            .unwrap_or_else(|| "None".to_string())
    }
}

struct SettingsGui {
    state: Arc<StateManager>,
    draft: SettingsDraft,
    status_message: Option<String>,
    outcome: Arc<parking_lot::Mutex<Option<SessionConfig>>>,
    first_frame: bool,
    dragging: bool,
    icon_texture: Option<egui::TextureHandle>,
}

impl SettingsGui {
    fn new(
        state: Arc<StateManager>,
        snapshot: AdapterSnapshot,
        last_error: Option<String>,
        outcome: Arc<parking_lot::Mutex<Option<SessionConfig>>>,
    ) -> Self {
        log_info!("Opening settings ({} adapters)", snapshot.adapters().len());

        let status_message = if snapshot.is_empty() {
            Some(SettingsError::NoAdapters.to_string())
        } else {
            last_error
        };
        let draft = SettingsDraft::restore(snapshot, &state);

        Self {
            state,
            draft,
            status_message,
            outcome,
            first_frame: true,
            dragging: false,
            icon_texture: None,
        }
    }

    fn start(&mut self, ctx: &egui::Context) {
        match self.draft.build() {
            Ok((selection, settings)) => {
                // Remembers the typed size even when borderless overrides it
                self.state.update(|s| s.remember(&selection, &settings));
                let config = SessionConfig::new(selection, &settings);

                log_info!("Start requested from settings");
                *self.outcome.lock() = Some(config);
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
            Err(e) => {
                self.status_message = Some(e.to_string());
            }
        }
    }

    fn load_icon_texture(&mut self, ctx: &egui::Context) {
        let Some(icon_file) = icon_path() else {
            return;
        };
        if let Ok(img) = image::open(&icon_file) {
            let rgba = img.to_rgba8();
            let size = [rgba.width() as usize, rgba.height() as usize];
            let pixels = rgba.as_flat_samples();
            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
            self.icon_texture = Some(ctx.load_texture("app_icon", color_image, Default::default()));
        }
    }

    fn title_bar(&mut self, ctx: &egui::Context) {
        let title_bar_height = 32.0;
        let close_button_size = egui::vec2(46.0, title_bar_height);

        egui::TopBottomPanel::top("title_bar").exact_height(title_bar_height).show(ctx, |ui| {
            ui.horizontal_centered(|ui| {
                ui.add_space(8.0);

                if let Some(ref texture) = self.icon_texture {
                    ui.add(egui::Image::new(texture).max_size(egui::vec2(20.0, 20.0)));
                    ui.add_space(8.0);
                }

                let title_response = ui.interact(
                    egui::Rect::from_min_size(ui.cursor().min, egui::vec2(ui.available_width() - close_button_size.x, title_bar_height)),
                    ui.id().with("title_bar_drag"),
                    egui::Sense::click_and_drag(),
                );

                let primary_down = ctx.input(|i| i.pointer.primary_down());
                if title_response.is_pointer_button_down_on() && primary_down {
                    self.dragging = true;
                    ctx.send_viewport_cmd(egui::ViewportCommand::StartDrag);
                } else if self.dragging {
                    self.dragging = false;
                }

                ui.label(
                    egui::RichText::new("CustomFPS - Settings")
                        .size(14.0)
                        .strong()
                        .color(egui::Color32::from_rgb(220, 220, 220))
                );

                ui.add_space(6.0);
                let version = env!("CARGO_PKG_VERSION").strip_prefix("0.").unwrap_or(env!("CARGO_PKG_VERSION"));
                ui.label(egui::RichText::new(version).size(10.0).color(egui::Color32::from_rgb(140, 140, 140)));

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let close_response = ui.add_sized(
                        close_button_size,
                        egui::Button::new(egui::RichText::new("X").size(16.0)).frame(false)
                    );
                    if close_response.clicked() {
                        log_info!("Settings closed");
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
            });
        });
    }
}

impl eframe::App for SettingsGui {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.style_mut(|style| {
            style.interaction.selectable_labels = false;
        });

        if self.first_frame {
            ctx.send_viewport_cmd(egui::ViewportCommand::Focus);
            self.load_icon_texture(ctx);
            self.first_frame = false;
        }

        self.title_bar(ctx);

        let mut start_clicked = false;
        let mut close_clicked = false;

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(10.0);

            egui::Grid::new("settings_grid")
                .num_columns(2)
                .spacing([20.0, 10.0])
                .show(ui, |ui| {
                    let draft = &mut self.draft;

                    ui.label("Render GPU:");
                    let render_text = draft
                        .snapshot
                        .adapters()
                        .get(draft.render_adapter)
                        .map(|a| a.name.clone())
                        .unwrap_or_else(|| "None".to_string());
                    egui::ComboBox::from_id_salt("render_adapter_select")
                        .selected_text(render_text)
                        .width(260.0)
                        .show_ui(ui, |ui| {
                            for adapter in draft.snapshot.adapters() {
                                let label = format!("{} ({} MB)", adapter.name, adapter.dedicated_video_memory >> 20);
                                ui.selectable_value(&mut draft.render_adapter, adapter.index, label);
                            }
                        });
                    ui.end_row();

                    ui.label("Display:");
                    let output_text = draft
                        .output
                        .map(|o| draft.output_label(o))
                        .unwrap_or_else(|| "None".to_string());
                    let mut chosen_output = None;
                    egui::ComboBox::from_id_salt("output_select")
                        .selected_text(output_text)
                        .width(260.0)
                        .show_ui(ui, |ui| {
                            for adapter in draft.snapshot.adapters() {
                                if adapter.outputs.is_empty() {
                                    continue;
                                }
                                ui.label(egui::RichText::new(&adapter.name).weak());
                                for (output_ref, _, output) in draft.snapshot.outputs().filter(|(r, _, _)| r.adapter == adapter.index) {
                                    let label = format!("  {} ({})", output.device_name, output.bounds.extent());
                                    if ui.selectable_label(draft.output == Some(output_ref), label).clicked() {
                                        chosen_output = Some(output_ref);
                                    }
                                }
                            }
                        });
                    if chosen_output.is_some() {
                        draft.output = chosen_output;
                    }
                    ui.end_row();

                    ui.label("Mode:");
                    ui.horizontal(|ui| {
                        for mode in [WindowMode::Windowed, WindowMode::Borderless] {
                            ui.radio_value(&mut draft.form.mode, mode, mode.label());
                        }
                    });
                    ui.end_row();

                    let size_editable = draft.form.mode == WindowMode::Windowed;
                    ui.label("Width:");
                    ui.add_enabled(size_editable, egui::TextEdit::singleline(&mut draft.form.width).desired_width(80.0));
                    ui.end_row();

                    ui.label("Height:");
                    ui.add_enabled(size_editable, egui::TextEdit::singleline(&mut draft.form.height).desired_width(80.0));
                    ui.end_row();

                    ui.label("Target FPS:");
                    ui.add(egui::TextEdit::singleline(&mut draft.form.fps).desired_width(80.0));
                    ui.end_row();
                });

            ui.add_space(10.0);
            if let Some(cross) = self.draft.build().ok().map(|(selection, _)| selection.cross_adapter()) {
                let text = if cross {
                    "Cross-adapter: frames are copied to the display GPU (vsync)"
                } else {
                    "Same adapter: immediate present"
                };
                ui.label(egui::RichText::new(text).size(11.0).color(egui::Color32::from_rgb(140, 140, 140)));
            }

            ui.add_space(15.0);
            ui.separator();
            ui.add_space(10.0);

            ui.horizontal(|ui| {
                let start = egui::Button::new("Start").min_size(egui::vec2(120.0, 30.0));
                if ui.add_enabled(!self.draft.snapshot.is_empty(), start).clicked() {
                    start_clicked = true;
                }
                if ui.add(egui::Button::new("Close").min_size(egui::vec2(120.0, 30.0))).clicked() {
                    close_clicked = true;
                }
            });

            ui.add_space(10.0);
            ui.label(egui::RichText::new("Esc returns here, Space pauses").size(11.0));

            if let Some(ref msg) = self.status_message {
                ui.add_space(6.0);
                ui.colored_label(egui::Color32::from_rgb(230, 120, 100), msg);
            }
        });

        if start_clicked {
            self.start(ctx);
        } else if close_clicked {
            log_info!("Settings closed");
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}

fn icon_path() -> Option<std::path::PathBuf> {
    let path = std::env::current_exe().ok()?.parent()?.join("icon.ico");
    path.exists().then_some(path)
}

fn load_window_icon() -> egui::IconData {
    if let Some(path) = icon_path() {
        if let Ok(image) = image::open(&path) {
            let rgba = image.to_rgba8();
            let (width, height) = rgba.dimensions();
            return egui::IconData {
                rgba: rgba.into_raw(),
                width,
                height,
            };
        }
    }

    // Same blue as the render window
    let mut rgba = Vec::with_capacity(32 * 32 * 4);
    for _ in 0..32 * 32 {
        rgba.extend_from_slice(&[13, 71, 161, 255]);
    }

    egui::IconData {
        rgba,
        width: 32,
        height: 32,
    }
}
