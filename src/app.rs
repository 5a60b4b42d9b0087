use std::path::PathBuf;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use eframe::egui;
use egui::{Color32, RichText, TextureHandle, TextureOptions};
use image::RgbaImage;

use crate::io::{self, LoadedImage};
use crate::ops::{ai, diff, ela};
use crate::settings::AppSettings;
use crate::viewer::{self, ComputePhase, ViewerInput};
use crate::viewport::{
    CompareMode, MAX_BLINK_PERIOD_MS, MIN_BLINK_PERIOD_MS, MIN_ZOOM, ViewportState,
};
use crate::{log_err, log_info, log_warn};

// ============================================================================
// ASYNC COMPUTE PIPELINE — background diff/ELA with channel completion
// ============================================================================

/// Which comparison slot an image or result belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    A,
    B,
}

impl Slot {
    fn label(self) -> &'static str {
        match self {
            Slot::A => "A",
            Slot::B => "B",
        }
    }
}

/// Result delivered from a background compute job. Results carrying a token
/// older than the app's current one belong to a superseded (mode, A, B)
/// triple and are discarded on receipt.
enum ComputeResult {
    Diff {
        token: u64,
        result: Result<RgbaImage, String>,
    },
    Ela {
        token: u64,
        slot: Slot,
        result: Result<RgbaImage, String>,
    },
}

/// Result delivered from a background image-load job.
enum IoResult {
    Loaded { slot: Slot, image: Box<LoadedImage> },
    LoadFailed { slot: Slot, error: String },
}

/// Result delivered from the AI worker thread.
enum AiResult {
    Analysis(Result<String, String>),
    Edit(Result<RgbaImage, String>),
}

/// A loaded comparison input plus its GPU-side texture (uploaded lazily).
struct ImageSlot {
    loaded: LoadedImage,
    texture: Option<TextureHandle>,
}

/// A computed output raster: the pixels (kept for clipboard/save export)
/// and the texture the viewer draws. Dropped as a unit when superseded.
struct ComputedRaster {
    image: RgbaImage,
    texture: TextureHandle,
}

pub struct CompareApp {
    settings: AppSettings,

    // Comparison inputs
    slot_a: Option<ImageSlot>,
    slot_b: Option<ImageSlot>,

    // Mode controller + shared view state
    mode: CompareMode,
    viewport: ViewportState,

    // Async compute pipeline (difference / ELA)
    compute_sender: mpsc::Sender<ComputeResult>,
    compute_receiver: mpsc::Receiver<ComputeResult>,
    /// Bumped whenever (mode, imageA, imageB) changes; stale results are
    /// dropped when their token no longer matches.
    compute_token: u64,
    /// Number of compute jobs in flight for the *current* token.
    pending_compute_jobs: usize,

    diff_result: Option<ComputedRaster>,
    diff_error: Option<String>,
    ela_a_result: Option<ComputedRaster>,
    ela_b_result: Option<ComputedRaster>,
    ela_error: Option<String>,

    // Async IO pipeline (background image decode)
    io_sender: mpsc::Sender<IoResult>,
    io_receiver: mpsc::Receiver<IoResult>,
    pending_io_ops: usize,
    load_error: Option<String>,

    // AI analyzer panel
    ai_sender: mpsc::Sender<AiResult>,
    ai_receiver: mpsc::Receiver<AiResult>,
    ai_panel_open: bool,
    ai_busy: bool,
    ai_instruction: String,
    ai_edit_target: Slot,
    ai_text: Option<String>,
    ai_error: Option<String>,
    ai_edit_result: Option<ComputedRaster>,

    // Blink timer
    last_blink_flip: Instant,

    settings_open: bool,
}

impl CompareApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings = AppSettings::load();
        if settings.dark_theme {
            cc.egui_ctx.set_visuals(egui::Visuals::dark());
        } else {
            cc.egui_ctx.set_visuals(egui::Visuals::light());
        }

        let (compute_sender, compute_receiver) = mpsc::channel();
        let (io_sender, io_receiver) = mpsc::channel();
        let (ai_sender, ai_receiver) = mpsc::channel();

        let mut viewport = ViewportState::new();
        viewport.set_blink_period(settings.blink_period_ms);

        log_info!("CompareFE started");

        Self {
            settings,
            slot_a: None,
            slot_b: None,
            mode: CompareMode::Slider,
            viewport,
            compute_sender,
            compute_receiver,
            compute_token: 0,
            pending_compute_jobs: 0,
            diff_result: None,
            diff_error: None,
            ela_a_result: None,
            ela_b_result: None,
            ela_error: None,
            io_sender,
            io_receiver,
            pending_io_ops: 0,
            load_error: None,
            ai_sender,
            ai_receiver,
            ai_panel_open: false,
            ai_busy: false,
            ai_instruction: String::new(),
            ai_edit_target: Slot::A,
            ai_text: None,
            ai_error: None,
            ai_edit_result: None,
            last_blink_flip: Instant::now(),
            settings_open: false,
        }
    }

    // ------------------------------------------------------------------
    //  Mode controller
    // ------------------------------------------------------------------

    /// Switch the active comparison mode. Always resets zoom/pan, releases
    /// any computed rasters the previous mode owned, and starts the jobs
    /// the new mode needs.
    fn set_mode(&mut self, mode: CompareMode) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;
        self.viewport.on_mode_changed();
        self.invalidate_results();
        self.spawn_jobs_for_mode();
    }

    /// An input slot changed (load, swap, clear): everything derived from
    /// the old pair is stale.
    fn on_inputs_changed(&mut self) {
        self.invalidate_results();
        self.ai_text = None;
        self.ai_error = None;
        self.spawn_jobs_for_mode();
    }

    /// Release computed rasters and orphan any in-flight jobs by bumping
    /// the token they carry.
    fn invalidate_results(&mut self) {
        self.compute_token = self.compute_token.wrapping_add(1);
        self.pending_compute_jobs = 0;
        self.diff_result = None;
        self.diff_error = None;
        self.ela_a_result = None;
        self.ela_b_result = None;
        self.ela_error = None;
    }

    fn spawn_jobs_for_mode(&mut self) {
        if self.slot_a.is_none() || self.slot_b.is_none() {
            return;
        }
        match self.mode {
            CompareMode::Difference => self.spawn_diff_job(),
            CompareMode::Ela => {
                self.spawn_ela_job(Slot::A);
                self.spawn_ela_job(Slot::B);
            }
            _ => {}
        }
    }

    fn spawn_diff_job(&mut self) {
        let (Some(a), Some(b)) = (&self.slot_a, &self.slot_b) else { return };
        let pixels_a = a.loaded.pixels.clone();
        let pixels_b = b.loaded.pixels.clone();
        let token = self.compute_token;
        let sender = self.compute_sender.clone();
        self.pending_compute_jobs += 1;
        rayon::spawn(move || {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                diff::compute_difference(&pixels_a, &pixels_b).map_err(|e| e.to_string())
            }))
            .unwrap_or_else(|_| Err("difference computation panicked".to_string()));
            let _ = sender.send(ComputeResult::Diff { token, result });
        });
    }

    fn spawn_ela_job(&mut self, slot: Slot) {
        let source = match slot {
            Slot::A => &self.slot_a,
            Slot::B => &self.slot_b,
        };
        let Some(s) = source else { return };
        let pixels = s.loaded.pixels.clone();
        let quality = self.settings.ela_quality;
        let scale = self.settings.ela_scale;
        let token = self.compute_token;
        let sender = self.compute_sender.clone();
        self.pending_compute_jobs += 1;
        rayon::spawn(move || {
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                ela::compute_ela(&pixels, quality, scale).map_err(|e| e.to_string())
            }))
            .unwrap_or_else(|_| Err("ELA computation panicked".to_string()));
            let _ = sender.send(ComputeResult::Ela { token, slot, result });
        });
    }

    // ------------------------------------------------------------------
    //  Image loading
    // ------------------------------------------------------------------

    fn open_dialog(&mut self, slot: Slot) {
        let picked = rfd::FileDialog::new()
            .add_filter("Images", io::SUPPORTED_EXTENSIONS)
            .pick_file();
        if let Some(path) = picked {
            self.spawn_load_job(slot, path);
        }
    }

    fn spawn_load_job(&mut self, slot: Slot, path: PathBuf) {
        let sender = self.io_sender.clone();
        self.pending_io_ops += 1;
        self.load_error = None;
        log_info!("Loading image {} from {}", slot.label(), path.display());
        rayon::spawn(move || {
            let msg = match io::load_image(&path) {
                Ok(image) => IoResult::Loaded { slot, image: Box::new(image) },
                Err(e) => IoResult::LoadFailed { slot, error: e.to_string() },
            };
            let _ = sender.send(msg);
        });
    }

    fn install_loaded(&mut self, slot: Slot, image: LoadedImage) {
        log_info!(
            "Image {} ready: {} ({}x{}, {})",
            slot.label(),
            image.name,
            image.width,
            image.height,
            image.format
        );
        let entry = ImageSlot { loaded: image, texture: None };
        match slot {
            Slot::A => self.slot_a = Some(entry),
            Slot::B => self.slot_b = Some(entry),
        }
        self.on_inputs_changed();
    }

    /// Route dropped files: the first fills slot A if empty, otherwise B;
    /// two files at once fill both.
    fn handle_dropped_files(&mut self, dropped: Vec<egui::DroppedFile>) {
        let mut paths = dropped.into_iter().filter_map(|f| f.path);
        match (self.slot_a.is_some(), self.slot_b.is_some()) {
            (false, _) => {
                if let Some(p) = paths.next() {
                    self.spawn_load_job(Slot::A, p);
                }
                if let Some(p) = paths.next() {
                    self.spawn_load_job(Slot::B, p);
                }
            }
            (true, false) => {
                if let Some(p) = paths.next() {
                    self.spawn_load_job(Slot::B, p);
                }
            }
            // Both occupied: replace B (the "after" image changes more often).
            (true, true) => {
                if let Some(p) = paths.next() {
                    self.spawn_load_job(Slot::B, p);
                }
            }
        }
    }

    fn swap_slots(&mut self) {
        std::mem::swap(&mut self.slot_a, &mut self.slot_b);
        self.on_inputs_changed();
    }

    fn clear_slots(&mut self) {
        self.slot_a = None;
        self.slot_b = None;
        self.ai_edit_result = None;
        self.viewport = {
            let mut vp = ViewportState::new();
            vp.set_blink_period(self.settings.blink_period_ms);
            vp
        };
        self.invalidate_results();
    }

    // ------------------------------------------------------------------
    //  Channel polling
    // ------------------------------------------------------------------

    fn poll_io(&mut self) {
        while let Ok(msg) = self.io_receiver.try_recv() {
            self.pending_io_ops = self.pending_io_ops.saturating_sub(1);
            match msg {
                IoResult::Loaded { slot, image } => self.install_loaded(slot, *image),
                IoResult::LoadFailed { slot, error } => {
                    log_err!("Image {} load failed: {}", slot.label(), error);
                    self.load_error = Some(format!("Image {}: {}", slot.label(), error));
                }
            }
        }
    }

    fn poll_compute(&mut self, ctx: &egui::Context) {
        while let Ok(msg) = self.compute_receiver.try_recv() {
            match msg {
                ComputeResult::Diff { token, result } => {
                    if token != self.compute_token {
                        continue; // superseded input pair — discard
                    }
                    self.pending_compute_jobs = self.pending_compute_jobs.saturating_sub(1);
                    match result {
                        Ok(image) => {
                            self.diff_result =
                                Some(self.upload_result(ctx, "diff_result", image));
                            self.diff_error = None;
                        }
                        Err(e) => {
                            log_err!("Difference computation failed: {}", e);
                            self.diff_error = Some(e);
                        }
                    }
                }
                ComputeResult::Ela { token, slot, result } => {
                    if token != self.compute_token {
                        continue;
                    }
                    self.pending_compute_jobs = self.pending_compute_jobs.saturating_sub(1);
                    match result {
                        Ok(image) => {
                            let name = format!("ela_result_{}", slot.label());
                            let computed = self.upload_result(ctx, &name, image);
                            match slot {
                                Slot::A => self.ela_a_result = Some(computed),
                                Slot::B => self.ela_b_result = Some(computed),
                            }
                        }
                        Err(e) => {
                            log_err!("ELA computation failed for {}: {}", slot.label(), e);
                            self.ela_error = Some(e);
                        }
                    }
                }
            }
        }
    }

    fn poll_ai(&mut self, ctx: &egui::Context) {
        while let Ok(msg) = self.ai_receiver.try_recv() {
            self.ai_busy = false;
            match msg {
                AiResult::Analysis(Ok(text)) => {
                    self.ai_text = Some(text);
                    self.ai_error = None;
                }
                AiResult::Analysis(Err(e)) => {
                    log_warn!("AI analysis failed: {}", e);
                    self.ai_error = Some(e);
                }
                AiResult::Edit(Ok(image)) => {
                    self.ai_edit_result = Some(self.upload_result(ctx, "ai_edit", image));
                    self.ai_error = None;
                }
                AiResult::Edit(Err(e)) => {
                    log_warn!("AI edit failed: {}", e);
                    self.ai_error = Some(e);
                }
            }
        }
    }

    fn upload_result(
        &self,
        ctx: &egui::Context,
        name: &str,
        image: RgbaImage,
    ) -> ComputedRaster {
        let texture = upload_texture(ctx, name, &image);
        ComputedRaster { image, texture }
    }

    // ------------------------------------------------------------------
    //  AI panel actions
    // ------------------------------------------------------------------

    fn start_ai_analysis(&mut self) {
        let (Some(a), Some(b)) = (&self.slot_a, &self.slot_b) else { return };
        let key = self.settings.gemini_api_key.clone();
        let pixels_a = a.loaded.pixels.clone();
        let pixels_b = b.loaded.pixels.clone();
        let instruction = self.ai_instruction.trim().to_string();
        let sender = self.ai_sender.clone();
        self.ai_busy = true;
        self.ai_text = None;
        self.ai_error = None;
        std::thread::spawn(move || {
            let instruction = (!instruction.is_empty()).then_some(instruction);
            let result =
                ai::analyze_difference(&key, &pixels_a, &pixels_b, instruction.as_deref());
            let _ = sender.send(AiResult::Analysis(result));
        });
    }

    fn start_ai_edit(&mut self) {
        let source = match self.ai_edit_target {
            Slot::A => &self.slot_a,
            Slot::B => &self.slot_b,
        };
        let Some(s) = source else { return };
        let key = self.settings.gemini_api_key.clone();
        let pixels = s.loaded.pixels.clone();
        let instruction = self.ai_instruction.trim().to_string();
        if instruction.is_empty() {
            self.ai_error = Some("Enter an edit instruction first.".to_string());
            return;
        }
        let sender = self.ai_sender.clone();
        self.ai_busy = true;
        self.ai_error = None;
        std::thread::spawn(move || {
            let result = ai::edit_image(&key, &pixels, &instruction);
            let _ = sender.send(AiResult::Edit(result));
        });
    }

    // ------------------------------------------------------------------
    //  Clipboard export
    // ------------------------------------------------------------------

    /// The raster the active computed mode is showing, if any.
    fn active_result_image(&self) -> Option<&RgbaImage> {
        match self.mode {
            CompareMode::Difference => self.diff_result.as_ref().map(|r| &r.image),
            // ELA shows two panes; copy the A pane (the usual subject).
            CompareMode::Ela => self.ela_a_result.as_ref().map(|r| &r.image),
            _ => None,
        }
    }

    fn copy_result_to_clipboard(&mut self) {
        let Some(img) = self.active_result_image() else { return };
        let (w, h) = img.dimensions();
        let push = || -> Result<(), arboard::Error> {
            let mut clipboard = arboard::Clipboard::new()?;
            clipboard.set_image(arboard::ImageData {
                width: w as usize,
                height: h as usize,
                bytes: std::borrow::Cow::Borrowed(img.as_raw()),
            })
        };
        match push() {
            Ok(()) => log_info!("Result raster copied to clipboard ({}x{})", w, h),
            Err(e) => log_warn!("Clipboard copy failed: {}", e),
        }
    }

    fn save_result_dialog(&mut self) {
        let Some(img) = self.active_result_image().cloned() else { return };
        let picked = rfd::FileDialog::new()
            .add_filter("PNG", &["png"])
            .add_filter("JPEG", &["jpg", "jpeg"])
            .set_file_name("comparison.png")
            .save_file();
        if let Some(path) = picked {
            match io::encode_and_write(&img, &path, 90) {
                Ok(()) => log_info!("Result saved to {}", path.display()),
                Err(e) => {
                    log_err!("Result save failed: {}", e);
                    self.load_error = Some(format!("Save failed: {}", e));
                }
            }
        }
    }

    // ------------------------------------------------------------------
    //  UI sections
    // ------------------------------------------------------------------

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            if ui.button("Open A…").clicked() {
                self.open_dialog(Slot::A);
            }
            if ui.button("Open B…").clicked() {
                self.open_dialog(Slot::B);
            }
            let both = self.slot_a.is_some() && self.slot_b.is_some();
            if ui.add_enabled(both, egui::Button::new("Swap A⇄B")).clicked() {
                self.swap_slots();
            }
            if ui
                .add_enabled(
                    self.slot_a.is_some() || self.slot_b.is_some(),
                    egui::Button::new("Clear"),
                )
                .clicked()
            {
                self.clear_slots();
            }

            ui.separator();

            let mut clicked_mode = None;
            for mode in CompareMode::ALL {
                if ui
                    .selectable_label(self.mode == mode, mode.label())
                    .clicked()
                {
                    clicked_mode = Some(mode);
                }
            }
            if let Some(mode) = clicked_mode {
                self.set_mode(mode);
            }

            ui.separator();
            self.mode_controls(ui);

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.selectable_label(self.settings_open, "⚙ Settings").clicked() {
                    self.settings_open = !self.settings_open;
                }
                if ui.selectable_label(self.ai_panel_open, "✨ AI").clicked() {
                    self.ai_panel_open = !self.ai_panel_open;
                }
                if self.pending_io_ops > 0 || self.pending_compute_jobs > 0 {
                    ui.spinner();
                }
            });
        });
    }

    /// Controls that only apply to the active mode.
    fn mode_controls(&mut self, ui: &mut egui::Ui) {
        match self.mode {
            CompareMode::Overlay => {
                let mut pct = self.viewport.overlay_opacity * 100.0;
                ui.label("B opacity");
                if ui
                    .add(egui::Slider::new(&mut pct, 0.0..=100.0).suffix("%"))
                    .changed()
                {
                    self.viewport.overlay_opacity = pct / 100.0;
                }
            }
            CompareMode::Blink => {
                let mut period = self.viewport.blink_period_ms;
                ui.label(if self.viewport.blink_phase { "B" } else { "A" });
                if ui
                    .add(
                        egui::Slider::new(
                            &mut period,
                            MIN_BLINK_PERIOD_MS..=MAX_BLINK_PERIOD_MS,
                        )
                        .step_by(50.0)
                        .suffix(" ms"),
                    )
                    .changed()
                {
                    self.viewport.set_blink_period(period);
                    self.settings.blink_period_ms = period;
                    self.settings.save();
                }
            }
            CompareMode::Difference | CompareMode::Ela => {
                let has_result = self.active_result_image().is_some();
                if ui.add_enabled(has_result, egui::Button::new("Copy")).clicked() {
                    self.copy_result_to_clipboard();
                }
                if ui.add_enabled(has_result, egui::Button::new("Save…")).clicked() {
                    self.save_result_dialog();
                }
            }
            _ => {}
        }

        if self.mode.zoom_enabled() {
            ui.separator();
            if ui.button("➖").clicked() {
                self.viewport.zoom_out();
            }
            ui.label(format!("{:.0}%", self.viewport.zoom * 100.0));
            if ui.button("➕").clicked() {
                self.viewport.zoom_in();
            }
            if self.viewport.zoom > MIN_ZOOM && ui.button("Reset").clicked() {
                self.viewport.reset_view();
            }
        }
    }

    fn status_bar(&self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            for (slot, entry) in [(Slot::A, &self.slot_a), (Slot::B, &self.slot_b)] {
                match entry {
                    Some(s) => {
                        ui.label(format!(
                            "{}: {}  {}×{}  {}  {}",
                            slot.label(),
                            s.loaded.name,
                            s.loaded.width,
                            s.loaded.height,
                            s.loaded.format,
                            io::human_size(s.loaded.file_size),
                        ));
                    }
                    None => {
                        ui.label(
                            RichText::new(format!("{}: empty", slot.label()))
                                .color(Color32::from_gray(120)),
                        );
                    }
                }
                ui.separator();
            }
            if self.mode == CompareMode::Loupe {
                ui.label(format!(
                    "loupe at {}",
                    viewer::format_cursor(self.viewport.cursor_pos)
                ));
                ui.separator();
            }
            if let Some(err) = &self.load_error {
                ui.label(RichText::new(err).color(Color32::from_rgb(240, 90, 90)));
            }
        });
    }

    fn ai_panel(&mut self, ui: &mut egui::Ui) {
        ui.heading("AI Analyzer");
        ui.add_space(4.0);

        if self.settings.gemini_api_key.trim().is_empty() {
            ui.label(
                RichText::new("Set a Gemini API key in Settings to enable analysis.")
                    .color(Color32::from_gray(150)),
            );
            return;
        }

        let both = self.slot_a.is_some() && self.slot_b.is_some();
        ui.label("Instruction (empty = describe differences):");
        ui.add(
            egui::TextEdit::multiline(&mut self.ai_instruction)
                .desired_rows(3)
                .desired_width(f32::INFINITY),
        );
        ui.add_space(4.0);

        ui.horizontal(|ui| {
            if ui
                .add_enabled(both && !self.ai_busy, egui::Button::new("Analyze differences"))
                .clicked()
            {
                self.start_ai_analysis();
            }
            if self.ai_busy {
                ui.spinner();
            }
        });
        ui.horizontal(|ui| {
            let target_loaded = match self.ai_edit_target {
                Slot::A => self.slot_a.is_some(),
                Slot::B => self.slot_b.is_some(),
            };
            if ui
                .add_enabled(target_loaded && !self.ai_busy, egui::Button::new("Edit image"))
                .clicked()
            {
                self.start_ai_edit();
            }
            egui::ComboBox::from_id_source("ai_edit_target")
                .selected_text(self.ai_edit_target.label())
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.ai_edit_target, Slot::A, "A");
                    ui.selectable_value(&mut self.ai_edit_target, Slot::B, "B");
                });
        });

        if let Some(err) = &self.ai_error {
            ui.add_space(4.0);
            ui.label(RichText::new(err).color(Color32::from_rgb(240, 90, 90)));
        }

        if let Some(text) = &self.ai_text {
            ui.add_space(6.0);
            egui::ScrollArea::vertical().max_height(300.0).show(ui, |ui| {
                ui.label(text);
            });
        }

        let mut load_edit_as_b = false;
        if let Some(edit) = &self.ai_edit_result {
            ui.add_space(6.0);
            ui.label("Generated image:");
            let (w, h) = edit.image.dimensions();
            let preview_w = ui.available_width().min(260.0);
            let preview_h = preview_w * h as f32 / w.max(1) as f32;
            ui.image((edit.texture.id(), egui::vec2(preview_w, preview_h)));
            ui.horizontal(|ui| {
                if ui.button("Load as Image B").clicked() {
                    load_edit_as_b = true;
                }
            });
        }
        if load_edit_as_b {
            self.adopt_edit_as_b();
        }
    }

    /// Promote the AI-generated raster into slot B so it can be compared
    /// against the original.
    fn adopt_edit_as_b(&mut self) {
        let Some(edit) = self.ai_edit_result.take() else { return };
        let (width, height) = edit.image.dimensions();
        let loaded = LoadedImage {
            pixels: edit.image,
            width,
            height,
            name: "AI edit".to_string(),
            path: PathBuf::new(),
            file_size: 0,
            format: "generated".to_string(),
        };
        self.install_loaded(Slot::B, loaded);
    }

    fn settings_window(&mut self, ctx: &egui::Context) {
        let mut open = self.settings_open;
        let mut changed = false;
        egui::Window::new("Settings")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label("ELA re-encode quality");
                let mut quality = self.settings.ela_quality;
                if ui.add(egui::Slider::new(&mut quality, 1..=100)).changed() {
                    self.settings.ela_quality = quality;
                    changed = true;
                }
                ui.label("ELA amplification");
                let mut scale = self.settings.ela_scale;
                if ui.add(egui::Slider::new(&mut scale, 1..=100)).changed() {
                    self.settings.ela_scale = scale;
                    changed = true;
                }
                ui.separator();
                ui.label("Gemini API key");
                if ui
                    .add(egui::TextEdit::singleline(&mut self.settings.gemini_api_key).password(true))
                    .changed()
                {
                    changed = true;
                }
                ui.separator();
                if ui.checkbox(&mut self.settings.dark_theme, "Dark theme").changed() {
                    changed = true;
                    if self.settings.dark_theme {
                        ctx.set_visuals(egui::Visuals::dark());
                    } else {
                        ctx.set_visuals(egui::Visuals::light());
                    }
                }
                if let Some(path) = crate::logger::log_path() {
                    ui.separator();
                    ui.label(
                        RichText::new(format!("Log: {}", path.display()))
                            .color(Color32::from_gray(120))
                            .small(),
                    );
                }
            });
        self.settings_open = open;
        if changed {
            self.settings.save();
            // New ELA parameters apply to the next computation.
            if self.mode == CompareMode::Ela {
                self.on_inputs_changed();
            }
        }
    }

    fn central_viewer(&mut self, ui: &mut egui::Ui) {
        let (Some(a), Some(b)) = (&self.slot_a, &self.slot_b) else {
            self.drop_hint(ui);
            return;
        };
        let (Some(tex_a), Some(tex_b)) = (&a.texture, &b.texture) else {
            return; // textures upload on the next frame
        };

        let busy = self.pending_compute_jobs > 0;
        let input = ViewerInput {
            mode: self.mode,
            tex_a,
            size_a: (a.loaded.width, a.loaded.height),
            tex_b,
            size_b: (b.loaded.width, b.loaded.height),
            diff: result_phase(&self.diff_result, &self.diff_error, busy),
            ela_a: result_phase(&self.ela_a_result, &self.ela_error, busy),
            ela_b: result_phase(&self.ela_b_result, &self.ela_error, busy),
        };

        let response = viewer::show(ui, &mut self.viewport, &input);
        if response.retry_clicked {
            log_info!("Retrying {} computation", self.mode.label());
            self.invalidate_results();
            self.spawn_jobs_for_mode();
        }
    }

    fn drop_hint(&self, ui: &mut egui::Ui) {
        ui.centered_and_justified(|ui| {
            let missing = match (self.slot_a.is_some(), self.slot_b.is_some()) {
                (false, false) => "Drop two images here, or use Open A… / Open B…",
                (false, true) => "Image A missing — drop a file or use Open A…",
                (true, false) => "Image B missing — drop a file or use Open B…",
                (true, true) => "",
            };
            ui.label(RichText::new(missing).size(16.0).color(Color32::from_gray(140)));
        });
    }

    /// Flip the blink phase on its fixed period and keep the UI awake while
    /// blink mode is active.
    fn drive_blink_timer(&mut self, ctx: &egui::Context) {
        if self.mode != CompareMode::Blink {
            return;
        }
        let period = Duration::from_millis(self.viewport.blink_period_ms);
        let elapsed = self.last_blink_flip.elapsed();
        if elapsed >= period {
            self.viewport.tick_blink();
            self.last_blink_flip = Instant::now();
            ctx.request_repaint_after(period);
        } else {
            ctx.request_repaint_after(period - elapsed);
        }
    }

    fn ensure_textures(&mut self, ctx: &egui::Context) {
        for (name, entry) in [("image_a", &mut self.slot_a), ("image_b", &mut self.slot_b)] {
            if let Some(slot) = entry
                && slot.texture.is_none()
            {
                slot.texture = Some(upload_texture(ctx, name, &slot.loaded.pixels));
            }
        }
    }
}

impl eframe::App for CompareApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Poll async pipelines ---
        self.poll_io();
        self.poll_compute(ctx);
        self.poll_ai(ctx);

        // Keep polling while jobs are pending.
        if self.pending_io_ops > 0 || self.pending_compute_jobs > 0 || self.ai_busy {
            ctx.request_repaint();
        }

        self.drive_blink_timer(ctx);
        self.ensure_textures(ctx);

        // --- Dropped files ---
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if !dropped.is_empty() {
            self.handle_dropped_files(dropped);
        }

        // --- Layout ---
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ui);
        });
        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            self.status_bar(ui);
        });
        if self.ai_panel_open {
            egui::SidePanel::right("ai_panel")
                .default_width(300.0)
                .show(ctx, |ui| {
                    self.ai_panel(ui);
                });
        }
        egui::CentralPanel::default().show(ctx, |ui| {
            self.central_viewer(ui);
        });

        self.settings_window(ctx);
    }
}

/// Map a stored computation result onto the viewer's phase for this frame.
fn result_phase<'a>(
    result: &'a Option<ComputedRaster>,
    error: &'a Option<String>,
    busy: bool,
) -> ComputePhase<'a> {
    match (result, error) {
        (Some(r), _) => ComputePhase::Ready { texture: &r.texture, size: r.image.dimensions() },
        (None, Some(e)) => ComputePhase::Failed(e),
        (None, None) if busy => ComputePhase::Busy,
        _ => ComputePhase::Idle,
    }
}

/// Upload an RGBA raster as an egui texture (linear filtering).
fn upload_texture(ctx: &egui::Context, name: &str, image: &RgbaImage) -> TextureHandle {
    let size = [image.width() as usize, image.height() as usize];
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw());
    ctx.load_texture(name, color_image, TextureOptions::LINEAR)
}
