use std::path::{Path, PathBuf};
use std::time::Instant;

use eframe::egui::{
    self, ResizeDirection, Sense, TextureHandle, TextureOptions, ViewportCommand,
};
use log::{debug, info, warn};

use crate::config::{
    ViewerConfig, ANNOTATION_PAGE_SIZE_RANGE, GRID_PAGE_SIZE_RANGE, MAX_COLUMNS,
    MIN_COLUMNS,
};
use crate::font::LabelFont;
use crate::grid::{column_width, grid_cells, grid_rows};
use crate::labels::{default_labels_dir, display_label, sidecar_path, ClassNames};
use crate::launch::{parse_dimensions, LaunchRequest, Tool};
use crate::paginate::{page_label, total_pages};
use crate::renderer::{
    render_annotated, render_plain, to_color_image, Transform, PLACEHOLDER_FILL,
};
use crate::scan::{file_name_of, scan, sort_paths, MediaKind};
use crate::session::Session;
use crate::video::{extract_frame, format_elapsed, read_video_info, VideoInfo};

const APP_TITLE: &str = "Sharingan Viewer";
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const SIDEBAR_WIDTH: f32 = 300.0;
const GRID_GAP: f32 = 6.0;

/// Text input whose value only takes effect once editing ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct CommittedField {
    text: String,
    committed: String,
}

impl CommittedField {
    fn with_path(path: Option<&Path>) -> Self {
        let value = path
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        Self {
            text: value.clone(),
            committed: value,
        }
    }

    /// Returns true when the committed value changed.
    fn commit(&mut self) -> bool {
        let trimmed = self.text.trim();
        if trimmed == self.committed {
            return false;
        }
        self.committed = trimmed.to_string();
        true
    }

    fn set(&mut self, value: String) -> bool {
        self.text = value;
        self.commit()
    }

    fn value(&self) -> Option<&str> {
        (!self.committed.is_empty()).then_some(self.committed.as_str())
    }

    fn path(&self) -> Option<PathBuf> {
        self.value().map(PathBuf::from)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Picker {
    Folder,
    Yaml,
}

impl Picker {
    fn pick(self, current: &str) -> Option<PathBuf> {
        let mut dialog = rfd::FileDialog::new();
        let current = Path::new(current.trim());
        if current.is_dir() {
            dialog = dialog.set_directory(current);
        } else if let Some(parent) = current.parent().filter(|parent| parent.is_dir()) {
            dialog = dialog.set_directory(parent);
        }
        match self {
            Picker::Folder => dialog.pick_folder(),
            Picker::Yaml => dialog.add_filter("YAML", &["yaml", "yml"]).pick_file(),
        }
    }
}

fn show_path_field(
    ui: &mut egui::Ui,
    label: &str,
    field: &mut CommittedField,
    picker: Picker,
) -> bool {
    ui.label(label);
    let mut changed = false;
    ui.horizontal(|ui| {
        let row_height = ui.spacing().interact_size.y;
        let button_width = row_height * 1.6;
        let text_width =
            (ui.available_width() - button_width - ui.spacing().item_spacing.x).max(60.0);
        let response = ui.add_sized(
            [text_width, row_height],
            egui::TextEdit::singleline(&mut field.text),
        );
        if response.lost_focus() {
            changed |= field.commit();
        }
        if ui
            .add_sized([button_width, row_height], egui::Button::new("..."))
            .on_hover_text("Browse")
            .clicked()
        {
            if let Some(path) = picker.pick(&field.text) {
                changed |= field.set(path.display().to_string());
            }
        }
    });
    changed
}

fn error_label(ui: &mut egui::Ui, message: &str) {
    let color = ui.visuals().error_fg_color;
    ui.colored_label(color, message);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BrowserKind {
    Images,
    Annotations,
}

impl BrowserKind {
    fn page_size_range(self) -> (usize, usize, usize) {
        match self {
            BrowserKind::Images => GRID_PAGE_SIZE_RANGE,
            BrowserKind::Annotations => ANNOTATION_PAGE_SIZE_RANGE,
        }
    }

    fn id(self) -> &'static str {
        match self {
            BrowserKind::Images => "image-grid",
            BrowserKind::Annotations => "annotations",
        }
    }
}

struct PageTile {
    name: String,
    texture: Result<TextureHandle, String>,
}

impl PageTile {
    fn pixel_width(&self) -> Option<f32> {
        self.texture
            .as_ref()
            .ok()
            .map(|texture| texture.size_vec2().x)
    }
}

/// Paged image grid shared by the image and annotation tools.
struct Browser {
    kind: BrowserKind,
    images_dir: CommittedField,
    labels_dir: CommittedField,
    names_yaml: CommittedField,
    resize: CommittedField,
    recursive: bool,
    natural_sort: bool,
    original_width: bool,
    columns: usize,
    page_size: usize,
    paths: Vec<PathBuf>,
    names: Option<ClassNames>,
    session: Session,
    tiles: Vec<PageTile>,
    scan_error: Option<String>,
    names_error: Option<String>,
    resize_error: Option<String>,
    needs_scan: bool,
    dirty: bool,
}

impl Browser {
    fn new(kind: BrowserKind, config: &ViewerConfig) -> Self {
        Self {
            kind,
            images_dir: CommittedField::default(),
            labels_dir: CommittedField::default(),
            names_yaml: CommittedField::default(),
            resize: CommittedField::default(),
            recursive: false,
            natural_sort: false,
            original_width: false,
            columns: config.columns(),
            page_size: match kind {
                BrowserKind::Images => config.grid_page_size(),
                BrowserKind::Annotations => config.annotation_page_size(),
            },
            paths: Vec::new(),
            names: None,
            session: Session::new(),
            tiles: Vec::new(),
            scan_error: None,
            names_error: None,
            resize_error: None,
            needs_scan: false,
            dirty: false,
        }
    }

    fn has_pending_work(&self) -> bool {
        self.needs_scan || self.dirty
    }

    fn media_kind(&self) -> MediaKind {
        if self.recursive {
            MediaKind::AnyImage
        } else {
            MediaKind::Image
        }
    }

    fn total_pages(&self) -> usize {
        total_pages(self.paths.len(), self.page_size)
    }

    fn labels_dir(&self) -> Option<PathBuf> {
        self.labels_dir
            .path()
            .or_else(|| self.images_dir.path().map(|dir| default_labels_dir(&dir)))
    }

    fn transform(&self, max_texture_side: u32) -> Result<Transform, String> {
        let resize = match self.resize.value() {
            Some(text) if !self.original_width => Some(parse_dimensions(text)?),
            _ => None,
        };
        Ok(Transform {
            resize,
            thumbnail: Some(max_texture_side),
        })
    }

    fn rescan(&mut self) {
        self.needs_scan = false;
        self.dirty = true;
        self.session.cursor.reset();
        self.paths.clear();
        self.tiles.clear();
        self.scan_error = None;

        let Some(root) = self.images_dir.path() else {
            return;
        };
        match scan(&root, self.recursive, self.media_kind()) {
            Ok(mut paths) => {
                if paths.is_empty() {
                    let hint = if self.recursive {
                        ""
                    } else {
                        ", turn on Recursive Search if the images are in subdirectories"
                    };
                    self.scan_error = Some(format!("No images found in: {}{hint}", root.display()));
                }
                sort_paths(&mut paths, self.natural_sort);
                info!("Listed {} images under {}", paths.len(), root.display());
                self.paths = paths;
            }
            Err(err) => self.scan_error = Some(format!("Images directory {err:#}")),
        }
    }

    fn resort(&mut self) {
        sort_paths(&mut self.paths, self.natural_sort);
        self.session.cursor.reset();
        self.dirty = true;
    }

    fn load_names(&mut self) {
        self.names = None;
        self.names_error = None;
        self.dirty = true;
        let Some(path) = self.names_yaml.path() else {
            return;
        };
        match ClassNames::load(&path) {
            Ok(names) => {
                info!("Loaded {} class names from {}", names.len(), path.display());
                self.names = Some(names);
            }
            Err(err) => {
                warn!("{err:#}");
                self.names_error = Some(format!("{err:#}"));
            }
        }
    }

    fn set_page(&mut self, index: usize) {
        let total = self.total_pages();
        if index != self.session.cursor.index() {
            self.session.cursor.set(index, total);
            self.dirty = true;
        }
    }

    fn next_page(&mut self) {
        let total = self.total_pages();
        if self.session.cursor.has_next(total) {
            self.session.cursor.next(total);
            self.dirty = true;
        }
    }

    fn previous_page(&mut self) {
        if self.session.cursor.has_previous() {
            self.session.cursor.previous();
            self.dirty = true;
        }
    }

    fn render_page(&mut self, ctx: &egui::Context, font: &LabelFont) {
        self.dirty = false;
        self.tiles.clear();
        self.resize_error = None;
        if self.names_error.is_some() {
            return;
        }

        let max_texture_side = ctx.input(|input| input.max_texture_side) as u32;
        let transform = match self.transform(max_texture_side) {
            Ok(transform) => transform,
            Err(err) => {
                self.resize_error = Some(err);
                return;
            }
        };
        let labels_dir = match self.kind {
            BrowserKind::Annotations => self.labels_dir(),
            BrowserKind::Images => None,
        };

        let started = Instant::now();
        let page = self.session.current_page(&self.paths, self.page_size);
        let offset = self.session.page_offset(self.page_size);
        for (slot, path) in page.iter().enumerate() {
            let rendered = match labels_dir.as_deref() {
                Some(labels_dir) => render_annotated(
                    path,
                    &sidecar_path(path, labels_dir),
                    self.names.as_ref(),
                    &mut self.session.colors,
                    font,
                    &transform,
                ),
                None => render_plain(path, &transform),
            };
            let texture = match rendered {
                Ok(image) => Ok(ctx.load_texture(
                    format!("{}-{}", self.kind.id(), offset + slot),
                    to_color_image(&image),
                    TextureOptions::LINEAR,
                )),
                Err(err) => {
                    warn!("{err:#}");
                    Err(format!("{err:#}"))
                }
            };
            self.tiles.push(PageTile {
                name: file_name_of(path),
                texture,
            });
        }
        debug!(
            "Rendered {} page {} ({} images) in {:.1?}",
            self.kind.id(),
            self.session.cursor.index() + 1,
            self.tiles.len(),
            started.elapsed()
        );
    }

    fn show_inputs(&mut self, ui: &mut egui::Ui, offer_natural_sort: bool) {
        if show_path_field(ui, "Images directory", &mut self.images_dir, Picker::Folder) {
            self.needs_scan = true;
            if self.labels_dir.value().is_none() {
                self.dirty = true;
            }
        }

        if self.kind == BrowserKind::Annotations {
            ui.add_space(4.0);
            if show_path_field(
                ui,
                "Labels directory (optional)",
                &mut self.labels_dir,
                Picker::Folder,
            ) {
                self.dirty = true;
            }
            if self.labels_dir.value().is_none() {
                if let Some(derived) = self.labels_dir() {
                    ui.small(format!("Derived labels directory: {}", derived.display()));
                }
            }

            ui.add_space(4.0);
            if show_path_field(
                ui,
                "dataset.yaml (optional)",
                &mut self.names_yaml,
                Picker::Yaml,
            ) {
                self.load_names();
            }
            if let Some(err) = self.names_error.as_deref() {
                error_label(ui, err);
            }
        }

        ui.add_space(6.0);
        if ui.checkbox(&mut self.recursive, "Recursive Search").changed() {
            self.needs_scan = true;
        }
        if offer_natural_sort {
            if ui.checkbox(&mut self.natural_sort, "Natural Sort").changed() {
                self.resort();
            }
            ui.small("Digit runs in file names are ordered by their numeric value.");
        }
        if ui
            .checkbox(&mut self.original_width, "Original Image Width")
            .changed()
        {
            self.dirty = true;
        }

        if !self.original_width {
            ui.add_space(4.0);
            ui.label("Resize images to (width, height)");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.resize.text).hint_text("e.g. 640x480"),
            );
            if response.lost_focus() && self.resize.commit() {
                self.dirty = true;
            }
            if let Some(err) = self.resize_error.as_deref() {
                error_label(ui, err);
            }
        }

        if self.paths.is_empty() {
            return;
        }

        ui.separator();
        ui.label(format!("Total images: {}", self.paths.len()));
        if !self.session.colors.is_empty() {
            ui.label(format!("Classes seen: {}", self.session.colors.len()));
            self.show_class_legend(ui);
        }
        ui.add(
            egui::Slider::new(&mut self.columns, MIN_COLUMNS..=MAX_COLUMNS)
                .text("Images per row"),
        );

        let (min, max, step) = self.kind.page_size_range();
        if ui
            .add(
                egui::Slider::new(&mut self.page_size, min..=max)
                    .step_by(step as f64)
                    .text("Images per page"),
            )
            .changed()
        {
            self.dirty = true;
        }

        let total = self.total_pages();
        let mut selected = self.session.cursor.clamped(total);
        ui.add_space(4.0);
        ui.label(format!("Select a page from < {total} > pages"));
        egui::ComboBox::from_id_salt(format!("{}-page-select", self.kind.id()))
            .selected_text(page_label(selected))
            .show_ui(ui, |ui| {
                for index in 0..total {
                    ui.selectable_value(&mut selected, index, page_label(index));
                }
            });
        self.set_page(selected);
        ui.label(format!("Current page: {}", self.session.cursor.index() + 1));
    }

    fn show_class_legend(&self, ui: &mut egui::Ui) {
        let colors = &self.session.colors;
        for class_id in colors.class_ids() {
            let Some([r, g, b]) = colors.get(class_id) else {
                continue;
            };
            ui.horizontal(|ui| {
                let (swatch, _) = ui.allocate_exact_size(egui::vec2(12.0, 12.0), Sense::hover());
                ui.painter()
                    .rect_filled(swatch, 2.0, egui::Color32::from_rgb(r, g, b));
                let name = display_label(self.names.as_ref(), class_id);
                if colors.is_fallback(class_id) {
                    ui.label(format!("{name} (close to another class color)"));
                } else {
                    ui.label(name);
                }
            });
        }
    }

    fn show_pager(&mut self, ui: &mut egui::Ui) {
        let total = self.total_pages();
        ui.horizontal(|ui| {
            if ui
                .add_enabled(
                    self.session.cursor.has_previous(),
                    egui::Button::new("< Previous Page"),
                )
                .clicked()
            {
                self.previous_page();
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui
                    .add_enabled(
                        self.session.cursor.has_next(total),
                        egui::Button::new("Next Page >"),
                    )
                    .clicked()
                {
                    self.next_page();
                }
            });
        });
    }

    fn show_grid(&self, ui: &mut egui::Ui) {
        if let Some(err) = self
            .scan_error
            .as_deref()
            .or(self.names_error.as_deref())
            .or(self.resize_error.as_deref())
        {
            error_label(ui, err);
            return;
        }
        if self.images_dir.value().is_none() {
            ui.weak("Enter an images directory in the sidebar.");
            return;
        }

        ui.spacing_mut().item_spacing = egui::vec2(GRID_GAP, GRID_GAP);
        let width = column_width(ui.available_width(), self.columns, GRID_GAP);
        let rows = grid_rows(self.tiles.len(), self.columns);
        let mut cells = grid_cells(self.tiles.len(), self.columns).peekable();
        for row in 0..rows {
            ui.horizontal_top(|ui| {
                while let Some(cell) = cells.next_if(|cell| cell.row == row) {
                    let tile = &self.tiles[cell.index];
                    let cell_width = if self.original_width {
                        tile.pixel_width().unwrap_or(width)
                    } else {
                        width
                    };
                    show_tile(ui, tile, cell_width, self.original_width);
                }
            });
        }
    }
}

fn show_tile(ui: &mut egui::Ui, tile: &PageTile, width: f32, original_width: bool) {
    ui.allocate_ui_with_layout(
        egui::vec2(width, 0.0),
        egui::Layout::top_down(egui::Align::Center),
        |ui| {
            ui.set_width(width);
            match &tile.texture {
                Ok(texture) => {
                    let size = texture.size_vec2();
                    let draw_size = if original_width || size.x <= 0.0 {
                        size
                    } else {
                        size * (width / size.x)
                    };
                    ui.add(egui::Image::new((texture.id(), draw_size)));
                }
                Err(err) => {
                    let color = ui.visuals().error_fg_color;
                    egui::Frame::none()
                        .stroke(egui::Stroke::new(1.0, color))
                        .inner_margin(egui::Margin::same(6.0))
                        .show(ui, |ui| {
                            ui.set_width((width - 12.0).max(1.0));
                            ui.colored_label(color, err.as_str());
                        });
                }
            }
            ui.add(egui::Label::new(egui::RichText::new(&tile.name).small().weak()).truncate());
        },
    );
}

/// Frame scrubber over one video at a time.
struct VideoBrowser {
    videos_dir: CommittedField,
    recursive: bool,
    paths: Vec<PathBuf>,
    selected: usize,
    info: Option<VideoInfo>,
    frame: usize,
    show_ms: bool,
    texture: Option<TextureHandle>,
    scan_error: Option<String>,
    error: Option<String>,
    needs_scan: bool,
    needs_info: bool,
    dirty: bool,
}

impl VideoBrowser {
    fn new() -> Self {
        Self {
            videos_dir: CommittedField::default(),
            recursive: false,
            paths: Vec::new(),
            selected: 0,
            info: None,
            frame: 0,
            show_ms: false,
            texture: None,
            scan_error: None,
            error: None,
            needs_scan: false,
            needs_info: false,
            dirty: false,
        }
    }

    fn has_pending_work(&self) -> bool {
        self.needs_scan || self.needs_info || self.dirty
    }

    fn selected_path(&self) -> Option<&Path> {
        self.paths.get(self.selected).map(PathBuf::as_path)
    }

    fn rescan(&mut self) {
        self.needs_scan = false;
        self.needs_info = true;
        self.paths.clear();
        self.selected = 0;
        self.scan_error = None;

        let Some(root) = self.videos_dir.path() else {
            return;
        };
        match scan(&root, self.recursive, MediaKind::Video) {
            Ok(mut paths) => {
                if paths.is_empty() {
                    self.scan_error = Some(format!("No videos found in: {}", root.display()));
                }
                sort_paths(&mut paths, false);
                info!("Listed {} videos under {}", paths.len(), root.display());
                self.paths = paths;
            }
            Err(err) => self.scan_error = Some(format!("Videos directory {err:#}")),
        }
    }

    fn load_selected_info(&mut self) {
        self.needs_info = false;
        self.info = None;
        self.texture = None;
        self.error = None;
        self.frame = 0;

        let Some(path) = self.selected_path().map(Path::to_path_buf) else {
            return;
        };
        match read_video_info(&path) {
            Ok(info) => {
                info!(
                    "{}: {} frames at {} fps, {}x{}",
                    path.display(),
                    info.frame_count,
                    info.fps,
                    info.width,
                    info.height
                );
                self.info = Some(info);
                self.dirty = true;
            }
            Err(err) => {
                warn!("{err:#}");
                self.error = Some(format!("{err:#}"));
            }
        }
    }

    fn render_frame(&mut self, ctx: &egui::Context) {
        self.dirty = false;
        let (Some(path), Some(info)) = (self.selected_path().map(Path::to_path_buf), self.info)
        else {
            return;
        };
        self.frame = self.frame.min(info.last_frame());
        match extract_frame(&path, self.frame, &info) {
            Ok(frame) => {
                self.error = None;
                let color_image = to_color_image(&frame);
                if let Some(texture) = self.texture.as_mut() {
                    texture.set(color_image, TextureOptions::LINEAR);
                } else {
                    self.texture =
                        Some(ctx.load_texture("video-frame", color_image, TextureOptions::LINEAR));
                }
            }
            Err(err) => {
                warn!("{err:#}");
                self.error = Some(format!("{err:#}"));
                self.texture = None;
            }
        }
    }

    fn show_inputs(&mut self, ui: &mut egui::Ui) {
        if show_path_field(ui, "Videos directory", &mut self.videos_dir, Picker::Folder) {
            self.needs_scan = true;
        }
        if ui.checkbox(&mut self.recursive, "Recursive Search").changed() {
            self.needs_scan = true;
        }

        if !self.paths.is_empty() {
            ui.add_space(4.0);
            ui.label("Select video file");
            let mut selected = self.selected;
            let selected_name = self
                .selected_path()
                .map(file_name_of)
                .unwrap_or_default();
            egui::ComboBox::from_id_salt("video-select")
                .selected_text(selected_name)
                .width(ui.available_width())
                .show_ui(ui, |ui| {
                    for (index, path) in self.paths.iter().enumerate() {
                        ui.selectable_value(&mut selected, index, file_name_of(path));
                    }
                });
            if selected != self.selected {
                self.selected = selected;
                self.needs_info = true;
            }
        }

        ui.separator();
        ui.checkbox(&mut self.show_ms, "Show Milliseconds");

        if let Some(info) = self.info {
            ui.add_space(4.0);
            ui.label(format!("FPS: {}", info.fps));
            ui.label(format!("Resolution: {} x {}", info.width, info.height));
            ui.label(format!("Frames: {}", info.frame_count));
            ui.label(format!("Duration: {:.1} s", info.total_duration_secs()));
        }
    }

    fn show_frame(&mut self, ui: &mut egui::Ui) {
        if let Some(err) = self.scan_error.as_deref() {
            error_label(ui, err);
            return;
        }
        if self.videos_dir.value().is_none() {
            ui.weak("Enter a videos directory in the sidebar.");
            return;
        }
        let Some(info) = self.info else {
            if let Some(err) = self.error.as_deref() {
                error_label(ui, err);
            }
            return;
        };

        ui.spacing_mut().slider_width = (ui.available_width() - 120.0).max(120.0);
        let response = ui.add(
            egui::Slider::new(&mut self.frame, 0..=info.last_frame()).text("Select frame"),
        );
        if response.drag_stopped() || (response.changed() && !response.dragged()) {
            self.dirty = true;
        }
        ui.label(format!(
            "Elapsed  {}",
            format_elapsed(self.frame, info.fps, self.show_ms)
        ));
        if let Some(err) = self.error.as_deref() {
            error_label(ui, err);
        }

        if let Some(texture) = self.texture.as_ref() {
            let caption_height = ui.text_style_height(&egui::TextStyle::Body) + 8.0;
            let available = ui.available_size() - egui::vec2(0.0, caption_height);
            let size = texture.size_vec2();
            if size.x > 0.0 && size.y > 0.0 {
                let scale = (available.x / size.x).min(available.y / size.y).max(0.01);
                ui.vertical_centered(|ui| {
                    ui.add(egui::Image::new((texture.id(), size * scale)));
                    if let Some(path) = self.selected_path() {
                        ui.small(file_name_of(path));
                    }
                });
            }
        }
    }
}

pub struct ViewerApp {
    tool: Tool,
    config: ViewerConfig,
    font: LabelFont,
    grid: Browser,
    annotations: Browser,
    video: VideoBrowser,
    status_line: String,
}

impl ViewerApp {
    pub fn new(
        config: ViewerConfig,
        font: LabelFont,
        initial_request: Option<LaunchRequest>,
        initial_status: Option<String>,
    ) -> Self {
        let mut app = Self {
            tool: Tool::default(),
            grid: Browser::new(BrowserKind::Images, &config),
            annotations: Browser::new(BrowserKind::Annotations, &config),
            video: VideoBrowser::new(),
            config,
            font,
            status_line: initial_status.unwrap_or_default(),
        };
        if let Some(request) = initial_request {
            app.handle_launch_request(request);
        }
        app
    }

    fn handle_launch_request(&mut self, request: LaunchRequest) {
        self.tool = request.tool;
        let browser = match request.tool {
            Tool::Annotations => &mut self.annotations,
            Tool::ImageGrid | Tool::Video => &mut self.grid,
        };
        browser.recursive = request.recursive;
        if let Some(dir) = request.images_dir.as_deref() {
            browser.images_dir = CommittedField::with_path(Some(dir));
            browser.needs_scan = true;
        }

        if request.labels_dir.is_some() || request.names_yaml.is_some() {
            self.annotations.labels_dir = CommittedField::with_path(request.labels_dir.as_deref());
            self.annotations.names_yaml = CommittedField::with_path(request.names_yaml.as_deref());
            self.annotations.load_names();
        }

        if let Some(dir) = request.videos_dir.as_deref() {
            self.video.videos_dir = CommittedField::with_path(Some(dir));
            self.video.recursive = request.recursive;
            self.video.needs_scan = true;
        }
    }

    fn has_pending_work(&self) -> bool {
        match self.tool {
            Tool::ImageGrid => self.grid.has_pending_work(),
            Tool::Annotations => self.annotations.has_pending_work(),
            Tool::Video => self.video.has_pending_work(),
        }
    }

    fn process_pending_work(&mut self, ctx: &egui::Context) {
        match self.tool {
            Tool::ImageGrid | Tool::Annotations => {
                let browser = if self.tool == Tool::ImageGrid {
                    &mut self.grid
                } else {
                    &mut self.annotations
                };
                if browser.needs_scan {
                    browser.rescan();
                }
                if browser.dirty {
                    browser.render_page(ctx, &self.font);
                }
            }
            Tool::Video => {
                if self.video.needs_scan {
                    self.video.rescan();
                }
                if self.video.needs_info {
                    self.video.load_selected_info();
                }
                if self.video.dirty {
                    self.video.render_frame(ctx);
                }
            }
        }
    }

    fn active_browser_mut(&mut self) -> Option<&mut Browser> {
        match self.tool {
            Tool::ImageGrid => Some(&mut self.grid),
            Tool::Annotations => Some(&mut self.annotations),
            Tool::Video => None,
        }
    }

    fn open_folder(&mut self) {
        let field = match self.tool {
            Tool::ImageGrid => &mut self.grid.images_dir,
            Tool::Annotations => &mut self.annotations.images_dir,
            Tool::Video => &mut self.video.videos_dir,
        };
        let Some(path) = Picker::Folder.pick(&field.text) else {
            return;
        };
        if field.set(path.display().to_string()) {
            match self.tool {
                Tool::ImageGrid => self.grid.needs_scan = true,
                Tool::Annotations => self.annotations.needs_scan = true,
                Tool::Video => self.video.needs_scan = true,
            }
        }
    }

    fn apply_viewer_theme(ctx: &egui::Context) {
        if ctx.style().visuals.panel_fill != egui::Color32::BLACK {
            ctx.set_visuals(viewer_visuals());
        }
    }

    fn show_titlebar(&mut self, ctx: &egui::Context) {
        let mut open_folder_clicked = false;
        let is_maximized = ctx.input(|input| input.viewport().maximized.unwrap_or(false));
        let title_text = format!("{APP_TITLE} v{APP_VERSION} - {}", self.tool.title());
        let bar_fill = ctx.style().visuals.panel_fill;

        egui::TopBottomPanel::top("titlebar")
            .show_separator_line(false)
            .frame(egui::Frame::none().fill(bar_fill))
            .exact_height(30.0)
            .show(ctx, |ui| {
                let button_size = egui::vec2(28.0, 22.0);
                let side_width = button_size.x * 3.0 + ui.spacing().item_spacing.x * 2.0;
                let titlebar_rect = ui.max_rect();
                let center_width = (ui.available_width()
                    - side_width * 2.0
                    - ui.spacing().item_spacing.x * 2.0)
                    .max(0.0);

                ui.add_space(2.0);
                ui.horizontal(|ui| {
                    ui.allocate_ui_with_layout(
                        egui::vec2(side_width, button_size.y),
                        egui::Layout::left_to_right(egui::Align::Center),
                        |ui| {
                            ui.add_space(4.0);
                            let menu_button = egui::Button::new("")
                                .fill(bar_fill)
                                .stroke(egui::Stroke::NONE)
                                .min_size(egui::vec2(20.0, 18.0));
                            let menu_response =
                                egui::menu::menu_custom_button(ui, menu_button, |ui| {
                                    if ui.button("Open Folder...").clicked() {
                                        open_folder_clicked = true;
                                        ui.close_menu();
                                    }
                                    ui.separator();
                                    for tool in Tool::ALL {
                                        if ui
                                            .selectable_label(self.tool == tool, tool.title())
                                            .clicked()
                                        {
                                            self.tool = tool;
                                            ui.close_menu();
                                        }
                                    }
                                });

                            let icon_rect =
                                menu_response.response.rect.shrink2(egui::vec2(5.0, 5.0));
                            let line_color = ui.visuals().widgets.inactive.fg_stroke.color;
                            let line_stroke = egui::Stroke::new(1.0, line_color);
                            for y in [
                                icon_rect.top() + 1.0,
                                icon_rect.center().y,
                                icon_rect.bottom() - 1.0,
                            ] {
                                ui.painter().line_segment(
                                    [
                                        egui::pos2(icon_rect.left(), y),
                                        egui::pos2(icon_rect.right(), y),
                                    ],
                                    line_stroke,
                                );
                            }
                        },
                    );

                    let (title_rect, drag_response) = ui.allocate_exact_size(
                        egui::vec2(center_width, button_size.y),
                        Sense::click_and_drag(),
                    );
                    ui.painter().text(
                        egui::pos2(titlebar_rect.center().x, title_rect.center().y),
                        egui::Align2::CENTER_CENTER,
                        &title_text,
                        egui::FontId::proportional(14.0),
                        ui.visuals().text_color(),
                    );
                    if drag_response.is_pointer_button_down_on() {
                        ctx.send_viewport_cmd(ViewportCommand::StartDrag);
                    }
                    if drag_response.double_clicked() {
                        ctx.send_viewport_cmd(ViewportCommand::Maximized(!is_maximized));
                    }

                    ui.allocate_ui_with_layout(
                        egui::vec2(ui.available_width(), button_size.y),
                        egui::Layout::right_to_left(egui::Align::Center),
                        |ui| {
                            let window_button = |label: &str| {
                                egui::Button::new(label.to_string())
                                    .fill(bar_fill)
                                    .stroke(egui::Stroke::NONE)
                            };
                            if ui.add_sized(button_size, window_button("X")).clicked() {
                                ctx.send_viewport_cmd(ViewportCommand::Close);
                            }
                            if ui.add_sized(button_size, window_button("□")).clicked() {
                                ctx.send_viewport_cmd(ViewportCommand::Maximized(!is_maximized));
                            }
                            if ui.add_sized(button_size, window_button("_")).clicked() {
                                ctx.send_viewport_cmd(ViewportCommand::Minimized(true));
                            }
                        },
                    );
                });
            });

        if open_folder_clicked {
            self.open_folder();
        }
    }

    fn show_sidebar(&mut self, ctx: &egui::Context) {
        let offer_natural_sort = self.config.natural_sort;
        egui::SidePanel::left("inputs")
            .resizable(true)
            .default_width(SIDEBAR_WIDTH)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("inputs-scroll")
                    .show(ui, |ui| {
                        ui.horizontal_wrapped(|ui| {
                            for tool in Tool::ALL {
                                ui.selectable_value(&mut self.tool, tool, tool.title());
                            }
                        });
                        if !self.status_line.is_empty() {
                            error_label(ui, &self.status_line);
                        }
                        if self.tool == Tool::Annotations && self.font.is_builtin() {
                            ui.small("No TrueType font found; labels use the built-in font.");
                        }
                        ui.separator();

                        match self.tool {
                            Tool::ImageGrid => self.grid.show_inputs(ui, offer_natural_sort),
                            Tool::Annotations => {
                                self.annotations.show_inputs(ui, offer_natural_sort)
                            }
                            Tool::Video => self.video.show_inputs(ui),
                        }
                    });
            });
    }
}

/// Dark theme on a black canvas, with the highlight color of the error tiles.
fn viewer_visuals() -> egui::Visuals {
    let mut visuals = egui::Visuals::dark();
    let outline = egui::Stroke::new(1.0, egui::Color32::from_gray(30));
    let [red, green, blue] = PLACEHOLDER_FILL.0;

    visuals.panel_fill = egui::Color32::BLACK;
    visuals.window_fill = egui::Color32::from_gray(8);
    visuals.extreme_bg_color = egui::Color32::from_gray(12);
    visuals.window_stroke = outline;
    visuals.widgets.noninteractive.bg_stroke = outline;
    visuals.selection.bg_fill = egui::Color32::from_rgb(red, green, blue);
    visuals.selection.stroke = egui::Stroke::new(1.0, egui::Color32::from_rgb(255, 170, 170));
    visuals
}

fn grip_stroke(visuals: &egui::Visuals, active: bool) -> egui::Stroke {
    if active {
        visuals.widgets.hovered.fg_stroke
    } else {
        visuals.widgets.noninteractive.fg_stroke
    }
}

/// Bottom-right drag handle; the window has no native decorations.
fn show_resize_grip(ctx: &egui::Context) {
    const GRIP_SIDE: f32 = 16.0;

    egui::Area::new(egui::Id::new("sharingan-resize-grip"))
        .order(egui::Order::Foreground)
        .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-1.0, -1.0))
        .show(ctx, |ui| {
            let (rect, response) =
                ui.allocate_exact_size(egui::Vec2::splat(GRIP_SIDE), Sense::drag());
            if response.drag_started() {
                ctx.send_viewport_cmd(ViewportCommand::BeginResize(ResizeDirection::SouthEast));
            }
            if response.hovered() {
                ctx.set_cursor_icon(egui::CursorIcon::ResizeSouthEast);
            }

            let stroke = grip_stroke(ui.visuals(), response.hovered() || response.dragged());
            let corner = rect.shrink(3.0).right_bottom();
            for step in 1..=3 {
                let reach = step as f32 * 3.5;
                ui.painter().line_segment(
                    [corner - egui::vec2(reach, 0.0), corner - egui::vec2(0.0, reach)],
                    stroke,
                );
            }
        });
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        Self::apply_viewer_theme(ctx);
        self.process_pending_work(ctx);

        let mut close_requested = false;
        let mut page_step = 0_i32;
        let typing = ctx.memory(|memory| memory.focused().is_some());
        ctx.input_mut(|input| {
            if input.consume_key(egui::Modifiers::COMMAND, egui::Key::W) {
                close_requested = true;
            } else if !typing && input.consume_key(egui::Modifiers::NONE, egui::Key::ArrowRight) {
                page_step = 1;
            } else if !typing && input.consume_key(egui::Modifiers::NONE, egui::Key::ArrowLeft) {
                page_step = -1;
            }
        });
        if close_requested {
            ctx.send_viewport_cmd(ViewportCommand::Close);
            return;
        }
        if let Some(browser) = self.active_browser_mut() {
            match page_step {
                1 => browser.next_page(),
                -1 => browser.previous_page(),
                _ => {}
            }
        }

        self.show_titlebar(ctx);
        self.show_sidebar(ctx);

        if let Some(browser) = self.active_browser_mut() {
            if browser.total_pages() > 1 {
                egui::TopBottomPanel::bottom("pager")
                    .show_separator_line(false)
                    .show(ctx, |ui| {
                        ui.add_space(4.0);
                        browser.show_pager(ui);
                        ui.add_space(4.0);
                    });
            }
        }

        egui::CentralPanel::default().show(ctx, |ui| match self.tool {
            Tool::ImageGrid | Tool::Annotations => {
                let browser = if self.tool == Tool::ImageGrid {
                    &self.grid
                } else {
                    &self.annotations
                };
                egui::ScrollArea::both()
                    .id_salt(format!("{}-scroll", browser.kind.id()))
                    .auto_shrink([false, false])
                    .show(ui, |ui| browser.show_grid(ui));
            }
            Tool::Video => self.video.show_frame(ui),
        });

        show_resize_grip(ctx);

        if self.has_pending_work() {
            ctx.set_cursor_icon(egui::CursorIcon::Progress);
            ctx.request_repaint();
        }
    }
}
