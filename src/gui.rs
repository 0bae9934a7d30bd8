use crate::model::{Price, Row, RowId, YearLabel};
use crate::reconcile::{GridEvent, GridSurface, Notifier};
use crate::schema::{Column, ColumnSchema, FieldRef, FixedField, YearField, cell};
use crate::session::{EventOutcome, Session};
use crate::{LoadedPayload, fixture, statics};
use eframe::egui;
use egui_extras::TableBuilder;
use std::{
    collections::{BTreeSet, HashMap, HashSet},
    path::PathBuf,
    sync::Arc,
};

pub fn run_gui(payload: Option<LoadedPayload>) -> eframe::Result {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size(statics::WINDOW_INNER_SIZE),
        ..Default::default()
    };
    let title = format!("{} {}", statics::EN_APP_TITLE, env!("CARGO_PKG_VERSION"));
    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| {
            let mut app = PriceGridApp {
                theme_dark: true,
                ..Default::default()
            };
            match payload {
                Some(payload) => {
                    app.dialog_dir = payload.source_path.parent().map(PathBuf::from);
                    app.source_path = Some(payload.source_path);
                    app.start_session(payload.dataset);
                }
                None => match fixture::demo_dataset() {
                    Ok(dataset) => app.start_session(dataset),
                    Err(e) => app.errors.error(&format!("{e:#}")),
                },
            }
            Ok(Box::new(app))
        }),
    )
}

/// The table widget. Holds display-bound copies of the rows; the session's
/// dataset is never touched from here. Interaction is queued as
/// [`GridEvent`]s for the app to route through the session.
#[derive(Default)]
struct GridView {
    generation: u64,
    schema: Option<ColumnSchema>,
    rows: Vec<Row>,
    /// Rows laid out at least once since the last `present`.
    registered: HashSet<RowId>,
    checked: BTreeSet<RowId>,
    edit_buffers: HashMap<(RowId, YearLabel), String>,
    ready_pending: bool,
    events: Vec<GridEvent>,
}

impl GridSurface for GridView {
    fn present(&mut self, generation: u64, schema: &ColumnSchema, rows: &[Arc<Row>]) {
        self.generation = generation;
        self.schema = Some(schema.clone());
        self.rows = rows.iter().map(|r| Row::clone(r)).collect();
        self.registered.clear();
        // Rows that survive keep their box until the ready signal reconciles it.
        let ids: HashSet<RowId> = rows.iter().map(|r| r.id).collect();
        self.checked.retain(|id| ids.contains(id));
        self.edit_buffers.clear();
        self.ready_pending = true;
    }

    fn set_checked(&mut self, id: RowId, checked: bool) -> bool {
        if !self.registered.contains(&id) {
            return false;
        }
        if checked {
            self.checked.insert(id);
        } else {
            self.checked.remove(&id);
        }
        true
    }

    fn for_each_visible_row(&self, f: &mut dyn FnMut(RowId, bool)) {
        for row in &self.rows {
            if self.registered.contains(&row.id) {
                f(row.id, self.checked.contains(&row.id));
            }
        }
    }

    fn revert_cell(&mut self, id: RowId, field: &FieldRef, value: Option<Price>) {
        let FieldRef::Year {
            year,
            field: YearField::NegotiatedPrice,
        } = field
        else {
            return;
        };
        let text = value.map(|p| p.to_string()).unwrap_or_default();
        self.edit_buffers.insert((id, year.clone()), text);
        if let Some(row) = self.rows.iter_mut().find(|r| r.id == id)
            && let Some(entry) = row.years.get_mut(year)
        {
            entry.negotiated_price = value;
        }
    }
}

impl GridView {
    fn show(&mut self, ui: &mut egui::Ui) {
        let GridView {
            generation,
            schema,
            rows,
            registered,
            checked,
            edit_buffers,
            ready_pending,
            events,
        } = self;

        let Some(schema) = schema.as_ref() else {
            return;
        };
        let rows: &[Row] = rows;

        if rows.is_empty() {
            ui.label(statics::EN_NO_DATA);
        } else {
            let row_h = ui.text_style_height(&egui::TextStyle::Body) + 8.0;
            let columns: Vec<&Column> = schema.leaf_columns().collect();

            egui::ScrollArea::horizontal()
                .auto_shrink([false, true])
                .show(ui, |ui| {
                    let mut table = TableBuilder::new(ui)
                        .striped(true)
                        .cell_layout(egui::Layout::left_to_right(egui::Align::Center));
                    for column in &columns {
                        table = table.column(table_column(column));
                    }

                    table
                        .header(row_h * 2.0, |#[allow(unused_mut)] mut header| {
                            for column in &columns {
                                header.col(|ui| {
                                    header_ui(ui, column, rows, checked, events);
                                });
                            }
                        })
                        .body(|#[allow(unused_mut)] mut body| {
                            for row in rows.iter() {
                                body.row(row_h, |#[allow(unused_mut)] mut table_row| {
                                    for column in &columns {
                                        table_row.col(|ui| {
                                            cell_ui(ui, row, column, checked, edit_buffers, events);
                                        });
                                    }
                                });
                                registered.insert(row.id);
                            }
                        });
                });
        }

        if *ready_pending {
            *ready_pending = false;
            events.push(GridEvent::Ready {
                generation: *generation,
            });
        }
    }
}

fn table_column(column: &Column) -> egui_extras::Column {
    let width = match &column.field {
        FieldRef::Fixed(FixedField::Selection) => {
            return egui_extras::Column::exact(statics::COL_W_SELECT);
        }
        FieldRef::Fixed(FixedField::Id) => statics::COL_W_ID,
        FieldRef::Fixed(FixedField::Name) => statics::COL_W_NAME,
        FieldRef::Fixed(FixedField::Quantity) => statics::COL_W_QUANTITY,
        FieldRef::Year { .. } => statics::COL_W_PRICE,
    };
    egui_extras::Column::initial(width).resizable(true)
}

fn header_ui(
    ui: &mut egui::Ui,
    column: &Column,
    rows: &[Row],
    checked: &mut BTreeSet<RowId>,
    events: &mut Vec<GridEvent>,
) {
    match &column.field {
        FieldRef::Fixed(FixedField::Selection) => {
            let mut all = !rows.is_empty() && rows.iter().all(|r| checked.contains(&r.id));
            if ui.checkbox(&mut all, statics::EN_EMPTY).changed() {
                if all {
                    checked.extend(rows.iter().map(|r| r.id));
                } else {
                    checked.clear();
                }
                events.push(GridEvent::SelectionChanged {
                    checked: checked.clone(),
                });
            }
        }
        FieldRef::Fixed(_) => {
            ui.strong(column.header);
        }
        FieldRef::Year { year, .. } => {
            ui.vertical(|ui| {
                ui.small(year.as_str());
                ui.strong(column.header);
            });
        }
    }
}

fn cell_ui(
    ui: &mut egui::Ui,
    row: &Row,
    column: &Column,
    checked: &mut BTreeSet<RowId>,
    edit_buffers: &mut HashMap<(RowId, YearLabel), String>,
    events: &mut Vec<GridEvent>,
) {
    match &column.field {
        FieldRef::Fixed(FixedField::Selection) => {
            let mut is_checked = checked.contains(&row.id);
            if ui.checkbox(&mut is_checked, statics::EN_EMPTY).changed() {
                if is_checked {
                    checked.insert(row.id);
                } else {
                    checked.remove(&row.id);
                }
                events.push(GridEvent::SelectionChanged {
                    checked: checked.clone(),
                });
            }
        }
        FieldRef::Year { year, .. } if column.editable => {
            let current = cell(row, &column.field).to_string();
            let old_value = row.year(year).and_then(|e| e.negotiated_price);
            let buf = edit_buffers
                .entry((row.id, year.clone()))
                .or_insert_with(|| current.clone());
            let resp = ui.add(egui::TextEdit::singleline(buf).desired_width(f32::INFINITY));
            if resp.lost_focus() {
                if ui.input(|i| i.key_pressed(egui::Key::Escape)) {
                    *buf = current;
                } else if *buf != current {
                    events.push(GridEvent::CellEdited {
                        row_id: row.id,
                        field: column.field.clone(),
                        new_value: buf.clone(),
                        old_value,
                    });
                }
            }
        }
        field => {
            ui.label(cell(row, field).to_string());
        }
    }
}

/// Notification sink: the latest error is shown in a dismissible bar.
#[derive(Default)]
struct ErrorBar {
    last_error: Option<String>,
}

impl Notifier for ErrorBar {
    fn error(&mut self, message: &str) {
        tracing::warn!("{message}");
        self.last_error = Some(message.to_string());
    }
}

#[derive(Default)]
struct PriceGridApp {
    session: Option<Session>,
    grid: GridView,
    errors: ErrorBar,
    source_path: Option<PathBuf>,
    dialog_dir: Option<PathBuf>,
    status: String,
    about_open: bool,
    theme_dark: bool,
}

impl PriceGridApp {
    fn start_session(&mut self, dataset: crate::Dataset) {
        match Session::new(dataset) {
            Ok(mut session) => {
                session.present(&mut self.grid);
                self.session = Some(session);
                self.errors.last_error = None;
            }
            Err(e) => self.errors.error(&e.to_string()),
        }
    }

    fn open_file(&mut self) {
        let mut dlg = rfd::FileDialog::new()
            .add_filter(statics::DIALOG_FILTER_NAME, statics::DIALOG_FILTER_EXTENSIONS);
        if let Some(dir) = self.dialog_dir.clone() {
            dlg = dlg.set_directory(dir);
        }
        let Some(path) = dlg.pick_file() else {
            return;
        };

        match LoadedPayload::load_path(&path) {
            Ok(payload) => {
                self.dialog_dir = path.parent().map(PathBuf::from);
                self.status = format!("Loaded {}", path.display());
                self.source_path = Some(payload.source_path);
                self.start_session(payload.dataset);
            }
            Err(e) => {
                self.errors.error(&format!("Failed to load: {e:#}"));
            }
        }
    }

    fn print_selected(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let selected = session.selected_rows();
        let ids: Vec<RowId> = selected.iter().map(|r| r.id).collect();
        tracing::info!(
            category = %session.active().category,
            node = %session.active().node,
            ?ids,
            "selected rows"
        );
        for row in &selected {
            tracing::info!(?row);
        }
        self.status = format!("{} {ids:?}", statics::EN_LABEL_SELECTED);
    }

    fn export_all(&mut self, ctx: &egui::Context) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        match session.dataset().to_json_pretty() {
            Ok(json) => {
                tracing::info!("exported dataset:\n{json}");
                ctx.copy_text(json);
                self.status = statics::EN_STATUS_EXPORTED.to_string();
            }
            Err(e) => self.errors.error(&format!("{e:#}")),
        }
    }

    fn dispatch_grid_events(&mut self, ctx: &egui::Context) {
        let Some(session) = self.session.as_mut() else {
            self.grid.events.clear();
            return;
        };
        let events = std::mem::take(&mut self.grid.events);
        let handled = !events.is_empty();
        for event in events {
            if let EventOutcome::Refused(e) =
                session.handle_event(event, &mut self.grid, &mut self.errors)
            {
                self.status = e.to_string();
            }
        }
        // Handled events may have changed what the grid shows since it was painted.
        if handled || self.grid.ready_pending {
            ctx.request_repaint();
        }
    }

    fn render_tabs(&mut self, ui: &mut egui::Ui) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let categories: Vec<String> = session
            .dataset()
            .category_names()
            .map(String::from)
            .collect();
        let nodes: Vec<String> = session
            .dataset()
            .category(&session.active().category)
            .map(|c| c.node_names().map(String::from).collect())
            .unwrap_or_default();
        let active = session.active().clone();

        let mut result = Ok(());
        ui.horizontal_wrapped(|ui| {
            ui.label(statics::EN_HEADING_CATEGORY);
            for category in &categories {
                if ui
                    .selectable_label(*category == active.category, category.as_str())
                    .clicked()
                    && *category != active.category
                {
                    result = session.select_category(category, &mut self.grid);
                }
            }
        });
        ui.horizontal_wrapped(|ui| {
            ui.label(statics::EN_HEADING_NODE);
            for node in &nodes {
                if ui
                    .selectable_label(*node == active.node, node.as_str())
                    .clicked()
                    && *node != active.node
                {
                    result = session.select_node(node, &mut self.grid);
                }
            }
        });

        if let Err(e) = result {
            tracing::info!("tab switch refused: {e}");
            self.status = match e {
                crate::StoreError::EmptyCategory(_) => statics::EN_NO_NODES.to_string(),
                e => e.to_string(),
            };
        }
    }
}

impl eframe::App for PriceGridApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            egui::MenuBar::new().ui(ui, |ui| {
                if ui.button(statics::EN_BTN_OPEN).clicked() {
                    self.open_file();
                }
                if ui.button(statics::EN_BTN_ABOUT).clicked() {
                    self.about_open = true;
                }
                if ui.button(statics::EN_BTN_TOGGLE_THEME).clicked() {
                    self.theme_dark = !self.theme_dark;
                    if self.theme_dark {
                        ctx.set_visuals(egui::Visuals::dark());
                    } else {
                        ctx.set_visuals(egui::Visuals::light());
                    }
                }
            });
        });

        if self.about_open {
            let mut open = self.about_open;
            egui::Window::new(statics::EN_WINDOW_ABOUT)
                .collapsible(false)
                .open(&mut open)
                .show(ctx, |ui| {
                    ui.heading(statics::EN_ABOUT_HEADING);
                    ui.label(format!(
                        "{} {}",
                        statics::EN_ABOUT_VERSION,
                        env!("CARGO_PKG_VERSION")
                    ));
                    ui.separator();
                    ui.label(statics::EN_ABOUT_EDITING);
                });
            self.about_open = open;
        }

        if let Some(err) = self.errors.last_error.clone() {
            egui::TopBottomPanel::top("error_bar").show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.colored_label(egui::Color32::RED, err);
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button(statics::EN_BTN_CLEAR).clicked() {
                            self.errors.last_error = None;
                        }
                    });
                });
            });
        }

        egui::TopBottomPanel::bottom("bottom_status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let file_label = self
                    .source_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| statics::EN_PLACEHOLDER_DEMO.to_string());
                ui.label(file_label);
                if let Some(session) = self.session.as_ref() {
                    ui.separator();
                    ui.label(format!("{} {}", statics::EN_LABEL_ROWS, session.rows().len()));
                    ui.separator();
                    ui.label(format!(
                        "{} {}",
                        statics::EN_LABEL_SELECTED,
                        session.selected_rows().len()
                    ));
                    if session.store().is_modified() {
                        ui.separator();
                        ui.colored_label(egui::Color32::YELLOW, statics::EN_BADGE_MODIFIED);
                    }
                }
                if !self.status.is_empty() {
                    ui.separator();
                    ui.label(self.status.as_str());
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            if self.session.is_none() {
                ui.heading(statics::EN_APP_TITLE);
                return;
            }

            self.render_tabs(ui);
            ui.separator();
            self.grid.show(ui);
            ui.separator();
            ui.horizontal(|ui| {
                if ui.button(statics::EN_BTN_PRINT_SELECTED).clicked() {
                    self.print_selected();
                }
                if ui.button(statics::EN_BTN_EXPORT_ALL).clicked() {
                    self.export_all(ctx);
                }
            });
        });

        self.dispatch_grid_events(ctx);
    }
}
