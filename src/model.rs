use std::path::PathBuf;
use std::time::Instant;

use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, error, info, trace};

use crate::config::GridConfig;
use crate::domain::{CMDMode, GridError, HELP_TEXT, Message, SortColumn, SortDirection};
use crate::export::{export_csv, write_export};
use crate::inputter::{InputResult, Inputter};
use crate::pipeline::{DerivedView, GridState, PageWindow, ViewCache};
use crate::presentation::{StatusBadge, cell_text, status_badge};
use crate::table::Dataset;

#[derive(Debug, PartialEq)]
pub enum Status {
    Empty,
    Ready,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    Table,
    Popup,
    CmdInput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderView {
    pub label: &'static str,
    pub sort: Option<SortDirection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowView {
    pub id: String,
    pub cells: Vec<String>,
    pub badge: StatusBadge,
}

/// Everything the UI needs to draw one frame.
#[derive(Debug, Clone)]
pub struct UIData {
    pub name: String,
    pub loading: bool,
    pub headers: Vec<HeaderView>,
    pub rows: Vec<RowView>,
    pub window: PageWindow,
    pub summary: String,
    pub selected_row: usize,
    pub search_term: String,
    pub status_filter: String,
    pub channel_filter: String,
    pub show_popup: bool,
    pub popup_message: String,
    /// Visible part of the input line and the cursor offset inside it.
    pub cmdline: (String, usize),
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            loading: true,
            headers: Vec::new(),
            rows: Vec::new(),
            window: DerivedView::empty().window(),
            summary: String::new(),
            selected_row: 0,
            search_term: String::new(),
            status_filter: String::new(),
            channel_filter: String::new(),
            show_popup: false,
            popup_message: String::new(),
            cmdline: (String::new(), 0),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        }
    }
}

/// Owns the grid state and applies one message at a time.
pub struct Model {
    config: GridConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    dataset: Option<Dataset>,
    channels: Vec<String>,
    state: GridState,
    cache: ViewCache,
    view: DerivedView,
    curser_row: usize,
    uidata: UIData,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &GridConfig, ui_width: usize) -> Self {
        let mut model = Self {
            config: config.clone(),
            status: Status::Empty,
            modus: Modus::Table,
            previous_modus: Modus::Table,
            dataset: None,
            channels: Vec::new(),
            state: config.initial_state(),
            cache: ViewCache::default(),
            view: DerivedView::empty(),
            curser_row: 0,
            uidata: UIData::empty(),
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };
        model.input.set_width(ui_width.saturating_sub(2));
        model.set_status_message("Loading ...");
        model
    }

    /// Replaces the dataset. The grid state (filters, sort, page) is kept and re-validated.
    pub fn load_dataset(&mut self, dataset: Dataset) {
        info!(
            "Using dataset {} with {} records",
            dataset.name(),
            dataset.len()
        );
        self.channels = dataset.channels();
        let count = dataset.len();
        self.dataset = Some(dataset);
        self.status = Status::Ready;
        self.refresh();
        self.set_status_message(format!("Loaded {count} campaigns"));
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn state(&self) -> &GridState {
        &self.state
    }

    pub fn view(&self) -> &DerivedView {
        &self.view
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), GridError> {
        let Some(msg) = message else {
            return Ok(());
        };
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);

        match self.modus {
            Modus::Table => match msg {
                Message::Quit => self.quit(),
                Message::Help => self.show_help(),
                Message::Exit => self.clear_search(),
                Message::Search => self.enter_cmd_mode(CMDMode::SearchTable),
                Message::GotoPage => self.enter_cmd_mode(CMDMode::GotoPage),
                Message::CycleStatusFilter => {
                    if self.state.cycle_status_filter() {
                        self.filters_changed();
                    }
                }
                Message::CycleChannelFilter => {
                    if self.state.cycle_channel_filter(&self.channels) {
                        self.filters_changed();
                    }
                }
                Message::ResetFilters => {
                    if self.state.reset_filters() {
                        self.filters_changed();
                    }
                }
                Message::SortBy(column) => self.sort_by(column),
                Message::PreviousPage => {
                    let moved = self.state.previous_page();
                    self.page_changed(moved);
                }
                Message::NextPage => {
                    let moved = self.state.next_page(self.view.total_pages());
                    self.page_changed(moved);
                }
                Message::FirstPage => {
                    let moved = self.state.first_page();
                    self.page_changed(moved);
                }
                Message::LastPage => {
                    let moved = self.state.last_page(self.view.total_pages());
                    self.page_changed(moved);
                }
                Message::MoveUp => self.move_selection_up(),
                Message::MoveDown => self.move_selection_down(),
                Message::Export => self.export(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::RawKey(_) => (),
            },
            Modus::Popup => match msg {
                Message::Quit => self.quit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::Exit | Message::Help => self.exit_popup(),
                _ => (),
            },
            Modus::CmdInput => match msg {
                Message::RawKey(key) => self.raw_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    /// Re-derives the view. A page that no longer exists is reset to 1.
    fn refresh(&mut self) {
        let Some(dataset) = self.dataset.as_ref() else {
            self.update_uidata();
            return;
        };

        let mut view = self.cache.derive(dataset, &self.state);
        if self.state.settle_page(view.total_pages()) {
            debug!(
                "Filters left {} pages, back to page 1",
                view.total_pages()
            );
            view = self.cache.derive(dataset, &self.state);
        }
        self.view = view;
        self.curser_row = self
            .curser_row
            .min(self.view.page_rows().len().saturating_sub(1));
        self.update_uidata();
    }

    fn filters_changed(&mut self) {
        self.curser_row = 0;
        self.refresh();
        self.set_status_message(format!(
            "{} matching campaigns",
            self.view.len()
        ));
    }

    fn page_changed(&mut self, moved: bool) {
        if moved {
            self.curser_row = 0;
            self.refresh();
        }
    }

    fn sort_by(&mut self, column: SortColumn) {
        self.state.sort_by(column);
        self.refresh();
        self.set_status_message(format!(
            "Sorted by {} {}",
            column.label(),
            self.state.sort_direction().arrow()
        ));
    }

    fn clear_search(&mut self) {
        if self.state.set_search_term(String::new()) {
            self.filters_changed();
        }
    }

    fn move_selection_up(&mut self) {
        if self.curser_row > 0 {
            self.curser_row -= 1;
            self.update_uidata();
        }
    }

    fn move_selection_down(&mut self) {
        if self.curser_row + 1 < self.view.page_rows().len() {
            self.curser_row += 1;
            self.update_uidata();
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::Popup;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
    }

    fn exit_popup(&mut self) {
        trace!("Close popup ...");
        self.modus = self.previous_modus;
        self.previous_modus = Modus::Popup;
        self.uidata.show_popup = false;
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        trace!("Entering command mode {:?} ...", mode);
        self.previous_modus = self.modus;
        self.modus = Modus::CmdInput;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;

        self.input.clear();
        if mode == CMDMode::SearchTable {
            self.input.set(self.state.search_term());
        }
        self.last_input = self.input.get();
        self.update_uidata();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);

        // The search box filters while typing.
        if self.cmd_mode == Some(CMDMode::SearchTable)
            && self.state.set_search_term(self.last_input.input.clone())
        {
            self.curser_row = 0;
            self.refresh();
        }

        if self.last_input.finished {
            self.handle_cmd_input();
        }
        self.update_uidata();
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {:?}", self.last_input);

        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CmdInput;

        let cmd_input = self.last_input.input.trim().to_string();
        match self.cmd_mode {
            Some(CMDMode::SearchTable) => {
                self.set_status_message(format!(
                    "{} matching campaigns",
                    self.view.len()
                ));
            }
            Some(CMDMode::GotoPage) => {
                if !self.last_input.canceled {
                    self.goto_page(&cmd_input);
                }
            }
            None => {
                info!("Cmd mode is none!")
            }
        }
        self.cmd_mode = None;
    }

    fn goto_page(&mut self, input: &str) {
        let total_pages = self.view.total_pages();
        match input.parse::<usize>() {
            Ok(page) if (1..=total_pages).contains(&page) => {
                let moved = self.state.go_to_page(page, total_pages);
                self.page_changed(moved);
            }
            _ => self.set_status_message(format!(
                "No page \"{input}\", pages 1 to {total_pages}"
            )),
        }
    }

    fn export(&mut self) {
        let Some(dataset) = self.dataset.as_ref() else {
            self.set_status_message("Nothing to export");
            return;
        };
        let rows = self.view.len();
        let result = export_csv(dataset, self.view.rows())
            .and_then(|bytes| write_export(&self.config.export_dir, &bytes));
        match result {
            Ok(path) => self.exported(rows, path),
            Err(e) => {
                error!("Export failed: {e}");
                self.set_status_message(format!("Export failed: {e}"));
            }
        }
    }

    fn exported(&mut self, rows: usize, path: PathBuf) {
        self.set_status_message(format!("Exported {rows} rows to {}", path.display()));
    }

    // Only the input line depends on the terminal size, the table layout is left to ratatui.
    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!("UI was resized to {}x{}", width, height);
        self.input.set_width(width.saturating_sub(2));
        self.update_uidata();
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
        self.uidata.status_message = self.status_message.clone();
        self.uidata.last_status_message_update = self.last_status_message_update;
    }

    fn update_uidata(&mut self) {
        let headers = SortColumn::ALL
            .iter()
            .map(|&column| HeaderView {
                label: column.label(),
                sort: (column == self.state.sort_column()).then(|| self.state.sort_direction()),
            })
            .collect();

        let rows = match self.dataset.as_ref() {
            Some(dataset) => self
                .view
                .page_rows()
                .iter()
                .filter_map(|&idx| dataset.get(idx))
                .map(|record| RowView {
                    id: record.id.clone(),
                    cells: SortColumn::ALL
                        .iter()
                        .map(|&column| cell_text(record, column))
                        .collect(),
                    badge: status_badge(&record.status),
                })
                .collect(),
            None => Vec::new(),
        };

        let window = self.view.window();
        self.uidata = UIData {
            name: self
                .dataset
                .as_ref()
                .map(|d| d.name().to_string())
                .unwrap_or_default(),
            loading: self.dataset.is_none(),
            headers,
            rows,
            window,
            summary: window.summary(),
            selected_row: self.curser_row,
            search_term: self.state.search_term().to_string(),
            status_filter: self.state.status_filter().label(),
            channel_filter: self.state.channel_filter().label(),
            show_popup: self.modus == Modus::Popup,
            popup_message: self.uidata.popup_message.clone(),
            cmdline: self.input.visible(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CampaignRecord, CampaignStatus, ChannelFilter, Revenue, StatusFilter};
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};

    fn records(n: usize) -> Vec<CampaignRecord> {
        (0..n)
            .map(|i| CampaignRecord {
                id: format!("{i}"),
                campaign: format!("Campaign {i:02}"),
                channel: if i % 2 == 0 { "Google Ads" } else { "Instagram" }.to_string(),
                clicks: 1000 + i as u64,
                conversions: 10,
                revenue: Revenue::from_units(100 * i as u64),
                ctr: 1.0,
                status: if i < 3 {
                    CampaignStatus::Paused
                } else {
                    CampaignStatus::Active
                },
                date: format!("2024-01-{:02}", i + 1),
            })
            .collect()
    }

    fn model_with(n: usize) -> Model {
        let mut model = Model::init(&GridConfig::default(), 120);
        model.load_dataset(Dataset::new("test", records(n)));
        model
    }

    fn send(model: &mut Model, msg: Message) {
        model.update(Some(msg)).unwrap();
    }

    fn type_keys(model: &mut Model, text: &str) {
        for chr in text.chars() {
            send(
                model,
                Message::RawKey(KeyEvent::new(KeyCode::Char(chr), KeyModifiers::NONE)),
            );
        }
    }

    #[test]
    fn starts_empty_until_data_arrives() {
        let mut model = Model::init(&GridConfig::default(), 80);
        assert_eq!(model.status, Status::Empty);
        assert!(model.get_uidata().loading);
        model.load_dataset(Dataset::sample());
        assert_eq!(model.status, Status::Ready);
        assert!(!model.get_uidata().loading);
        assert_eq!(model.get_uidata().rows.len(), 5);
        assert_eq!(model.get_uidata().rows[0].cells[0], "Retargeting Campaign");
    }

    #[test]
    fn narrowing_filter_on_last_page_resets_to_first_page() {
        let mut model = model_with(12);
        send(&mut model, Message::LastPage);
        assert_eq!(model.state().current_page(), 3);

        // Three paused records fit on one page.
        send(&mut model, Message::CycleStatusFilter);
        send(&mut model, Message::CycleStatusFilter);
        assert_eq!(
            model.state().status_filter(),
            &StatusFilter::Only(CampaignStatus::Paused)
        );
        assert_eq!(model.state().current_page(), 1);
        assert_eq!(model.get_uidata().rows.len(), 3);
    }

    #[test]
    fn filter_keeps_page_when_still_in_range() {
        let mut model = model_with(12);
        send(&mut model, Message::NextPage);
        send(&mut model, Message::CycleStatusFilter);
        // nine active records, two pages
        assert_eq!(model.view().total_pages(), 2);
        assert_eq!(model.state().current_page(), 2);
    }

    #[test]
    fn page_navigation_stops_at_boundaries() {
        let mut model = model_with(7);
        send(&mut model, Message::PreviousPage);
        assert_eq!(model.state().current_page(), 1);
        send(&mut model, Message::NextPage);
        send(&mut model, Message::NextPage);
        assert_eq!(model.state().current_page(), 2);
        assert_eq!(model.get_uidata().summary, "Showing 6 to 7 of 7 results");
    }

    #[test]
    fn search_box_filters_while_typing() {
        let mut model = model_with(12);
        send(&mut model, Message::Search);
        assert!(model.raw_keyevents());
        type_keys(&mut model, "instagram");
        assert_eq!(model.view().len(), 6);
        send(
            &mut model,
            Message::RawKey(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
        );
        assert!(!model.raw_keyevents());
        assert_eq!(model.state().search_term(), "instagram");

        send(&mut model, Message::Exit);
        assert_eq!(model.state().search_term(), "");
        assert_eq!(model.view().len(), 12);
    }

    #[test]
    fn escape_in_search_clears_the_term() {
        let mut model = model_with(12);
        send(&mut model, Message::Search);
        type_keys(&mut model, "11");
        assert_eq!(model.view().len(), 1);
        send(
            &mut model,
            Message::RawKey(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
        );
        assert_eq!(model.state().search_term(), "");
        assert_eq!(model.view().len(), 12);
    }

    #[test]
    fn goto_page_prompt() {
        let mut model = model_with(12);
        send(&mut model, Message::GotoPage);
        type_keys(&mut model, "3");
        send(
            &mut model,
            Message::RawKey(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
        );
        assert_eq!(model.state().current_page(), 3);

        send(&mut model, Message::GotoPage);
        type_keys(&mut model, "9");
        send(
            &mut model,
            Message::RawKey(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)),
        );
        assert_eq!(model.state().current_page(), 3);
        assert!(model.get_uidata().status_message.starts_with("No page"));
    }

    #[test]
    fn header_click_sorts_and_marks_header() {
        let mut model = model_with(6);
        send(&mut model, Message::SortBy(SortColumn::Revenue));
        let uidata = model.get_uidata();
        assert_eq!(uidata.headers[4].sort, Some(SortDirection::Asc));
        assert_eq!(uidata.headers[7].sort, None);
        assert_eq!(uidata.rows[0].cells[4], "$0");

        send(&mut model, Message::SortBy(SortColumn::Revenue));
        assert_eq!(model.get_uidata().rows[0].cells[4], "$500");
    }

    #[test]
    fn channel_filter_uses_dataset_channels() {
        let mut model = model_with(6);
        assert_eq!(model.channels(), ["Google Ads", "Instagram"]);
        send(&mut model, Message::CycleChannelFilter);
        assert_eq!(
            model.state().channel_filter(),
            &ChannelFilter::Only("Google Ads".into())
        );
        assert_eq!(model.view().len(), 3);
        send(&mut model, Message::ResetFilters);
        assert_eq!(model.view().len(), 6);
    }

    #[test]
    fn selection_stays_on_page() {
        let mut model = model_with(7);
        send(&mut model, Message::MoveUp);
        assert_eq!(model.get_uidata().selected_row, 0);
        for _ in 0..10 {
            send(&mut model, Message::MoveDown);
        }
        assert_eq!(model.get_uidata().selected_row, 4);
        send(&mut model, Message::NextPage);
        assert_eq!(model.get_uidata().selected_row, 0);
        send(&mut model, Message::MoveDown);
        send(&mut model, Message::MoveDown);
        assert_eq!(model.get_uidata().selected_row, 1);
    }

    #[test]
    fn help_popup_swallows_grid_keys() {
        let mut model = model_with(12);
        send(&mut model, Message::Help);
        assert!(model.get_uidata().show_popup);
        send(&mut model, Message::NextPage);
        assert_eq!(model.state().current_page(), 1);
        send(&mut model, Message::Exit);
        assert!(!model.get_uidata().show_popup);
        send(&mut model, Message::NextPage);
        assert_eq!(model.state().current_page(), 2);
    }

    #[test]
    fn export_writes_all_filtered_rows() {
        let dir = std::env::temp_dir().join(format!("campaign-grid-model-{}", std::process::id()));
        let config = GridConfig::default().with_export_dir(dir.clone());
        let mut model = Model::init(&config, 120);
        model.load_dataset(Dataset::new("test", records(12)));
        send(&mut model, Message::CycleStatusFilter);
        send(&mut model, Message::Export);

        let csv = std::fs::read_to_string(dir.join("campaign-data.csv")).unwrap();
        assert_eq!(csv.lines().count(), 10);
        assert!(model.get_uidata().status_message.starts_with("Exported 9 rows"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn quit_from_table() {
        let mut model = model_with(1);
        model.update(None).unwrap();
        assert_eq!(model.status, Status::Ready);
        send(&mut model, Message::Quit);
        assert_eq!(model.status, Status::Quitting);
    }

    #[test]
    fn status_filter_shows_capitalised_label() {
        let mut model = model_with(6);
        send(&mut model, Message::CycleStatusFilter);
        assert_eq!(model.get_uidata().status_filter, "Active");
    }

    #[test]
    fn resize_narrows_the_input_line() {
        let mut model = model_with(12);
        send(&mut model, Message::Search);
        type_keys(&mut model, "campaign 1");
        assert_eq!(model.get_uidata().cmdline, ("campaign 1".to_string(), 10));

        send(&mut model, Message::Resize(6, 10));
        assert_eq!(model.get_uidata().cmdline, ("n 1".to_string(), 3));
    }
}
