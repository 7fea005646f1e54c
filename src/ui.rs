use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use crate::domain::{CMDMode, SortColumn};
use crate::model::{Model, UIData};
use crate::presentation::StyleClass;

pub const FILTER_BAR_HEIGHT: u16 = 3;
pub const FOOTER_HEIGHT: u16 = 1;
pub const CMDLINE_HEIGH: u16 = 1;
pub const COLUMN_SPACING: u16 = 1;

#[derive(Debug)]
pub struct TableUI {
    widths: Vec<Constraint>,
}

impl Default for TableUI {
    fn default() -> Self {
        Self::new()
    }
}

impl TableUI {
    pub fn new() -> Self {
        let widths = SortColumn::ALL
            .iter()
            .map(|column| match column {
                SortColumn::Campaign => Constraint::Fill(2),
                SortColumn::Channel => Constraint::Fill(1),
                SortColumn::Clicks => Constraint::Length(8),
                SortColumn::Conversions => Constraint::Length(13),
                SortColumn::Revenue => Constraint::Length(10),
                SortColumn::Ctr => Constraint::Length(7),
                SortColumn::Status => Constraint::Length(10),
                SortColumn::Date => Constraint::Length(10),
            })
            .collect();
        Self { widths }
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [filter_area, table_area, footer_area, cmd_area] = Layout::vertical([
            Constraint::Length(FILTER_BAR_HEIGHT),
            Constraint::Min(3),
            Constraint::Length(FOOTER_HEIGHT),
            Constraint::Length(CMDLINE_HEIGH),
        ])
        .areas(frame.area());

        self.draw_filter_bar(uidata, frame, filter_area);
        if uidata.loading {
            self.draw_placeholder(" Loading ... ", frame, table_area);
        } else if uidata.rows.is_empty() {
            self.draw_placeholder(" No campaigns match the current filters ", frame, table_area);
        } else {
            self.draw_table(uidata, frame, table_area);
        }
        self.draw_footer(uidata, frame, footer_area);
        self.draw_cmdline(uidata, frame, cmd_area);

        if uidata.show_popup {
            self.draw_popup(uidata, frame);
        }
    }

    fn draw_filter_bar(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let title = Line::from(" Campaign Performance ".bold());
        let search = if uidata.search_term.is_empty() {
            Span::from("Search campaigns...").dark_gray()
        } else {
            Span::from(uidata.search_term.clone()).yellow()
        };
        let line = Line::from(vec![
            " / ".blue().bold(),
            search,
            "   s ".blue().bold(),
            Span::from(uidata.status_filter.clone()),
            "   c ".blue().bold(),
            Span::from(uidata.channel_filter.clone()),
            "   e ".blue().bold(),
            "Export".into(),
        ]);
        let block = Block::bordered()
            .title(title)
            .title_bottom(Line::from(format!(" {} ", uidata.name)).right_aligned())
            .border_set(border::ROUNDED);
        frame.render_widget(Paragraph::new(line).block(block), area);
    }

    fn draw_table(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        let header = Row::new(uidata.headers.iter().enumerate().map(|(idx, h)| {
            let text = match h.sort {
                Some(direction) => format!("{} {} {}", idx + 1, h.label, direction.arrow()),
                None => format!("{} {}", idx + 1, h.label),
            };
            let style = if h.sort.is_some() {
                Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan)
            } else {
                Style::default().add_modifier(Modifier::BOLD)
            };
            Cell::from(text).style(style)
        }));

        let rows = uidata.rows.iter().map(|row| {
            let cells = row.cells.iter().zip(SortColumn::ALL).map(|(text, column)| {
                if column == SortColumn::Status {
                    Cell::from(Span::styled(text.clone(), badge_style(row.badge.class)))
                } else if column.is_numeric() {
                    Cell::from(Text::from(text.clone()).alignment(Alignment::Right))
                } else {
                    Cell::from(text.clone())
                }
            });
            Row::new(cells)
        });

        let table = Table::new(rows, self.widths.clone())
            .header(header)
            .column_spacing(COLUMN_SPACING)
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .block(Block::bordered().border_set(border::PLAIN));

        let mut state = TableState::default().with_selected(Some(uidata.selected_row));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn draw_placeholder(&self, text: &str, frame: &mut Frame, area: Rect) {
        let paragraph = Paragraph::new(Line::from(Span::from(text.to_string()).italic()).centered())
            .block(Block::bordered().border_set(border::PLAIN));
        frame.render_widget(paragraph, area);
    }

    // Pagination only shows up when there is more than one page.
    fn draw_footer(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.loading || uidata.window.total_pages <= 1 {
            frame.render_widget(Paragraph::new(Line::from(uidata.summary.clone()).dark_gray()), area);
            return;
        }
        let window = uidata.window;
        let previous = if window.has_previous() {
            "< Previous".blue()
        } else {
            "< Previous".dark_gray()
        };
        let next = if window.has_next() {
            "Next >".blue()
        } else {
            "Next >".dark_gray()
        };
        let line = Line::from(vec![
            Span::from(uidata.summary.clone()).dark_gray(),
            "   ".into(),
            previous,
            format!("  Page {}/{}  ", window.page, window.total_pages).into(),
            next,
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_cmdline(&self, uidata: &UIData, frame: &mut Frame, area: Rect) {
        if uidata.active_cmdinput {
            let prompt = match uidata.cmd_mode {
                Some(CMDMode::GotoPage) => "page: ",
                _ => "/",
            };
            let (shown, curser) = &uidata.cmdline;
            let line = Line::from(vec![prompt.blue().bold(), Span::from(shown.clone())]);
            frame.render_widget(Paragraph::new(line), area);
            let x = area.x + (prompt.chars().count() + curser) as u16;
            frame.set_cursor_position((x.min(area.right().saturating_sub(1)), area.y));
        } else {
            let line = Line::from(vec![
                Span::from(uidata.status_message.clone()),
                "  ? help  q quit".dark_gray(),
            ]);
            frame.render_widget(Paragraph::new(line), area);
        }
    }

    fn draw_popup(&self, uidata: &UIData, frame: &mut Frame) {
        let area = popup_area(frame.area(), 60, 80);
        let block = Block::bordered()
            .title(Line::from(" Help ".bold()).centered())
            .title_bottom(Line::from(" <Esc> close ").centered())
            .border_set(border::THICK);
        let paragraph = Paragraph::new(uidata.popup_message.clone())
            .block(block)
            .wrap(Wrap { trim: false });
        frame.render_widget(Clear, area);
        frame.render_widget(paragraph, area);
    }
}

pub fn badge_style(class: StyleClass) -> Style {
    match class {
        StyleClass::Positive => Style::default().fg(Color::Green),
        StyleClass::Warning => Style::default().fg(Color::Yellow),
        StyleClass::Muted => Style::default().fg(Color::Gray),
    }
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [area] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(area);
    area
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::domain::Message;
    use crate::table::Dataset;
    use ratatui::{Terminal, backend::TestBackend};

    fn render(model: &Model) -> String {
        let ui = TableUI::new();
        let mut terminal = Terminal::new(TestBackend::new(120, 20)).unwrap();
        terminal.draw(|f| ui.draw(model, f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn renders_loading_placeholder() {
        let model = Model::init(&GridConfig::default(), 120);
        assert!(render(&model).contains("Loading ..."));
    }

    #[test]
    fn renders_first_page_with_pagination() {
        let mut model = Model::init(&GridConfig::default(), 120);
        model.load_dataset(Dataset::sample());
        let screen = render(&model);
        assert!(screen.contains("Retargeting Campaign"));
        assert!(screen.contains("$19,650"));
        assert!(screen.contains("Date ▼"));
        assert!(screen.contains("Showing 1 to 5 of 6 results"));
        assert!(screen.contains("Page 1/2"));
        assert!(!screen.contains("Black Friday Special"));
    }

    #[test]
    fn renders_empty_result_message() {
        let mut model = Model::init(&GridConfig::default().with_search("nothing matches"), 120);
        model.load_dataset(Dataset::sample());
        assert!(render(&model).contains("No campaigns match the current filters"));
    }

    #[test]
    fn renders_help_popup() {
        let mut model = Model::init(&GridConfig::default(), 120);
        model.load_dataset(Dataset::sample());
        model.update(Some(Message::Help)).unwrap();
        assert!(render(&model).contains("Cycle status filter"));
    }
}
