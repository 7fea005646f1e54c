use std::time::Duration;
use tracing::trace;

use crate::config::GridConfig;
use crate::domain::{GridError, Message, SortColumn};
use crate::model::Model;
use ratatui::crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &GridConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, GridError> {
        if event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(match event::read()? {
                Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                    if model.raw_keyevents() {
                        Some(Message::RawKey(key))
                    } else {
                        self.handle_key(key)
                    }
                }
                Event::Resize(width, height) => Some(Message::Resize(width as usize, height as usize)),
                _ => None,
            });
        }
        Ok(None)
    }

    pub fn handle_key(&self, key: KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('?'), _) | (KeyCode::F(1), _) => Some(Message::Help),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Char('/'), _) => Some(Message::Search),
            (KeyCode::Char('g'), _) => Some(Message::GotoPage),
            (KeyCode::Char('s'), _) => Some(Message::CycleStatusFilter),
            (KeyCode::Char('c'), _) => Some(Message::CycleChannelFilter),
            (KeyCode::Char('r'), _) => Some(Message::ResetFilters),
            (KeyCode::Char('e'), _) => Some(Message::Export),
            (KeyCode::Left, _) | (KeyCode::Char('p'), _) | (KeyCode::PageUp, _) => {
                Some(Message::PreviousPage)
            }
            (KeyCode::Right, _) | (KeyCode::Char('n'), _) | (KeyCode::PageDown, _) => {
                Some(Message::NextPage)
            }
            (KeyCode::Home, _) => Some(Message::FirstPage),
            (KeyCode::End, _) => Some(Message::LastPage),
            (KeyCode::Up, _) | (KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Down, _) | (KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::Char(chr), _) if chr.is_ascii_digit() => chr
                .to_digit(10)
                .and_then(|d| (d as usize).checked_sub(1))
                .and_then(SortColumn::from_index)
                .map(Message::SortBy),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
