use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tasklist_core::TaskGateway;

use crate::tui::constants::{STATUS_COMMAND_PALETTE, STATUS_REFRESHING};

use super::{App, ConfirmChoice, InputMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NormalAction {
    Quit,
    EnterAdd,
    EnterEdit,
    EnterSearch,
    EnterCommand,
    ShowDetails,
    ShowHelp,
    Refresh,
    OpenFilter,
    CycleSort,
    ToggleCalendar,
    ToggleDone,
    Delete,
    MoveUp,
    MoveDown,
    SelectNext,
    SelectPrev,
    PrevTab,
    NextTab,
    SelectFirst,
    SelectLast,
}

impl NormalAction {
    fn from_event(key: &KeyEvent) -> Option<Self> {
        if matches!(key.code, KeyCode::Char('c')) && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Some(Self::Quit);
        }

        match key.code {
            KeyCode::Char('q') => Some(Self::Quit),
            KeyCode::Char('a') => Some(Self::EnterAdd),
            KeyCode::Char('e') => Some(Self::EnterEdit),
            KeyCode::Char('s') => Some(Self::EnterSearch),
            KeyCode::Char('/') => Some(Self::EnterCommand),
            KeyCode::Char('r') => Some(Self::Refresh),
            KeyCode::Char('f') => Some(Self::OpenFilter),
            KeyCode::Char('o') => Some(Self::CycleSort),
            KeyCode::Char('c') => Some(Self::ToggleCalendar),
            KeyCode::Char('h') | KeyCode::Char('?') => Some(Self::ShowHelp),
            KeyCode::Char(' ') => Some(Self::ToggleDone),
            KeyCode::Char('x') | KeyCode::Delete => Some(Self::Delete),
            KeyCode::Char('K') => Some(Self::MoveUp),
            KeyCode::Char('J') => Some(Self::MoveDown),
            KeyCode::Char('j') | KeyCode::Down => Some(Self::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Self::SelectPrev),
            KeyCode::Left | KeyCode::BackTab => Some(Self::PrevTab),
            KeyCode::Char('l') | KeyCode::Right | KeyCode::Tab => Some(Self::NextTab),
            KeyCode::Enter => Some(Self::ShowDetails),
            KeyCode::Home => Some(Self::SelectFirst),
            KeyCode::End => Some(Self::SelectLast),
            _ => None,
        }
    }
}

impl<G: TaskGateway + 'static> App<G> {
    pub(crate) fn on_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.input_mode {
            InputMode::Normal => self.handle_normal_mode(key),
            InputMode::Add => self.handle_add_mode(key),
            InputMode::Edit => self.handle_edit_mode(key),
            InputMode::Command => self.handle_command_mode(key),
            InputMode::Search => self.handle_search_mode(key),
            InputMode::Filter => self.handle_filter_mode(key),
            InputMode::Inspect | InputMode::Help => self.handle_overlay_mode(key),
            InputMode::ConfirmDelete => self.handle_confirm_delete_mode(key),
        }
        Ok(())
    }

    fn handle_normal_mode(&mut self, key: KeyEvent) {
        if let Some(action) = NormalAction::from_event(&key) {
            self.execute_normal_action(action);
        }
    }

    fn execute_normal_action(&mut self, action: NormalAction) {
        match action {
            NormalAction::Quit => self.should_quit = true,
            NormalAction::EnterAdd => self.start_add(),
            NormalAction::EnterEdit => self.start_edit_current(),
            NormalAction::EnterSearch => self.start_search(),
            NormalAction::EnterCommand => {
                self.input_mode = InputMode::Command;
                self.input.set("/");
                self.update_command_suggestions();
                self.set_status_info(STATUS_COMMAND_PALETTE);
            }
            NormalAction::ShowDetails => self.show_selected_details(),
            NormalAction::ShowHelp => self.show_help_overlay(),
            NormalAction::Refresh => {
                self.request_refresh();
                self.set_status_info(STATUS_REFRESHING);
            }
            NormalAction::OpenFilter => self.open_filter_overlay(),
            NormalAction::CycleSort => self.cycle_sort(),
            NormalAction::ToggleCalendar => self.toggle_calendar(),
            NormalAction::ToggleDone => self.toggle_selected(),
            NormalAction::Delete => self.prompt_delete(),
            NormalAction::MoveUp => self.move_selected(false),
            NormalAction::MoveDown => self.move_selected(true),
            NormalAction::SelectNext => self.select_next(),
            NormalAction::SelectPrev => self.select_prev(),
            NormalAction::PrevTab => self.prev_tab(),
            NormalAction::NextTab => self.next_tab(),
            NormalAction::SelectFirst => self.select_row(0),
            NormalAction::SelectLast => self.select_row(self.view.len().saturating_sub(1)),
        }
    }

    fn select_row(&mut self, row: usize) {
        if row < self.view.len() {
            self.selected = row;
            self.table_state.select(Some(row));
        }
    }

    /// Return to the task list, dropping whatever the prompt held.
    fn leave_prompt(&mut self) {
        self.input.clear();
        self.input_mode = InputMode::Normal;
    }

    /// Cursor movement and editing shared by every text prompt. Returns
    /// whether the buffer contents changed.
    fn edit_input(&mut self, key: &KeyEvent) -> bool {
        match key.code {
            KeyCode::Backspace => {
                self.input.backspace();
                true
            }
            KeyCode::Delete => {
                self.input.delete_char();
                true
            }
            KeyCode::Char(c) => {
                self.input.insert_char(c);
                true
            }
            KeyCode::Left => {
                self.input.move_left();
                false
            }
            KeyCode::Right => {
                self.input.move_right();
                false
            }
            KeyCode::Home => {
                self.input.move_home();
                false
            }
            KeyCode::End => {
                self.input.move_end();
                false
            }
            _ => false,
        }
    }

    fn handle_add_mode(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.add_task(),
            KeyCode::Esc => {
                self.leave_prompt();
                self.status = None;
            }
            _ => {
                self.edit_input(&key);
            }
        }
    }

    fn handle_edit_mode(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.apply_edit(),
            KeyCode::Esc => self.cancel_edit(),
            _ => {
                self.edit_input(&key);
            }
        }
    }

    fn handle_search_mode(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let text = self.input.as_str().trim().to_string();
                self.leave_prompt();
                self.apply_search_now(text);
                let status = self.filter_status_text("Filters", "Search cleared");
                self.set_status_info(status);
            }
            KeyCode::Esc => {
                let previous = std::mem::take(&mut self.search_before);
                self.leave_prompt();
                self.apply_search_now(previous);
                self.status = None;
            }
            _ => {
                if self.edit_input(&key) {
                    let text = self.input.as_str().to_string();
                    self.schedule_search(text);
                }
            }
        }
    }

    fn handle_filter_mode(&mut self, key: KeyEvent) {
        let Some(overlay) = self.filter_overlay.as_mut() else {
            self.input_mode = InputMode::Normal;
            return;
        };

        match key.code {
            KeyCode::Left | KeyCode::BackTab => overlay.prev_column(),
            KeyCode::Right | KeyCode::Tab => overlay.next_column(),
            KeyCode::Up => overlay.prev_row(),
            KeyCode::Down => overlay.next_row(),
            KeyCode::Char(' ') => overlay.toggle_current(),
            KeyCode::Char('c') | KeyCode::Char('C') => {
                overlay.clear_all();
                self.set_status_info("Reset filter selections • press Enter to apply");
            }
            KeyCode::Enter | KeyCode::Esc => self.close_filter_picker(key.code == KeyCode::Enter),
            _ => {}
        }
    }

    fn close_filter_picker(&mut self, apply: bool) {
        let Some(overlay) = self.filter_overlay.take() else {
            return;
        };
        self.input_mode = InputMode::Normal;
        let status = if apply {
            self.apply_filter_selection(overlay.commit());
            self.filter_status_text("Applied filters", "Cleared filters")
        } else {
            self.apply_filter_selection(overlay.cancel());
            self.filter_status_text("Filters unchanged", "Filters unchanged")
        };
        self.set_status_info(status);
    }

    fn handle_overlay_mode(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
            self.inspect_task = None;
            self.input_mode = InputMode::Normal;
            self.status = None;
        }
    }

    fn handle_confirm_delete_mode(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') => {
                self.confirm_choice = self.confirm_choice.toggle();
            }
            KeyCode::Char('y') => self.resolve_delete(true),
            KeyCode::Enter => self.resolve_delete(self.confirm_choice == ConfirmChoice::Yes),
            KeyCode::Esc => self.resolve_delete(false),
            _ => {}
        }
    }

    fn resolve_delete(&mut self, confirmed: bool) {
        self.input_mode = InputMode::Normal;
        if confirmed {
            self.perform_delete();
        } else {
            self.set_status_info("Deletion cancelled");
        }
    }

    fn handle_command_mode(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                if let Some(s) = self.suggestions.get(self.suggestion_index).cloned() {
                    self.input.set(s.fill.clone());
                    if s.fill.ends_with(' ') {
                        self.update_command_suggestions();
                        return;
                    }
                }
                self.run_command();
            }
            KeyCode::Esc => {
                self.leave_prompt();
                self.suggestions.clear();
                self.status = None;
            }
            KeyCode::Tab | KeyCode::Right => self.accept_suggestion(),
            KeyCode::Up => self.step_suggestion(false),
            KeyCode::Down => self.step_suggestion(true),
            _ => {
                if self.edit_input(&key) {
                    self.update_command_suggestions();
                }
            }
        }
    }

    fn step_suggestion(&mut self, forward: bool) {
        let count = self.suggestions.len();
        if count == 0 {
            return;
        }
        self.suggestion_index = if forward {
            (self.suggestion_index + 1) % count
        } else {
            (self.suggestion_index + count - 1) % count
        };
    }
}
