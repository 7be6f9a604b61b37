use tasklist_core::{Category, FilterPatch, SortKey, StatusFilter, TaskGateway};

use crate::tui::constants::{COMMAND_HELP, STATUS_REFRESHING};

use super::{App, InputMode, TABS};

#[derive(Debug, Clone)]
pub(crate) struct Suggestion {
    pub(crate) fill: String,
    pub(crate) label: String,
}

impl Suggestion {
    fn new(fill: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            fill: fill.into(),
            label: label.into(),
        }
    }
}

impl<G: TaskGateway + 'static> App<G> {
    pub(crate) fn run_command(&mut self) {
        let raw = self.input.as_str().trim().to_string();
        let Some(body) = raw.strip_prefix('/') else {
            self.set_status_error("Commands must start with '/'");
            self.finish_command();
            return;
        };
        let mut parts = body.split_whitespace();
        let Some(cmd) = parts.next().map(str::to_ascii_lowercase) else {
            self.set_status_error("Enter a command after '/'");
            self.finish_command();
            return;
        };
        let rest: Vec<&str> = parts.collect();

        // Leave the palette first so a command can open its own mode.
        self.finish_command();

        match cmd.as_str() {
            "help" | "h" => self.set_status_info(COMMAND_HELP),
            "add" => {
                if rest.is_empty() {
                    self.start_add();
                } else {
                    self.input_mode = InputMode::Add;
                    self.input.set(rest.join(" "));
                    self.add_task();
                }
            }
            "edit" => match rest.split_first() {
                None => self.start_edit_current(),
                Some((id, [])) => self.start_edit_by_id(id),
                Some((id, text)) => {
                    self.edit_task_with_text(id, &text.join(" "));
                }
            },
            "done" | "undo" => {
                let completed = cmd == "done";
                match rest.first() {
                    Some(id) => self.set_completed_by_id(id, completed),
                    None => match self.selected_task().map(|task| task.id.clone()) {
                        Some(id) => self.set_completed_by_id(&id, completed),
                        None => self.set_status_info("Nothing selected"),
                    },
                }
            }
            "delete" | "del" | "rm" => match rest.first() {
                Some(id) => self.delete_by_id(id),
                None => self.prompt_delete(),
            },
            "filter" => match rest.first() {
                None => self.open_filter_overlay(),
                Some(arg) if arg.eq_ignore_ascii_case("clear") || arg.eq_ignore_ascii_case("off") => {
                    self.apply_search_now(String::new());
                    self.apply_filter_selection(Default::default());
                    self.set_status_info("Cleared filters");
                }
                Some(_) => self.set_status_error(
                    "Usage: /filter or /filter clear (use /search, /sort, /view, /category)",
                ),
            },
            "search" | "find" => {
                let text = rest.join(" ");
                self.apply_search_now(text);
                let status = self.filter_status_text("Filters", "Search cleared");
                self.set_status_info(status);
            }
            "sort" => match rest.first().map(|key| key.parse::<SortKey>()) {
                Some(Ok(sort)) => self.set_sort(sort),
                Some(Err(err)) => self.set_status_error(err.to_string()),
                None => self.cycle_sort(),
            },
            "view" | "tab" | "status" => match rest.first().map(|s| s.parse::<StatusFilter>()) {
                Some(Ok(status)) => self.set_status_filter(status),
                Some(Err(err)) => self.set_status_error(err.to_string()),
                None => self.set_status_error("Usage: /view all|active|completed"),
            },
            "category" | "cat" => match rest.first() {
                Some(name) if name.eq_ignore_ascii_case("all") => {
                    self.controller.set_filter(FilterPatch::category(None));
                    self.sync_view();
                }
                Some(name) => match name.parse::<Category>() {
                    Ok(category) => {
                        self.controller
                            .set_filter(FilterPatch::category(Some(category)));
                        self.sync_view();
                    }
                    Err(err) => self.set_status_error(err.to_string()),
                },
                None => self.set_status_error("Usage: /category <name|all>"),
            },
            "calendar" | "cal" => self.toggle_calendar(),
            "refresh" | "r" => {
                self.request_refresh();
                self.set_status_info(STATUS_REFRESHING);
            }
            "health" => self.check_health(),
            "backup" => self.create_backup(),
            "quit" | "q" | "exit" => self.should_quit = true,
            unknown => self.set_status_error(format!("Unknown command: {unknown} (try /help)")),
        }
    }

    pub(crate) fn finish_command(&mut self) {
        self.input.clear();
        self.suggestions.clear();
        self.suggestion_index = 0;
        self.input_mode = InputMode::Normal;
    }

    pub(crate) fn update_command_suggestions(&mut self) {
        self.suggestions = build_command_suggestions(self.input.as_str(), self.selected_id());
        if self.suggestion_index >= self.suggestions.len() {
            self.suggestion_index = 0;
        }
    }

    pub(crate) fn accept_suggestion(&mut self) {
        if let Some(s) = self.suggestions.get(self.suggestion_index) {
            self.input.set(s.fill.clone());
            self.update_command_suggestions();
        }
    }

    fn selected_id(&self) -> Option<&str> {
        self.selected_task().map(|task| task.id.as_str())
    }
}

fn build_command_suggestions(raw: &str, selected: Option<&str>) -> Vec<Suggestion> {
    let Some(without) = raw.strip_prefix('/') else {
        return Vec::new();
    };
    let without = without.trim_start();
    let mut tokens = without.split_whitespace();
    let first = tokens.next().unwrap_or("").to_ascii_lowercase();
    let rest = tokens.collect::<Vec<_>>().join(" ");
    let typing_args = without.contains(' ');

    if !typing_args {
        let base = vec![
            Suggestion::new("/help", "❓ Help: list commands"),
            Suggestion::new("/add ", "✚ Add a task"),
            Suggestion::new("/edit", "✏️ Edit selected (or id)"),
            Suggestion::new("/done", "✅ Complete selected (or id)"),
            Suggestion::new("/undo", "↩️ Reopen selected (or id)"),
            Suggestion::new("/delete", "🗑️ Delete selected (or id)"),
            Suggestion::new("/search ", "🔎 Search title and description"),
            Suggestion::new("/sort ", "↕️ Sort by due/priority/created/manual"),
            Suggestion::new("/view ", "👀 Show all/active/completed"),
            Suggestion::new("/category ", "🏷️ Limit to one category"),
            Suggestion::new("/filter", "🔍 Open the filter picker"),
            Suggestion::new("/calendar", "📅 Toggle calendar view"),
            Suggestion::new("/refresh", "🔄 Reload from the server"),
            Suggestion::new("/health", "💓 Check the server"),
            Suggestion::new("/backup", "💾 Back up server storage"),
            Suggestion::new("/quit", "🚪 Quit the application"),
        ];
        return base
            .into_iter()
            .filter(|s| s.fill[1..].starts_with(&first))
            .collect();
    }

    let partial = rest.trim().to_ascii_lowercase();
    let complete = |command: &str, options: &[(&str, &str)]| -> Vec<Suggestion> {
        options
            .iter()
            .filter(|(name, _)| partial.is_empty() || name.starts_with(&partial))
            .map(|(name, label)| Suggestion::new(format!("/{command} {name}"), *label))
            .collect()
    };

    match first.as_str() {
        "view" | "tab" | "status" => {
            let options: Vec<(&str, &str)> = TABS
                .iter()
                .map(|tab| (tab.status.as_str(), tab.description))
                .collect();
            complete("view", &options)
        }
        "sort" => {
            let options: Vec<(&str, &str)> =
                SortKey::ALL.iter().map(|key| (key.as_str(), key.label())).collect();
            complete("sort", &options)
        }
        "category" | "cat" => {
            let mut options = vec![("all", "Every category")];
            options.extend(Category::ALL.iter().map(|c| (c.as_str(), "Only this category")));
            complete("category", &options)
        }
        "filter" => complete(
            "filter",
            &[("clear", "🧹 Reset status, category, search and sort")],
        ),
        "add" => {
            if partial.is_empty() {
                vec![Suggestion::new("/add ", "Enter task details…")]
            } else {
                vec![Suggestion::new(format!("/add {}", rest.trim()), "Add this task")]
            }
        }
        "done" | "undo" | "delete" | "del" | "rm" | "edit" => match selected {
            Some(id) if partial.is_empty() => {
                vec![Suggestion::new(format!("/{first} {id}"), "Use selected task id")]
            }
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn fills(raw: &str, selected: Option<&str>) -> Vec<String> {
        build_command_suggestions(raw, selected)
            .into_iter()
            .map(|s| s.fill)
            .collect()
    }

    #[test]
    fn prefix_narrows_base_commands() {
        assert_eq!(fills("/s", None), vec!["/search ", "/sort "]);
        assert_eq!(fills("/ba", None), vec!["/backup"]);
        assert!(fills("plain text", None).is_empty());
    }

    #[test]
    fn arguments_complete_from_known_values() {
        assert_eq!(fills("/sort p", None), vec!["/sort priority"]);
        assert_eq!(fills("/view ", None).len(), 3);
        assert_eq!(fills("/category sh", None), vec!["/category shopping"]);
    }

    #[test]
    fn id_commands_offer_the_selection() {
        assert_eq!(fills("/done ", Some("7")), vec!["/done 7"]);
        assert!(fills("/done ", None).is_empty());
        assert!(fills("/done 3", Some("7")).is_empty());
    }
}
