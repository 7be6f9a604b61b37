use std::time::Duration;

pub(crate) const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
pub(crate) const TICK_RATE: Duration = Duration::from_millis(200);
pub(crate) const STATUS_TTL: Duration = Duration::from_secs(5);

pub(crate) const COMMAND_HELP: &str = concat!(
    "Commands: /help, /add <text>, /edit [id] [text], /done [id], /undo [id], ",
    "/delete [id], /filter (clear), /search <text>, /sort <key>, /view <status>, ",
    "/category <name|all>, /calendar, /refresh, /health, /backup, /quit"
);

pub(crate) const STATUS_ENTER_ADD: &str =
    "New task: title with #category p:priority due:DATE prog:N -- description (Esc to cancel)";
pub(crate) const STATUS_ENTER_EDIT: &str =
    "Edit task: adjust the text, Enter saves, omitted fields reset (Esc to cancel)";
pub(crate) const STATUS_ENTER_SEARCH: &str =
    "Search title and description: results update as you type • Enter keep • Esc restore";
pub(crate) const STATUS_COMMAND_PALETTE: &str =
    "Type a /command • Up/Down: navigate • Tab/Right: complete • Enter: run • Esc: cancel";
pub(crate) const STATUS_FILTER_PICKER: &str =
    "Filter picker • ←/→ column • ↑/↓ move • Space select • C resets • Enter apply • Esc cancel";
pub(crate) const STATUS_REFRESHING: &str = "Refreshing tasks…";
pub(crate) const STATUS_VIEW_DETAILS: &str = "Viewing task details • Enter/Esc to close";
pub(crate) const STATUS_HELP: &str = "Keyboard reference • Enter/Esc to close";
pub(crate) const STATUS_CONFIRM_DELETE: &str =
    "Confirm deletion • arrows choose, Enter confirms, Esc cancels";
pub(crate) const STATUS_REORDER_MANUAL: &str =
    "Reordering needs manual order: press 'o' until the sort shows Manual";
