use punchcard_core::{NoticeLevel, UiHooks};
use tracing::debug;

/// Notices go to stderr so command output stays pipeable.
pub struct TerminalHooks;

impl UiHooks for TerminalHooks {
    fn set_loading(&self, indicator: &str, visible: bool) {
        debug!(indicator = indicator, visible = visible, "Loading indicator");
    }

    fn notify(&self, message: &str, level: NoticeLevel) {
        let prefix = match level {
            NoticeLevel::Info => "",
            NoticeLevel::Success => "✓ ",
            NoticeLevel::Warning => "! ",
            NoticeLevel::Error => "✗ ",
        };
        eprintln!("{}{}", prefix, message);
    }
}
