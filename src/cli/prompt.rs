//! Prompt, highlighter, and completion for the REPL.
//!
//! Type "/" then Tab to see commands. Menu filters as you type.

use nu_ansi_term::{Color, Style};
use reedline::{
    ColumnarMenu, Completer, Emacs, Highlighter, KeyCode, KeyModifiers, MenuBuilder, Prompt,
    PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus, Reedline, ReedlineEvent,
    ReedlineMenu, Span, StyledText, Suggestion,
};
use std::borrow::Cow;

/// All slash commands with descriptions.
pub const COMMANDS: &[(&str, &str)] = &[
    ("/attach", "Upload an image or PDF for your next question"),
    ("/chats", "List your conversations"),
    ("/clear", "Clear screen"),
    ("/connect", "Reconnect to the server"),
    ("/detach", "Remove the staged attachment"),
    ("/exit", "Exit"),
    ("/help", "Show help"),
    ("/more", "Fetch more conversations"),
    ("/new", "Start a new conversation"),
    ("/open", "Open a conversation from the list"),
    ("/quit", "Exit"),
    ("/version", "Version info"),
];

/// Satchel prompt: curriculum scope plus a connection badge.
pub struct SatchelPrompt {
    pub curriculum: String,
    pub class_level: String,
    pub connected: bool,
}

impl SatchelPrompt {
    pub fn new(curriculum: &str, class_level: &str, connected: bool) -> Self {
        Self {
            curriculum: curriculum.to_string(),
            class_level: class_level.to_string(),
            connected,
        }
    }
}

impl Prompt for SatchelPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        let badge = if self.connected {
            "\x1b[32m●\x1b[0m"
        } else {
            "\x1b[31m○\x1b[0m"
        };
        Cow::Owned(format!(
            "{} \x1b[1;33m{}\x1b[0m \x1b[2m[{}]\x1b[0m",
            badge, self.curriculum, self.class_level
        ))
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed(" ❯ ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(&self, hs: PromptHistorySearch) -> Cow<'_, str> {
        let prefix = match hs.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!("({}search: {}) ", prefix, hs.term))
    }
}

/// Syntax highlighter for slash commands.
#[derive(Clone)]
pub struct SatchelHighlighter;

impl Highlighter for SatchelHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled = StyledText::new();

        if line.starts_with('/') {
            let cmd_end = line.find(' ').unwrap_or(line.len());
            let cmd = &line[..cmd_end];
            let is_valid = COMMANDS.iter().any(|(c, _)| *c == cmd);

            if is_valid {
                styled.push((Style::new().fg(Color::Cyan).bold(), cmd.to_string()));
            } else {
                styled.push((Style::new().fg(Color::Yellow), cmd.to_string()));
            }

            if cmd_end < line.len() {
                styled.push((Style::default(), line[cmd_end..].to_string()));
            }
        } else {
            styled.push((Style::default(), line.to_string()));
        }

        styled
    }
}

/// Completer for slash commands.
#[derive(Clone, Default)]
pub struct SatchelCompleter;

impl Completer for SatchelCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        if pos > line.len() {
            return Vec::new();
        }
        let input = &line[..pos];
        if input.is_empty() || !input.starts_with('/') || input.contains(' ') {
            return Vec::new();
        }

        COMMANDS
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(input))
            .map(|(cmd, description)| Suggestion {
                value: cmd.to_string(),
                description: Some(description.to_string()),
                extra: None,
                span: Span::new(0, pos),
                append_whitespace: true,
                style: None,
            })
            .collect()
    }
}

/// Build the line editor with completion menu and highlighting.
pub fn create_reedline(completer: SatchelCompleter) -> Reedline {
    let completion_menu = Box::new(
        ColumnarMenu::default()
            .with_name("completion_menu")
            .with_columns(1)
            .with_column_padding(2)
            .with_text_style(Style::new().fg(Color::Default))
            .with_selected_text_style(Style::new().fg(Color::Black).on(Color::Cyan))
            .with_description_text_style(Style::new().fg(Color::DarkGray)),
    );

    let mut keybindings = reedline::default_emacs_keybindings();

    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::UntilFound(vec![
            ReedlineEvent::Menu("completion_menu".to_string()),
            ReedlineEvent::MenuNext,
        ]),
    );

    keybindings.add_binding(
        KeyModifiers::SHIFT,
        KeyCode::BackTab,
        ReedlineEvent::MenuPrevious,
    );

    Reedline::create()
        .with_completer(Box::new(completer))
        .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
        .with_quick_completions(true)
        .with_partial_completions(true)
        .with_highlighter(Box::new(SatchelHighlighter))
        .with_edit_mode(Box::new(Emacs::new(keybindings)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_shows_scope_and_badge() {
        let prompt = SatchelPrompt::new("Physics", "SSS 1", true);
        let left = prompt.render_prompt_left();
        assert!(left.contains("Physics"));
        assert!(left.contains("SSS 1"));
        assert!(left.contains('●'));

        let offline = SatchelPrompt::new("Physics", "SSS 1", false);
        assert!(offline.render_prompt_left().contains('○'));
    }

    #[test]
    fn test_completer_filters_by_prefix() {
        let mut completer = SatchelCompleter;
        let suggestions = completer.complete("/c", 2);
        let values: Vec<&str> = suggestions.iter().map(|s| s.value.as_str()).collect();
        assert!(values.contains(&"/chats"));
        assert!(values.contains(&"/clear"));
        assert!(values.contains(&"/connect"));
        assert!(!values.contains(&"/help"));
    }

    #[test]
    fn test_completer_silent_after_command() {
        let mut completer = SatchelCompleter;
        assert!(completer.complete("/open 2", 7).is_empty());
        assert!(completer.complete("plain text", 5).is_empty());
    }

    #[test]
    fn test_highlighter_marks_unknown_commands() {
        let highlighter = SatchelHighlighter;
        let styled = highlighter.highlight("/frobnicate", 0);
        assert_eq!(styled.buffer[0].0.foreground, Some(Color::Yellow));

        let styled = highlighter.highlight("/help", 0);
        assert_eq!(styled.buffer[0].0.foreground, Some(Color::Cyan));
    }

    #[test]
    fn test_commands_sorted_and_unique() {
        let mut names: Vec<&str> = COMMANDS.iter().map(|(c, _)| *c).collect();
        let original = names.clone();
        names.sort();
        names.dedup();
        assert_eq!(names, original);
    }
}
