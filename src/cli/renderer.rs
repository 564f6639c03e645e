//! Terminal renderer for the conversation transcript.
//!
//! Assistant answers are markdown: headers, lists, inline styles, and
//! fenced code blocks highlighted through syntect. User and system
//! messages render as plain styled lines.

use crossterm::{
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    ExecutableCommand,
};
use std::io::stdout;
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

use crate::chat::{DisplayMessage, Role};

/// Render style configuration.
#[derive(Debug, Clone)]
pub struct RenderStyle {
    pub user_color: Color,
    pub assistant_color: Color,
    pub system_color: Color,
    pub accent_color: Color,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            user_color: Color::Green,
            assistant_color: Color::Cyan,
            system_color: Color::Yellow,
            accent_color: Color::Magenta,
        }
    }
}

/// Terminal renderer for transcript messages.
pub struct TranscriptRenderer {
    style: RenderStyle,
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl TranscriptRenderer {
    pub fn new() -> Self {
        Self {
            style: RenderStyle::default(),
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }

    /// Render one transcript message.
    pub fn render_message(&self, message: &DisplayMessage) -> std::io::Result<()> {
        match message.role {
            Role::User => self.render_user(message),
            Role::Assistant => self.render_assistant(message),
            Role::System => self.render_system(message),
        }
    }

    fn header(&self, label: &str, color: Color, message: &DisplayMessage) -> std::io::Result<()> {
        let when = message.sent_at.with_timezone(&chrono::Local);
        stdout()
            .execute(SetForegroundColor(color))?
            .execute(SetAttribute(Attribute::Bold))?
            .execute(Print(label))?
            .execute(SetAttribute(Attribute::Reset))?
            .execute(SetForegroundColor(Color::DarkGrey))?
            .execute(Print(format!("  {}\n", when.format("%H:%M"))))?
            .execute(ResetColor)?;
        Ok(())
    }

    fn render_user(&self, message: &DisplayMessage) -> std::io::Result<()> {
        self.header("You", self.style.user_color, message)?;
        println!("{}", message.text);
        if let Some(attachment) = &message.attachment {
            stdout()
                .execute(SetForegroundColor(Color::DarkGrey))?
                .execute(Print(format!(
                    "📎 {}: {}\n",
                    attachment.kind.label(),
                    attachment.url
                )))?
                .execute(ResetColor)?;
        }
        println!();
        Ok(())
    }

    fn render_assistant(&self, message: &DisplayMessage) -> std::io::Result<()> {
        self.header("Tutor", self.style.assistant_color, message)?;
        self.render_markdown(&message.text)?;
        println!();
        Ok(())
    }

    fn render_system(&self, message: &DisplayMessage) -> std::io::Result<()> {
        stdout()
            .execute(SetForegroundColor(self.style.system_color))?
            .execute(Print(format!("⚠ {}\n", message.text)))?
            .execute(ResetColor)?;
        println!();
        Ok(())
    }

    /// Render markdown content with proper formatting.
    pub fn render_markdown(&self, content: &str) -> std::io::Result<()> {
        let mut in_code_block = false;
        let mut code_lang = String::new();
        let mut code_buffer = String::new();

        for line in content.lines() {
            if let Some(rest) = line.strip_prefix("```") {
                if in_code_block {
                    self.render_code_block(&code_lang, &code_buffer)?;
                    code_buffer.clear();
                    code_lang.clear();
                    in_code_block = false;
                } else {
                    in_code_block = true;
                    code_lang = rest.trim().to_string();
                }
            } else if in_code_block {
                code_buffer.push_str(line);
                code_buffer.push('\n');
            } else {
                self.render_markdown_line(line)?;
            }
        }

        // Handle unclosed code block
        if in_code_block && !code_buffer.is_empty() {
            self.render_code_block(&code_lang, &code_buffer)?;
        }

        Ok(())
    }

    /// Render a single line of markdown.
    fn render_markdown_line(&self, line: &str) -> std::io::Result<()> {
        let mut stdout = stdout();

        // Headers
        for prefix in ["### ", "## ", "# "] {
            if let Some(rest) = line.strip_prefix(prefix) {
                stdout
                    .execute(SetForegroundColor(self.style.assistant_color))?
                    .execute(SetAttribute(Attribute::Bold))?
                    .execute(Print(rest))?
                    .execute(SetAttribute(Attribute::Reset))?
                    .execute(Print("\n"))?;
                return Ok(());
            }
        }

        // Bullet lists
        if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            stdout
                .execute(SetForegroundColor(Color::Yellow))?
                .execute(Print("• "))?
                .execute(ResetColor)?;
            self.render_inline_markdown(rest)?;
            stdout.execute(Print("\n"))?;
            return Ok(());
        }

        // Numbered lists
        if let Some(rest) = line.strip_prefix(|c: char| c.is_ascii_digit()) {
            if let Some(rest) = rest.strip_prefix(". ") {
                let num = line
                    .chars()
                    .take_while(|c| c.is_ascii_digit())
                    .collect::<String>();
                stdout
                    .execute(SetForegroundColor(Color::Yellow))?
                    .execute(Print(format!("{}. ", num)))?
                    .execute(ResetColor)?;
                self.render_inline_markdown(rest)?;
                stdout.execute(Print("\n"))?;
                return Ok(());
            }
        }

        // Blockquotes
        if let Some(rest) = line.strip_prefix("> ") {
            stdout
                .execute(SetForegroundColor(Color::DarkGrey))?
                .execute(Print("│ "))?
                .execute(ResetColor)?;
            self.render_inline_markdown(rest)?;
            stdout.execute(Print("\n"))?;
            return Ok(());
        }

        // Horizontal rule
        if line == "---" || line == "***" || line == "___" {
            stdout
                .execute(SetForegroundColor(Color::DarkGrey))?
                .execute(Print("─".repeat(40)))?
                .execute(ResetColor)?
                .execute(Print("\n"))?;
            return Ok(());
        }

        self.render_inline_markdown(line)?;
        stdout.execute(Print("\n"))?;

        Ok(())
    }

    /// Render inline markdown (bold, italic, code).
    fn render_inline_markdown(&self, text: &str) -> std::io::Result<()> {
        let mut stdout = stdout();
        let mut chars = text.chars().peekable();
        let mut buffer = String::new();

        while let Some(c) = chars.next() {
            match c {
                '`' => {
                    if !buffer.is_empty() {
                        stdout.execute(Print(&buffer))?;
                        buffer.clear();
                    }
                    let mut code = String::new();
                    while let Some(&nc) = chars.peek() {
                        if nc == '`' {
                            chars.next();
                            break;
                        }
                        code.push(chars.next().unwrap());
                    }
                    stdout
                        .execute(SetForegroundColor(self.style.accent_color))?
                        .execute(Print(&code))?
                        .execute(ResetColor)?;
                }
                '*' | '_' => {
                    if !buffer.is_empty() {
                        stdout.execute(Print(&buffer))?;
                        buffer.clear();
                    }
                    if chars.peek() == Some(&c) {
                        chars.next();
                        let mut bold_text = String::new();
                        while let Some(nc) = chars.next() {
                            if nc == c && chars.peek() == Some(&c) {
                                chars.next();
                                break;
                            }
                            bold_text.push(nc);
                        }
                        stdout
                            .execute(SetAttribute(Attribute::Bold))?
                            .execute(Print(&bold_text))?
                            .execute(SetAttribute(Attribute::Reset))?;
                    } else {
                        let mut italic_text = String::new();
                        for nc in chars.by_ref() {
                            if nc == c {
                                break;
                            }
                            italic_text.push(nc);
                        }
                        stdout
                            .execute(SetAttribute(Attribute::Italic))?
                            .execute(Print(&italic_text))?
                            .execute(SetAttribute(Attribute::Reset))?;
                    }
                }
                _ => buffer.push(c),
            }
        }

        if !buffer.is_empty() {
            stdout.execute(Print(&buffer))?;
        }

        Ok(())
    }

    /// Render a code block with syntax highlighting.
    fn render_code_block(&self, lang: &str, code: &str) -> std::io::Result<()> {
        let mut stdout = stdout();

        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = &self.theme_set.themes["base16-ocean.dark"];
        let mut highlighter = HighlightLines::new(syntax, theme);

        stdout
            .execute(SetForegroundColor(Color::DarkGrey))?
            .execute(Print(format!(
                "┌── {}\n",
                if lang.is_empty() { "code" } else { lang }
            )))?
            .execute(ResetColor)?;

        for line in LinesWithEndings::from(code) {
            stdout
                .execute(SetForegroundColor(Color::DarkGrey))?
                .execute(Print("│ "))?
                .execute(ResetColor)?;

            match highlighter.highlight_line(line, &self.syntax_set) {
                Ok(ranges) => {
                    let escaped = as_24_bit_terminal_escaped(&ranges[..], false);
                    print!("{}", escaped);
                }
                Err(_) => {
                    print!("{}", line);
                }
            }
        }

        stdout
            .execute(SetForegroundColor(Color::DarkGrey))?
            .execute(Print("└──\n"))?
            .execute(ResetColor)?;

        Ok(())
    }
}

impl Default for TranscriptRenderer {
    fn default() -> Self {
        Self::new()
    }
}
