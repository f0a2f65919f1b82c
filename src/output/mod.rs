//! Styled terminal output for the bulk import.
//!
//! Everything is line oriented: one status line per event, no redraws.
//! Failures go to stderr so a redirected stdout keeps only the progress log.

use owo_colors::OwoColorize;

const MUTED: (u8, u8, u8) = (160, 160, 160);
const ACCENT: (u8, u8, u8) = (181, 174, 254);

/// Kind of status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Failure,
    Warning,
    Info,
}

impl Tone {
    fn symbol(&self) -> &'static str {
        match self {
            Tone::Success => "✓",
            Tone::Failure => "✗",
            Tone::Warning => "⚠",
            Tone::Info => "ℹ",
        }
    }

    fn rgb(&self) -> (u8, u8, u8) {
        match self {
            Tone::Success => (152, 225, 152),
            Tone::Failure => (255, 160, 160),
            Tone::Warning => (255, 230, 160),
            Tone::Info => (160, 200, 255),
        }
    }
}

/// Symbol-prefixed line for `tone`
pub fn status_line(tone: Tone, message: &str) -> String {
    let (r, g, b) = tone.rgb();
    format!(
        "{} {}",
        tone.symbol().truecolor(r, g, b).bold(),
        message.bright_white()
    )
}

fn print_status(tone: Tone, message: &str) {
    let line = status_line(tone, message);
    match tone {
        Tone::Failure => eprintln!("{}", line),
        _ => println!("{}", line),
    }
}

pub fn success(message: &str) {
    print_status(Tone::Success, message);
}

pub fn error(message: &str) {
    print_status(Tone::Failure, message);
}

pub fn warning(message: &str) {
    print_status(Tone::Warning, message);
}

pub fn info(message: &str) {
    print_status(Tone::Info, message);
}

/// Title followed by a rule
pub fn section(title: &str) {
    let (r, g, b) = ACCENT;
    let (mr, mg, mb) = MUTED;
    println!("\n{}", title.truecolor(r, g, b).bold());
    println!("{}", "─".repeat(50).truecolor(mr, mg, mb));
}

/// Indented "key: value" line
pub fn key_value(key: &str, value: &str) {
    let (r, g, b) = MUTED;
    println!(
        "  {} {}",
        format!("{}:", key).truecolor(r, g, b),
        value.bright_white()
    );
}

/// Verbose dumps (URLs, payloads, response bodies)
pub fn dimmed(message: &str) {
    let (r, g, b) = MUTED;
    println!("{}", message.truecolor(r, g, b));
}

/// "[current/total] label" marking the start of a row
pub fn progress_line(current: usize, total: usize, label: &str) -> String {
    let (r, g, b) = ACCENT;
    format!(
        "{} {}",
        format!("[{}/{}]", current, total).truecolor(r, g, b).bold(),
        label.bright_white()
    )
}

pub fn progress(current: usize, total: usize, label: &str) {
    println!("\n{}", progress_line(current, total, label));
}

/// Rule closing a row's block of output
pub fn separator() {
    let (r, g, b) = MUTED;
    println!("{}", "─".repeat(75).truecolor(r, g, b));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_keeps_message() {
        for tone in [Tone::Success, Tone::Failure, Tone::Warning, Tone::Info] {
            let line = status_line(tone, "Finished importing row 1/2");

            assert!(line.contains(tone.symbol()));
            assert!(line.contains("Finished importing row 1/2"));
        }
    }

    #[test]
    fn test_progress_line() {
        let line = progress_line(3, 10, "Importing row");

        assert!(line.contains("[3/10]"));
        assert!(line.contains("Importing row"));
    }
}
