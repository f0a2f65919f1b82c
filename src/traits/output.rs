use crate::output;

/// Progress reporting seam; the import writes through it so tests can capture the log
pub trait Output: Send + Sync {
    fn success(&self, message: &str);

    /// Row failures and lookup errors
    fn error(&self, message: &str);

    fn warning(&self, message: &str);

    fn info(&self, message: &str);

    fn section(&self, title: &str);

    fn key_value(&self, key: &str, value: &str);

    /// Verbose-only diagnostics: request URLs, payloads, response bodies
    fn debug(&self, message: &str);

    /// Start of row `current` out of `total`
    fn progress(&self, current: usize, total: usize, label: &str);

    /// End of a row's block
    fn separator(&self);
}

/// Colored terminal output
pub struct TerminalOutput;

impl Output for TerminalOutput {
    fn success(&self, message: &str) {
        output::success(message);
    }

    fn error(&self, message: &str) {
        output::error(message);
    }

    fn warning(&self, message: &str) {
        output::warning(message);
    }

    fn info(&self, message: &str) {
        output::info(message);
    }

    fn section(&self, title: &str) {
        output::section(title);
    }

    fn key_value(&self, key: &str, value: &str) {
        output::key_value(key, value);
    }

    fn debug(&self, message: &str) {
        output::dimmed(message);
    }

    fn progress(&self, current: usize, total: usize, label: &str) {
        output::progress(current, total, label);
    }

    fn separator(&self) {
        output::separator();
    }
}

/// One line captured by `MockOutput`
#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum OutputMessage {
    Success(String),
    Error(String),
    Warning(String),
    Info(String),
    Section(String),
    KeyValue(String, String),
    Debug(String),
    Progress(usize, usize, String),
    Separator,
}

/// Output sink recording every line for assertions
#[cfg(test)]
#[derive(Default)]
pub struct MockOutput {
    messages: std::sync::Mutex<Vec<OutputMessage>>,
}

#[cfg(test)]
impl MockOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<OutputMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn contains(&self, message: &OutputMessage) -> bool {
        self.messages.lock().unwrap().contains(message)
    }

    pub fn warnings(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|message| match message {
                OutputMessage::Warning(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|message| match message {
                OutputMessage::Error(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    fn push(&self, message: OutputMessage) {
        self.messages.lock().unwrap().push(message);
    }
}

#[cfg(test)]
impl Output for MockOutput {
    fn success(&self, message: &str) {
        self.push(OutputMessage::Success(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.push(OutputMessage::Error(message.to_string()));
    }

    fn warning(&self, message: &str) {
        self.push(OutputMessage::Warning(message.to_string()));
    }

    fn info(&self, message: &str) {
        self.push(OutputMessage::Info(message.to_string()));
    }

    fn section(&self, title: &str) {
        self.push(OutputMessage::Section(title.to_string()));
    }

    fn key_value(&self, key: &str, value: &str) {
        self.push(OutputMessage::KeyValue(key.to_string(), value.to_string()));
    }

    fn debug(&self, message: &str) {
        self.push(OutputMessage::Debug(message.to_string()));
    }

    fn progress(&self, current: usize, total: usize, label: &str) {
        self.push(OutputMessage::Progress(current, total, label.to_string()));
    }

    fn separator(&self) {
        self.push(OutputMessage::Separator);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_output_filters_by_kind() {
        let output = MockOutput::new();
        output.progress(1, 2, "Importing row");
        output.warning("Leaving out team 'Ops'");
        output.error("Unable to create application profile: 500");
        output.separator();

        assert_eq!(output.messages().len(), 4);
        assert_eq!(output.warnings(), vec!["Leaving out team 'Ops'".to_string()]);
        assert_eq!(
            output.errors(),
            vec!["Unable to create application profile: 500".to_string()]
        );
        assert!(output.contains(&OutputMessage::Progress(1, 2, "Importing row".to_string())));
    }
}
