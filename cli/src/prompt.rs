use loaner_kernel::session::{PromptError, Prompter};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Line-editor backed prompter. Ctrl-D or Ctrl-C ends the session.
pub struct EditorPrompter {
    editor: DefaultEditor,
}

impl EditorPrompter {
    pub fn new() -> Result<Self, PromptError> {
        let editor = DefaultEditor::new().map_err(|e| PromptError::Input(e.to_string()))?;
        Ok(Self { editor })
    }
}

impl Prompter for EditorPrompter {
    fn prompt(&mut self, label: &str, initial: &str) -> Result<Option<String>, PromptError> {
        match self.editor.readline_with_initial(label, (initial, "")) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Eof | ReadlineError::Interrupted) => Ok(None),
            Err(e) => Err(PromptError::Input(e.to_string())),
        }
    }
}
