//! Button text for `UI_BUTTON`.

use crate::com::{Com, Input, Output, Process};

type TextProvider = Box<dyn FnMut() -> String + Send>;

/// Publishes `label`, computed on every request.
pub struct Label {
    text: TextProvider,
}

impl Label {
    /// A label that never changes.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::dynamic(move || text.clone())
    }

    /// A label recomputed for every response.
    pub fn dynamic(provider: impl FnMut() -> String + Send + 'static) -> Self {
        Self {
            text: Box::new(provider),
        }
    }
}

impl Com for Label {
    fn com_type(&self) -> &'static str {
        "label"
    }

    fn actions(&self) -> &[&'static str] {
        &[]
    }

    fn run_action(&mut self, _action: &str, _input: &Input) -> Process {
        Process::default()
    }

    fn publish_attributes(&mut self, out: &mut Output) {
        out.insert("label".into(), (self.text)().into());
    }
}
