//! Print gadget — writes its arguments followed by the message

use crate::registry::{Effect, Gadget};
use circuitry_core::{Message, Result};
use serde_json::Value;

pub struct PrintGadget {
    label: Vec<String>,
}

impl PrintGadget {
    pub fn construct(args: &[Value]) -> Result<Box<dyn Gadget>> {
        Ok(Box::new(Self {
            label: args.iter().map(render).collect(),
        }))
    }

    /// The line printed for `message`: arguments and message joined by spaces.
    pub fn line(&self, message: &Message) -> String {
        let mut parts = self.label.clone();
        parts.push(render(message));
        parts.join(" ")
    }
}

/// Strings print bare, everything else as JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Gadget for PrintGadget {
    fn kind(&self) -> &str {
        "print"
    }

    fn outlets(&self) -> usize {
        0
    }

    fn receive(&mut self, _inlet: usize, message: &Message) -> Vec<Effect> {
        vec![Effect::Print(self.line(message))]
    }
}
