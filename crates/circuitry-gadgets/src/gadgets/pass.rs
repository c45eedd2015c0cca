//! Pass gadget — forwards every message unchanged

use crate::registry::{expect_no_args, Effect, Gadget};
use circuitry_core::{Message, Result};
use serde_json::Value;

pub struct PassGadget;

impl PassGadget {
    pub fn construct(args: &[Value]) -> Result<Box<dyn Gadget>> {
        expect_no_args("pass", args)?;
        Ok(Box::new(Self))
    }
}

impl Gadget for PassGadget {
    fn kind(&self) -> &str {
        "pass"
    }

    fn receive(&mut self, _inlet: usize, message: &Message) -> Vec<Effect> {
        vec![Effect::send(0, message.clone())]
    }
}
