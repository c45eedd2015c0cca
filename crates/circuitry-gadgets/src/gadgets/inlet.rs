//! Inlet gadget — entry point of a circuit, fed from `P/N/in/{k}`

use crate::registry::{expect_no_args, Effect, Gadget};
use circuitry_core::{Message, Result};
use serde_json::Value;

pub struct InletGadget;

impl InletGadget {
    pub fn construct(args: &[Value]) -> Result<Box<dyn Gadget>> {
        expect_no_args("inlet", args)?;
        Ok(Box::new(Self))
    }
}

impl Gadget for InletGadget {
    fn kind(&self) -> &str {
        "inlet"
    }

    fn receive(&mut self, _inlet: usize, message: &Message) -> Vec<Effect> {
        vec![Effect::send(0, message.clone())]
    }
}
