//! Outlet gadget — hands messages out of the circuit

use crate::registry::{expect_no_args, Effect, Gadget};
use circuitry_core::{Message, Result};
use serde_json::Value;

pub struct OutletGadget;

impl OutletGadget {
    pub fn construct(args: &[Value]) -> Result<Box<dyn Gadget>> {
        expect_no_args("outlet", args)?;
        Ok(Box::new(Self))
    }
}

impl Gadget for OutletGadget {
    fn kind(&self) -> &str {
        "outlet"
    }

    fn outlets(&self) -> usize {
        0
    }

    fn receive(&mut self, _inlet: usize, message: &Message) -> Vec<Effect> {
        vec![Effect::Emit(message.clone())]
    }
}
