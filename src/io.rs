use std::fmt;

use crate::error::PortConflict;

/// Number of ports in each direction.
pub const PORT_COUNT: usize = 0x100;

/// Value read from a port with nothing attached.
pub const FLOATING_INPUT: u8 = 0xFF;

pub type InputFn = Box<dyn FnMut() -> u8>;
pub type OutputFn = Box<dyn FnMut(u8)>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => write!(f, "Input"),
            Direction::Output => write!(f, "Output"),
        }
    }
}

/// Callbacks reachable through `IN` and `OUT`. At most one per port and direction.
pub struct Ports {
    inputs: Vec<Option<InputFn>>,
    outputs: Vec<Option<OutputFn>>,
}

impl Default for Ports {
    fn default() -> Self {
        Self::new()
    }
}

impl Ports {
    pub fn new() -> Self {
        Ports {
            inputs: (0..PORT_COUNT).map(|_| None).collect(),
            outputs: (0..PORT_COUNT).map(|_| None).collect(),
        }
    }

    /// Attach a source to `port`. An occupied port keeps its first callback.
    pub fn register_input<F>(&mut self, port: u8, callback: F) -> Result<(), PortConflict>
    where
        F: FnMut() -> u8 + 'static,
    {
        let slot = &mut self.inputs[port as usize];
        if slot.is_some() {
            return Err(PortConflict {
                port,
                direction: Direction::Input,
            });
        }
        *slot = Some(Box::new(callback));
        Ok(())
    }

    /// Attach a sink to `port`. An occupied port keeps its first callback.
    pub fn register_output<F>(&mut self, port: u8, callback: F) -> Result<(), PortConflict>
    where
        F: FnMut(u8) + 'static,
    {
        let slot = &mut self.outputs[port as usize];
        if slot.is_some() {
            return Err(PortConflict {
                port,
                direction: Direction::Output,
            });
        }
        *slot = Some(Box::new(callback));
        Ok(())
    }

    pub fn read(&mut self, port: u8) -> u8 {
        match &mut self.inputs[port as usize] {
            Some(callback) => callback(),
            None => FLOATING_INPUT,
        }
    }

    pub fn write(&mut self, port: u8, value: u8) {
        if let Some(callback) = &mut self.outputs[port as usize] {
            callback(value);
        }
    }
}

impl fmt::Debug for Ports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs = self.inputs.iter().filter(|slot| slot.is_some()).count();
        let outputs = self.outputs.iter().filter(|slot| slot.is_some()).count();
        f.debug_struct("Ports")
            .field("inputs", &inputs)
            .field("outputs", &outputs)
            .finish()
    }
}
