use crate::error::NameFault;
use crate::value::{Value, ValueKind};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Type named in the `set`/`reset`; recorded, never enforced.
    pub declared_type: ValueKind,
    pub value: Value,
}

/// Stack of scope frames for one call; the last frame is the innermost.
///
/// Blocks push a frame on entry and pop it on exit. Each function call gets a
/// fresh `Environment` of its own, so callees never see the caller's locals.
#[derive(Debug, Clone)]
pub struct Environment {
    frames: Vec<HashMap<String, Binding>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    pub fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop_frame(&mut self) {
        // the outermost frame lives as long as the environment
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Binds `name` in the current frame. Shadowing an outer frame is fine.
    pub fn declare(
        &mut self,
        name: &str,
        declared_type: ValueKind,
        value: Value,
    ) -> Result<(), NameFault> {
        let frame = self
            .frames
            .last_mut()
            .ok_or(NameFault::Undeclared)?;
        if frame.contains_key(name) {
            return Err(NameFault::AlreadyDeclaredInScope);
        }
        frame.insert(
            name.to_string(),
            Binding {
                declared_type,
                value,
            },
        );
        Ok(())
    }

    /// Updates the nearest binding of `name`, walking outward.
    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), NameFault> {
        for frame in self.frames.iter_mut().rev() {
            if let Some(binding) = frame.get_mut(name) {
                binding.value = value;
                return Ok(());
            }
        }
        Err(NameFault::Undeclared)
    }

    pub fn lookup(&self, name: &str) -> Result<&Value, NameFault> {
        self.binding(name).map(|binding| &binding.value)
    }

    pub fn binding(&self, name: &str) -> Result<&Binding, NameFault> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name))
            .ok_or(NameFault::Undeclared)
    }
}
