//! Fake counter backend for environments without hardware counters.
//!
//! Resolves every event name, accepts every add and measures zeros, so a
//! full harness run (group loop, slot bookkeeping, timing) works anywhere.
//! This is also the backend the harness tests drive.

use crate::counters::{CounterBackend, CounterSet, EventCode, ResolvedEvent};
use crate::error::Result;

#[derive(Debug, Default)]
pub struct NullBackend;

impl NullBackend {
    pub fn new() -> Self {
        NullBackend
    }
}

impl CounterBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    fn capacity(&self) -> usize {
        // Never the limiting factor: fake counters multiplex freely.
        usize::MAX
    }

    fn resolve(&self, name: &str) -> Result<ResolvedEvent> {
        Ok(ResolvedEvent {
            code: EventCode { kind: 0, config: 0 },
            display: name.to_string(),
            description: "simulated event (null backend)".to_string(),
        })
    }

    fn create_set(&self) -> Result<Box<dyn CounterSet>> {
        Ok(Box::new(NullSet { added: 0 }))
    }
}

struct NullSet {
    added: usize,
}

impl CounterSet for NullSet {
    fn add(&mut self, _code: EventCode) -> Result<()> {
        self.added += 1;
        Ok(())
    }

    fn active(&self) -> usize {
        self.added
    }

    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<Vec<i64>> {
        Ok(vec![0; self.added])
    }
}
