//! The counter-multiplexed measurement harness.
//!
//! Hardware counters are a single global machine resource, so the group
//! loop is strictly sequential: each requested counter group repeats the
//! identical multiply once, with the result matrix re-zeroed and the caches
//! scrubbed in between. Wall-clock time and the flop count are captured
//! around the first group only; repeating the timing would add no
//! information and would fold counter-reading overhead into the
//! measurement.

use std::time::Instant;

use log::{debug, warn};

use crate::config::RunConfig;
use crate::counters::{parse_groups, CounterBackend, EventSlot, DEFAULT_EVENTS};
use crate::error::{counter_error, Result};
use crate::matrix::MatrixStore;
use crate::metrics::{FlopCount, RunMetrics};
use crate::mult;
use crate::CACHE_SCRUB_BYTES;

/// Drives one benchmark run: one multiply per counter group, aggregated
/// into a single metrics record and a flat per-event value array.
pub struct CounterHarness<'a> {
    config: &'a RunConfig,
    backend: Box<dyn CounterBackend>,
}

impl<'a> CounterHarness<'a> {
    pub fn new(config: &'a RunConfig, backend: Box<dyn CounterBackend>) -> Self {
        CounterHarness { config, backend }
    }

    /// Runs the configured workload once per counter group (or exactly once
    /// for a pure timing run) and returns the finalized metrics plus the
    /// per-event slots in request order.
    pub fn run(&mut self, store: &mut MatrixStore) -> Result<(RunMetrics, Vec<EventSlot>)> {
        let mut metrics = RunMetrics::new(self.config);

        let request = match self.config.counters.as_deref() {
            None => String::new(),
            Some("default") => DEFAULT_EVENTS.to_string(),
            Some(spec) => spec.to_string(),
        };
        let groups = parse_groups(&request);

        if groups.is_empty() {
            debug!("No counters requested, running a pure timing loop");
            store.zero_result();
            let start = Instant::now();
            let flops = self.measurable_work(store)?;
            metrics.elapsed_micros = start.elapsed().as_micros() as u64;
            metrics.flops = flops;
            metrics.finalize();
            return Ok((metrics, Vec::new()));
        }

        self.backend.initialize()?;
        debug!(
            "Counter backend '{}' initialized, capacity {} simultaneous counters",
            self.backend.name(),
            self.backend.capacity()
        );

        let tolerate = self.config.counter_ignore;
        let mut slots: Vec<EventSlot> = groups
            .iter()
            .flatten()
            .map(|name| EventSlot::new(name))
            .collect();
        let mut offset = 0usize;

        for (group_index, group) in groups.iter().enumerate() {
            let first = group_index == 0;
            store.zero_result();
            clear_caches();
            debug!("Loop #{group_index} : counter group {group:?}");

            let mut set = self.backend.create_set()?;
            // Slot indices of the events that made it into the set, in add
            // order; stop() values map back through this.
            let mut added: Vec<usize> = Vec::new();
            for (event_index, name) in group.iter().enumerate() {
                let slot_index = offset + event_index;
                match self.backend.resolve(name) {
                    Ok(resolved) => {
                        slots[slot_index].display = resolved.display;
                        slots[slot_index].description = resolved.description;
                        match set.add(resolved.code) {
                            Ok(()) => added.push(slot_index),
                            Err(e) if tolerate => {
                                warn!("Skipping counter {name}: could not add to the event set: {e}");
                                slots[slot_index].error = Some(e.to_string());
                            }
                            Err(e) => return Err(e),
                        }
                    }
                    Err(e) if tolerate => {
                        warn!("Skipping counter {name}: {e}");
                        slots[slot_index].error = Some(e.to_string());
                    }
                    Err(e) => return Err(e),
                }
            }

            let mut use_counters = set.active() > 0;
            if self.backend.capacity() < 2 {
                if tolerate {
                    warn!(
                        "No hardware counters here (capacity {} < 2), continuing without counter measurements",
                        self.backend.capacity()
                    );
                    use_counters = false;
                } else {
                    return Err(counter_error(format!(
                        "fewer than 2 hardware counters available (capacity {})",
                        self.backend.capacity()
                    )));
                }
            }

            let start = first.then(Instant::now);
            if use_counters {
                set.start()?;
            }

            let flops = self.measurable_work(store)?;

            // Capture the stop timestamp before reading the counters back,
            // so counter-reading overhead stays out of the measurement.
            let elapsed = start.map(|s| s.elapsed());

            if use_counters {
                let values = set.stop()?;
                for (&slot_index, value) in added.iter().zip(values) {
                    slots[slot_index].value = value;
                }
            }

            if let Some(elapsed) = elapsed {
                metrics.elapsed_micros = elapsed.as_micros() as u64;
                metrics.flops = flops;
                debug!("Stop - Start = {} microseconds", metrics.elapsed_micros);
            }

            offset += group.len();
        }

        metrics.finalize();
        Ok((metrics, slots))
    }

    fn measurable_work(&self, store: &mut MatrixStore) -> Result<FlopCount> {
        debug!("Multiplying matrices");
        let flops = mult::multiply(
            self.config.strategy,
            self.config.loop_order(),
            self.config.block_size,
            &store.a,
            &store.b,
            &mut store.c,
        )?;
        if let FlopCount::Counted(count) = flops {
            debug!("Matrix multiplication involved {count} FLOPs");
        }
        Ok(flops)
    }
}

/// Touches a scratch buffer larger than the biggest cache level so every
/// counter group starts from a comparable cold-cache state.
fn clear_caches() {
    let mut scratch = vec![0u8; CACHE_SCRUB_BYTES];
    for line in scratch.chunks_mut(64) {
        // volatile keeps the sweep from being optimized away
        unsafe { std::ptr::write_volatile(line.as_mut_ptr(), 1) };
    }
}
