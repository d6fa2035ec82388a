//! Linux perf_event backend.
//!
//! Drives the kernel PMU interface directly through `perf_event_open(2)`:
//! one event group per counter set, the first event as group leader, and
//! `ENABLE`/`DISABLE`/`RESET` ioctls applied group-wide. Event names resolve
//! through a fixed table that accepts both perf-style names (`cycles`,
//! `cache-misses`, ...) and the PAPI-style aliases the original counter
//! request strings used (`PAPI_L1_DCM`, `PAPI_TOT_CYC`, ...).

use std::fs;
use std::os::raw::{c_int, c_ulong};

use log::debug;

use crate::counters::{CounterBackend, CounterSet, EventCode, ResolvedEvent};
use crate::error::{counter_error, Result};

const PERF_TYPE_HARDWARE: u32 = 0;
const PERF_TYPE_HW_CACHE: u32 = 3;

const HW_CPU_CYCLES: u64 = 0;
const HW_INSTRUCTIONS: u64 = 1;
const HW_CACHE_REFERENCES: u64 = 2;
const HW_CACHE_MISSES: u64 = 3;
const HW_BRANCH_INSTRUCTIONS: u64 = 4;
const HW_BRANCH_MISSES: u64 = 5;
const HW_REF_CPU_CYCLES: u64 = 9;

const CACHE_L1D: u64 = 0;
const CACHE_L1I: u64 = 1;
const CACHE_LL: u64 = 2;
const CACHE_DTLB: u64 = 3;
const OP_READ: u64 = 0;
const RESULT_ACCESS: u64 = 0;
const RESULT_MISS: u64 = 1;

/// Encoding from `linux/perf_event.h`: cache id, op id << 8, result << 16.
const fn hw_cache(cache: u64, op: u64, result: u64) -> u64 {
    cache | (op << 8) | (result << 16)
}

const PERF_EVENT_IOC_ENABLE: c_ulong = 0x2400;
const PERF_EVENT_IOC_DISABLE: c_ulong = 0x2401;
const PERF_EVENT_IOC_RESET: c_ulong = 0x2403;
const PERF_IOC_FLAG_GROUP: c_ulong = 1;
const PERF_FLAG_FD_CLOEXEC: c_ulong = 8;

const ATTR_FLAG_DISABLED: u64 = 1;
const ATTR_FLAG_EXCLUDE_KERNEL: u64 = 1 << 5;
const ATTR_FLAG_EXCLUDE_HV: u64 = 1 << 6;

/// General-purpose PMCs available per core on the x86 server parts this
/// tool targets; the kernel multiplexes beyond this, which would skew the
/// per-group measurements the harness relies on.
const GP_COUNTERS: usize = 6;

struct EventDef {
    names: &'static [&'static str],
    kind: u32,
    config: u64,
    display: &'static str,
    description: &'static str,
}

static EVENT_TABLE: &[EventDef] = &[
    EventDef {
        names: &["cycles", "cpu-cycles", "PAPI_TOT_CYC"],
        kind: PERF_TYPE_HARDWARE,
        config: HW_CPU_CYCLES,
        display: "cycles",
        description: "Total CPU cycles",
    },
    EventDef {
        names: &["instructions", "PAPI_TOT_INS"],
        kind: PERF_TYPE_HARDWARE,
        config: HW_INSTRUCTIONS,
        display: "instructions",
        description: "Instructions completed",
    },
    EventDef {
        names: &["cache-references"],
        kind: PERF_TYPE_HARDWARE,
        config: HW_CACHE_REFERENCES,
        display: "cache-references",
        description: "Last level cache accesses",
    },
    EventDef {
        names: &["cache-misses", "PAPI_L3_TCM"],
        kind: PERF_TYPE_HARDWARE,
        config: HW_CACHE_MISSES,
        display: "cache-misses",
        description: "Last level cache misses",
    },
    EventDef {
        names: &["branches", "branch-instructions", "PAPI_BR_INS"],
        kind: PERF_TYPE_HARDWARE,
        config: HW_BRANCH_INSTRUCTIONS,
        display: "branches",
        description: "Branch instructions",
    },
    EventDef {
        names: &["branch-misses", "PAPI_BR_MSP"],
        kind: PERF_TYPE_HARDWARE,
        config: HW_BRANCH_MISSES,
        display: "branch-misses",
        description: "Conditional branch instructions mispredicted",
    },
    EventDef {
        names: &["ref-cycles", "PAPI_REF_CYC"],
        kind: PERF_TYPE_HARDWARE,
        config: HW_REF_CPU_CYCLES,
        display: "ref-cycles",
        description: "Reference clock cycles",
    },
    EventDef {
        names: &["L1-dcache-loads"],
        kind: PERF_TYPE_HW_CACHE,
        config: hw_cache(CACHE_L1D, OP_READ, RESULT_ACCESS),
        display: "L1-dcache-loads",
        description: "Level 1 data cache loads",
    },
    EventDef {
        names: &["L1-dcache-load-misses", "PAPI_L1_DCM"],
        kind: PERF_TYPE_HW_CACHE,
        config: hw_cache(CACHE_L1D, OP_READ, RESULT_MISS),
        display: "L1-dcache-load-misses",
        description: "Level 1 data cache load misses",
    },
    EventDef {
        names: &["L1-icache-load-misses", "PAPI_L1_ICM"],
        kind: PERF_TYPE_HW_CACHE,
        config: hw_cache(CACHE_L1I, OP_READ, RESULT_MISS),
        display: "L1-icache-load-misses",
        description: "Level 1 instruction cache load misses",
    },
    EventDef {
        names: &["LLC-loads"],
        kind: PERF_TYPE_HW_CACHE,
        config: hw_cache(CACHE_LL, OP_READ, RESULT_ACCESS),
        display: "LLC-loads",
        description: "Last level cache loads",
    },
    EventDef {
        // Nearest measurable stand-in for the mid-level data cache misses
        // the PAPI name asked for.
        names: &["LLC-load-misses", "PAPI_L2_DCM"],
        kind: PERF_TYPE_HW_CACHE,
        config: hw_cache(CACHE_LL, OP_READ, RESULT_MISS),
        display: "LLC-load-misses",
        description: "Last level cache load misses",
    },
    EventDef {
        names: &["dTLB-load-misses", "PAPI_TLB_DM"],
        kind: PERF_TYPE_HW_CACHE,
        config: hw_cache(CACHE_DTLB, OP_READ, RESULT_MISS),
        display: "dTLB-load-misses",
        description: "Data translation lookaside buffer misses",
    },
];

/// `perf_event_attr` from `linux/perf_event.h`, trimmed to the prefix this
/// backend populates; `size` tells the kernel which revision it is given.
#[repr(C)]
#[derive(Clone, Copy)]
struct PerfEventAttr {
    type_: u32,
    size: u32,
    config: u64,
    sample_period: u64,
    sample_type: u64,
    read_format: u64,
    flags: u64,
    wakeup_events: u32,
    bp_type: u32,
    config1: u64,
    config2: u64,
    branch_sample_type: u64,
    sample_regs_user: u64,
    sample_stack_user: u32,
    clockid: i32,
    sample_regs_intr: u64,
    aux_watermark: u32,
    sample_max_stack: u16,
    reserved_2: u16,
}

fn last_os_error() -> String {
    std::io::Error::last_os_error().to_string()
}

/// Counter backend over Linux `perf_event_open(2)`.
#[derive(Debug, Default)]
pub struct PerfBackend;

impl PerfBackend {
    pub fn new() -> Self {
        PerfBackend
    }
}

impl CounterBackend for PerfBackend {
    fn name(&self) -> &'static str {
        "perf"
    }

    fn initialize(&mut self) -> Result<()> {
        let paranoid = fs::read_to_string("/proc/sys/kernel/perf_event_paranoid")
            .map_err(|e| counter_error(format!("perf events unavailable on this kernel: {e}")))?;
        debug!("perf_event_paranoid level: {}", paranoid.trim());
        Ok(())
    }

    fn capacity(&self) -> usize {
        GP_COUNTERS
    }

    fn resolve(&self, name: &str) -> Result<ResolvedEvent> {
        let def = EVENT_TABLE
            .iter()
            .find(|def| def.names.contains(&name))
            .ok_or_else(|| counter_error(format!("failed to find a counter code for [{name}]")))?;
        Ok(ResolvedEvent {
            code: EventCode {
                kind: def.kind,
                config: def.config,
            },
            display: def.display.to_string(),
            description: def.description.to_string(),
        })
    }

    fn create_set(&self) -> Result<Box<dyn CounterSet>> {
        Ok(Box::new(PerfSet { fds: Vec::new() }))
    }
}

/// One perf event group; the first added event's fd is the group leader.
struct PerfSet {
    fds: Vec<c_int>,
}

impl PerfSet {
    fn leader(&self) -> c_int {
        self.fds.first().copied().unwrap_or(-1)
    }

    fn open(&self, code: EventCode, group_fd: c_int) -> Result<c_int> {
        let mut attr: PerfEventAttr = unsafe { std::mem::zeroed() };
        attr.type_ = code.kind;
        attr.size = std::mem::size_of::<PerfEventAttr>() as u32;
        attr.config = code.config;
        attr.flags = ATTR_FLAG_DISABLED | ATTR_FLAG_EXCLUDE_KERNEL | ATTR_FLAG_EXCLUDE_HV;

        // Measure the calling process on any CPU.
        let fd = unsafe {
            libc::syscall(
                libc::SYS_perf_event_open,
                &attr as *const PerfEventAttr,
                0 as libc::pid_t,
                -1 as c_int,
                group_fd,
                PERF_FLAG_FD_CLOEXEC,
            )
        };
        if fd < 0 {
            return Err(counter_error(format!(
                "perf_event_open failed for type {} config {:#x}: {}",
                code.kind,
                code.config,
                last_os_error()
            )));
        }
        Ok(fd as c_int)
    }

    fn group_ioctl(&self, request: c_ulong, what: &str) -> Result<()> {
        let ret = unsafe { libc::ioctl(self.leader(), request, PERF_IOC_FLAG_GROUP) };
        if ret < 0 {
            return Err(counter_error(format!("{what}: {}", last_os_error())));
        }
        Ok(())
    }
}

impl CounterSet for PerfSet {
    fn add(&mut self, code: EventCode) -> Result<()> {
        let group_fd = if self.fds.is_empty() { -1 } else { self.leader() };
        let fd = self.open(code, group_fd)?;
        self.fds.push(fd);
        Ok(())
    }

    fn active(&self) -> usize {
        self.fds.len()
    }

    fn start(&mut self) -> Result<()> {
        if self.fds.is_empty() {
            return Ok(());
        }
        self.group_ioctl(PERF_EVENT_IOC_RESET, "failed to reset counters")?;
        self.group_ioctl(PERF_EVENT_IOC_ENABLE, "failed to start counters")
    }

    fn stop(&mut self) -> Result<Vec<i64>> {
        if self.fds.is_empty() {
            return Ok(Vec::new());
        }
        self.group_ioctl(PERF_EVENT_IOC_DISABLE, "failed to stop counters")?;

        let mut values = Vec::with_capacity(self.fds.len());
        for &fd in &self.fds {
            let mut raw: u64 = 0;
            let read = unsafe {
                libc::read(
                    fd,
                    &mut raw as *mut u64 as *mut libc::c_void,
                    std::mem::size_of::<u64>(),
                )
            };
            if read != std::mem::size_of::<u64>() as isize {
                return Err(counter_error(format!(
                    "failed to read counter value: {}",
                    last_os_error()
                )));
            }
            values.push(raw as i64);
        }
        Ok(values)
    }
}

impl Drop for PerfSet {
    fn drop(&mut self) {
        for &fd in &self.fds {
            unsafe {
                libc::close(fd);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_perf_and_papi_names() {
        let backend = PerfBackend::new();
        let cycles = backend.resolve("cycles").unwrap();
        let papi_cycles = backend.resolve("PAPI_TOT_CYC").unwrap();
        assert_eq!(cycles.code, papi_cycles.code);
        assert_eq!(cycles.display, "cycles");

        let l1 = backend.resolve("PAPI_L1_DCM").unwrap();
        assert_eq!(l1.code.kind, PERF_TYPE_HW_CACHE);
        assert_eq!(l1.display, "L1-dcache-load-misses");
    }

    #[test]
    fn test_resolve_unknown_name_fails() {
        let backend = PerfBackend::new();
        assert!(backend.resolve("PAPI_NO_SUCH_EVENT").is_err());
    }

    #[test]
    fn test_hw_cache_encoding() {
        // LL read misses: cache 2, op 0, result 1.
        assert_eq!(hw_cache(CACHE_LL, OP_READ, RESULT_MISS), 0x1_00_02);
    }

    #[test]
    fn test_default_preset_resolves() {
        let backend = PerfBackend::new();
        for group in crate::counters::parse_groups(crate::counters::DEFAULT_EVENTS) {
            for name in group {
                assert!(backend.resolve(&name).is_ok(), "preset event {name} must resolve");
            }
        }
    }
}
