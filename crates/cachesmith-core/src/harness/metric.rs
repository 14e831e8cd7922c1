//! LLC statistics extraction from simulator output.

use std::sync::OnceLock;

use regex::Regex;

/// Totals reported on the simulator's `LLC TOTAL` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LlcStats {
    pub accesses: u64,
    pub hits: u64,
    pub misses: u64,
}

fn llc_total_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"LLC TOTAL\s+ACCESS:\s+(\d+)\s+HIT:\s+(\d+)\s+MISS:\s+(\d+)")
            .expect("LLC TOTAL pattern is valid")
    })
}

/// Find the first `LLC TOTAL ACCESS: n HIT: n MISS: n` line in `output`.
pub fn parse_llc_total(output: &str) -> Option<LlcStats> {
    let caps = llc_total_re().captures(output)?;
    let field = |i: usize| caps.get(i)?.as_str().parse::<u64>().ok();
    Some(LlcStats {
        accesses: field(1)?,
        hits: field(2)?,
        misses: field(3)?,
    })
}
