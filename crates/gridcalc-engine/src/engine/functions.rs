//! Built-in spreadsheet functions and their metadata.
//!
//! Conventions:
//! - Function names are matched case-insensitively (`sum(...)` == `SUM(...)`).
//! - A formula is a function call only if the *whole* formula matches
//!   `NAME(arg, ...)` for a name in [`BUILTINS`]; anything else is arithmetic.
//! - If you add a built-in, add a [`Builtin`] variant, a [`BUILTINS`] entry,
//!   and its case in [`Operands::finish`].

use regex::Regex;
use std::sync::OnceLock;

/// The fixed built-in function set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Sum,
    Average,
    Count,
    Min,
    Max,
}

pub struct BuiltinInfo {
    pub name: &'static str,
    pub builtin: Builtin,
    pub description: &'static str,
}

pub const BUILTINS: &[BuiltinInfo] = &[
    BuiltinInfo {
        name: "SUM",
        builtin: Builtin::Sum,
        description: "Sum of the operands (0 when there are none)",
    },
    BuiltinInfo {
        name: "AVERAGE",
        builtin: Builtin::Average,
        description: "Mean of the operands (0 when there are none)",
    },
    BuiltinInfo {
        name: "COUNT",
        builtin: Builtin::Count,
        description: "Number of operands, text cells included as zeros",
    },
    BuiltinInfo {
        name: "MIN",
        builtin: Builtin::Min,
        description: "Smallest operand (0 when there are none)",
    },
    BuiltinInfo {
        name: "MAX",
        builtin: Builtin::Max,
        description: "Largest operand (0 when there are none)",
    },
];

/// Regex that matches a whole-formula call like `SUM(A1:B5, 3)`.
///
/// Captures:
/// - group 1: function name
/// - group 2: raw argument list between the outer parentheses
fn call_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let names = BUILTINS
            .iter()
            .map(|b| b.name)
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"(?is)^\s*({})\s*\((.*)\)\s*$", names))
            .expect("built-in call regex must compile")
    })
}

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        BUILTINS
            .iter()
            .find(|b| b.name.eq_ignore_ascii_case(name))
            .map(|b| b.builtin)
    }

    pub fn name(self) -> &'static str {
        BUILTINS
            .iter()
            .find(|b| b.builtin == self)
            .map(|b| b.name)
            .unwrap_or("?")
    }

    /// Apply the function to a flattened operand list.
    /// Every function returns `0` for an empty list.
    pub fn apply(self, values: &[f64]) -> f64 {
        let mut operands = Operands::default();
        values.iter().for_each(|&v| operands.push(v));
        operands.finish(self)
    }
}

/// Running totals for one call, so operands never need to be collected.
#[derive(Clone, Debug)]
pub struct Operands {
    sum: f64,
    count: u128,
    min: f64,
    max: f64,
}

impl Default for Operands {
    fn default() -> Self {
        Operands {
            sum: 0.0,
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl Operands {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Add `n` operands that read as `0`.
    pub fn push_zeros(&mut self, n: u128) {
        if n == 0 {
            return;
        }
        self.count += n;
        self.min = self.min.min(0.0);
        self.max = self.max.max(0.0);
    }

    pub fn count(&self) -> u128 {
        self.count
    }

    pub fn finish(&self, builtin: Builtin) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        match builtin {
            Builtin::Sum => self.sum,
            Builtin::Average => self.sum / self.count as f64,
            Builtin::Count => self.count as f64,
            Builtin::Min => self.min,
            Builtin::Max => self.max,
        }
    }
}

/// Try the function-call pattern against a formula body (no leading `=`).
///
/// Returns the builtin and its raw argument tokens, or `None` when the
/// formula should be handed to the arithmetic evaluator. `NAME()` yields an
/// empty argument list.
pub fn match_call(formula: &str) -> Option<(Builtin, Vec<&str>)> {
    let caps = call_re().captures(formula)?;
    let builtin = Builtin::from_name(caps.get(1)?.as_str())?;
    let args = caps.get(2)?.as_str();
    if args.trim().is_empty() {
        return Some((builtin, Vec::new()));
    }
    Some((builtin, args.split(',').map(str::trim).collect()))
}
