//! Coverpoint routines and the registry that dispatches to them.
//!
//! A coverpoint string is a registered base name, optionally followed by a
//! `_`-separated variant suffix. The registry only resolves the base name;
//! each routine parses its own suffix into a variant enum and rejects the
//! ones it does not know.

use std::collections::BTreeMap;

use crate::{
    error::{GenError, Result},
    params::Overrides,
    InstrFormat, TestContext,
};

mod align;
mod imm_edges;
mod offset;
mod sweep;

pub use align::make_align;
pub use imm_edges::make_rs1_imm_edges;
pub use offset::make_offset;
pub use sweep::{make_bs, make_memval, make_rnum, make_sbox, make_uimm};

/// The (instruction, format, coverpoint) triple a routine works on, with the
/// base name the coverpoint was resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestCase<'a> {
    pub instr: &'a str,
    pub format: InstrFormat,
    pub coverpoint: &'a str,
    pub base: &'a str,
}

impl<'a> TestCase<'a> {
    /// A test case whose base name is the builtin one matching `coverpoint`.
    pub fn new(instr: &'a str, format: InstrFormat, coverpoint: &'a str) -> Self {
        let base = longest_base(BUILTIN.iter().map(|&(name, _)| name), coverpoint).unwrap_or(coverpoint);
        Self {
            instr,
            format,
            coverpoint,
            base,
        }
    }

    pub fn with_base(mut self, base: &'a str) -> Self {
        self.base = base;
        self
    }

    /// The variant suffix after the base name, empty for the bare base name.
    pub fn suffix(&self) -> &'a str {
        self.coverpoint.strip_prefix(self.base).unwrap_or("")
    }

    pub fn unsupported_variant(&self) -> GenError {
        GenError::UnsupportedVariant {
            instr: self.instr.to_string(),
            coverpoint: self.coverpoint.to_string(),
        }
    }

    /// Error for a format the routine cannot build tests for.
    pub fn unsupported_format(&self) -> GenError {
        GenError::UnsupportedFormat(format!(
            "{} for {} ({})",
            self.format, self.coverpoint, self.instr
        ))
    }
}

/// A coverpoint generator. Returns the text blocks of its test cases in
/// emission order.
pub type Routine = fn(&TestCase<'_>, &mut TestContext) -> Result<Vec<String>>;

const BUILTIN: [(&str, Routine); 8] = [
    ("cp_align", make_align),
    ("cp_bs", make_bs),
    ("cp_memval", make_memval),
    ("cp_offset", make_offset),
    ("cp_rnum", make_rnum),
    ("cp_sbox", make_sbox),
    ("cp_uimm", make_uimm),
    ("cr_rs1_imm_edges", make_rs1_imm_edges),
];

/// Name-keyed table of coverpoint routines.
#[derive(Default)]
pub struct CoverpointRegistry {
    routines: BTreeMap<String, Routine>,
}

impl CoverpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every routine shipped with the crate.
    pub fn builtin() -> Self {
        Self {
            routines: BUILTIN
                .iter()
                .map(|&(name, routine)| (name.to_string(), routine))
                .collect(),
        }
    }

    pub fn register(&mut self, base: &str, routine: Routine) -> Result<()> {
        if self.routines.contains_key(base) {
            return Err(GenError::DuplicateRegistration(base.to_string()));
        }
        self.routines.insert(base.to_string(), routine);
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.routines.keys().map(String::as_str)
    }

    /// Longest registered base name that equals `coverpoint` or is followed
    /// by `_` in it.
    pub fn resolve(&self, coverpoint: &str) -> Option<(&str, Routine)> {
        let base = longest_base(self.routines.keys().map(String::as_str), coverpoint)?;
        self.routines.get(base).map(|&routine| (base, routine))
    }

    pub fn dispatch(
        &self,
        instr: &str,
        format: InstrFormat,
        coverpoint: &str,
        ctx: &mut TestContext,
    ) -> Result<Vec<String>> {
        let (base, routine) =
            self.resolve(coverpoint)
                .ok_or_else(|| GenError::UnknownCoverpoint {
                    instr: instr.to_string(),
                    coverpoint: coverpoint.to_string(),
                })?;
        tracing::debug!("dispatch {coverpoint} of {instr} ({format}) to `{base}`");
        routine(&TestCase::new(instr, format, coverpoint).with_base(base), ctx)
    }
}

fn longest_base<'n>(names: impl Iterator<Item = &'n str>, coverpoint: &str) -> Option<&'n str> {
    names
        .filter(|base| match coverpoint.strip_prefix(base) {
            Some(rest) => rest.is_empty() || rest.starts_with('_'),
            None => false,
        })
        .max_by_key(|base| base.len())
}

/// One test case per `(overrides, description)` pair, each with a freshly
/// generated parameter set whose registers are returned right after it is
/// formatted.
pub(crate) fn sweep(
    case: &TestCase<'_>,
    ctx: &mut TestContext,
    cases: Vec<(Overrides, String)>,
) -> Result<Vec<String>> {
    let mut blocks = Vec::with_capacity(cases.len());
    for (overrides, desc) in cases {
        let block = ctx.with_params(case.format, &overrides, |ctx, params| {
            ctx.format_one(case.instr, case.format, params, &desc)
        })?;
        blocks.push(block);
    }
    Ok(blocks)
}
