use thiserror::Error;

use crate::{regs::Reg, InstrFormat};

/// Errors raised while generating a test case.
///
/// `AlreadyLent` and `DoubleRelease` mean a generator broke the borrow
/// discipline of the register pool; they are never recovered from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenError {
    #[error("no free register left (excluded: {})", format_regs(.excluded))]
    PoolExhausted { excluded: Vec<Reg> },
    #[error("register {0} is not available to be consumed")]
    AlreadyLent(Reg),
    #[error("register {0} is returned but was never lent")]
    DoubleRelease(Reg),
    #[error("unsupported instruction format `{0}`")]
    UnsupportedFormat(String),
    #[error("immediate {imm} does not fit format `{format}`")]
    ImmOutOfRange { format: InstrFormat, imm: i64 },
    #[error("no coverpoint generator for `{coverpoint}` (instruction `{instr}`)")]
    UnknownCoverpoint { instr: String, coverpoint: String },
    #[error("unsupported coverpoint variant `{coverpoint}` for instruction `{instr}`")]
    UnsupportedVariant { instr: String, coverpoint: String },
    #[error("coverpoint generator `{0}` is registered twice")]
    DuplicateRegistration(String),
    #[error("bad instruction template: {0}")]
    Template(String),
}

fn format_regs(regs: &[Reg]) -> String {
    if regs.is_empty() {
        return "none".into();
    }
    regs.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T, E = GenError> = std::result::Result<T, E>;
