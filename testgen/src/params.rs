//! Operand assignment of a single test case.

use crate::{
    error::{GenError, Result},
    format::RegClass,
    regs::{Reg, RegisterPool},
    InstrFormat, TestContext,
};

/// Constraints and forced values for [`generate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overrides {
    /// Whether `x0` may fill a register role.
    pub allow_x0: bool,
    pub rs1val: Option<u64>,
    pub rs2val: Option<u64>,
    pub immval: Option<i64>,
}

impl Default for Overrides {
    fn default() -> Self {
        Self {
            allow_x0: true,
            rs1val: None,
            rs2val: None,
            immval: None,
        }
    }
}

impl Overrides {
    pub fn no_x0(mut self) -> Self {
        self.allow_x0 = false;
        self
    }

    pub fn rs1val(mut self, v: u64) -> Self {
        self.rs1val = Some(v);
        self
    }

    pub fn rs2val(mut self, v: u64) -> Self {
        self.rs2val = Some(v);
        self
    }

    pub fn immval(mut self, v: i64) -> Self {
        self.immval = Some(v);
        self
    }
}

/// Registers and values of one test case.
///
/// `used_int_regs` lists every register borrowed from the pool for this set,
/// in the order they were taken. They go back to the pool exactly once, after
/// the test case has been emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamSet {
    pub rs1: Option<Reg>,
    pub rs2: Option<Reg>,
    pub rd: Option<Reg>,
    pub rs1val: Option<u64>,
    pub rs2val: Option<u64>,
    pub immval: Option<i64>,
    pub used_int_regs: Vec<Reg>,
}

impl ParamSet {
    /// Registers filling a role.
    pub fn roles(&self) -> impl Iterator<Item = Reg> + '_ {
        [self.rs1, self.rs2, self.rd].into_iter().flatten()
    }

    /// Replace `rd` by a register the instruction writes implicitly. The old
    /// `rd` goes back to the pool and `reg` is consumed in its place.
    pub fn pin_rd(&mut self, pool: &mut RegisterPool, reg: Reg) -> Result<()> {
        if self.rd == Some(reg) {
            return Ok(());
        }
        if let Some(old) = self.rd.take() {
            pool.release(old)?;
            self.used_int_regs.retain(|&r| r != old);
        }
        pool.consume_fixed(&[reg])?;
        self.rd = Some(reg);
        self.used_int_regs.push(reg);
        Ok(())
    }
}

fn class_exclusions(class: RegClass) -> Vec<Reg> {
    match class {
        RegClass::Any => Vec::new(),
        RegClass::NonZero => vec![Reg::ZERO],
        RegClass::Compressed => Reg::all().filter(|r| !r.is_compressed()).collect(),
    }
}

/// Pick registers and operand values for one test case of `format`.
///
/// Registers are taken from the context's pool; on failure the ones already
/// taken are returned before the error is reported. A forced immediate must
/// lie in the format's range.
pub fn generate(ctx: &mut TestContext, format: InstrFormat, overrides: &Overrides) -> Result<ParamSet> {
    let shape = format.shape();
    let mut params = ParamSet::default();

    let roles = [
        (shape.rs1, format.rs1_class()),
        (shape.rs2, format.rs2_class()),
        (shape.rd, format.rd_class()),
    ];
    let mut regs = [None; 3];
    for (i, (present, class)) in roles.into_iter().enumerate() {
        if !present {
            continue;
        }
        let mut exclude = params.used_int_regs.clone();
        if !overrides.allow_x0 {
            exclude.push(Reg::ZERO);
        }
        exclude.extend(class_exclusions(class));
        exclude.extend_from_slice(format.implicit_regs());
        match ctx.pool.acquire(&exclude) {
            Ok(r) => {
                regs[i] = Some(r);
                params.used_int_regs.push(r);
            }
            Err(e) => {
                ctx.pool.release_many(&params.used_int_regs)?;
                return Err(e);
            }
        }
    }
    [params.rs1, params.rs2, params.rd] = regs;

    if shape.rs1val {
        params.rs1val = Some(match overrides.rs1val {
            Some(v) => v,
            None => ctx.random_value(),
        });
    }
    if shape.rs2val {
        params.rs2val = Some(match overrides.rs2val {
            Some(v) => v,
            None => ctx.random_value(),
        });
    }
    if let Some(range) = format.imm_range(ctx.xlen) {
        params.immval = Some(match overrides.immval {
            Some(imm) if !range.contains(imm) => {
                ctx.pool.release_many(&params.used_int_regs)?;
                return Err(GenError::ImmOutOfRange { format, imm });
            }
            Some(v) => v,
            None => {
                let (lo, hi) = range.bounds();
                ctx.random_in(lo, hi)
            }
        });
    }

    tracing::debug!(
        "{format} params: rs1 = {:?}, rs2 = {:?}, rd = {:?}, imm = {:?}",
        params.rs1,
        params.rs2,
        params.rd,
        params.immval
    );
    Ok(params)
}
