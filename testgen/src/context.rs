//! Session state shared by every generator: register width, register pool,
//! random stream and the formatting collaborators.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    error::Result,
    formatter::{AsmFormatter, Check, InstrFormatter, Rendered, SigUpd, SignatureWriter},
    params::{generate, Overrides, ParamSet},
    regs::{Reg, RegisterPool},
    InstrFormat,
};

/// Register width of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Xlen {
    X32,
    #[default]
    X64,
}

impl Xlen {
    pub fn bits(self) -> u32 {
        match self {
            Xlen::X32 => 32,
            Xlen::X64 => 64,
        }
    }

    pub fn mask(self) -> u64 {
        match self {
            Xlen::X32 => u32::MAX as u64,
            Xlen::X64 => u64::MAX,
        }
    }

    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            32 => Some(Xlen::X32),
            64 => Some(Xlen::X64),
            _ => None,
        }
    }
}

/// Options of a generation session.
#[derive(Debug, Clone)]
pub struct GenOption {
    xlen: Xlen,
    seed: u64,
    reserved: Vec<Reg>,
    sig_reg: Reg,
}

impl Default for GenOption {
    fn default() -> Self {
        Self {
            xlen: Xlen::default(),
            seed: 0,
            // link register, stack pointer and signature pointer
            reserved: vec![Reg::RA, Reg::SP, Reg::GP],
            sig_reg: Reg::GP,
        }
    }
}

impl GenOption {
    pub fn set_xlen(mut self, xlen: Xlen) -> Self {
        self.xlen = xlen;
        self
    }

    pub fn set_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Registers kept out of general allocation. The signature pointer is
    /// always added.
    pub fn set_reserved(mut self, reserved: &[Reg]) -> Self {
        self.reserved = reserved.to_vec();
        self
    }

    pub fn set_sig_reg(mut self, reg: Reg) -> Self {
        self.sig_reg = reg;
        self
    }
}

/// Mutable state of one test-file generation session.
pub struct TestContext {
    pub xlen: Xlen,
    pub seed: u64,
    pub pool: RegisterPool,
    /// Base register of the signature area.
    pub sig_reg: Reg,
    rng: StdRng,
    labels: u32,
    formatter: Box<dyn InstrFormatter>,
    signature: Box<dyn SignatureWriter>,
}

impl TestContext {
    pub fn new(option: GenOption) -> Self {
        Self::with_collaborators(option, Box::new(AsmFormatter), Box::new(SigUpd))
    }

    pub fn with_collaborators(
        option: GenOption,
        formatter: Box<dyn InstrFormatter>,
        signature: Box<dyn SignatureWriter>,
    ) -> Self {
        let mut reserved = option.reserved;
        if !reserved.contains(&option.sig_reg) {
            reserved.push(option.sig_reg);
        }
        Self {
            xlen: option.xlen,
            seed: option.seed,
            // the pool draws from its own stream so that register choice and
            // operand values do not shift each other
            pool: RegisterPool::with_reserved(option.seed ^ 0x9e37_79b9_7f4a_7c15, &reserved),
            sig_reg: option.sig_reg,
            rng: StdRng::seed_from_u64(option.seed),
            labels: 0,
            formatter,
            signature,
        }
    }

    /// A random register value of full width.
    pub fn random_value(&mut self) -> u64 {
        self.rng.gen::<u64>() & self.xlen.mask()
    }

    /// A random integer in `lo..=hi`.
    pub fn random_in(&mut self, lo: i64, hi: i64) -> i64 {
        self.rng.gen_range(lo..=hi)
    }

    /// A label name no other test case of this session uses.
    pub fn fresh_label(&mut self, stem: &str) -> String {
        let label = format!("{}_{}", stem.replace('.', "_"), self.labels);
        self.labels += 1;
        label
    }

    /// Hex literal as wide as a register.
    pub fn fmt_xlen(&self, v: u64) -> String {
        format!(
            "{:#0width$x}",
            v & self.xlen.mask(),
            width = self.xlen.bits() as usize / 4 + 2
        )
    }

    /// Record a register or a literal in the signature area.
    pub fn check(&self, what: Check) -> String {
        self.signature.emit_check(what, self)
    }

    pub fn render(&self, instr: &str, format: InstrFormat, params: &ParamSet) -> Result<Rendered> {
        self.formatter.render(instr, format, self, params)
    }

    pub fn format_one(
        &self,
        instr: &str,
        format: InstrFormat,
        params: &ParamSet,
        desc: &str,
    ) -> Result<String> {
        self.formatter.format_one(instr, format, self, params, desc)
    }

    /// Generate a parameter set, hand it to `f` and return its registers to
    /// the pool afterwards, whether `f` succeeded or not.
    pub fn with_params<T>(
        &mut self,
        format: InstrFormat,
        overrides: &Overrides,
        f: impl FnOnce(&mut Self, &mut ParamSet) -> Result<T>,
    ) -> Result<T> {
        let mut params = generate(self, format, overrides)?;
        let out = f(self, &mut params);
        let returned = self.pool.release_many(&params.used_int_regs);
        let v = out?;
        returned?;
        Ok(v)
    }

    /// Borrow `count` temporaries for the duration of `f`.
    pub fn with_regs<T>(
        &mut self,
        count: usize,
        exclude: &[Reg],
        f: impl FnOnce(&mut Self, &[Reg]) -> Result<T>,
    ) -> Result<T> {
        let regs = self.pool.acquire_many(count, exclude)?;
        let out = f(self, &regs);
        let returned = self.pool.release_many(&regs);
        let v = out?;
        returned?;
        Ok(v)
    }
}
