//! Default text collaborators: the instruction formatter and the signature
//! writer.

use std::collections::HashMap;

use interpolator::Formattable;

use crate::{
    error::{GenError, Result},
    params::ParamSet,
    regs::Reg,
    InstrFormat, TestContext,
};

/// What a signature update records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    Reg(Reg),
    Value(u64),
}

/// Emits the line that records a result for comparison against the
/// reference model.
pub trait SignatureWriter {
    fn emit_check(&self, what: Check, ctx: &TestContext) -> String;
}

/// `RVTEST_SIGUPD` based signature updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigUpd;

impl SignatureWriter for SigUpd {
    fn emit_check(&self, what: Check, ctx: &TestContext) -> String {
        match what {
            Check::Reg(r) => format!("RVTEST_SIGUPD({}, {r})", ctx.sig_reg),
            Check::Value(v) => format!("RVTEST_SIGUPD_IMM({}, {})", ctx.sig_reg, ctx.fmt_xlen(v)),
        }
    }
}

/// The three parts of a rendered test case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendered {
    /// Puts operand values in place.
    pub setup: Vec<String>,
    /// The instruction under test, with any labels it needs.
    pub body: Vec<String>,
    /// Records the observable result.
    pub check: Vec<String>,
}

impl Rendered {
    pub fn into_lines(self) -> impl Iterator<Item = String> {
        self.setup.into_iter().chain(self.body).chain(self.check)
    }
}

/// Turns an operand assignment into assembly text. Implementations only read
/// the parameter set and the context.
pub trait InstrFormatter {
    fn render(
        &self,
        instr: &str,
        format: InstrFormat,
        ctx: &TestContext,
        params: &ParamSet,
    ) -> Result<Rendered>;

    /// One complete test case headed by a `# desc` comment.
    fn format_one(
        &self,
        instr: &str,
        format: InstrFormat,
        ctx: &TestContext,
        params: &ParamSet,
        desc: &str,
    ) -> Result<String> {
        let rendered = self.render(instr, format, ctx, params)?;
        let lines: Vec<String> = std::iter::once(format!("# {desc}"))
            .chain(rendered.into_lines())
            .collect();
        Ok(lines.join("\n"))
    }
}

/// Renders the test macros of the architectural test suite (`LI`, `LA`,
/// `SREG`, `LREG`, `RVTEST_SIGUPD`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AsmFormatter;

const LOAD: &str = "LI({reg}, {val}) # initialize {role}";

fn body_template(format: InstrFormat) -> &'static [&'static str] {
    use InstrFormat::*;
    match format {
        R => &["{instr} {rd}, {rs1}, {rs2}"],
        KBS => &["{instr} {rd}, {rs1}, {rs2}, {imm}"],
        I | IS | ISW | KRNUM => &["{instr} {rd}, {rs1}, {imm}"],
        L => &["{instr} {rd}, {imm}({rs1})"],
        S => &["{instr} {rs2}, {imm}({rs1})"],
        B => &["{instr} {rs1}, {rs2}, 1f", "addi {rs1}, {rs1}, 1 # only when not taken", "1:"],
        J => &["{instr} {rd}, 1f", "nop", "1:"],
        JR => &["{instr} {rd}, {imm}({rs1})", "nop", "1:"],
        CR => &["{instr} {rd}, {rs2}"],
        CI | CIS => &["{instr} {rd}, {imm}"],
        CB => &["{instr} {rs1}, 1f", "c.addi {rs1}, 1 # only when not taken", "1:"],
        CJ => &["{instr} 1f", "c.nop", "1:"],
        CJR | CJALR => &["{instr} {rs1}", "c.nop", "1:"],
    }
}

/// Setup lines besides the value loads: base addresses and jump targets.
fn address_template(format: InstrFormat) -> &'static [&'static str] {
    use InstrFormat::*;
    match format {
        L => &[
            "LA({rs1}, scratch) # load base address",
            "SREG {rs2}, 0({rs1}) # store test value to memory",
        ],
        S => &["LA({rs1}, scratch) # load base address"],
        JR => &["LA({rs1}, 1f) # load target address"],
        CJR | CJALR => &["LA({rs1}, 1f) # load target address"],
        _ => &[],
    }
}

/// Moves `rs1` back by the immediate so that `imm(rs1)` is the loaded address.
fn correction_template(format: InstrFormat) -> Option<&'static str> {
    use InstrFormat::*;
    match format {
        L | S => Some("addi {rs1}, {rs1}, {step} # correct base for the offset"),
        JR => Some("addi {rs1}, {rs1}, {step} # correct target for the offset"),
        _ => None,
    }
}

/// `addi` steps adding up to `-imm`. Negating -2048 leaves the 12-bit range
/// and takes two steps.
fn correction_steps(imm: i64) -> Result<Vec<i64>> {
    match imm {
        -2048 => Ok(vec![2047, 1]),
        -2047..=2047 => Ok(vec![-imm]),
        _ => Err(GenError::Template(format!(
            "offset {imm} does not fit a 12-bit immediate"
        ))),
    }
}

fn fill(template: &str, vars: &HashMap<&'static str, String>) -> Result<String> {
    let args: HashMap<&str, Formattable> = vars
        .iter()
        .map(|(k, v)| (*k, Formattable::display(v)))
        .collect();
    interpolator::format(template, &args)
        .map_err(|e| GenError::Template(format!("`{template}`: {e}")))
}

impl AsmFormatter {
    fn vars(&self, instr: &str, params: &ParamSet) -> HashMap<&'static str, String> {
        let mut vars = HashMap::from([("instr", instr.to_string())]);
        for (name, reg) in [("rd", params.rd), ("rs1", params.rs1), ("rs2", params.rs2)] {
            if let Some(r) = reg {
                vars.insert(name, r.to_string());
            }
        }
        if let Some(imm) = params.immval {
            vars.insert("imm", imm.to_string());
        }
        vars
    }

    /// Load value roles. `x0` reads as zero whatever is written, so it gets
    /// no load.
    fn loads(&self, format: InstrFormat, ctx: &TestContext, params: &ParamSet) -> Result<Vec<String>> {
        let shape = format.shape();
        // formats without rs1 take rs1val as the initial value of rd
        let first = if shape.rs1 {
            (params.rs1, "rs1")
        } else {
            (params.rd, "rd")
        };
        let mut lines = Vec::new();
        for ((reg, role), val) in [(first, params.rs1val), ((params.rs2, "rs2"), params.rs2val)] {
            let (Some(reg), Some(val)) = (reg, val) else {
                continue;
            };
            if reg == Reg::ZERO {
                continue;
            }
            let vars = HashMap::from([
                ("reg", reg.to_string()),
                ("val", ctx.fmt_xlen(val)),
                ("role", role.to_string()),
            ]);
            lines.push(fill(LOAD, &vars)?);
        }
        Ok(lines)
    }

    fn checks(
        &self,
        format: InstrFormat,
        ctx: &TestContext,
        params: &ParamSet,
        vars: &HashMap<&'static str, String>,
    ) -> Result<Vec<String>> {
        use InstrFormat::*;
        let missing = |role: &str| GenError::Template(format!("{format} needs `{role}` to be checked"));
        Ok(match format {
            R | I | IS | ISW | L | KBS | KRNUM | CR | CI | CIS => {
                vec![ctx.check(Check::Reg(params.rd.ok_or_else(|| missing("rd"))?))]
            }
            S => {
                let rs2 = params.rs2.ok_or_else(|| missing("rs2"))?;
                vec![
                    fill("LA({rs1}, scratch) # reload base address", vars)?,
                    fill("LREG {rs2}, 0({rs1}) # read back stored value", vars)?,
                    ctx.check(Check::Reg(rs2)),
                ]
            }
            B | CB => vec![ctx.check(Check::Reg(params.rs1.ok_or_else(|| missing("rs1"))?))],
            // link values depend on the load address; the offset coverpoints
            // record them position-independently
            J | JR | CJ | CJR | CJALR => Vec::new(),
        })
    }
}

impl InstrFormatter for AsmFormatter {
    fn render(
        &self,
        instr: &str,
        format: InstrFormat,
        ctx: &TestContext,
        params: &ParamSet,
    ) -> Result<Rendered> {
        let vars = self.vars(instr, params);

        let mut setup = self.loads(format, ctx, params)?;
        for t in address_template(format) {
            setup.push(fill(t, &vars)?);
        }
        if let Some(t) = correction_template(format) {
            let imm = params
                .immval
                .ok_or_else(|| GenError::Template(format!("{format} needs `imm` for its address")))?;
            for step in correction_steps(imm)? {
                let mut vars = vars.clone();
                vars.insert("step", step.to_string());
                setup.push(fill(t, &vars)?);
            }
        }
        let body = body_template(format)
            .iter()
            .map(|t| fill(t, &vars))
            .collect::<Result<Vec<_>>>()?;
        let check = self.checks(format, ctx, params, &vars)?;

        Ok(Rendered { setup, body, check })
    }
}
