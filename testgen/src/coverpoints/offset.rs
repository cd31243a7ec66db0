//! Forward and backward control transfers.
//!
//! Every sequence records a check register that reads 1 when the transfer
//! was taken and 0 when it fell through. Link registers are recorded relative
//! to a nearby `auipc`, so the signature does not depend on where the test is
//! loaded.

use super::TestCase;
use crate::{
    error::Result,
    formatter::Check,
    params::{Overrides, ParamSet},
    regs::Reg,
    InstrFormat, TestContext,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Variant {
    Plain,
    /// Also test that the low bits of an indirect target are dropped.
    Jalr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// How a conditional branch is made to always be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Taken {
    /// `x0` compared with itself.
    SelfCompare,
    /// `x0` compared with a register holding 1.
    AgainstOne,
    /// Single-operand compressed branch on a register holding this value.
    Operand(u64),
}

fn taken_form(instr: &str) -> Option<Taken> {
    match instr.to_ascii_lowercase().as_str() {
        "beq" | "bge" | "bgeu" => Some(Taken::SelfCompare),
        "bne" | "blt" | "bltu" => Some(Taken::AgainstOne),
        "c.beqz" => Some(Taken::Operand(0)),
        "c.bnez" => Some(Taken::Operand(1)),
        _ => None,
    }
}

fn role(reg: Option<Reg>, case: &TestCase<'_>) -> Result<Reg> {
    reg.ok_or_else(|| case.unsupported_format())
}

/// Setup lines and the transfer instruction jumping to `target`.
fn transfer(
    case: &TestCase<'_>,
    params: &ParamSet,
    target: &str,
) -> Result<(Vec<String>, String)> {
    let instr = case.instr;
    Ok(match case.format {
        InstrFormat::B => match taken_form(instr) {
            Some(Taken::SelfCompare) => (Vec::new(), format!("{instr} x0, x0, {target}")),
            Some(Taken::AgainstOne) => {
                let rs2 = role(params.rs2, case)?;
                (
                    vec![format!("LI({rs2}, 1) # make the branch taken")],
                    format!("{instr} x0, {rs2}, {target}"),
                )
            }
            _ => return Err(case.unsupported_variant()),
        },
        InstrFormat::CB => match taken_form(instr) {
            Some(Taken::Operand(v)) => {
                let rs1 = role(params.rs1, case)?;
                (
                    vec![format!("LI({rs1}, {v}) # make the branch taken")],
                    format!("{instr} {rs1}, {target}"),
                )
            }
            _ => return Err(case.unsupported_variant()),
        },
        InstrFormat::CJ => (Vec::new(), format!("{instr} {target}")),
        InstrFormat::JR => {
            let (rs1, rd) = (role(params.rs1, case)?, role(params.rd, case)?);
            (
                vec![format!("LA({rs1}, {target}) # load jump target")],
                format!("{instr} {rd}, {rs1}, 0"),
            )
        }
        InstrFormat::CJR | InstrFormat::CJALR => {
            let rs1 = role(params.rs1, case)?;
            (
                vec![format!("LA({rs1}, {target}) # load jump target")],
                format!("{instr} {rs1}"),
            )
        }
        _ => return Err(case.unsupported_format()),
    })
}

/// Record `rd` relative to the pc of a following `auipc`.
fn link_check(ctx: &mut TestContext, rd: Reg, lines: &mut Vec<String>) -> Result<()> {
    ctx.with_regs(1, &[Reg::ZERO], |ctx, regs| {
        let pc = regs[0];
        lines.push(format!("auipc {pc}, 0 # sample pc"));
        lines.push(format!("sub {rd}, {rd}, {pc} # make link position-independent"));
        lines.push(ctx.check(Check::Reg(rd)));
        Ok(())
    })
}

/// Whether the format writes a link register the test records.
fn links(format: InstrFormat) -> bool {
    matches!(format, InstrFormat::JR | InstrFormat::CJALR)
}

fn offset_bin(case: &TestCase<'_>, ctx: &mut TestContext, dir: Direction) -> Result<String> {
    ctx.with_params(case.format, &Overrides::default().no_x0(), |ctx, params| {
        if case.format == InstrFormat::CJALR {
            // c.jalr always links into x1
            params.pin_rd(&mut ctx.pool, Reg::RA)?;
        }
        ctx.with_regs(1, &[Reg::ZERO], |ctx, regs| {
            let chk = regs[0];
            let mut lines = Vec::new();
            let (setup, jump) = match dir {
                Direction::Forward => {
                    lines.push(format!("# {} positive bin", case.coverpoint));
                    transfer(case, params, "1f")?
                }
                Direction::Backward => {
                    lines.push(format!("# {} negative bin", case.coverpoint));
                    lines.push("j 2f # jump past backward target".into());
                    lines.push("1: j 3f # backward target: jump past the transfer".into());
                    lines.push("2:".into());
                    transfer(case, params, "1b")?
                }
            };
            lines.extend(setup);
            lines.push(format!("LI({chk}, 1) # taken"));
            lines.push(jump);
            lines.push(format!("LI({chk}, 0) # not taken"));
            lines.push(
                match dir {
                    Direction::Forward => "1:",
                    Direction::Backward => "3:",
                }
                .into(),
            );
            lines.push(ctx.check(Check::Reg(chk)));
            if links(case.format) {
                link_check(ctx, role(params.rd, case)?, &mut lines)?;
            }
            Ok(lines.join("\n"))
        })
    })
}

/// Forward then backward jump in one stream. The check register starts at
/// 2 and ends at 22 only when both jumps are taken.
fn offset_j(case: &TestCase<'_>, ctx: &mut TestContext) -> Result<String> {
    let instr = case.instr;
    ctx.with_params(case.format, &Overrides::default().no_x0(), |ctx, params| {
        let rd = role(params.rd, case)?;
        ctx.with_regs(1, &[Reg::ZERO], |ctx, regs| {
            let chk = regs[0];
            let mut lines = vec![
                format!("# {}", case.coverpoint),
                format!("LI({chk}, 2) # initialize check register"),
                "j 2f # jump past backward target".into(),
                format!("5: addi {chk}, {chk}, 13 # backward jump taken"),
                "j 4f # jump past forward jump test".into(),
                format!("2: {instr} {rd}, 3f # forward jump"),
                format!("addi {chk}, {chk}, -6 # forward jump not taken"),
                format!("3: addi {chk}, {chk}, 7 # forward jump taken"),
            ];
            link_check(ctx, rd, &mut lines)?;
            lines.push(ctx.check(Check::Reg(chk)));
            lines.push(format!("{instr} {rd}, 5b # backward jump"));
            lines.push(format!("addi {chk}, {chk}, -3 # backward jump not taken"));
            lines.push("4:".into());
            link_check(ctx, rd, &mut lines)?;
            lines.push(ctx.check(Check::Reg(chk)));
            Ok(lines.join("\n"))
        })
    })
}

/// Indirect jumps to `label + b` for every bias `b` in 0..=3. The low bit is
/// always dropped; `jalr` cancels bit 1 through its immediate while the
/// compressed forms land on a 2-byte pad after the label.
fn offset_lsbs(case: &TestCase<'_>, ctx: &mut TestContext) -> Result<String> {
    let instr = case.instr;
    let compressed = case.format.is_compressed();
    ctx.with_params(case.format, &Overrides::default().no_x0(), |ctx, params| {
        if case.format == InstrFormat::CJALR {
            params.pin_rd(&mut ctx.pool, Reg::RA)?;
        }
        let target = role(params.rs1, case)?;
        ctx.with_regs(1, &[Reg::ZERO], |ctx, regs| {
            let chk = regs[0];
            let mut lines = vec![format!("# {} low bits of target", case.coverpoint)];
            for bias in 0..4i64 {
                let label = ctx.fresh_label(&format!("{instr}_lsb{bias:02b}"));
                lines.push(format!("LA({target}, {label}) # load address of label"));
                lines.push(format!("addi {target}, {target}, {bias} # add bias"));
                lines.push(format!("LI({chk}, 1) # taken"));
                if compressed {
                    lines.push(format!("{instr} {target}"));
                } else {
                    let rd = role(params.rd, case)?;
                    lines.push(format!("{instr} {rd}, {target}, {}", -(bias & 2)));
                }
                lines.push(format!("LI({chk}, 0) # not taken"));
                lines.push(".align 2".into());
                lines.push(format!("{label}:"));
                if compressed {
                    lines.push("c.nop # landing pad for label + 2".into());
                }
                lines.push(ctx.check(Check::Reg(chk)));
                if links(case.format) {
                    link_check(ctx, role(params.rd, case)?, &mut lines)?;
                }
            }
            Ok(lines.join("\n"))
        })
    })
}

/// `cp_offset` and `cp_offset_jalr`.
pub fn make_offset(case: &TestCase<'_>, ctx: &mut TestContext) -> Result<Vec<String>> {
    let variant = match case.suffix() {
        "" => Variant::Plain,
        "_jalr" => Variant::Jalr,
        _ => return Err(case.unsupported_variant()),
    };
    if !case.format.is_control() {
        return Err(case.unsupported_format());
    }
    let indirect = matches!(
        case.format,
        InstrFormat::JR | InstrFormat::CJR | InstrFormat::CJALR
    );
    if variant == Variant::Jalr && !indirect {
        return Err(case.unsupported_variant());
    }

    let mut blocks = if case.format == InstrFormat::J {
        vec![offset_j(case, ctx)?]
    } else {
        vec![
            offset_bin(case, ctx, Direction::Forward)?,
            offset_bin(case, ctx, Direction::Backward)?,
        ]
    };
    if variant == Variant::Jalr {
        blocks.push(offset_lsbs(case, ctx)?);
    }
    Ok(blocks)
}
