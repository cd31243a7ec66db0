//! Test plans: which coverpoints to generate for which instructions, and the
//! driver that turns a plan into one test file.
//!
//! A plan is line based. Each non-empty line that does not start with `#`
//! reads `<instr> <format> <coverpoint>...`.

use anyhow::{bail, Context};

use crate::{CoverpointRegistry, InstrFormat, TestContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub instr: String,
    pub format: InstrFormat,
    pub coverpoints: Vec<String>,
}

pub fn parse_plan(text: &str) -> anyhow::Result<Vec<PlanEntry>> {
    let mut plan = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut words = line.split_whitespace();
        let (Some(instr), Some(format)) = (words.next(), words.next()) else {
            bail!("line {}: expected `<instr> <format> <coverpoint>...`", i + 1);
        };
        let format = format
            .parse::<InstrFormat>()
            .with_context(|| format!("line {}: instruction `{instr}`", i + 1))?;
        let coverpoints: Vec<String> = words.map(str::to_string).collect();
        if coverpoints.is_empty() {
            bail!("line {}: no coverpoint given for `{instr}`", i + 1);
        }
        plan.push(PlanEntry {
            instr: instr.to_string(),
            format,
            coverpoints,
        });
    }
    Ok(plan)
}

/// A pair that produced no test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub instr: String,
    pub coverpoint: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct PlanOutput {
    /// Text blocks in plan order.
    pub blocks: Vec<String>,
    /// Number of (instruction, coverpoint) pairs that succeeded.
    pub generated: usize,
    pub failures: Vec<Failure>,
}

/// Dispatch every (instruction, coverpoint) pair of `plan` in order. A pair
/// that fails is logged, recorded and skipped.
pub fn run_plan(
    ctx: &mut TestContext,
    registry: &CoverpointRegistry,
    plan: &[PlanEntry],
) -> PlanOutput {
    let mut out = PlanOutput::default();
    for entry in plan {
        for cp in &entry.coverpoints {
            match registry.dispatch(&entry.instr, entry.format, cp, ctx) {
                Ok(blocks) => {
                    out.blocks.push(format!("## {} {cp}", entry.instr));
                    out.blocks.extend(blocks);
                    out.generated += 1;
                }
                Err(e) => {
                    tracing::warn!("skip {cp} of {}: {e}", entry.instr);
                    out.failures.push(Failure {
                        instr: entry.instr.clone(),
                        coverpoint: cp.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }
    tracing::info!(
        "{} pairs generated, {} failed",
        out.generated,
        out.failures.len()
    );
    out
}

/// The whole test file: a header naming the session parameters followed by
/// the blocks separated by blank lines.
pub fn render_file(ctx: &TestContext, out: &PlanOutput) -> String {
    let mut text = format!(
        "# generated by cvgen {}\n# xlen = {}, seed = {}\n",
        env!("CARGO_PKG_VERSION"),
        ctx.xlen.bits(),
        ctx.seed
    );
    for block in &out.blocks {
        text.push('\n');
        text.push_str(block);
        text.push('\n');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GenOption;

    const PLAN: &str = "
# crypto
aes64ks1i KRNUM cp_rnum

lw L cp_align_word cp_memval_word
add R cp_bogus
";

    #[test]
    fn test_parse_plan() {
        let plan = parse_plan(PLAN).unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[1].format, InstrFormat::L);
        assert_eq!(plan[1].coverpoints, ["cp_align_word", "cp_memval_word"]);
    }

    #[test]
    fn test_parse_errors() {
        let err = parse_plan("add\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));
        let err = parse_plan("\nadd R4 cp_x\n").unwrap_err();
        assert!(format!("{err:#}").contains("unsupported instruction format `R4`"));
        assert!(parse_plan("add R\n").is_err());
    }

    #[test]
    fn test_run_plan_skips_failures() {
        let plan = parse_plan(PLAN).unwrap();
        let mut ctx = TestContext::new(GenOption::default());
        let out = run_plan(&mut ctx, &CoverpointRegistry::builtin(), &plan);
        assert_eq!(out.generated, 3);
        assert_eq!(
            out.failures,
            [Failure {
                instr: "add".into(),
                coverpoint: "cp_bogus".into(),
                message: "no coverpoint generator for `cp_bogus` (instruction `add`)".into(),
            }]
        );
        assert_eq!(out.blocks[0], "## aes64ks1i cp_rnum");

        let text = render_file(&ctx, &out);
        assert!(text.starts_with("# generated by cvgen"));
        assert!(text.contains("# xlen = 64, seed = 0\n"));
        assert!(ctx.pool.lent().is_empty());
    }
}
