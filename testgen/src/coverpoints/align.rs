use super::TestCase;
use crate::{
    error::Result,
    formatter::Check,
    params::Overrides,
    regs::Reg,
    InstrFormat, TestContext,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alignment {
    Byte,
    Hword,
    Word,
}

impl Alignment {
    /// Offsets from an 8-byte aligned base, ascending.
    fn offsets(self) -> Vec<i64> {
        match self {
            Alignment::Byte => (0..8).collect(),
            Alignment::Hword => (0..8).step_by(2).collect(),
            Alignment::Word => vec![0, 4],
        }
    }
}

/// Memory accesses at every offset of the given granularity within a
/// doubleword. The access uses `scratch` as its base, so the formatter's
/// base-correcting setup is left out.
///
/// Loads find the test value stored at `scratch + offset`. Stores overwrite a
/// register-wide word filled with the complement of the test value, and that
/// word is read back.
pub fn make_align(case: &TestCase<'_>, ctx: &mut TestContext) -> Result<Vec<String>> {
    let alignment = match case.suffix() {
        "_byte" => Alignment::Byte,
        "_hword" => Alignment::Hword,
        "_word" => Alignment::Word,
        _ => return Err(case.unsupported_variant()),
    };
    let store = match case.format {
        InstrFormat::L => false,
        InstrFormat::S => true,
        _ => return Err(case.unsupported_format()),
    };
    let word_bytes = ctx.xlen.bits() as i64 / 8;

    let mut blocks = Vec::new();
    for offset in alignment.offsets() {
        let mut overrides = Overrides::default().immval(offset);
        if store {
            overrides = overrides.no_x0();
        }
        let block = ctx.with_params(case.format, &overrides, |ctx, params| {
            let (Some(base), Some(data), Some(val)) = (params.rs1, params.rs2, params.rs2val) else {
                return Err(case.unsupported_format());
            };
            let mut lines = vec![format!("# {}: imm[2:0]={offset:03b}", case.coverpoint)];
            let rendered = ctx.render(case.instr, case.format, params)?;
            if store {
                let word = offset - offset % word_bytes;
                let fill = !val & ctx.xlen.mask();
                lines.push(format!("LI({data}, {}) # initialize memory", ctx.fmt_xlen(fill)));
                lines.push(format!("LA({base}, scratch) # load base address"));
                lines.push(format!("SREG {data}, {word}({base}) # fill the word under test"));
                lines.push(format!("LI({data}, {}) # initialize rs2", ctx.fmt_xlen(val)));
                lines.extend(rendered.body);
                lines.push(format!("LREG {data}, {word}({base}) # read back the word under test"));
                lines.push(ctx.check(Check::Reg(data)));
            } else {
                if data != Reg::ZERO {
                    lines.push(format!("LI({data}, {}) # initialize rs2", ctx.fmt_xlen(val)));
                }
                lines.push(format!("LA({base}, scratch) # load base address"));
                lines.push(format!("SREG {data}, {offset}({base}) # store test value to memory"));
                lines.extend(rendered.body);
                lines.extend(rendered.check);
            }
            Ok(lines.join("\n"))
        })?;
        blocks.push(block);
    }
    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::GenError, GenOption, Xlen};

    fn offsets_of(blocks: &[String]) -> Vec<String> {
        blocks
            .iter()
            .map(|b| b.lines().next().unwrap().rsplit('=').next().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_alignment_offsets() {
        let mut ctx = TestContext::new(GenOption::default().set_seed(3));
        let case = TestCase::new("lw", InstrFormat::L, "cp_align_byte");
        let blocks = make_align(&case, &mut ctx).unwrap();
        assert_eq!(
            offsets_of(&blocks),
            ["000", "001", "010", "011", "100", "101", "110", "111"]
        );

        let case = TestCase::new("lh", InstrFormat::L, "cp_align_hword");
        let blocks = make_align(&case, &mut ctx).unwrap();
        assert_eq!(offsets_of(&blocks), ["000", "010", "100", "110"]);

        let case = TestCase::new("sw", InstrFormat::S, "cp_align_word");
        let blocks = make_align(&case, &mut ctx).unwrap();
        assert_eq!(offsets_of(&blocks), ["000", "100"]);
        assert!(ctx.pool.lent().is_empty());
    }

    #[test]
    fn test_no_offset_correction() {
        let mut ctx = TestContext::new(GenOption::default());
        let case = TestCase::new("lw", InstrFormat::L, "cp_align_word");
        let blocks = make_align(&case, &mut ctx).unwrap();
        let last = &blocks[1];
        assert!(!last.contains("correct base"));
        assert!(last.lines().any(|l| l.starts_with("SREG ") && l.contains(", 4(x")));
        assert!(last.lines().any(|l| l.starts_with("lw ") && l.contains(", 4(x")));
        assert!(last.lines().last().unwrap().starts_with("RVTEST_SIGUPD"));
    }

    fn li_value(line: &str) -> &str {
        &line[line.find(", ").unwrap() + 2..line.find(')').unwrap()]
    }

    #[test]
    fn test_store_observed_in_its_word() {
        let mut ctx = TestContext::new(GenOption::default().set_xlen(Xlen::X32).set_seed(4));
        let case = TestCase::new("sw", InstrFormat::S, "cp_align_word");
        let blocks = make_align(&case, &mut ctx).unwrap();
        let lines: Vec<&str> = blocks[1].lines().collect();
        let store = lines.iter().position(|l| l.starts_with("sw ")).unwrap();
        assert!(lines[store].contains(", 4(x"));

        let fill = lines.iter().find(|l| l.ends_with("# initialize memory")).unwrap();
        let data = lines.iter().find(|l| l.ends_with("# initialize rs2")).unwrap();
        assert_ne!(li_value(fill), li_value(data));
        assert!(lines.iter().any(|l| l.starts_with("SREG ") && l.contains(", 4(x")));

        // the read back follows the store and covers the stored word
        assert!(lines[store + 1].starts_with("LREG ") && lines[store + 1].contains(", 4(x"));
        assert!(lines[store + 2].starts_with("RVTEST_SIGUPD"));

        let case = TestCase::new("sb", InstrFormat::S, "cp_align_byte");
        let blocks = make_align(&case, &mut ctx).unwrap();
        assert!(blocks[5].lines().any(|l| l.starts_with("sb ") && l.contains(", 5(x")));
        assert!(blocks[5].lines().any(|l| l.starts_with("LREG ") && l.contains(", 4(x")));
        assert!(ctx.pool.lent().is_empty());
    }

    #[test]
    fn test_rejects() {
        let mut ctx = TestContext::new(GenOption::default());
        let case = TestCase::new("add", InstrFormat::R, "cp_align_byte");
        assert!(matches!(
            make_align(&case, &mut ctx),
            Err(GenError::UnsupportedFormat(_))
        ));
        let case = TestCase::new("lw", InstrFormat::L, "cp_align_dword");
        assert!(matches!(
            make_align(&case, &mut ctx),
            Err(GenError::UnsupportedVariant { .. })
        ));
    }
}
