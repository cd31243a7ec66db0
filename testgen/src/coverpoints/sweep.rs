//! Exhaustive sweeps over small fields: shift amounts, crypto round numbers
//! and byte selects, s-box inputs and memory contents.

use super::{sweep, TestCase};
use crate::{edges::MEMORY_EDGES, error::Result, params::Overrides, TestContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Uimm {
    /// `0..xlen`
    Xlen,
    /// `0..32`, word shifts
    Five,
}

pub fn make_uimm(case: &TestCase<'_>, ctx: &mut TestContext) -> Result<Vec<String>> {
    let variant = match case.suffix() {
        "" => Uimm::Xlen,
        "_5" => Uimm::Five,
        _ => return Err(case.unsupported_variant()),
    };
    let end = match variant {
        Uimm::Xlen => ctx.xlen.bits() as i64,
        Uimm::Five => 32,
    };
    let range = case
        .format
        .imm_range(ctx.xlen)
        .ok_or_else(|| case.unsupported_format())?;
    // amounts the format cannot encode, such as a zero `c.slli` shift, are skipped
    let cases = (0..end)
        .filter(|&v| range.contains(v))
        .map(|v| {
            (
                Overrides::default().immval(v),
                format!("{}: imm={v}", case.coverpoint),
            )
        })
        .collect();
    sweep(case, ctx, cases)
}

pub fn make_bs(case: &TestCase<'_>, ctx: &mut TestContext) -> Result<Vec<String>> {
    if !case.suffix().is_empty() {
        return Err(case.unsupported_variant());
    }
    let cases = (0..4)
        .map(|bs| {
            (
                Overrides::default().immval(bs),
                format!("{}: bs={bs}", case.coverpoint),
            )
        })
        .collect();
    sweep(case, ctx, cases)
}

pub fn make_rnum(case: &TestCase<'_>, ctx: &mut TestContext) -> Result<Vec<String>> {
    if !case.suffix().is_empty() {
        return Err(case.unsupported_variant());
    }
    // rnum above 0xa is reserved
    let cases = (0..=0xa)
        .map(|rnum| {
            (
                Overrides::default().immval(rnum),
                format!("{}: rnum={rnum}", case.coverpoint),
            )
        })
        .collect();
    sweep(case, ctx, cases)
}

/// `byte` copied into every byte of a `bits`-wide register.
pub(crate) fn replicate_byte(byte: u8, bits: u32) -> u64 {
    (0..bits / 8).fold(0, |acc, i| acc | (byte as u64) << (8 * i))
}

pub fn make_sbox(case: &TestCase<'_>, ctx: &mut TestContext) -> Result<Vec<String>> {
    if !case.suffix().is_empty() {
        return Err(case.unsupported_variant());
    }
    let bits = ctx.xlen.bits();
    let cases = (0..=u8::MAX)
        .map(|b| {
            let v = replicate_byte(b, bits);
            (
                Overrides::default().no_x0().rs1val(v).rs2val(v),
                format!("{} = {b}", case.coverpoint),
            )
        })
        .collect();
    sweep(case, ctx, cases)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemWidth {
    Byte,
    Hword,
    Word,
    Double,
}

impl MemWidth {
    fn edges(self) -> &'static [u64] {
        match self {
            MemWidth::Byte => MEMORY_EDGES.byte,
            MemWidth::Hword => MEMORY_EDGES.hword,
            MemWidth::Word => MEMORY_EDGES.word,
            MemWidth::Double => MEMORY_EDGES.double,
        }
    }
}

pub fn make_memval(case: &TestCase<'_>, ctx: &mut TestContext) -> Result<Vec<String>> {
    let width = match case.suffix() {
        "_byte" => MemWidth::Byte,
        "_hword" => MemWidth::Hword,
        "_word" => MemWidth::Word,
        "_double" => MemWidth::Double,
        _ => return Err(case.unsupported_variant()),
    };
    let cases = width
        .edges()
        .iter()
        .map(|&val| {
            (
                Overrides::default().no_x0().rs2val(val),
                format!("{} (memory value = {val:#x})", case.coverpoint),
            )
        })
        .collect();
    sweep(case, ctx, cases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::GenError, GenOption, InstrFormat, Xlen};

    #[test]
    fn test_replicate_byte() {
        assert_eq!(replicate_byte(0x12, 32), 0x1212_1212);
        assert_eq!(replicate_byte(0x12, 64), 0x1212_1212_1212_1212);
        assert_eq!(replicate_byte(0, 64), 0);
    }

    #[test]
    fn test_sbox_sweep() {
        let mut ctx = TestContext::new(GenOption::default().set_xlen(Xlen::X32));
        let free = ctx.pool.free();
        let case = TestCase::new("aes32esi", InstrFormat::KBS, "cp_sbox");
        let blocks = make_sbox(&case, &mut ctx).unwrap();
        assert_eq!(blocks.len(), 256);
        assert!(blocks[0x12].starts_with("# cp_sbox = 18\n"));
        assert!(blocks[0x12].contains("0x12121212"));
        assert_eq!(ctx.pool.free(), free);
    }

    #[test]
    fn test_uimm_variants() {
        let mut ctx = TestContext::new(GenOption::default());
        let case = TestCase::new("slli", InstrFormat::IS, "cp_uimm");
        let blocks = make_uimm(&case, &mut ctx).unwrap();
        assert_eq!(blocks.len(), 64);
        assert!(blocks[63].contains(", 63\n"));

        let case = TestCase::new("slliw", InstrFormat::ISW, "cp_uimm_5");
        assert_eq!(make_uimm(&case, &mut ctx).unwrap().len(), 32);

        let case = TestCase::new("c.slli", InstrFormat::CIS, "cp_uimm");
        let blocks = make_uimm(&case, &mut ctx).unwrap();
        assert_eq!(blocks.len(), 63);
        assert!(blocks[0].starts_with("# cp_uimm: imm=1\n"));
        assert!(blocks.iter().all(|b| !b.contains(", 0\n")));

        let case = TestCase::new("add", InstrFormat::R, "cp_uimm");
        assert!(matches!(
            make_uimm(&case, &mut ctx),
            Err(GenError::UnsupportedFormat(_))
        ));

        let case = TestCase::new("slli", InstrFormat::IS, "cp_uimm_7");
        assert!(matches!(
            make_uimm(&case, &mut ctx),
            Err(GenError::UnsupportedVariant { .. })
        ));
    }

    #[test]
    fn test_crypto_fields() {
        let mut ctx = TestContext::new(GenOption::default());
        let case = TestCase::new("aes64ks1i", InstrFormat::KRNUM, "cp_rnum");
        let blocks = make_rnum(&case, &mut ctx).unwrap();
        assert_eq!(blocks.len(), 11);
        assert!(blocks[10].starts_with("# cp_rnum: rnum=10"));

        let case = TestCase::new("sm4ed", InstrFormat::KBS, "cp_bs");
        let blocks = make_bs(&case, &mut ctx).unwrap();
        assert_eq!(blocks.len(), 4);
        assert!(blocks[3].contains(", 3\n"));
    }

    #[test]
    fn test_memval() {
        let mut ctx = TestContext::new(GenOption::default());
        let case = TestCase::new("lb", InstrFormat::L, "cp_memval_byte");
        let blocks = make_memval(&case, &mut ctx).unwrap();
        assert_eq!(blocks.len(), MEMORY_EDGES.byte.len());
        assert!(blocks[4].starts_with("# cp_memval_byte (memory value = 0x7f)"));
        assert!(blocks[4].contains("LI("));
        assert!(ctx.pool.lent().is_empty());

        let case = TestCase::new("lb", InstrFormat::L, "cp_memval_nibble");
        assert!(make_memval(&case, &mut ctx).is_err());
    }
}
