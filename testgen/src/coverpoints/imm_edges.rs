use super::{sweep, TestCase};
use crate::{
    edges::{general_edges, IMMEDIATE_EDGES},
    error::Result,
    params::Overrides,
    TestContext, Xlen,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImmEdges {
    Imm12,
    SixBit,
    SixBitNonZero,
    /// Compressed shift amounts of the session's xlen.
    Compressed,
    Uimmw,
    /// 6-bit shift amounts, or the 5-bit ones on RV32.
    Uimm,
}

impl ImmEdges {
    fn parse(case: &TestCase<'_>) -> Result<Self> {
        Ok(match case.suffix() {
            "" => ImmEdges::Imm12,
            "_6bit" => ImmEdges::SixBit,
            "_6bit_n0" => ImmEdges::SixBitNonZero,
            "_c" => ImmEdges::Compressed,
            "_uimmw" => ImmEdges::Uimmw,
            "_uimm" => ImmEdges::Uimm,
            _ => return Err(case.unsupported_variant()),
        })
    }

    fn values(self, xlen: Xlen) -> &'static [i64] {
        let e = &IMMEDIATE_EDGES;
        match (self, xlen) {
            (ImmEdges::Imm12, _) => e.imm_12bit,
            (ImmEdges::SixBit, _) => e.imm_6bit,
            (ImmEdges::SixBitNonZero, _) => &e.imm_6bit[1..],
            (ImmEdges::Compressed, Xlen::X32) => e.imm_32_c,
            (ImmEdges::Compressed, Xlen::X64) => e.imm_64_c,
            (ImmEdges::Uimmw, _) | (ImmEdges::Uimm, Xlen::X32) => e.imm_uimmw,
            (ImmEdges::Uimm, Xlen::X64) => e.imm_uimm,
        }
    }
}

/// Cross product of edge values of `rs1` and of the immediate.
pub fn make_rs1_imm_edges(case: &TestCase<'_>, ctx: &mut TestContext) -> Result<Vec<String>> {
    let imms = ImmEdges::parse(case)?.values(ctx.xlen);
    let mut cases = Vec::new();
    for rs1val in general_edges(ctx.xlen) {
        for &imm in imms {
            cases.push((
                Overrides::default().no_x0().rs1val(rs1val).immval(imm),
                format!(
                    "{} (rs1 = {}, imm = {imm})",
                    case.coverpoint,
                    ctx.fmt_xlen(rs1val)
                ),
            ));
        }
    }
    sweep(case, ctx, cases)
}
