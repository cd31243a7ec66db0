//! Operand shapes of the instruction formats the generator understands.

use std::str::FromStr;

use crate::{error::GenError, regs::Reg, Xlen};

/// The structural pattern of an instruction's operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrFormat {
    /// `op rd, rs1, rs2`
    R,
    /// `op rd, rs1, imm12`
    I,
    /// `op rd, rs1, shamt` with an xlen-wide shift amount
    IS,
    /// `op rd, rs1, shamt` with a 5-bit shift amount (word operations)
    ISW,
    /// `op rd, imm12(rs1)`; `rs2` holds the value stored to memory beforehand
    L,
    /// `op rs2, imm12(rs1)`
    S,
    /// `op rs1, rs2, label`
    B,
    /// `op rd, label`
    J,
    /// `op rd, rs1, imm12`
    JR,
    /// `op rd, rs1, rs2, bs`
    KBS,
    /// `op rd, rs1, rnum`
    KRNUM,
    /// `c.op rd, rs2`, `rd` is also a source
    CR,
    /// `c.op rd, imm6`, `rd` is also a source
    CI,
    /// `c.op rd, shamt`, `rd` is also a source
    CIS,
    /// `c.op rs1', label`
    CB,
    /// `c.op label`
    CJ,
    /// `c.op rs1`
    CJR,
    /// `c.op rs1`, links into `x1`
    CJALR,
}

/// Register classes a role can be drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegClass {
    Any,
    /// Anything but `x0`, for base addresses and jump targets.
    NonZero,
    /// `x8`..`x15`, reachable by 3-bit compressed register fields.
    Compressed,
}

/// Legal range of an immediate field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmRange {
    Signed(u32),
    Unsigned(u32),
    Span(i64, i64),
}

impl ImmRange {
    /// Inclusive bounds.
    pub fn bounds(self) -> (i64, i64) {
        match self {
            ImmRange::Signed(bits) => (-(1 << (bits - 1)), (1 << (bits - 1)) - 1),
            ImmRange::Unsigned(bits) => (0, (1 << bits) - 1),
            ImmRange::Span(lo, hi) => (lo, hi),
        }
    }

    pub fn contains(self, v: i64) -> bool {
        let (lo, hi) = self.bounds();
        lo <= v && v <= hi
    }
}

/// Which operands a format carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Shape {
    pub rd: bool,
    pub rs1: bool,
    pub rs2: bool,
    /// `rs1val` is drawn; for formats without `rs1` it is the initial value of `rd`.
    pub rs1val: bool,
    pub rs2val: bool,
}

impl InstrFormat {
    pub const ALL: [InstrFormat; 18] = [
        InstrFormat::R,
        InstrFormat::I,
        InstrFormat::IS,
        InstrFormat::ISW,
        InstrFormat::L,
        InstrFormat::S,
        InstrFormat::B,
        InstrFormat::J,
        InstrFormat::JR,
        InstrFormat::KBS,
        InstrFormat::KRNUM,
        InstrFormat::CR,
        InstrFormat::CI,
        InstrFormat::CIS,
        InstrFormat::CB,
        InstrFormat::CJ,
        InstrFormat::CJR,
        InstrFormat::CJALR,
    ];

    pub fn name(self) -> &'static str {
        use InstrFormat::*;
        match self {
            R => "R",
            I => "I",
            IS => "IS",
            ISW => "ISW",
            L => "L",
            S => "S",
            B => "B",
            J => "J",
            JR => "JR",
            KBS => "KBS",
            KRNUM => "KRNUM",
            CR => "CR",
            CI => "CI",
            CIS => "CIS",
            CB => "CB",
            CJ => "CJ",
            CJR => "CJR",
            CJALR => "CJALR",
        }
    }

    pub fn shape(self) -> Shape {
        use InstrFormat::*;
        let s = Shape::default();
        match self {
            R | KBS => Shape {
                rd: true,
                rs1: true,
                rs2: true,
                rs1val: true,
                rs2val: true,
            },
            I | IS | ISW | KRNUM => Shape {
                rd: true,
                rs1: true,
                rs1val: true,
                ..s
            },
            L => Shape {
                rd: true,
                rs1: true,
                rs2: true,
                rs2val: true,
                ..s
            },
            S => Shape {
                rs1: true,
                rs2: true,
                rs2val: true,
                ..s
            },
            B => Shape {
                rs1: true,
                rs2: true,
                rs1val: true,
                rs2val: true,
                ..s
            },
            J => Shape { rd: true, ..s },
            JR | CJALR => Shape {
                rd: true,
                rs1: true,
                ..s
            },
            CR => Shape {
                rd: true,
                rs2: true,
                rs1val: true,
                rs2val: true,
                ..s
            },
            CI | CIS => Shape {
                rd: true,
                rs1val: true,
                ..s
            },
            CB => Shape {
                rs1: true,
                rs1val: true,
                ..s
            },
            CJ => s,
            CJR => Shape { rs1: true, ..s },
        }
    }

    /// Register class of the `rs1` role.
    pub fn rs1_class(self) -> RegClass {
        use InstrFormat::*;
        match self {
            CB => RegClass::Compressed,
            L | S | JR | CJR | CJALR => RegClass::NonZero,
            _ => RegClass::Any,
        }
    }

    /// Register class of the `rs2` role. `c.add` and `c.mv` with `rs2 = x0`
    /// encode `c.jalr`, `c.jr` and `c.ebreak`.
    pub fn rs2_class(self) -> RegClass {
        match self {
            InstrFormat::CR => RegClass::NonZero,
            _ => RegClass::Any,
        }
    }

    /// Registers the instruction writes without naming them. No operand role
    /// may take one of them.
    pub fn implicit_regs(self) -> &'static [Reg] {
        match self {
            InstrFormat::CJALR => &[Reg::RA],
            _ => &[],
        }
    }

    /// Register class of the `rd` role. Compressed forms writing `x0` are
    /// hints, not the instruction under test.
    pub fn rd_class(self) -> RegClass {
        use InstrFormat::*;
        match self {
            CR | CI | CIS => RegClass::NonZero,
            _ => RegClass::Any,
        }
    }

    /// Legal immediate range. Branch and jump offsets come from labels and
    /// have none.
    pub fn imm_range(self, xlen: Xlen) -> Option<ImmRange> {
        use InstrFormat::*;
        match self {
            I | L | S | JR => Some(ImmRange::Signed(12)),
            IS => Some(ImmRange::Unsigned(xlen.bits().trailing_zeros())),
            ISW => Some(ImmRange::Unsigned(5)),
            KBS => Some(ImmRange::Unsigned(2)),
            KRNUM => Some(ImmRange::Span(0, 0xa)),
            CI => Some(ImmRange::Signed(6)),
            CIS => Some(ImmRange::Span(1, xlen.bits() as i64 - 1)),
            R | B | J | CR | CB | CJ | CJR | CJALR => None,
        }
    }

    /// Whether the format transfers control.
    pub fn is_control(self) -> bool {
        use InstrFormat::*;
        matches!(self, B | J | JR | CB | CJ | CJR | CJALR)
    }

    pub fn is_compressed(self) -> bool {
        use InstrFormat::*;
        matches!(self, CR | CI | CIS | CB | CJ | CJR | CJALR)
    }
}

impl std::fmt::Display for InstrFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InstrFormat {
    type Err = GenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InstrFormat::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| GenError::UnsupportedFormat(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!("cjalr".parse(), Ok(InstrFormat::CJALR));
        assert_eq!("R".parse(), Ok(InstrFormat::R));
        assert_eq!(
            "R4".parse::<InstrFormat>(),
            Err(GenError::UnsupportedFormat("R4".into()))
        );
        for f in InstrFormat::ALL {
            assert_eq!(f.name().parse(), Ok(f));
        }
    }

    #[test]
    fn test_role_classes() {
        assert_eq!(InstrFormat::CR.rs2_class(), RegClass::NonZero);
        assert_eq!(InstrFormat::R.rs2_class(), RegClass::Any);
        assert_eq!(InstrFormat::CJALR.implicit_regs(), [Reg::RA]);
        assert!(InstrFormat::JR.implicit_regs().is_empty());
    }

    #[test]
    fn test_imm_ranges() {
        assert_eq!(ImmRange::Signed(12).bounds(), (-2048, 2047));
        assert_eq!(
            InstrFormat::IS.imm_range(Xlen::X64).unwrap().bounds(),
            (0, 63)
        );
        assert_eq!(
            InstrFormat::IS.imm_range(Xlen::X32).unwrap().bounds(),
            (0, 31)
        );
        assert!(InstrFormat::B.imm_range(Xlen::X64).is_none());
        assert!(InstrFormat::KRNUM.imm_range(Xlen::X32).unwrap().contains(10));
        assert!(!InstrFormat::KRNUM.imm_range(Xlen::X32).unwrap().contains(11));
    }
}
