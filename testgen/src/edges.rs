//! Boundary values swept by the edge coverpoints.

use crate::Xlen;

/// Memory contents per access width.
#[derive(Debug)]
pub struct MemoryEdges {
    pub byte: &'static [u64],
    pub hword: &'static [u64],
    pub word: &'static [u64],
    pub double: &'static [u64],
}

pub const MEMORY_EDGES: MemoryEdges = MemoryEdges {
    byte: &[0x00, 0x01, 0x02, 0x55, 0x7f, 0x80, 0x81, 0xaa, 0xfe, 0xff],
    hword: &[
        0x0000, 0x0001, 0x0002, 0x5555, 0x7fff, 0x8000, 0x8001, 0xaaaa, 0xfffe, 0xffff,
    ],
    word: &[
        0x0000_0000,
        0x0000_0001,
        0x0000_0002,
        0x5555_5555,
        0x7fff_ffff,
        0x8000_0000,
        0x8000_0001,
        0xaaaa_aaaa,
        0xffff_fffe,
        0xffff_ffff,
    ],
    double: &[
        0x0000_0000_0000_0000,
        0x0000_0000_0000_0001,
        0x0000_0000_0000_0002,
        0x5555_5555_5555_5555,
        0x7fff_ffff_ffff_ffff,
        0x8000_0000_0000_0000,
        0x8000_0000_0000_0001,
        0xaaaa_aaaa_aaaa_aaaa,
        0xffff_ffff_ffff_fffe,
        0xffff_ffff_ffff_ffff,
    ],
};

/// Immediates per encoding width.
#[derive(Debug)]
pub struct ImmediateEdges {
    pub imm_12bit: &'static [i64],
    /// Zero comes first so that `_n0` variants can skip it.
    pub imm_6bit: &'static [i64],
    /// Compressed shift amounts on RV32.
    pub imm_32_c: &'static [i64],
    /// Compressed shift amounts on RV64.
    pub imm_64_c: &'static [i64],
    /// Word shift amounts.
    pub imm_uimmw: &'static [i64],
    pub imm_uimm: &'static [i64],
}

pub const IMMEDIATE_EDGES: ImmediateEdges = ImmediateEdges {
    imm_12bit: &[
        0, 1, 2, 4, 8, 16, 32, 64, 128, 256, 512, 1024, 0x555, 2046, 2047, -1, -2, -0x556, -2047,
        -2048,
    ],
    imm_6bit: &[0, 1, 2, 4, 8, 0x15, 30, 31, -1, -2, -0x16, -31, -32],
    imm_32_c: &[1, 2, 4, 8, 15, 16, 30, 31],
    imm_64_c: &[1, 2, 4, 8, 16, 31, 32, 33, 62, 63],
    imm_uimmw: &[0, 1, 2, 4, 8, 15, 16, 30, 31],
    imm_uimm: &[0, 1, 2, 4, 8, 16, 31, 32, 33, 62, 63],
};

/// Interesting register values at width `xlen`: small numbers, the signed
/// extremes and their neighbours, and alternating bit patterns.
pub fn general_edges(xlen: Xlen) -> Vec<u64> {
    let mask = xlen.mask();
    let min = 1u64 << (xlen.bits() - 1);
    let max = min - 1;
    [
        0,
        1,
        2,
        max,
        max - 1,
        min,
        min + 1,
        u64::MAX,
        u64::MAX - 1,
        0x5555_5555_5555_5555,
        0xaaaa_aaaa_aaaa_aaaa,
        0x3333_3333_3333_3333,
        0xcccc_cccc_cccc_cccc,
    ]
    .into_iter()
    .map(|v| v & mask)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{ImmRange, InstrFormat};

    #[test]
    fn test_general_edges_width() {
        let e32 = general_edges(Xlen::X32);
        assert!(e32.iter().all(|&v| v <= u32::MAX as u64));
        assert!(e32.contains(&0x7fff_ffff));
        assert!(e32.contains(&0x8000_0000));
        assert!(e32.contains(&0xffff_ffff));

        let e64 = general_edges(Xlen::X64);
        assert!(e64.contains(&0x8000_0000_0000_0001));
        assert_eq!(e32.len(), e64.len());
    }

    #[test]
    fn test_immediates_fit_their_fields() {
        let e = &IMMEDIATE_EDGES;
        assert!(e.imm_12bit.iter().all(|&v| ImmRange::Signed(12).contains(v)));
        assert!(e.imm_6bit.iter().all(|&v| ImmRange::Signed(6).contains(v)));
        assert_eq!(e.imm_6bit[0], 0);
        let cis32 = InstrFormat::CIS.imm_range(Xlen::X32).unwrap();
        let cis64 = InstrFormat::CIS.imm_range(Xlen::X64).unwrap();
        assert!(e.imm_32_c.iter().all(|&v| cis32.contains(v)));
        assert!(e.imm_64_c.iter().all(|&v| cis64.contains(v)));
        assert!(e.imm_uimmw.iter().all(|&v| ImmRange::Unsigned(5).contains(v)));
        assert!(e.imm_uimm.iter().all(|&v| ImmRange::Unsigned(6).contains(v)));
    }

    #[test]
    fn test_memory_edges_fit_width() {
        assert!(MEMORY_EDGES.byte.iter().all(|&v| v <= 0xff));
        assert!(MEMORY_EDGES.hword.iter().all(|&v| v <= 0xffff));
        assert!(MEMORY_EDGES.word.iter().all(|&v| v <= 0xffff_ffff));
    }
}
