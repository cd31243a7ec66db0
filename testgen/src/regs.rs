//! Integer register handles and the pool that lends them to test cases.

use std::collections::BTreeSet;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::error::{GenError, Result};

macro_rules! define_abi {
    { $( $num:literal => $name:ident ),* $(,)? } => {
        /// ABI name of a register number
        fn abi_name_of(num: u8) -> &'static str {
            match num {
                $( $num => stringify!($name), )*
                _ => "no name",
            }
        }
    };
}

define_abi! {
    0 => zero, 1 => ra, 2 => sp, 3 => gp, 4 => tp,
    5 => t0, 6 => t1, 7 => t2,
    8 => s0, 9 => s1,
    10 => a0, 11 => a1, 12 => a2, 13 => a3, 14 => a4, 15 => a5, 16 => a6, 17 => a7,
    18 => s2, 19 => s3, 20 => s4, 21 => s5, 22 => s6, 23 => s7, 24 => s8, 25 => s9,
    26 => s10, 27 => s11,
    28 => t3, 29 => t4, 30 => t5, 31 => t6,
}

/// Number of architectural integer registers.
pub const NUM_REGS: usize = 32;

/// An architectural integer register, `x0`..`x31`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Reg(u8);

impl Reg {
    /// Hard-wired zero.
    pub const ZERO: Reg = Reg(0);
    /// Conventional link register, implicitly written by `c.jalr`.
    pub const RA: Reg = Reg(1);
    pub const SP: Reg = Reg(2);
    pub const GP: Reg = Reg(3);

    pub const fn new(num: u8) -> Option<Self> {
        if (num as usize) < NUM_REGS {
            Some(Self(num))
        } else {
            None
        }
    }

    pub const fn num(self) -> u8 {
        self.0
    }

    pub fn abi_name(self) -> &'static str {
        abi_name_of(self.0)
    }

    /// Whether the register is addressable by the 3-bit fields of compressed
    /// instructions (`x8`..`x15`).
    pub const fn is_compressed(self) -> bool {
        self.0 >= 8 && self.0 <= 15
    }

    pub fn all() -> impl Iterator<Item = Reg> {
        (0..NUM_REGS as u8).map(Reg)
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "x{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Free,
    Reserved,
    /// `reserved` remembers where the register goes back to.
    Lent { reserved: bool },
}

/// Lends integer registers to the test case under construction.
///
/// Every register is in exactly one state: free, reserved for a fixed purpose
/// or lent. Reserved registers are only handed out through
/// [`RegisterPool::consume_fixed`] and return to the reserved set when
/// released.
pub struct RegisterPool {
    slots: [Slot; NUM_REGS],
    rng: StdRng,
}

impl RegisterPool {
    /// A pool with every register free, choosing registers from a stream
    /// seeded by `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            slots: [Slot::Free; NUM_REGS],
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// A pool where `reserved` are kept apart from general allocation.
    pub fn with_reserved(seed: u64, reserved: &[Reg]) -> Self {
        let mut pool = Self::new(seed);
        for r in reserved {
            pool.slots[r.0 as usize] = Slot::Reserved;
        }
        pool
    }

    fn eligible(&self, exclude: &[Reg]) -> Vec<Reg> {
        Reg::all()
            .filter(|r| self.slots[r.0 as usize] == Slot::Free && !exclude.contains(r))
            .collect()
    }

    /// Lend one free register that is not in `exclude`.
    pub fn acquire(&mut self, exclude: &[Reg]) -> Result<Reg> {
        let candidates = self.eligible(exclude);
        if candidates.is_empty() {
            return Err(GenError::PoolExhausted {
                excluded: exclude.to_vec(),
            });
        }
        let reg = candidates[self.rng.gen_range(0..candidates.len())];
        self.slots[reg.0 as usize] = Slot::Lent { reserved: false };
        tracing::trace!("lend {reg}");
        Ok(reg)
    }

    /// Lend `count` distinct free registers, none of them in `exclude`.
    /// Either all of them are lent or none is.
    pub fn acquire_many(&mut self, count: usize, exclude: &[Reg]) -> Result<Vec<Reg>> {
        if self.eligible(exclude).len() < count {
            return Err(GenError::PoolExhausted {
                excluded: exclude.to_vec(),
            });
        }
        let mut exclude = exclude.to_vec();
        let mut regs = Vec::with_capacity(count);
        for _ in 0..count {
            let reg = self.acquire(&exclude)?;
            exclude.push(reg);
            regs.push(reg);
        }
        Ok(regs)
    }

    /// Lend exactly the given registers. They may be free or reserved, but
    /// none of them may already be lent.
    pub fn consume_fixed(&mut self, regs: &[Reg]) -> Result<()> {
        let mut seen = BTreeSet::new();
        for &r in regs {
            if !seen.insert(r) || matches!(self.slots[r.0 as usize], Slot::Lent { .. }) {
                return Err(GenError::AlreadyLent(r));
            }
        }
        for &r in regs {
            let slot = &mut self.slots[r.0 as usize];
            *slot = Slot::Lent {
                reserved: *slot == Slot::Reserved,
            };
            tracing::trace!("lend fixed {r}");
        }
        Ok(())
    }

    pub fn release(&mut self, reg: Reg) -> Result<()> {
        let slot = &mut self.slots[reg.0 as usize];
        match *slot {
            Slot::Lent { reserved } => {
                *slot = if reserved { Slot::Reserved } else { Slot::Free };
                tracing::trace!("return {reg}");
                Ok(())
            }
            _ => Err(GenError::DoubleRelease(reg)),
        }
    }

    /// Return every register in `regs`. Stops at the first one that was not
    /// lent.
    pub fn release_many(&mut self, regs: &[Reg]) -> Result<()> {
        regs.iter().try_for_each(|&r| self.release(r))
    }

    pub fn is_free(&self, reg: Reg) -> bool {
        self.slots[reg.0 as usize] == Slot::Free
    }

    pub fn is_reserved(&self, reg: Reg) -> bool {
        self.slots[reg.0 as usize] == Slot::Reserved
    }

    pub fn is_lent(&self, reg: Reg) -> bool {
        matches!(self.slots[reg.0 as usize], Slot::Lent { .. })
    }

    pub fn free(&self) -> BTreeSet<Reg> {
        Reg::all().filter(|&r| self.is_free(r)).collect()
    }

    pub fn reserved(&self) -> BTreeSet<Reg> {
        Reg::all().filter(|&r| self.is_reserved(r)).collect()
    }

    pub fn lent(&self) -> BTreeSet<Reg> {
        Reg::all().filter(|&r| self.is_lent(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(n: u8) -> Reg {
        Reg::new(n).unwrap()
    }

    #[test]
    fn test_names() {
        assert_eq!(Reg::RA.abi_name(), "ra");
        assert_eq!(reg(31).abi_name(), "t6");
        assert_eq!(reg(8).to_string(), "x8");
        assert!(reg(8).is_compressed() && !reg(16).is_compressed());
        assert!(Reg::new(32).is_none());
    }

    #[test]
    fn test_acquire_respects_exclude() {
        let mut pool = RegisterPool::new(7);
        let exclude: Vec<Reg> = (0..30).map(reg).collect();
        for _ in 0..2 {
            let r = pool.acquire(&exclude).unwrap();
            assert!(r.num() >= 30);
        }
        assert_eq!(
            pool.acquire(&exclude),
            Err(GenError::PoolExhausted {
                excluded: exclude.clone()
            })
        );
    }

    #[test]
    fn test_matched_acquire_release_restores_pool() {
        let mut pool = RegisterPool::with_reserved(3, &[Reg::RA, Reg::SP]);
        let free = pool.free();
        let mut lent = Vec::new();
        for round in 0..64 {
            if round % 3 == 2 {
                let r = lent.pop().unwrap();
                pool.release(r).unwrap();
            } else {
                lent.push(pool.acquire(&[]).unwrap());
            }
            for r in Reg::all() {
                let states = [pool.is_free(r), pool.is_reserved(r), pool.is_lent(r)];
                assert_eq!(states.iter().filter(|s| **s).count(), 1, "{r}");
            }
            if pool.free().is_empty() {
                break;
            }
        }
        pool.release_many(&lent).unwrap();
        assert_eq!(pool.free(), free);
        assert!(pool.lent().is_empty());
    }

    #[test]
    fn test_acquire_many() {
        let mut pool = RegisterPool::new(11);
        let exclude = [Reg::ZERO, reg(5)];
        let regs = pool.acquire_many(10, &exclude).unwrap();
        let distinct: BTreeSet<_> = regs.iter().copied().collect();
        assert_eq!(distinct.len(), 10);
        assert!(regs.iter().all(|r| !exclude.contains(r)));

        // 20 eligible remain: asking for more lends nothing
        let before = pool.free();
        assert!(matches!(
            pool.acquire_many(21, &exclude),
            Err(GenError::PoolExhausted { .. })
        ));
        assert_eq!(pool.free(), before);
    }

    #[test]
    fn test_reserved_never_offered() {
        let mut pool = RegisterPool::with_reserved(0, &[Reg::RA]);
        let regs = pool.acquire_many(31, &[]).unwrap();
        assert!(!regs.contains(&Reg::RA));
        assert!(pool.acquire(&[]).is_err());

        pool.consume_fixed(&[Reg::RA]).unwrap();
        assert!(pool.is_lent(Reg::RA));
        pool.release(Reg::RA).unwrap();
        assert!(pool.is_reserved(Reg::RA));
    }

    #[test]
    fn test_consume_and_double_release() {
        let mut pool = RegisterPool::new(0);
        pool.consume_fixed(&[reg(1), reg(4)]).unwrap();
        assert_eq!(pool.consume_fixed(&[reg(4)]), Err(GenError::AlreadyLent(reg(4))));
        assert_eq!(
            pool.consume_fixed(&[reg(6), reg(6)]),
            Err(GenError::AlreadyLent(reg(6)))
        );
        assert!(pool.is_free(reg(6)));

        pool.release_many(&[reg(1), reg(4)]).unwrap();
        assert_eq!(pool.release(reg(4)), Err(GenError::DoubleRelease(reg(4))));
    }

    #[test]
    fn test_same_seed_same_choices() {
        let pick = |seed| {
            let mut pool = RegisterPool::new(seed);
            pool.acquire_many(8, &[]).unwrap()
        };
        assert_eq!(pick(42), pick(42));
    }
}
