mod context;
pub mod coverpoints;
pub mod edges;
mod error;
mod format;
pub mod formatter;
pub mod params;
pub mod plan;
pub mod regs;
pub mod trace;

pub use context::{GenOption, TestContext, Xlen};
pub use coverpoints::{CoverpointRegistry, TestCase};
pub use error::{GenError, Result};
pub use format::{ImmRange, InstrFormat, RegClass, Shape};
pub use params::{generate, Overrides, ParamSet};
pub use regs::{Reg, RegisterPool};
