//! Follow the control flow of generated offset tests.
//!
//! This is not an instruction-set simulator. It understands the handful of
//! instructions and test macros that the offset coverpoints emit, places them
//! at a load address and runs them, collecting every signature update. Two
//! runs at different load addresses must produce the same signature.

use anyhow::{anyhow, bail, Context};
use regex::Regex;

use crate::{regs::Reg, Xlen};

/// Maximum number of executed instructions.
pub const STEP_LIMIT: usize = 100_000;

#[derive(Debug, Clone)]
struct Inst {
    addr: u64,
    /// 1-based source line, for error messages.
    line: usize,
    mnemonic: String,
    args: Vec<String>,
}

impl Inst {
    fn size(&self) -> u64 {
        if self.mnemonic.starts_with("c.") {
            2
        } else if self.mnemonic.chars().all(|c| c.is_ascii_uppercase() || c == '_') {
            8
        } else {
            4
        }
    }

    fn arg(&self, i: usize) -> anyhow::Result<&str> {
        self.args
            .get(i)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("line {}: `{}` needs operand {}", self.line, self.mnemonic, i + 1))
    }
}

#[derive(Debug, Clone)]
struct Label {
    name: String,
    /// Index of the instruction following the definition.
    pos: usize,
    addr: u64,
}

const KNOWN: &[&str] = &[
    "LI",
    "LA",
    "RVTEST_SIGUPD",
    "RVTEST_SIGUPD_IMM",
    "addi",
    "sub",
    "auipc",
    "nop",
    "j",
    "jal",
    "jalr",
    "beq",
    "bne",
    "blt",
    "bge",
    "bltu",
    "bgeu",
    "c.nop",
    "c.li",
    "c.addi",
    "c.j",
    "c.jr",
    "c.jalr",
    "c.beqz",
    "c.bnez",
];

/// Instructions placed at their addresses.
struct Program {
    insts: Vec<Inst>,
    labels: Vec<Label>,
    /// `.align` padding, `[start, end)`.
    pads: Vec<(u64, u64)>,
    end: u64,
}

impl Program {
    fn layout(text: &str, base: u64) -> anyhow::Result<Self> {
        let label_re = Regex::new(r"^\s*([A-Za-z_.][\w.]*|\d+):")?;
        let macro_re = Regex::new(r"^([A-Z_]+)\((.*)\)$")?;

        let mut prog = Program {
            insts: Vec::new(),
            labels: Vec::new(),
            pads: Vec::new(),
            end: base,
        };
        let mut addr = base;
        for (i, line) in text.lines().enumerate() {
            let mut rest = line.split('#').next().unwrap_or_default();
            while let Some(caps) = label_re.captures(rest) {
                prog.labels.push(Label {
                    name: caps[1].to_string(),
                    pos: prog.insts.len(),
                    addr,
                });
                rest = &rest[caps[0].len()..];
            }
            let rest = rest.trim();
            if rest.is_empty() {
                continue;
            }

            if let Some(arg) = rest.strip_prefix(".align") {
                let n: u32 = arg
                    .trim()
                    .parse()
                    .with_context(|| format!("line {}: bad `.align`", i + 1))?;
                let align = 1u64 << n;
                let aligned = (addr + align - 1) & !(align - 1);
                if aligned != addr {
                    prog.pads.push((addr, aligned));
                }
                addr = aligned;
                continue;
            }

            let (mnemonic, args) = match macro_re.captures(rest) {
                Some(caps) => (caps[1].to_string(), caps[2].to_string()),
                None => match rest.split_once(char::is_whitespace) {
                    Some((m, args)) => (m.to_ascii_lowercase(), args.to_string()),
                    None => (rest.to_ascii_lowercase(), String::new()),
                },
            };
            if !KNOWN.contains(&mnemonic.as_str()) {
                bail!("line {}: unknown instruction `{rest}`", i + 1);
            }
            let inst = Inst {
                addr,
                line: i + 1,
                mnemonic,
                args: args
                    .split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect(),
            };
            addr += inst.size();
            prog.insts.push(inst);
        }
        prog.end = addr;
        Ok(prog)
    }

    /// Address of `name` as referenced from instruction `from`. `Nb` and
    /// `Nf` are the nearest numeric label `N` before and after it.
    fn label_addr(&self, name: &str, from: usize) -> anyhow::Result<u64> {
        let local = |suffix: char| {
            name.strip_suffix(suffix)
                .filter(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        };
        let found = if let Some(n) = local('b') {
            self.labels
                .iter()
                .filter(|l| l.name == n && l.pos <= from)
                .last()
        } else if let Some(n) = local('f') {
            self.labels.iter().find(|l| l.name == n && l.pos > from)
        } else {
            let mut defs = self.labels.iter().filter(|l| l.name == name);
            let first = defs.next();
            if defs.next().is_some() {
                bail!("label `{name}` is defined more than once");
            }
            first
        };
        found
            .map(|l| l.addr)
            .ok_or_else(|| anyhow!("undefined label `{name}`"))
    }

    /// Index of the instruction executed after a jump to `target`. Landing in
    /// `.align` padding runs the padding as no-ops.
    fn index_of(&self, target: u64) -> anyhow::Result<usize> {
        if let Ok(i) = self.insts.binary_search_by_key(&target, |inst| inst.addr) {
            return Ok(i);
        }
        let in_pad = self.pads.iter().any(|&(s, e)| s <= target && target < e);
        if in_pad || target == self.end {
            return Ok(self.insts.partition_point(|inst| inst.addr < target));
        }
        bail!("jump to {target:#x} is not an instruction boundary")
    }
}

fn parse_reg(s: &str) -> anyhow::Result<usize> {
    s.strip_prefix('x')
        .and_then(|n| n.parse::<u8>().ok())
        .and_then(Reg::new)
        .map(|r| r.num() as usize)
        .ok_or_else(|| anyhow!("bad register `{s}`"))
}

fn parse_imm(s: &str) -> anyhow::Result<i64> {
    let (neg, digits) = match s.strip_prefix('-') {
        Some(d) => (true, d),
        None => (false, s),
    };
    let v = match digits.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
        None => digits.parse::<u64>(),
    }
    .with_context(|| format!("bad immediate `{s}`"))? as i64;
    Ok(if neg { v.wrapping_neg() } else { v })
}

struct Machine {
    regs: [u64; 32],
    xlen: Xlen,
}

impl Machine {
    fn read(&self, r: usize) -> u64 {
        self.regs[r]
    }

    fn write(&mut self, r: usize, v: u64) {
        if r != 0 {
            self.regs[r] = v & self.xlen.mask();
        }
    }

    fn signed(&self, r: usize) -> i64 {
        match self.xlen {
            Xlen::X32 => self.regs[r] as u32 as i32 as i64,
            Xlen::X64 => self.regs[r] as i64,
        }
    }
}

/// Run `text` loaded at `base` and return the values recorded by its
/// signature updates, in order.
pub fn run(text: &str, base: u64, xlen: Xlen) -> anyhow::Result<Vec<u64>> {
    let prog = Program::layout(text, base)?;
    let mut m = Machine {
        regs: [0; 32],
        xlen,
    };
    let mut signature = Vec::new();
    let mut idx = 0;
    let mut steps = 0;

    while let Some(inst) = prog.insts.get(idx) {
        steps += 1;
        if steps > STEP_LIMIT {
            bail!("exceed maximum step limit");
        }
        let (pc, from) = (inst.addr, idx);
        let next = pc + inst.size();
        let reg = |i| -> anyhow::Result<usize> { parse_reg(inst.arg(i)?) };
        let imm = |i| -> anyhow::Result<i64> { parse_imm(inst.arg(i)?) };
        let label = |i| -> anyhow::Result<u64> {
            prog.label_addr(inst.arg(i)?, from)
                .with_context(|| format!("line {}", inst.line))
        };
        let mut jump: Option<u64> = None;

        match inst.mnemonic.as_str() {
            "LI" => m.write(reg(0)?, imm(1)? as u64),
            "LA" => m.write(reg(0)?, label(1)?),
            "RVTEST_SIGUPD" => signature.push(m.read(reg(1)?)),
            "RVTEST_SIGUPD_IMM" => signature.push(imm(1)? as u64 & xlen.mask()),
            "nop" | "c.nop" => {}
            "addi" => m.write(reg(0)?, m.read(reg(1)?).wrapping_add(imm(2)? as u64)),
            "c.addi" => m.write(reg(0)?, m.read(reg(0)?).wrapping_add(imm(1)? as u64)),
            "c.li" => m.write(reg(0)?, imm(1)? as u64),
            "sub" => m.write(reg(0)?, m.read(reg(1)?).wrapping_sub(m.read(reg(2)?))),
            "auipc" => m.write(reg(0)?, pc.wrapping_add((imm(1)? << 12) as u64)),
            "j" | "c.j" => jump = Some(label(0)?),
            "jal" => {
                let (rd, target) = match inst.args.len() {
                    1 => (Reg::RA.num() as usize, label(0)?),
                    _ => (reg(0)?, label(1)?),
                };
                m.write(rd, next);
                jump = Some(target);
            }
            "jalr" => {
                let (rd, rs1, offset) = match inst.args.len() {
                    1 => (Reg::RA.num() as usize, reg(0)?, 0),
                    2 => {
                        // jalr rd, offset(rs1)
                        let mem = inst.arg(1)?;
                        let (off, rs1) = mem
                            .strip_suffix(')')
                            .and_then(|s| s.split_once('('))
                            .ok_or_else(|| anyhow!("line {}: bad operand `{mem}`", inst.line))?;
                        (reg(0)?, parse_reg(rs1)?, parse_imm(off)?)
                    }
                    _ => (reg(0)?, reg(1)?, imm(2)?),
                };
                let target = m.read(rs1).wrapping_add(offset as u64) & !1;
                m.write(rd, next);
                jump = Some(target);
            }
            "c.jr" => jump = Some(m.read(reg(0)?) & !1),
            "c.jalr" => {
                let target = m.read(reg(0)?) & !1;
                m.write(Reg::RA.num() as usize, next);
                jump = Some(target);
            }
            "c.beqz" | "c.bnez" => {
                let zero = m.read(reg(0)?) == 0;
                if zero == (inst.mnemonic == "c.beqz") {
                    jump = Some(label(1)?);
                }
            }
            b @ ("beq" | "bne" | "blt" | "bge" | "bltu" | "bgeu") => {
                let (r1, r2) = (reg(0)?, reg(1)?);
                let (u1, u2) = (m.read(r1), m.read(r2));
                let (s1, s2) = (m.signed(r1), m.signed(r2));
                let taken = match b {
                    "beq" => u1 == u2,
                    "bne" => u1 != u2,
                    "blt" => s1 < s2,
                    "bge" => s1 >= s2,
                    "bltu" => u1 < u2,
                    _ => u1 >= u2,
                };
                if taken {
                    jump = Some(label(2)?);
                }
            }
            other => bail!("line {}: cannot trace `{other}`", inst.line),
        }

        idx = match jump {
            Some(target) => prog
                .index_of(target & xlen.mask())
                .with_context(|| format!("line {}", inst.line))?,
            None => idx + 1,
        };
    }
    tracing::trace!("traced {steps} steps, {} signature words", signature.len());
    Ok(signature)
}
