use anyhow::{Context, Result};
use binutils::{clap, verbose};
use clap::Parser;
use cvgen::{plan, CoverpointRegistry, GenOption, TestContext, Xlen};

/// Coverpoint-driven RISC-V architectural test generator.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    long_about = None,
    styles = binutils::get_styles(),
    arg_required_else_help = true,
)]
struct Args {
    /// Path to the test plan
    ///
    /// Every line reads `<instr> <format> <coverpoint>...`; blank lines and
    /// lines starting with `#` are ignored.
    plan: String,

    /// Output filename (default is plan%.S)
    #[arg(short = 'o', long)]
    output: Option<String>,

    /// Register width of the target
    #[arg(long, default_value_t = 64)]
    xlen: u32,

    /// Seed of register choice and random operand values
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Write logs to this file as JSON lines instead of stderr
    #[arg(long)]
    log_file: Option<String>,

    #[command(flatten)]
    verbose: verbose::Verbosity,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_file = args
        .log_file
        .as_ref()
        .map(|p| std::fs::File::create(p).with_context(|| format!("could not create log file `{p}`")))
        .transpose()?;
    let log_level = binutils::verbose_level_to_trace(args.verbose.log_level());
    binutils::logging_setup(log_level, log_file.as_ref());

    let content = std::fs::read_to_string(&args.plan)
        .with_context(|| format!("could not read file `{}`", &args.plan))?;
    let entries =
        plan::parse_plan(&content).with_context(|| format!("invalid plan `{}`", &args.plan))?;

    let xlen = Xlen::from_bits(args.xlen).context("xlen must be 32 or 64")?;
    let mut ctx = TestContext::new(GenOption::default().set_xlen(xlen).set_seed(args.seed));
    let registry = CoverpointRegistry::builtin();
    let out = plan::run_plan(&mut ctx, &registry, &entries);

    for f in &out.failures {
        eprintln!(
            "{} {} {}: {}",
            ansi_term::Colour::Red.bold().paint("skipped"),
            f.instr,
            f.coverpoint,
            f.message
        );
    }
    if out.generated == 0 {
        anyhow::bail!("no test case could be generated from `{}`", &args.plan);
    }

    let output_path = if let Some(path) = args.output {
        path
    } else {
        let mut path = std::path::PathBuf::from(&args.plan);
        path.set_extension("S");
        path.to_string_lossy().to_string()
    };
    binutils::write_output(std::path::Path::new(&output_path), &plan::render_file(&ctx, &out))
        .with_context(|| format!("could not write file `{}`", &output_path))?;
    println!(
        "{} {} pairs to `{}`",
        ansi_term::Colour::Green.bold().paint("wrote"),
        out.generated,
        &output_path
    );
    Ok(())
}
