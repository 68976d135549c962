mod logger;

use std::{
    env,
    ffi::OsString,
    fs::{self, File},
    io::{self, BufWriter, Write as _},
    path::PathBuf,
    process,
};

use anyhow::{bail, Context};
use clap::{ArgAction, Parser};
use log::info;

use call_stack_usage as cs;
use cs::output::{DotConf, Report, ReportConf};
use cs::{tools, CallGraph, Isa, Resolver, StackCosts, StackUsage, SymbolTable, Toolchain};

const ABOUT: &str = "\
Detects recursive calls and computes the worst-case stack usage of each function by following
the call graph.";

const AFTER_HELP: &str = "\
Without -cross the toolchain is picked from the binary's architecture:

    arm-none-eabi-   for ARM binaries
    sparc-rtems5-    for SPARC binaries
    (no prefix)      for x86/amd64 binaries

Note that if you use '-cross', SPARC opcodes are assumed.";

/// Worst-case stack usage per function
#[derive(Parser, Debug)]
#[command(name = "check-stack-usage", version, about = ABOUT, after_help = AFTER_HELP)]
struct Cli
{
    /// Cross-toolchain prefix, e.g. `sparc-rtems5-` (implies SPARC opcodes)
    #[arg(long, value_name = "PREFIX")]
    cross: Option<String>,

    /// ELF binary to analyze
    binary: PathBuf,

    /// Root directory searched recursively for stack usage files
    su_root: PathBuf,

    /// Only report these functions
    functions: Vec<String>,

    /// Read the symbol table from this file instead of running `nm`
    #[arg(long, value_name = "FILE")]
    nm_output: Option<PathBuf>,

    /// Read the disassembly from this file instead of running `objdump -d`
    #[arg(long, value_name = "FILE")]
    objdump_output: Option<PathBuf>,

    /// Suffix of the stack usage files
    #[arg(long, value_name = "SUFFIX", default_value = cs::su::SU_SUFFIX)]
    su_suffix: String,

    /// Demangle Rust symbol names in the output
    #[arg(long)]
    demangle: bool,

    /// Also write the call graph, in GraphViz format, to this file
    #[arg(long, value_name = "FILE")]
    dot: Option<PathBuf>,

    /// Use verbose output (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main()
{
    // the historical spelling of the option is `-cross`
    let args = env::args_os().map(|arg| if arg == "-cross" { OsString::from("--cross") } else { arg });

    let cli = match Cli::try_parse_from(args)
    {
        Ok(cli) => cli,
        Err(e)  =>
        {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            process::exit(code);
        }
    };

    logger::init(cli.verbose);

    if let Err(e) = run(&cli)
    {
        eprintln!("error: {:#}", e);
        process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()>
{
    if !cli.binary.is_file()
    {
        bail!("{} is not a file", cli.binary.display());
    }
    if !cli.su_root.is_dir()
    {
        bail!("{} is not a directory", cli.su_root.display());
    }

    let (isa, toolchain) = match &cli.cross
    {
        Some(prefix) => (Isa::cross(), Toolchain::with_prefix(prefix)),
        None         =>
        {
            let bytes = fs::read(&cli.binary)
                .with_context(|| format!("could not read {}", cli.binary.display()))?;
            let isa = Isa::detect(&bytes)?;
            (isa, Toolchain::for_isa(isa))
        }
    };
    info!("instruction set: {:?}, toolchain: {:?}", isa, toolchain);

    let nm = match &cli.nm_output
    {
        Some(path) => tools::read_dump(path)?,
        None       => tools::nm(&toolchain, &cli.binary)?,
    };
    let symbols = SymbolTable::parse_nm(&nm);

    let disassembly = match &cli.objdump_output
    {
        Some(path) => tools::read_dump(path)?,
        None       => tools::objdump(&toolchain, &cli.binary)?,
    };
    let (graph, baseline) = CallGraph::from_disassembly(disassembly.lines(), &symbols, &isa);

    let su = StackUsage::scan_dir(&cli.su_root, &cli.su_suffix)?;
    let costs = StackCosts::merge(baseline, &su);

    let mut resolver = Resolver::new(&graph, &costs);
    let results = resolver.resolve_all(costs.select(&cli.functions));

    let report = Report::new(&results, resolver.recursions(), ReportConf { demangle: cli.demangle });
    let stdout = io::stdout().lock();
    let mut stdout = BufWriter::new(stdout);
    report.output_recursions(&mut stdout)?;
    report.output_text(&mut stdout)?;
    stdout.flush()?;

    if let Some(path) = &cli.dot
    {
        let file = File::create(path)
            .with_context(|| format!("could not create {}", path.display()))?;
        let conf = DotConf { demangle: cli.demangle, ..DotConf::default() };
        let mut writer = BufWriter::new(file);
        graph.output_dot(&mut writer, &costs, &results, &conf)?;
        writer.flush()?;
        info!("call graph written to {}", path.display());
    }

    Ok(())
}
