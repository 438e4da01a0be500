use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uvm::assembler::{self, hex_list};
use uvm::disasm::disassemble;
use uvm::engine::RunConfig;
use uvm::isa::{DEFAULT_REGISTER_BITS, Isa};
use uvm::pipeline;
use uvm::program::load_program;
use uvm::snapshot::{AddressRange, Exporter, Snapshot, XmlExporter};

#[derive(Parser)]
#[command(name = "uvm", about = "Assembler and interpreter for a four-instruction virtual machine")]
struct Cli {
    /// Width in bits of register-index fields (1 to 5).
    #[arg(long, global = true, default_value_t = DEFAULT_REGISTER_BITS)]
    register_bits: u32,

    /// Log debug events to stderr (RUST_LOG overrides).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a YAML program into a binary file.
    Assemble {
        /// Source program (YAML list of instruction records).
        input: PathBuf,
        /// Where to write the encoded program.
        output: PathBuf,
        /// Print the intermediate representation and the full byte stream.
        #[arg(long)]
        test: bool,
    },
    /// Run a binary and dump a memory range as XML.
    Run {
        /// Encoded program, loaded at address 0.
        binary: PathBuf,
        /// Where to write the memory dump.
        dump: PathBuf,
        /// Inclusive address range to dump, e.g. 1000-1006.
        #[arg(long)]
        dump_range: AddressRange,
        /// Only print the executed-instruction count.
        #[arg(long)]
        quiet: bool,
        /// Stop after this many steps even if the machine has not halted.
        #[arg(long)]
        step_limit: Option<usize>,
    },
    /// List the instructions in a binary.
    Disasm {
        binary: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let isa = match Isa::new(cli.register_bits) {
        Ok(isa) => isa,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Assemble {
            input,
            output,
            test,
        } => run_assemble(&input, &output, test, &isa),
        Command::Run {
            binary,
            dump,
            dump_range,
            quiet,
            step_limit,
        } => run_binary(&binary, &dump, dump_range, quiet, step_limit, &isa),
        Command::Disasm { binary } => read_binary(&binary).map(|bytes| {
            print!("{}", disassemble(&bytes, &isa));
        }),
    };

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_assemble(input: &Path, output: &Path, test: bool, isa: &Isa) -> Result<(), String> {
    let program = load_program(input).map_err(|e| format!("Assembly failed: {e}"))?;
    let assembly =
        assembler::assemble(&program, isa).map_err(|e| format!("Assembly failed: {e}"))?;
    fs::write(output, &assembly.bytes)
        .map_err(|e| format!("Cannot write {}: {e}", output.display()))?;

    if test {
        println!("Intermediate representation:");
        for entry in &assembly.trace {
            println!("{entry}");
        }
        println!();
        println!("Bytes:        {}", hex_list(&assembly.bytes));
        println!("Total bytes:  {}", assembly.bytes.len());
    }
    println!("Assembled instructions: {}", assembly.instruction_count());
    Ok(())
}

fn run_binary(
    binary: &Path,
    dump: &Path,
    range: AddressRange,
    quiet: bool,
    step_limit: Option<usize>,
    isa: &Isa,
) -> Result<(), String> {
    let bytes = read_binary(binary)?;
    if !quiet {
        eprintln!("Loaded {} bytes", bytes.len());
    }

    let config = RunConfig { step_limit };
    let outcome = pipeline::execute(&bytes, isa, &config).map_err(|e| format!("Load failed: {e}"))?;
    println!("Executed instructions: {}", outcome.summary.executed);

    let snapshot = Snapshot::capture(&outcome.state.memory, range).map_err(|e| e.to_string())?;
    fs::write(dump, XmlExporter.export(&snapshot))
        .map_err(|e| format!("Cannot write {}: {e}", dump.display()))?;

    if !quiet {
        eprintln!(
            "Memory dump written to {} (addresses {}-{})",
            dump.display(),
            range.start,
            range.end
        );
        println!("Registers:");
        print!("{}", outcome.state.registers);
    }
    Ok(())
}

fn read_binary(path: &Path) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|e| format!("Cannot read {}: {e}", path.display()))
}
