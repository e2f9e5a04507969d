use std::fs;
use std::io::{stdin, IsTerminal, Read};
use std::path::{Path, PathBuf};

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use colored::Colorize;
use console::Term;
use miette::{bail, IntoDiagnostic, Result};

use femto::io::FLOATING_INPUT;
use femto::output::Output;
use femto::{disasm, RunState};

/// Femto is an assembler, disassembler and emulator for the Femto toy computer.
#[derive(Parser)]
#[command(version, disable_version_flag = true, disable_help_flag = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    /// Print help
    #[arg(short = 'h', long = "help", short_alias = '?', action = ArgAction::Help)]
    help: Option<bool>,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a `.asm` file into a binary image
    Asm {
        /// `.asm` file to assemble
        #[arg(short, long)]
        file: PathBuf,
        /// Destination of the image, defaults to the source with a `.bin` extension
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check a `.asm` file without writing an image
    Check {
        /// File to check
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Run a binary image, or a `.asm` file assembled in memory
    Run {
        /// Image or `.asm` file to run
        #[arg(short, long)]
        file: PathBuf,
        /// Trace every instruction and dump registers at halt, also `-vb`
        #[arg(long, visible_alias = "vb")]
        verbose: bool,
    },
    /// Print a listing of a binary image
    Dism {
        /// Image to disassemble
        #[arg(short, long)]
        file: PathBuf,
    },
}

/// Port wired to the console in both directions.
const CONSOLE_PORT: u8 = 0x00;

fn main() -> miette::Result<()> {
    use MsgColor::*;
    // `-vb` is accepted as the short form of `--verbose`
    let args = Args::parse_from(std::env::args().map(|arg| {
        if arg == "-vb" {
            "--verbose".to_string()
        } else {
            arg
        }
    }));
    femto::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(femto::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    let Some(command) = args.command else {
        println!("\n~ femto v{VERSION} ~");
        println!("{}", LOGO.cyan().bold());
        println!("{SHORT_INFO}");
        Args::command().print_help().into_diagnostic()?;
        std::process::exit(0);
    };

    match command {
        Command::Asm { file, output } => {
            file_message(Green, "Assembling", &file);
            let image = assemble_file(&file)?;

            let dest = output.unwrap_or_else(|| file.with_extension("bin"));
            fs::write(&dest, &image).into_diagnostic()?;

            message(Green, "Finished", &format!("emit {} bytes", image.len()));
            file_message(Green, "Saved", &dest);
            Ok(())
        }
        Command::Check { file } => {
            file_message(Green, "Checking", &file);
            let _ = assemble_file(&file)?;
            message(Green, "Success", "no errors found!");
            Ok(())
        }
        Command::Run { file, verbose } => run(&file, verbose || femto::env::is_verbose()),
        Command::Dism { file } => {
            let image = fs::read(&file).into_diagnostic()?;
            for line in disasm::listing(&image) {
                println!("{line}");
            }
            Ok(())
        }
    }
}

enum MsgColor {
    Green,
    Cyan,
    Yellow,
    Red,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

fn message(color: MsgColor, left: &str, right: &str) {
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Yellow => left.yellow(),
        MsgColor::Red => left.red(),
    };
    println!("{left:>12} {right}");
}

fn run(name: &Path, verbose: bool) -> Result<()> {
    let image = match name.extension().and_then(|ext| ext.to_str()) {
        Some("asm") => {
            file_message(MsgColor::Green, "Assembling", name);
            assemble_file(name)?
        }
        _ => fs::read(name).into_diagnostic()?,
    };

    let mut state = RunState::from_image(&image).into_diagnostic()?;
    let ports = state.ports_mut();
    let wired = [
        ports.register_output(CONSOLE_PORT, |value| {
            Output::Normal.print_char(value as char)
        }),
        ports.register_input(CONSOLE_PORT, read_input),
    ];
    for conflict in wired.into_iter().filter_map(|res| res.err()) {
        message(MsgColor::Yellow, "Warning", &conflict.to_string());
    }

    Output::set_verbose(verbose);
    file_message(MsgColor::Green, "Running", name);
    let res = state.run();

    Output::Normal.start_new_line();
    if verbose {
        Output::Trace.print_registers(&state);
    }
    match res {
        Ok(()) => {
            message(MsgColor::Cyan, "Halted", &format!("at 0x{:03X}", state.pc()));
            Ok(())
        }
        Err(err) => {
            message(MsgColor::Red, "Fault", &err.to_string());
            bail!(code = "run::fault", "Machine halted on a fault: {err}")
        }
    }
}

/// Read source and assemble it, reporting errors against the source.
fn assemble_file(name: &Path) -> Result<Vec<u8>> {
    let src = fs::read_to_string(name).into_diagnostic()?;
    femto::assemble(&src).map_err(|err| err.report(src))
}

// Read one byte from stdin or unbuffered terminal
fn read_input() -> u8 {
    if stdin().is_terminal() {
        match Term::stdout().read_char() {
            Ok(ch) => ch as u8,
            Err(_) => FLOATING_INPUT,
        }
    } else {
        let mut buf = [0; 1];
        match stdin().read_exact(&mut buf) {
            Ok(()) => buf[0],
            Err(_) => FLOATING_INPUT,
        }
    }
}

const LOGO: &str = r#"
  __                _
 / _| ___ _ __ ___ | |_ ___
| |_ / _ \ '_ ` _ \| __/ _ \
|  _|  __/ | | | | | || (_) |
|_|  \___|_| |_| |_|\__\___/"#;

const SHORT_INFO: &str = r"
Welcome to femto, an assembler, disassembler and emulator
for the Femto toy computer.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
