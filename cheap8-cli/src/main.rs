//! Entrypoint for the headless runner.
use std::{env, error::Error, fs};

use cheap8::{prelude::*, IMPL_VERSION};
use log::info;

static USAGE: &str = r#"
usage: cheap8 CMD FILE [STEPS]

commands:
    run     Run the target ROM file; with STEPS, execute that many
            instructions unthrottled and print the display
    dis     Disassemble the target ROM into a readable listing

examples:
    cheap8 run breakout.rom
    cheap8 run breakout.rom 5000
    cheap8 dis breakout.rom
"#;

fn run_rom(filepath: impl AsRef<str>, steps: Option<usize>) -> Cheap8Result<()> {
    let mut vm = Cheap8Vm::new(Cheap8Conf::default());
    vm.load_rom_file(filepath.as_ref())?;

    match steps {
        Some(step_count) => {
            info!("running {} for {step_count} steps", filepath.as_ref());
            vm.run_steps(step_count);

            println!("{}", vm.dump_display()?);
            println!("faults: {}", vm.faults());
        }
        None => {
            info!("running {}", filepath.as_ref());
            // Runs at the configured instruction rate until the process
            // is killed; there is no input collaborator attached here.
            vm.run();
        }
    }

    Ok(())
}

fn disassemble(filepath: impl AsRef<str>) -> Cheap8Result<()> {
    let rom = fs::read(filepath.as_ref())?;
    print!("{}", Disassembler::new(&rom).listing()?);
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().init().unwrap();

    match parse_args() {
        Some(Cmd::Run { filepath, steps }) => run_rom(filepath, steps)?,
        Some(Cmd::Dis { filepath }) => disassemble(filepath)?,
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    }

    Ok(())
}

fn parse_args() -> Option<Cmd> {
    let mut args = env::args().skip(1);
    match args.next() {
        Some(cmd) => match cmd.as_str() {
            "run" => Some(Cmd::Run {
                filepath: args.next()?,
                steps: args.next().and_then(|arg| arg.parse().ok()),
            }),
            "dis" => Some(Cmd::Dis {
                filepath: args.next()?,
            }),
            _ => None,
        },
        None => None,
    }
}

fn print_usage() {
    println!("Cheap8 v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Run file
    Run {
        filepath: String,
        steps: Option<usize>,
    },
    /// Disassemble
    Dis { filepath: String },
}
