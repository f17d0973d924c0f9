use std::io;
use std::process::ExitCode;

use emos_sim::config::SimConfig;
use emos_sim::console;
use emos_sim::shell::Shell;

fn main() -> ExitCode {
    let config = match SimConfig::from_args(std::env::args().skip(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("emos-sim: {}", e);
            eprintln!("usage: emos-sim [--memory N] [--quanta a,b,c] [--honor-priority] [--log LEVEL]");
            return ExitCode::from(2);
        }
    };

    if let Err(e) = console::init(config.log_level) {
        eprintln!("emos-sim: logger setup failed: {}", e);
    }
    log::info!(
        "Simulator starting: memory {} units, quanta {:?}",
        config.memory_size,
        config.quanta
    );

    let mut shell = match Shell::new(config) {
        Ok(shell) => shell,
        Err(e) => {
            eprintln!("emos-sim: {}", e);
            return ExitCode::from(2);
        }
    };

    let stdin = io::stdin();
    if let Err(e) = shell.run(stdin.lock(), io::stdout()) {
        eprintln!("emos-sim: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
