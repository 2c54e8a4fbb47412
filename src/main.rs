mod cli;
mod jq_exec;

use std::process::ExitCode;

use colored::Colorize;

fn main() -> ExitCode {
    env_logger::init();
    let command_line_interface = cli::CommandLineInterface::load();
    match command_line_interface.run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(error) => {
            eprintln!("{} {error:#}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}
