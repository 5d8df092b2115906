use std::process::ExitCode;

fn main() -> ExitCode {
    memoreg_cli::run()
}
