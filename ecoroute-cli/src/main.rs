//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

fn main() {
    if let Err(err) = ecoroute_cli::run() {
        eprintln!("ecoroute: {err}");
        std::process::exit(1);
    }
}
