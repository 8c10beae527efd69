use clap::Parser;
use simple_logger::SimpleLogger;

fn main() {
    let args = msepack::cli::Args::parse();
    if let Err(err) = SimpleLogger::new().with_level(args.log_level()).init() {
        eprintln!("{err}");
    }
    if let Err(err) = msepack::run(args) {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}
