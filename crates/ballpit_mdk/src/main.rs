use ballpit_utils::{ok, AnyResult};
use clap::Parser;

fn main() -> AnyResult {
    let cli = ballpit_mdk::Cli::parse_from(wild::args());
    ballpit_mdk::init_logging(cli.verbose);
    ballpit_mdk::run(cli)?;
    ok()
}
