use std::env;

use anyhow::Context;
use getopts::Options;
use rallytiming::{connect_service, init_tracing, Config};

fn print_usage(program: &str, opts: Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

fn main() -> anyhow::Result<()> {
    init_tracing("info");
    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("e", "eid", "event id", "EID");
    opts.optflag("h", "help", "print this help menu");
    let matches = opts.parse(&args[1..])?;
    if matches.opt_present("h") {
        print_usage(&program, opts);
        return Ok(());
    }
    let Some(eid_str) = matches.opt_str("e") else {
        print_usage(&program, opts);
        return Ok(());
    };
    let eid: i64 = eid_str.parse().context("event id must be a number")?;

    let config = Config::load()?;
    let service = connect_service(&config)?;
    let summary = service.recompute_elapsed_times(eid)?;

    println!(
        "Updated {} elapsed times for {} vehicles in {} chunks",
        summary.updated, summary.vehicles, summary.chunks
    );
    Ok(())
}
