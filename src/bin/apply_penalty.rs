use std::env;

use anyhow::Context;
use getopts::Options;
use rallytiming::models::PenaltyRequest;
use rallytiming::penalty::floor_seconds;
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
    opts.optopt("r", "rid", "stage result id", "RID");
    opts.optopt("w", "waypoint", "waypoint penalty, e.g. PT30S", "DURATION");
    opts.optopt("s", "speed", "speed penalty, e.g. PT1M", "DURATION");
    opts.optopt("d", "discount", "claim discount, e.g. PT10S", "DURATION");
    opts.optflag("h", "help", "print this help menu");
    let matches = opts.parse(&args[1..])?;
    if matches.opt_present("h") {
        print_usage(&program, opts);
        return Ok(());
    }
    let Some(rid_str) = matches.opt_str("r") else {
        print_usage(&program, opts);
        return Ok(());
    };
    let rid: i64 = rid_str.parse().context("stage result id must be a number")?;

    // Omitted values clear the corresponding adjustment.
    let request = PenaltyRequest {
        penalty_waypoint: matches.opt_str("w"),
        penalty_speed: matches.opt_str("s"),
        discount_claim: matches.opt_str("d"),
    };

    let config = Config::load()?;
    let service = connect_service(&config)?;
    let capture = service.apply_penalties(rid, &request)?;
    println!(
        "Stage result {}: waypoint {}s, speed {}s, discount {}s",
        capture.id,
        floor_seconds(capture.penalties.waypoint),
        floor_seconds(capture.penalties.speed),
        floor_seconds(capture.penalties.discount),
    );
    Ok(())
}
