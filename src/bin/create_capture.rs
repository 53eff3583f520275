use std::env;

use anyhow::{anyhow, Context};
use chrono::NaiveDateTime;
use getopts::Options;
use rallytiming::models::NewCapture;
use rallytiming::{connect_service, init_tracing, Config};

fn print_usage(program: &str, opts: Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

fn required<T: std::str::FromStr>(matches: &getopts::Matches, name: &str) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    matches
        .opt_str(name)
        .ok_or_else(|| anyhow!("missing --{}", name))?
        .parse()
        .with_context(|| format!("invalid --{}", name))
}

fn main() -> anyhow::Result<()> {
    init_tracing("info");
    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("v", "vehicle", "vehicle id", "VID");
    opts.optopt("s", "stage", "stage id", "SID");
    opts.optopt("t", "time", "capture time, e.g. 2024-05-04T10:05:30", "TIME");
    opts.optopt("", "lat", "latitude", "LAT");
    opts.optopt("", "lon", "longitude", "LON");
    opts.optflag("h", "help", "print this help menu");
    let matches = opts.parse(&args[1..])?;
    if matches.opt_present("h") || !matches.opt_present("v") || !matches.opt_present("s") {
        print_usage(&program, opts);
        return Ok(());
    }

    let request = NewCapture {
        vehicle_id: required(&matches, "vehicle")?,
        stage_id: required(&matches, "stage")?,
        timestamp: required::<NaiveDateTime>(&matches, "time")?,
        latitude: required(&matches, "lat")?,
        longitude: required(&matches, "lon")?,
    };

    let config = Config::load()?;
    let service = connect_service(&config)?;
    let capture = service.create_capture(&request)?;
    println!("Created stage result with ID {}", capture.id);
    Ok(())
}
