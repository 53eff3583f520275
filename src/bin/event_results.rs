use std::env;

use anyhow::Context;
use getopts::Options;
use rallytiming::{connect_service, init_tracing, ClassificationScope, Config};

fn print_usage(program: &str, opts: Options) {
    let brief = format!("Usage: {} [options]", program);
    print!("{}", opts.usage(&brief));
}

fn parse_opt<T: std::str::FromStr>(matches: &getopts::Matches, name: &str) -> anyhow::Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    matches
        .opt_str(name)
        .map(|raw| raw.parse().with_context(|| format!("invalid --{}", name)))
        .transpose()
}

fn main() -> anyhow::Result<()> {
    init_tracing("warn");
    let args: Vec<String> = env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optopt("e", "eid", "event id", "EID");
    opts.optopt("c", "category", "only vehicles of this category", "CID");
    opts.optopt("s", "stage", "only this stage order", "ORDER");
    opts.optflag("n", "no-recompute", "read stored elapsed times as they are");
    opts.optflag("h", "help", "print this help menu");
    let matches = opts.parse(&args[1..])?;
    if matches.opt_present("h") {
        print_usage(&program, opts);
        return Ok(());
    }
    let Some(eid) = parse_opt::<i64>(&matches, "eid")? else {
        print_usage(&program, opts);
        return Ok(());
    };
    let scope = ClassificationScope::from_filters(
        parse_opt(&matches, "category")?,
        parse_opt(&matches, "stage")?,
    );

    let config = Config::load()?;
    let service = connect_service(&config)?;
    let rows = if matches.opt_present("n") {
        match scope {
            ClassificationScope::General => service.general_classification(eid)?,
            ClassificationScope::Category(cid) => service.category_classification(eid, cid)?,
            ClassificationScope::Stage(order) => service.stage_classification(eid, order)?,
        }
    } else {
        service.classify(eid, scope)?
    };

    println!("Results for event {}:", eid);
    for (i, row) in rows.iter().enumerate() {
        println!(
            "{} - {} ({}, {}) {}s",
            i + 1,
            row.vehicle_name,
            row.driver_name,
            row.category_name,
            row.total_time
        );
    }
    Ok(())
}
