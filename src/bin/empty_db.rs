use rallytiming::{empty_db, establish_connection, init_tracing, Config};

fn main() -> anyhow::Result<()> {
    init_tracing("info");
    let config = Config::load()?;
    let mut db = establish_connection(&config)?;
    empty_db(&mut db)?;
    Ok(())
}
