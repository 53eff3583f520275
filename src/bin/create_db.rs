use rallytiming::{create_db, establish_connection, init_tracing, Config};

fn main() -> anyhow::Result<()> {
    init_tracing("info");
    let config = Config::load()?;
    let mut db = establish_connection(&config)?;
    create_db(&mut db)?;
    println!("Created stage result schema");
    Ok(())
}
