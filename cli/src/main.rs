use bigbuf::{RegistryConfig, StoreRegistry};
use cli::{parse_command, Command, Driver};
use std::fs::File;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn load_config() -> Result<RegistryConfig, Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    match (args.next().as_deref(), args.next()) {
        (None, _) => Ok(RegistryConfig::default()),
        (Some("--config"), Some(path)) => Ok(RegistryConfig::from_json_reader(File::open(path)?)?),
        _ => Err("usage: bigbuf-cli [--config FILE]".into()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let registry = StoreRegistry::new(load_config()?)?;
    let mut driver = Driver::new(&registry);

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        let command = match parse_command(&line) {
            Ok(Command::Quit) => break,
            Ok(command) => command,
            Err(e) => {
                writeln!(stdout, "error: {e}")?;
                continue;
            }
        };
        writeln!(stdout, "{}", driver.execute(command))?;
    }

    driver.close_all();
    drop(driver);
    let report = registry.shutdown();
    writeln!(
        stdout,
        "released {} bytes from {} stores",
        report.bytes_released, report.stores
    )?;
    Ok(())
}
