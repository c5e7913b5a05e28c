use anyhow::Result;
use dualstream::app::App;
use dualstream::config::{Config, ConfigError};
use dualstream::logging::{self, LogSettings};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = match Config::load() {
        Ok(config) => config,
        Err(error) => match error.downcast_ref::<ConfigError>() {
            Some(config_error) => {
                for line in config_error.stderr_lines() {
                    eprintln!("{line}");
                }
                std::process::exit(1);
            }
            None => return Err(error),
        },
    };
    config.validate()?;
    logging::init(&LogSettings::from_env())?;

    // Quitting drops the runtime, abandoning any request still in flight.
    App::new(config.display_model()).run(&config).await
}
