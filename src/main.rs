use anyhow::{anyhow, Result};
use dotenv::dotenv;
use env_logger::Env;

use pvpipe::constants::{defaults, envvars};
use pvpipe::{argsets, command};

const CMD_UPLOAD: &str = "upload";
const CMD_UPLOAD_RECENT: &str = "upload-recent";
const CMD_SITE_INFO: &str = "site-info";

fn main() {
    let _ = dotenv();
    env_logger::Builder::from_env(
        Env::default().filter_or(envvars::LOG_LEVEL, defaults::LOG_LEVEL),
    )
    .init();

    let mut args = pico_args::Arguments::from_env();
    let subcommand = args.subcommand().ok().flatten();

    if let Err(e) = dispatch(subcommand.as_deref(), &mut args) {
        log::error!("{e:?}");
        match subcommand.as_deref() {
            Some(CMD_UPLOAD) | None => command::report_failure("Error during data upload", &e),
            Some(CMD_UPLOAD_RECENT) => {
                command::report_failure("Error during recent data upload", &e)
            }
            _ => (),
        }
        std::process::exit(1);
    }
}

fn dispatch(subcommand: Option<&str>, args: &mut pico_args::Arguments) -> Result<()> {
    match subcommand {
        // a bare invocation is the daily upload run
        Some(CMD_UPLOAD) | None => {
            log::info!("Starting data upload");
            command::upload(argsets::UploadArgs {
                start: args.opt_value_from_str("--start")?,
                end: args.opt_value_from_str("--end")?,
            })?;
            log::info!("Finished data upload");
            Ok(())
        }
        Some(CMD_UPLOAD_RECENT) => {
            log::info!("Starting recent data upload");
            command::upload_recent()?;
            log::info!("Finished recent data upload");
            Ok(())
        }
        Some(CMD_SITE_INFO) => command::site_info(),
        _ => Err(anyhow!(
            "Subcommand must be one of '{CMD_UPLOAD}', '{CMD_UPLOAD_RECENT}', '{CMD_SITE_INFO}'"
        )),
    }
}
