mod plant;
mod session;

use std::env;
use std::path::PathBuf;
use std::process;

use mppt_core::config::LOG_FILE_NAME;

use plant::WindProfile;
use session::SessionConfig;

const DEFAULT_SECONDS: u64 = 60;
const USAGE: &str =
    "Usage: mppt-emulator [--profile <steady|gusty>] [--seconds <n>] [--log <path>] [--quiet]";

fn main() {
    let config = parse_args(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    println!(
        "Wind MPPT emulator: {:?} wind for {} s, logging to {}",
        config.profile,
        config.seconds,
        config.log_path.display()
    );

    let summary = session::run(&config);

    println!(
        "Done: {} resistor ticks, {} records written, {} skipped, final state {} at {:.2} W",
        summary.resistor_ticks,
        summary.records_written,
        summary.records_skipped,
        summary.final_state,
        summary.final_power
    );
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<SessionConfig, String> {
    let mut config = SessionConfig {
        profile: WindProfile::Steady,
        seconds: DEFAULT_SECONDS,
        log_path: PathBuf::from(LOG_FILE_NAME),
        echo: true,
    };

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        let mut value = || {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("Expected value after {flag}"))
        };

        match flag.as_str() {
            "--profile" => config.profile = WindProfile::from_tag(&value()?)?,
            "--seconds" => {
                let raw = value()?;
                config.seconds = raw
                    .parse()
                    .map_err(|_| format!("Invalid duration `{raw}`"))?;
            }
            "--log" => config.log_path = PathBuf::from(value()?),
            "--quiet" => config.echo = false,
            other => return Err(format!("Unknown argument `{other}`")),
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<SessionConfig, String> {
        parse_args(args.iter().map(ToString::to_string))
    }

    #[test]
    fn defaults_use_device_log_name() {
        let config = parse(&[]).expect("defaults parse");
        assert_eq!(config.profile, WindProfile::Steady);
        assert_eq!(config.seconds, DEFAULT_SECONDS);
        assert_eq!(config.log_path, PathBuf::from(LOG_FILE_NAME));
        assert!(config.echo);
    }

    #[test]
    fn flags_accept_separate_and_inline_values() {
        let config = parse(&["--profile", "gusty", "--seconds=30", "--log", "/tmp/x.txt", "--quiet"])
            .expect("flags parse");
        assert_eq!(config.profile, WindProfile::Gusty);
        assert_eq!(config.seconds, 30);
        assert_eq!(config.log_path, PathBuf::from("/tmp/x.txt"));
        assert!(!config.echo);
    }

    #[test]
    fn bad_arguments_are_reported() {
        assert!(parse(&["--seconds", "soon"]).is_err());
        assert!(parse(&["--profile"]).is_err());
        assert!(parse(&["--turbo"]).is_err());
    }
}
