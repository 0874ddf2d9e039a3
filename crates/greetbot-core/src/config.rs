use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Typed runtime configuration.
///
/// Flag parsing lives in the binary; this type performs the startup
/// filesystem reads and validation. Startup errors are fatal: the bot never
/// serves events from a partially loaded configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Bot API token, trimmed of surrounding whitespace.
    pub bot_token: String,
    /// Directory holding `default.md` and per-chat `chat<ID>.md` files.
    pub greet_dir: PathBuf,
    /// Minimum delay between two greetings in the same chat.
    pub min_delay: Duration,
}

impl Config {
    pub fn load(token_file: &Path, greet_dir: &Path, min_delay: Duration) -> Result<Self> {
        let raw = fs::read_to_string(token_file).map_err(|e| {
            Error::Config(format!(
                "can not read token file {}: {e}",
                token_file.display()
            ))
        })?;
        let bot_token = raw.trim().to_string();
        if bot_token.is_empty() {
            return Err(Error::Config(format!(
                "token file {} is empty",
                token_file.display()
            )));
        }

        if !greet_dir.is_dir() {
            return Err(Error::Config(format!(
                "greeting directory {} does not exist",
                greet_dir.display()
            )));
        }

        Ok(Self {
            bot_token,
            greet_dir: greet_dir.to_path_buf(),
            min_delay,
        })
    }
}

/// Parse a `30s` / `5m` / `2h` style duration. A bare number means seconds.
///
/// Used as the clap value parser for `--delay`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    let unit_start = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (num, unit) = s.split_at(unit_start);
    let n: u64 = num.parse().map_err(|_| format!("invalid duration {s:?}"))?;

    match unit {
        "" | "s" | "sec" => Ok(Duration::from_secs(n)),
        "ms" => Ok(Duration::from_millis(n)),
        "m" | "min" => Ok(Duration::from_secs(n * 60)),
        "h" => Ok(Duration::from_secs(n * 3600)),
        _ => Err(format!(
            "invalid duration unit in {s:?} (expected ms, s, m or h)"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = PathBuf::from(format!("/tmp/greetbot-cfg-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
        assert!(parse_duration("5x").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("m").is_err());
    }

    #[test]
    fn trims_token_and_rejects_empty() {
        let dir = scratch_dir("token");
        let token_file = dir.join("token.txt");
        fs::write(&token_file, "  123:abc\n").unwrap();

        let cfg = Config::load(&token_file, &dir, Duration::from_secs(1)).unwrap();
        assert_eq!(cfg.bot_token, "123:abc");

        fs::write(&token_file, " \n").unwrap();
        assert!(matches!(
            Config::load(&token_file, &dir, Duration::from_secs(1)),
            Err(Error::Config(_))
        ));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_token_file_is_fatal() {
        let dir = scratch_dir("missing");
        let err = Config::load(&dir.join("nope.txt"), &dir, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_greet_dir_is_fatal() {
        let dir = scratch_dir("dir");
        let token_file = dir.join("token.txt");
        fs::write(&token_file, "t").unwrap();

        let err =
            Config::load(&token_file, &dir.join("nope"), Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let _ = fs::remove_dir_all(&dir);
    }
}
