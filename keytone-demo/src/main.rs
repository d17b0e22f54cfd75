mod cli;

use anyhow::Result;
use clap::{Parser, crate_version};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    version = crate_version!(),
    about = "Types stdin lines through a keyboard sound pack."
)]
pub struct Args {
    /// Directory holding one subdirectory per sound pack.
    #[arg(long)]
    pub packs: PathBuf,
    /// Id of the pack to play. Defaults to the first pack found.
    #[arg(long)]
    pub pack: Option<String>,
    /// Output volume between 0 and 1.
    #[arg(long, default_value_t = 0.5, value_parser = parse_volume)]
    pub volume: f32,
}

fn parse_volume(value: &str) -> std::result::Result<f32, String> {
    let volume: f32 = value
        .parse()
        .map_err(|e| format!("{value} is not a number: {e}"))?;
    if !(0.0..=1.0).contains(&volume) {
        return Err(format!("{volume} is outside 0..=1"));
    }
    Ok(volume)
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    cli::run(Args::parse())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_flags() {
        let args = Args::try_parse_from([
            "keytone-demo",
            "--packs",
            "/tmp/packs",
            "--pack",
            "cherry",
            "--volume",
            "0.25",
        ])
        .unwrap();
        assert_eq!(args.packs, PathBuf::from("/tmp/packs"));
        assert_eq!(args.pack.as_deref(), Some("cherry"));
        assert_eq!(args.volume, 0.25);
    }

    #[test]
    fn volume_defaults_and_is_bounded() {
        let args = Args::try_parse_from(["keytone-demo", "--packs", "p"]).unwrap();
        assert_eq!(args.volume, 0.5);
        assert!(args.pack.is_none());

        assert!(Args::try_parse_from(["keytone-demo", "--packs", "p", "--volume", "3"]).is_err());
        assert!(Args::try_parse_from(["keytone-demo"]).is_err());
    }
}
