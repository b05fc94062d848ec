use clap::Parser;
use std::path::PathBuf;

/// Presents timed study sequences of words and images and records their timeline
#[derive(Debug, Parser)]
#[command(name = "study-items", version, about)]
pub struct Cli {
    /// Experiment file (JSON) with the trial timeline
    pub experiment: PathBuf,

    /// Where to write the recorded trial data (overrides the experiment file)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// TrueType font used for text stimuli (overrides the experiment file)
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Run without a window, recording surface operations only
    #[arg(long)]
    pub headless: bool,

    /// With --headless, skip real waiting and use exact virtual time
    #[arg(long, requires = "headless")]
    pub virtual_clock: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn virtual_clock_requires_headless() {
        assert!(Cli::try_parse_from(["study-items", "exp.json", "--virtual-clock"]).is_err());
        let cli =
            Cli::try_parse_from(["study-items", "exp.json", "--headless", "--virtual-clock"])
                .unwrap();
        assert!(cli.headless && cli.virtual_clock);
        assert_eq!(cli.experiment, PathBuf::from("exp.json"));
    }
}
