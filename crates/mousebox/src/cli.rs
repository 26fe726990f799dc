use std::path::PathBuf;

use clap::Parser;

use mousebox_types::{FrameError, FrameResult, Region};

/// Region applied when no `x y w h` group is given, matching the historical
/// deployment.
pub const DEFAULT_REGION: (i64, i64, i64, i64) = (50, 50, 600, 800);

#[derive(Debug, Parser)]
#[command(
    name = "mousebox",
    about = "Report when a moving object first sits fully inside a box",
    disable_help_subcommand = true
)]
pub struct CliArgs {
    /// Input video path
    pub input: Option<PathBuf>,

    /// Region of interest as four integers: x y w h (all four or none)
    #[arg(value_name = "X Y W H", num_args = 4)]
    pub region: Vec<i64>,

    /// Show the interactive display while scanning
    #[arg(short = 'V', long = "display")]
    pub display: bool,

    /// Lock decoding to a specific backend implementation
    #[arg(short = 'b', long = "backend")]
    pub backend: Option<String>,

    /// Print the list of available decoding backends
    #[arg(long = "list-backends")]
    pub list_backends: bool,

    /// Emit the run summary as one JSON object instead of the plain line
    #[arg(long = "json")]
    pub json: bool,
}

impl CliArgs {
    /// The configured region of interest. The positional group is all-or-
    /// nothing; a partial group never falls back to defaults.
    pub fn region_of_interest(&self) -> FrameResult<Region> {
        match self.region.as_slice() {
            [] => {
                let (x, y, w, h) = DEFAULT_REGION;
                Region::new(x, y, w, h)
            }
            [x, y, w, h] => Region::new(*x, *y, *w, *h),
            other => Err(FrameError::configuration(format!(
                "region takes exactly four integers (x y w h), got {}",
                other.len()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_region_group_is_absent() {
        let args = CliArgs::parse_from(["mousebox", "video.mp4"]);
        let region = args.region_of_interest().unwrap();
        assert_eq!((region.x, region.y), (50, 50));
        assert_eq!((region.width, region.height), (600, 800));
        assert!(!args.display);
    }

    #[test]
    fn full_region_group_is_accepted() {
        let args = CliArgs::parse_from(["mousebox", "video.mp4", "0", "0", "100", "100", "-V"]);
        let region = args.region_of_interest().unwrap();
        assert_eq!((region.x, region.y, region.width, region.height), (0, 0, 100, 100));
        assert!(args.display);
    }

    #[test]
    fn partial_region_group_is_a_usage_error() {
        let result = CliArgs::try_parse_from(["mousebox", "video.mp4", "10", "20"]);
        assert!(result.is_err());
    }

    #[test]
    fn non_numeric_region_is_a_usage_error() {
        let result = CliArgs::try_parse_from(["mousebox", "video.mp4", "a", "b", "c", "d"]);
        assert!(result.is_err());
    }

    #[test]
    fn zero_sized_region_is_rejected() {
        let args = CliArgs::parse_from(["mousebox", "video.mp4", "0", "0", "0", "100"]);
        assert!(args.region_of_interest().is_err());
    }
}
