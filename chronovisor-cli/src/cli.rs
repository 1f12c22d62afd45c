use crate::{host::TerminalKeySelector, output};
use anyhow::{Context, Result, anyhow, bail};
use chrono::Local;
use chronovisor_core::{
    ApiKeySlot, Axis, Config, Controller, ControllerError, CredentialGate, Era, Hemisphere,
    KeySelector, SouvenirOptions, TimeField, TimeParams, events::HISTORICAL_EVENTS,
    model_from_config, souvenir::souvenir_file_name,
};
use clap::{ArgAction, Args, Parser, Subcommand};
use inquire::Confirm;
use std::{
    fs,
    io::IsTerminal,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::debug;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "chronovisor",
    version,
    about = "Locate a moment in history and observe it"
)]
pub struct Cli {
    /// Use canned results instead of calling the model.
    #[arg(long, global = true)]
    pub mock: bool,

    /// Config file to use instead of the platform default.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Raise log verbosity (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Select an API key and default mode.
    Configure,

    /// Re-open API key selection.
    ResetKey,

    /// List the built-in historical events.
    Events,

    /// Show the era a year belongs to.
    Era {
        #[arg(allow_hyphen_values = true)]
        year: i64,
    },

    /// Jump to a built-in event, chosen at random unless --event is given.
    Random {
        /// Event id from `chronovisor events`.
        #[arg(long, value_name = "ID")]
        event: Option<String>,

        #[command(flatten)]
        output: TravelOutput,
    },

    /// Resolve a free-text query to a place and time.
    Search {
        query: String,

        #[command(flatten)]
        output: TravelOutput,
    },

    /// Travel to explicit coordinates. Omitted time fields use the current local time.
    Travel {
        /// Latitude magnitude, 0 to 90.
        #[arg(long, allow_hyphen_values = true)]
        lat: String,

        #[arg(long, default_value = "N")]
        ns: String,

        /// Longitude magnitude, 0 to 180.
        #[arg(long, allow_hyphen_values = true)]
        lng: String,

        #[arg(long, default_value = "E")]
        ew: String,

        /// Signed year; 0 and below are BC.
        #[arg(long, allow_hyphen_values = true)]
        year: Option<String>,

        #[arg(long)]
        month: Option<String>,

        #[arg(long)]
        day: Option<String>,

        #[arg(long)]
        hour: Option<String>,

        #[arg(long)]
        minute: Option<String>,

        #[arg(long)]
        second: Option<String>,

        #[command(flatten)]
        output: TravelOutput,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct TravelOutput {
    /// Travel after locating the target.
    #[arg(long)]
    pub travel: bool,

    /// Save a souvenir PNG to a file or directory (default: current directory).
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = ".")]
    pub souvenir: Option<PathBuf>,

    /// Save the raw generated image.
    #[arg(long, value_name = "FILE")]
    pub image_out: Option<PathBuf>,
}

impl TravelOutput {
    fn wants_travel(&self) -> bool {
        self.travel || self.souvenir.is_some() || self.image_out.is_some()
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let config_path = match &self.config {
            Some(path) => path.clone(),
            None => Config::config_file_path()?,
        };

        match self.command {
            Command::Configure => configure(&config_path).await,
            Command::Events => {
                for event in HISTORICAL_EVENTS {
                    output::print_event(event);
                    println!();
                }
                Ok(())
            }
            Command::Era { year } => {
                let time = TimeParams::new(year, 1, 1, 0, 0, 0);
                println!("{}: {}", time.year_label(), Era::of(year));
                Ok(())
            }
            Command::ResetKey => {
                let session = Session::open(&config_path, false)?;
                session.controller.set_mock_mode(false);
                if !session.controller.reset_credentials().await {
                    bail!("API key selection is only available from an interactive terminal");
                }
                println!("API key updated.");
                Ok(())
            }
            Command::Random { event, output } => {
                let session = Session::open(&config_path, self.mock)?;
                let event = match event.as_deref() {
                    Some(id) => session.controller.select_event(id).ok_or_else(|| {
                        anyhow!("Unknown event '{id}'. Run `chronovisor events` for the list.")
                    })?,
                    None => session
                        .controller
                        .randomize()
                        .ok_or_else(|| anyhow!("A request is already in flight"))?,
                };
                output::print_event(event);
                if output.wants_travel() {
                    session.travel(&output).await?;
                }
                Ok(())
            }
            Command::Search { query, output } => {
                if query.trim().is_empty() {
                    bail!("Search query must not be empty");
                }
                let session = Session::open(&config_path, self.mock)?;
                let found = session.controller.search(&query).await;
                match found.map_err(|e| session.fail(e))? {
                    Some(found) => output::print_match(&found),
                    None => bail!("Search already in progress"),
                }
                if output.wants_travel() {
                    session.travel(&output).await?;
                }
                Ok(())
            }
            Command::Travel {
                lat,
                ns,
                lng,
                ew,
                year,
                month,
                day,
                hour,
                minute,
                second,
                output,
            } => {
                let session = Session::open(&config_path, self.mock)?;
                let ns = hemisphere_on(Axis::Latitude, &ns)?;
                let ew = hemisphere_on(Axis::Longitude, &ew)?;
                session.controller.set_coordinate_magnitude(Axis::Latitude, &lat, ns);
                let target = session.controller.set_coordinate_magnitude(Axis::Longitude, &lng, ew);

                if let Some(year) = year {
                    session.controller.set_year_manual(&year);
                }
                let fields = [
                    (TimeField::Month, month),
                    (TimeField::Day, day),
                    (TimeField::Hour, hour),
                    (TimeField::Minute, minute),
                    (TimeField::Second, second),
                ];
                for (field, value) in fields {
                    if let Some(value) = value {
                        session.controller.set_time_field(field, &value);
                    }
                }

                let time = session.controller.snapshot().time;
                println!("Target: {target} at {}", time.format_short());
                session.travel(&output).await
            }
        }
    }
}

/// A loaded config plus a controller wired to the terminal.
struct Session {
    controller: Controller,
    config: Config,
}

impl Session {
    fn open(config_path: &Path, force_mock: bool) -> Result<Self> {
        let mut config = Config::load_from(config_path)?;
        config.mock_mode |= force_mock;

        let slot = ApiKeySlot::new(config.effective_api_key());
        let gate = if std::io::stdin().is_terminal() {
            let selector = TerminalKeySelector::new(slot.clone(), config_path.to_path_buf());
            CredentialGate::Host(Box::new(selector))
        } else {
            CredentialGate::Static(slot.clone())
        };
        debug!(mock = config.mock_mode, host = gate.is_host_managed(), "session opened");

        let model = Arc::from(model_from_config(&config, slot));
        let controller = Controller::new(model, Arc::new(gate), &config, local_now());
        Ok(Self { controller, config })
    }

    async fn travel(&self, output: &TravelOutput) -> Result<()> {
        let result = self.controller.travel().await.map_err(|e| self.fail(e))?;
        output::print_result(&result);

        if let Some(target) = &output.image_out {
            output::write_image(&result, target)?;
            println!("Image saved to {}", target.display());
        }

        if let Some(target) = &output.souvenir {
            let options = SouvenirOptions::from_config(&self.config);
            let png = self.controller.export_souvenir(&options)?;
            let path = if target.is_dir() {
                target.join(souvenir_file_name(&result))
            } else {
                target.clone()
            };
            fs::write(&path, png)
                .with_context(|| format!("Failed to write souvenir: {}", path.display()))?;
            println!("Souvenir saved to {}", path.display());
        }
        Ok(())
    }

    /// Surface a controller error, hinting at key reselection when it could help.
    fn fail(&self, err: ControllerError) -> anyhow::Error {
        if err.offers_credential_reset() && !self.controller.snapshot().mock_mode {
            eprintln!("Hint: run `chronovisor reset-key` to select a different API key.");
        }
        anyhow::Error::new(err).context("CRITICAL ERROR")
    }
}

async fn configure(config_path: &Path) -> Result<()> {
    let current = Config::load_from(config_path)?;
    let selector = TerminalKeySelector::new(ApiKeySlot::default(), config_path.to_path_buf());
    selector.open_select_key().await?;

    let default = current.mock_mode;
    let mock_mode = tokio::task::spawn_blocking(move || {
        Confirm::new("Start in mock mode by default?").with_default(default).prompt()
    })
    .await
    .context("Mode prompt panicked")?
    .context("Configuration cancelled")?;

    // Re-read: the selector has just written the key.
    let mut config = Config::load_from(config_path)?;
    config.mock_mode = mock_mode;
    config.save_to(config_path)?;

    println!("Configuration saved to {}", config_path.display());
    Ok(())
}

fn hemisphere_on(axis: Axis, value: &str) -> Result<Hemisphere> {
    let hemisphere = Hemisphere::try_from(value)?;
    if hemisphere.axis() != axis {
        bail!(
            "Hemisphere '{value}' does not apply here; expected {} or {}",
            axis.positive(),
            axis.negative()
        );
    }
    Ok(hemisphere)
}

fn local_now() -> TimeParams {
    TimeParams::from_datetime(&Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_travel_with_negative_year() {
        let cli = Cli::try_parse_from([
            "chronovisor", "travel", "--lat", "29.97", "--lng", "31.13", "--year", "-2560",
        ])
        .unwrap();
        match cli.command {
            Command::Travel { lat, ns, year, output, .. } => {
                assert_eq!(lat, "29.97");
                assert_eq!(ns, "N");
                assert_eq!(year.as_deref(), Some("-2560"));
                assert!(output.souvenir.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn bare_souvenir_flag_means_current_directory() {
        let cli = Cli::try_parse_from(["chronovisor", "--mock", "random", "--souvenir"]).unwrap();
        assert!(cli.mock);
        match cli.command {
            Command::Random { event, output } => {
                assert!(event.is_none());
                assert_eq!(output.souvenir, Some(PathBuf::from(".")));
                assert!(output.wants_travel());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn random_accepts_an_event_id() {
        let cli = Cli::try_parse_from(["chronovisor", "random", "--event", "woodstock"]).unwrap();
        match cli.command {
            Command::Random { event, output } => {
                assert_eq!(event.as_deref(), Some("woodstock"));
                assert!(!output.wants_travel());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn era_accepts_negative_years() {
        let cli = Cli::try_parse_from(["chronovisor", "era", "-3500"]).unwrap();
        assert!(matches!(cli.command, Command::Era { year: -3500 }));
    }

    #[test]
    fn hemisphere_must_match_axis() {
        assert_eq!(hemisphere_on(Axis::Latitude, "s").unwrap(), Hemisphere::South);
        assert!(hemisphere_on(Axis::Latitude, "E").is_err());
        assert!(hemisphere_on(Axis::Longitude, "north").is_err());
        assert!(hemisphere_on(Axis::Longitude, "X").is_err());
    }

    #[test]
    fn verbosity_counts() {
        let cli = Cli::try_parse_from(["chronovisor", "-vv", "events"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
