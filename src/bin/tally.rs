use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use diesel::{Connection, SqliteConnection};
use serde_json::json;
use tally::{
    config::Settings,
    state,
    tournaments::{
        Tournament,
        config::{TournamentConfig, config_of_tournament},
        rounds::{
            Side,
            ballots::Ballot,
            results::{
                DebateResult, ForfeitDebateResult, ResultBuffer, ResultStatus,
                prefetch::populate_results,
            },
        },
        standings::{TeamMetric, TeamStandings},
    },
};

#[derive(Parser)]
#[clap(about = "Checks and stores the results of debates")]
struct Cli {
    /// Defaults to `DATABASE_URL`, then the settings file.
    #[clap(long)]
    database_url: Option<String>,
    /// A TOML settings file.
    #[clap(long, short)]
    config: Option<PathBuf>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Applies any pending migrations.
    Migrate,
    /// Prints a ballot's result with its per-sheet breakdown.
    Show { ballot: String },
    /// Prints the status of every confirmed ballot of a tournament.
    Check { tournament: String },
    /// Loads a ballot's result and saves it again, rewriting its score rows.
    Resave { ballot: String },
    /// Records that a team forfeited the debate of a ballot.
    Forfeit {
        ballot: String,
        #[clap(long, value_enum)]
        side: SideArg,
    },
    /// Lists the adjudicators of a ballot's panel and whether each dissented.
    Splits { ballot: String },
    #[clap(subcommand)]
    Config(ConfigCommand),
    /// Ranks the teams of a tournament.
    Standings {
        tournament: String,
        #[clap(long = "metric", value_enum)]
        metrics: Vec<TeamMetric>,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Prints a tournament's result settings as TOML.
    Get { tournament: String },
    /// Replaces a tournament's result settings with those in a TOML file.
    Set { tournament: String, file: PathBuf },
}

#[derive(ValueEnum, Clone, Copy)]
enum SideArg {
    Aff,
    Neg,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Aff => Side::AFF,
            SideArg::Neg => Side::NEG,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref(), cli.database_url)?;
    settings.init_tracing();

    if let Command::Migrate = cli.command {
        let mut conn = SqliteConnection::establish(&settings.database_url)
            .with_context(|| format!("opening {}", settings.database_url))?;
        let applied = state::migrate(&mut conn)?;
        print(&json!({ "applied": applied }))?;
        return Ok(());
    }

    let mut conn = state::connect(&settings.database_url)?;
    match cli.command {
        Command::Migrate => {}
        Command::Show { ballot } => {
            let result = DebateResult::fetch(&ballot, &mut conn)?;
            print(&json!({
                "ballot": result.ballot(),
                "status": result.status(),
                "winner": result.winning_team().ok().flatten(),
                "sheets": result.breakdown(),
            }))?;
        }
        Command::Check { tournament } => {
            let tournament = Tournament::fetch(&tournament, &mut conn)?;
            let ballots = Ballot::confirmed_of_tournament(&tournament.id, &mut conn)?;
            let results = populate_results(ballots, &tournament, &mut conn)?;

            let statuses = results
                .iter()
                .map(|result| {
                    json!({
                        "ballot": result.ballot().id,
                        "debate": result.ballot().debate_id,
                        "status": result.status(),
                    })
                })
                .collect::<Vec<_>>();
            print(&statuses)?;

            let bad = results
                .iter()
                .filter(|result| result.status() != ResultStatus::Valid)
                .count();
            if bad > 0 {
                bail!("{bad} of {} confirmed results are not valid", results.len());
            }
        }
        Command::Resave { ballot } => {
            let result = DebateResult::fetch(&ballot, &mut conn)?;
            state::save_atomically(&result, &mut conn)
                .with_context(|| format!("saving ballot {ballot}"))?;
            tracing::info!("resaved ballot {ballot}");
        }
        Command::Forfeit { ballot, side } => {
            let ballot = Ballot::fetch(&ballot, &mut conn)?;
            let tournament = Tournament::fetch(&ballot.tournament_id, &mut conn)?;
            let mut forfeit =
                ForfeitDebateResult::new(ballot, &tournament, side.into())?;
            forfeit.full_load(&mut conn)?;
            let result = DebateResult::Forfeit(forfeit);
            state::save_atomically(&result, &mut conn)
                .context("the debate's sides must be allocated first")?;
            print(&json!({ "winner": result.winning_team()? }))?;
        }
        Command::Splits { ballot } => {
            let result = DebateResult::fetch(&ballot, &mut conn)?;
            let Some(voting) = result.as_voting() else {
                bail!("ballot {ballot} was not entered per adjudicator");
            };
            let panel = voting
                .adjudicators_with_splits()?
                .map(|(judge, role, split)| {
                    json!({ "judge": judge.name, "role": role, "split": split })
                })
                .collect::<Vec<_>>();
            print(&panel)?;
        }
        Command::Config(ConfigCommand::Get { tournament }) => {
            let tournament = Tournament::fetch(&tournament, &mut conn)?;
            print!("{}", config_of_tournament(&tournament).to_toml()?);
        }
        Command::Config(ConfigCommand::Set { tournament, file }) => {
            let contents = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            TournamentConfig::from_toml(&contents)?.apply(&tournament, &mut conn)?;
            tracing::info!("updated the configuration of {tournament}");
        }
        Command::Standings {
            tournament,
            metrics,
        } => {
            let metrics = if metrics.is_empty() {
                TeamMetric::DEFAULT.to_vec()
            } else {
                metrics
            };
            print(&TeamStandings::fetch(&tournament, &metrics, &mut conn)?)?;
        }
    }

    Ok(())
}

fn print(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
