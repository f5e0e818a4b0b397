use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use mmcore::catalog::ThunderstoreCatalog;
use mmcore::gateway::ProcessGateway;
use mmcore::query::{QueryArgs, QueryKind};
use mmcore::settings::Settings;
use mmcore::storage::{JsonFileStorage, Storage};
use mmcore::theme::{ColorCategory, ColorSetting};
use mmcore::{AppState, Orchestrator};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
usage: mm-state [--backend <cmd>] [--storage <path>] [--catalog <url>] <command>

commands:
  games                          list games, marking the active one
  use-game <id>                  switch the active game
  favorite <id>                  toggle a game's favourite flag
  profiles                       list profiles of the active game
  use-profile <index>            switch the active profile
  categories                     list registry categories of the active game
  query <mod|profile>            show a persisted query
  search <mod|profile> <term>    set a query's search term
  reset-query <mod|profile>      restore a query's defaults
  colors                         show colour preferences
  color <accent|primary> <value> set a palette name, or #rrggbb for custom";

#[derive(Debug, PartialEq)]
enum Command {
    Games,
    UseGame(String),
    Favorite(String),
    Profiles,
    UseProfile(usize),
    Categories,
    Query(QueryKind),
    Search(QueryKind, String),
    ResetQuery(QueryKind),
    Colors,
    SetColor(ColorCategory, ColorSetting),
}

impl Command {
    /// Query and colour commands only touch durable storage.
    fn needs_backend(&self) -> bool {
        !matches!(
            self,
            Command::Query(_)
                | Command::Search(..)
                | Command::ResetQuery(_)
                | Command::Colors
                | Command::SetColor(..)
        )
    }
}

#[derive(Debug, Default, PartialEq)]
struct Overrides {
    backend: Option<Vec<String>>,
    storage: Option<PathBuf>,
    catalog: Option<String>,
}

impl Overrides {
    fn apply(self, settings: &mut Settings) {
        if let Some(backend) = self.backend {
            settings.backend_command = backend;
        }
        if let Some(storage) = self.storage {
            settings.storage_path = storage;
        }
        if let Some(catalog) = self.catalog {
            settings.catalog_url = catalog;
        }
    }
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<(Overrides, Command)> {
    let mut overrides = Overrides::default();
    let mut args = args.into_iter().peekable();

    while let Some(flag) = args.next_if(|a| a.starts_with("--")) {
        let value = args
            .next()
            .ok_or_else(|| anyhow!("{flag} needs a value"))?;
        match flag.as_str() {
            "--backend" => {
                overrides.backend = Some(value.split_whitespace().map(String::from).collect())
            }
            "--storage" => overrides.storage = Some(PathBuf::from(value)),
            "--catalog" => overrides.catalog = Some(value),
            other => bail!("unknown option {other}"),
        }
    }

    let name = args.next().ok_or_else(|| anyhow!("missing command"))?;
    let rest: Vec<String> = args.collect();
    let arg = |i: usize, what: &str| -> Result<&str> {
        rest.get(i)
            .map(String::as_str)
            .ok_or_else(|| anyhow!("{name} needs {what}"))
    };
    let kind = |i: usize| -> Result<QueryKind> {
        arg(i, "a query kind")?
            .parse()
            .map_err(|e: String| anyhow!(e))
    };

    let command = match name.as_str() {
        "games" => Command::Games,
        "use-game" => Command::UseGame(arg(0, "a game id")?.to_string()),
        "favorite" => Command::Favorite(arg(0, "a game id")?.to_string()),
        "profiles" => Command::Profiles,
        "use-profile" => {
            let raw = arg(0, "a profile index")?;
            let index = raw
                .parse()
                .with_context(|| format!("invalid profile index '{raw}'"))?;
            Command::UseProfile(index)
        }
        "categories" => Command::Categories,
        "query" => Command::Query(kind(0)?),
        "search" => Command::Search(kind(0)?, rest.get(1..).unwrap_or_default().join(" ")),
        "reset-query" => Command::ResetQuery(kind(0)?),
        "colors" => Command::Colors,
        "color" => {
            let category = match arg(0, "a colour category")? {
                "accent" => ColorCategory::Accent,
                "primary" => ColorCategory::Primary,
                other => bail!("unknown colour category '{other}'"),
            };
            let value = arg(1, "a colour")?;
            let setting = if value.starts_with('#') {
                ColorSetting::Custom {
                    hex: value.to_string(),
                }
            } else {
                ColorSetting::Default {
                    name: value.to_string(),
                }
            };
            Command::SetColor(category, setting)
        }
        other => bail!("unknown command '{other}'"),
    };
    Ok((overrides, command))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (overrides, command) = match parse_args(std::env::args().skip(1)) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("error: {e}\n\n{USAGE}");
            std::process::exit(2);
        }
    };

    let mut settings = Settings::load()?;
    overrides.apply(&mut settings);

    let storage: Arc<dyn Storage> = Arc::new(
        JsonFileStorage::open(&settings.storage_path)
            .with_context(|| format!("Failed to open storage at {:?}", settings.storage_path))?,
    );
    let state = AppState::new(storage);

    if !command.needs_backend() {
        run_local(&state, command);
        return Ok(());
    }

    if settings.backend_command.is_empty() {
        bail!("No backend configured; set backendCommand in settings.json or pass --backend");
    }
    let gateway = ProcessGateway::spawn(&settings.backend_command)
        .with_context(|| format!("Failed to start backend {:?}", settings.backend_command))?;
    let catalog = ThunderstoreCatalog::new(settings.catalog_url.clone())?;
    let orchestrator = Orchestrator::new(Arc::new(gateway), Arc::new(catalog), state);

    orchestrator.init().await.context("Initial load failed")?;
    run_remote(&orchestrator, command).await
}

async fn run_remote(orchestrator: &Orchestrator, command: Command) -> Result<()> {
    match command {
        Command::Games => print_games(orchestrator.state()),
        Command::UseGame(id) => {
            orchestrator.set_active_game(&id).await?;
            print_games(orchestrator.state());
        }
        Command::Favorite(id) => {
            orchestrator.favorite_game(&id).await?;
            print_games(orchestrator.state());
        }
        Command::Profiles => print_profiles(orchestrator.state()),
        Command::UseProfile(index) => {
            orchestrator.set_active_profile(index).await?;
            print_profiles(orchestrator.state());
        }
        Command::Categories => {
            for category in orchestrator.state().categories().get() {
                println!("{:>6}  {}", category.id, category.name);
            }
        }
        local => run_local(orchestrator.state(), local),
    }
    Ok(())
}

fn run_local(state: &AppState, command: Command) {
    match command {
        Command::Query(kind) => print_query(&state.query(kind).get()),
        Command::Search(kind, term) => {
            let store = state.query(kind);
            store.update(|q| q.search_term = term);
            print_query(&store.get());
        }
        Command::ResetQuery(kind) => {
            let store = state.query(kind);
            store.reset();
            print_query(&store.get());
        }
        Command::Colors => {
            println!("accent   {}", state.colors().accent.get());
            println!("primary  {}", state.colors().primary.get());
        }
        Command::SetColor(category, setting) => {
            state.colors().get(category).set(setting);
            println!("accent   {}", state.colors().accent.get());
            println!("primary  {}", state.colors().primary.get());
        }
        other => tracing::error!("{other:?} needs the backend"),
    }
}

fn print_games(state: &AppState) {
    let active = state.active_game_id();
    for game in state.games().get() {
        let marker = if active.as_deref() == Some(game.id.as_str()) { '*' } else { ' ' };
        let favorite = if game.favorite { "  [favorite]" } else { "" };
        println!("{marker} {:<24} {}{favorite}", game.id, game.display_name);
    }
}

fn print_profiles(state: &AppState) {
    let active = state.active_profile_index().get();
    for (i, profile) in state.profiles().get().iter().enumerate() {
        let marker = if i == active { '*' } else { ' ' };
        println!("{marker} {i:>2}  {:<24} {} mods", profile.name, profile.mod_count);
    }
}

fn print_query(query: &QueryArgs) {
    println!("search      {:?}", query.search_term);
    println!("sort        {:?} {:?}", query.sort_by, query.sort_order);
    println!("max count   {}", query.max_count);
    println!("include     {}", query.include_categories.join(", "));
    println!("exclude     {}", query.exclude_categories.join(", "));
    println!(
        "flags       nsfw={} deprecated={} disabled={}",
        query.include_nsfw, query.include_deprecated, query.include_disabled
    );
}
