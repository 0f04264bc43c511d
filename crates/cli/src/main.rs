mod config;
mod error;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use access::{AccessResult, Account, CreateContext, EntitySnapshot};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::Config;
use error::Result;

const CONFIG_FILE: &str = "entity_access.toml";

/// Exit status for neutral and forbidden results.
const DENIED: u8 = 2;

#[derive(Parser)]
#[command(name = "entity-access")]
#[command(about = "Evaluate entity access decisions against a permission table", long_about = None)]
#[command(version)]
struct Cli {
    /// Permission table and entity type configuration
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an operation on an existing entity
    Check {
        /// Operation name, e.g. "view", "update", "delete"
        #[arg(short, long)]
        operation: String,

        #[command(flatten)]
        entity: EntityArgs,

        #[command(flatten)]
        account: AccountArgs,
    },
    /// Check create access for the entity type
    Create {
        /// Entity type id (defaults to the configured entity type)
        #[arg(short = 't', long)]
        entity_type: Option<String>,

        /// Bundle to create
        #[arg(short, long)]
        bundle: Option<String>,

        /// Create context entries as KEY=VALUE
        #[arg(long = "context", value_parser = parse_context_entry)]
        context: Vec<(String, String)>,

        #[command(flatten)]
        account: AccountArgs,
    },
}

#[derive(Args)]
struct EntityArgs {
    /// Entity type id (defaults to the configured entity type)
    #[arg(short = 't', long)]
    entity_type: Option<String>,

    /// Bundle of the entity
    #[arg(short, long)]
    bundle: Option<String>,

    /// Entity id; omit for an unsaved entity
    #[arg(long)]
    id: Option<String>,

    /// Revision id
    #[arg(long)]
    revision: Option<u64>,

    /// Owner account id; makes the entity ownable
    #[arg(long)]
    owner: Option<u64>,

    /// Entity is ownable but has no owner
    #[arg(long, conflicts_with = "owner")]
    ownable: bool,

    /// Entity is publishable and unpublished
    #[arg(long)]
    unpublished: bool,

    /// Entity is publishable and published
    #[arg(long, conflicts_with = "unpublished")]
    published: bool,
}

#[derive(Args)]
struct AccountArgs {
    /// Acting account id (0 is anonymous)
    #[arg(short, long, default_value = "0")]
    account: u64,

    /// Session roles held by the account
    #[arg(short, long = "role")]
    roles: Vec<String>,
}

impl AccountArgs {
    fn account(&self) -> Account {
        Account::new(self.account).with_roles(self.roles.iter().cloned())
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(result) if result.is_allowed() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(DENIED),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<AccessResult> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    let result = match cli.command {
        Commands::Check {
            operation,
            entity,
            account,
        } => cmd_check(config, &operation, &entity, &account.account())?,
        Commands::Create {
            entity_type,
            bundle,
            context,
            account,
        } => cmd_create(
            config,
            entity_type.as_deref(),
            bundle.as_deref(),
            context.into_iter().collect(),
            &account.account(),
        )?,
    };

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result)
}

fn cmd_check(
    config: Config,
    operation: &str,
    args: &EntityArgs,
    account: &Account,
) -> Result<AccessResult> {
    let handler = config.handler(args.entity_type.as_deref())?;

    let mut entity = EntitySnapshot::new(handler.entity_type_id(), args.bundle.as_deref());
    if let Some(id) = &args.id {
        entity = entity.with_id(id.as_str());
    }
    if let Some(revision) = args.revision {
        entity = entity.with_revision(revision);
    }
    if let Some(owner) = args.owner {
        entity = entity.with_owner(owner);
    } else if args.ownable {
        entity = entity.ownable();
    }
    if args.unpublished {
        entity = entity.unpublished();
    } else if args.published {
        entity = entity.published();
    }

    Ok(handler.check_access(&entity, operation, account)?)
}

fn cmd_create(
    config: Config,
    entity_type: Option<&str>,
    bundle: Option<&str>,
    context: CreateContext,
    account: &Account,
) -> Result<AccessResult> {
    let handler = config.handler(entity_type)?;
    Ok(handler.check_create_access(account, &context, bundle)?)
}

/// The configured file, or an empty permission table when the default file
/// does not exist.
fn load_config(path: &Path) -> Result<Config> {
    if path.exists() || path != Path::new(CONFIG_FILE) {
        Ok(Config::load(path)?)
    } else {
        tracing::debug!("no {CONFIG_FILE} found, using an empty permission table");
        Ok(Config::default())
    }
}

fn parse_context_entry(entry: &str) -> std::result::Result<(String, String), String> {
    entry
        .split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{entry}'"))
}
