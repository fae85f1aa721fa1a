//! Storeops CLI - Search, export, mine and bulk-edit admin API data.
//!
//! # Usage
//!
//! ```bash
//! # Search profiles whose email contains a value, merge pages into one file
//! storeops --env staging search-profiles -f email --value gmail.com --consolidate --csv
//!
//! # Delete the products listed in a CSV, five at a time
//! storeops --env prod delete-products ids.csv -c 5
//!
//! # Filter a saved result by a typed condition
//! storeops mine-result profiles_20240101_consolidated.json -f age -c ">=30"
//!
//! # List all orders into one CSV, resuming after failures
//! storeops --env prod list-orders --columns id,status,customer_info.email
//! ```
//!
//! # Commands
//!
//! - `search-profiles` / `search-products` - Paginated search to page files
//! - `delete-products` - Bulk delete by ID list
//! - `search-orders` - Bulk fetch orders by ID list
//! - `count-orders` - Number of matching orders
//! - `oldest-order` - Earliest created order
//! - `list-orders` - Resumable full listing to CSV
//! - `mine-result` - Typed filtering of a saved record set
//! - `auth` - Check credentials

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use storeops_admin::api::SearchResource;
use storeops_admin::bulk::DEFAULT_CONCURRENCY;
use storeops_admin::consolidate::DEFAULT_ID_PREFIX;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "storeops")]
#[command(author, version, about = "Storeops admin API tools")]
struct Cli {
    /// Target environment (reads `STOREOPS_<ENV>_*` variables)
    #[arg(short, long, global = true, env = "STOREOPS_ENV", default_value = "dev")]
    env: String,

    /// Directory for responses, results and reports
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "STOREOPS_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search profiles by field contents
    SearchProfiles(SearchArgs),
    /// Search products by field contents
    SearchProducts(SearchArgs),
    /// Delete the products listed in a file
    DeleteProducts {
        /// File with one product ID per line (first CSV column)
        input: PathBuf,

        /// Concurrent requests per batch (1-10)
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,

        /// Only IDs with this prefix are deleted
        #[arg(long, default_value = DEFAULT_ID_PREFIX)]
        prefix: String,
    },
    /// Fetch the orders listed in a file
    SearchOrders {
        /// File with one order ID per line (first CSV column)
        input: PathBuf,

        /// Concurrent requests per batch (1-10)
        #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,

        /// Comma-separated fields to request
        #[arg(long)]
        fields: Option<String>,
    },
    /// Count orders matching a query
    CountOrders {
        /// Query in the API's query language
        #[arg(short, long)]
        query: Option<String>,
    },
    /// Show the earliest created order
    OldestOrder,
    /// List orders to CSV, resuming from a checkpoint when one exists
    ListOrders {
        /// Comma-separated output columns (dotted paths allowed)
        #[arg(long, default_value = "id,creation_date,status")]
        columns: String,

        /// Query in the API's query language
        #[arg(short, long)]
        query: Option<String>,

        /// Value of the `queryFormat` parameter
        #[arg(long)]
        query_format: Option<String>,

        /// Sort field
        #[arg(long, default_value = "creation_date")]
        sort_by: String,

        /// Sort descending instead of ascending
        #[arg(long)]
        desc: bool,
    },
    /// Filter a saved record set by a typed condition
    MineResult {
        /// Record set file (as given, or inside the output directory)
        source: PathBuf,

        /// Field to filter on
        #[arg(short, long)]
        field: String,

        /// Condition, interpreted by the field's inferred type
        #[arg(short, long, allow_hyphen_values = true)]
        condition: String,
    },
    /// Exchange credentials and report the token expiry
    Auth,
}

#[derive(Args)]
struct SearchArgs {
    /// Field to search
    #[arg(short, long)]
    field: String,

    /// Value the field must contain
    #[arg(long)]
    value: String,

    /// Comma-separated fields to return
    #[arg(long)]
    fields: Option<String>,

    /// Merge the page files into one file
    #[arg(long)]
    consolidate: bool,

    /// Keep only records whose ID has the product prefix (with --consolidate)
    #[arg(long, requires = "consolidate")]
    id_prefix_only: bool,

    /// Also write a CSV of the merged records (with --consolidate)
    #[arg(long, requires = "consolidate")]
    csv: bool,
}

#[tokio::main]
async fn main() {
    // Load .env before parsing so STOREOPS_ENV can come from it
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing
    let default_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let json_layer = cli
        .log_json
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!cli.log_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let env = cli.env;
    let output_dir = cli.output_dir;

    match cli.command {
        Commands::SearchProfiles(args) => {
            let session = commands::Session::open(&env, output_dir)?;
            commands::search::run(&session, SearchResource::Profiles, &args.into()).await?;
        }
        Commands::SearchProducts(args) => {
            let session = commands::Session::open(&env, output_dir)?;
            commands::search::run(&session, SearchResource::Products, &args.into()).await?;
        }
        Commands::DeleteProducts {
            input,
            concurrency,
            prefix,
        } => {
            let session = commands::Session::open(&env, output_dir)?;
            commands::products::delete(&session, &input, concurrency, prefix).await?;
        }
        Commands::SearchOrders {
            input,
            concurrency,
            fields,
        } => {
            let session = commands::Session::open(&env, output_dir)?;
            commands::orders::fetch(&session, &input, concurrency, fields.as_deref()).await?;
        }
        Commands::CountOrders { query } => {
            let session = commands::Session::open(&env, output_dir)?;
            commands::orders::count(&session, query).await?;
        }
        Commands::OldestOrder => {
            let session = commands::Session::open(&env, output_dir)?;
            commands::orders::oldest(&session).await?;
        }
        Commands::ListOrders {
            columns,
            query,
            query_format,
            sort_by,
            desc,
        } => {
            let session = commands::Session::open(&env, output_dir)?;
            let listing = commands::orders::ListArgs {
                columns,
                query,
                query_format,
                sort_by,
                desc,
            };
            commands::orders::list(&session, listing).await?;
        }
        Commands::MineResult {
            source,
            field,
            condition,
        } => {
            commands::mine::run(output_dir, &source, &field, &condition).await?;
        }
        Commands::Auth => {
            let session = commands::Session::open(&env, output_dir)?;
            commands::auth::check(&session).await?;
        }
    }
    Ok(())
}

impl From<SearchArgs> for commands::search::SearchArgs {
    fn from(args: SearchArgs) -> Self {
        Self {
            field: args.field,
            value: args.value,
            fields: args.fields,
            consolidate: args.consolidate,
            id_prefix_only: args.id_prefix_only,
            csv: args.csv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_mine_with_operator_condition() {
        let cli = Cli::try_parse_from([
            "storeops",
            "mine-result",
            "set.json",
            "-f",
            "amount",
            "-c",
            "<-5",
        ]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::MineResult { condition, .. }) if condition == "<-5"
        ));
    }

    #[test]
    fn test_csv_requires_consolidate() {
        let cli = Cli::try_parse_from(["storeops", "search-products", "-f", "name", "--value", "tea", "--csv"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_global_env_after_subcommand() {
        let cli = Cli::try_parse_from(["storeops", "count-orders", "--env", "prod"]);
        assert!(matches!(cli, Ok(c) if c.env == "prod"));
    }
}
