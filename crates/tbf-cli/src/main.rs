mod filter;
mod index;
mod templates;

use clap::{Parser, Subcommand};
use tbf_engine::EngineSettings;
use tbf_shopify::ShopifyClient;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tbf-cli")]
#[command(about = "Collection filter engine command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Rebuild the facet index of every collection a template targets
    Index {
        /// Template metaobject GID
        #[arg(long)]
        template: String,

        /// Print the computed facets without writing them
        #[arg(long)]
        dry_run: bool,
    },
    /// Run a storefront filter query against a collection and print the JSON
    Filter {
        /// Collection GID or numeric id
        #[arg(long)]
        collection: String,

        /// Raw query string, e.g. `filter.p.vendor=Acme&page=2`
        #[arg(long, default_value = "")]
        query: String,

        #[arg(long)]
        country: Option<String>,

        #[arg(long)]
        language: Option<String>,
    },
    /// List stored filter templates
    Templates {
        /// Page size per upstream request
        #[arg(long, default_value_t = 50)]
        first: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("tbf-cli: run with --help to list commands");
        return Ok(());
    };

    let config = tbf_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let client = ShopifyClient::from_config(&config)?;
    let settings = EngineSettings::from_config(&config);

    match command {
        Commands::Index { template, dry_run } => {
            index::run_index(&client, &settings, &template, dry_run).await
        }
        Commands::Filter {
            collection,
            query,
            country,
            language,
        } => {
            filter::run_filter(
                &client,
                &settings,
                &collection,
                &query,
                country.as_deref(),
                language.as_deref(),
            )
            .await
        }
        Commands::Templates { first } => templates::run_list_templates(&client, first).await,
    }
}
