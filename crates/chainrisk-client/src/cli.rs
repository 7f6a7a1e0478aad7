use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "chainrisk", version, about = "ChainRisk supply-chain risk client")]
pub(crate) struct Args {
    /// Gateway base URL; overrides the config file and CHAINRISK_API_URL
    #[arg(long, global = true)]
    pub(crate) api_url: Option<String>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Log in and store the access token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored token
    Logout,
    /// Analyze news risk for a country, free text, or both
    Analyze {
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        text: Option<String>,
    },
    /// Model prediction from text or a JSON object of named features
    Predict {
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        text: Option<String>,
        /// e.g. '{"keyword_score": 20, "weather_risk": 3}'
        #[arg(long)]
        features: Option<String>,
    },
    /// Retrain the model
    Train {
        /// Wait for training to finish and print metrics
        #[arg(long, default_value_t = false)]
        wait: bool,
    },
    /// Global risk summary
    Summary,
    /// Risk history for one country, oldest first
    History {
        country: String,
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
    /// Summary, top countries and optionally one country's history
    Dashboard {
        #[arg(long)]
        country: Option<String>,
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
    /// Record a purchase order
    AddOrder {
        order_id: String,
        #[arg(long)]
        country: String,
        #[arg(long)]
        supplier: String,
        #[arg(long)]
        qty: i64,
        #[arg(long)]
        eta: Option<String>,
    },
    /// Recent orders, newest first
    Orders {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Show a shipment, optionally setting its status first
    Shipment {
        shipment_id: String,
        #[arg(long)]
        status: Option<String>,
    },
    /// Show stock for a SKU, optionally adjusting it first
    Stock {
        sku: String,
        #[arg(long, allow_hyphen_values = true)]
        delta: Option<i64>,
    },
}
