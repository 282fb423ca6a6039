use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "order-cli")]
#[command(about = "Command-line client for the order gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080", env = "ORDER_GATEWAY_URL")]
    url: String,

    /// Sent as x-request-id; the gateway generates one when omitted
    #[arg(long)]
    request_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a new order
    Submit {
        symbol: String,
        /// BUY or SELL
        side: String,
        price: f64,
        quantity: i32,
        /// LIMIT or MARKET
        #[arg(long = "type", default_value = "LIMIT")]
        order_type: String,
        #[arg(long)]
        client_id: String,
    },
    /// Show the order book for a symbol
    Book { symbol: String },
    /// Cancel an order
    Cancel {
        order_id: String,
        #[arg(long)]
        client_id: String,
    },
    /// Change price and quantity of an order
    Modify {
        order_id: String,
        new_price: f64,
        new_quantity: i32,
        #[arg(long)]
        client_id: String,
    },
    /// Check gateway status
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match cli.command {
        Commands::Submit {
            symbol,
            side,
            price,
            quantity,
            order_type,
            client_id,
        } => {
            let mut body = Map::new();
            body.insert("symbol".into(), json!(symbol));
            body.insert("side".into(), json!(side));
            body.insert("type".into(), json!(order_type));
            body.insert("price".into(), json!(price));
            body.insert("quantity".into(), json!(quantity));
            body.insert("clientId".into(), json!(client_id));
            client.post(format!("{}/v1/orders", base)).json(&body)
        }
        Commands::Book { symbol } => client.get(format!("{}/v1/orderbook/{}", base, symbol)),
        Commands::Cancel { order_id, client_id } => {
            let mut body = Map::new();
            body.insert("clientId".into(), json!(client_id));
            client
                .post(format!("{}/v1/orders/{}:cancel", base, order_id))
                .json(&body)
        }
        Commands::Modify {
            order_id,
            new_price,
            new_quantity,
            client_id,
        } => {
            let mut body = Map::new();
            body.insert("newPrice".into(), json!(new_price));
            body.insert("newQuantity".into(), json!(new_quantity));
            body.insert("clientId".into(), json!(client_id));
            client
                .patch(format!("{}/v1/orders/{}", base, order_id))
                .json(&body)
        }
        Commands::Health => client.get(format!("{}/health", base)),
    };

    let request = match cli.request_id {
        Some(id) => request.header("x-request-id", id),
        None => request,
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let request_id = res
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
    }
    if let Some(id) = request_id {
        eprintln!("Request ID: {}", id);
    }
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    if !status.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
