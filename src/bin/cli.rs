//! Meal Hat CLI
//!
//! Command-line client for a running Meal Hat server:
//! - Log in and keep the session token in `MEALHAT_TOKEN`
//! - Add meals and draw them for the coming days
//! - Read and tick off the shopping list
//! - Create, join and switch meal hats

use anyhow::{bail, Context};
use chrono::{Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mealhat")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Draw meals from the hat and shop for them")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8090", global = true, env = "MEALHAT_URL")]
    pub api_url: String,

    /// Session token from `login`
    #[arg(long, global = true, env = "MEALHAT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and print a session token
    Login {
        /// Google ID token, or an email address when the server runs the static provider
        credential: String,
    },

    /// List the meals in the hat
    Meals,

    /// Add a meal to the hat
    AddMeal {
        title: String,
        /// Minimum days between two draws of this meal
        #[arg(short, long, default_value = "7")]
        every: u32,
        /// Ingredient as name[:quantity[:units]]; repeatable
        #[arg(short, long)]
        ingredient: Vec<String>,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Draw meals for the open days in a range
    Draw {
        /// First day (default: today)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Number of days
        #[arg(short, long, default_value = "7")]
        days: i64,
    },

    /// Show drawn meals
    Schedule {
        /// Show every drawn meal instead of the upcoming ones
        #[arg(long)]
        history: bool,
    },

    /// Show the shopping list
    List {
        /// First day of the window (default: today)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day of the window (default: six days after --from)
        #[arg(long)]
        to: Option<NaiveDate>,
        /// Include purchased items
        #[arg(short, long)]
        all: bool,
        /// Write the list as CSV to this file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Toggle an entry's purchased flag
    Buy {
        /// Entry id as shown by `list`
        id: String,
    },

    /// Add an item to the shopping list
    AddItem {
        name: String,
        #[arg(default_value = "1")]
        quantity: f64,
        #[arg(short, long)]
        units: Option<String>,
        #[arg(short, long)]
        aisle: Option<u32>,
    },

    /// List meal hats, or create one
    Hats {
        /// Create a hat with this name
        #[arg(long)]
        create: Option<String>,
    },

    /// Join a meal hat by its shared name
    Join { name: String },

    /// Make another household active
    Switch { key: String },

    /// Show server status
    Status,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Thin wrapper over the REST API
struct ApiClient {
    client: reqwest::Client,
    base: String,
    token: Option<String>,
}

impl ApiClient {
    fn new(base: &str, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_string(),
            token,
        }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> anyhow::Result<reqwest::RequestBuilder> {
        let builder = self
            .client
            .request(method, format!("{}/api/v1{}", self.base, path));
        match &self.token {
            Some(token) => Ok(builder.bearer_auth(token)),
            None if path.starts_with("/auth/") => Ok(builder),
            None => bail!("Not logged in. Run `mealhat login` and export MEALHAT_TOKEN"),
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> anyhow::Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .with_context(|| format!("Cannot connect to Meal Hat API at {}", self.base))?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body["error"]["message"].as_str().unwrap_or("request failed");
        bail!("{} ({})", message, status)
    }

    async fn get(&self, path: &str) -> anyhow::Result<Value> {
        let builder = self.request(reqwest::Method::GET, path)?;
        Ok(self.send(builder).await?.json().await?)
    }

    async fn post(&self, path: &str, body: Value) -> anyhow::Result<Value> {
        let builder = self.request(reqwest::Method::POST, path)?.json(&body);
        let response = self.send(builder).await?;
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        Ok(response.json().await?)
    }

    async fn text(&self, path: &str) -> anyhow::Result<String> {
        let builder = self.request(reqwest::Method::GET, path)?;
        Ok(self.send(builder).await?.text().await?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let api = ApiClient::new(&cli.api_url, cli.token.clone());
    let as_json = cli.format == "json";

    match cli.command {
        Commands::Login { credential } => {
            let session = api
                .post("/auth/login", json!({ "credential": credential }))
                .await?;
            let token = session["token"].as_str().unwrap_or_default();

            println!(
                "Logged in as {} (household {})",
                session["email"].as_str().unwrap_or("-"),
                session["household"].as_str().unwrap_or("-")
            );
            println!();
            println!("export MEALHAT_TOKEN={}", token);
        }

        Commands::Meals => {
            let data = api.get("/meals").await?;
            if as_json {
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(());
            }

            let meals = data["meals"].as_array().cloned().unwrap_or_default();
            if meals.is_empty() {
                println!("The hat is empty.");
                println!();
                println!("Add your first meal with:");
                println!("  mealhat add-meal \"Tacos\" -i tortillas:8 -i \"ground beef:1:lb\"");
                return Ok(());
            }

            println!("{:<28} {:<8} {:<12} {}", "Title", "Every", "Last drawn", "ID");
            println!("{}", "-".repeat(72));
            for meal in meals {
                println!(
                    "{:<28} {:<8} {:<12} {}",
                    meal["title"].as_str().unwrap_or("-"),
                    format!("{}d", meal["frequencyDays"].as_u64().unwrap_or(0)),
                    meal["lastDrawn"].as_str().unwrap_or("never"),
                    meal["id"].as_str().unwrap_or("-")
                );
            }
        }

        Commands::AddMeal {
            title,
            every,
            ingredient,
            notes,
        } => {
            let ingredients = ingredient
                .iter()
                .map(|raw| parse_ingredient(raw))
                .collect::<anyhow::Result<Vec<_>>>()?;

            let meal = api
                .post(
                    "/meals",
                    json!({
                        "title": title,
                        "frequencyDays": every,
                        "ingredients": ingredients,
                        "notes": notes,
                    }),
                )
                .await?;
            println!(
                "Added {} ({} ingredients)",
                meal["title"].as_str().unwrap_or(&title),
                ingredients.len()
            );
        }

        Commands::Draw { from, days } => {
            if days < 1 {
                bail!("--days must be at least 1");
            }
            let start = from.unwrap_or_else(today);
            let end = start + Duration::days(days - 1);

            let outcome = api
                .post("/draw", json!({ "start": start, "end": end }))
                .await?;
            if as_json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
                return Ok(());
            }

            print_schedule(outcome["drawn"].as_array().map(Vec::as_slice).unwrap_or_default());
            for date in outcome["unfilled"].as_array().into_iter().flatten() {
                println!("{}  (nothing eligible)", date.as_str().unwrap_or("-"));
            }
            let skipped = outcome["skipped"].as_array().map(Vec::len).unwrap_or(0);
            if skipped > 0 {
                println!();
                println!("{} day(s) already had a meal", skipped);
            }
        }

        Commands::Schedule { history } => {
            let view = if history { "history" } else { "future" };
            let data = api.get(&format!("/drawn-meals?view={}", view)).await?;
            if as_json {
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(());
            }
            let meals = data["meals"].as_array().cloned().unwrap_or_default();
            if meals.is_empty() {
                println!("Nothing drawn yet. Try `mealhat draw`.");
            } else {
                print_schedule(&meals);
            }
        }

        Commands::List { from, to, all, csv } => {
            let mut query = String::new();
            if let Some(from) = from {
                query.push_str(&format!("&start={}", from));
            }
            if let Some(to) = to {
                query.push_str(&format!("&end={}", to));
            }
            if all {
                query.push_str("&include_purchased=true");
            }
            let query = query.replacen('&', "?", 1);

            if let Some(path) = csv {
                let data = api.text(&format!("/shopping-list/export{}", query)).await?;
                std::fs::write(&path, data)?;
                println!("Exported to {:?}", path);
                return Ok(());
            }

            let data = api.get(&format!("/shopping-list{}", query)).await?;
            if as_json {
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(());
            }
            print_shopping_list(&data);
        }

        Commands::Buy { id } => {
            let entry = api
                .post(
                    &format!("/shopping-list/{}/toggle", urlencoding::encode(&id)),
                    Value::Null,
                )
                .await?;
            let state = if entry["purchased"].as_bool().unwrap_or(false) {
                "purchased"
            } else {
                "not purchased"
            };
            println!("{}: {}", entry["name"].as_str().unwrap_or(&id), state);
        }

        Commands::AddItem {
            name,
            quantity,
            units,
            aisle,
        } => {
            let entry = api
                .post(
                    "/shopping-list",
                    json!({ "name": name, "quantity": quantity, "units": units, "aisle": aisle }),
                )
                .await?;
            println!(
                "Added {} {}",
                format_quantity(&entry),
                entry["name"].as_str().unwrap_or(&name)
            );
        }

        Commands::Hats { create } => {
            if let Some(name) = create {
                let hat = api.post("/meal-hats", json!({ "name": name })).await?;
                println!(
                    "Created {}. Others can join with: mealhat join {}",
                    hat["name"].as_str().unwrap_or(&name),
                    hat["key"].as_str().unwrap_or(&name)
                );
                return Ok(());
            }

            let data = api.get("/meal-hats").await?;
            if as_json {
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(());
            }
            let active = data["active"].as_str().unwrap_or_default();
            for hat in data["hats"].as_array().into_iter().flatten() {
                let key = hat["key"].as_str().unwrap_or("-");
                let marker = if key == active { "*" } else { " " };
                println!("{} {:<30} {}", marker, hat["name"].as_str().unwrap_or("-"), key);
            }
        }

        Commands::Join { name } => {
            let hat = api
                .post(
                    &format!("/meal-hats/{}/join", urlencoding::encode(&name)),
                    Value::Null,
                )
                .await?;
            println!(
                "Joined {}. Switch to it with: mealhat switch {}",
                hat["name"].as_str().unwrap_or(&name),
                hat["key"].as_str().unwrap_or(&name)
            );
        }

        Commands::Switch { key } => {
            let result = api.post("/meal-hats/switch", json!({ "key": key })).await?;
            if result["switched"].as_bool().unwrap_or(false) {
                println!("Now planning for {}", key);
            } else {
                println!("{} is already active", key);
            }
        }

        Commands::Status => {
            let response = reqwest::get(format!("{}/health", api.base))
                .await
                .with_context(|| format!("Cannot connect to Meal Hat API at {}", api.base))?;
            if !response.status().is_success() {
                bail!("API returned error: {}", response.status());
            }
            let health: Value = response.json().await?;

            println!("Meal Hat v{}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("API Status: {}", health["status"].as_str().unwrap_or("unknown"));
            println!("Sessions: {}", health["sessions"].as_u64().unwrap_or(0));
            if let Some(uptime) = health["uptime_seconds"].as_u64() {
                println!("Uptime: {}", format_duration(uptime));
            }
        }

        Commands::Config { output } => {
            let config = mealhat::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Parse `name[:quantity[:units]]`
fn parse_ingredient(raw: &str) -> anyhow::Result<Value> {
    let mut parts = raw.splitn(3, ':').map(str::trim);
    let name = parts.next().unwrap_or_default();
    if name.is_empty() {
        bail!("Ingredient name is empty: '{}'", raw);
    }

    let mut ingredient = json!({ "name": name });
    if let Some(quantity) = parts.next().filter(|q| !q.is_empty()) {
        let quantity: f64 = quantity
            .parse()
            .with_context(|| format!("Invalid quantity in '{}'", raw))?;
        ingredient["quantity"] = json!(quantity);
    }
    if let Some(units) = parts.next().filter(|u| !u.is_empty()) {
        ingredient["units"] = json!(units);
    }
    Ok(ingredient)
}

fn format_quantity(entry: &Value) -> String {
    let quantity = entry["quantity"].as_f64().unwrap_or(1.0);
    let quantity = if quantity.fract() == 0.0 {
        format!("{}", quantity as i64)
    } else {
        format!("{:.2}", quantity)
    };
    match entry["units"].as_str() {
        Some(units) => format!("{} {}", quantity, units),
        None => quantity,
    }
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

fn print_schedule(meals: &[Value]) {
    for meal in meals {
        println!(
            "{:<12} {}",
            meal["assignedDate"].as_str().unwrap_or("-"),
            meal["title"].as_str().unwrap_or("(deleted meal)")
        );
    }
}

fn print_shopping_list(data: &Value) {
    let entries = data["entries"].as_array().cloned().unwrap_or_default();
    println!(
        "Shopping list {} to {}",
        data["start"].as_str().unwrap_or("-"),
        data["end"].as_str().unwrap_or("-")
    );
    println!();

    if entries.is_empty() {
        println!("Nothing to buy.");
        return;
    }

    println!("{:<6} {:<3} {:<24} {:<12} {}", "Aisle", "", "Item", "Quantity", "ID");
    println!("{}", "-".repeat(72));
    for entry in &entries {
        let aisle = entry["aisle"]
            .as_u64()
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string());
        let check = if entry["purchased"].as_bool().unwrap_or(false) {
            "[x]"
        } else {
            "[ ]"
        };
        println!(
            "{:<6} {:<3} {:<24} {:<12} {}",
            aisle,
            check,
            entry["name"].as_str().unwrap_or("-"),
            format_quantity(entry),
            entry["id"].as_str().unwrap_or("-")
        );
    }
    println!();
    println!("{} item(s) left to buy", data["unpurchased"].as_u64().unwrap_or(0));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ingredient() {
        assert_eq!(parse_ingredient("eggs").unwrap(), json!({"name": "eggs"}));
        assert_eq!(
            parse_ingredient("ground beef:1.5:lb").unwrap(),
            json!({"name": "ground beef", "quantity": 1.5, "units": "lb"})
        );
        assert_eq!(
            parse_ingredient("rice::cups").unwrap(),
            json!({"name": "rice", "units": "cups"})
        );
        assert!(parse_ingredient(":2").is_err());
        assert!(parse_ingredient("milk:lots").is_err());
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(&json!({"quantity": 2.0, "units": "lb"})), "2 lb");
        assert_eq!(format_quantity(&json!({"quantity": 0.5})), "0.50");
        assert_eq!(format_quantity(&json!({})), "1");
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["mealhat", "--token", "t", "draw", "--days", "3"]).unwrap();
        assert_eq!(cli.token.as_deref(), Some("t"));
        assert!(matches!(cli.command, Commands::Draw { days: 3, from: None }));
    }
}
