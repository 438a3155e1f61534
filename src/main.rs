use std::env;

use anyhow::{Context, Result};
use bat::PrettyPrinter;
use clap::Parser;
use cliclack::{input, spinner};
use console::style;

use cambio::agent::{Agent, DEFAULT_MAX_TURNS};
use cambio::providers::configs::groq::{GroqProviderConfig, DEFAULT_HOST, DEFAULT_MODEL};
use cambio::providers::groq::GroqProvider;
use cambio::providers::types::message::Message;
use cambio::tools::{convert, rates, ToolRegistry};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Groq API key (can also be set via GROQ_API_KEY environment variable)
    #[arg(short, long)]
    api_key: Option<String>,

    /// Model to use (falls back to GROQ_MODEL, then the default)
    #[arg(short, long)]
    model: Option<String>,

    /// exchangerate-api.com key (can also be set via EXCHANGE_RATE_API_KEY)
    #[arg(long)]
    rate_api_key: Option<String>,

    /// Maximum model turns before a request is abandoned
    #[arg(long, default_value_t = DEFAULT_MAX_TURNS)]
    max_turns: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let api_key = cli
        .api_key
        .or_else(|| env::var("GROQ_API_KEY").ok())
        .context("API key must be provided via --api-key or GROQ_API_KEY environment variable")?;
    let host = env::var("GROQ_API_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
    let model = cli
        .model
        .or_else(|| env::var("GROQ_MODEL").ok())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let provider = GroqProvider::new(GroqProviderConfig::new(api_key, host, model))?;

    let rate_client = match cli.rate_api_key {
        Some(key) => rates::RateClient::new(
            key,
            env::var("EXCHANGE_RATE_API_HOST")
                .unwrap_or_else(|_| rates::DEFAULT_HOST.to_string()),
        )?,
        None => rates::RateClient::from_env()?,
    };

    let mut registry = ToolRegistry::new();
    registry.register(rates::tool(rate_client))?;
    registry.register(convert::tool())?;

    let agent = Agent::new(Box::new(provider), registry).with_max_turns(cli.max_turns);

    println!(
        "Currency converter {}",
        style("- type \"exit\" as the base currency to end the session").dim()
    );
    println!("\n");

    loop {
        let base: String = input("Base currency:")
            .placeholder("INR")
            .validate(|value: &String| validate_base(value))
            .interact()?;

        if base.trim().eq_ignore_ascii_case("exit") {
            break;
        }
        let base = base.trim().to_uppercase();

        let base_for_target = base.clone();
        let target: String = input("Target currency:")
            .placeholder("USD")
            .validate(move |value: &String| validate_target(value, &base_for_target))
            .interact()?;
        let target = target.trim().to_uppercase();

        let amount: String = input("Amount to convert:")
            .placeholder("10")
            .validate(|value: &String| match value.trim().parse::<f64>() {
                Ok(amount) if amount.is_finite() && amount >= 0.0 => Ok(()),
                Ok(_) => Err("Enter a non-negative amount"),
                Err(_) => Err("Enter a number"),
            })
            .interact()?;
        let amount: f64 = amount.trim().parse().expect("validated above");

        let instruction = format!(
            "Please fetch the conversion rate between {base} and {target}, \
             and then convert {amount} {base} to {target} using that rate."
        );

        let spin = spinner();
        spin.start("fetching the rate and converting");

        let result = agent.reply(&[Message::user(&instruction)?]);

        spin.stop("");

        match result {
            Ok(reply) => {
                let answer = reply.last().map(|m| m.text()).unwrap_or_default();
                render(&answer);
            }
            Err(e) => {
                eprintln!("{} {}", style("error:").red().bold(), e);
            }
        }
        println!("\n");
    }
    Ok(())
}

fn validate_code(value: &str) -> Result<(), &'static str> {
    let code = value.trim();
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err("Enter a currency code like INR or USD");
    }
    Ok(())
}

/// The base prompt doubles as the session control: "exit" ends it.
fn validate_base(value: &str) -> Result<(), &'static str> {
    if value.trim().eq_ignore_ascii_case("exit") {
        return Ok(());
    }
    validate_code(value)
}

/// The target prompt is only ever a currency code; "exit" here is a stray
/// quit attempt, not a code to send upstream.
fn validate_target(value: &str, base: &str) -> Result<(), &'static str> {
    if value.trim().eq_ignore_ascii_case("exit") {
        return Err("Enter a currency code like INR or USD");
    }
    validate_code(value)?;
    if value.trim().eq_ignore_ascii_case(base) {
        return Err("Base and target currencies must differ");
    }
    Ok(())
}

fn render(content: &str) {
    PrettyPrinter::new()
        .input_from_bytes(content.as_bytes())
        .language("markdown")
        .print()
        .unwrap();
}
