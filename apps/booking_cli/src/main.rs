use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use client_core::{
    format::{format_currency, format_phone},
    load_settings,
    pricing::{parse_booking_date, parse_time_of_day},
    BookingConfirmation, BookingFlow, HttpBookingApi,
};
use shared::domain::{Field, FieldId};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Browse sports fields and book a slot")]
struct Cli {
    /// Booking service base url, e.g. http://localhost:5000/api/public
    #[arg(long)]
    api_url: Option<String>,
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: Option<u64>,
    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the field catalog.
    Fields {
        #[arg(long)]
        search: Option<String>,
    },
    /// List fields that are free for a date and time window.
    Available {
        #[arg(long, value_parser = parse_date_arg)]
        date: NaiveDate,
        #[arg(long, value_parser = parse_time_arg)]
        start: NaiveTime,
        #[arg(long, value_parser = parse_time_arg)]
        end: NaiveTime,
    },
    /// Book a field.
    Book {
        #[arg(long)]
        field_id: FieldId,
        #[arg(long, value_parser = parse_date_arg)]
        date: NaiveDate,
        #[arg(long, value_parser = parse_time_arg)]
        start: NaiveTime,
        #[arg(long, value_parser = parse_time_arg)]
        end: NaiveTime,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        notes: Option<String>,
    },
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate, String> {
    parse_booking_date(raw).ok_or_else(|| format!("expected YYYY-MM-DD, got '{raw}'"))
}

fn parse_time_arg(raw: &str) -> Result<NaiveTime, String> {
    parse_time_of_day(raw).ok_or_else(|| format!("expected HH:MM, got '{raw}'"))
}

fn print_fields(fields: &[Field], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(fields)?);
        return Ok(());
    }
    if fields.is_empty() {
        println!("No fields match.");
    }
    for field in fields {
        let status = if field.is_active { "" } else { " [inactive]" };
        let estimate = field
            .estimated_price
            .map(|price| format!(" | estimated {}", format_currency(price)))
            .unwrap_or_default();
        println!(
            "#{} {} | {} | {} | {}/h{estimate}{status}",
            field.id,
            field.name,
            field.location,
            field.field_type,
            format_currency(field.price_per_hour),
        );
    }
    Ok(())
}

fn print_confirmation(confirmation: &BookingConfirmation) {
    match &confirmation.booking_id {
        Some(id) => println!("Booking #{id} created"),
        None => println!("Booking created"),
    }
    println!("  field:    {} ({})", confirmation.field.name, confirmation.field.location);
    println!(
        "  when:     {} {}-{} ({} h)",
        confirmation.booking_date,
        confirmation.start_time.format("%H:%M"),
        confirmation.end_time.format("%H:%M"),
        confirmation.duration_hours,
    );
    println!("  customer: {}", confirmation.customer_name);
    println!("  phone:    {}", format_phone(&confirmation.customer_phone));
    if let Some(notes) = &confirmation.notes {
        println!("  notes:    {notes}");
    }
    println!("  total:    {}", format_currency(confirmation.total_price));
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(api_url) = cli.api_url {
        settings.api_base_url = api_url;
    }
    if let Some(timeout_secs) = cli.timeout_secs {
        settings.request_timeout_secs = timeout_secs;
    }
    let api = HttpBookingApi::new(&settings)?;
    info!(base_url = api.base_url(), "using booking service");
    let flow = BookingFlow::new(Arc::new(api));

    match cli.command {
        Command::Fields { search } => {
            flow.load_fields().await;
            if let Some(message) = flow.last_error().await {
                bail!(message);
            }
            if let Some(term) = search {
                flow.set_search_term(term).await;
            }
            print_fields(&flow.visible_fields().await, cli.json)?;
        }
        Command::Available { date, start, end } => {
            let fields = flow
                .search_available(Some(date), Some(start), Some(end))
                .await?;
            if let Some(message) = flow.last_error().await {
                info!(%message, "availability search");
            }
            print_fields(&fields, cli.json)?;
        }
        Command::Book {
            field_id,
            date,
            start,
            end,
            phone,
            name,
            notes,
        } => {
            flow.load_fields().await;
            if let Some(message) = flow.last_error().await {
                bail!(message);
            }
            let field = flow
                .find_field(field_id.clone())
                .await
                .with_context(|| format!("field #{field_id} is not in the catalog"))?;
            flow.select_field(field).await?;

            let quote = flow
                .set_time_window(Some(date), Some(start), Some(end))
                .await?;
            info!(
                duration_hours = %quote.duration_hours,
                total_price = %quote.total_price,
                "slot priced"
            );
            flow.confirm_time_window().await?;

            let confirmation = flow
                .submit_customer_info(&phone, &name, notes.as_deref())
                .await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&confirmation)?);
            } else {
                print_confirmation(&confirmation);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;
    use shared::domain::FieldId;

    #[test]
    fn json_flag_is_accepted_after_any_subcommand() {
        let cli = Cli::try_parse_from(["booking_cli", "fields", "--json"]).expect("parse");
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Fields { search: None }));

        let cli = Cli::try_parse_from([
            "booking_cli", "available", "--date", "2025-06-01", "--start", "09:00", "--end",
            "11:00", "--json",
        ])
        .expect("parse");
        assert!(cli.json);
    }

    #[test]
    fn book_accepts_string_field_ids() {
        let cli = Cli::try_parse_from([
            "booking_cli", "book", "--field-id", "field-a", "--date", "2025-06-01", "--start",
            "09:00", "--end", "11:00", "--phone", "0901234567", "--name", "An",
        ])
        .expect("parse");
        match cli.command {
            Command::Book { field_id, .. } => assert_eq!(field_id, FieldId::from("field-a")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn zero_timeout_is_refused() {
        assert!(Cli::try_parse_from(["booking_cli", "--timeout-secs", "0", "fields"]).is_err());
    }
}
