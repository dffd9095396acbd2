use std::{error::Error, fs::File, io, path::PathBuf};

use chrono::{NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use engine::{Actor, Booking, Engine, Money, PaymentDetails, PaymentMethod};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

mod settings;

#[derive(Parser, Debug)]
#[command(name = "panditji_admin")]
#[command(about = "Finance console for bookings, refunds and pandit payouts")]
struct Cli {
    /// Optional settings file (TOML).
    #[arg(long, default_value = settings::DEFAULT_CONFIG_PATH)]
    config: String,

    /// Database connection string; overrides the settings file.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    /// Admin id recorded on approvals and resolutions.
    #[arg(long, env = "PANDITJI_ADMIN", default_value = "admin")]
    admin: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Booking(BookingCmd),
    Refund(RefundCmd),
    Payout(PayoutCmd),
    Discrepancy(DiscrepancyCmd),
}

#[derive(Args, Debug)]
struct BookingCmd {
    #[command(subcommand)]
    command: BookingCommand,
}

#[derive(Subcommand, Debug)]
enum BookingCommand {
    /// Print a booking snapshot.
    Show { booking: String },
    /// Print every status change of a booking.
    History { booking: String },
}

#[derive(Args, Debug)]
struct RefundCmd {
    #[command(subcommand)]
    command: RefundCommand,
}

#[derive(Subcommand, Debug)]
enum RefundCommand {
    /// Refund the customer would get by cancelling now.
    Quote { booking: String },
}

#[derive(Args, Debug)]
struct PayoutCmd {
    #[command(subcommand)]
    command: PayoutCommand,
}

#[derive(Subcommand, Debug)]
enum PayoutCommand {
    /// List completed bookings awaiting payout.
    Queue,
    /// Print the payout breakdown of a booking.
    Show { booking: String },
    /// Mark payouts as paid.
    Approve(ApproveArgs),
    /// Write completed payouts as CSV.
    Export {
        /// Output file; stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ApproveArgs {
    /// Bank/UPI transaction reference.
    #[arg(long)]
    reference: String,
    #[arg(long, value_parser = parse_method, default_value = "upi")]
    method: PaymentMethod,
    /// Payment date (YYYY-MM-DD); today when omitted.
    #[arg(long)]
    date: Option<NaiveDate>,
    #[arg(required = true)]
    bookings: Vec<String>,
}

#[derive(Args, Debug)]
struct DiscrepancyCmd {
    #[command(subcommand)]
    command: DiscrepancyCommand,
}

#[derive(Subcommand, Debug)]
enum DiscrepancyCommand {
    /// Clear a travel discrepancy flag.
    Resolve {
        booking: String,
        /// Travel cost to pay instead of the claimed one.
        #[arg(long)]
        travel_cost: Option<Money>,
        #[arg(long)]
        note: Option<String>,
    },
}

fn parse_method(raw: &str) -> Result<PaymentMethod, String> {
    PaymentMethod::try_from(raw).map_err(|err| err.to_string())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Accepts a booking number (`HPJ-1042`) or a booking id.
async fn find_booking(
    engine: &Engine,
    key: &str,
) -> Result<Booking, Box<dyn Error + Send + Sync>> {
    let booking = match Uuid::parse_str(key.trim()) {
        Ok(id) => engine.booking(id).await?,
        Err(_) => engine.booking_by_number(key).await?,
    };
    Ok(booking)
}

fn print_booking(booking: &Booking) {
    println!("{} ({})", booking.booking_number, booking.id);
    println!("  status      {}", booking.status);
    println!("  event       {}", booking.event_date.to_rfc3339());
    println!("  customer    {}", booking.customer_id);
    println!(
        "  pandit      {}",
        booking.pandit_id.as_deref().unwrap_or("-")
    );
    println!("  total       {}", booking.total_amount);
    println!("  dakshina    {}", booking.dakshina_amount);
    if let Some(fee) = booking.platform_fee {
        println!("  fee         {fee}");
    }
    if booking.travel_required {
        let show = |m: Option<Money>| m.map_or_else(|| "-".to_string(), |m| m.to_string());
        println!(
            "  travel      estimate {} / claim {}{}",
            show(booking.calculated_travel_cost),
            show(booking.actual_travel_cost),
            if booking.discrepancy { " [DISCREPANCY]" } else { "" }
        );
    }
    if let Some(refund) = booking.refund {
        println!("  refund      {} ({}%)", refund.amount, refund.percent);
    }
    if let Some(amount) = booking.payout.amount {
        println!("  payout      {amount} {}", booking.payout.status);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "panditji_admin={level},engine={level}",
            level = settings.app.level
        ))
        .with_writer(io::stderr)
        .init();

    let database_url = cli
        .database_url
        .unwrap_or_else(|| settings.database.url.clone());
    tracing::debug!(%database_url, "opening database");
    let db = connect_db(&database_url).await?;
    let engine = Engine::builder()
        .database(db)
        .policy(settings.policy())
        .build()
        .await?;
    let admin = Actor::admin(cli.admin);
    let now = Utc::now();

    match cli.command {
        Command::Booking(BookingCmd { command }) => match command {
            BookingCommand::Show { booking } => {
                print_booking(&find_booking(&engine, &booking).await?);
            }
            BookingCommand::History { booking } => {
                let booking = find_booking(&engine, &booking).await?;
                for change in &booking.history {
                    println!(
                        "{:>3}  {}  {} -> {}  {} by {}{}",
                        change.sequence,
                        change.changed_at.to_rfc3339(),
                        change.from_status,
                        change.to_status,
                        change.action,
                        change.actor_id,
                        change
                            .note
                            .as_deref()
                            .map(|n| format!(" ({n})"))
                            .unwrap_or_default()
                    );
                }
            }
        },
        Command::Refund(RefundCmd {
            command: RefundCommand::Quote { booking },
        }) => {
            let booking = find_booking(&engine, &booking).await?;
            let quote = engine.quote_refund(booking.id, now).await?;
            println!(
                "{}: refund {} of {} ({}%)",
                booking.booking_number, quote.amount, booking.total_amount, quote.percent
            );
        }
        Command::Payout(PayoutCmd { command }) => match command {
            PayoutCommand::Queue => {
                let queue = engine.pending_payouts().await?;
                if queue.is_empty() {
                    println!("no payouts pending");
                }
                for booking in queue {
                    let amount = booking
                        .payout
                        .amount
                        .map_or_else(|| "-".to_string(), |m| m.to_string());
                    println!(
                        "{}  {}  {}  {}{}",
                        booking.booking_number,
                        booking.event_date.date_naive(),
                        booking.pandit_id.as_deref().unwrap_or("-"),
                        amount,
                        if booking.discrepancy { "  [DISCREPANCY]" } else { "" }
                    );
                }
            }
            PayoutCommand::Show { booking } => {
                let booking = find_booking(&engine, &booking).await?;
                let breakdown = engine.payout_breakdown(booking.id).await?;
                println!("{}", booking.booking_number);
                for item in &breakdown.line_items {
                    println!("  {:<22} {:>10}", item.kind.label(), item.amount.to_string());
                }
                println!("  {:<22} {:>10}", "Net payout", breakdown.net.to_string());
            }
            PayoutCommand::Approve(args) => {
                let mut ids = Vec::with_capacity(args.bookings.len());
                for key in &args.bookings {
                    ids.push(find_booking(&engine, key).await?.id);
                }
                let details = PaymentDetails {
                    transaction_ref: args.reference,
                    method: args.method,
                    payment_date: args.date.unwrap_or(now.date_naive()),
                };
                let outcome = engine.approve_batch(&ids, &admin, details, now).await?;
                println!("approved {} payout(s)", outcome.succeeded.len());
                for failure in &outcome.failed {
                    eprintln!("  {}: {}", failure.booking_id, failure.error);
                }
                if !outcome.failed.is_empty() {
                    std::process::exit(1);
                }
            }
            PayoutCommand::Export { output } => {
                let rows = match output {
                    Some(path) => engine.export_payouts_csv(File::create(path)?).await?,
                    None => engine.export_payouts_csv(io::stdout()).await?,
                };
                eprintln!("exported {rows} payout(s)");
            }
        },
        Command::Discrepancy(DiscrepancyCmd {
            command:
                DiscrepancyCommand::Resolve {
                    booking,
                    travel_cost,
                    note,
                },
        }) => {
            let booking = find_booking(&engine, &booking).await?;
            let resolved = engine
                .resolve_discrepancy(booking.id, &admin, travel_cost, note.as_deref(), now)
                .await?;
            println!(
                "{}: discrepancy resolved, travel {}",
                resolved.booking_number,
                resolved.travel_cost()
            );
        }
    }

    Ok(())
}
