use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use payment_tracker::application::admin::{AdminAction, PaymentFilter};
use payment_tracker::application::engine::{NewPayment, PaymentEngine};
use payment_tracker::auth::AdminTokenVerifier;
use payment_tracker::client::{HttpStatusSource, PollerConfig, StatusPoller};
use payment_tracker::config::{MailArgs, ServerArgs, StorageArgs};
use payment_tracker::domain::payment::{Payer, PaymentId, PaymentStatus};
use payment_tracker::domain::pricing::{Cryptocurrency, Tier};
use payment_tracker::interfaces::csv::payment_writer::PaymentWriter;
use payment_tracker::interfaces::http::{AppState, router};
use payment_tracker::telemetry;
use serde::Serialize;
use std::io;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "PAYMENTS_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct PayerArgs {
    #[arg(long)]
    email: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
}

impl PayerArgs {
    fn into_payer(self) -> payment_tracker::error::Result<Payer> {
        Payer::new(self.email, self.first_name, self.last_name)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        #[command(flatten)]
        server: ServerArgs,
        #[command(flatten)]
        storage: StorageArgs,
        #[command(flatten)]
        mail: MailArgs,
    },
    /// Open a payment and print its instructions.
    Create {
        #[arg(long)]
        tier: Tier,
        #[arg(long)]
        cryptocurrency: Cryptocurrency,
        #[command(flatten)]
        payer: PayerArgs,
        #[command(flatten)]
        storage: StorageArgs,
    },
    /// Print the current status of a payment.
    Status {
        id: PaymentId,
        #[command(flatten)]
        storage: StorageArgs,
    },
    /// Record confirmation progress reported by a payer.
    Report {
        id: PaymentId,
        #[arg(long)]
        confirmations: Option<u32>,
        #[arg(long)]
        transaction_hash: Option<String>,
        #[command(flatten)]
        storage: StorageArgs,
        #[command(flatten)]
        mail: MailArgs,
    },
    /// Operator commands.
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
    /// Create a free membership.
    Signup {
        #[command(flatten)]
        payer: PayerArgs,
        #[command(flatten)]
        storage: StorageArgs,
        #[command(flatten)]
        mail: MailArgs,
    },
    /// Write every payment to stdout as CSV.
    Export {
        #[command(flatten)]
        storage: StorageArgs,
    },
    /// Poll a running server until the payment completes.
    Watch {
        id: PaymentId,
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        server: String,
        /// Seconds between polls.
        #[arg(long, default_value_t = 30)]
        interval: u64,
    },
}

#[derive(Subcommand)]
enum AdminCommand {
    /// List payments with aggregate stats.
    List {
        #[arg(long)]
        status: Option<PaymentStatus>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        limit: Option<u32>,
        #[command(flatten)]
        storage: StorageArgs,
    },
    /// Verify, cancel or reset a payment.
    Action {
        id: PaymentId,
        action: AdminAction,
        #[arg(long)]
        transaction_hash: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        #[command(flatten)]
        storage: StorageArgs,
        #[command(flatten)]
        mail: MailArgs,
    },
}

fn build_engine(storage: &StorageArgs, mail: &MailArgs) -> Result<PaymentEngine> {
    let (payments, users) = storage.open_stores().into_diagnostic()?;
    let notifier = mail.notifier().into_diagnostic()?;
    Ok(PaymentEngine::new(payments, users, notifier))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), value).into_diagnostic()?;
    println!();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_json);

    match cli.command {
        Command::Serve {
            server,
            storage,
            mail,
        } => serve(server, &storage, &mail).await,
        Command::Create {
            tier,
            cryptocurrency,
            payer,
            storage,
        } => {
            let engine = build_engine(&storage, &MailArgs::default())?;
            let request = NewPayment {
                tier,
                cryptocurrency,
                payer: payer.into_payer().into_diagnostic()?,
            };
            let instructions = engine.create_payment(request).await.into_diagnostic()?;
            print_json(&instructions)
        }
        Command::Status { id, storage } => {
            let engine = build_engine(&storage, &MailArgs::default())?;
            print_json(&engine.query(id).await.into_diagnostic()?)
        }
        Command::Report {
            id,
            confirmations,
            transaction_hash,
            storage,
            mail,
        } => {
            let engine = build_engine(&storage, &mail)?;
            let view = engine
                .report_progress(id, confirmations, transaction_hash)
                .await
                .into_diagnostic()?;
            print_json(&view)
        }
        Command::Admin { command } => match command {
            AdminCommand::List {
                status,
                page,
                limit,
                storage,
            } => {
                let engine = build_engine(&storage, &MailArgs::default())?;
                let filter = PaymentFilter::new(status, page, limit).into_diagnostic()?;
                print_json(&engine.list_payments(&filter).await.into_diagnostic()?)
            }
            AdminCommand::Action {
                id,
                action,
                transaction_hash,
                notes,
                storage,
                mail,
            } => {
                let engine = build_engine(&storage, &mail)?;
                let view = engine
                    .admin_action(id, action, transaction_hash, notes)
                    .await
                    .into_diagnostic()?;
                print_json(&view)
            }
        },
        Command::Signup {
            payer,
            storage,
            mail,
        } => {
            let engine = build_engine(&storage, &mail)?;
            let payer = payer.into_payer().into_diagnostic()?;
            print_json(&engine.signup_free(payer).await.into_diagnostic()?)
        }
        Command::Export { storage } => {
            let engine = build_engine(&storage, &MailArgs::default())?;
            let payments = engine.all_payments().await.into_diagnostic()?;
            let stdout = io::stdout();
            let mut writer = PaymentWriter::new(stdout.lock());
            writer
                .write_payments(payments, chrono::Utc::now())
                .into_diagnostic()?;
            Ok(())
        }
        Command::Watch {
            id,
            server,
            interval,
        } => watch(id, server, Duration::from_secs(interval.max(1))).await,
    }
}

async fn serve(server: ServerArgs, storage: &StorageArgs, mail: &MailArgs) -> Result<()> {
    let engine = Arc::new(build_engine(storage, mail)?);
    let verifier = AdminTokenVerifier::new(server.jwt_secret.as_bytes());
    let state = AppState::new(engine, verifier).with_internal_errors_exposed(server.dev_mode);

    let listener = tokio::net::TcpListener::bind(server.addr)
        .await
        .into_diagnostic()?;
    tracing::info!(addr = %server.addr, dev_mode = server.dev_mode, "Payment tracker listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
        .into_diagnostic()
}

async fn watch(id: PaymentId, server: String, interval: Duration) -> Result<()> {
    let source = HttpStatusSource::new(server).into_diagnostic()?;
    let config = PollerConfig {
        interval,
        ..PollerConfig::default()
    };
    let handle = StatusPoller::spawn(source, id, config);
    let mut updates = handle.subscribe();

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                if let Some(error) = &snapshot.last_error {
                    eprintln!("Status check failed: {}", error);
                } else if let Some(view) = &snapshot.view {
                    print_json(view)?;
                }
                if snapshot.complete {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.stop().await;
    Ok(())
}
