use std::io;

use quiz_core::model::UserRole;
use services::{AppServices, Clock};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod args;
mod practice;
mod results;
mod runner;
mod students;

use args::{Args, Command, prepare_sqlite_file, print_usage};

fn init_tracing() {
    // Logs go to stderr so they never interleave with the quiz prompts.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,app=info,services=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let parsed = Args::parse(std::env::args().skip(1), |key| std::env::var(key).ok())
        .map_err(|e| {
            eprintln!("{e}");
            print_usage();
            e
        })?;
    if parsed.command == Command::Help {
        print_usage();
        return Ok(());
    }

    // Open + migrate SQLite at startup; the services below only see repositories.
    prepare_sqlite_file(&parsed.db_url)?;
    let app = AppServices::new_sqlite(&parsed.db_url, Clock::default(), parsed.exam_title).await?;
    let identity = app.profiles().identify(parsed.user_id).await.map_err(|e| {
        eprintln!(
            "user {} is not registered (run the seed binary or pass --user)",
            parsed.user_id
        );
        e
    })?;
    tracing::info!(
        "Signed in as {} ({}) using {}",
        identity.name,
        identity.role,
        parsed.db_url
    );

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout().lock();

    match parsed.command {
        Command::Take => match identity.role {
            UserRole::Student => {
                runner::take_quiz(
                    &app.quiz(),
                    &identity,
                    &mut rand::rng(),
                    &mut input,
                    &mut out,
                )
                .await?;
            }
            UserRole::Professor => runner::browse_bank(&app.quiz(), &mut out).await?,
        },
        Command::Results => {
            results::print_results(&app.profiles(), &identity, parsed.limit, &mut out).await?;
        }
        Command::Practice => {
            let topic = parsed.topic.unwrap_or_default();
            practice::run_practice(&app.ai(), &topic, parsed.count, &mut input, &mut out).await?;
        }
        Command::Students => {
            students::manage_students(&app.profiles(), &identity, &parsed.students, &mut out)
                .await?;
        }
        Command::Help => print_usage(),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
