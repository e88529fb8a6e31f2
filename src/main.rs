use clap::Parser;
use passvault::cli::commands;
use passvault::cli::{AuthAction, Cli, Commands};
use passvault::errors::Result;
use tracing_subscriber::EnvFilter;

/// Log filter variable; defaults to `warn`. Logs go to stderr so they
/// never mix with secrets or exports written to stdout.
const LOG_ENV: &str = "PASSVAULT_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        passvault::cli::output::error(&e.to_string());
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::Init => commands::init::execute(cli),
        Commands::Add {
            label,
            username,
            secret,
            description,
        } => commands::add::execute(cli, label, username, secret.as_deref(), description),
        Commands::Edit {
            label,
            username,
            rename,
            password,
            description,
        } => commands::edit::execute(
            cli,
            label,
            username,
            rename.as_deref(),
            *password,
            description.as_deref(),
        ),
        Commands::Get { label, username } => {
            commands::get::execute(cli, label, username.as_deref())
        }
        Commands::List { query } => commands::list::execute(cli, query.as_deref()),
        Commands::Rm {
            label,
            username,
            force,
        } => commands::rm::execute(cli, label, username.as_deref(), *force),
        Commands::Export { format, output } => {
            commands::export::execute(cli, format.as_deref(), output.as_deref())
        }
        Commands::Import { file, replace } => commands::import_cmd::execute(cli, file, *replace),
        Commands::Migrate { file } => commands::migrate::execute(cli, file.as_deref()),
        Commands::RotateKey => commands::rotate::execute(cli),
        Commands::Auth { action } => match action {
            AuthAction::Keyring { delete } => commands::auth::execute_keyring(cli, *delete),
            AuthAction::KeyfileGenerate { path } => {
                commands::auth::execute_keyfile_generate(cli, path.as_deref())
            }
        },
        #[cfg(feature = "audit-log")]
        Commands::Audit {
            last,
            since,
            op,
            all,
        } => commands::audit_cmd::execute(
            cli,
            &commands::audit_cmd::AuditArgs {
                last: *last,
                since: since.as_deref(),
                operation: op.as_deref(),
                all_vaults: *all,
            },
        ),
        #[cfg(not(feature = "audit-log"))]
        Commands::Audit { .. } => Err(passvault::errors::VaultError::AuditError(
            "audit log not compiled — rebuild with the `audit-log` feature".into(),
        )),
        Commands::Completions { shell } => {
            passvault::cli::write_completions(*shell, &mut std::io::stdout());
            Ok(())
        }
    }
}
