//! Valuation Request CLI

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use vr_core::display::{format_currency, format_date};
use vr_core::validation::validate_login;
use vr_core::{
    validate, AppController, CoreConfig, CoreError, CoreResult, FileSessionStore,
    LoginCredentials, MockBackend, MockStore, Phase, PropertyType, RequestDraft, RequestStatus,
    SessionStore, ValidationErrors,
};

#[derive(Parser)]
#[command(name = "valuation")]
#[command(about = "Create and browse property valuation requests")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Where the login session is kept between runs
    #[arg(long, global = true, env = "VR_SESSION_FILE", default_value = ".valuation-session.json")]
    session_file: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and remember the session
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "VR_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the logged-in user
    Whoami,

    /// List the reference states
    States,

    /// List valuation requests, most recent first
    List {
        /// Residential, Commercial or Industrial
        #[arg(short = 't', long)]
        property_type: Option<PropertyType>,

        /// Draft, Submitted or Completed
        #[arg(short, long)]
        status: Option<RequestStatus>,

        /// State id
        #[arg(long)]
        state: Option<String>,

        /// Case-insensitive match on the property address
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Create a valuation request
    Create {
        #[command(flatten)]
        draft: DraftArgs,

        /// Print the created request as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check request fields without submitting them
    Validate {
        #[command(flatten)]
        draft: DraftArgs,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct DraftArgs {
    #[arg(short, long, default_value = "")]
    address: String,

    #[arg(short = 't', long)]
    property_type: Option<PropertyType>,

    /// State id
    #[arg(long, default_value = "")]
    state: String,

    #[arg(short, long, default_value = "")]
    purpose: String,

    /// Estimated value in RM
    #[arg(long, allow_negative_numbers = true)]
    value: Option<f64>,

    /// Defaults to Draft
    #[arg(short, long)]
    status: Option<RequestStatus>,
}

impl From<DraftArgs> for RequestDraft {
    fn from(args: DraftArgs) -> Self {
        RequestDraft {
            property_address: args.address,
            property_type: args.property_type,
            state_id: args.state,
            purpose: args.purpose,
            estimated_value: args.value,
            status: args.status,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set subscriber: {}", e);
    }

    let config = match CoreConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    let session_file = cli.session_file;
    let result = match cli.command {
        Commands::Login { email, password } => {
            cmd_login(&session_file, config, LoginCredentials::new(email, password)).await
        }
        Commands::Logout => cmd_logout(&session_file),
        Commands::Whoami => cmd_whoami(&session_file),
        Commands::States => cmd_states(&session_file, config).await,
        Commands::List {
            property_type,
            status,
            state,
            search,
            json,
        } => cmd_list(&session_file, config, property_type, status, state, search, json).await,
        Commands::Create { draft, json } => cmd_create(&session_file, config, draft.into(), json).await,
        Commands::Validate { draft } => cmd_validate(&draft.into()),
    };

    if let Err(e) = result {
        match e.field_errors() {
            Some(errors) => print_field_errors(errors),
            None => error!("{}", e),
        }
        if matches!(e, CoreError::InvalidPhase { phase: Phase::Unauthenticated, .. }) {
            eprintln!("Run 'valuation login' first.");
        }
        std::process::exit(1);
    }
}

fn controller(session_file: &Path, config: CoreConfig) -> AppController<MockBackend> {
    let sessions: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(session_file));
    let api = MockBackend::new(Arc::new(MockStore::init()), &config);
    AppController::new(Arc::new(api), config).with_session_store(sessions)
}

/// Controller resumed from the stored session with data loaded.
async fn resume(
    session_file: &Path,
    config: CoreConfig,
    action: &'static str,
) -> CoreResult<AppController<MockBackend>> {
    let mut app = controller(session_file, config);
    if !app.restore().await? {
        return Err(CoreError::InvalidPhase {
            action,
            phase: Phase::Unauthenticated,
        });
    }
    if app.phase() == Phase::LoadFailed {
        let message = app.notice().map(|n| n.message().to_string()).unwrap_or_default();
        return Err(CoreError::Backend(message));
    }
    Ok(app)
}

async fn cmd_login(
    session_file: &Path,
    config: CoreConfig,
    credentials: LoginCredentials,
) -> CoreResult<()> {
    if let Err(message) = validate_login(&credentials) {
        eprintln!("{}", message);
        return Err(CoreError::InvalidCredentials);
    }

    let mut app = controller(session_file, config);
    if let Err(e) = app.login(&credentials).await {
        if let Some(message) = app.login_error() {
            eprintln!("{}", message);
        }
        return Err(e);
    }

    if let Some(user) = app.user() {
        println!("Logged in as {} <{}>", user.name, user.email);
    }
    if app.phase() == Phase::LoadFailed {
        warn!("Logged in, but loading data failed");
    }
    Ok(())
}

fn cmd_logout(session_file: &Path) -> CoreResult<()> {
    FileSessionStore::new(session_file).clear()?;
    info!("Session cleared");
    println!("Logged out");
    Ok(())
}

fn cmd_whoami(session_file: &Path) -> CoreResult<()> {
    match FileSessionStore::new(session_file).load()? {
        Some(session) => {
            println!("{} <{}>", session.user.name, session.user.email);
            Ok(())
        }
        None => Err(CoreError::InvalidPhase {
            action: "show the current user",
            phase: Phase::Unauthenticated,
        }),
    }
}

async fn cmd_states(session_file: &Path, config: CoreConfig) -> CoreResult<()> {
    let app = resume(session_file, config, "list states").await?;

    println!("\n{:<4} {:<6} {}", "ID", "CODE", "NAME");
    println!("{}", "=".repeat(40));
    for state in app.states() {
        println!("{:<4} {:<6} {}", state.id, state.code, state.name);
    }
    Ok(())
}

async fn cmd_list(
    session_file: &Path,
    config: CoreConfig,
    property_type: Option<PropertyType>,
    status: Option<RequestStatus>,
    state: Option<String>,
    search: Option<String>,
    json: bool,
) -> CoreResult<()> {
    let mut app = resume(session_file, config, "list requests").await?;
    app.set_filter_property_type(property_type);
    app.set_filter_status(status);
    app.set_filter_state(state);
    if let Some(term) = search {
        app.set_search(term);
        app.settle_search().await;
    }

    let visible = app.visible_requests();
    if json {
        println!("{}", serde_json::to_string_pretty(&visible)?);
        return Ok(());
    }

    if visible.is_empty() {
        println!("No valuation requests found");
        return Ok(());
    }

    println!("\nValuation Requests ({} of {})", visible.len(), app.requests().len());
    println!("{}", "=".repeat(50));
    for request in visible {
        println!(
            "\n[{}] {} - {}",
            request.status, request.property_type, request.property_address
        );
        println!("  ID:        {}", request.id);
        println!("  State:     {}", request.state_name);
        println!("  Value:     {}", format_currency(request.estimated_value));
        println!("  Purpose:   {}", request.purpose);
        println!(
            "  Requested: {} by {}",
            format_date(request.created_at),
            request.requested_by_name
        );
    }
    Ok(())
}

async fn cmd_create(
    session_file: &Path,
    config: CoreConfig,
    draft: RequestDraft,
    json: bool,
) -> CoreResult<()> {
    let mut app = resume(session_file, config, "submit a request").await?;
    let created = app.submit(draft).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&created)?);
    } else {
        if let Some(notice) = app.notice() {
            println!("{}", notice.message());
        }
        println!("  ID:    {}", created.id);
        println!("  State: {}", created.state_name);
        println!("  Value: {}", format_currency(created.estimated_value));
    }
    Ok(())
}

fn cmd_validate(draft: &RequestDraft) -> CoreResult<()> {
    let errors = validate(draft);
    if errors.is_empty() {
        println!("Request is valid");
        Ok(())
    } else {
        Err(errors.into())
    }
}

fn print_field_errors(errors: &ValidationErrors) {
    eprintln!("Invalid request:");
    for (field, message) in errors.iter() {
        eprintln!("  {}: {}", field, message);
    }
}
