use screenwatch_shared::FamilyKey;
use screenwatch_store::{IdentityError, StorageError, Store};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod config;
pub mod render;
pub mod session;

pub use cli::{Cli, Command};
pub use config::{ConfigError, ViewerConfig};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Identity(#[from] IdentityError),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Identity(IdentityError::AuthFailed)
            | AppError::Identity(IdentityError::FamilyKeyMismatch { .. }) => 1,
            AppError::InvalidInput(_) | AppError::Config(_) => 2,
            _ => 3,
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn password_or_prompt(given: Option<String>) -> Result<String, AppError> {
    match given {
        Some(p) => Ok(p),
        None => Ok(rpassword::prompt_password("Password: ")?),
    }
}

/// Parent login followed by the family query, rendered as text or JSON.
pub async fn family_report(
    store: &Store,
    email: &str,
    password: &str,
    json: bool,
) -> Result<String, AppError> {
    let key = store.login_parent(email.trim(), password).await?;
    let usage = store.query_usage_for_family(&key).await?;
    if json {
        let text = render::render_family_json(&usage).map_err(std::io::Error::other)?;
        Ok(format!("{text}\n"))
    } else {
        Ok(render::render_family(&usage, chrono::Utc::now()))
    }
}

pub async fn status_line(store: &Store, child: &str) -> Result<String, AppError> {
    let liveness = store.child_status(child.trim()).await?;
    Ok(liveness.to_string())
}

pub async fn run(cli: Cli) -> Result<(), AppError> {
    init_tracing();

    let cfg = ViewerConfig::load(cli.config)?;
    let store = Store::open(cfg.store_path()?);
    info!(store=%store.path().display(), "using store");

    match cli.command {
        Command::Parent { email, password } => {
            let password = password_or_prompt(password)?;
            match session::sign_in_parent(&store, &email, &password).await? {
                session::ParentSignIn::Registered(key) => {
                    println!("Registered. Family Key: {key}");
                }
                session::ParentSignIn::Returning(key) => {
                    println!("Welcome back! Family Key: {key}");
                }
            }
        }
        Command::Child {
            email,
            password,
            family_key,
        } => {
            let password = password_or_prompt(password)?;
            let identity_path = cfg.identity_path()?;
            let key = FamilyKey::from(family_key);
            match session::sign_in_child(&store, &identity_path, &email, &password, &key).await? {
                session::ChildSignIn::Registered => println!("Registered and linked to family."),
                session::ChildSignIn::Returning => println!("Login successful."),
            }
        }
        Command::Usage {
            email,
            password,
            json,
        } => {
            let password = password_or_prompt(password)?;
            print!("{}", family_report(&store, &email, &password, json).await?);
        }
        Command::Status { child } => {
            println!("{}", status_line(&store, &child).await?);
        }
    }
    Ok(())
}
