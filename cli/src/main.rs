mod form_file;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use potluck_core::{
    Account, ClientConfig, FileStore, Navigator, RecipeId, RecipeSyncService, ReqwestTransport,
    SessionClient,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "potluck")]
#[command(about = "Potluck recipe client", long_about = None)]
struct Cli {
    /// Recipe service URL (default: $POTLUCK_API_URL or http://localhost:8000)
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Remote(RemoteCommand),
    /// Append a step to a form file
    AddStep { file: PathBuf, instruction: String },
    /// Remove the last step from a form file
    DropStep { file: PathBuf },
}

/// Commands that talk to the recipe service.
#[derive(Subcommand)]
enum RemoteCommand {
    /// Create an account and sign in as it
    Signup {
        /// Display name
        #[arg(long)]
        name: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "POTLUCK_PASSWORD")]
        password: String,
    },
    /// Sign in and remember the session
    Signin {
        #[arg(long)]
        username: String,
        #[arg(long, env = "POTLUCK_PASSWORD")]
        password: String,
    },
    /// Forget the stored session
    Signout,
    /// List recipes
    List,
    /// Print a recipe
    Show { id: i64 },
    /// Fetch a recipe into an editable form file
    Export {
        id: i64,
        /// Form file to write
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Validate a form file and create or update the recipe it describes
    Save { file: PathBuf },
    /// Delete a recipe
    Delete { id: i64 },
}

/// Prints where the user should go next.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn recipe(&self, id: RecipeId) {
        println!("Saved recipe {}. View it with `potluck show {}`.", id, id);
    }

    fn home(&self) {
        eprintln!("Signed out. Run `potluck signin` to continue.");
    }
}

struct App {
    account: Account<ReqwestTransport, FileStore>,
    recipes: RecipeSyncService<ReqwestTransport>,
}

impl App {
    fn connect(server: Option<String>) -> Result<Self> {
        let mut config = ClientConfig::from_env().context("Invalid configuration")?;
        if let Some(server) = server {
            config = config.with_api_url(server);
        }
        tracing::debug!(api_url = %config.api_url, session_file = %config.session_file.display(), "connecting");

        let transport = config
            .transport()
            .with_context(|| format!("Failed to create client for {}", config.api_url))?;
        let client = Arc::new(SessionClient::new(transport));
        let navigator: Arc<dyn Navigator> = Arc::new(TerminalNavigator);

        let account = Account::load(
            client.clone(),
            Arc::new(config.session_store()),
            navigator.clone(),
        )
        .context("Failed to restore session")?;
        let recipes = RecipeSyncService::new(client).with_navigator(navigator);

        Ok(Self { account, recipes })
    }
}

fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::AddStep { file, instruction } => {
            let ordinal = form_file::add_step(&file, &instruction)?;
            println!("Added step {} to {}", ordinal, file.display());
        }
        Commands::DropStep { file } => match form_file::drop_step(&file)? {
            Some(step) => println!(
                "Removed step: {}",
                step.instruction.as_deref().unwrap_or("")
            ),
            None => println!("{} has no steps", file.display()),
        },
        Commands::Remote(command) => run(App::connect(cli.server)?, command).await?,
    }

    Ok(())
}

async fn run(app: App, command: RemoteCommand) -> Result<()> {
    match command {
        RemoteCommand::Signup {
            name,
            username,
            password,
        } => {
            let (created, _) = app
                .account
                .sign_up(&name, &username, &password)
                .await
                .context("Failed to sign up")?;
            println!("Welcome, {} (user {})", created.name, created.id);
        }
        RemoteCommand::Signin { username, password } => {
            let user = app
                .account
                .sign_in(&username, &password)
                .await
                .context("Failed to sign in")?;
            println!("Signed in as {}", user.username);
        }
        RemoteCommand::Signout => {
            app.account.sign_out().context("Failed to sign out")?;
        }
        RemoteCommand::List => {
            let recipes = app.recipes.list().await.context("Failed to list recipes")?;
            if recipes.is_empty() {
                println!("No recipes yet");
            }
            for recipe in recipes {
                let author = recipe.author.map(|a| a.name).unwrap_or_default();
                println!("{}\t{}\t{}", recipe.id, recipe.title, author);
            }
        }
        RemoteCommand::Show { id } => {
            let form = app
                .recipes
                .fetch(RecipeId(id))
                .await
                .with_context(|| format!("Failed to fetch recipe {}", id))?;
            form_file::print_form(&form);
        }
        RemoteCommand::Export { id, output } => {
            let form = app
                .recipes
                .fetch(RecipeId(id))
                .await
                .with_context(|| format!("Failed to fetch recipe {}", id))?;
            form_file::write_form(&output, &form)?;
            println!("Wrote recipe {} to {}", id, output.display());
        }
        RemoteCommand::Save { file } => save(&app, &file).await?,
        RemoteCommand::Delete { id } => {
            app.recipes
                .delete(RecipeId(id))
                .await
                .with_context(|| format!("Failed to delete recipe {}", id))?;
            println!("Deleted recipe {}", id);
        }
    }

    Ok(())
}

async fn save(app: &App, file: &Path) -> Result<()> {
    let mut form = form_file::read_form(file)?;
    let id = app
        .recipes
        .submit(&form)
        .await
        .with_context(|| format!("Failed to save {}", file.display()))?;

    // Later saves of the same file update instead of creating again.
    if form.id != Some(id) {
        form.id = Some(id);
        form_file::write_form(file, &form)?;
    }
    Ok(())
}
