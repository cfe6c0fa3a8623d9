use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use client_registry::config;
use client_registry::db::{self, Database};
use client_registry::models::{ClientFilter, ClientId, ClientUpdate, NewClient, PhoneUpdate};

#[derive(Parser)]
#[command(name = "client-registry", about = "Manage clients and their phone numbers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Drop and recreate the registry tables (destroys all data)
    Init,
    /// Create the registry tables if they are missing
    EnsureSchema,
    /// Drop the registry tables (destroys all data)
    Reset,
    /// Register a new client
    Add {
        #[arg(long)]
        first_name: String,
        #[arg(long)]
        last_name: String,
        #[arg(long)]
        email: String,
        /// Phone number to attach; may be repeated
        #[arg(long = "phone", value_name = "NUMBER")]
        phones: Vec<String>,
    },
    /// Attach a phone number to an existing client
    AddPhone { client_id: ClientId, number: String },
    /// Change a client's details
    Update {
        client_id: ClientId,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Write this number into every phone row the client owns
        #[arg(long, value_name = "NUMBER", conflicts_with = "replace_phones")]
        overwrite_phones: Option<String>,
        /// Replace the client's phone numbers with exactly these
        #[arg(long, value_name = "NUMBER", num_args = 0..)]
        replace_phones: Option<Vec<String>>,
    },
    /// Delete a client's phone numbers matching a LIKE pattern
    DeletePhone { client_id: ClientId, pattern: String },
    /// Delete a client and all of its phone numbers
    Delete { client_id: ClientId },
    /// Find client ids by exactly one criterion
    Find {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Show a client and its phone numbers
    Show { client_id: ClientId },
    /// Initialize a fresh registry and run a sample session against it
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,client_registry=debug")),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = config::init()?;

    // Initialize database connection
    let db = db::init(&config).await?;

    run(&db, cli.command).await
}

async fn run(db: &Database, command: Command) -> Result<()> {
    match command {
        Command::Init => {
            db.initialize_schema().await?;
            println!("Registry initialized");
        }
        Command::EnsureSchema => {
            db.ensure_schema().await?;
            println!("Registry schema is in place");
        }
        Command::Reset => {
            db.reset_schema().await?;
            println!("Registry tables dropped");
        }
        Command::Add { first_name, last_name, email, phones } => {
            let client = NewClient { first_name, last_name, email, phones };
            let id = db.add_client(&client).await?;
            println!("{}", id);
        }
        Command::AddPhone { client_id, number } => {
            let id = db.add_phone(client_id, &number).await?;
            println!("{}", id);
        }
        Command::Update {
            client_id,
            first_name,
            last_name,
            email,
            overwrite_phones,
            replace_phones,
        } => {
            let phones = match (overwrite_phones, replace_phones) {
                (Some(number), _) => Some(PhoneUpdate::OverwriteAll(number)),
                (None, Some(numbers)) => Some(PhoneUpdate::Replace(numbers)),
                (None, None) => None,
            };
            let update = ClientUpdate { first_name, last_name, email, phones };
            db.update_client(client_id, &update).await?;
            println!("Client {} updated", client_id);
        }
        Command::DeletePhone { client_id, pattern } => {
            let deleted = db.delete_phone(client_id, &pattern).await?;
            println!("{} phone number(s) deleted", deleted);
        }
        Command::Delete { client_id } => {
            if db.delete_client(client_id).await? {
                println!("Client {} deleted", client_id);
            } else {
                println!("No client {}", client_id);
            }
        }
        Command::Find { first_name, last_name, email, phone } => {
            let filter = ClientFilter { first_name, last_name, email, phone };
            print_ids(&db.find_client(&filter).await?);
        }
        Command::Show { client_id } => {
            let record = db.get_client(client_id).await?;
            println!(
                "{}: {} {} <{}>",
                record.client.id, record.client.first_name, record.client.last_name, record.client.email
            );
            for phone in record.phones {
                println!("  {}", phone.number);
            }
        }
        Command::Demo => demo(db).await?,
    }

    Ok(())
}

async fn demo(db: &Database) -> Result<()> {
    db.initialize_schema().await?;

    let ivan = db
        .add_client(&NewClient::new("Ivan", "Ivanov", "ivanov@mail.ru").with_phone("+7 999 888 77 66"))
        .await?;
    let petr = db
        .add_client(&NewClient::new("Petr", "Petrov", "petrov@mail.ru").with_phone("+7 999 555 44 33"))
        .await?;
    db.add_client(&NewClient::new("Alexander", "Alexandrov", "alexandrov@mail.ru"))
        .await?;

    db.update_client(
        petr,
        &ClientUpdate::new()
            .first_name("Igor")
            .last_name("Igorev")
            .email("igorev@mail.ru")
            .phones(PhoneUpdate::OverwriteAll("+7 777 777 77 77".to_string())),
    )
    .await?;
    db.delete_phone(ivan, "+7 999 888 77 66").await?;
    db.delete_client(petr).await?;

    info!("Demo session finished");
    print_ids(&db.find_client(&ClientFilter::by_first_name("Alexander")).await?);
    Ok(())
}

fn print_ids(ids: &[ClientId]) {
    let rendered = ids.iter().map(|id| id.to_string()).collect::<Vec<_>>();
    println!("[{}]", rendered.join(", "));
}
