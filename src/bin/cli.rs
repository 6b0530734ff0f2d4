use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use users_api::{
    config::AppConfig,
    db,
    models::{User, UserFilter},
    repositories::SqliteUserRepository,
    services::{UserService, UserServiceError},
};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "users-cli")]
#[command(about = "CLI tool for managing users", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User management commands
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a new user
    Create {
        #[arg(short, long)]
        username: String,

        #[arg(short, long)]
        email: String,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        /// Create the account deactivated
        #[arg(long)]
        inactive: bool,
    },

    /// List users, newest first
    List {
        /// Only active users
        #[arg(long, conflicts_with = "inactive")]
        active: bool,

        /// Only inactive users
        #[arg(long)]
        inactive: bool,

        /// Substring of username or email
        #[arg(short, long)]
        search: Option<String>,

        /// Maximum number of users to display
        #[arg(short, long, default_value_t = 100)]
        limit: i64,

        /// Offset for pagination
        #[arg(short = 'o', long, default_value_t = 0)]
        offset: i64,
    },

    /// Show one user
    Show { id: i64 },

    /// Activate a user
    Activate { id: i64 },

    /// Deactivate a user
    Deactivate { id: i64 },

    /// Delete a user
    Delete { id: i64 },
}

fn fail(action: &str, err: UserServiceError) -> ! {
    match err {
        UserServiceError::Validation(errors) => {
            eprintln!("❌ Failed to {}:", action);
            for (field, messages) in errors.iter() {
                for message in messages {
                    eprintln!("  {}: {}", field, message);
                }
            }
        }
        UserServiceError::UserNotFound => eprintln!("❌ User not found"),
        err => eprintln!("❌ Failed to {}: {}", action, err),
    }
    std::process::exit(1);
}

fn print_user(user: &User) {
    println!("  ID: {}", user.id);
    println!("  Username: {}", user.username);
    println!("  Email: {}", user.email);
    println!("  Full name: {}", user.full_name());
    println!("  Active: {}", if user.is_active { "Yes" } else { "No" });
    println!("  Created: {}", user.created_at.to_rfc3339());
    println!("  Updated: {}", user.updated_at.to_rfc3339());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    // Connect to database
    let pool = db::create_pool(&config).await?;

    // Run migrations
    db::run_migrations(&pool).await?;

    // Initialize services
    let user_repository = Arc::new(SqliteUserRepository::new(pool.clone()));
    let user_service = UserService::new(user_repository);

    // Parse CLI arguments
    let cli = Cli::parse();

    match cli.command {
        Commands::User { command } => match command {
            UserCommands::Create {
                username,
                email,
                first_name,
                last_name,
                inactive,
            } => {
                let mut data = Map::new();
                data.insert("username".to_string(), Value::String(username));
                data.insert("email".to_string(), Value::String(email));
                if let Some(first_name) = first_name {
                    data.insert("first_name".to_string(), Value::String(first_name));
                }
                if let Some(last_name) = last_name {
                    data.insert("last_name".to_string(), Value::String(last_name));
                }
                data.insert("is_active".to_string(), Value::Bool(!inactive));

                match user_service.create_user(&Value::Object(data)).await {
                    Ok(user) => {
                        println!("✅ User created successfully!");
                        print_user(&user);
                    }
                    Err(err) => fail("create user", err),
                }
            }

            UserCommands::List {
                active,
                inactive,
                search,
                limit,
                offset,
            } => {
                let filter = UserFilter {
                    is_active: match (active, inactive) {
                        (true, _) => Some(true),
                        (_, true) => Some(false),
                        _ => None,
                    },
                    search: search.filter(|s| !s.trim().is_empty()),
                };

                match user_service.list_users(&filter, limit, offset).await {
                    Ok(users) => {
                        if users.is_empty() {
                            println!("No users found.");
                        } else {
                            println!(
                                "{:<5} {:<20} {:<40} {:<8} {:<25}",
                                "ID", "Username", "Email", "Active", "Created"
                            );
                            println!("{}", "-".repeat(100));
                            for user in users {
                                println!(
                                    "{:<5} {:<20} {:<40} {:<8} {:<25}",
                                    user.id,
                                    user.username,
                                    user.email,
                                    if user.is_active { "Yes" } else { "No" },
                                    user.created_at.to_rfc3339()
                                );
                            }
                        }
                    }
                    Err(err) => fail("list users", err),
                }
            }

            UserCommands::Show { id } => match user_service.get_user(id).await {
                Ok(user) => print_user(&user),
                Err(err) => fail("show user", err),
            },

            UserCommands::Activate { id } => match user_service.activate_user(id).await {
                Ok(user) => println!("✅ User '{}' activated successfully!", user),
                Err(err) => fail("activate user", err),
            },

            UserCommands::Deactivate { id } => match user_service.deactivate_user(id).await {
                Ok(user) => println!("✅ User '{}' deactivated successfully!", user),
                Err(err) => fail("deactivate user", err),
            },

            UserCommands::Delete { id } => match user_service.delete_user(id).await {
                Ok(()) => println!("✅ User {} deleted successfully!", id),
                Err(err) => fail("delete user", err),
            },
        },
    }

    pool.close().await;

    Ok(())
}
