use clap::Parser;
use colored::*;
use eyre::{Context, Result, bail};
use log::info;

use entitystore::cli::{Cli, Command, parse_field};
use entitystore::config::Config;
use entitystore::{Entity, EntityKind, EntityStore};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let user = cli.user.unwrap_or_else(|| config.default_user.clone());

    info!("entitystore starting");

    let store = EntityStore::open(&config.store_path)?;

    match cli.command {
        Command::Add { kind, name, fields } => {
            let kind: EntityKind = kind.parse().map_err(|e: String| eyre::eyre!(e))?;
            let mut entity = Entity::new(kind, &name);
            for raw in &fields {
                let (k, v) = parse_field(raw).map_err(|e| eyre::eyre!(e))?;
                entity.set_field(k, v);
            }
            let id = store.upsert(&user, entity)?;
            println!("{} {} {} ({})", "✓".green(), kind, name.cyan(), id.dimmed());
        }
        Command::List => {
            let entities = store.list(&user)?;
            if entities.is_empty() {
                println!("No entities for user {}", user.cyan());
            } else {
                for e in entities {
                    println!("{:<8} {} [{} fields]", e.kind.to_string().yellow(), e.name, e.fields.len());
                }
            }
        }
        Command::Show { name } => {
            let entities = store.list(&user)?;
            let Some(entity) = entities.iter().find(|e| e.name.eq_ignore_ascii_case(&name)) else {
                bail!("No entity named '{}' for user {}", name, user);
            };
            println!("{} ({})", entity.name.cyan(), entity.kind);
            for (k, v) in &entity.fields {
                println!("  {}: {}", k.yellow(), v);
            }
        }
        Command::Remove { name } => {
            if store.remove(&user, &name)? {
                println!("{} Removed entity: {}", "✓".green(), name);
            } else {
                println!("No entity named '{}' for user {}", name, user);
            }
        }
        Command::Users => {
            let users = store.list_users()?;
            if users.is_empty() {
                println!("No users found");
            } else {
                for u in users {
                    println!("{}", u);
                }
            }
        }
    }

    Ok(())
}
