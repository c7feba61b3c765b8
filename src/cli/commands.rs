//! Command execution against the configured store

use serde::Serialize;

use super::{Cli, Command};
use crate::config::AppConfig;
use crate::infrastructure::logging;
use crate::infrastructure::user::CreateUserRequest;

/// Load configuration, build the service and run one command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    let service = crate::create_user_service(&config).await?;

    match cli.command {
        Command::Create(args) => {
            let user = service
                .create(CreateUserRequest {
                    id: args.id,
                    username: args.username,
                    first_name: args.first_name,
                    last_name: args.last_name,
                })
                .await?;
            print_json(&user)?;
        }
        Command::Get { id } => print_json(&service.get(&id).await?)?,
        Command::Find { username } => print_json(&service.get_by_username(&username).await?)?,
        Command::Update(args) => {
            let user = service.update(&args.id, args.to_patch()).await?;
            print_json(&user)?;
        }
        Command::Delete { id } => {
            service.delete(&id).await?;
            print_json(&serde_json::json!({ "deleted": id }))?;
        }
        Command::List => print_json(&service.list().await?.to_vec())?,
        Command::Count => print_json(&serde_json::json!({ "count": service.count().await? }))?,
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
