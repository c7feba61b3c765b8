//! CLI module for the user record store
//!
//! Administrative subcommands that run one store operation against the
//! configured backend and print the result as JSON.

pub mod commands;

use clap::{Args, Parser, Subcommand};

use crate::domain::user::UserPatch;

/// User record store - create, inspect and maintain user records
#[derive(Debug, Parser)]
#[command(name = "user-record-store")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a user
    Create(CreateArgs),

    /// Show a user by ID
    Get {
        id: String,
    },

    /// Show a user by username
    Find {
        username: String,
    },

    /// Change a user's username or names
    Update(UpdateArgs),

    /// Delete a user by ID
    Delete {
        id: String,
    },

    /// List all users in insertion order
    List,

    /// Print the number of users
    Count,
}

#[derive(Debug, Args)]
pub struct CreateArgs {
    /// User ID; generated when omitted
    #[arg(long)]
    pub id: Option<String>,

    #[arg(long)]
    pub username: String,

    #[arg(long)]
    pub first_name: Option<String>,

    #[arg(long)]
    pub last_name: Option<String>,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub id: String,

    #[arg(long)]
    pub username: Option<String>,

    #[arg(long, conflicts_with = "clear_first_name")]
    pub first_name: Option<String>,

    #[arg(long)]
    pub clear_first_name: bool,

    #[arg(long, conflicts_with = "clear_last_name")]
    pub last_name: Option<String>,

    #[arg(long)]
    pub clear_last_name: bool,
}

impl UpdateArgs {
    pub fn to_patch(&self) -> UserPatch {
        let mut patch = UserPatch::new();

        if let Some(username) = &self.username {
            patch = patch.with_username(username);
        }

        if let Some(first_name) = &self.first_name {
            patch = patch.with_first_name(first_name);
        } else if self.clear_first_name {
            patch = patch.clear_first_name();
        }

        if let Some(last_name) = &self.last_name {
            patch = patch.with_last_name(last_name);
        } else if self.clear_last_name {
            patch = patch.clear_last_name();
        }

        patch
    }
}
