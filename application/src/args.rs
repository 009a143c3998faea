//! [`Args`] definitions.

use clap::{Parser, Subcommand};
use session::domain::Role;

/// Command line client of the dish catalog.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,

    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Parses command line arguments.
    ///
    /// # Errors
    ///
    /// Errors if failed to parse command line arguments.
    pub fn parse() -> Result<Self, clap::Error> {
        <Self as Parser>::try_parse()
    }
}

/// Command of the client.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Registers a new user.
    Register {
        /// Email address of the new user.
        #[arg(long)]
        email: String,

        /// Username of the new user.
        #[arg(long)]
        username: String,

        /// Password of the new user.
        #[arg(long)]
        password: String,
    },

    /// Signs in, starting a new session.
    Login {
        /// Email address of the user.
        #[arg(long)]
        email: String,

        /// Password of the user.
        #[arg(long)]
        password: String,
    },

    /// Signs out of the current session.
    Logout,

    /// Prints the signed-in user.
    Whoami,

    /// Manages users.
    #[command(subcommand)]
    Users(Users),

    /// Sends an authenticated `GET` request to the provided API path.
    Get {
        /// Path relative to the API base URL.
        path: String,
    },
}

/// Command managing users.
#[derive(Debug, Subcommand)]
pub enum Users {
    /// Lists all the users.
    List,

    /// Prints the user with the provided ID.
    Get {
        /// ID of the user.
        id: i64,
    },

    /// Updates the profile of the user with the provided ID.
    Update {
        /// ID of the user.
        id: i64,

        /// New email address.
        #[arg(long)]
        email: Option<String>,

        /// New username.
        #[arg(long)]
        username: Option<String>,

        /// New password.
        #[arg(long)]
        password: Option<String>,
    },

    /// Changes the role of the user with the provided ID.
    Role {
        /// ID of the user.
        id: i64,

        /// New role (`ADMIN` or `USER`).
        role: Role,
    },

    /// Deletes the user with the provided ID.
    Delete {
        /// ID of the user.
        id: i64,
    },
}
