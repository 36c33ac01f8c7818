use clap::Subcommand;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Create a user with a given role
    CreateUser {
        /// SQLite database path or sqlite:// URL
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,

        /// Username for the new user
        #[arg(long)]
        username: Option<String>,

        /// Role: admin, manager, or executor
        #[arg(long)]
        role: Option<String>,

        /// Password (prompted for when omitted)
        #[arg(long, env = "TASKDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Username of the user's manager
        #[arg(long)]
        manager: Option<String>,

        /// Skip interactive prompts (requires --username and --password)
        #[arg(long)]
        non_interactive: bool,
    },

    /// List registered users
    ListUsers {
        /// SQLite database path or sqlite:// URL
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
