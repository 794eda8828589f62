use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct UserArgs {
    /// Account the operation is scoped to.
    #[clap(short = 'u', long, default_value = "default")]
    pub user: String,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RemindArgs {
    /// Show the bookmark currently due for a revisit, if any.
    Next {
        #[clap(flatten)]
        user_args: UserArgs,
    },
    /// List every bookmark currently eligible for a reminder.
    List {
        #[clap(flatten)]
        user_args: UserArgs,
    },
    /// Print the due bookmark's url and snooze it for the cooldown period.
    Open {
        #[clap(flatten)]
        user_args: UserArgs,
    },
    /// Snooze the due bookmark without opening it.
    Later {
        #[clap(flatten)]
        user_args: UserArgs,
    },
    /// Stop reminding about the due bookmark permanently.
    Dismiss {
        #[clap(flatten)]
        user_args: UserArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start relink as a service.
    Daemon {},

    /// Save a bookmark
    Add {
        /// a url
        url: String,

        /// Bookmark title
        #[clap(short, long)]
        title: Option<String>,

        /// Bookmark category
        #[clap(short, long)]
        category: Option<String>,

        /// Bookmark description
        #[clap(short, long)]
        description: Option<String>,

        #[clap(flatten)]
        user_args: UserArgs,
    },

    /// Search bookmarks. Prefix the query with "ai:" to rank through the
    /// configured AI endpoint; an empty query lists everything.
    Search {
        /// Free-text query
        #[clap(default_value = "")]
        query: String,

        /// Print the count
        #[clap(short = 'c', long, default_value = "false")]
        count: bool,

        #[clap(flatten)]
        user_args: UserArgs,
    },

    /// Update a bookmark
    Update {
        /// Bookmark id
        id: u64,

        /// Bookmark title
        #[clap(short, long)]
        title: Option<String>,

        /// Bookmark category
        #[clap(short, long)]
        category: Option<String>,

        /// Bookmark description
        #[clap(short, long)]
        description: Option<String>,

        /// a url
        #[clap(long)]
        url: Option<String>,

        /// Turn revisit reminders back on for this bookmark
        #[clap(long, default_value = "false")]
        enable_reminders: bool,

        /// Turn revisit reminders off for this bookmark
        #[clap(long, default_value = "false", conflicts_with = "enable_reminders")]
        disable_reminders: bool,

        #[clap(flatten)]
        user_args: UserArgs,
    },

    /// Delete a bookmark
    Delete {
        /// Bookmark id
        id: u64,

        /// Auto confirm
        #[clap(short, long, default_value = "false")]
        yes: bool,

        #[clap(flatten)]
        user_args: UserArgs,
    },

    /// List a user's categories
    Categories {
        #[clap(flatten)]
        user_args: UserArgs,
    },

    /// Revisit reminders
    Remind {
        #[clap(subcommand)]
        action: RemindArgs,
    },
}
