use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the webhook server.
    Serve,
    /// Register the mailbox watch subscription against a Pub/Sub topic.
    ///
    /// One-time administrative call; the webhook server assumes it has
    /// already been performed.
    Watch {
        /// Mailbox to watch (also the impersonated user).
        #[clap(long)]
        user: String,
        /// Fully qualified Pub/Sub topic, e.g. projects/my-project/topics/gmail-notifications.
        #[clap(long)]
        topic: String,
        /// Label to restrict the watch to; repeatable. Defaults to INBOX.
        #[clap(long = "label")]
        labels: Vec<String>,
    },
}
