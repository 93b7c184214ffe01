use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use caretalk_provision::{ProvisionRequest, channel_id_for, post_patient_message, provision};
use caretalk_stream::{Config, StreamClient};

const DEFAULT_TARGET_USER_ID: &str = "D0Vf1d6AaRPSGqITkVeL44aQAuF3";
const DEFAULT_MESSAGE: &str = "Hello from doctor_main";
const DEFAULT_TARGET_USER_NAME: &str = "NA";

#[derive(Parser)]
#[command(
    name = "caretalk",
    version,
    about = "Provision doctor/patient chat threads in the hosted chat backend",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    provision: ProvisionArgs,
}

#[derive(Args)]
struct ProvisionArgs {
    /// Target (patient) user id
    #[arg(default_value = DEFAULT_TARGET_USER_ID)]
    target_user_id: String,

    /// Message posted by the doctor
    #[arg(default_value = DEFAULT_MESSAGE)]
    message: String,

    /// Push device id; empty skips device registration
    #[arg(default_value = "")]
    device_id: String,

    /// Target user display name
    #[arg(default_value = DEFAULT_TARGET_USER_NAME)]
    target_user_name: String,

    /// Device platform (iOS or Android); anything else skips the device step
    #[arg(default_value = "")]
    platform: String,
}

#[derive(Subcommand)]
enum Command {
    /// Post a message into the user's thread, attributed to the user
    SendAsUser {
        user_id: String,
        user_name: String,
        message: String,
    },
    /// Mint a client-side auth token for a user
    Token { user_id: String },
    /// Delete every channel in the backend, page by page
    PurgeChannels,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caretalk_provision=info,caretalk_stream=info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Credentials are checked before any remote call is attempted.
    let config = Config::from_env().context("loading chat backend credentials")?;
    let client = StreamClient::new(config)?;

    match cli.command {
        None => {
            let args = cli.provision;
            let req = ProvisionRequest {
                target_user_id: args.target_user_id,
                target_user_name: args.target_user_name,
                message: args.message,
                device_id: args.device_id,
                platform: args.platform,
            };
            let summary = provision(&client, &req).await?;

            println!("Setup completed successfully");
            println!();
            println!("Summary:");
            println!("  user id:   {}", req.target_user_id);
            println!("  user name: {}", req.target_user_name);
            println!("  channel:   {}:{}", client.channel_type(), summary.channel_id);
            println!("  message:   \"{}\"", req.message);
        }
        Some(Command::SendAsUser { user_id, user_name, message }) => {
            let posted = post_patient_message(&client, &user_id, &user_name, &message).await?;
            println!(
                "message {} sent to {}:{}",
                posted.id,
                client.channel_type(),
                channel_id_for(&user_id)
            );
        }
        Some(Command::Token { user_id }) => {
            println!("{}", client.mint_user_token(&user_id)?);
        }
        Some(Command::PurgeChannels) => {
            let deleted = client.delete_all_channels().await?;
            println!("deleted {deleted} channels");
        }
    }

    Ok(())
}
