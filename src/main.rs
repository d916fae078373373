//! pm-gateway - validated queries and mutations against a project-management REST API

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use pm_gateway::{
    Error, Result,
    cli::{Cli, Command, OutputFormat},
    config::GatewayConfig,
    gateway::{Gateway, SearchRequest},
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let config = match GatewayConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let gateway = match Gateway::new(&config) {
        Ok(gateway) => gateway,
        Err(e) => {
            eprintln!("❌ Failed to initialize gateway: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&gateway, cli.command, cli.format).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(kind = ?e.kind(), "Command failed");
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(gateway: &Gateway, command: Command, format: OutputFormat) -> Result<()> {
    match command {
        Command::Types => emit(format, &gateway.get_valid_entity_types().await),
        Command::Inspect { entity_type } => {
            emit(format, &gateway.inspect_entity_type(&entity_type).await?)
        }
        Command::Search {
            entity_type,
            where_clause,
            include,
            take,
            skip,
            order_by,
        } => {
            let request = SearchRequest {
                entity_type,
                where_clause,
                include,
                take,
                skip,
                order_by,
                ..SearchRequest::default()
            };
            emit(format, &gateway.search_entities(&request).await?)
        }
        Command::Get {
            entity_type,
            id,
            include,
        } => emit(format, &gateway.get_entity(&entity_type, id, include.as_slice()).await?),
        Command::Create { entity_type, data } => {
            emit(format, &gateway.create_entity(&entity_type, &parse_data(&data)?).await?)
        }
        Command::Update {
            entity_type,
            id,
            data,
        } => emit(
            format,
            &gateway
                .update_entity(&entity_type, id, &parse_data(&data)?)
                .await?,
        ),
        Command::Comments { entity_id } => emit(format, &gateway.get_comments(entity_id).await?),
        Command::Comment {
            entity_id,
            text,
            parent,
        } => emit(format, &gateway.add_comment(entity_id, &text, parent).await?),
        Command::DeleteComment { comment_id } => {
            emit(format, &gateway.delete_comment(comment_id).await?)
        }
        Command::Attachment { attachment_id } => {
            emit(format, &gateway.get_attachment(attachment_id).await?)
        }
        Command::Download {
            attachment_id,
            output,
        } => {
            let attachment = gateway.download_attachment(attachment_id).await?;
            // Only the final component of a remote-supplied name is used
            let path = output.unwrap_or_else(|| {
                attachment
                    .name
                    .as_deref()
                    .and_then(|name| Path::new(name).file_name())
                    .map_or_else(
                        || PathBuf::from(format!("attachment-{attachment_id}")),
                        PathBuf::from,
                    )
            });
            tokio::fs::write(&path, &attachment.content).await?;
            println!(
                "✅ Saved {} bytes to {}",
                attachment.content.len(),
                path.display()
            );
            Ok(())
        }
    }
}

fn parse_data(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| Error::Validation(format!("Invalid JSON data: {e}")))
}

fn emit<T: Serialize + ?Sized>(format: OutputFormat, value: &T) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)
            .map_err(std::io::Error::other)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}
