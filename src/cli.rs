use crate::app::AssistantApp;
use crate::assistant::Assistant;
use crate::config::{Config, DatabaseConnection};
use crate::db::Database;
use crate::llm::LlamaClient;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "db-assistant")]
#[command(about = "Ask questions about a PostgreSQL database in plain language", long_about = None)]
pub struct Cli {
    /// Saved connection profile to use
    #[arg(short, long, global = true)]
    connection: Option<String>,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true, global = true)]
    database_url: Option<String>,

    /// Require TLS for --database-url
    #[arg(long, global = true)]
    ssl: bool,

    /// Schema to analyze
    #[arg(long, global = true)]
    schema: Option<String>,

    /// Host of the completion service
    #[arg(long, env = "LLM_HOST", global = true)]
    llm_host: Option<String>,

    /// Port of the completion service
    #[arg(long, env = "LLM_PORT", global = true)]
    llm_port: Option<u16>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive session (default)
    Repl,
    /// Print the schema description
    Schema,
    /// Print the schema brief sent to the model
    Brief,
    /// Answer a single question
    Ask {
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Run SQL directly
    Sql { query: String },
    /// Manage saved connection profiles
    Connection {
        #[command(subcommand)]
        action: ConnectionCommands,
    },
}

#[derive(Subcommand)]
enum ConnectionCommands {
    /// Add or replace a profile
    Add {
        name: String,
        #[arg(long, default_value = "localhost")]
        host: String,
        #[arg(long, default_value_t = 5432)]
        port: u16,
        #[arg(long, default_value = "postgres")]
        user: String,
        #[arg(long, default_value = "")]
        password: String,
        #[arg(long, default_value = "postgres")]
        database: String,
        #[arg(long)]
        ssl: bool,
    },
    /// List saved profiles
    List,
    /// Remove a profile
    Remove { name: String },
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let mut config = Config::load().unwrap_or_else(|e| {
            tracing::warn!("could not read config, using defaults: {}", e);
            Config::new()
        });

        if let Some(Commands::Connection { action }) = self.command {
            return manage_connections(&mut config, action);
        }

        if let Some(host) = &self.llm_host {
            config.llm.host = host.clone();
        }
        if let Some(port) = self.llm_port {
            config.llm.port = port;
        }
        if let Some(schema) = &self.schema {
            config.analysis.schema = schema.clone();
        }

        let (connection_string, ssl) =
            config.resolve_connection(self.connection.as_deref(), self.database_url.as_deref(), self.ssl)?;
        if self.connection.is_some() {
            config.save()?;
        }

        let database = Database::connect(&connection_string, ssl, &config.analysis.schema)
            .await
            .context("Failed to connect to database")?;
        let model = LlamaClient::new(&config.llm)?;
        tracing::debug!("using completion endpoint {}", model.url());

        let mut app = AssistantApp::new(Assistant::new(database, model, config.analysis.clone()));
        let mut stdout = std::io::stdout();
        app.analyze(&mut stdout).await?;

        match self.command {
            None | Some(Commands::Repl) => app.run().await?,
            Some(Commands::Schema) => print!("{}", app.session().description()),
            Some(Commands::Brief) => print!("{}", app.session().brief()),
            Some(Commands::Ask { question }) => {
                app.handle_line(&question.join(" "), &mut stdout).await?;
                exit_on_failure(&app)?;
            }
            Some(Commands::Sql { query }) => {
                app.handle_line(&format!(":sql {}", query), &mut stdout).await?;
                exit_on_failure(&app)?;
            }
            Some(Commands::Connection { .. }) => {}
        }
        Ok(())
    }
}

fn exit_on_failure<B, M>(app: &AssistantApp<B, M>) -> Result<()>
where
    B: crate::db::Backend,
    M: crate::llm::CompletionModel,
{
    match app.session().history().get(0) {
        Some(entry) if entry.succeeded() => Ok(()),
        Some(entry) => anyhow::bail!("query failed: {}", entry.error.clone().unwrap_or_default()),
        None => anyhow::bail!("no query was run"),
    }
}

fn manage_connections(config: &mut Config, action: ConnectionCommands) -> Result<()> {
    match action {
        ConnectionCommands::Add {
            name,
            host,
            port,
            user,
            password,
            database,
            ssl,
        } => {
            let index = config.upsert_connection(DatabaseConnection {
                name: name.clone(),
                host,
                port,
                user,
                password,
                database,
                ssl,
            });
            config.last_connection_index = Some(index);
            config.save()?;
            println!("Saved connection '{}'", name);
        }
        ConnectionCommands::List => {
            if config.connections.is_empty() {
                println!("No saved connections.");
            }
            for (index, conn) in config.connections.iter().enumerate() {
                let marker = if config.last_connection_index == Some(index) { "*" } else { " " };
                println!(
                    "{} {} ({}@{}:{}/{}{})",
                    marker,
                    conn.name,
                    conn.user,
                    conn.host,
                    conn.port,
                    conn.database,
                    if conn.ssl { ", ssl" } else { "" }
                );
            }
        }
        ConnectionCommands::Remove { name } => {
            let index = config
                .find_connection(&name)
                .ok_or_else(|| anyhow::anyhow!("No saved connection named '{}'", name))?;
            config.delete_connection(index);
            config.save()?;
            println!("Removed connection '{}'", name);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask_with_global_options() {
        let cli = Cli::try_parse_from([
            "db-assistant",
            "ask",
            "how",
            "many",
            "orders",
            "--llm-port",
            "9000",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.llm_port, Some(9000));
        match cli.command {
            Some(Commands::Ask { question }) => assert_eq!(question.join(" "), "how many orders"),
            _ => panic!("expected ask"),
        }
    }

    #[test]
    fn test_add_connection_defaults() {
        let cli = Cli::try_parse_from(["db-assistant", "connection", "add", "local"]).unwrap();
        match cli.command {
            Some(Commands::Connection {
                action: ConnectionCommands::Add { port, host, ssl, .. },
            }) => {
                assert_eq!(port, 5432);
                assert_eq!(host, "localhost");
                assert!(!ssl);
            }
            _ => panic!("expected connection add"),
        }
    }
}
