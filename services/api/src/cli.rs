use crate::commands::{
    run_contract_render, run_receipt_import, ContractRenderArgs, ReceiptImportArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use regulariza::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Regulariza",
    about = "Run the land-regularization back office or its offline document tools",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Payment receipt tools
    Receipts {
        #[command(subcommand)]
        command: ReceiptsCommand,
    },
    /// Adjudication contract tools
    Contracts {
        #[command(subcommand)]
        command: ContractsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ReceiptsCommand {
    /// Check a receipts workbook and print the import report without a server
    Import(ReceiptImportArgs),
}

#[derive(Subcommand, Debug)]
enum ContractsCommand {
    /// Render a contract PDF from a JSON description of the parties and property
    Render(ContractRenderArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Username of the administrator account created at startup
    #[arg(long, default_value = crate::infra::BOOTSTRAP_ADMIN)]
    pub(crate) admin: String,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or_else(|| {
        Command::Serve(ServeArgs {
            admin: crate::infra::BOOTSTRAP_ADMIN.to_string(),
            ..ServeArgs::default()
        })
    });

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Receipts {
            command: ReceiptsCommand::Import(args),
        } => run_receipt_import(args),
        Command::Contracts {
            command: ContractsCommand::Render(args),
        } => run_contract_render(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn receipt_import_accepts_a_policy() {
        let cli = Cli::try_parse_from([
            "regulariza-api",
            "receipts",
            "import",
            "recibos.xlsx",
            "--policy",
            "skip",
        ])
        .expect("parse");
        match cli.command {
            Some(Command::Receipts {
                command: ReceiptsCommand::Import(args),
            }) => {
                assert_eq!(args.file.to_str(), Some("recibos.xlsx"));
                assert_eq!(args.policy, regulariza::receipts::ImportPolicy::SkipInvalid);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn serve_defaults_the_bootstrap_admin() {
        let cli = Cli::try_parse_from(["regulariza-api", "serve", "--port", "8080"]).expect("parse");
        match cli.command {
            Some(Command::Serve(args)) => {
                assert_eq!(args.port, Some(8080));
                assert_eq!(args.admin, "admin");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
