//! Interface de linha de comando do gigboard baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (submit, list, accept,
//! cancel, complete, feedback, demo) e flags globais (--config, --json,
//! --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use gigboard::JobStatus;

/// gigboard — quadro de pequenos trabalhos pagos.
#[derive(Debug, Parser)]
#[command(name = "gigboard", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./gigboard.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Imprime resultados como JSON.
    #[arg(long, global = true, default_value_t = false)]
    pub json: bool,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Filtro de status aceito pela CLI, mapeado para [`JobStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Available,
    InProgress,
    WaitingFeedback,
    Completed,
    Cancelled,
}

impl From<StatusArg> for JobStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Available => JobStatus::Available,
            StatusArg::InProgress => JobStatus::InProgress,
            StatusArg::WaitingFeedback => JobStatus::WaitingFeedback,
            StatusArg::Completed => JobStatus::Completed,
            StatusArg::Cancelled => JobStatus::Cancelled,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Publica um novo job.
    Submit {
        /// Nome do cliente.
        #[arg(long)]
        name: String,

        /// Telefone do cliente.
        #[arg(long)]
        phone: String,

        /// Data e hora combinadas para o serviço.
        #[arg(long = "at")]
        scheduled_at: String,

        /// O que precisa ser feito.
        #[arg(long)]
        description: String,

        /// Quantidade de itens (inteiro >= 1).
        #[arg(long, default_value = "1")]
        quantity: String,

        #[arg(long)]
        note: Option<String>,

        /// Custo proposto em VND (modelo de preço por faixa).
        #[arg(long)]
        cost: Option<i64>,
    },

    /// Lista os jobs, com dados pessoais ocultos nos jobs abertos.
    List {
        /// Mostra apenas uma coluna do quadro.
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
    },

    /// Aceita um job disponível.
    Accept {
        id: String,
        /// Nome do atendente.
        name: String,
        /// Telefone do atendente.
        phone: String,
    },

    /// Cancela um job que ainda não foi aceito.
    Cancel { id: String },

    /// Marca um job em andamento como concluído.
    Complete {
        id: String,

        /// Nota de 1 a 5; valores fora da faixa são ignorados.
        #[arg(long)]
        rating: Option<i64>,

        #[arg(long)]
        feedback: Option<String>,
    },

    /// Envia o feedback de um job aguardando avaliação.
    Feedback {
        id: String,

        /// Texto do feedback.
        text: String,

        #[arg(long)]
        rating: Option<i64>,
    },

    /// Executa a demonstração embutida sobre um datastore em memória.
    Demo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_submit_subcommand() {
        let cli = Cli::parse_from([
            "gigboard",
            "submit",
            "--name",
            "Lan",
            "--phone",
            "0911111111",
            "--at",
            "2026-10-20 09:00",
            "--description",
            "queue for tickets",
            "--quantity",
            "3",
        ]);
        match cli.command {
            Command::Submit {
                name,
                quantity,
                note,
                cost,
                ..
            } => {
                assert_eq!(name, "Lan");
                assert_eq!(quantity, "3");
                assert!(note.is_none());
                assert!(cost.is_none());
            }
            _ => panic!("expected Submit command"),
        }
    }

    #[test]
    fn cli_parses_accept_positionals() {
        let cli = Cli::parse_from(["gigboard", "accept", "job-1", "Tu", "0900000000"]);
        match cli.command {
            Command::Accept { id, name, phone } => {
                assert_eq!(id, "job-1");
                assert_eq!(name, "Tu");
                assert_eq!(phone, "0900000000");
            }
            _ => panic!("expected Accept command"),
        }
    }

    #[test]
    fn cli_parses_global_flags_and_status_filter() {
        let cli = Cli::parse_from([
            "gigboard",
            "--json",
            "--verbose",
            "--config",
            "board.toml",
            "list",
            "--status",
            "in-progress",
        ]);
        assert!(cli.json);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("board.toml")));
        match cli.command {
            Command::List { status } => {
                assert_eq!(status.map(JobStatus::from), Some(JobStatus::InProgress));
            }
            _ => panic!("expected List command"),
        }
    }

    #[test]
    fn cli_parses_complete_with_rating() {
        let cli = Cli::parse_from(["gigboard", "complete", "job-1", "--rating", "6"]);
        match cli.command {
            Command::Complete { rating, feedback, .. } => {
                assert_eq!(rating, Some(6));
                assert!(feedback.is_none());
            }
            _ => panic!("expected Complete command"),
        }
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
