//! Interface de terminal do gigboard: spinners e saída colorida.
//!
//! Usa `indicatif` para o spinner durante chamadas ao datastore e `console`
//! para estilizar o status de cada job.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use gigboard::pricing::format_usd;
use gigboard::state_machine::format_timestamp;
use gigboard::{Board, BoardError, Job, JobStatus, SubmitReceipt};

/// Spinner exibido enquanto uma operação remota está em andamento.
pub struct Spinner {
    pb: ProgressBar,
}

impl Spinner {
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Self { pb }
    }

    pub fn finish(self) {
        self.pb.finish_and_clear();
    }
}

/// Saída do terminal: texto estilizado ou JSON.
pub struct Output {
    json: bool,
    green: Style,
    red: Style,
    yellow: Style,
    dim: Style,
    bold: Style,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            dim: Style::new().dim(),
            bold: Style::new().bold(),
        }
    }

    fn print_json<T: Serialize>(&self, value: &T) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }

    fn status_style(&self, status: JobStatus) -> &Style {
        match status {
            JobStatus::Available => &self.green,
            JobStatus::InProgress | JobStatus::WaitingFeedback => &self.yellow,
            JobStatus::Completed => &self.bold,
            JobStatus::Cancelled => &self.dim,
        }
    }

    pub fn receipt(&self, receipt: &SubmitReceipt) {
        if self.json {
            return self.print_json(receipt);
        }
        println!(
            "  {} Job added: {} ({} VND ≈ ${})",
            self.green.apply_to("✓"),
            receipt.id,
            receipt.cost_vnd,
            format_usd(receipt.cost_usd)
        );
    }

    pub fn job(&self, action: &str, job: &Job) {
        if self.json {
            return self.print_json(job);
        }
        println!(
            "  {} {action}: {} is now {}",
            self.green.apply_to("✓"),
            job.id,
            self.status_style(job.status).apply_to(job.status)
        );
    }

    pub fn jobs(&self, jobs: &[Job]) {
        if self.json {
            return self.print_json(&jobs);
        }
        if jobs.is_empty() {
            println!("  {}", self.dim.apply_to("(no jobs)"));
        }
        for job in jobs {
            self.job_card(job);
        }
    }

    pub fn board(&self, board: &Board) {
        if self.json {
            return self.print_json(board);
        }
        for status in [
            JobStatus::Available,
            JobStatus::InProgress,
            JobStatus::WaitingFeedback,
            JobStatus::Completed,
            JobStatus::Cancelled,
        ] {
            let column = board.column(status);
            if column.is_empty() {
                continue;
            }
            println!(
                "{} ({})",
                self.status_style(status).apply_to(format!("── {status} ──")),
                column.len()
            );
            for job in column {
                self.job_card(job);
            }
        }
    }

    fn job_card(&self, job: &Job) {
        println!(
            "  {} [{}] {}",
            self.bold.apply_to(&job.id),
            self.status_style(job.status).apply_to(job.status),
            job.description
        );
        println!(
            "    {} x{} · {} VND (${}) · {}",
            job.scheduled_at,
            job.quantity,
            job.cost_vnd,
            format_usd(job.cost_usd),
            self.dim
                .apply_to(format!("posted {}", format_timestamp(&job.created_at)))
        );
        println!("    customer: {} {}", job.customer_name, job.customer_phone);
        if let (Some(name), Some(phone)) = (&job.waiter_name, &job.waiter_phone) {
            println!("    waiter:   {name} {phone}");
        }
        if let Some(rating) = job.rating {
            println!("    rating:   {} ({rating})", "★".repeat(rating as usize));
        }
        if let Some(feedback) = &job.feedback {
            println!("    feedback: {}", self.dim.apply_to(feedback));
        }
        if !job.note.is_empty() {
            println!("    note:     {}", job.note);
        }
    }

    pub fn error(&self, err: &BoardError) {
        if self.json {
            return self.print_json(&serde_json::json!({
                "error": err.kind(),
                "message": err.to_string(),
            }));
        }
        eprintln!(
            "  {} {}: {err}",
            self.red.apply_to("✗"),
            self.red.apply_to(err.kind())
        );
    }

    pub fn heading(&self, text: &str) {
        if !self.json {
            println!();
            println!("{}", self.bold.apply_to(text));
        }
    }
}
