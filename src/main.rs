mod cli;
mod ui;

use anyhow::{Context, Result, bail};
use clap::Parser;

use cli::{Cli, Command};
use gigboard::logging::{LogConfig, init_tracing};
use gigboard::pricing::parse_quantity;
use gigboard::{
    BoardConfig, BoardError, Datastore, JobId, JobService, JobStatus, MemoryDatastore,
    SheetsDatastore, StoreConfig, SubmitJob,
};
use ui::{Output, Spinner};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(LogConfig::from_env(cli.verbose));

    let config = BoardConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let output = Output::new(cli.json);

    let result = match cli.command {
        Command::Demo => run_demo(&config, &output).await,
        command => {
            let sheets = config.require_sheets()?;
            let datastore = SheetsDatastore::new(sheets, config.store.request_timeout())?;
            let service = JobService::from_config(datastore, &config);
            service.reconcile_schema().await?;
            run(&service, command, &output).await
        }
    };

    if let Err(err) = result {
        if let Some(board_err) = err.downcast_ref::<BoardError>() {
            output.error(board_err);
            std::process::exit(1);
        }
        return Err(err);
    }
    Ok(())
}

async fn run<D: Datastore>(service: &JobService<D>, command: Command, output: &Output) -> Result<()> {
    let spinner = Spinner::start("Talking to the job sheet...");
    let result = execute(service, command, output).await;
    spinner.finish();
    result
}

async fn execute<D: Datastore>(
    service: &JobService<D>,
    command: Command,
    output: &Output,
) -> Result<()> {
    match command {
        Command::Submit {
            name,
            phone,
            scheduled_at,
            description,
            quantity,
            note,
            cost,
        } => {
            let receipt = service
                .submit(SubmitJob {
                    customer_name: name,
                    customer_phone: phone,
                    scheduled_at,
                    description,
                    quantity: Some(parse_quantity(&quantity)?),
                    note,
                    cost_vnd: cost,
                })
                .await?;
            output.receipt(&receipt);
        }
        Command::List { status: None } => {
            let jobs = service.list_jobs().await?;
            output.jobs(&jobs);
        }
        Command::List {
            status: Some(status),
        } => {
            let board = service.board().await?;
            output.jobs(board.column(JobStatus::from(status)));
        }
        Command::Accept { id, name, phone } => {
            let job = service.accept(&JobId::from(id), &name, &phone).await?;
            output.job("Accepted", &job);
        }
        Command::Cancel { id } => {
            let job = service.cancel(&JobId::from(id)).await?;
            output.job("Cancelled", &job);
        }
        Command::Complete {
            id,
            rating,
            feedback,
        } => {
            let job = service.complete(&JobId::from(id), rating, feedback).await?;
            output.job("Completed", &job);
        }
        Command::Feedback { id, text, rating } => {
            let job = service.feedback(&JobId::from(id), rating, &text).await?;
            output.job("Feedback recorded", &job);
        }
        Command::Demo => bail!("demo runs against its own in-memory datastore"),
    }
    Ok(())
}

/// Walks a few jobs through their lifecycle on an in-memory sheet.
async fn run_demo(config: &BoardConfig, output: &Output) -> Result<()> {
    let mut config = config.clone();
    config.store = StoreConfig {
        append_retry_delay_ms: 200,
        ..config.store
    };
    let datastore = MemoryDatastore::new();
    let service = JobService::from_config(datastore.clone(), &config);
    service.reconcile_schema().await?;

    output.heading("Posting jobs");
    let posts = [
        ("Lan", "0911111111", "Queue for concert tickets", 3),
        ("Hoa", "0933333333", "Pick up dry cleaning", 1),
        ("Bao", "0944444444", "Hold a table at the night market", 2),
    ];
    let mut ids = Vec::new();
    for (i, (name, phone, description, quantity)) in posts.into_iter().enumerate() {
        if i == 1 {
            // The second post hits a transient datastore failure and is retried.
            datastore.fail_next_appends(1);
        }
        let receipt = service
            .submit(SubmitJob {
                customer_name: name.into(),
                customer_phone: phone.into(),
                scheduled_at: "2026-10-20 09:00".into(),
                description: description.into(),
                quantity: Some(quantity),
                ..Default::default()
            })
            .await?;
        output.receipt(&receipt);
        ids.push(receipt.id);
    }

    output.heading("Open board (contact details hidden)");
    output.jobs(&service.list_jobs().await?);

    output.heading("Two waiters race for the first job");
    let (first, second) = tokio::join!(
        service.accept(&ids[0], "Tu", "0900000000"),
        service.accept(&ids[0], "Minh", "0922222222"),
    );
    for result in [first, second] {
        match result {
            Ok(job) => output.job("Accepted", &job),
            Err(err) => output.error(&err),
        }
    }

    output.heading("Cancelling");
    output.job("Cancelled", &service.cancel(&ids[2]).await?);
    if let Err(err) = service.cancel(&ids[0]).await {
        output.error(&err);
    }

    output.heading("Completing");
    let done = service
        .complete(&ids[0], Some(5), Some("Got front-row seats".into()))
        .await?;
    output.job("Completed", &done);

    output.heading("Final board");
    output.board(&service.board().await?);
    Ok(())
}
