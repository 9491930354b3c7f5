use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use usp_console::cli::{self, Cli};
use usp_console::sdk::{CompletionSignal, ConsoleSink, EventSink, Payload, StreamDriver, TurnOutcome};
use usp_console::{Result, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let status = cli::parse_failure_status(&err, &mut std::io::stdout());
            let _ = err.print();
            return ExitCode::from(status);
        }
    };
    logging::init(cli.log_level.as_deref());

    let result = run(&cli).await;
    ExitCode::from(cli::report_status(&result, &mut std::io::stdout()))
}

async fn run(cli: &Cli) -> Result<TurnOutcome> {
    let invocation = cli.resolve()?;
    let payload = Payload::load(invocation.payload_kind, &invocation.file).await?;

    let completion = CompletionSignal::new();
    let sink: Arc<dyn EventSink> = Arc::new(ConsoleSink::stdout(completion.clone()));
    let session = invocation.session.open(Arc::clone(&sink))?;

    let mut driver = StreamDriver::new(session, completion).with_pacing(invocation.pacing);
    driver.run(&invocation.session, &sink, &payload).await
}
