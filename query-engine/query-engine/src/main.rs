use query_engine::{
    cli::{CliCommand, EngineContext},
    error::EngineError,
    logger::{self, Logger},
    opt::EngineOpt,
};
use std::{error::Error, process};
use structopt::StructOpt;

type AnyError = Box<dyn Error + Send + Sync + 'static>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    return main().await.map_err(|err| {
        tracing::info!("Encountered error during initialization:");

        if let Err(render_err) = err.render_as_json() {
            eprintln!("Failed to render error: {render_err}");
        }

        process::exit(1)
    });

    async fn main() -> Result<(), EngineError> {
        let opts = EngineOpt::from_args();

        let mut logger = Logger::new("query-engine");
        logger.log_format(opts.log_format);
        logger.install()?;

        logger::set_panic_hook(opts.log_format);

        let command = CliCommand::from_opt(&opts)?;
        let context = EngineContext::load(&opts).await?;

        println!("{}", command.execute(&context).await?);

        Ok(())
    }
}
