//! The Services Domain API.

use color_eyre::eyre::WrapErr;
use services_api::{
    infra::{config, database, logging, shutdown},
    lifecycle::Lifecycle,
    startup,
};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let _guard = logging::init_logging();

    // Fatal startup errors are logged, then reported by color_eyre with a failing exit status.
    startup::launch(
        Lifecycle::new(),
        config::load_config,
        |url| async move { database::connect(&url).await },
        shutdown::termination_signal(),
    )
    .await
    .wrap_err("service failed")
}
