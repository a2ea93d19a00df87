use mirakurun_relay::common::configuration::get_configuration;
use mirakurun_relay::common::errors::RelayError;
use mirakurun_relay::common::telemetry::{get_subscriber, init_tracing_subscriber};
use mirakurun_relay::startup::Application;

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    let subscriber = get_subscriber("mirakurun-relay".into(), "info".into(), std::io::stdout);
    init_tracing_subscriber(subscriber);

    let configuration = get_configuration().map_err(|err| {
        tracing::error!(error = %err, "Failed to read configuration");
        err
    })?;

    Application::build(configuration)?.run_until_stopped().await
}
