use breedscan_lib::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    breedscan_lib::init_logging();

    let config = AppConfig::from_env();
    config
        .validate()
        .map_err(|err| anyhow::anyhow!("Invalid configuration: {err}"))?;

    breedscan_lib::run(config).await
}
