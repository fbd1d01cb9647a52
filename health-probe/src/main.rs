mod cli;

use anyhow::Context as _;
use clap::Parser;
use telemetry_health::{
    rules::{build_catalog, render_rule_file},
    FlowProber, HealthChecker, KubeWorkloadReader, PrometheusAlertGetter, SelfMonitorConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    match cli::Args::parse() {
        cli::Args::Rules => print_rules(),
        cli::Args::Probe(args) => probe(args).await,
    }
}

fn print_rules() -> anyhow::Result<()> {
    let yaml = render_rule_file(&build_catalog())
        .to_yaml()
        .context("failed to render rule file")?;
    print!("{}", yaml);
    Ok(())
}

async fn probe(args: cli::Probe) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => SelfMonitorConfig::load(path)?,
        None => SelfMonitorConfig::default(),
    };
    tracing::info!("Connecting to kube");
    let client = kube::Client::try_default()
        .await
        .context("failed to create kube client")?;

    let getter = PrometheusAlertGetter::new(&config.prometheus_url());
    tracing::info!(url = getter.url(), "Querying alerts");
    let checker = HealthChecker::new(
        KubeWorkloadReader::new(client),
        FlowProber::new(args.kind, getter).with_timeout(config.alert_query_timeout()),
        config.workload_for(args.kind),
    );
    let conditions = checker.check(&args.pipeline).await;
    let out = serde_json::to_string_pretty(&conditions).context("failed to serialize conditions")?;
    println!("{}", out);
    Ok(())
}
