use clap::Parser;
use std::path::PathBuf;
use telemetry_health::PipelineKind;

#[derive(Parser, Debug)]
#[clap(about = "Diagnoses the health of telemetry pipelines")]
pub(crate) enum Args {
    /// Prints the alert rule file loaded by the self-monitor
    Rules,
    /// Probes a pipeline and prints its conditions
    Probe(Probe),
}

#[derive(Parser, Debug)]
pub(crate) struct Probe {
    /// Pipeline kind: metric, trace or log
    #[clap(long)]
    pub(crate) kind: PipelineKind,
    /// Name of the pipeline
    #[clap(long)]
    pub(crate) pipeline: String,
    /// YAML file with self-monitor and workload locations.
    /// Built-in defaults are used when omitted.
    #[clap(long)]
    pub(crate) config: Option<PathBuf>,
}
