fn main() -> anyhow::Result<()> {
    restmount::telemetry::init_tracing(None);
    restmount::cli::run_cli()
}
