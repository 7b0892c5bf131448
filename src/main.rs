fn main() -> anyhow::Result<()> {
    courseapm::cli::run_cli()
}
