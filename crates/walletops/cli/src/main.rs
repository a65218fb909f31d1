//! `wops` binary entry point.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match walletops_cli::run().await {
        Ok(()) => Ok(()),
        Err(e) => match e.exit_code() {
            0 => {
                walletops_cli::print_error(&e.to_string());
                Ok(())
            }
            1 => Err(e.into()),
            code => {
                walletops_cli::print_error(&e.to_string());
                std::process::exit(code)
            }
        },
    }
}
