#[tokio::main]
async fn main() -> std::process::ExitCode {
    prosthetics_portal::init_tracing();

    match prosthetics_portal::run().await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            std::process::ExitCode::FAILURE
        }
    }
}
