#[tokio::main]
async fn main() {
    if let Err(e) = healthpass_lib::run().await {
        tracing::error!("Fatal: {e}");
        eprintln!("healthpass: {e}");
        std::process::exit(1);
    }
}
