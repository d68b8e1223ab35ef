#[tokio::main]
async fn main() {
    if let Err(e) = shoutback::cli::run_cli().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
