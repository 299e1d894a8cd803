#[tokio::main]
async fn main() {
    let code = hookwork::app::startup::startup().await;
    std::process::exit(code);
}
