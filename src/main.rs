use mvc::presentation::cli::CliApp;

#[tokio::main]
async fn main() {
    let code = CliApp::run().await;
    std::process::exit(code);
}
