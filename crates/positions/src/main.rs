#[tokio::main]
async fn main() {
    positions::start(std::env::args()).await;
}
