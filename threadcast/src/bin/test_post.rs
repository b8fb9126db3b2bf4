use threadcast::social::oauth::OAuthCredentials;
use threadcast::social::x::{XClient, DEFAULT_API_BASE, DEFAULT_TIMEOUT};
use threadcast::social::SocialClient;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let credentials = OAuthCredentials::from_env(&common::XConfig::default())
        .expect("Set X_API_KEY, X_API_SECRET, X_ACCESS_TOKEN and X_ACCESS_TOKEN_SECRET");

    let api_base = std::env::var("X_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
    let text = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Hello world from threadcast!".to_string());

    println!("\n{}", "=".repeat(60));
    println!("Testing X credentials");
    println!("API base: {}", api_base);
    println!("{}", "=".repeat(60));

    let client = XClient::new(&api_base, credentials, DEFAULT_TIMEOUT).expect("Failed to build HTTP client");

    println!("\n[Test 1] Verifying credentials...");
    match client.get_me().await {
        Ok(user) => {
            println!("✓ Authenticated as @{} ({})", user.username, user.name);
        }
        Err(e) => {
            eprintln!("✗ Failed: {}", e);
            std::process::exit(1);
        }
    }

    println!("\n[Test 2] Posting \"{}\"...", text);
    match client.create_post(&text, None, None).await {
        Ok(id) => {
            println!("✓ Post published! ID: {}", id);
        }
        Err(e) => {
            eprintln!("✗ Failed: {}", e);
            std::process::exit(1);
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("Tests completed");
    println!("{}", "=".repeat(60));
}
