//! Basic example demonstrating the Connect API client.
//!
//! Run with:
//! ```
//! CONNECT_SERVER=https://connect.example.com CONNECT_API_KEY=your-key cargo run --example basic
//! ```

use connectapi::{Client, Fetchable, Query, Queryable};

#[tokio::main]
async fn main() -> connectapi::Result<()> {
    // Initialize tracing for debugging (optional)
    tracing_subscriber::fmt::init();

    // Create client from environment variables
    println!("Creating Connect client...");
    let client = Client::from_env()?;
    println!("Server version: {}", client.server_version().await?);

    let me = client.me().await?;
    println!("Signed in as {} ({:?})", me.username()?, me.user_role()?);

    // Content owned by the current user
    println!("\n--- My Content ---");
    let mine = me.content()?;
    for item in mine.fetch().await? {
        println!("  - {} [{}]", item.name()?, item.app_mode()?);
    }

    // Narrow on the server by owner, then locally by app mode
    if let Some(item) = mine
        .find_one(Query::new().eq("app_mode", "python-streamlit"))
        .await?
    {
        println!("\n--- {} ---", item.name()?);
        println!("  URL: {}", item.content_url()?);

        let permissions = item.permissions()?;
        for permission in permissions.fetch().await? {
            println!(
                "  {:?} {} is {:?}",
                permission.principal_type()?,
                permission.principal_guid()?,
                permission.role()?
            );
        }

        match item.repository().await? {
            Some(repository) => println!("  Deploys from {}", repository.repository()?),
            None => println!("  Not deployed from git"),
        }
    }

    // Every user, across all pages
    println!("\n--- Users ---");
    let users = client.users()?;
    println!("Found {} users", users.count().await?);

    // Recent visits
    println!("\n--- Visits ---");
    let visits = client
        .visits()?
        .find(Query::new().eq("start", "2024-01-01T00:00:00Z"))
        .await?;
    for visit in visits.fetch().await?.iter().take(10) {
        println!("  {} at {}", visit.content_guid()?, visit.started()?);
    }

    Ok(())
}
