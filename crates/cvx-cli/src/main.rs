//! 🚀 cvx-cli — the front door, the bouncer, the maitre d' of cinevex.
//!
//! 🎬 *[narrator voice]* "It all started with a simple main() function..."
//! 📦 This binary crate is the thin CLI wrapper that loads config,
//! sets up logging, and then lets the real code do the heavy lifting.
//! Like a manager. 🦆

use anyhow::{Context, Result};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// 🚀 main() — where it all begins.
///
/// 🔧 Steps:
/// 1. Init tracing (so we can see what goes wrong, and when)
/// 2. Take an optional config-file path as the first argument
/// 3. Load config (the moment of truth)
/// 4. Run the sync loop (send it and pray 🙏)
/// 5. Handle errors (cry, but with structure)
#[tokio::main]
async fn main() -> Result<()> {
    // 📡 Set up tracing — because println! debugging is a lifestyle choice
    // we're trying to move past, like flip phones and cargo shorts
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 🎯 First arg is the config file, default: the ol' reliable
    let args: Vec<String> = std::env::args().collect();
    let path_arg = args.get(1).map(String::as_str).unwrap_or("cvx.toml");

    // 🔒 Validate the config file exists before we get too emotionally attached.
    // A missing DEFAULT file is fine (env-only config is a valid lifestyle);
    // a missing EXPLICIT file is a typo someone should hear about.
    let config_file = std::path::Path::new(path_arg);
    let config_file_if_present = match config_file.try_exists().context(format!(
        "💀 Couldn't even check whether the config file exists. Maybe a pwd/relative-path \
         situation — use an absolute path to be absolutely certain. Was checking: '{}'",
        config_file.display()
    ))? {
        true => Some(config_file),
        false if args.len() > 1 => anyhow::bail!(
            "💀 Config file '{}' was named explicitly but doesn't exist. \
             The file exists in our hearts, but apparently not on disk.",
            config_file.display()
        ),
        false => None, // 💤 no cvx.toml, env vars it is
    };

    // 🔧 The moment where we find out if the TOML is valid or if someone
    // put a tab where a space should be (looking at you, Kevin)
    let app_config = cvx::app_config::load_config(config_file_if_present)
        .context("💀 Couldn't load the configuration. Take a look at the file and the CVX_* env vars.")?;

    // 🚀 SEND IT. This loop does not come back with good news; it only
    // comes back with news.
    let result = cvx::run(app_config).await;

    // 💀 Error handling: the part where we find out what went wrong
    // and print it in a way that's helpful at 3am
    if let Err(err) = result {
        error!("💀 error: {}", err);
        // -- 🧅 peel the onion of sadness, one tear-jerking layer at a time
        let mut the_vibes_are_giving_connection_issues = false;
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
            // -- 🕵️ sniff the cause like a truffle pig hunting for connection problems
            let cause_str = cause.to_string();
            if cause_str.contains("error sending request")
                || cause_str.contains("connection refused")
                || cause_str.contains("Connection refused")
                || cause_str.contains("tcp connect error")
                || cause_str.contains("dns error")
                || cause_str.contains("connection fault")
            {
                the_vibes_are_giving_connection_issues = true;
            }
        }

        // -- 📡 if it smells like a connection problem, it's probably a connection problem
        if the_vibes_are_giving_connection_issues {
            error!(
                "🔧 hint: looks like a service isn't reachable. \
                Double-check that Postgres, Elasticsearch, and Redis are actually running. \
                If you're using Docker, try: `docker ps` to see what's up, or \
                `docker compose up -d` to resurrect it. Even servers need a nudge sometimes. ☕"
            );
        }

        // 🗑️ Exit with prejudice. Process exitus maximus.
        std::process::exit(1);
    }

    // ✅ Unreachable in practice — the loop runs until the process dies —
    // but the compiler likes closure and honestly, same.
    Ok(())
}
