use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        // We don't expect any CLI args, so always print the help
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Be explicit about which envars to print, so as to avoid accidentally exposing secrets
    const DISPLAY_ENVS: [&str; 13] = [
        "RUST_LOG",
        "SYNQ_HOST",
        "SYNQ_PORT",
        "SYNQ_DATABASE_URL",
        "SYNQ_SHOPIFY_API_VERSION",
        "SYNQ_SHOPIFY_TIMEOUT_SECS",
        "SYNQ_SHOPIFY_HMAC_CHECKS",
        "SYNQ_STRIPE_API_BASE",
        "SYNQ_STRIPE_TIMEOUT_SECS",
        "SYNQ_PLATFORM_FEE_BPS",
        "SYNQ_RETRY_MAX",
        "SYNQ_RETRY_INITIAL_DELAY_MS",
        "SYNQ_DEFAULT_CURRENCY",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
