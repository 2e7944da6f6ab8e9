//! Print an Argon2id PHC hash for provisioning a user
//!
//! ```text
//! hash_password 'new password'
//! echo 'new password' | hash_password
//! ```
//!
//! Honors `AUTH_PASSWORD_PEPPER` the same way the server does.

use anyhow::Context;
use auth::models::{RawPassword, UserPassword};
use std::env;
use std::io::{self, BufRead};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let raw = match env::args().nth(1) {
        Some(arg) => arg,
        None => {
            let mut line = String::new();
            io::stdin()
                .lock()
                .read_line(&mut line)
                .context("failed to read password from stdin")?;
            line
        }
    };

    let password = RawPassword::for_storage(raw.trim_end_matches(['\r', '\n']))?;
    let pepper = env::var("AUTH_PASSWORD_PEPPER").ok().filter(|p| !p.is_empty());

    let hash = UserPassword::hash(&password, pepper.as_deref().map(str::as_bytes))?;
    println!("{}", hash.as_phc_string());

    Ok(())
}
