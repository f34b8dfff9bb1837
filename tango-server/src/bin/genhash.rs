//! Print the argon2 hash of a password, for seeding users by hand:
//!
//! ```text
//! cargo run --bin genhash -- 'secreto123'
//! ```

fn main() {
    let Some(password) = std::env::args().nth(1) else {
        eprintln!("usage: genhash <password>");
        std::process::exit(2);
    };

    match tango_server::services::auth::hash_password(&password) {
        Ok(hash) => println!("{hash}"),
        Err(e) => {
            eprintln!("failed to hash password: {e}");
            std::process::exit(1);
        }
    }
}
