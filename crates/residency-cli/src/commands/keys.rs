//! `residency keys generate` - create a session signing keypair.

use residency_auth::KeyPair;
use std::fs;
use std::path::PathBuf;

pub fn generate(output: Option<PathBuf>) -> anyhow::Result<()> {
    let keypair = KeyPair::generate()?;

    if let Some(output_dir) = output {
        fs::create_dir_all(&output_dir)?;

        let private_path = output_dir.join("private.key");
        let public_path = output_dir.join("public.key");
        keypair.save_to_files(&private_path, Some(&public_path))?;

        println!("✔ Generated session keypair:");
        println!("  Private key: {}", private_path.display());
        println!("  Public key:  {}", public_path.display());
        println!();
        println!("⚠️  Keep the private key secret. Anyone holding it can mint admin sessions.");
        println!();
        println!("Point the server at it with either:");
        println!("  export RESIDENCY_SESSION_KEY=$(cat {})", private_path.display());
        println!("  auth.session.private_key_file: {}", private_path.display());
    } else {
        println!("Private key (keep secret!):");
        println!("{}", keypair.private_key_hex());
        println!();
        println!("Public key:");
        println!("{}", keypair.public_key_hex());
        println!();
        println!("Use --output <dir> to save keys to files.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_loadable_keys() {
        let dir = tempdir().unwrap();
        generate(Some(dir.path().join("keys"))).unwrap();

        let private_path = dir.path().join("keys/private.key");
        let public_hex = fs::read_to_string(dir.path().join("keys/public.key")).unwrap();
        assert_eq!(public_hex.trim().len(), 64);

        let loaded = KeyPair::load_from_file(&private_path).unwrap();
        assert_eq!(loaded.public_key_hex(), public_hex.trim());
    }
}
