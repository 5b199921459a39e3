use std::io::{BufRead, Write};

use color_eyre::{eyre::WrapErr, Result};
use token_helper_core::{cipher::Cipher, input::read_token, store::TokenStore};

/// `store`: read one token from `input` and persist it encrypted.
pub async fn store<C: Cipher, R: BufRead>(store: &TokenStore<C>, input: R) -> Result<()> {
    let token = read_token(input).wrap_err("failed to read value from stdin")?;
    store.store(&token).await?;
    Ok(())
}

/// `get`: write the decrypted token to `out`; writes nothing when none is stored.
pub async fn get<C: Cipher, W: Write>(store: &TokenStore<C>, mut out: W) -> Result<()> {
    if let Some(token) = store.get().await? {
        out.write_all(&token)
            .wrap_err("failed to write token to stdout")?;
        out.flush()?;
    }
    Ok(())
}

/// `erase`: forget the stored token.
pub async fn erase<C: Cipher>(store: &TokenStore<C>) -> Result<()> {
    store.erase().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::storage;

    #[tokio::test]
    async fn store_then_get_prints_exact_token() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = storage::test_store(dir.path().join("token"));

        super::store(&store, Cursor::new(b"s.abc\nignored".to_vec()))
            .await
            .expect("store");

        let mut out = Vec::new();
        get(&store, &mut out).await.expect("get");
        assert_eq!(out, b"s.abc\n");
    }

    #[tokio::test]
    async fn get_with_nothing_stored_prints_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = storage::test_store(dir.path().join("token"));

        let mut out = Vec::new();
        get(&store, &mut out).await.expect("get");
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn erase_twice_succeeds() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = storage::test_store(dir.path().join("token"));
        super::store(&store, Cursor::new(b"t".to_vec()))
            .await
            .expect("store");

        erase(&store).await.expect("erase");
        erase(&store).await.expect("erase again");
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn store_error_mentions_the_failed_step() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A directory where the token file should be makes the rename fail.
        let path = dir.path().join("token");
        std::fs::create_dir(&path).expect("mkdir");
        std::fs::write(path.join("child"), b"x").expect("populate");
        let store = storage::test_store(&path);

        let err = super::store(&store, Cursor::new(b"t\n".to_vec()))
            .await
            .expect_err("should fail");
        assert!(err.to_string().contains("failed to write encrypted token file"));
    }
}
