use rand::{distributions::Alphanumeric, Rng};

/// Random alphanumeric string, suitable for generated signing secrets
pub fn create_random_secret(secret_len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(secret_len)
        .map(char::from)
        .collect()
}

/// Random secret prefixed with `{prefix}_`, e.g. `whk_3f9a...`
pub fn create_prefixed_secret(prefix: &str, secret_len: usize) -> String {
    format!("{}_{}", prefix, create_random_secret(secret_len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_creates_random_secret() {
        let sec1 = create_random_secret(30);
        let sec2 = create_random_secret(30);
        assert_eq!(sec1.len(), 30);
        assert_eq!(sec2.len(), 30);
        assert_ne!(sec2, sec1);
        assert!(sec1.chars().all(|c| c.is_ascii_alphanumeric()));

        assert_eq!(create_random_secret(47).len(), 47);
    }

    #[test]
    fn it_prefixes_secret() {
        let secret = create_prefixed_secret("whk", 20);
        assert!(secret.starts_with("whk_"));
        assert_eq!(secret.len(), 24);
    }
}
