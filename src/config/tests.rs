//! Configuration Module Tests
//!
//! Validates parsing of the `key=value` configuration file, boolean handling,
//! and the startup-time validation of required keys.

#[cfg(test)]
mod tests {
    use crate::config::loader::{load_config_file, parse_bool};
    use crate::error::ServerError;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_corpus(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn write_config(dir: &TempDir, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join("config.txt");
        std::fs::write(&path, contents).unwrap();
        path
    }

    // ============================================================
    // TEST 1: parse_bool accepted spellings
    // ============================================================

    #[test]
    fn test_parse_bool_accepts_known_spellings() {
        for value in ["true", "TRUE", "True", "1", "yes", "YES"] {
            assert!(parse_bool("USE_SSL", value).unwrap(), "value: {}", value);
        }
        for value in ["false", "FALSE", "False", "0", "no", "No"] {
            assert!(!parse_bool("USE_SSL", value).unwrap(), "value: {}", value);
        }
    }

    #[test]
    fn test_parse_bool_rejects_garbage() {
        let err = parse_bool("REREAD_ON_QUERY", "maybe").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
        assert!(err.to_string().contains("REREAD_ON_QUERY"));
    }

    // ============================================================
    // TEST 2: full valid configuration file
    // ============================================================

    #[test]
    fn test_load_valid_config() {
        let dir = TempDir::new().unwrap();
        let corpus = write_corpus(&dir, "data.txt", "alpha\nbeta\n");
        let config_path = write_config(
            &dir,
            &format!(
                "# server settings\n\nlinuxpath={}\nREREAD_ON_QUERY=False\nUSE_SSL=true\nPORT=44445\n",
                corpus.display()
            ),
        );

        let config = load_config_file(&config_path).unwrap();

        assert_eq!(config.linux_path, corpus);
        assert!(!config.reread_on_query);
        assert!(config.use_ssl);
        assert_eq!(config.port, 44445);
    }

    #[test]
    fn test_load_config_keys_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let corpus = write_corpus(&dir, "data.txt", "alpha\n");
        let config_path = write_config(
            &dir,
            &format!(
                "LINUXPATH={}\nreread_on_query=true\nuse_ssl=no\nport=9000\n",
                corpus.display()
            ),
        );

        let config = load_config_file(&config_path).unwrap();

        assert!(config.reread_on_query);
        assert!(!config.use_ssl);
        assert_eq!(config.port, 9000);
    }

    // ============================================================
    // TEST 3: missing required keys
    // ============================================================

    #[test]
    fn test_missing_key_is_config_error() {
        let dir = TempDir::new().unwrap();
        let corpus = write_corpus(&dir, "data.txt", "alpha\n");

        // Each variant drops one required key.
        let without_port = format!(
            "linuxpath={}\nREREAD_ON_QUERY=false\nUSE_SSL=false\n",
            corpus.display()
        );
        let err = load_config_file(&write_config(&dir, &without_port)).unwrap_err();
        assert!(err.to_string().contains("PORT"));
        assert_eq!(err.exit_code(), crate::error::EXIT_CONFIG);

        let without_path = "REREAD_ON_QUERY=false\nUSE_SSL=false\nPORT=1000\n";
        let err = load_config_file(&write_config(&dir, without_path)).unwrap_err();
        assert!(err.to_string().contains("linuxpath"));
    }

    // ============================================================
    // TEST 4: port range validation
    // ============================================================

    #[test]
    fn test_port_out_of_range() {
        let dir = TempDir::new().unwrap();
        let corpus = write_corpus(&dir, "data.txt", "alpha\n");

        for bad_port in ["0", "65536", "700000", "-1", "not-a-port"] {
            let config = format!(
                "linuxpath={}\nREREAD_ON_QUERY=false\nUSE_SSL=false\nPORT={}\n",
                corpus.display(),
                bad_port
            );
            let err = load_config_file(&write_config(&dir, &config)).unwrap_err();
            assert!(matches!(err, ServerError::Config(_)), "port: {}", bad_port);
        }
    }

    // ============================================================
    // TEST 5: corpus path validation
    // ============================================================

    #[test]
    fn test_missing_corpus_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let config = format!(
            "linuxpath={}\nREREAD_ON_QUERY=false\nUSE_SSL=false\nPORT=1000\n",
            dir.path().join("nonexistent.txt").display()
        );
        let err = load_config_file(&write_config(&dir, &config)).unwrap_err();
        assert!(err.to_string().contains("not readable"));
    }

    #[test]
    fn test_corpus_path_must_be_regular_file() {
        let dir = TempDir::new().unwrap();
        let subdir = dir.path().join("corpus_dir");
        std::fs::create_dir(&subdir).unwrap();

        let config = format!(
            "linuxpath={}\nREREAD_ON_QUERY=false\nUSE_SSL=false\nPORT=1000\n",
            subdir.display()
        );
        let err = load_config_file(&write_config(&dir, &config)).unwrap_err();
        assert!(err.to_string().contains("regular file"));
    }

    // ============================================================
    // TEST 6: comments, blanks, and unknown keys are ignored
    // ============================================================

    #[test]
    fn test_comments_and_unknown_keys_ignored() {
        let dir = TempDir::new().unwrap();
        let corpus = write_corpus(&dir, "data.txt", "alpha\n");
        let config = format!(
            "# comment line\n\nlinuxpath={}\nfuture_key=whatever\nno equals sign here\nREREAD_ON_QUERY=true\nUSE_SSL=false\nPORT=2000\n",
            corpus.display()
        );

        let parsed = load_config_file(&write_config(&dir, &config)).unwrap();
        assert_eq!(parsed.port, 2000);
    }
}
