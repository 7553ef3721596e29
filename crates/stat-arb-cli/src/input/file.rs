use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

/// Read a config file, choosing the parser from the extension
/// (`.yaml`/`.yml` for YAML, anything else for JSON).
pub fn read_config<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let is_yaml = matches!(
        canonical.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let value: T = if is_yaml {
        serde_yaml::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    } else {
        serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse '{}': {}", canonical.display(), e))?
    };
    Ok(value)
}

/// Resolve a possibly relative path and check that it names a file.
pub fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        name: String,
        k: f64,
    }

    #[test]
    fn test_reads_yaml_by_extension() {
        let mut f = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(f, "name: GE\nk: 1.5").unwrap();
        let s: Sample = read_config(f.path().to_str().unwrap()).unwrap();
        assert_eq!(s, Sample { name: "GE".into(), k: 1.5 });
    }

    #[test]
    fn test_reads_json_otherwise() {
        let mut f = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(f, r#"{{"name": "UTX", "k": 2.0}}"#).unwrap();
        let s: Sample = read_config(f.path().to_str().unwrap()).unwrap();
        assert_eq!(s.name, "UTX");
    }

    #[test]
    fn test_missing_file_is_reported() {
        let err = read_config::<Sample>("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().starts_with("File not found"));
    }

    #[test]
    fn test_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_path(dir.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().starts_with("Not a file"));
    }
}
