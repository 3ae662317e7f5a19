//! Creation bytecode from compiled contract artifacts
//!
//! Build tools disagree on the shape: some store `"bytecode": "0x60..."`,
//! others `"bytecode": { "object": "60..." }`. Both are accepted, with or
//! without the `0x` prefix.

use crate::error::{LabError, Result};
use alloy::primitives::Bytes;
use serde_json::Value;
use std::fs;
use std::path::Path;

pub fn parse_artifact(json: &str) -> Result<Bytes> {
    let value: Value = serde_json::from_str(json)?;
    let bytecode = match value.get("bytecode") {
        Some(Value::String(code)) => code.as_str(),
        Some(Value::Object(inner)) => inner
            .get("object")
            .and_then(Value::as_str)
            .ok_or_else(|| LabError::Config("Artifact bytecode object has no 'object' string".to_string()))?,
        _ => {
            return Err(LabError::Config(
                "Artifact has no 'bytecode' field".to_string(),
            ))
        }
    };

    let hex_part = bytecode.trim().trim_start_matches("0x");
    if hex_part.is_empty() {
        return Err(LabError::Config(
            "Artifact bytecode is empty; is this an interface or abstract contract?".to_string(),
        ));
    }

    let bytes = hex::decode(hex_part)
        .map_err(|e| LabError::Config(format!("Artifact bytecode is not valid hex: {}", e)))?;
    Ok(Bytes::from(bytes))
}

pub fn load_artifact(path: &Path) -> Result<Bytes> {
    let json = fs::read_to_string(path).map_err(|e| {
        LabError::Config(format!("Failed to read artifact {}: {}", path.display(), e))
    })?;
    parse_artifact(&json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_plain_string_bytecode() {
        let code = parse_artifact(r#"{"contractName":"SimpleCounter","bytecode":"0x6080604052"}"#).unwrap();
        assert_eq!(code.as_ref(), &[0x60, 0x80, 0x60, 0x40, 0x52]);
    }

    #[test]
    fn test_object_bytecode_without_prefix() {
        let code = parse_artifact(r#"{"bytecode":{"object":"6080","linkReferences":{}}}"#).unwrap();
        assert_eq!(code.as_ref(), &[0x60, 0x80]);
    }

    #[test]
    fn test_missing_or_empty_bytecode() {
        assert!(parse_artifact(r#"{"abi":[]}"#).is_err());
        assert!(parse_artifact(r#"{"bytecode":"0x"}"#).is_err());
        assert!(parse_artifact(r#"{"bytecode":"0xzz"}"#).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("VotationSystem.json");
        std::fs::write(&path, r#"{"bytecode":"0x00"}"#).unwrap();
        assert_eq!(load_artifact(&path).unwrap().len(), 1);
        assert!(load_artifact(&dir.path().join("missing.json")).is_err());
    }
}
