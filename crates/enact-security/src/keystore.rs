//! Persistent trusted-key store
//!
//! A [`KeyStore`] is an explicit handle rooted at a host-owned directory,
//! defaulting to `$HOME/.enact/`. Layout:
//!
//! ```text
//! <root>/trusted-keys/<keyId>-public.pem    world-readable public key
//! <root>/trusted-keys/<keyId>.meta          JSON metadata, pretty-printed
//! <root>/private-keys/<keyId>-private.pem   owner-only private key
//! ```
//!
//! Write paths surface errors after a best-effort rollback of partial
//! files. Read paths never fail: unreadable or undecodable entries degrade
//! to an absent result and are skipped (with a warning) in enumerations, so
//! a damaged store entry cannot take verification down with it.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::crypto::{self, KeyPair};
use crate::error::{CryptoError, EnactError, Result};
use crate::pem::{self, PemLabel};

const TRUSTED_DIR: &str = "trusted-keys";
const PRIVATE_DIR: &str = "private-keys";
const PUBLIC_SUFFIX: &str = "-public.pem";
const PRIVATE_SUFFIX: &str = "-private.pem";
const META_SUFFIX: &str = ".meta";

/// Metadata stored next to each trusted public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyMetadata {
    /// Identifier the key files are named after.
    pub key_id: String,
    /// ISO-8601 creation time.
    pub created: String,
    /// Always `"secp256k1"`.
    pub algorithm: String,
    /// Optional human-readable purpose.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// File-backed key store rooted at a directory.
#[derive(Debug, Clone)]
pub struct KeyStore {
    root: PathBuf,
}

impl KeyStore {
    /// Open a store rooted at an explicit directory. Nothing is created
    /// until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Open the store at the default host root (`$HOME/.enact/`, or
    /// `ENACT_HOME` when set).
    #[must_use]
    pub fn open_default() -> Self {
        Self::new(crate::default_root())
    }

    /// The directory this store is rooted at.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn trusted_dir(&self) -> PathBuf {
        self.root.join(TRUSTED_DIR)
    }

    fn private_dir(&self) -> PathBuf {
        self.root.join(PRIVATE_DIR)
    }

    fn public_pem_path(&self, key_id: &str) -> PathBuf {
        self.trusted_dir().join(format!("{key_id}{PUBLIC_SUFFIX}"))
    }

    fn meta_path(&self, key_id: &str) -> PathBuf {
        self.trusted_dir().join(format!("{key_id}{META_SUFFIX}"))
    }

    fn private_pem_path(&self, key_id: &str) -> PathBuf {
        self.private_dir().join(format!("{key_id}{PRIVATE_SUFFIX}"))
    }

    // -----------------------------------------------------------------------
    // Write paths
    // -----------------------------------------------------------------------

    /// Generate a fresh keypair and persist it under `key_id`.
    ///
    /// # Errors
    ///
    /// Returns `EnactError::KeyExists` if either file for `key_id` already
    /// exists, and `EnactError::Io` on a write failure (after rollback).
    pub fn generate_and_store(&self, key_id: &str, description: Option<&str>) -> Result<KeyPair> {
        self.check_absent(key_id)?;
        let pair = crypto::generate_keypair();
        self.store_pair(key_id, &pair, description)?;
        tracing::debug!(key_id, "generated and stored keypair");
        Ok(pair)
    }

    /// Trust an external public key: writes the public PEM and metadata
    /// only.
    ///
    /// # Errors
    ///
    /// Returns `EnactError::KeyExists` if a public key with this id exists,
    /// `CryptoError::InvalidPublicKey` for anything but a 33-byte
    /// compressed point, and `EnactError::Io` on write failure.
    pub fn import_public(
        &self,
        key_id: &str,
        public_hex: &str,
        description: Option<&str>,
    ) -> Result<()> {
        if self.public_pem_path(key_id).exists() {
            return Err(EnactError::KeyExists(key_id.to_string()));
        }
        let bytes = hex::decode(public_hex).map_err(|_| CryptoError::InvalidPublicKey)?;
        if bytes.len() != crypto::PUBLIC_KEY_LEN || (bytes[0] != 0x02 && bytes[0] != 0x03) {
            return Err(CryptoError::InvalidPublicKey.into());
        }

        let public_pem = pem::hex_to_pem(public_hex, PemLabel::Public)?;
        let written = self.write_public_side(key_id, &public_pem, description);
        if let Err(error) = written {
            self.rollback(key_id);
            return Err(error);
        }
        tracing::debug!(key_id, "imported trusted public key");
        Ok(())
    }

    /// Import a private scalar, deriving and persisting both sides.
    ///
    /// # Errors
    ///
    /// As [`KeyStore::generate_and_store`], plus `CryptoError::InvalidKey`
    /// for a malformed scalar.
    pub fn import_private(
        &self,
        key_id: &str,
        private_hex: &str,
        description: Option<&str>,
    ) -> Result<KeyPair> {
        self.check_absent(key_id)?;
        let pair = KeyPair::derive(private_hex)?;
        self.store_pair(key_id, &pair, description)?;
        tracing::debug!(key_id, "imported private key");
        Ok(pair)
    }

    /// Remove every file stored for `key_id`. Returns whether anything was
    /// removed.
    pub fn remove(&self, key_id: &str) -> bool {
        let paths = [
            self.public_pem_path(key_id),
            self.meta_path(key_id),
            self.private_pem_path(key_id),
        ];
        let mut removed = false;
        for path in paths {
            if fs::remove_file(&path).is_ok() {
                removed = true;
            }
        }
        if removed {
            tracing::debug!(key_id, "removed key material");
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Read paths (never fail)
    // -----------------------------------------------------------------------

    /// Load a full keypair. Both sides must exist and decode.
    #[must_use]
    pub fn get(&self, key_id: &str) -> Option<KeyPair> {
        let public_key = self.get_public(key_id)?;
        let private_pem = fs::read_to_string(self.private_pem_path(key_id)).ok()?;
        let private_key = pem::pem_to_hex(&private_pem, PemLabel::Private).ok()?;
        Some(KeyPair {
            private_key,
            public_key,
        })
    }

    /// Load the trusted public key for `key_id` as hex.
    #[must_use]
    pub fn get_public(&self, key_id: &str) -> Option<String> {
        let public_pem = fs::read_to_string(self.public_pem_path(key_id)).ok()?;
        pem::pem_to_hex(&public_pem, PemLabel::Public).ok()
    }

    /// Load the metadata for `key_id`.
    #[must_use]
    pub fn get_metadata(&self, key_id: &str) -> Option<KeyMetadata> {
        let raw = fs::read_to_string(self.meta_path(key_id)).ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// Whether both the public and the private side exist for `key_id`.
    #[must_use]
    pub fn key_exists(&self, key_id: &str) -> bool {
        self.public_pem_path(key_id).exists() && self.private_pem_path(key_id).exists()
    }

    /// Ids of keys with a stored private side, sorted.
    #[must_use]
    pub fn list_with_private(&self) -> Vec<String> {
        list_ids(&self.private_dir(), PRIVATE_SUFFIX)
    }

    /// Ids of trusted public keys, sorted.
    #[must_use]
    pub fn list_trusted(&self) -> Vec<String> {
        list_ids(&self.trusted_dir(), PUBLIC_SUFFIX)
    }

    /// Every decodable trusted public key as hex.
    ///
    /// Enumerates every `*.pem` under `trusted-keys/`; entries that fail to
    /// read or decode are skipped with a warning rather than aborting the
    /// enumeration.
    #[must_use]
    pub fn all_trusted_public_hex(&self) -> Vec<String> {
        let entries = match fs::read_dir(self.trusted_dir()) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };
        let mut keys = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("pem") {
                continue;
            }
            let decoded = fs::read_to_string(&path)
                .ok()
                .and_then(|text| pem::pem_to_hex(&text, PemLabel::Public).ok());
            match decoded {
                Some(hex) => keys.push(hex),
                None => {
                    tracing::warn!(path = %path.display(), "skipping undecodable trusted key");
                }
            }
        }
        keys.sort();
        keys
    }

    /// Write a JSON bundle `{ metadata, publicKey, privateKey? }` to
    /// `path`.
    ///
    /// # Errors
    ///
    /// Returns `EnactError::KeyNotFound` when the requested material is
    /// missing and `EnactError::Io` on write failure.
    pub fn export_to_file(&self, key_id: &str, path: &Path, include_private: bool) -> Result<()> {
        let public_key = self
            .get_public(key_id)
            .ok_or_else(|| EnactError::KeyNotFound(key_id.to_string()))?;
        let mut bundle = serde_json::json!({
            "metadata": self.get_metadata(key_id),
            "publicKey": public_key,
        });
        if include_private {
            let pair = self
                .get(key_id)
                .ok_or_else(|| EnactError::KeyNotFound(key_id.to_string()))?;
            bundle["privateKey"] = serde_json::Value::String(pair.private_key.clone());
        }
        let text = serde_json::to_string_pretty(&bundle)
            .map_err(|e| EnactError::Serialization(e.to_string()))?;
        fs::write(path, text).map_err(|source| EnactError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn check_absent(&self, key_id: &str) -> Result<()> {
        if self.public_pem_path(key_id).exists() || self.private_pem_path(key_id).exists() {
            return Err(EnactError::KeyExists(key_id.to_string()));
        }
        Ok(())
    }

    /// Persist both sides of a pair, rolling back on a partial failure.
    fn store_pair(&self, key_id: &str, pair: &KeyPair, description: Option<&str>) -> Result<()> {
        let private_pem = pem::hex_to_pem(&pair.private_key, PemLabel::Private)?;
        let public_pem = pem::hex_to_pem(&pair.public_key, PemLabel::Public)?;

        let written = self
            .ensure_dir(&self.private_dir())
            .and_then(|()| {
                write_file(&self.private_pem_path(key_id), private_pem.as_bytes(), 0o600)
            })
            .and_then(|()| self.write_public_side(key_id, &public_pem, description));
        if let Err(error) = written {
            self.rollback(key_id);
            return Err(error);
        }
        Ok(())
    }

    fn write_public_side(
        &self,
        key_id: &str,
        public_pem: &str,
        description: Option<&str>,
    ) -> Result<()> {
        self.ensure_dir(&self.trusted_dir())?;
        write_file(&self.public_pem_path(key_id), public_pem.as_bytes(), 0o644)?;
        let metadata = KeyMetadata {
            key_id: key_id.to_string(),
            created: Utc::now().to_rfc3339(),
            algorithm: crypto::ALGORITHM.to_string(),
            description: description.map(str::to_string),
        };
        let text = serde_json::to_string_pretty(&metadata)
            .map_err(|e| EnactError::Serialization(e.to_string()))?;
        write_file(&self.meta_path(key_id), text.as_bytes(), 0o644)
    }

    /// Best-effort removal of whatever a failed store wrote.
    fn rollback(&self, key_id: &str) {
        self.remove(key_id);
    }

    fn ensure_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).map_err(|source| EnactError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(dir, fs::Permissions::from_mode(0o755));
        }
        Ok(())
    }
}

fn write_file(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    fs::write(path, contents).map_err(|source| EnactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|source| {
            EnactError::Io {
                path: path.to_path_buf(),
                source,
            }
        })?;
    }
    #[cfg(not(unix))]
    let _ = mode;
    Ok(())
}

fn list_ids(dir: &Path, suffix: &str) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    let mut ids: Vec<String> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_str()?;
            name.strip_suffix(suffix).map(str::to_string)
        })
        .collect();
    ids.sort();
    ids
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, KeyStore) {
        let dir = tempdir().unwrap();
        let store = KeyStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn generate_and_store_roundtrips() {
        let (_dir, store) = store();
        let pair = store.generate_and_store("signer", Some("release key")).unwrap();

        assert!(store.key_exists("signer"));
        let loaded = store.get("signer").unwrap();
        assert_eq!(loaded.private_key, pair.private_key);
        assert_eq!(loaded.public_key, pair.public_key);

        let metadata = store.get_metadata("signer").unwrap();
        assert_eq!(metadata.key_id, "signer");
        assert_eq!(metadata.algorithm, "secp256k1");
        assert_eq!(metadata.description.as_deref(), Some("release key"));
    }

    #[test]
    fn generate_refuses_existing_id() {
        let (_dir, store) = store();
        store.generate_and_store("signer", None).unwrap();
        let err = store.generate_and_store("signer", None).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn import_public_stores_trusted_side_only() {
        let (_dir, store) = store();
        let pair = crypto::generate_keypair();
        store.import_public("peer", &pair.public_key, None).unwrap();

        assert_eq!(store.get_public("peer").unwrap(), pair.public_key);
        assert!(store.get_metadata("peer").is_some());
        assert!(store.get("peer").is_none());
        assert!(!store.key_exists("peer"));
    }

    #[test]
    fn import_public_rejects_duplicates_and_bad_material() {
        let (_dir, store) = store();
        let pair = crypto::generate_keypair();
        store.import_public("peer", &pair.public_key, None).unwrap();
        assert!(store.import_public("peer", &pair.public_key, None).is_err());
        assert!(store.import_public("other", "zz", None).is_err());
        assert!(store.import_public("other", "aabb", None).is_err());
    }

    #[test]
    fn import_private_derives_public_side() {
        let (_dir, store) = store();
        let pair = crypto::generate_keypair();
        let imported = store
            .import_private("dev", &pair.private_key, None)
            .unwrap();
        assert_eq!(imported.public_key, pair.public_key);
        assert_eq!(store.get_public("dev").unwrap(), pair.public_key);
        assert!(store.key_exists("dev"));
    }

    #[test]
    fn remove_deletes_any_subset() {
        let (_dir, store) = store();
        store.generate_and_store("signer", None).unwrap();
        assert!(store.remove("signer"));
        assert!(!store.key_exists("signer"));
        assert!(store.get_public("signer").is_none());
        // Second removal has nothing left to delete.
        assert!(!store.remove("signer"));
        assert!(!store.remove("never-existed"));
    }

    #[test]
    fn listings_are_sorted_and_scoped() {
        let (_dir, store) = store();
        store.generate_and_store("bravo", None).unwrap();
        store.generate_and_store("alpha", None).unwrap();
        let peer = crypto::generate_keypair();
        store.import_public("peer", &peer.public_key, None).unwrap();

        assert_eq!(store.list_trusted(), vec!["alpha", "bravo", "peer"]);
        assert_eq!(store.list_with_private(), vec!["alpha", "bravo"]);
    }

    #[test]
    fn enumeration_skips_undecodable_entries() {
        let (_dir, store) = store();
        store.generate_and_store("good", None).unwrap();
        fs::write(store.trusted_dir().join("junk.pem"), "not pem at all").unwrap();
        fs::write(store.trusted_dir().join("notes.txt"), "ignored").unwrap();

        let keys = store.all_trusted_public_hex();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0], store.get_public("good").unwrap());
    }

    #[test]
    fn enumeration_of_missing_store_is_empty() {
        let (_dir, store) = store();
        assert!(store.all_trusted_public_hex().is_empty());
        assert!(store.list_trusted().is_empty());
        assert!(store.list_with_private().is_empty());
    }

    #[test]
    fn export_bundle_shapes() {
        let (dir, store) = store();
        store.generate_and_store("signer", Some("desc")).unwrap();

        let public_path = dir.path().join("public.json");
        store.export_to_file("signer", &public_path, false).unwrap();
        let bundle: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&public_path).unwrap()).unwrap();
        assert!(bundle["publicKey"].is_string());
        assert!(bundle.get("privateKey").is_none());
        assert_eq!(bundle["metadata"]["keyId"], "signer");

        let full_path = dir.path().join("full.json");
        store.export_to_file("signer", &full_path, true).unwrap();
        let bundle: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&full_path).unwrap()).unwrap();
        assert!(bundle["privateKey"].is_string());
    }

    #[test]
    fn export_missing_key_fails() {
        let (dir, store) = store();
        let path = dir.path().join("out.json");
        assert!(store.export_to_file("ghost", &path, false).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn private_material_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = store();
        store.generate_and_store("signer", None).unwrap();

        let private_mode = fs::metadata(store.private_pem_path("signer"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(private_mode & 0o777, 0o600);

        let public_mode = fs::metadata(store.public_pem_path("signer"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(public_mode & 0o777, 0o644);
    }
}
