//! Flat-file storage: one file per record under a category directory.
//!
//! Loading never fails as a whole. Unreadable files and malformed address
//! keys are logged and skipped so one bad entry cannot empty the registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use whois_core::keys::{self, Category};
use whois_core::{Record, RecordKind};

/// Records read from the storage root in one pass.
#[derive(Debug, Default)]
pub struct LoadedRecords {
    /// Static address records in storage order (ipv4 then ipv6, by file name).
    pub addresses: Vec<Record>,
    /// Dynamic address companions keyed by network name.
    pub address_companions: HashMap<String, Record>,
    /// Domain records, dynamic companions under their `d_` key.
    pub domains: HashMap<String, Record>,
    /// ASN records, dynamic companions under their `d_` key.
    pub asns: HashMap<String, Record>,
    /// Files that could not be read or parsed.
    pub skipped: usize,
}

/// Create the category directories under `root` if missing.
pub fn create_data_dirs(root: &Path) -> crate::Result<()> {
    for category in Category::ALL {
        let dir = root.join(category.dir_name());
        std::fs::create_dir_all(&dir).map_err(|e| {
            crate::SrvError::Persistence(format!("failed to create {}: {e}", dir.display()))
        })?;
    }
    Ok(())
}

/// Load every category under `root`.
pub fn load_all(root: &Path) -> LoadedRecords {
    let mut loaded = LoadedRecords::default();

    for category in Category::ALL {
        for (file_name, path) in list_files(&root.join(category.dir_name())) {
            let Some(data) = read_record_file(&path) else {
                loaded.skipped += 1;
                continue;
            };

            if category.is_address() {
                load_address(&mut loaded, &file_name, &data);
            } else {
                let key = file_name.to_lowercase();
                let static_key = keys::strip_dynamic(&key).unwrap_or(&key);
                let record = if category == Category::Domain {
                    Record::domain(static_key, &data)
                } else {
                    Record::asn(static_key, &data)
                };
                let record = if keys::strip_dynamic(&key).is_some() {
                    record.into_dynamic()
                } else {
                    record
                };

                let table = if category == Category::Domain {
                    &mut loaded.domains
                } else {
                    &mut loaded.asns
                };
                table.insert(key, record);
            }
        }
    }

    loaded
}

fn load_address(loaded: &mut LoadedRecords, file_name: &str, data: &str) {
    let (encoded, dynamic) = match keys::strip_dynamic(file_name) {
        Some(rest) => (rest, true),
        None => (file_name, false),
    };
    let network = keys::decode_address_key(encoded);

    match Record::address(&network, data) {
        Ok(record) if dynamic => {
            loaded
                .address_companions
                .insert(record.name().to_string(), record.into_dynamic());
        }
        Ok(record) => loaded.addresses.push(record),
        Err(e) => {
            warn!(file = file_name, error = %e, "skipping address record with malformed key");
            loaded.skipped += 1;
        }
    }
}

/// Regular files in `dir`, sorted by name. Hidden files are ignored.
fn list_files(dir: &Path) -> Vec<(String, PathBuf)> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), error = %e, "storage directory not readable");
            return Vec::new();
        }
    };

    let mut files: Vec<(String, PathBuf)> = entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|entry| {
            let path = entry.path();
            match entry.file_name().into_string() {
                Ok(name) if !name.starts_with('.') => Some((name, path)),
                Ok(_) => None,
                Err(name) => {
                    warn!(file = ?name, "skipping record file with non UTF-8 name");
                    None
                }
            }
        })
        .collect();

    files.sort_by(|a, b| a.0.cmp(&b.0));
    files
}

fn read_record_file(path: &Path) -> Option<String> {
    match std::fs::read(path) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            warn!(file = %path.display(), error = %e, "failed to read record file");
            None
        }
    }
}

/// Write the dynamic companion of the record `name` of `kind`.
///
/// The file is replaced whole: contents go to a hidden temporary file that
/// is renamed over the target, so readers never see a partial write.
pub fn write_dynamic(
    root: &Path,
    kind: &RecordKind,
    name: &str,
    contents: &str,
) -> crate::Result<PathBuf> {
    let dir = root.join(Category::for_kind(kind).dir_name());
    let file_name = keys::file_name(kind, name, true);
    let target = dir.join(&file_name);
    let tmp = dir.join(format!(".{file_name}.tmp"));

    std::fs::create_dir_all(&dir)
        .and_then(|()| std::fs::write(&tmp, contents))
        .and_then(|()| std::fs::rename(&tmp, &target))
        .map_err(|e| {
            crate::SrvError::Persistence(format!("failed to write {}: {e}", target.display()))
        })?;

    Ok(target)
}
