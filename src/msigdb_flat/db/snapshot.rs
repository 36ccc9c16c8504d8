use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use rusqlite::{Connection, OpenFlags};
use tempfile::TempDir;
use tracing::info;
use zip::ZipArchive;

use crate::constants::{CHIP_URL_BASE, SNAPSHOT_URL_BASE};
use crate::db::raw::Raw;
use crate::error::{FlatResult, FlatTableError};
use crate::types::Species;

const DOWNLOAD_TIMEOUT_SECS: u64 = 600;

pub fn snapshot_url(version_name: &str) -> String {
    format!("{}/{}/msigdb_v{}.db.zip", SNAPSHOT_URL_BASE,
            version_name, version_name)
}

pub fn chip_url(version_name: &str) -> FlatResult<String> {
    let species = Species::from_version_name(version_name)?;
    Ok(format!("{}/{}.v{}.chip", CHIP_URL_BASE,
               species.chip_file_stem(), version_name))
}

pub fn http_client() -> FlatResult<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("msigdb-sqlite-flat/{}",
                                       env!("CARGO_PKG_VERSION")))
            .map_err(|err| FlatTableError::InvalidArgument(err.to_string()))?,
    );

    let client = Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .build()?;

    Ok(client)
}

pub fn remote_exists(client: &Client, url: &str) -> FlatResult<bool> {
    let response = client.head(url).send()?;
    Ok(response.status().is_success())
}

pub fn download_file(client: &Client, url: &str, destination: &Path)
                     -> FlatResult<()>
{
    info!("downloading {}", url);

    let mut response = client.get(url).send()?;

    if !response.status().is_success() {
        return Err(FlatTableError::InvalidArgument(
            format!("download of {} failed with HTTP status {}",
                    url, response.status())));
    }

    let mut file = File::create(destination)?;
    io::copy(&mut response, &mut file)?;

    Ok(())
}

// download a file into a fresh temporary directory, the returned TempDir
// must be kept alive as long as the file is needed
pub fn fetch_to_temp(client: &Client, url: &str) -> FlatResult<(TempDir, PathBuf)> {
    let file_name = url.rsplit('/').next().unwrap_or("download");
    let temp_dir = TempDir::new()?;
    let dest = temp_dir.path().join(file_name);

    download_file(client, url, &dest)?;

    Ok((temp_dir, dest))
}

fn extract_snapshot_db(zip_path: &Path, target_dir: &Path) -> FlatResult<PathBuf> {
    let file = File::open(zip_path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut db_path = None;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(entry_path) = entry.enclosed_name() else {
            return Err(FlatTableError::SourceDataShape(
                format!("snapshot archive entry {} has an unsafe path",
                        entry.name())));
        };

        if entry.is_dir() || entry_path.extension().is_none_or(|ext| ext != "db") {
            continue;
        }

        if db_path.is_some() {
            return Err(FlatTableError::SourceDataShape(
                "snapshot archive contains more than one .db file".into()));
        }

        let file_name = entry_path.file_name()
            .ok_or_else(|| FlatTableError::SourceDataShape(
                format!("snapshot archive entry {} has no file name",
                        entry.name())))?;
        let out_path = target_dir.join(file_name);
        let mut out_file = File::create(&out_path)?;
        io::copy(&mut entry, &mut out_file)?;
        db_path = Some(out_path);
    }

    db_path.ok_or_else(|| FlatTableError::SourceDataShape(
        "snapshot archive contains no .db file".into()))
}

fn open_read_only(db_path: &Path) -> FlatResult<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI |
        OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(db_path, flags)?;
    Ok(conn)
}

// an open snapshot database together with whatever temporary files back
// it.  a downloaded snapshot lives in a temporary directory that is
// removed with the scope, a snapshot opened from a local path is never
// deleted
pub struct SnapshotScope {
    conn: Connection,
    db_path: PathBuf,
    // keeps the extracted copy of a downloaded snapshot alive, removed on drop
    _temp_dir: Option<TempDir>,
}

impl SnapshotScope {
    // download the published snapshot for a version name like "2025.1.Hs"
    // and open it
    pub fn fetch(version_name: &str) -> FlatResult<SnapshotScope> {
        SnapshotScope::fetch_url(&snapshot_url(version_name))
    }

    // download a snapshot zip from an explicit URL and open it
    pub fn fetch_url(url: &str) -> FlatResult<SnapshotScope> {
        let client = http_client()?;

        if !remote_exists(&client, url)? {
            return Err(FlatTableError::InvalidArgument(
                format!("no snapshot published at {}", url)));
        }

        let temp_dir = TempDir::new()?;
        let zip_path = temp_dir.path().join("snapshot.db.zip");

        download_file(&client, url, &zip_path)?;

        let db_path = extract_snapshot_db(&zip_path, temp_dir.path())?;

        info!("extracted snapshot to {}", db_path.display());

        let conn = open_read_only(&db_path)?;

        Ok(SnapshotScope {
            conn,
            db_path,
            _temp_dir: Some(temp_dir),
        })
    }

    // open an already extracted snapshot database
    pub fn open_local(db_path: &Path) -> FlatResult<SnapshotScope> {
        if !db_path.exists() {
            return Err(FlatTableError::InvalidArgument(
                format!("no such snapshot database: {}", db_path.display())));
        }

        let conn = open_read_only(db_path)?;

        Ok(SnapshotScope {
            conn,
            db_path: db_path.to_owned(),
            _temp_dir: None,
        })
    }

    // consumes the scope, so the connection is closed and any temporary
    // files are removed as soon as the rows are in memory
    pub fn load_raw(self) -> FlatResult<Raw> {
        Raw::new(&self.conn)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }
}
