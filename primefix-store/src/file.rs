/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! File-based persistent message store.
//!
//! Each session owns four files in the store directory, named after the
//! session identifier:
//!
//! | File | Contents |
//! |------|----------|
//! | `<session>.body` | raw outgoing frames, appended back to back |
//! | `<session>.header` | one `seq,offset,len` line per stored frame |
//! | `<session>.seqnums` | `next_sender next_target` |
//! | `<session>.session` | creation time in Unix milliseconds |
//!
//! Every mutation is flushed and synced before the call returns. Appends
//! that fail part way are rolled back, and the small state files are
//! replaced atomically through a `.tmp` sibling and a rename.

use crate::traits::{MessageStore, resolve_range};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use primefix_core::error::StoreError;
use std::collections::BTreeMap;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct StorePaths {
    body: PathBuf,
    header: PathBuf,
    seqnums: PathBuf,
    session: PathBuf,
}

impl StorePaths {
    fn new(dir: &Path, session: &str) -> Self {
        let stem = file_stem(session);
        Self {
            body: dir.join(format!("{stem}.body")),
            header: dir.join(format!("{stem}.header")),
            seqnums: dir.join(format!("{stem}.seqnums")),
            session: dir.join(format!("{stem}.session")),
        }
    }
}

#[derive(Debug)]
struct FileInner {
    body: File,
    header: File,
    /// Offset and length of each frame in the body file.
    index: BTreeMap<u64, (u64, usize)>,
    body_len: u64,
    header_len: u64,
}

/// Durable message store backed by plain files.
#[derive(Debug)]
pub struct FileStore {
    paths: StorePaths,
    inner: Mutex<FileInner>,
    next_sender_seq: AtomicU64,
    next_target_seq: AtomicU64,
    creation_time: RwLock<SystemTime>,
}

impl FileStore {
    /// Opens (or creates) the store for `session` inside `dir`.
    ///
    /// An existing file set is reloaded: stored frames, both sequence
    /// numbers and the creation time survive a reopen.
    ///
    /// # Errors
    /// Returns `StoreError::Io` if the files cannot be created or read, and
    /// `StoreError::Corrupted` if their contents cannot be parsed.
    pub async fn open(dir: impl AsRef<Path>, session: &str) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).await?;
        let paths = StorePaths::new(dir, session);

        let body = open_append(&paths.body).await?;
        let mut header = open_append(&paths.header).await?;
        let (index, header_len) = load_header(&mut header, &paths.header).await?;
        let body_len = body.metadata().await?.len();

        let (sender, target) = match read_optional(&paths.seqnums).await? {
            Some(text) => parse_seqnums(&text)?,
            None => {
                write_synced(&paths.seqnums, b"1 1").await?;
                (1, 1)
            }
        };

        let creation_time = match read_optional(&paths.session).await? {
            Some(text) => parse_creation_time(&text)?,
            None => {
                let now = SystemTime::now();
                write_creation_time(&paths.session, now).await?;
                now
            }
        };

        tracing::debug!(
            path = %paths.body.display(),
            messages = index.len(),
            next_sender = sender,
            next_target = target,
            "file store opened"
        );

        Ok(Self {
            paths,
            inner: Mutex::new(FileInner {
                body,
                header,
                index,
                body_len,
                header_len,
            }),
            next_sender_seq: AtomicU64::new(sender),
            next_target_seq: AtomicU64::new(target),
            creation_time: RwLock::new(creation_time),
        })
    }

    /// Returns the number of stored messages.
    pub async fn message_count(&self) -> usize {
        self.inner.lock().await.index.len()
    }

    async fn persist_seqnums(&self) -> Result<(), StoreError> {
        let text = format!(
            "{} {}",
            self.next_sender_seq.load(Ordering::SeqCst),
            self.next_target_seq.load(Ordering::SeqCst)
        );
        write_synced(&self.paths.seqnums, text.as_bytes()).await
    }
}

#[async_trait]
impl MessageStore for FileStore {
    async fn store(&self, seq_num: u64, message: &[u8]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let FileInner {
            body,
            header,
            index,
            body_len,
            header_len,
        } = &mut *inner;
        let failed = |e: std::io::Error| StoreError::StoreFailed {
            seq_num,
            reason: e.to_string(),
        };

        let offset = *body_len;
        append_synced(body, body_len, message).await.map_err(failed)?;

        let line = format!("{seq_num},{offset},{}\n", message.len());
        if let Err(e) = append_synced(header, header_len, line.as_bytes()).await {
            truncate_to(body, body_len, offset).await;
            return Err(failed(e));
        }

        index.insert(seq_num, (offset, message.len()));
        Ok(())
    }

    async fn get_range(&self, begin: u64, end: u64) -> Result<Vec<(u64, Bytes)>, StoreError> {
        let (begin, end) = resolve_range(begin, end)?;
        let mut inner = self.inner.lock().await;
        let FileInner { body, index, .. } = &mut *inner;

        let mut result = Vec::new();
        for (&seq, &(offset, len)) in index.range(begin..=end) {
            body.seek(SeekFrom::Start(offset)).await?;
            let mut buf = vec![0u8; len];
            body.read_exact(&mut buf).await?;
            result.push((seq, Bytes::from(buf)));
        }
        Ok(result)
    }

    fn next_sender_seq(&self) -> u64 {
        self.next_sender_seq.load(Ordering::SeqCst)
    }

    fn next_target_seq(&self) -> u64 {
        self.next_target_seq.load(Ordering::SeqCst)
    }

    async fn set_next_sender_seq(&self, seq: u64) -> Result<(), StoreError> {
        let _guard = self.inner.lock().await;
        self.next_sender_seq.store(seq, Ordering::SeqCst);
        self.persist_seqnums().await
    }

    async fn set_next_target_seq(&self, seq: u64) -> Result<(), StoreError> {
        let _guard = self.inner.lock().await;
        self.next_target_seq.store(seq, Ordering::SeqCst);
        self.persist_seqnums().await
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;

        inner.body.set_len(0).await?;
        inner.body.sync_data().await?;
        inner.header.set_len(0).await?;
        inner.header.sync_data().await?;
        inner.index.clear();
        inner.body_len = 0;
        inner.header_len = 0;

        self.next_sender_seq.store(1, Ordering::SeqCst);
        self.next_target_seq.store(1, Ordering::SeqCst);
        self.persist_seqnums().await?;

        let now = SystemTime::now();
        write_creation_time(&self.paths.session, now).await?;
        *self.creation_time.write() = now;

        tracing::debug!(path = %self.paths.body.display(), "file store reset");
        Ok(())
    }

    fn creation_time(&self) -> SystemTime {
        *self.creation_time.read()
    }

    async fn refresh(&self) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let (index, header_len) = load_header(&mut inner.header, &self.paths.header).await?;
        inner.index = index;
        inner.header_len = header_len;
        inner.body_len = inner.body.metadata().await?.len();

        if let Some(text) = read_optional(&self.paths.seqnums).await? {
            let (sender, target) = parse_seqnums(&text)?;
            self.next_sender_seq.store(sender, Ordering::SeqCst);
            self.next_target_seq.store(target, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Maps a session identifier to a file-name-safe stem.
fn file_stem(session: &str) -> String {
    session
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

async fn open_append(path: &Path) -> Result<File, StoreError> {
    Ok(OpenOptions::new()
        .create(true)
        .append(true)
        .read(true)
        .open(path)
        .await?)
}

async fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Appends `bytes` and syncs, keeping `len` equal to the file length.
///
/// On failure the file is truncated back to where the append started so a
/// torn frame never shifts later offsets.
async fn append_synced(file: &mut File, len: &mut u64, bytes: &[u8]) -> std::io::Result<()> {
    let start = *len;
    let written = async {
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_data().await
    }
    .await;

    match written {
        Ok(()) => {
            *len = start + bytes.len() as u64;
            Ok(())
        }
        Err(e) => {
            truncate_to(file, len, start).await;
            Err(e)
        }
    }
}

/// Cuts `file` back to `target`, falling back to its real length.
async fn truncate_to(file: &mut File, len: &mut u64, target: u64) {
    let truncated = async {
        file.set_len(target).await?;
        file.sync_data().await
    }
    .await;

    *len = match truncated {
        Ok(()) => target,
        Err(e) => {
            tracing::warn!(error = %e, "cannot roll back partial append");
            match file.metadata().await {
                Ok(meta) => meta.len(),
                Err(_) => target,
            }
        }
    };
}

/// Replaces `path` atomically: write a `.tmp` sibling, sync it, rename it
/// over the original, then sync the directory entry.
async fn write_synced(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let tmp = tmp_path(path);
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)
        .await?;
    file.write_all(contents).await?;
    file.flush().await?;
    file.sync_data().await?;
    drop(file);

    fs::rename(&tmp, path).await?;
    sync_dir(path).await
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(unix)]
async fn sync_dir(path: &Path) -> Result<(), StoreError> {
    if let Some(dir) = path.parent() {
        File::open(dir).await?.sync_all().await?;
    }
    Ok(())
}

#[cfg(not(unix))]
async fn sync_dir(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

async fn write_creation_time(path: &Path, time: SystemTime) -> Result<(), StoreError> {
    let millis = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    write_synced(path, millis.to_string().as_bytes()).await
}

/// Loads the frame index and cuts off an unterminated last line.
///
/// A header line without its newline is a torn append whose frame was never
/// acknowledged. Returns the index and the header length after the cut.
async fn load_header(
    header: &mut File,
    path: &Path,
) -> Result<(BTreeMap<u64, (u64, usize)>, u64), StoreError> {
    let text = read_optional(path).await?.unwrap_or_default();
    let complete = text.rfind('\n').map_or("", |end| &text[..=end]);
    let header_len = complete.len() as u64;
    if complete.len() != text.len() {
        tracing::warn!(path = %path.display(), "dropping torn header line");
        header.set_len(header_len).await?;
        header.sync_data().await?;
    }
    let index = complete
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_index_line)
        .collect::<Result<_, _>>()?;
    Ok((index, header_len))
}

fn parse_index_line(line: &str) -> Result<(u64, (u64, usize)), StoreError> {
    let corrupted = || StoreError::Corrupted {
        reason: format!("invalid header line '{line}'"),
    };
    let mut parts = line.trim().split(',');
    let seq = parts.next().and_then(|s| s.parse().ok()).ok_or_else(corrupted)?;
    let offset = parts.next().and_then(|s| s.parse().ok()).ok_or_else(corrupted)?;
    let len = parts.next().and_then(|s| s.parse().ok()).ok_or_else(corrupted)?;
    if parts.next().is_some() {
        return Err(corrupted());
    }
    Ok((seq, (offset, len)))
}

fn parse_seqnums(text: &str) -> Result<(u64, u64), StoreError> {
    let corrupted = || StoreError::Corrupted {
        reason: format!("invalid sequence file '{}'", text.trim()),
    };
    let mut parts = text.split_whitespace();
    let sender = parts.next().and_then(|s| s.parse().ok()).ok_or_else(corrupted)?;
    let target = parts.next().and_then(|s| s.parse().ok()).ok_or_else(corrupted)?;
    Ok((sender, target))
}

fn parse_creation_time(text: &str) -> Result<SystemTime, StoreError> {
    let millis: u64 = text.trim().parse().map_err(|_| StoreError::Corrupted {
        reason: format!("invalid creation time '{}'", text.trim()),
    })?;
    Ok(UNIX_EPOCH + Duration::from_millis(millis))
}
