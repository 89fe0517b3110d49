//! Manifest input sources: stdin, files, directories, and HTTP(S) URLs.
//!
//! Each source opens on its first read, in order, and URL bodies stream
//! through as they arrive.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::TryStreamExt;
use sidecar_core::{AnnotateError, Result};
use tokio::runtime::Handle;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    File(PathBuf),
    Url(String),
}

pub fn http_timeout() -> Duration {
    let secs = std::env::var("SIDECARCTL_HTTP_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(30);
    Duration::from_secs(secs)
}

/// Expand command-line inputs into concrete sources, in order. No inputs means stdin.
pub fn resolve(args: &[String]) -> Result<Vec<Source>> {
    if args.is_empty() {
        return Ok(vec![Source::Stdin]);
    }
    if args.iter().filter(|a| *a == "-").count() > 1 {
        return Err(AnnotateError::input("stdin (\"-\") given more than once"));
    }
    let mut out = Vec::new();
    for arg in args {
        if arg == "-" {
            out.push(Source::Stdin);
        } else if arg.starts_with("http://") || arg.starts_with("https://") {
            out.push(Source::Url(arg.clone()));
        } else {
            let path = Path::new(arg);
            let meta = std::fs::metadata(path).map_err(|e| AnnotateError::input(format!("{}: {}", arg, e)))?;
            if meta.is_dir() {
                let mut files = Vec::new();
                walk_dir(path, &mut files).map_err(|e| AnnotateError::input(format!("walking {}: {}", arg, e)))?;
                debug!(dir = %arg, files = files.len(), "expanded directory input");
                out.extend(files.into_iter().map(Source::File));
            } else {
                out.push(Source::File(path.to_path_buf()));
            }
        }
    }
    Ok(out)
}

/// Every non-directory entry beneath `dir`, depth-first in lexicographic order.
fn walk_dir(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?.map(|e| e.map(|e| e.path())).collect::<io::Result<_>>()?;
    entries.sort();
    for path in entries {
        if std::fs::metadata(&path)?.is_dir() {
            walk_dir(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// One lazily opened reader per source. URL reads block on `handle`, so the
/// readers belong on a blocking thread, not on a runtime worker.
pub fn readers(sources: Vec<Source>, timeout: Duration, handle: Handle) -> Result<Vec<SourceReader>> {
    let client = if sources.iter().any(|s| matches!(s, Source::Url(_))) {
        let c = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnnotateError::input(format!("building HTTP client: {}", e)))?;
        Some(c)
    } else {
        None
    };
    Ok(sources
        .into_iter()
        .map(|source| SourceReader { source, client: client.clone(), handle: handle.clone(), inner: None })
        .collect())
}

pub struct SourceReader {
    source: Source,
    client: Option<reqwest::Client>,
    handle: Handle,
    inner: Option<Box<dyn BufRead>>,
}

impl SourceReader {
    fn open(&mut self) -> io::Result<&mut Box<dyn BufRead>> {
        if self.inner.is_none() {
            let reader = self.connect().map_err(|e| io::Error::other(e.to_string()))?;
            self.inner = Some(reader);
        }
        self.inner.as_mut().ok_or_else(|| io::Error::other("input source is not open"))
    }

    fn connect(&self) -> Result<Box<dyn BufRead>> {
        match (&self.source, &self.client) {
            (Source::Stdin, _) => Ok(Box::new(io::stdin().lock())),
            (Source::File(path), _) => {
                let f = File::open(path).map_err(|e| AnnotateError::input(format!("{}: {}", path.display(), e)))?;
                Ok(Box::new(BufReader::new(f)))
            }
            (Source::Url(url), Some(client)) => {
                let resp = self.handle.block_on(fetch(client, url))?;
                let body = Box::pin(resp.bytes_stream().map_err(io::Error::other));
                let bridge = SyncIoBridge::new_with_handle(StreamReader::new(body), self.handle.clone());
                Ok(Box::new(BufReader::new(bridge)))
            }
            (Source::Url(url), None) => Err(AnnotateError::input(format!("no HTTP client for {}", url))),
        }
    }
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.open()?.read(buf)
    }
}

impl BufRead for SourceReader {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.open()?.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        if let Some(inner) = self.inner.as_mut() {
            inner.consume(amt);
        }
    }
}

async fn fetch(client: &reqwest::Client, url: &str) -> Result<reqwest::Response> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| AnnotateError::input(format!("GET {}: {}", url, e)))?;
    check_status(url, resp.status())?;
    debug!(url, length = ?resp.content_length(), "streaming manifest");
    Ok(resp)
}

fn check_status(url: &str, status: reqwest::StatusCode) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    Err(AnnotateError::input(format!("GET {}: unexpected status {}", url, status)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_and_dash_mean_stdin() {
        assert_eq!(resolve(&[]).unwrap(), vec![Source::Stdin]);
        assert_eq!(resolve(&args(&["-"])).unwrap(), vec![Source::Stdin]);
    }

    #[test]
    fn stdin_may_be_named_only_once() {
        let err = resolve(&args(&["-", "https://example.com/a.yaml", "-"])).unwrap_err();
        assert!(matches!(err, AnnotateError::Input(_)), "{}", err);
        assert!(err.to_string().contains("more than once"), "{}", err);
    }

    #[test]
    fn urls_are_kept_verbatim() {
        let s = resolve(&args(&["https://example.com/app.yaml"])).unwrap();
        assert_eq!(s, vec![Source::Url("https://example.com/app.yaml".into())]);
    }

    #[test]
    fn directories_expand_recursively_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.yaml"), "kind: B\n").unwrap();
        std::fs::write(dir.path().join("a.yaml"), "kind: A\n").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("c.yaml"), "kind: C\n").unwrap();
        let s = resolve(&args(&[dir.path().to_str().unwrap()])).unwrap();
        let names: Vec<_> = s
            .iter()
            .map(|src| match src {
                Source::File(p) => p.strip_prefix(dir.path()).unwrap().to_path_buf(),
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(names, vec![PathBuf::from("a.yaml"), PathBuf::from("b.yaml"), PathBuf::from("sub/c.yaml")]);
    }

    #[test]
    fn missing_path_is_an_input_error() {
        let err = resolve(&args(&["/definitely/not/here.yaml"])).unwrap_err();
        assert!(matches!(err, AnnotateError::Input(_)), "{}", err);
    }

    #[test]
    fn non_success_status_names_the_status_line() {
        let err = check_status("http://x/m.yaml", reqwest::StatusCode::NOT_FOUND).unwrap_err();
        assert!(err.to_string().contains("404 Not Found"), "{}", err);
        assert!(check_status("http://x/m.yaml", reqwest::StatusCode::NO_CONTENT).is_ok());
    }

    #[test]
    fn files_open_on_first_read() {
        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.yaml");
        std::fs::write(&a, "kind: A\n").unwrap();
        let mut readers = readers(vec![Source::File(a.clone()), Source::File(a)], http_timeout(), rt.handle().clone()).unwrap();
        assert_eq!(readers.len(), 2);
        assert!(readers.iter().all(|r| r.inner.is_none()));
        let mut s = String::new();
        readers[1].read_to_string(&mut s).unwrap();
        assert_eq!(s, "kind: A\n");
        assert!(readers[0].inner.is_none());
    }

    #[test]
    fn url_is_not_contacted_until_read() {
        let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
        let url = "http://127.0.0.1:9/app.yaml";
        let mut readers = readers(vec![Source::Url(url.into())], Duration::from_secs(5), rt.handle().clone()).unwrap();
        assert!(readers[0].inner.is_none());
        let err = readers[0].fill_buf().unwrap_err();
        assert!(err.to_string().contains(url), "{}", err);
    }
}
