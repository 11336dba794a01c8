use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use log::debug;

use crate::error::Error;
use crate::url::Url;

pub(crate) const LOCAL_SCHEMES: &[&str] = &["", "file", "osfs"];

/// How to treat compressed content when opening a file for reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decompress {
    /// Always open the raw bytes.
    None,
    /// Probe for a known compression format, falling back to the raw bytes.
    Auto,
    /// Probe for a known compression format; unknown formats are an error.
    Force,
}

impl Default for Decompress {
    fn default() -> Self {
        Decompress::None
    }
}

/// True if the input names something on the local filesystem.
pub(crate) fn is_local(url_or_filename: &str) -> bool {
    match Url::parse(url_or_filename) {
        Ok(url) => LOCAL_SCHEMES.contains(&url.scheme()),
        Err(_) => false,
    }
}

/// Strip a local scheme prefix, leaving a plain filesystem path.
pub(crate) fn extract_path(url_or_filename: &str) -> PathBuf {
    for prefix in &["file://", "osfs://"] {
        if let Some(rest) = url_or_filename.strip_prefix(prefix) {
            return PathBuf::from(rest);
        }
    }
    PathBuf::from(url_or_filename)
}

/// The final segment of the URL path, if any.
pub(crate) fn url_basename(url: &Url) -> Option<String> {
    url.path()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .map(String::from)
}

/// Remove a file or a directory tree, tolerating an already-missing target.
pub(crate) fn remove_file_or_directory<P: AsRef<Path>>(path: P) -> io::Result<()> {
    let path = path.as_ref();
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Compression {
    Gzip,
    Bzip2,
    Xz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    TarBz2,
}

fn sniff_header(path: &Path) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; 8192];
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);
    Ok(buf)
}

pub(crate) fn detect_compression(path: &Path) -> io::Result<Option<Compression>> {
    let header = sniff_header(path)?;
    Ok(compression_of(&header))
}

fn compression_of(header: &[u8]) -> Option<Compression> {
    if infer::archive::is_gz(header) {
        Some(Compression::Gzip)
    } else if infer::archive::is_bz2(header) {
        Some(Compression::Bzip2)
    } else if infer::archive::is_xz(header) {
        Some(Compression::Xz)
    } else {
        None
    }
}

pub(crate) fn compression_from_extension(path: &Path) -> Option<Compression> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("gz") => Some(Compression::Gzip),
        Some("bz2") => Some(Compression::Bzip2),
        Some("xz") | Some("lzma") => Some(Compression::Xz),
        _ => None,
    }
}

/// True if the magic bytes of a decompressed stream look like a tar header.
fn decompressed_is_tar<R: Read>(reader: R) -> bool {
    let mut head = [0u8; 262];
    let mut taken = reader.take(head.len() as u64);
    let mut filled = 0;
    while filled < head.len() {
        match taken.read(&mut head[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(_) => return false,
        }
    }
    filled == head.len() && infer::archive::is_tar(&head)
}

pub(crate) fn detect_archive_format(path: &Path) -> io::Result<Option<ArchiveFormat>> {
    if !path.is_file() {
        return Ok(None);
    }
    let header = sniff_header(path)?;
    if infer::archive::is_zip(&header) {
        return Ok(Some(ArchiveFormat::Zip));
    }
    if infer::archive::is_tar(&header) {
        return Ok(Some(ArchiveFormat::Tar));
    }
    match compression_of(&header) {
        Some(Compression::Gzip) if decompressed_is_tar(GzDecoder::new(&header[..])) => {
            Ok(Some(ArchiveFormat::TarGz))
        }
        Some(Compression::Bzip2) if decompressed_is_tar(BzDecoder::new(&header[..])) => {
            Ok(Some(ArchiveFormat::TarBz2))
        }
        _ => Ok(None),
    }
}

/// True if the file is a zip or a (possibly compressed) tar, judged by its
/// magic bytes rather than its extension.
pub fn is_archive_file<P: AsRef<Path>>(path: P) -> bool {
    matches!(detect_archive_format(path.as_ref()), Ok(Some(_)))
}

/// Extract `source` so that `target` never exists in a partially-extracted
/// state: the archive is unpacked into a sibling temp directory which is
/// renamed over the target at the end.
pub fn extract_archive_file<P: AsRef<Path>, Q: AsRef<Path>>(
    source: P,
    target: Q,
) -> Result<(), Error> {
    let source = source.as_ref();
    let target = target.as_ref();
    let format = detect_archive_format(source)?
        .ok_or_else(|| Error::Archive(format!("not an archive file: {}", source.display())))?;

    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;
    let temp_dir = tempfile::Builder::new()
        .prefix(".minato-extract-")
        .tempdir_in(parent)?;

    debug!("extracting {:?} into {:?}", source, temp_dir.path());
    match format {
        ArchiveFormat::Zip => {
            let mut archive = zip::ZipArchive::new(File::open(source)?)?;
            archive.extract(temp_dir.path())?;
        }
        ArchiveFormat::Tar => {
            let reader = BufReader::new(File::open(source)?);
            tar::Archive::new(reader).unpack(temp_dir.path())?;
        }
        ArchiveFormat::TarGz => {
            let reader = GzDecoder::new(BufReader::new(File::open(source)?));
            tar::Archive::new(reader).unpack(temp_dir.path())?;
        }
        ArchiveFormat::TarBz2 => {
            let reader = BzDecoder::new(BufReader::new(File::open(source)?));
            tar::Archive::new(reader).unpack(temp_dir.path())?;
        }
    }

    remove_file_or_directory(target)?;
    let temp_path = temp_dir.into_path();
    if let Err(err) = fs::rename(&temp_path, target) {
        let _ = fs::remove_dir_all(&temp_path);
        return Err(err.into());
    }
    Ok(())
}

/// Open a local file, transparently decoding gzip/bzip2/xz content according
/// to `decompress`.
pub fn open_with_decompress(
    path: &Path,
    decompress: Decompress,
) -> Result<Box<dyn Read + Send>, Error> {
    let file = File::open(path).map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            Error::NotFound(path.display().to_string())
        } else {
            Error::Io(err)
        }
    })?;
    if decompress == Decompress::None {
        return Ok(Box::new(BufReader::new(file)));
    }
    match detect_compression(path)? {
        Some(Compression::Gzip) => Ok(Box::new(GzDecoder::new(BufReader::new(file)))),
        Some(Compression::Bzip2) => Ok(Box::new(BzDecoder::new(BufReader::new(file)))),
        Some(Compression::Xz) => open_xz(file),
        None if decompress == Decompress::Force => Err(Error::Archive(format!(
            "unknown compression format: {}",
            path.display()
        ))),
        None => Ok(Box::new(BufReader::new(file))),
    }
}

#[cfg(feature = "lzma")]
fn open_xz(file: File) -> Result<Box<dyn Read + Send>, Error> {
    let mut reader = BufReader::new(file);
    let mut decoded = Vec::new();
    lzma_rs::xz_decompress(&mut reader, &mut decoded)
        .map_err(|err| Error::Archive(err.to_string()))?;
    Ok(Box::new(io::Cursor::new(decoded)))
}

#[cfg(not(feature = "lzma"))]
fn open_xz(_file: File) -> Result<Box<dyn Read + Send>, Error> {
    Err(Error::Archive(
        "xz-compressed input requires the `lzma` feature".to_string(),
    ))
}

enum WriterKind {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
    Bzip2(BzEncoder<BufWriter<File>>),
    #[cfg(feature = "lzma")]
    Xz {
        file: BufWriter<File>,
        buffer: Vec<u8>,
    },
}

/// A writer that finalizes its compression stream on `finish`. Dropping
/// without finishing flushes on a best-effort basis.
pub struct CompressedWriter {
    inner: Option<WriterKind>,
}

/// Create a local file whose compression is chosen by extension
/// (`.gz`/`.bz2`/`.xz`/`.lzma`), or a plain file otherwise.
pub fn create_with_compress(path: &Path) -> Result<CompressedWriter, Error> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = BufWriter::new(File::create(path)?);
    let inner = match compression_from_extension(path) {
        Some(Compression::Gzip) => WriterKind::Gzip(GzEncoder::new(file, Default::default())),
        Some(Compression::Bzip2) => WriterKind::Bzip2(BzEncoder::new(file, Default::default())),
        Some(Compression::Xz) => xz_writer(file)?,
        None => WriterKind::Plain(file),
    };
    Ok(CompressedWriter { inner: Some(inner) })
}

#[cfg(feature = "lzma")]
fn xz_writer(file: BufWriter<File>) -> Result<WriterKind, Error> {
    Ok(WriterKind::Xz {
        file,
        buffer: Vec::new(),
    })
}

#[cfg(not(feature = "lzma"))]
fn xz_writer(_file: BufWriter<File>) -> Result<WriterKind, Error> {
    Err(Error::Archive(
        "xz-compressed output requires the `lzma` feature".to_string(),
    ))
}

impl CompressedWriter {
    /// Terminate the compression stream and flush everything to disk.
    pub fn finish(&mut self) -> io::Result<()> {
        match self.inner.take() {
            None => Ok(()),
            Some(WriterKind::Plain(mut file)) => file.flush(),
            Some(WriterKind::Gzip(encoder)) => encoder.finish()?.flush(),
            Some(WriterKind::Bzip2(encoder)) => encoder.finish()?.flush(),
            #[cfg(feature = "lzma")]
            Some(WriterKind::Xz { mut file, buffer }) => {
                let mut cursor = io::Cursor::new(buffer);
                lzma_rs::xz_compress(&mut cursor, &mut file)?;
                file.flush()
            }
        }
    }
}

impl Write for CompressedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.inner.as_mut() {
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                "write after finish",
            )),
            Some(WriterKind::Plain(file)) => file.write(buf),
            Some(WriterKind::Gzip(encoder)) => encoder.write(buf),
            Some(WriterKind::Bzip2(encoder)) => encoder.write(buf),
            #[cfg(feature = "lzma")]
            Some(WriterKind::Xz { buffer, .. }) => {
                buffer.extend_from_slice(buf);
                Ok(buf.len())
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.inner.as_mut() {
            None => Ok(()),
            Some(WriterKind::Plain(file)) => file.flush(),
            Some(WriterKind::Gzip(encoder)) => encoder.flush(),
            Some(WriterKind::Bzip2(encoder)) => encoder.flush(),
            #[cfg(feature = "lzma")]
            Some(WriterKind::Xz { .. }) => Ok(()),
        }
    }
}

impl Drop for CompressedWriter {
    fn drop(&mut self) {
        if self.inner.is_some() {
            if let Err(err) = self.finish() {
                debug!("failed to finish compressed writer: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn write_zip(path: &Path, name: &str, content: &[u8]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::FileOptions::default();
        zip.start_file(name, options).unwrap();
        zip.write_all(content).unwrap();
        zip.finish().unwrap();
    }

    fn write_tar_gz(path: &Path, name: &str, content: &[u8]) {
        let file = File::create(path).unwrap();
        let encoder = GzEncoder::new(file, Default::default());
        let mut builder = tar::Builder::new(encoder);
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, Cursor::new(content.to_vec()))
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_is_archive_file() {
        let dir = tempdir().unwrap();

        let zip_path = dir.path().join("sample.zip");
        write_zip(&zip_path, "foo.txt", b"foo");
        assert!(is_archive_file(&zip_path));

        let tgz_path = dir.path().join("sample.tar.gz");
        write_tar_gz(&tgz_path, "foo.txt", b"foo");
        assert!(is_archive_file(&tgz_path));

        let text_path = dir.path().join("plain.txt");
        fs::write(&text_path, b"not an archive").unwrap();
        assert!(!is_archive_file(&text_path));

        assert!(!is_archive_file(dir.path()));
    }

    #[test]
    fn test_extract_zip() {
        let dir = tempdir().unwrap();
        let zip_path = dir.path().join("sample.zip");
        write_zip(&zip_path, "nested/foo.txt", b"hello zip\n");

        let target = dir.path().join("out");
        extract_archive_file(&zip_path, &target).unwrap();
        let content = fs::read_to_string(target.join("nested/foo.txt")).unwrap();
        assert_eq!(content, "hello zip\n");
    }

    #[test]
    fn test_extract_tar_gz_replaces_stale_target() {
        let dir = tempdir().unwrap();
        let tgz_path = dir.path().join("sample.tar.gz");
        write_tar_gz(&tgz_path, "foo.txt", b"fresh\n");

        let target = dir.path().join("out");
        fs::create_dir_all(&target).unwrap();
        fs::write(target.join("stale.txt"), b"stale").unwrap();

        extract_archive_file(&tgz_path, &target).unwrap();
        assert!(!target.join("stale.txt").exists());
        assert_eq!(fs::read_to_string(target.join("foo.txt")).unwrap(), "fresh\n");
    }

    #[test]
    fn test_extract_non_archive_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.txt");
        fs::write(&path, b"plain").unwrap();
        let result = extract_archive_file(&path, &dir.path().join("out"));
        assert!(matches!(result, Err(Error::Archive(_))));
    }

    #[test]
    fn test_open_with_decompress_gzip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.gz");
        let mut writer = create_with_compress(&path).unwrap();
        writer.write_all(b"compressed content\n").unwrap();
        writer.finish().unwrap();

        let mut reader = open_with_decompress(&path, Decompress::Auto).unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).unwrap();
        assert_eq!(content, "compressed content\n");

        // Decompress::None yields the raw gzip bytes.
        let mut raw = Vec::new();
        open_with_decompress(&path, Decompress::None)
            .unwrap()
            .read_to_end(&mut raw)
            .unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_open_with_decompress_force_rejects_plain() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.txt");
        fs::write(&path, b"plain").unwrap();
        assert!(open_with_decompress(&path, Decompress::Force).is_err());
        assert!(open_with_decompress(&path, Decompress::Auto).is_ok());
    }

    #[test]
    fn test_extract_path_strips_scheme() {
        assert_eq!(extract_path("file:///tmp/x"), PathBuf::from("/tmp/x"));
        assert_eq!(extract_path("osfs://relative/x"), PathBuf::from("relative/x"));
        assert_eq!(extract_path("/tmp/y"), PathBuf::from("/tmp/y"));
    }

    #[test]
    fn test_is_local() {
        assert!(is_local("/tmp/foo.txt"));
        assert!(is_local("file:///tmp/foo.txt"));
        assert!(is_local("osfs://foo.txt"));
        assert!(!is_local("https://example.com/foo.txt"));
        assert!(!is_local("s3://bucket/foo.txt"));
    }

    #[test]
    fn test_remove_file_or_directory_tolerates_missing() {
        let dir = tempdir().unwrap();
        remove_file_or_directory(dir.path().join("nope")).unwrap();
    }
}
