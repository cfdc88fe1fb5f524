//! XMP File API
//!
//! This module provides the file-level session: open a file, read its main
//! XMP packet, stage a replacement and write it back on close.
//!
//! Closing tries, in order:
//! 1. an in-place update, serializing the new packet to the exact length of
//!    the old one;
//! 2. a full rewrite-copy through the format handler;
//! 3. failing with `CapacityExceeded` or `NotSupported`, leaving the file
//!    untouched.

use crate::core::context::XmpContext;
use crate::core::error::{XmpError, XmpResult};
use crate::core::metadata::XmpMeta;
use crate::core::serializer::SerializeOptions;
use crate::files::format::FileFormat;
use crate::files::handler::{CloseOptions, FileHandler, HandlerFlags, PacketLocation, XmpOptions};
use crate::files::packet::PacketInfo;
use crate::files::registry::{default_registry, Handler};
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::io::{self, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// Basic information about an open file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Path the file was opened with
    pub file_path: PathBuf,
    /// Format of the file
    pub format: FileFormat,
    /// Capabilities of the handler serving the file
    pub handler_flags: HandlerFlags,
    /// Options the file was opened with
    pub open_flags: XmpOptions,
}

/// High-level API for working with XMP metadata in files
///
/// # File Update Behavior
///
/// When a file is opened with [`XmpOptions::for_update`], changes made via
/// [`XmpFile::put_xmp`] are not written to disk immediately. They are only
/// written when [`XmpFile::close_file`] is called. Dropping an open file
/// releases it without writing.
///
/// # Example
///
/// ```rust,no_run
/// use xmpengine::{ns, CloseOptions, FileFormat, XmpFile, XmpMeta, XmpOptions};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut file = XmpFile::open("image.jpg", FileFormat::Unknown, XmpOptions::default().for_update())?;
///
/// let mut meta = file.get_xmp().unwrap_or_else(XmpMeta::new);
/// meta.set_property(ns::XMP, "CreatorTool", "MyApp")?;
/// if file.can_put_xmp(&meta) {
///     file.put_xmp(meta)?;
/// }
///
/// // Changes are written to disk when the file is closed
/// file.close_file(CloseOptions::default().update_safely())?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct XmpFile {
    ctx: Option<Arc<XmpContext>>,
    file: Option<File>,
    path: Option<PathBuf>,
    format: FileFormat,
    handler: Option<Handler>,
    options: XmpOptions,
    packet: Option<PacketInfo>,
    meta: Option<XmpMeta>,
    staged: Option<XmpMeta>,
}

impl XmpFile {
    /// Create a closed `XmpFile`; open it with [`XmpFile::open_with`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` as `format`.
    ///
    /// [`FileFormat::Unknown`] detects the format from the file content.
    pub fn open<P: AsRef<Path>>(path: P, format: FileFormat, options: XmpOptions) -> XmpResult<Self> {
        let mut file = Self::new();
        file.open_with_format(path, format, options)?;
        Ok(file)
    }

    /// Open `path`, detecting its format
    pub fn open_with<P: AsRef<Path>>(&mut self, path: P, options: XmpOptions) -> XmpResult<()> {
        self.open_with_format(path, FileFormat::Unknown, options)
    }

    /// Open `path` as `format` into this `XmpFile`
    pub fn open_with_format<P: AsRef<Path>>(
        &mut self,
        path: P,
        format: FileFormat,
        options: XmpOptions,
    ) -> XmpResult<()> {
        self.open_with_context(path, format, options, XmpContext::global())
    }

    /// Open `path`, parsing its packet against `ctx` instead of the global context
    pub fn open_with_context<P: AsRef<Path>>(
        &mut self,
        path: P,
        format: FileFormat,
        options: XmpOptions,
        ctx: Arc<XmpContext>,
    ) -> XmpResult<()> {
        if self.is_open() {
            return Err(XmpError::BadParam("A file is already open".to_string()));
        }
        ctx.check_alive()?;
        options.validate()?;
        let path = path.as_ref();
        let mut file = OpenOptions::new()
            .read(true)
            .write(options.for_update)
            .open(path)?;

        let hint = if format == FileFormat::Unknown {
            FileFormat::from_path(path)
        } else {
            format
        };
        let handler = select_handler(&mut file, format, hint, &options)?;
        debug!(
            "Opened {} with the {} handler",
            path.display(),
            handler.format_name()
        );

        let packet = match handler.locate_packet(&mut file)? {
            Some(location) => {
                let bytes = handler.extract_packet(&mut file, &location)?;
                Some(PacketInfo::analyze(location.offset, bytes))
            }
            None => None,
        };
        let meta = packet
            .as_ref()
            .map(|p| XmpMeta::from_bytes_with_context(&p.packet, ctx.clone()))
            .transpose()?;

        self.format = if handler.is_scanner() {
            hint
        } else {
            handler.format()
        };
        self.ctx = Some(ctx);
        self.file = Some(file);
        self.path = Some(path.to_path_buf());
        self.handler = Some(handler);
        self.options = options;
        self.packet = packet;
        self.meta = meta;
        self.staged = None;
        Ok(())
    }

    /// Whether a file is open
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Context packets are parsed against; the global one when closed
    pub fn context(&self) -> Arc<XmpContext> {
        self.ctx.clone().unwrap_or_else(XmpContext::global)
    }

    /// The file's XMP, or the staged replacement if there is one.
    ///
    /// `None` if the file has no XMP.
    pub fn get_xmp(&self) -> Option<XmpMeta> {
        self.staged.as_ref().or(self.meta.as_ref()).cloned()
    }

    /// The raw packet as found when the file was opened
    pub fn get_packet_info(&self) -> Option<PacketInfo> {
        self.packet.clone()
    }

    /// Basic information about the open file
    pub fn get_file_info(&self) -> XmpResult<FileInfo> {
        let (Some(path), Some(handler)) = (&self.path, &self.handler) else {
            return Err(XmpError::BadParam("No file is open".to_string()));
        };
        Ok(FileInfo {
            file_path: path.clone(),
            format: self.format,
            handler_flags: handler.flags(),
            open_flags: self.options,
        })
    }

    /// Capabilities for `format`, `None` if the format is not handled
    pub fn get_format_info(format: FileFormat) -> Option<HandlerFlags> {
        default_registry().format_info(format)
    }

    /// Whether `meta` can be written to this file on close
    pub fn can_put_xmp(&self, meta: &XmpMeta) -> bool {
        let Some(handler) = self.handler.as_ref().filter(|_| self.options.for_update) else {
            return false;
        };
        let flags = handler.flags();
        if let Some(info) = self.in_place_target() {
            if meta
                .serialize_to_bytes(&in_place_options(info, flags))
                .is_ok()
            {
                return true;
            }
        }
        if !self.can_rewrite(flags) {
            return false;
        }
        match meta.serialize_to_bytes(&rewrite_options(flags)) {
            Ok(bytes) => handler.max_packet_size().is_none_or(|max| bytes.len() <= max),
            Err(_) => false,
        }
    }

    /// [`XmpFile::can_put_xmp`] for a packet string
    pub fn can_put_xmp_str(&self, packet: &str) -> bool {
        XmpMeta::parse_with_context(packet, self.context())
            .is_ok_and(|meta| self.can_put_xmp(&meta))
    }

    /// [`XmpFile::can_put_xmp`] for raw packet bytes
    pub fn can_put_xmp_bytes(&self, packet: &[u8]) -> bool {
        XmpMeta::from_bytes_with_context(packet, self.context())
            .is_ok_and(|meta| self.can_put_xmp(&meta))
    }

    /// Stage new XMP; it is written by [`XmpFile::close_file`].
    pub fn put_xmp(&mut self, meta: XmpMeta) -> XmpResult<()> {
        if !self.is_open() {
            return Err(XmpError::BadParam("No file is open".to_string()));
        }
        if !self.options.for_update {
            return Err(XmpError::BadParam(
                "File is not open for update".to_string(),
            ));
        }
        self.staged = Some(meta);
        Ok(())
    }

    /// Stage new XMP from a packet string
    pub fn put_xmp_str(&mut self, packet: &str) -> XmpResult<()> {
        let meta = XmpMeta::parse_with_context(packet, self.context())?;
        self.put_xmp(meta)
    }

    /// Stage new XMP from raw packet bytes
    pub fn put_xmp_bytes(&mut self, packet: &[u8]) -> XmpResult<()> {
        let meta = XmpMeta::from_bytes_with_context(packet, self.context())?;
        self.put_xmp(meta)
    }

    /// Close the file, writing staged XMP first.
    ///
    /// On failure the file on disk is left as it was and this `XmpFile`
    /// stays open, so the caller may retry or drop it. Rewrites always go
    /// through a temp file and a rename. An in-place update without
    /// `update_safely` overwrites the packet bytes directly, so an I/O error
    /// in the middle of that write can leave a damaged packet.
    pub fn close_file(&mut self, options: CloseOptions) -> XmpResult<()> {
        if !self.is_open() {
            return Ok(());
        }
        self.write_staged(options)?;
        self.staged = None;
        *self = Self::new();
        Ok(())
    }

    /// The packet to overwrite in place, if in-place update is possible
    fn in_place_target(&self) -> Option<&PacketInfo> {
        let handler = self.handler.as_ref()?;
        self.packet
            .as_ref()
            .filter(|info| info.writeable || !handler.is_scanner())
    }

    fn can_rewrite(&self, flags: HandlerFlags) -> bool {
        let needed = if self.packet.is_some() {
            HandlerFlags::CAN_REWRITE
        } else {
            HandlerFlags::CAN_REWRITE | HandlerFlags::CAN_INJECT_XMP
        };
        flags.contains(needed)
    }

    fn write_staged(&mut self, options: CloseOptions) -> XmpResult<()> {
        let Some(meta) = self.staged.as_ref() else {
            return Ok(());
        };
        self.context().check_alive()?;
        let handler = self
            .handler
            .clone()
            .ok_or_else(|| XmpError::InternalError("Open file without a handler".to_string()))?;
        let flags = handler.flags();

        if let Some(info) = self.in_place_target() {
            match meta.serialize_to_bytes(&in_place_options(info, flags)) {
                Ok(bytes) => {
                    debug!("Updating the {} byte packet in place", info.length);
                    let location = PacketLocation {
                        offset: info.offset,
                        length: info.length,
                    };
                    return self.commit_in_place(&handler, &location, &bytes, options);
                }
                Err(XmpError::CapacityExceeded { needed, available })
                    if self.can_rewrite(flags) =>
                {
                    debug!(
                        "Packet needs {} bytes, {} available; rewriting the file",
                        needed, available
                    );
                }
                Err(e) => return Err(e),
            }
        }

        if !self.can_rewrite(flags) {
            let reason = match &self.packet {
                Some(_) => "the packet is read-only",
                None => "the file has no packet to update",
            };
            return Err(XmpError::NotSupported(format!(
                "{} handler cannot update {}: {}",
                handler.format_name(),
                self.format,
                reason
            )));
        }

        let bytes = meta.serialize_to_bytes(&rewrite_options(flags))?;
        if let Some(max) = handler.max_packet_size() {
            if bytes.len() > max {
                return Err(XmpError::CapacityExceeded {
                    needed: bytes.len(),
                    available: max,
                });
            }
        }
        debug!(
            "Rewriting the file through the {} handler",
            handler.format_name()
        );
        self.commit_rewrite(&handler, &bytes, options)
    }

    fn commit_in_place(
        &mut self,
        handler: &Handler,
        location: &PacketLocation,
        packet: &[u8],
        options: CloseOptions,
    ) -> XmpResult<()> {
        if options.update_safely {
            let mut temp = self.temp_file()?;
            let file = self.open_file()?;
            file.rewind()?;
            io::copy(file, temp.as_file_mut())?;
            handler.update_in_place(temp.as_file_mut(), location, packet)?;
            return self.persist(temp);
        }
        let file = self.open_file()?;
        handler.update_in_place(file, location, packet)?;
        file.sync_all()?;
        Ok(())
    }

    fn commit_rewrite(
        &mut self,
        handler: &Handler,
        packet: &[u8],
        options: CloseOptions,
    ) -> XmpResult<()> {
        // The original is only ever replaced by rename, never truncated
        debug!(
            "Rewriting {} through a temp file (update_safely: {})",
            self.path()?.display(),
            options.update_safely
        );
        let mut temp = self.temp_file()?;
        let file = self.open_file()?;
        file.rewind()?;
        handler.rewrite(file, temp.as_file_mut(), packet)?;
        self.persist(temp)
    }

    fn open_file(&mut self) -> XmpResult<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| XmpError::BadParam("No file is open".to_string()))
    }

    fn path(&self) -> XmpResult<&Path> {
        self.path
            .as_deref()
            .ok_or_else(|| XmpError::BadParam("No file is open".to_string()))
    }

    fn temp_file(&self) -> XmpResult<NamedTempFile> {
        let dir = match self.path()?.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(NamedTempFile::new_in(dir)?)
    }

    /// Swap `temp` in for the open file
    fn persist(&mut self, temp: NamedTempFile) -> XmpResult<()> {
        temp.as_file().sync_all()?;
        let path = self.path()?.to_path_buf();
        // Release our handle so the rename can replace the file everywhere
        self.file = None;
        match temp.persist(&path) {
            Ok(_) => Ok(()),
            Err(e) => {
                self.file = Some(OpenOptions::new().read(true).write(true).open(&path)?);
                Err(XmpError::IoError(e.error))
            }
        }
    }
}

impl Drop for XmpFile {
    fn drop(&mut self) {
        if self.is_open() && self.staged.is_some() {
            warn!(
                "{} dropped with unwritten XMP changes",
                self.path
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            );
        }
    }
}

/// Pick the handler for a file
fn select_handler(
    file: &mut File,
    format: FileFormat,
    hint: FileFormat,
    options: &XmpOptions,
) -> XmpResult<Handler> {
    let registry = default_registry();
    if options.use_packet_scanning {
        if options.limited_scanning && !hint.is_scanned() {
            return Err(XmpError::NotSupported(format!(
                "{} files are not scanned with limited scanning",
                hint
            )));
        }
        return Ok(registry.scanner(hint));
    }

    let mut smart = None;
    if let Some(handler) = registry.find_by_format(format) {
        if handler.can_handle(file)? {
            smart = Some(handler.clone());
        }
    }
    if smart.is_none() && !(options.strict && format != FileFormat::Unknown) {
        smart = registry.find_by_detection(file)?.cloned();
    }
    if let Some(handler) = smart {
        return Ok(handler);
    }

    if options.use_smart_handler {
        return Err(XmpError::NotSupported(
            "No smart file handler available to handle file".to_string(),
        ));
    }
    if options.strict && format != FileFormat::Unknown && !format.is_scanned() {
        return Err(XmpError::NotSupported(format!(
            "File content does not match the {} format",
            format
        )));
    }
    if options.limited_scanning && !hint.is_scanned() {
        return Err(XmpError::NotSupported(format!(
            "{} files are not scanned with limited scanning",
            hint
        )));
    }
    Ok(registry.scanner(hint))
}

fn in_place_options(info: &PacketInfo, flags: HandlerFlags) -> SerializeOptions {
    SerializeOptions::default()
        .exact_packet_length(info.length)
        .encoding(info.char_form)
        .read_only_packet(!info.writeable || flags.contains(HandlerFlags::NEEDS_READONLY_PACKET))
}

fn rewrite_options(flags: HandlerFlags) -> SerializeOptions {
    SerializeOptions::default()
        .read_only_packet(flags.contains(HandlerFlags::NEEDS_READONLY_PACKET))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::namespace::ns;
    use std::fs;

    fn scanned_text(meta: &XmpMeta, padding: usize) -> Vec<u8> {
        let packet = meta
            .serialize_with(&SerializeOptions::default().padding(padding))
            .unwrap();
        format!("header line\n{}\ntrailer line\n", packet).into_bytes()
    }

    fn sample_meta(tool: &str) -> XmpMeta {
        let mut meta = XmpMeta::new();
        meta.set_property(ns::XMP, "CreatorTool", tool).unwrap();
        meta
    }

    #[test]
    fn test_new() {
        let file = XmpFile::new();
        assert!(!file.is_open());
        assert!(file.get_xmp().is_none());
        assert!(file.get_file_info().is_err());
    }

    #[test]
    fn test_open_with_terminated_context() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.xml");
        fs::write(&path, scanned_text(&sample_meta("A"), 200)).unwrap();

        let ctx = XmpContext::new();
        let mut file = XmpFile::new();
        file.open_with_context(
            &path,
            FileFormat::Text,
            XmpOptions::default().for_update(),
            ctx.clone(),
        )
        .unwrap();
        assert!(Arc::ptr_eq(&file.context(), &ctx));
        assert!(Arc::ptr_eq(file.get_xmp().unwrap().context(), &ctx));

        file.put_xmp(sample_meta("B")).unwrap();
        ctx.terminate();
        let result = file.close_file(CloseOptions::default());
        assert!(matches!(result, Err(XmpError::Terminated)));

        let mut other = XmpFile::new();
        let reopened = other.open_with_context(&path, FileFormat::Text, XmpOptions::default(), ctx);
        assert!(matches!(reopened, Err(XmpError::Terminated)));
    }

    #[test]
    fn test_put_requires_open_for_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        fs::write(&path, scanned_text(&sample_meta("A"), 100)).unwrap();

        let mut closed = XmpFile::new();
        assert!(closed.put_xmp(XmpMeta::new()).is_err());

        let mut file = XmpFile::open(&path, FileFormat::Text, XmpOptions::default()).unwrap();
        assert!(matches!(
            file.put_xmp(XmpMeta::new()),
            Err(XmpError::BadParam(_))
        ));
        assert!(!file.can_put_xmp(&XmpMeta::new()));
        file.close_file(CloseOptions::default()).unwrap();
        assert!(!file.is_open());
    }

    #[test]
    fn test_in_place_options_follow_packet() {
        let info = PacketInfo::analyze(0, scanned_text(&sample_meta("A"), 10));
        let options = in_place_options(&info, HandlerFlags::empty());
        assert!(options.exact_packet_length);
        assert_eq!(options.padding, Some(info.length));
        assert!(!options.read_only_packet);

        let options = rewrite_options(HandlerFlags::NEEDS_READONLY_PACKET);
        assert!(options.read_only_packet);
        assert!(!options.exact_packet_length);
    }

    #[test]
    fn test_scanner_in_place_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.txt");
        let original = scanned_text(&sample_meta("Before"), 200);
        fs::write(&path, &original).unwrap();

        let mut file =
            XmpFile::open(&path, FileFormat::Unknown, XmpOptions::default().for_update()).unwrap();
        let info = file.get_packet_info().unwrap();
        assert!(info.writeable);
        assert_eq!(info.offset, "header line\n".len() as u64);

        let updated = sample_meta("After, with a longer name");
        assert!(file.can_put_xmp(&updated));
        file.put_xmp(updated).unwrap();
        assert_eq!(
            file.get_xmp()
                .and_then(|m| m.get_property(ns::XMP, "CreatorTool"))
                .and_then(|p| p.as_str().map(str::to_string)),
            Some("After, with a longer name".to_string())
        );
        file.close_file(CloseOptions::default()).unwrap();

        let written = fs::read(&path).unwrap();
        assert_eq!(written.len(), original.len());
        assert!(written.starts_with(b"header line\n"));
        assert!(written.ends_with(b"\ntrailer line\n"));

        let reopened = XmpFile::open(&path, FileFormat::Text, XmpOptions::default()).unwrap();
        let tool = reopened
            .get_xmp()
            .and_then(|m| m.get_property(ns::XMP, "CreatorTool"));
        assert_eq!(
            tool.and_then(|p| p.as_str().map(str::to_string)),
            Some("After, with a longer name".to_string())
        );
    }

    #[test]
    fn test_scanner_capacity_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.html");
        let original = scanned_text(&sample_meta("A"), 0);
        fs::write(&path, &original).unwrap();

        let mut file =
            XmpFile::open(&path, FileFormat::Unknown, XmpOptions::default().for_update()).unwrap();
        let big = sample_meta(&"x".repeat(500));
        assert!(!file.can_put_xmp(&big));
        file.put_xmp(big).unwrap();

        let result = file.close_file(CloseOptions::default().update_safely());
        assert!(matches!(result, Err(XmpError::CapacityExceeded { .. })));
        assert!(file.is_open());
        assert_eq!(fs::read(&path).unwrap(), original);
    }

    #[test]
    fn test_scanner_cannot_inject() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"no metadata here").unwrap();

        let mut file =
            XmpFile::open(&path, FileFormat::Unknown, XmpOptions::default().for_update()).unwrap();
        assert!(file.get_xmp().is_none());
        assert!(file.get_packet_info().is_none());
        assert!(!file.can_put_xmp(&sample_meta("A")));
        file.put_xmp(sample_meta("A")).unwrap();
        assert!(matches!(
            file.close_file(CloseOptions::default()),
            Err(XmpError::NotSupported(_))
        ));
        assert_eq!(fs::read(&path).unwrap(), b"no metadata here");
    }

    #[test]
    fn test_select_handler_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.bin");
        fs::write(&path, b"plain bytes").unwrap();

        let smart_only = XmpOptions::default().use_smart_handler();
        assert!(matches!(
            XmpFile::open(&path, FileFormat::Unknown, smart_only),
            Err(XmpError::NotSupported(_))
        ));

        let limited = XmpOptions::default().limited_scanning();
        assert!(matches!(
            XmpFile::open(&path, FileFormat::Unknown, limited),
            Err(XmpError::NotSupported(_))
        ));
        assert!(XmpFile::open(&path, FileFormat::Text, limited).is_ok());

        #[cfg(feature = "jpeg")]
        {
            let strict = XmpOptions::default().strict();
            assert!(matches!(
                XmpFile::open(&path, FileFormat::Jpeg, strict),
                Err(XmpError::NotSupported(_))
            ));
            let file = XmpFile::open(&path, FileFormat::Jpeg, XmpOptions::default()).unwrap();
            assert_eq!(file.get_file_info().unwrap().format, FileFormat::Jpeg);
        }
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = XmpFile::open(
            dir.path().join("missing.jpg"),
            FileFormat::Unknown,
            XmpOptions::default(),
        );
        assert!(matches!(result, Err(XmpError::IoError(_))));
    }
}
