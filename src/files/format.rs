//! Host file format identifiers
//!
//! Every format the toolkit knows by name, with its four-character code and
//! the file extensions that map to it. Only some of them have a smart
//! handler; the text-like ones are served by packet scanning.

use std::fmt;
use std::path::Path;

/// A recognized host file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum FileFormat {
    /// Unknown format; on open this means "detect"
    #[default]
    Unknown,
    /// PDF
    Pdf,
    /// General PostScript following DSC conventions
    PostScript,
    /// Encapsulated PostScript
    Eps,
    /// JPEG
    Jpeg,
    /// JPEG 2000
    Jpeg2k,
    /// TIFF
    Tiff,
    /// GIF
    Gif,
    /// PNG
    Png,
    /// Flash file
    Swf,
    /// Flash authoring file
    Fla,
    /// Flash video
    Flv,
    /// QuickTime
    Mov,
    /// AVI
    Avi,
    /// Cineon
    Cin,
    /// WAV
    Wav,
    /// MP3
    Mp3,
    /// Audition session
    Ses,
    /// Audition loop
    Cel,
    /// MPEG
    Mpeg,
    /// MPEG-2
    Mpeg2,
    /// MPEG-4
    Mpeg4,
    /// Windows Media audio and video
    Wmav,
    /// AIFF
    Aiff,
    /// HTML
    Html,
    /// XML (also SVG)
    Xml,
    /// Plain text
    Text,
    /// Photoshop
    Photoshop,
    /// Illustrator
    Illustrator,
    /// InDesign
    InDesign,
    /// After Effects project
    AeProject,
    /// After Effects project template
    AeProjectTemplate,
    /// After Effects filter preset
    AeFilterPreset,
    /// Encore DVD project
    EncoreProject,
    /// Premiere project
    PremiereProject,
    /// Premiere title
    PremiereTitle,
}

const ALL: [FileFormat; 36] = [
    FileFormat::Unknown,
    FileFormat::Pdf,
    FileFormat::PostScript,
    FileFormat::Eps,
    FileFormat::Jpeg,
    FileFormat::Jpeg2k,
    FileFormat::Tiff,
    FileFormat::Gif,
    FileFormat::Png,
    FileFormat::Swf,
    FileFormat::Fla,
    FileFormat::Flv,
    FileFormat::Mov,
    FileFormat::Avi,
    FileFormat::Cin,
    FileFormat::Wav,
    FileFormat::Mp3,
    FileFormat::Ses,
    FileFormat::Cel,
    FileFormat::Mpeg,
    FileFormat::Mpeg2,
    FileFormat::Mpeg4,
    FileFormat::Wmav,
    FileFormat::Aiff,
    FileFormat::Html,
    FileFormat::Xml,
    FileFormat::Text,
    FileFormat::Photoshop,
    FileFormat::Illustrator,
    FileFormat::InDesign,
    FileFormat::AeProject,
    FileFormat::AeProjectTemplate,
    FileFormat::AeFilterPreset,
    FileFormat::EncoreProject,
    FileFormat::PremiereProject,
    FileFormat::PremiereTitle,
];

impl FileFormat {
    /// All formats, `Unknown` first
    pub fn all() -> &'static [FileFormat] {
        &ALL
    }

    /// The four-character format code, space padded
    pub fn four_cc(self) -> &'static str {
        match self {
            FileFormat::Unknown => "    ",
            FileFormat::Pdf => "PDF ",
            FileFormat::PostScript => "PS  ",
            FileFormat::Eps => "EPS ",
            FileFormat::Jpeg => "JPEG",
            FileFormat::Jpeg2k => "JPX ",
            FileFormat::Tiff => "TIFF",
            FileFormat::Gif => "GIF ",
            FileFormat::Png => "PNG ",
            FileFormat::Swf => "SWF ",
            FileFormat::Fla => "FLA ",
            FileFormat::Flv => "FLV ",
            FileFormat::Mov => "MOV ",
            FileFormat::Avi => "AVI ",
            FileFormat::Cin => "CIN ",
            FileFormat::Wav => "WAV ",
            FileFormat::Mp3 => "MP3 ",
            FileFormat::Ses => "SES ",
            FileFormat::Cel => "CEL ",
            FileFormat::Mpeg => "MPEG",
            FileFormat::Mpeg2 => "MP2 ",
            FileFormat::Mpeg4 => "MP4 ",
            FileFormat::Wmav => "WMAV",
            FileFormat::Aiff => "AIFF",
            FileFormat::Html => "HTML",
            FileFormat::Xml => "XML ",
            FileFormat::Text => "text",
            FileFormat::Photoshop => "PSD ",
            FileFormat::Illustrator => "AI  ",
            FileFormat::InDesign => "INDD",
            FileFormat::AeProject => "AEP ",
            FileFormat::AeProjectTemplate => "AET ",
            FileFormat::AeFilterPreset => "FFX ",
            FileFormat::EncoreProject => "NCOR",
            FileFormat::PremiereProject => "PRPJ",
            FileFormat::PremiereTitle => "PRTL",
        }
    }

    /// Look up a format by its four-character code (trailing spaces optional)
    pub fn from_four_cc(code: &str) -> Option<FileFormat> {
        let code = code.trim_end();
        ALL.iter()
            .copied()
            .find(|f| *f != FileFormat::Unknown && f.four_cc().trim_end() == code)
    }

    /// Lowercase file extensions mapped to this format
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            FileFormat::Unknown => &[],
            FileFormat::Pdf => &["pdf"],
            FileFormat::PostScript => &["ps"],
            FileFormat::Eps => &["eps", "epsf"],
            FileFormat::Jpeg => &["jpg", "jpeg", "jpe", "jfif"],
            FileFormat::Jpeg2k => &["jp2", "jpx", "j2k", "jpf"],
            FileFormat::Tiff => &["tif", "tiff"],
            FileFormat::Gif => &["gif"],
            FileFormat::Png => &["png"],
            FileFormat::Swf => &["swf"],
            FileFormat::Fla => &["fla"],
            FileFormat::Flv => &["flv"],
            FileFormat::Mov => &["mov", "qt"],
            FileFormat::Avi => &["avi"],
            FileFormat::Cin => &["cin"],
            FileFormat::Wav => &["wav"],
            FileFormat::Mp3 => &["mp3"],
            FileFormat::Ses => &["ses"],
            FileFormat::Cel => &["cel"],
            FileFormat::Mpeg => &["mpeg", "mpg", "mp1", "mpe"],
            FileFormat::Mpeg2 => &["mp2", "m2v"],
            FileFormat::Mpeg4 => &["mp4", "m4a", "m4v", "f4v"],
            FileFormat::Wmav => &["wma", "wmv", "asf"],
            FileFormat::Aiff => &["aif", "aiff", "aifc"],
            FileFormat::Html => &["html", "htm"],
            FileFormat::Xml => &["xml", "svg", "xmp"],
            FileFormat::Text => &["txt", "text"],
            FileFormat::Photoshop => &["psd", "psb"],
            FileFormat::Illustrator => &["ai"],
            FileFormat::InDesign => &["indd", "indt"],
            FileFormat::AeProject => &["aep"],
            FileFormat::AeProjectTemplate => &["aet"],
            FileFormat::AeFilterPreset => &["ffx"],
            FileFormat::EncoreProject => &["ncor"],
            FileFormat::PremiereProject => &["prproj"],
            FileFormat::PremiereTitle => &["prtl"],
        }
    }

    /// Map a file extension (with or without the dot) to a format
    pub fn from_extension(extension: &str) -> FileFormat {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        ALL.iter()
            .copied()
            .find(|f| f.extensions().contains(&ext.as_str()))
            .unwrap_or_default()
    }

    /// Map a path to a format by its extension
    pub fn from_path(path: &Path) -> FileFormat {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(FileFormat::from_extension)
            .unwrap_or_default()
    }

    /// Formats whose packets are found by scanning the raw bytes
    pub fn is_scanned(self) -> bool {
        matches!(
            self,
            FileFormat::Pdf
                | FileFormat::PostScript
                | FileFormat::Eps
                | FileFormat::Illustrator
                | FileFormat::Html
                | FileFormat::Xml
                | FileFormat::Text
        )
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.four_cc().trim_end())
    }
}
