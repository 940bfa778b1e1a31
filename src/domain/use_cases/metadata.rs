use std::io::BufReader;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDateTime, Utc};
use image::{ImageFormat, ImageReader};
use serde_json::Value;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::warn;

use crate::entities::media::{MediaKind, TechnicalMetadata};

/// Best-effort technical metadata extraction for stored media files.
///
/// `extract` never fails: every internal error is logged and degraded to
/// an empty (or partial) [`TechnicalMetadata`] so the upload itself still
/// succeeds. Images are probed in-process, videos through an `ffprobe`
/// subprocess bounded by a timeout.
pub struct MetadataExtractor {
    ffprobe_path: String,
    probe_timeout: Duration,
}

impl MetadataExtractor {
    pub fn new(ffprobe_path: impl Into<String>, probe_timeout: Duration) -> Self {
        MetadataExtractor {
            ffprobe_path: ffprobe_path.into(),
            probe_timeout,
        }
    }

    pub async fn extract(&self, path: &Path, declared_mime: &str) -> TechnicalMetadata {
        let kind = MediaKind::from_mime(declared_mime);
        let result = match kind {
            MediaKind::Image => {
                let path = path.to_path_buf();
                match tokio::task::spawn_blocking(move || probe_image(&path)).await {
                    Ok(res) => res,
                    Err(e) => Err(anyhow::anyhow!("image probe task failed: {e}")),
                }
            }
            MediaKind::Video => self.probe_video(path).await,
        };

        match result {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("{kind} metadata extraction failed for {}: {e:#}", path.display());
                TechnicalMetadata::default()
            }
        }
    }

    async fn probe_video(&self, path: &Path) -> anyhow::Result<TechnicalMetadata> {
        let probe_cmd = Command::new(&self.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(path)
            .output();

        // A hung ffprobe must not pin the request forever
        let output = timeout(self.probe_timeout, probe_cmd)
            .await
            .context("ffprobe timed out")?
            .context("Failed to execute ffprobe")?;

        if !output.status.success() {
            bail!(
                "ffprobe exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            );
        }

        let probe: Value =
            serde_json::from_slice(&output.stdout).context("Failed to parse ffprobe output")?;

        video_metadata_from_probe(&probe, path)
    }
}

// ───── Image Prober ──────────────────────────────────────────────────

/// Reads the container header only: dimensions and format, no full decode.
fn probe_image(path: &Path) -> anyhow::Result<TechnicalMetadata> {
    let reader = ImageReader::open(path)
        .context("Failed to open image")?
        .with_guessed_format()
        .context("Failed to guess image format")?;

    let format = reader.format();
    let (width, height) = reader
        .into_dimensions()
        .context("Failed to read image dimensions")?;

    let creation_time = exif_creation_time(path).or_else(|| mtime_rfc3339(path).ok());

    Ok(TechnicalMetadata {
        resolution: Some(format!("{width}x{height}")),
        kind: format.map(format_label),
        creation_time,
        ..Default::default()
    })
}

fn format_label(format: ImageFormat) -> String {
    format
        .to_mime_type()
        .trim_start_matches("image/")
        .to_ascii_uppercase()
}

/// First DateTime or DateTimeOriginal field wins. Field order is whatever
/// the container stored it in; this is a first-found policy, not a
/// priority search.
fn exif_creation_time(path: &Path) -> Option<String> {
    let file = std::fs::File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let exif_data = exif::Reader::new().read_from_container(&mut reader).ok()?;

    let field = exif_data
        .fields()
        .find(|f| f.tag == exif::Tag::DateTime || f.tag == exif::Tag::DateTimeOriginal)?;

    // display_value() renders dates with dashes; the raw Ascii bytes keep
    // the colon-separated EXIF format the parser expects
    let raw = match &field.value {
        exif::Value::Ascii(lines) => lines
            .first()
            .map(|line| String::from_utf8_lossy(line).into_owned()),
        _ => None,
    }?;

    parse_exif_datetime(&raw)
}

/// EXIF timestamps carry no timezone; treated as UTC.
fn parse_exif_datetime(raw: &str) -> Option<String> {
    NaiveDateTime::parse_from_str(raw.trim(), "%Y:%m:%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc().to_rfc3339())
}

fn mtime_rfc3339(path: &Path) -> anyhow::Result<String> {
    let modified = std::fs::metadata(path)
        .context("Failed to stat file")?
        .modified()
        .context("Failed to read mtime")?;
    Ok(DateTime::<Utc>::from(modified).to_rfc3339())
}

// ───── Video Prober ──────────────────────────────────────────────────

fn video_metadata_from_probe(probe: &Value, path: &Path) -> anyhow::Result<TechnicalMetadata> {
    let streams = probe
        .get("streams")
        .and_then(Value::as_array)
        .context("probe output has no streams")?;

    let Some(video_stream) = streams
        .iter()
        .find(|s| s.get("codec_type").and_then(Value::as_str) == Some("video"))
    else {
        warn!("no video stream found in {}", path.display());
        return Ok(TechnicalMetadata::default());
    };

    let width = video_stream.get("width").and_then(Value::as_u64).unwrap_or(0);
    let height = video_stream.get("height").and_then(Value::as_u64).unwrap_or(0);

    let format = probe.get("format").context("probe output has no format")?;
    let duration_secs = format
        .get("duration")
        .and_then(Value::as_str)
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let creation_time = probe_creation_time(probe).or_else(|| mtime_rfc3339(path).ok());

    Ok(TechnicalMetadata {
        resolution: Some(format!("{width}x{height}")),
        aspect_ratio: reduce_aspect_ratio(width, height),
        duration: Some(format_duration(duration_secs)),
        quality: Some(quality_label(height)),
        creation_time,
        kind: None,
    })
}

/// Canonical quality buckets by vertical resolution; anything off the
/// table gets a literal "{height}p".
fn quality_label(height: u64) -> String {
    match height {
        2160 => "4K".to_string(),
        1440 => "1440p".to_string(),
        1080 => "1080p".to_string(),
        720 => "720p".to_string(),
        480 => "480p".to_string(),
        360 => "360p".to_string(),
        240 => "240p".to_string(),
        h => format!("{h}p"),
    }
}

fn reduce_aspect_ratio(width: u64, height: u64) -> Option<String> {
    if width == 0 || height == 0 {
        return None;
    }
    let divisor = gcd(width, height);
    Some(format!("{}:{}", width / divisor, height / divisor))
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Fractional seconds are truncated, not rounded.
fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Three-tier fallback: format-level tag, then the first stream carrying
/// the tag in stream order. The filesystem mtime tier lives in the caller.
fn probe_creation_time(probe: &Value) -> Option<String> {
    if let Some(tagged) = probe
        .pointer("/format/tags/creation_time")
        .and_then(Value::as_str)
    {
        return Some(tagged.to_string());
    }

    probe
        .get("streams")?
        .as_array()?
        .iter()
        .find_map(|s| s.pointer("/tags/creation_time").and_then(Value::as_str))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn quality_table_exact_matches() {
        assert_eq!(quality_label(2160), "4K");
        assert_eq!(quality_label(1440), "1440p");
        assert_eq!(quality_label(1080), "1080p");
        assert_eq!(quality_label(720), "720p");
        assert_eq!(quality_label(480), "480p");
        assert_eq!(quality_label(360), "360p");
        assert_eq!(quality_label(240), "240p");
    }

    #[test]
    fn quality_off_table_falls_back_to_height() {
        assert_eq!(quality_label(900), "900p");
        assert_eq!(quality_label(0), "0p");
    }

    #[test]
    fn aspect_ratio_reduces_by_gcd() {
        assert_eq!(reduce_aspect_ratio(1920, 1080).as_deref(), Some("16:9"));
        assert_eq!(reduce_aspect_ratio(640, 480).as_deref(), Some("4:3"));
        assert_eq!(reduce_aspect_ratio(1080, 1920).as_deref(), Some("9:16"));
    }

    #[test]
    fn aspect_ratio_guards_zero_dimensions() {
        assert_eq!(reduce_aspect_ratio(0, 1080), None);
        assert_eq!(reduce_aspect_ratio(1920, 0), None);
        assert_eq!(reduce_aspect_ratio(0, 0), None);
    }

    #[test]
    fn duration_truncates_fractional_seconds() {
        assert_eq!(format_duration(3725.9), "01:02:05");
        assert_eq!(format_duration(0.0), "00:00:00");
        assert_eq!(format_duration(59.999), "00:00:59");
        assert_eq!(format_duration(3600.0), "01:00:00");
    }

    #[test]
    fn exif_datetime_parses_as_utc() {
        assert_eq!(
            parse_exif_datetime("2021:05:04 10:20:30").as_deref(),
            Some("2021-05-04T10:20:30+00:00")
        );
        assert_eq!(parse_exif_datetime("not a date"), None);
        assert_eq!(parse_exif_datetime("2021-05-04 10:20:30"), None);
    }

    #[test]
    fn creation_time_prefers_format_tag() {
        let probe = json!({
            "format": {"tags": {"creation_time": "2020-01-01T00:00:00Z"}},
            "streams": [{"tags": {"creation_time": "1999-01-01T00:00:00Z"}}]
        });
        assert_eq!(
            probe_creation_time(&probe).as_deref(),
            Some("2020-01-01T00:00:00Z")
        );
    }

    #[test]
    fn creation_time_falls_back_to_first_tagged_stream() {
        let probe = json!({
            "format": {},
            "streams": [
                {"codec_type": "audio"},
                {"codec_type": "video", "tags": {"creation_time": "2020-06-01T12:00:00Z"}}
            ]
        });
        assert_eq!(
            probe_creation_time(&probe).as_deref(),
            Some("2020-06-01T12:00:00Z")
        );
    }

    #[test]
    fn creation_time_absent_when_untagged() {
        let probe = json!({"format": {}, "streams": [{"codec_type": "video"}]});
        assert_eq!(probe_creation_time(&probe), None);
    }

    #[test]
    fn video_probe_derives_all_fields() {
        let probe = json!({
            "streams": [
                {"codec_type": "audio"},
                {"codec_type": "video", "width": 1920, "height": 1080}
            ],
            "format": {
                "duration": "3725.9",
                "tags": {"creation_time": "2022-03-01T09:30:00Z"}
            }
        });
        let file = tempfile::NamedTempFile::new().unwrap();
        let meta = video_metadata_from_probe(&probe, file.path()).unwrap();

        assert_eq!(meta.resolution.as_deref(), Some("1920x1080"));
        assert_eq!(meta.aspect_ratio.as_deref(), Some("16:9"));
        assert_eq!(meta.quality.as_deref(), Some("1080p"));
        assert_eq!(meta.duration.as_deref(), Some("01:02:05"));
        assert_eq!(meta.creation_time.as_deref(), Some("2022-03-01T09:30:00Z"));
        assert_eq!(meta.kind, None);
    }

    #[test]
    fn video_probe_without_video_stream_is_empty() {
        let probe = json!({
            "streams": [{"codec_type": "audio"}],
            "format": {"duration": "10.0"}
        });
        let file = tempfile::NamedTempFile::new().unwrap();
        let meta = video_metadata_from_probe(&probe, file.path()).unwrap();
        assert!(meta.is_empty());
    }

    #[test]
    fn video_probe_untagged_uses_mtime() {
        let probe = json!({
            "streams": [{"codec_type": "video", "width": 640, "height": 360}],
            "format": {}
        });
        let file = tempfile::NamedTempFile::new().unwrap();
        let meta = video_metadata_from_probe(&probe, file.path()).unwrap();

        let mtime = meta.creation_time.expect("mtime fallback should be set");
        assert!(DateTime::parse_from_rfc3339(&mtime).is_ok());
        assert_eq!(meta.duration.as_deref(), Some("00:00:00"));
    }

    #[test]
    fn zero_dimension_stream_has_no_aspect_ratio() {
        let probe = json!({
            "streams": [{"codec_type": "video", "height": 480}],
            "format": {"duration": "1.0"}
        });
        let file = tempfile::NamedTempFile::new().unwrap();
        let meta = video_metadata_from_probe(&probe, file.path()).unwrap();

        assert_eq!(meta.resolution.as_deref(), Some("0x480"));
        assert_eq!(meta.aspect_ratio, None);
        assert_eq!(meta.quality.as_deref(), Some("480p"));
    }

    #[test]
    fn image_probe_reads_dimensions_and_format() {
        let mut png = Vec::new();
        image::RgbImage::new(3, 2)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        std::fs::write(&path, png).unwrap();

        let meta = probe_image(&path).unwrap();
        assert_eq!(meta.resolution.as_deref(), Some("3x2"));
        assert_eq!(meta.kind.as_deref(), Some("PNG"));
        // No EXIF in a bare PNG, so mtime fallback applies
        let created = meta.creation_time.expect("creation_time should fall back to mtime");
        assert!(DateTime::parse_from_rfc3339(&created).is_ok());
        assert_eq!(meta.quality, None);
        assert_eq!(meta.duration, None);
    }

    /// Builds a JPEG carrying a single EXIF tag in an APP1 segment.
    fn jpeg_with_exif_datetime(tag: exif::Tag, raw: &str) -> Vec<u8> {
        let mut jpeg = Vec::new();
        image::RgbImage::new(2, 2)
            .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
            .unwrap();

        let field = exif::Field {
            tag,
            ifd_num: exif::In::PRIMARY,
            value: exif::Value::Ascii(vec![raw.as_bytes().to_vec()]),
        };
        let mut writer = exif::experimental::Writer::new();
        writer.push_field(&field);
        let mut tiff = Cursor::new(Vec::new());
        writer.write(&mut tiff, false).unwrap();
        let tiff = tiff.into_inner();

        let mut app1 = vec![0xFF, 0xE1];
        app1.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
        app1.extend_from_slice(b"Exif\0\0");
        app1.extend_from_slice(&tiff);

        // Splice the segment right after the SOI marker
        let mut tagged = Vec::with_capacity(jpeg.len() + app1.len());
        tagged.extend_from_slice(&jpeg[..2]);
        tagged.extend_from_slice(&app1);
        tagged.extend_from_slice(&jpeg[2..]);
        tagged
    }

    #[test]
    fn image_probe_uses_embedded_exif_datetime_over_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tagged.jpg");
        std::fs::write(
            &path,
            jpeg_with_exif_datetime(exif::Tag::DateTimeOriginal, "2021:05:04 10:20:30"),
        )
        .unwrap();

        let meta = probe_image(&path).unwrap();
        // The embedded timestamp wins; the file's mtime is "now" and would differ
        assert_eq!(
            meta.creation_time.as_deref(),
            Some("2021-05-04T10:20:30+00:00")
        );
        assert_eq!(meta.kind.as_deref(), Some("JPEG"));
    }

    #[test]
    fn exif_datetime_tag_is_read_from_raw_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("datetime.jpg");
        std::fs::write(
            &path,
            jpeg_with_exif_datetime(exif::Tag::DateTime, "2019:12:31 23:59:59"),
        )
        .unwrap();

        assert_eq!(
            exif_creation_time(&path).as_deref(),
            Some("2019-12-31T23:59:59+00:00")
        );
    }

    #[test]
    fn image_probe_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.jpg");
        std::fs::write(&path, b"definitely not an image").unwrap();
        assert!(probe_image(&path).is_err());
    }

    #[tokio::test]
    async fn extract_degrades_to_empty_on_image_failure() {
        let extractor = MetadataExtractor::new("ffprobe", Duration::from_secs(5));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.jpg");
        std::fs::write(&path, b"garbage bytes").unwrap();

        let meta = extractor.extract(&path, "image/jpeg").await;
        assert!(meta.is_empty());
    }

    #[tokio::test]
    async fn extract_degrades_to_empty_when_ffprobe_is_missing() {
        let extractor =
            MetadataExtractor::new("/nonexistent/ffprobe", Duration::from_secs(5));
        let file = tempfile::NamedTempFile::new().unwrap();

        let meta = extractor.extract(file.path(), "video/mp4").await;
        assert!(meta.is_empty());
    }
}
