//! Bridge to the OpenCFU colony counter.
//!
//! OpenCFU is run as `<program> -i <image> [-m <mask>] <args...>` and prints a
//! CSV table on stdout. Only the `IsValid`, `X` and `Y` columns are used; the
//! row order becomes the detection index.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use colony_pick_core::{Detection, Detector, PlacedMask};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{saved::table_file_name, DetectorError};

fn default_program() -> PathBuf {
    PathBuf::from("opencfu")
}

/// How to invoke OpenCFU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenCfuConfig {
    /// Executable, looked up on `PATH` unless absolute.
    #[serde(default = "default_program")]
    pub program: PathBuf,
    /// Directory to run the program in.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Extra arguments appended after the image and mask.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for OpenCfuConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            working_dir: None,
            args: Vec::new(),
        }
    }
}

/// [`Detector`] that spawns OpenCFU once per call.
///
/// A masked call first renders the mask onto its plate (see
/// [`write_placed_mask`](crate::write_placed_mask)) in a scratch directory that
/// lives as long as the detector.
#[derive(Debug)]
pub struct OpenCfuDetector {
    config: OpenCfuConfig,
    archive_dir: Option<PathBuf>,
    #[cfg(feature = "image")]
    scratch: Option<tempfile::TempDir>,
}

impl OpenCfuDetector {
    pub fn new(config: OpenCfuConfig) -> Self {
        Self {
            config,
            archive_dir: None,
            #[cfg(feature = "image")]
            scratch: None,
        }
    }

    /// Also store every raw table in `dir`, named the way
    /// [`SavedDetections`](crate::SavedDetections) expects.
    pub fn with_archive(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = Some(dir.into());
        self
    }

    pub fn config(&self) -> &OpenCfuConfig {
        &self.config
    }

    #[cfg(feature = "image")]
    fn mask_file(&mut self, image: &Path, mask: &PlacedMask) -> Result<PathBuf, DetectorError> {
        let dir = match &mut self.scratch {
            Some(dir) => dir,
            slot => slot.insert(
                tempfile::Builder::new()
                    .prefix("colony-pick-masks")
                    .tempdir()?,
            ),
        };
        crate::mask::write_placed_mask(image, mask, dir.path())
    }

    #[cfg(not(feature = "image"))]
    fn mask_file(&mut self, _image: &Path, _mask: &PlacedMask) -> Result<PathBuf, DetectorError> {
        Err(DetectorError::MaskPlacementUnavailable)
    }

    fn command(&self, image: &Path, mask: Option<&Path>) -> Result<Command, DetectorError> {
        let mut cmd = Command::new(&self.config.program);
        // Relative inputs would otherwise resolve against the working dir.
        let absolute = |p: &Path| std::path::absolute(p);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        cmd.arg("-i").arg(absolute(image)?);
        if let Some(mask) = mask {
            cmd.arg("-m").arg(absolute(mask)?);
        }
        cmd.args(&self.config.args);
        Ok(cmd)
    }
}

impl Detector for OpenCfuDetector {
    type Error = DetectorError;

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "info", skip_all, fields(image = %image.display()))
    )]
    fn detect(
        &mut self,
        image: &Path,
        mask: Option<&PlacedMask>,
    ) -> Result<Vec<Detection>, DetectorError> {
        let mask_file = mask.map(|m| self.mask_file(image, m)).transpose()?;
        let output = self
            .command(image, mask_file.as_deref())?
            .output()
            .map_err(|source| DetectorError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(DetectorError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let text = decode_output(output.stdout)?;
        if let Some(dir) = &self.archive_dir {
            fs::create_dir_all(dir)?;
            fs::write(dir.join(table_file_name(image, mask)), text.as_bytes())?;
        }
        parse_detection_table(&text)
    }
}

/// Detector stdout as text; invalid UTF-8 is reported on the line it occurs.
fn decode_output(bytes: Vec<u8>) -> Result<String, DetectorError> {
    String::from_utf8(bytes).map_err(|err| {
        let valid = &err.as_bytes()[..err.utf8_error().valid_up_to()];
        DetectorError::Parse {
            line: valid.iter().filter(|&&b| b == b'\n').count() + 1,
            message: "detector output is not valid UTF-8".into(),
        }
    })
}

/// Parse an OpenCFU result table.
///
/// Columns are found by header name; fields are trimmed. A row is valid when
/// `IsValid` is exactly `1`. Blank lines are skipped and do not consume a
/// detection index.
pub fn parse_detection_table(text: &str) -> Result<Vec<Detection>, DetectorError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let header = reader.headers()?.clone();
    let column = |name: &'static str| {
        header
            .iter()
            .position(|h| h == name)
            .ok_or(DetectorError::MissingColumn(name))
    };
    let (valid_col, x_col, y_col) = (column("IsValid")?, column("X")?, column("Y")?);

    let mut detections = Vec::new();
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line() as usize);
        let field = |col: usize, name: &str| {
            record.get(col).ok_or_else(|| DetectorError::Parse {
                line,
                message: format!("missing `{name}` field"),
            })
        };
        let coord = |col: usize, name: &str| {
            let raw = field(col, name)?;
            raw.parse::<f64>().map_err(|_| DetectorError::Parse {
                line,
                message: format!("`{name}` is not a number: {raw:?}"),
            })
        };
        detections.push(Detection {
            index: detections.len(),
            pixel: Point2::new(coord(x_col, "X")?, coord(y_col, "Y")?),
            is_valid: field(valid_col, "IsValid")? == "1",
        });
    }
    Ok(detections)
}

/// Render detections back into the table format [`parse_detection_table`] reads.
pub fn format_detection_table(detections: &[Detection]) -> Result<String, DetectorError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["IsValid", "X", "Y"])?;
    for d in detections {
        writer.write_record([
            u8::from(d.is_valid).to_string(),
            d.pixel.x.to_string(),
            d.pixel.y.to_string(),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| DetectorError::Io(err.into_error()))?;
    decode_output(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "IsValid,X,Y,Radius,Hue\n\
                          1,120.5,88.25,4.1,30\n\
                          0,10,12,2.0,40\n\
                          \n\
                          1,300,401.75,5.5,25\n";

    #[test]
    fn parses_rows_in_order_and_validity() {
        let detections = parse_detection_table(SAMPLE).expect("table");
        assert_eq!(detections.len(), 3);
        assert_eq!(detections[0].pixel, Point2::new(120.5, 88.25));
        assert!(detections[0].is_valid);
        assert!(!detections[1].is_valid);
        assert_eq!(detections[2].index, 2);
        assert_eq!(detections[2].pixel, Point2::new(300.0, 401.75));
    }

    #[test]
    fn header_columns_may_be_in_any_order_and_padded() {
        let detections = parse_detection_table("\u{feff}Y, X ,IsValid\n2, 1 ,1\n").expect("table");
        assert_eq!(detections[0].pixel, Point2::new(1.0, 2.0));
        assert!(detections[0].is_valid);
    }

    #[test]
    fn missing_column_and_bad_number_are_errors() {
        assert!(matches!(
            parse_detection_table("IsValid,X\n1,2\n"),
            Err(DetectorError::MissingColumn("Y"))
        ));
        assert!(matches!(
            parse_detection_table(""),
            Err(DetectorError::MissingColumn("IsValid"))
        ));
        match parse_detection_table("IsValid,X,Y\n1,2,3\n1,abc,3\n") {
            Err(DetectorError::Parse { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("abc"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            parse_detection_table("IsValid,X,Y\n1,2\n"),
            Err(DetectorError::Parse { line: 2, .. })
        ));
    }

    #[test]
    fn formatted_table_parses_back() {
        let detections = parse_detection_table(SAMPLE).expect("table");
        let text = format_detection_table(&detections).expect("format");
        assert!(text.starts_with("IsValid,X,Y\n1,120.5,88.25\n"), "{text}");
        assert_eq!(parse_detection_table(&text).expect("again"), detections);
    }

    #[test]
    fn malformed_utf8_output_is_a_parse_error() {
        let mut bytes = b"IsValid,X,Y\n1,2,3\n1,".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b",4\n");
        match decode_output(bytes) {
            Err(DetectorError::Parse { line, message }) => {
                assert_eq!(line, 3);
                assert!(message.contains("UTF-8"), "{message}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(unix)]
    mod process {
        use super::super::*;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
            let path = dir.join(name);
            fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
            let mut perms = fs::metadata(&path).expect("meta").permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&path, perms).expect("chmod");
            path
        }

        /// Fake OpenCFU that logs its arguments and prints a fixed table.
        fn logging_program(dir: &Path, args_log: &Path) -> PathBuf {
            script(
                dir,
                "fake_opencfu",
                &format!(
                    "echo \"$@\" > '{}'\nprintf 'IsValid,X,Y\\n1,5,6\\n0,7,8\\n'",
                    args_log.display()
                ),
            )
        }

        #[test]
        fn runs_program_with_image_and_args() {
            let dir = tempfile::tempdir().expect("tempdir");
            let args_log = dir.path().join("args.txt");
            let archive = dir.path().join("archive");
            let mut detector = OpenCfuDetector::new(OpenCfuConfig {
                program: logging_program(dir.path(), &args_log),
                working_dir: Some(dir.path().to_path_buf()),
                args: vec!["-d".into(), "bil".into()],
            })
            .with_archive(&archive);

            let image = dir.path().join("plates_01.jpg");
            let detections = detector.detect(&image, None).expect("detections");

            assert_eq!(detections.len(), 2);
            assert_eq!(detections[0].pixel, Point2::new(5.0, 6.0));
            let args = fs::read_to_string(&args_log).expect("args");
            assert_eq!(args.trim(), format!("-i {} -d bil", image.display()));
            let archived =
                fs::read_to_string(archive.join("plates_01.csv")).expect("archived table");
            assert!(archived.starts_with("IsValid,X,Y"));
        }

        #[cfg(feature = "image")]
        #[test]
        fn masked_run_passes_the_mask_placed_on_the_plate() {
            use colony_pick_core::CellKey;
            use image::{GrayImage, Luma};

            let dir = tempfile::tempdir().expect("tempdir");
            let args_log = dir.path().join("args.txt");
            let archive = dir.path().join("archive");
            let mut detector = OpenCfuDetector::new(OpenCfuConfig {
                program: logging_program(dir.path(), &args_log),
                ..OpenCfuConfig::default()
            })
            .with_archive(&archive);

            let image = dir.path().join("plates_01.png");
            GrayImage::new(60, 40).save(&image).expect("photo");
            let mask_path = dir.path().join("mask_a1.png");
            GrayImage::from_pixel(10, 10, Luma([255]))
                .save(&mask_path)
                .expect("mask");
            let mask = PlacedMask {
                path: mask_path,
                cell: CellKey::new(0, 0),
                plate: 1,
                anchor_px: Point2::new(30.0, 0.0),
                rotation_deg: 0.0,
            };

            detector.detect(&image, Some(&mask)).expect("detections");

            let args = fs::read_to_string(&args_log).expect("args");
            let placed = args
                .split_whitespace()
                .skip_while(|a| *a != "-m")
                .nth(1)
                .map(PathBuf::from)
                .expect("-m argument");
            assert!(placed.ends_with("plates_01__mask_a1__plate1.png"), "{args}");
            let placed = image::open(&placed).expect("placed mask").to_luma8();
            assert_eq!(placed.dimensions(), (60, 40));
            assert_eq!(*placed.get_pixel(35, 5), Luma([255]));
            assert_eq!(*placed.get_pixel(5, 5), Luma([0]));
            assert!(archive.join("plates_01__mask_a1__plate1.csv").exists());
        }

        #[test]
        fn non_zero_exit_is_a_failure_with_stderr() {
            let dir = tempfile::tempdir().expect("tempdir");
            let program = script(dir.path(), "broken", "echo 'cannot open image' >&2\nexit 3");
            let mut detector = OpenCfuDetector::new(OpenCfuConfig {
                program,
                ..OpenCfuConfig::default()
            });
            match detector.detect(Path::new("/tmp/x.jpg"), None) {
                Err(DetectorError::Failed { stderr, .. }) => {
                    assert_eq!(stderr, "cannot open image")
                }
                other => panic!("unexpected {other:?}"),
            }
        }

        #[test]
        fn missing_program_is_a_spawn_error() {
            let mut detector = OpenCfuDetector::new(OpenCfuConfig {
                program: PathBuf::from("/nonexistent/opencfu"),
                ..OpenCfuConfig::default()
            });
            assert!(matches!(
                detector.detect(Path::new("/tmp/x.jpg"), None),
                Err(DetectorError::Spawn { .. })
            ));
        }
    }
}
