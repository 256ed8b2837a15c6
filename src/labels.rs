use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::{debug, warn};
use serde_yaml::Value;

/// One YOLO box, geometry normalized to the image size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelBox {
    pub class_id: i64,
    pub x_center: f64,
    pub y_center: f64,
    pub width: f64,
    pub height: f64,
}

/// Absolute corner coordinates in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl LabelBox {
    /// `None` unless the line has exactly five finite numeric fields.
    pub fn parse(line: &str) -> Option<Self> {
        let fields = line.split_whitespace().collect::<Vec<_>>();
        let [class_id, x_center, y_center, width, height] = fields.as_slice() else {
            return None;
        };
        Some(Self {
            class_id: parse_finite(class_id)? as i64,
            x_center: parse_finite(x_center)?,
            y_center: parse_finite(y_center)?,
            width: parse_finite(width)?,
            height: parse_finite(height)?,
        })
    }

    pub fn to_pixels(&self, image_width: u32, image_height: u32) -> PixelBox {
        let w = f64::from(image_width);
        let h = f64::from(image_height);
        PixelBox {
            x1: ((self.x_center - self.width / 2.0) * w) as i32,
            y1: ((self.y_center - self.height / 2.0) * h) as i32,
            x2: ((self.x_center + self.width / 2.0) * w) as i32,
            y2: ((self.y_center + self.height / 2.0) * h) as i32,
        }
    }
}

fn parse_finite(field: &str) -> Option<f64> {
    field.parse::<f64>().ok().filter(|value| value.is_finite())
}

pub fn parse_labels(text: &str) -> Vec<LabelBox> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(index, line)| {
            let parsed = LabelBox::parse(line);
            if parsed.is_none() {
                debug!("Skipping malformed label line {}: {line:?}", index + 1);
            }
            parsed
        })
        .collect()
}

/// `Ok(None)` when the sidecar does not exist.
pub fn read_label_file(path: &Path) -> Result<Option<Vec<LabelBox>>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(parse_labels(&text))),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("cannot read labels {}", path.display())),
    }
}

pub fn sidecar_path(image_path: &Path, labels_dir: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_default();
    let mut file_name = stem;
    file_name.push(".txt");
    labels_dir.join(file_name)
}

/// `<images>/../labels`, the usual YOLO dataset layout.
pub fn default_labels_dir(images_dir: &Path) -> PathBuf {
    images_dir.join("..").join("labels")
}

/// Class names from a dataset YAML `names` list; index is the class id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassNames {
    names: Vec<String>,
}

impl ClassNames {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            bail!("YAML file not found: {}", path.display());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Error loading YAML: {}", path.display()))?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let document: Value = serde_yaml::from_str(text).context("Error loading YAML")?;
        let Some(Value::Sequence(entries)) = document.get("names") else {
            bail!("Invalid \"names\" format in YAML; expected a list.");
        };

        let names = entries
            .iter()
            .map(|entry| match entry {
                Value::String(name) => name.clone(),
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                other => serde_yaml::to_string(other)
                    .map(|text| text.trim().to_string())
                    .unwrap_or_default(),
            })
            .collect::<Vec<_>>();
        if names.is_empty() {
            warn!("Dataset YAML has an empty \"names\" list");
        }
        Ok(Self { names })
    }

    pub fn get(&self, class_id: i64) -> Option<&str> {
        let index = usize::try_from(class_id).ok()?;
        self.names.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Class name when known, otherwise the numeric id.
pub fn display_label(names: Option<&ClassNames>, class_id: i64) -> String {
    names
        .and_then(|names| names.get(class_id))
        .map(str::to_string)
        .unwrap_or_else(|| class_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    impl PixelBox {
        fn to_normalized(&self, class_id: i64, image_width: u32, image_height: u32) -> LabelBox {
            let w = f64::from(image_width);
            let h = f64::from(image_height);
            LabelBox {
                class_id,
                x_center: (f64::from(self.x1) + f64::from(self.x2)) / 2.0 / w,
                y_center: (f64::from(self.y1) + f64::from(self.y2)) / 2.0 / h,
                width: (f64::from(self.x2) - f64::from(self.x1)) / w,
                height: (f64::from(self.y2) - f64::from(self.y1)) / h,
            }
        }
    }

    #[test]
    fn centered_box_on_square_image() {
        let label = LabelBox::parse("0 0.5 0.5 0.2 0.2").expect("line should parse");
        assert_eq!(
            label.to_pixels(1000, 1000),
            PixelBox {
                x1: 400,
                y1: 400,
                x2: 600,
                y2: 600
            }
        );
    }

    #[test]
    fn pixel_corners_truncate() {
        let label = LabelBox::parse("2 0.5 0.5 0.333 0.5").expect("line should parse");
        let pixels = label.to_pixels(101, 7);
        // 0.3335 * 101 = 33.68, 0.6665 * 101 = 67.31
        assert_eq!((pixels.x1, pixels.x2), (33, 67));
        // 0.25 * 7 = 1.75, 0.75 * 7 = 5.25
        assert_eq!((pixels.y1, pixels.y2), (1, 5));
    }

    #[test]
    fn geometry_round_trips_within_a_pixel() {
        let cases = [
            (0.5, 0.5, 0.2, 0.2, 1000, 1000),
            (0.123, 0.877, 0.05, 0.1, 640, 480),
            (0.31, 0.42, 0.6, 0.33, 1921, 1079),
            (0.9, 0.1, 0.15, 0.15, 37, 53),
        ];
        for (x_center, y_center, width, height, w, h) in cases {
            let label = LabelBox {
                class_id: 1,
                x_center,
                y_center,
                width,
                height,
            };
            let back = label.to_pixels(w, h).to_normalized(1, w, h);
            let x_tol = 1.0 / f64::from(w) + 1e-9;
            let y_tol = 1.0 / f64::from(h) + 1e-9;
            assert!((back.x_center - x_center).abs() <= x_tol, "{label:?} -> {back:?}");
            assert!((back.y_center - y_center).abs() <= y_tol, "{label:?} -> {back:?}");
            assert!((back.width - width).abs() <= x_tol, "{label:?} -> {back:?}");
            assert!((back.height - height).abs() <= y_tol, "{label:?} -> {back:?}");
        }
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let text = "1 0.2\n0 0.5 0.5 0.2 0.2\n\nabc 0.1 0.1 0.1 0.1\n3 0.1 0.2 0.3 0.4 0.5\n2.0 0.25 0.25 0.1 0.1\n";
        let labels = parse_labels(text);
        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].class_id, 0);
        assert_eq!(labels[1].class_id, 2);
    }

    #[test]
    fn non_finite_fields_are_malformed() {
        for line in [
            "nan 0.5 0.5 0.2 0.2",
            "inf 0.5 0.5 0.2 0.2",
            "0 NaN 0.5 0.2 0.2",
            "0 0.5 -inf 0.2 0.2",
            "0 0.5 0.5 infinity 0.2",
            "0 0.5 0.5 0.2 1e400",
        ] {
            assert_eq!(LabelBox::parse(line), None, "{line}");
        }
        let labels = parse_labels("0 nan 0.5 0.2 0.2\n1 0.5 0.5 0.2 0.2\n");
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].class_id, 1);
    }

    #[test]
    fn missing_label_file_is_none() {
        let path = std::env::temp_dir().join(format!(
            "sharingan-missing-labels-{}.txt",
            std::process::id()
        ));
        assert!(read_label_file(&path)
            .expect("missing file is not an error")
            .is_none());
    }

    #[test]
    fn sidecar_shares_image_stem() {
        let labels = Path::new("/data/labels");
        assert_eq!(
            sidecar_path(Path::new("/data/images/frame_001.jpg"), labels),
            PathBuf::from("/data/labels/frame_001.txt")
        );
        assert_eq!(
            default_labels_dir(Path::new("/data/images")),
            PathBuf::from("/data/images/../labels")
        );
    }

    #[test]
    fn names_yaml_list_is_loaded() {
        let names = ClassNames::from_yaml("path: ../data\nnames:\n  - person\n  - car\n  - 7\n")
            .expect("names should load");
        assert_eq!(names.len(), 3);
        assert_eq!(names.get(1), Some("car"));
        assert_eq!(names.get(2), Some("7"));
        assert_eq!(names.get(3), None);
        assert_eq!(names.get(-1), None);
    }

    #[test]
    fn names_must_be_a_list() {
        let err = ClassNames::from_yaml("names:\n  0: person\n").expect_err("mapping rejected");
        assert!(err.to_string().contains("expected a list"));
        assert!(ClassNames::from_yaml("nc: 3\n").is_err());
    }

    #[test]
    fn display_label_falls_back_to_id() {
        let names = ClassNames::new(vec!["person".to_string()]);
        assert_eq!(display_label(Some(&names), 0), "person");
        assert_eq!(display_label(Some(&names), 4), "4");
        assert_eq!(display_label(None, 0), "0");
        assert_eq!(display_label(Some(&names), -2), "-2");
    }
}
