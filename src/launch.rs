use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    ImageGrid,
    Annotations,
    Video,
}

impl Tool {
    pub const ALL: [Tool; 3] = [Tool::ImageGrid, Tool::Annotations, Tool::Video];

    pub fn title(self) -> &'static str {
        match self {
            Tool::ImageGrid => "Image Displayer",
            Tool::Annotations => "Annotation Displayer",
            Tool::Video => "Video Frames",
        }
    }

    fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "grid" | "images" | "image" => Ok(Tool::ImageGrid),
            "annotations" | "labels" | "annotation" => Ok(Tool::Annotations),
            "video" | "videos" => Ok(Tool::Video),
            other => Err(format!(
                "Unknown tool '{other}'. Expected grid, annotations or video."
            )),
        }
    }
}

/// Initial state requested on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LaunchRequest {
    pub tool: Tool,
    pub images_dir: Option<PathBuf>,
    pub labels_dir: Option<PathBuf>,
    pub names_yaml: Option<PathBuf>,
    pub videos_dir: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub recursive: bool,
}

pub fn parse_launch_request_from_args(args: &[String]) -> Result<Option<LaunchRequest>, String> {
    if args.is_empty() {
        return Ok(None);
    }

    if args.len() == 1 && !args[0].starts_with("--") {
        return Ok(Some(LaunchRequest {
            images_dir: Some(PathBuf::from(&args[0])),
            ..LaunchRequest::default()
        }));
    }

    let mut request = LaunchRequest::default();
    let mut explicit_tool = None::<Tool>;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let (flag, inline_value) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => (flag, Some(value.to_string())),
            _ => (arg.as_str(), None),
        };

        if flag == "--recursive" {
            if inline_value.is_some() {
                return Err("--recursive does not take a value.".to_string());
            }
            request.recursive = true;
            continue;
        }

        if !flag.starts_with("--") {
            return Err(format!("Unexpected argument '{flag}'."));
        }

        let value = match inline_value {
            Some(value) => value,
            None => iter
                .next()
                .filter(|value| !value.starts_with("--"))
                .cloned()
                .ok_or_else(|| format!("Missing value after {flag}."))?,
        };
        if value.trim().is_empty() {
            return Err(format!("Empty value for {flag}."));
        }

        match flag {
            "--images" => request.images_dir = Some(PathBuf::from(value)),
            "--labels" => request.labels_dir = Some(PathBuf::from(value)),
            "--names" | "--yaml" => request.names_yaml = Some(PathBuf::from(value)),
            "--videos" => request.videos_dir = Some(PathBuf::from(value)),
            "--config" => request.config_path = Some(PathBuf::from(value)),
            "--tool" => explicit_tool = Some(Tool::parse(&value)?),
            other => return Err(format!("Unknown option '{other}'.")),
        }
    }

    request.tool = explicit_tool.unwrap_or_else(|| {
        if request.labels_dir.is_some() || request.names_yaml.is_some() {
            Tool::Annotations
        } else if request.videos_dir.is_some() && request.images_dir.is_none() {
            Tool::Video
        } else {
            Tool::ImageGrid
        }
    });
    Ok(Some(request))
}

/// Parses a target size such as `640x480`, `640 x 480`, `640,480` or
/// `(640, 480)`. Both sides must be positive integers.
pub fn parse_dimensions(input: &str) -> Result<(u32, u32), String> {
    let trimmed = input.trim();
    let inner = trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(trimmed);

    let (width, height) = inner
        .split_once(['x', 'X', ','])
        .ok_or_else(|| format!("Expected dimensions as WIDTHxHEIGHT, got '{trimmed}'."))?;

    let parse_side = |side: &str, name: &str| -> Result<u32, String> {
        let side = side.trim();
        let value = side
            .parse::<u32>()
            .map_err(|_| format!("{name} must be a positive integer, got '{side}'."))?;
        if value == 0 {
            return Err(format!("{name} must be greater than zero."));
        }
        Ok(value)
    };

    Ok((parse_side(width, "Width")?, parse_side(height, "Height")?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn no_args_means_no_request() {
        assert_eq!(parse_launch_request_from_args(&[]).expect("should parse"), None);
    }

    #[test]
    fn bare_directory_opens_image_grid() {
        let parsed = parse_launch_request_from_args(&args(&["datasets/coco/images"]))
            .expect("should parse")
            .expect("request");
        assert_eq!(parsed.tool, Tool::ImageGrid);
        assert_eq!(
            parsed.images_dir,
            Some(PathBuf::from("datasets/coco/images"))
        );
    }

    #[test]
    fn labels_imply_annotation_tool() {
        let parsed = parse_launch_request_from_args(&args(&[
            "--images",
            "data/images",
            "--labels=data/labels",
            "--names",
            "data/dataset.yaml",
        ]))
        .expect("should parse")
        .expect("request");
        assert_eq!(parsed.tool, Tool::Annotations);
        assert_eq!(parsed.labels_dir, Some(PathBuf::from("data/labels")));
        assert_eq!(parsed.names_yaml, Some(PathBuf::from("data/dataset.yaml")));
    }

    #[test]
    fn explicit_tool_and_recursive() {
        let parsed = parse_launch_request_from_args(&args(&[
            "--tool",
            "video",
            "--videos",
            "clips",
            "--recursive",
            "--config",
            "config.yaml",
        ]))
        .expect("should parse")
        .expect("request");
        assert_eq!(parsed.tool, Tool::Video);
        assert!(parsed.recursive);
        assert_eq!(parsed.videos_dir, Some(PathBuf::from("clips")));
        assert_eq!(parsed.config_path, Some(PathBuf::from("config.yaml")));
    }

    #[test]
    fn bad_args_are_rejected() {
        assert!(parse_launch_request_from_args(&args(&["--images"])).is_err());
        assert!(parse_launch_request_from_args(&args(&["--images", "--recursive"])).is_err());
        assert!(parse_launch_request_from_args(&args(&["--bogus", "x"])).is_err());
        assert!(parse_launch_request_from_args(&args(&["--tool", "audio"])).is_err());
        assert!(parse_launch_request_from_args(&args(&["a", "b"])).is_err());
        assert!(parse_launch_request_from_args(&args(&["--recursive=yes"])).is_err());
    }

    #[test]
    fn dimensions_accept_common_forms() {
        assert_eq!(parse_dimensions("640x480"), Ok((640, 480)));
        assert_eq!(parse_dimensions(" 640 X 480 "), Ok((640, 480)));
        assert_eq!(parse_dimensions("640,480"), Ok((640, 480)));
        assert_eq!(parse_dimensions("(640, 480)"), Ok((640, 480)));
    }

    #[test]
    fn dimensions_reject_expressions_and_zero() {
        assert!(parse_dimensions("__import__('os')").is_err());
        assert!(parse_dimensions("(640*2, 480)").is_err());
        assert!(parse_dimensions("0x480").is_err());
        assert!(parse_dimensions("-640x480").is_err());
        assert!(parse_dimensions("640").is_err());
        assert!(parse_dimensions("").is_err());
        assert!(parse_dimensions("1.5x2").is_err());
    }
}
