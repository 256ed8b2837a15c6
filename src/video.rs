use std::io::ErrorKind;
use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, bail, Context, Result};
use image::RgbImage;
use log::debug;
use serde::Deserialize;

/// Stream facts shown next to the scrubber.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    /// Frames per second truncated to an integer, used for the elapsed clock.
    pub fps: u32,
    /// Exact rate, used for seeking.
    pub frame_rate: f64,
    pub width: u32,
    pub height: u32,
    pub frame_count: usize,
}

impl VideoInfo {
    pub fn total_duration_secs(&self) -> f64 {
        if self.fps == 0 {
            return 0.0;
        }
        self.frame_count as f64 / f64::from(self.fps)
    }

    pub fn last_frame(&self) -> usize {
        self.frame_count.saturating_sub(1)
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

pub fn read_video_info(path: &Path) -> Result<VideoInfo> {
    let output = run_tool(
        Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=width,height,r_frame_rate,nb_frames,duration",
                "-of",
                "json",
            ])
            .arg(path),
        "ffprobe",
    )?;
    let text = String::from_utf8_lossy(&output);
    parse_ffprobe_json(&text)
        .with_context(|| format!("cannot read video info from {}", path.display()))
}

pub fn parse_ffprobe_json(text: &str) -> Result<VideoInfo> {
    let parsed: FfprobeOutput = serde_json::from_str(text).context("invalid ffprobe output")?;
    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("no video stream"))?;

    let frame_rate = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_rate)
        .unwrap_or(0.0);
    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|value| value.trim().parse::<usize>().ok())
        .or_else(|| {
            let duration = stream.duration.as_deref()?.trim().parse::<f64>().ok()?;
            Some((duration * frame_rate).round() as usize)
        })
        .unwrap_or(0);

    Ok(VideoInfo {
        fps: frame_rate as u32,
        frame_rate,
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        frame_count,
    })
}

/// `"30000/1001"` or `"25"`.
fn parse_rate(value: &str) -> Option<f64> {
    let value = value.trim();
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.parse::<f64>().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

/// Decodes the single frame at `frame_index`.
pub fn extract_frame(path: &Path, frame_index: usize, info: &VideoInfo) -> Result<RgbImage> {
    let seconds = if info.frame_rate > 0.0 {
        frame_index as f64 / info.frame_rate
    } else {
        0.0
    };
    debug!(
        "Extracting frame {frame_index} ({seconds:.3}s) from {}",
        path.display()
    );

    let seek = format!("{seconds:.6}");
    let output = run_tool(
        Command::new("ffmpeg")
            .args(["-v", "error", "-ss", seek.as_str(), "-i"])
            .arg(path)
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "png", "-"]),
        "ffmpeg",
    )?;
    if output.is_empty() {
        bail!("ffmpeg returned no frame {frame_index} for {}", path.display());
    }
    let frame = image::load_from_memory_with_format(&output, image::ImageFormat::Png)
        .with_context(|| format!("cannot decode frame {frame_index}"))?;
    Ok(frame.to_rgb8())
}

fn run_tool(command: &mut Command, name: &str) -> Result<Vec<u8>> {
    let output = match command.output() {
        Ok(output) => output,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            bail!("{name} was not found on PATH; install FFmpeg to use the video tool")
        }
        Err(err) => return Err(err).with_context(|| format!("cannot run {name}")),
    };
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{name} failed ({}): {}", output.status, stderr.trim());
    }
    Ok(output.stdout)
}

/// Elapsed clock for `frame_index`: `"m : s"`, or `"m : s : ms"`.
pub fn format_elapsed(frame_index: usize, fps: u32, show_ms: bool) -> String {
    let elapsed = if fps == 0 {
        0.0
    } else {
        frame_index as f64 / f64::from(fps)
    };
    let minutes = (elapsed / 60.0).floor() as u64;
    let seconds = (elapsed % 60.0).floor() as u64;
    if show_ms {
        let millis = ((elapsed - elapsed.trunc()) * 1000.0) as u64;
        format!("{minutes} : {seconds} : {millis}")
    } else {
        format!("{minutes} : {seconds}")
    }
}
