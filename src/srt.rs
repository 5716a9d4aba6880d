use crate::subtitle::SubtitleTrack;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// `HH:MM:SS,mmm`, rounded to the nearest millisecond.
pub fn format_timestamp(at: Duration) -> String {
    let total_ms = (at.as_nanos() + 500_000) / 1_000_000;
    let ms = total_ms % 1000;
    let total_sec = total_ms / 1000;
    let s = total_sec % 60;
    let total_min = total_sec / 60;
    let m = total_min % 60;
    let h = total_min / 60;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

pub fn parse_timestamp(ts: &str) -> Option<Duration> {
    let mut parts = ts.trim().split([':', ',']);
    let hh: u64 = parts.next()?.parse().ok()?;
    let mm: u64 = parts.next()?.parse().ok()?;
    let ss: u64 = parts.next()?.parse().ok()?;
    let ms: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || mm >= 60 || ss >= 60 || ms >= 1000 {
        return None;
    }
    Some(Duration::from_millis(((hh * 60 + mm) * 60 + ss) * 1000 + ms))
}

/// Numbered cues, a timing line, the text, and one blank separator line.
/// Line breaks inside the text are folded to spaces, since a blank line
/// ends a cue.
pub fn render_cues(track: &SubtitleTrack) -> String {
    let mut out = String::new();
    for (i, cue) in track.cues.iter().enumerate() {
        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!(
            "{} --> {}\n",
            format_timestamp(cue.start),
            format_timestamp(cue.end)
        ));
        out.push_str(&single_line(&cue.text));
        out.push_str("\n\n");
    }
    out
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub async fn write_cue_file(path: &Path, track: &SubtitleTrack) -> std::io::Result<()> {
    let mut out = fs::File::create(path).await?;
    out.write_all(render_cues(track).as_bytes()).await?;
    out.flush().await?;
    Ok(())
}
