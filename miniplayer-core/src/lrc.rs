use std::collections::BTreeMap;
use std::time::Duration;

/// LRC metadata from ID tags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LrcMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub author: Option<String>,
    pub offset: i64, // milliseconds, positive shows lyrics earlier
}

/// One language channel of timed text, keyed by timestamp.
///
/// Duplicate timestamps keep the text of the last occurrence.
#[derive(Debug, Clone, Default)]
pub struct TimedText {
    pub metadata: LrcMetadata,
    entries: BTreeMap<Duration, String>,
}

impl TimedText {
    /// Parse a raw timed-text blob.
    ///
    /// Parsing is tolerant: lines that do not start with a `[mm:ss.xx]`
    /// timestamp, or whose text is empty, are dropped without failing the feed.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let mut metadata = LrcMetadata::default();
        let mut entries = BTreeMap::new();

        for line in input.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some((tag, value)) = parse_id_tag(line) {
                match tag.to_lowercase().as_str() {
                    "ti" => metadata.title = Some(value),
                    "ar" => metadata.artist = Some(value),
                    "al" => metadata.album = Some(value),
                    "au" | "by" => metadata.author = Some(value),
                    "offset" => {
                        if let Ok(offset) = value.parse::<i64>() {
                            metadata.offset = offset;
                        }
                    }
                    _ => {}
                }
                continue;
            }

            if let Some((timestamps, text)) = parse_lyric_line(line) {
                for timestamp in timestamps {
                    entries.insert(timestamp, text.to_string());
                }
            }
        }

        if metadata.offset != 0 {
            entries = entries
                .into_iter()
                .map(|(time, text)| (apply_offset(time, metadata.offset), text))
                .collect();
        }

        Self { metadata, entries }
    }

    /// Text at exactly `time`, if this feed has a line there.
    #[must_use]
    pub fn text_at(&self, time: Duration) -> Option<&str> {
        self.entries.get(&time).map(String::as_str)
    }

    /// Timestamps in ascending order.
    pub fn timestamps(&self) -> impl Iterator<Item = Duration> + '_ {
        self.entries.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A merged lyric line: primary text plus its translation at one timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LyricLine {
    pub time: Duration,
    /// Empty when only the translation feed has a line here
    pub text: String,
    /// Empty when the translation feed has no line here
    pub translation: String,
}

impl LyricLine {
    /// An empty primary text marks an instrumental passage.
    #[must_use]
    pub fn is_instrumental(&self) -> bool {
        self.text.is_empty()
    }

    #[must_use]
    pub fn has_translation(&self) -> bool {
        !self.translation.is_empty()
    }
}

/// Lyric timeline with strictly increasing, unique timestamps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricTrack {
    lines: Vec<LyricLine>,
}

impl LyricTrack {
    /// Merge a primary and an optional translation feed.
    ///
    /// The result holds one line per timestamp in the union of both feeds;
    /// each side contributes its text at that exact timestamp or nothing.
    #[must_use]
    pub fn merge(primary: Option<&str>, translation: Option<&str>) -> Self {
        let primary = primary.map(TimedText::parse).unwrap_or_default();
        let translation = translation.map(TimedText::parse).unwrap_or_default();

        let mut times: Vec<Duration> = primary.timestamps().chain(translation.timestamps()).collect();
        times.sort_unstable();
        times.dedup();

        let lines = times
            .into_iter()
            .map(|time| LyricLine {
                time,
                text: primary.text_at(time).unwrap_or_default().to_string(),
                translation: translation.text_at(time).unwrap_or_default().to_string(),
            })
            .collect();

        Self { lines }
    }

    #[must_use]
    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, index: usize) -> Option<&LyricLine> {
        self.lines.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Index of the last line starting at or before `position`.
    ///
    /// `None` before the first line; past the last timestamp the last line
    /// stays selected.
    #[must_use]
    pub fn line_index_at(&self, position: Duration) -> Option<usize> {
        self.lines
            .partition_point(|line| line.time <= position)
            .checked_sub(1)
    }
}

/// Parse an ID tag like [ti:Title] or [offset:500]
fn parse_id_tag(line: &str) -> Option<(String, String)> {
    if !line.starts_with('[') {
        return None;
    }

    let end = line.find(']')?;
    let content = &line[1..end];

    let first_colon = content.find(':')?;
    let tag = &content[..first_colon];

    // A numeric tag is a timestamp, not an ID tag
    if tag.is_empty() || tag.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let value = content[first_colon + 1..].trim().to_string();
    Some((tag.to_string(), value))
}

/// Parse a lyric line like [00:12.34]Hello or [00:12.34][00:45.10]Chorus.
///
/// Returns the leading timestamps and the trimmed text, or `None` when the
/// line has no timestamp prefix or no text.
fn parse_lyric_line(line: &str) -> Option<(Vec<Duration>, &str)> {
    let mut remaining = line;
    let mut timestamps = Vec::new();

    while remaining.starts_with('[') {
        let Some(end) = remaining.find(']') else {
            break;
        };
        match parse_timestamp(&remaining[1..end]) {
            Some(time) => {
                timestamps.push(time);
                remaining = &remaining[end + 1..];
            }
            None => break,
        }
    }

    let text = remaining.trim();
    if timestamps.is_empty() || text.is_empty() {
        return None;
    }

    Some((timestamps, text))
}

/// Parse `mm:ss.ff` or `mm:ss.fff`.
fn parse_timestamp(s: &str) -> Option<Duration> {
    let (minutes, rest) = s.split_once(':')?;
    let (seconds, fraction) = rest.split_once('.')?;

    if minutes.is_empty() || !minutes.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if seconds.len() != 2 || !seconds.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if !(2..=3).contains(&fraction.len()) || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;
    // "12" is 120ms, "123" is 123ms
    let millis: u64 = format!("{fraction:0<3}").parse().ok()?;

    let total = minutes
        .checked_mul(60_000)?
        .checked_add(seconds * 1000 + millis)?;
    Some(Duration::from_millis(total))
}

/// Apply an LRC offset in milliseconds; positive values move lines earlier.
fn apply_offset(time: Duration, offset_ms: i64) -> Duration {
    let shift = Duration::from_millis(offset_ms.unsigned_abs());
    if offset_ms >= 0 {
        time.saturating_sub(shift)
    } else {
        time + shift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_parse_simple_line() {
        let feed = TimedText::parse("[00:12.34]Hello world");
        assert_eq!(feed.len(), 1);
        assert_eq!(feed.text_at(Duration::from_millis(12340)), Some("Hello world"));
    }

    #[test]
    fn test_three_digit_fraction() {
        let feed = TimedText::parse("[01:02.345]Line");
        assert_eq!(feed.text_at(Duration::from_millis(62345)), Some("Line"));
    }

    #[test]
    fn test_malformed_lines_are_dropped() {
        let input = r#"
{"t":0,"c":[{"tx":"作词: "}]}
[00:05.00]Kept
[00:xx.00]Bad minutes
[00:07]No fraction
[00:08.1]One digit fraction
plain text
[00:09.00]
"#;
        let feed = TimedText::parse(input);
        assert_eq!(feed.len(), 1);
        assert_eq!(feed.text_at(Duration::from_secs(5)), Some("Kept"));
    }

    #[test]
    fn test_duplicate_timestamp_last_writer_wins() {
        let feed = TimedText::parse("[00:01.00]first\n[00:01.00]second");
        assert_eq!(feed.len(), 1);
        assert_eq!(feed.text_at(Duration::from_secs(1)), Some("second"));
    }

    #[test]
    fn test_multi_timestamp_line() {
        let feed = TimedText::parse("[00:05.00][00:15.00]Repeated lyric");
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.text_at(Duration::from_secs(5)), Some("Repeated lyric"));
        assert_eq!(feed.text_at(Duration::from_secs(15)), Some("Repeated lyric"));
    }

    #[test]
    fn test_id_tags_and_offset() {
        let input = "[ti:Song Title]\n[ar:Artist Name]\n[by:someone]\n[offset:500]\n[00:10.00]Test";
        let feed = TimedText::parse(input);
        assert_eq!(feed.metadata.title.as_deref(), Some("Song Title"));
        assert_eq!(feed.metadata.artist.as_deref(), Some("Artist Name"));
        assert_eq!(feed.metadata.author.as_deref(), Some("someone"));
        assert_eq!(feed.text_at(Duration::from_millis(9500)), Some("Test"));
    }

    #[test]
    fn test_negative_offset() {
        let feed = TimedText::parse("[offset:-500]\n[00:10.00]Test");
        assert_eq!(feed.text_at(Duration::from_millis(10500)), Some("Test"));
    }

    #[test]
    fn test_merge_union_of_timestamps() {
        let primary = "[00:01.00]A\n[00:05.00]B";
        let translation = "[00:01.00]甲\n[00:03.00]乙";
        let track = LyricTrack::merge(Some(primary), Some(translation));

        let merged: Vec<_> = track
            .lines()
            .iter()
            .map(|l| (l.time, l.text.as_str(), l.translation.as_str()))
            .collect();
        assert_eq!(
            merged,
            vec![
                (secs(1.0), "A", "甲"),
                (secs(3.0), "", "乙"),
                (secs(5.0), "B", ""),
            ]
        );
        assert!(track.lines()[1].is_instrumental());
        assert!(!track.lines()[2].has_translation());
    }

    #[test]
    fn test_merge_without_translation() {
        let track = LyricTrack::merge(Some("[00:02.00]Only"), None);
        assert_eq!(track.len(), 1);
        assert_eq!(track.lines()[0].translation, "");
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        assert!(LyricTrack::merge(None, None).is_empty());
        assert!(LyricTrack::merge(Some("no timestamps here"), Some("")).is_empty());
    }

    #[test]
    fn test_line_index_at() {
        let track = LyricTrack::merge(Some("[00:01.00]a\n[00:03.00]b\n[00:05.00]c"), None);

        assert_eq!(track.line_index_at(secs(0.5)), None);
        assert_eq!(track.line_index_at(secs(1.0)), Some(0));
        assert_eq!(track.line_index_at(secs(3.2)), Some(1));
        assert_eq!(track.line_index_at(secs(5.0)), Some(2));
        assert_eq!(track.line_index_at(secs(99.0)), Some(2));
    }

    #[test]
    fn test_cjk_lyrics() {
        let track = LyricTrack::merge(Some("[00:05.00]你好世界"), None);
        assert_eq!(track.lines()[0].text, "你好世界");
    }
}
