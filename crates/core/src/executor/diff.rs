//! Cross-instance diffing by info hash.

use std::collections::HashSet;

use crate::torrent_client::TorrentInfo;

/// Torrents in `source` whose hash does not appear in `target`.
///
/// Hashes compare case-insensitively. The result keeps source order and
/// source records (category included), with duplicate hashes dropped.
pub fn missing(source: &[TorrentInfo], target: &[TorrentInfo]) -> Vec<TorrentInfo> {
    let present: HashSet<String> = target.iter().map(|t| t.hash.to_lowercase()).collect();
    let mut seen = HashSet::new();

    source
        .iter()
        .filter(|t| {
            let hash = t.hash.to_lowercase();
            !present.contains(&hash) && seen.insert(hash)
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::torrent;

    fn hashes(torrents: &[TorrentInfo]) -> Vec<&str> {
        torrents.iter().map(|t| t.hash.as_str()).collect()
    }

    #[test]
    fn test_missing_when_target_empty_is_source() {
        let source = vec![
            torrent("aaa", "movies", "stoppedUP", 1.0),
            torrent("bbb", "tv", "stoppedUP", 1.0),
        ];
        assert_eq!(missing(&source, &[]), source);
    }

    #[test]
    fn test_missing_empty_when_all_present_case_insensitive() {
        let source = vec![
            torrent("AAA", "movies", "stoppedUP", 1.0),
            torrent("bbb", "tv", "stoppedUP", 1.0),
        ];
        let target = vec![
            torrent("aaa", "", "stalledUP", 1.0),
            torrent("BBB", "", "stalledUP", 1.0),
            torrent("ccc", "", "stalledUP", 1.0),
        ];
        assert!(missing(&source, &target).is_empty());
    }

    #[test]
    fn test_missing_keeps_source_category() {
        let source = vec![
            torrent("aaa", "movies/hd", "stoppedUP", 1.0),
            torrent("bbb", "tv", "stoppedUP", 1.0),
        ];
        let target = vec![torrent("bbb", "other", "stalledUP", 1.0)];
        let result = missing(&source, &target);
        assert_eq!(hashes(&result), vec!["aaa"]);
        assert_eq!(result[0].category, "movies/hd");
    }

    #[test]
    fn test_missing_invariant_under_reordering() {
        let source = vec![
            torrent("aaa", "", "stoppedUP", 1.0),
            torrent("bbb", "", "stoppedUP", 1.0),
            torrent("ccc", "", "stoppedUP", 1.0),
        ];
        let target = vec![
            torrent("ccc", "", "stoppedUP", 1.0),
            torrent("ddd", "", "stoppedUP", 1.0),
        ];

        let mut forward = hashes(&missing(&source, &target))
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();

        let reversed_source: Vec<_> = source.iter().rev().cloned().collect();
        let reversed_target: Vec<_> = target.iter().rev().cloned().collect();
        let mut backward = hashes(&missing(&reversed_source, &reversed_target))
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();

        forward.sort();
        backward.sort();
        assert_eq!(forward, backward);
        assert_eq!(forward, vec!["aaa", "bbb"]);
    }

    #[test]
    fn test_missing_drops_duplicate_source_hashes() {
        let source = vec![
            torrent("aaa", "", "stoppedUP", 1.0),
            torrent("AAA", "", "stoppedUP", 1.0),
        ];
        assert_eq!(missing(&source, &[]).len(), 1);
    }
}
