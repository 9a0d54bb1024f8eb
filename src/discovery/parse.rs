//! Parsing of the external listing utility's text output.

/// Extracts device path candidates from raw listing output.
///
/// A line is device-shaped when its first character is `/`. The candidate is
/// the substring preceding any `(` annotation, with trailing whitespace
/// trimmed. Every other line (headers, indented names, blanks) is discarded.
/// Input order is preserved: enumeration order is attempt order.
pub fn parse_candidates(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| line.starts_with('/'))
        .map(|line| {
            let path = match line.find('(') {
                Some(annotation) => &line[..annotation],
                None => line,
            };
            path.trim_end().to_string()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_annotated_line_is_stripped_and_trimmed() {
        let output = "/dev/video0 (Dummy Camera): Camera 0\n";
        assert_eq!(parse_candidates(output), vec!["/dev/video0"]);
    }

    #[test]
    fn test_non_path_lines_discarded() {
        let output = "\
Dummy Camera (platform: vivid):
/dev/video0 (Dummy Camera)
/dev/video1
	/dev/video2

USB Camera: usb-0000:00:14.0-1";
        assert_eq!(parse_candidates(output), vec!["/dev/video0", "/dev/video1"]);
    }

    #[test]
    fn test_order_preserved() {
        let output = "/dev/video3\n/dev/video0\n/dev/video7\n";
        assert_eq!(
            parse_candidates(output),
            vec!["/dev/video3", "/dev/video0", "/dev/video7"]
        );
    }

    #[test]
    fn test_empty_output_yields_empty_sequence() {
        assert!(parse_candidates("").is_empty());
        assert!(parse_candidates("\n\n").is_empty());
    }

    #[test]
    fn test_line_without_annotation_kept_whole() {
        assert_eq!(parse_candidates("/dev/video5  \n"), vec!["/dev/video5"]);
    }

    proptest! {
        #[test]
        fn prop_candidates_are_path_shaped(
            lines in proptest::collection::vec("[ -~]{0,40}", 0..20)
        ) {
            let output = lines.join("\n");
            let candidates = parse_candidates(&output);

            let device_lines = lines.iter().filter(|l| l.starts_with('/')).count();
            prop_assert_eq!(candidates.len(), device_lines);

            for candidate in candidates {
                prop_assert!(candidate.starts_with('/'));
                prop_assert!(!candidate.contains('('));
                prop_assert!(candidate == candidate.trim_end());
            }
        }
    }
}
