//! Splitting free-text instructions into numbered steps.

/// Split "1. Mix the ingredients. 2. Cook in a pan." into its steps.
///
/// A step marker is a run of digits followed by a dot, at the start of the
/// text or after whitespace. Line breaks count as spaces. Text before the
/// first marker is dropped. Without any marker the whole text is one step.
pub fn split_steps(text: &str) -> Vec<String> {
    let text = text.replace(['\r', '\n'], " ");
    let bytes = text.as_bytes();

    let mut markers = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let at_boundary = i == 0 || bytes[i - 1].is_ascii_whitespace();
        if at_boundary && bytes[i].is_ascii_digit() {
            let mut j = i;
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'.' {
                markers.push((i, j + 1));
                i = j + 1;
                continue;
            }
            i = j;
            continue;
        }
        i += 1;
    }

    if markers.is_empty() {
        let whole = text.trim();
        return if whole.is_empty() { Vec::new() } else { vec![whole.to_string()] };
    }

    markers
        .iter()
        .enumerate()
        .filter_map(|(n, &(_, body_start))| {
            let body_end = markers.get(n + 1).map(|&(start, _)| start).unwrap_or(text.len());
            let step = text[body_start..body_end].trim();
            (!step.is_empty()).then(|| step.to_string())
        })
        .collect()
}
